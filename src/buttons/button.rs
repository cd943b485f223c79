use super::descriptor::CommandDescriptor;
use crate::config::{SubTaskEntry, TaskEntry};
use crate::host::{
    CommandCallback, Disposable, Host, QuickPickItem, StatusBarAlignment, StatusBarItem,
    RUN_TASK_COMMAND,
};
use anyhow::Result;
use futures::FutureExt;
use serde_json::Value;
use std::sync::Arc;

/// Priority of the first button. Hosts place higher priorities further left,
/// so counting down keeps configuration order on both sides.
pub const PRIORITY_BASE: i32 = 1000;

pub fn priority_for(index: usize) -> i32 {
    let offset = i32::try_from(index).unwrap_or(i32::MAX);
    PRIORITY_BASE.saturating_sub(offset)
}

/// One live status bar button and, for multi-task entries, its pick-list command.
pub struct TaskButton {
    index: usize,
    alignment: StatusBarAlignment,
    descriptor: CommandDescriptor,
    item: Option<Box<dyn StatusBarItem>>,
    quick_pick_command: Option<Disposable>,
}

impl TaskButton {
    pub fn create(
        host: &Arc<dyn Host>,
        entry: &TaskEntry,
        index: usize,
        descriptor: CommandDescriptor,
    ) -> Result<Self> {
        let alignment = entry.alignment();
        let mut item = host.create_status_bar_item(alignment, priority_for(index))?;
        item.set_text(&descriptor.title);
        item.set_tooltip(&descriptor.tooltip);
        item.set_command(descriptor.clone());

        let quick_pick_command = if entry.is_multi_task() {
            let callback = quick_pick_callback(Arc::clone(host), entry.sub_tasks().to_vec());
            match host.register_command(&descriptor.command_id, callback) {
                Ok(disposable) => Some(disposable),
                Err(e) => {
                    item.dispose();
                    return Err(e);
                }
            }
        } else {
            None
        };

        item.show();

        Ok(Self {
            index,
            alignment,
            descriptor,
            item: Some(item),
            quick_pick_command,
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn alignment(&self) -> StatusBarAlignment {
        self.alignment
    }

    pub fn text(&self) -> &str {
        &self.descriptor.title
    }

    pub fn command_id(&self) -> &str {
        &self.descriptor.command_id
    }

    pub fn descriptor(&self) -> &CommandDescriptor {
        &self.descriptor
    }

    pub fn is_multi_task(&self) -> bool {
        self.quick_pick_command.is_some()
    }

    pub fn dispose(&mut self) {
        if let Some(mut command) = self.quick_pick_command.take() {
            command.dispose();
        }
        if let Some(mut item) = self.item.take() {
            item.dispose();
        }
    }
}

impl Drop for TaskButton {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn quick_pick_callback(host: Arc<dyn Host>, sub_tasks: Vec<SubTaskEntry>) -> CommandCallback {
    Arc::new(move |_args: Vec<Value>| {
        let host = Arc::clone(&host);
        let items: Vec<QuickPickItem> = sub_tasks
            .iter()
            .map(|sub_task| QuickPickItem {
                label: sub_task.label().to_string(),
                description: sub_task.description().to_string(),
            })
            .collect();
        let tasks: Vec<String> = sub_tasks.iter().map(|s| s.task.clone()).collect();

        async move {
            let Some(choice) = host.show_quick_pick(items).await else {
                log::debug!("Task pick dismissed");
                return Ok(());
            };
            let Some(task) = tasks.get(choice) else {
                anyhow::bail!("Picked item {} is out of range ({} tasks)", choice, tasks.len());
            };

            log::info!("Running picked task: {}", task);
            host.execute_command(RUN_TASK_COMMAND, vec![Value::String(task.clone())])
                .await
        }
        .boxed()
    })
}
