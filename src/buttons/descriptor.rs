use crate::config::{TaskEntry, CONFIGURATION_SECTION};
use crate::host::RUN_TASK_COMMAND;
use serde::Serialize;
use serde_json::{json, Value};

/// What a status bar item runs when clicked.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandDescriptor {
    pub title: String,
    pub command_id: String,
    pub tooltip: String,
    pub arguments: Vec<Value>,
}

impl CommandDescriptor {
    pub fn is_valid(&self) -> bool {
        !self.command_id.is_empty()
    }
}

pub fn quick_pick_command_id(index: usize) -> String {
    format!("{}.showQuickPick.{}", CONFIGURATION_SECTION, index)
}

/// Multi-task entries open a pick list under an index-derived command id,
/// single-task entries run their task directly. Entries with neither get an
/// empty command id.
pub fn build_descriptor(entry: &TaskEntry, index: usize) -> CommandDescriptor {
    let title = entry.label(index);
    let tooltip = entry.tooltip(index);

    if entry.is_multi_task() {
        let arguments = entry
            .sub_tasks()
            .iter()
            .map(|sub_task| {
                json!({
                    "task": sub_task.task,
                    "label": sub_task.label,
                    "description": sub_task.description,
                })
            })
            .collect();
        return CommandDescriptor {
            title,
            command_id: quick_pick_command_id(index),
            tooltip,
            arguments,
        };
    }

    match entry.single_task() {
        Some(task) => CommandDescriptor {
            title,
            command_id: RUN_TASK_COMMAND.to_string(),
            tooltip,
            arguments: vec![Value::String(task.to_string())],
        },
        None => CommandDescriptor {
            title,
            command_id: String::new(),
            tooltip,
            arguments: Vec::new(),
        },
    }
}
