use super::button::TaskButton;
use super::counter::TaskCounter;
use super::descriptor::{build_descriptor, CommandDescriptor};
use crate::config::{ButtonsConfig, TaskEntry};
use crate::host::Host;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Inactive,
    Active,
}

/// Owns every status bar item and command created for the current configuration.
///
/// Configuration changes rebuild everything from scratch: the previous buttons
/// are disposed before the new ones are created, so no handle or command id
/// survives a reconciliation.
pub struct TaskButtons {
    host: Arc<dyn Host>,
    config: ButtonsConfig,
    counter: Option<TaskCounter>,
    buttons: Vec<TaskButton>,
    state: LifecycleState,
}

impl TaskButtons {
    pub fn new(host: Arc<dyn Host>, config: ButtonsConfig) -> Self {
        Self {
            host,
            config,
            counter: None,
            buttons: Vec::new(),
            state: LifecycleState::Inactive,
        }
    }

    pub fn activate(&mut self) {
        if self.state == LifecycleState::Active {
            log::warn!("Task buttons already active, ignoring activate");
            return;
        }
        self.build();
        self.state = LifecycleState::Active;
    }

    pub fn update(&mut self, config: ButtonsConfig) {
        self.deactivate();
        self.config = config;
        self.build();
        self.state = LifecycleState::Active;
    }

    pub fn deactivate(&mut self) {
        for button in &mut self.buttons {
            button.dispose();
        }
        self.buttons.clear();

        if let Some(mut counter) = self.counter.take() {
            counter.dispose();
        }

        if self.state == LifecycleState::Active {
            log::debug!("Task buttons deactivated");
        }
        self.state = LifecycleState::Inactive;
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn config(&self) -> &ButtonsConfig {
        &self.config
    }

    pub fn buttons(&self) -> &[TaskButton] {
        &self.buttons
    }

    pub fn counter(&self) -> Option<&TaskCounter> {
        self.counter.as_ref()
    }

    fn build(&mut self) {
        let planned = plan_buttons(&self.config.tasks);

        if self.config.show_counter {
            match TaskCounter::create(&self.host, planned.len()) {
                Ok(counter) => self.counter = Some(counter),
                Err(e) => log::warn!("Failed to create task counter: {:#}", e),
            }
        }

        for (index, entry, descriptor) in planned {
            match TaskButton::create(&self.host, &entry, index, descriptor) {
                Ok(button) => self.buttons.push(button),
                Err(e) => log::warn!("Failed to create task button #{}: {:#}", index + 1, e),
            }
        }

        log::info!(
            "Created {} task button(s) from {} configured entr{}",
            self.buttons.len(),
            self.config.tasks.len(),
            if self.config.tasks.len() == 1 { "y" } else { "ies" }
        );
    }
}

impl Drop for TaskButtons {
    fn drop(&mut self) {
        self.deactivate();
    }
}

fn plan_buttons(raw_entries: &[serde_json::Value]) -> Vec<(usize, TaskEntry, CommandDescriptor)> {
    raw_entries
        .iter()
        .enumerate()
        .filter_map(|(index, raw)| {
            let entry = match TaskEntry::parse(raw) {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Skipping task button #{}: malformed entry: {}", index + 1, e);
                    return None;
                }
            };

            let descriptor = build_descriptor(&entry, index);
            if !descriptor.is_valid() {
                log::warn!(
                    "Skipping task button #{} ({}): no task or sub-tasks defined",
                    index + 1,
                    descriptor.title
                );
                return None;
            }
            Some((index, entry, descriptor))
        })
        .collect()
}
