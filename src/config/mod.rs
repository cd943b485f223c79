pub mod events;
pub mod settings;
pub mod watcher;

use crate::host::StatusBarAlignment;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use settings::Configuration;

/// Settings section holding the button configuration.
pub const CONFIGURATION_SECTION: &str = "taskButtons";

#[derive(Debug, Clone, PartialEq)]
pub struct ButtonsConfig {
    /// Raw entries, parsed one at a time so a malformed entry only costs its own button.
    pub tasks: Vec<Value>,
    pub show_counter: bool,
}

impl ButtonsConfig {
    pub fn new(tasks: Vec<Value>, show_counter: bool) -> Self {
        Self { tasks, show_counter }
    }

    pub fn from_configuration(config: &Configuration) -> Self {
        Self {
            tasks: config.get("tasks", Vec::new()),
            show_counter: config.get("showCounter", true),
        }
    }
}

impl Default for ButtonsConfig {
    fn default() -> Self {
        Self::new(Vec::new(), true)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskEntry {
    #[serde(default)]
    pub task: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub tooltip: Option<String>,
    #[serde(default)]
    pub alignment: Option<String>,
    #[serde(default, rename = "tasks")]
    pub sub_tasks: Option<Vec<SubTaskEntry>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubTaskEntry {
    pub task: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl TaskEntry {
    pub fn parse(raw: &Value) -> Result<Self> {
        Ok(serde_json::from_value(raw.clone())?)
    }

    pub fn single_task(&self) -> Option<&str> {
        self.task.as_deref().filter(|t| !t.is_empty())
    }

    pub fn sub_tasks(&self) -> &[SubTaskEntry] {
        self.sub_tasks.as_deref().unwrap_or_default()
    }

    pub fn is_multi_task(&self) -> bool {
        !self.sub_tasks().is_empty()
    }

    pub fn is_valid(&self) -> bool {
        self.is_multi_task() || self.single_task().is_some()
    }

    pub fn label(&self, index: usize) -> String {
        non_empty(&self.label)
            .or(self.single_task())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Task #{}", index + 1))
    }

    pub fn tooltip(&self, index: usize) -> String {
        non_empty(&self.tooltip)
            .map(str::to_string)
            .unwrap_or_else(|| self.label(index))
    }

    pub fn alignment(&self) -> StatusBarAlignment {
        match self.alignment.as_deref() {
            Some(a) if a.eq_ignore_ascii_case("right") => StatusBarAlignment::Right,
            _ => StatusBarAlignment::Left,
        }
    }
}

impl SubTaskEntry {
    pub fn label(&self) -> &str {
        non_empty(&self.label).unwrap_or(&self.task)
    }

    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or_default()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
