use super::button::PRIORITY_BASE;
use crate::host::{Host, StatusBarAlignment, StatusBarItem};
use anyhow::Result;
use std::sync::Arc;

pub const COUNTER_TOOLTIP: &str = "Number of configured task buttons";

/// Sits left of every task button.
pub const COUNTER_PRIORITY: i32 = PRIORITY_BASE + 1;

pub fn counter_text(count: usize) -> String {
    format!("{} {}", count, if count == 1 { "task" } else { "tasks" })
}

pub struct TaskCounter {
    text: String,
    item: Option<Box<dyn StatusBarItem>>,
}

impl TaskCounter {
    pub fn create(host: &Arc<dyn Host>, count: usize) -> Result<Self> {
        let text = counter_text(count);
        let mut item = host.create_status_bar_item(StatusBarAlignment::Left, COUNTER_PRIORITY)?;
        item.set_text(&text);
        item.set_tooltip(COUNTER_TOOLTIP);
        item.show();

        Ok(Self {
            text,
            item: Some(item),
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn dispose(&mut self) {
        if let Some(mut item) = self.item.take() {
            item.dispose();
        }
    }
}

impl Drop for TaskCounter {
    fn drop(&mut self) {
        self.dispose();
    }
}
