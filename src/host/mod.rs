//! Capabilities the button manager consumes from the editor-like host it runs in.
//!
//! The manager never renders anything itself: it asks a [`Host`] for status bar
//! items, registers commands with it and dispatches tasks through it.

pub mod memory;
pub mod terminal;

use crate::buttons::descriptor::CommandDescriptor;
use crate::config::settings::Configuration;
use anyhow::Result;
use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Command the host runs a named task with. Takes the task name as first argument.
pub const RUN_TASK_COMMAND: &str = "workbench.action.tasks.runTask";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusBarAlignment {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuickPickItem {
    pub label: String,
    pub description: String,
}

pub type CommandCallback = Arc<dyn Fn(Vec<Value>) -> BoxFuture<'static, Result<()>> + Send + Sync>;

pub type ConfigurationListener = Arc<dyn Fn(&ConfigurationChangeEvent) + Send + Sync>;

/// A status bar element owned by whoever created it.
pub trait StatusBarItem: Send {
    fn set_text(&mut self, text: &str);
    fn set_tooltip(&mut self, tooltip: &str);
    fn set_command(&mut self, command: CommandDescriptor);
    fn show(&mut self);
    fn hide(&mut self);
    fn dispose(&mut self);
}

pub trait Host: Send + Sync {
    fn create_status_bar_item(
        &self,
        alignment: StatusBarAlignment,
        priority: i32,
    ) -> Result<Box<dyn StatusBarItem>>;

    fn register_command(&self, command_id: &str, callback: CommandCallback) -> Result<Disposable>;

    fn execute_command(&self, command_id: &str, args: Vec<Value>) -> BoxFuture<'static, Result<()>>;

    /// Resolves to the index of the chosen item, or `None` when the pick is dismissed.
    fn show_quick_pick(&self, items: Vec<QuickPickItem>) -> BoxFuture<'static, Option<usize>>;

    fn on_did_change_configuration(&self, listener: ConfigurationListener) -> Disposable;

    fn get_configuration(&self, section: &str) -> Configuration;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationChangeEvent {
    sections: Vec<String>,
}

impl ConfigurationChangeEvent {
    pub fn new<I, S>(sections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sections: sections.into_iter().map(Into::into).collect(),
        }
    }

    pub fn sections(&self) -> &[String] {
        &self.sections
    }

    /// True when `section` or anything nested under it (or above it) changed.
    pub fn affects_configuration(&self, section: &str) -> bool {
        self.sections.iter().any(|changed| {
            changed == section
                || is_nested_under(changed, section)
                || is_nested_under(section, changed)
        })
    }
}

fn is_nested_under(key: &str, parent: &str) -> bool {
    key.len() > parent.len() && key.starts_with(parent) && key.as_bytes()[parent.len()] == b'.'
}

/// Release handle for a registration. Clones share the release, which runs
/// once no matter how many of them are disposed.
#[derive(Clone)]
pub struct Disposable {
    on_dispose: Arc<Mutex<Option<Box<dyn FnOnce() + Send>>>>,
}

impl Disposable {
    pub fn new(on_dispose: impl FnOnce() + Send + 'static) -> Self {
        Self {
            on_dispose: Arc::new(Mutex::new(Some(Box::new(on_dispose)))),
        }
    }

    pub fn dispose(&mut self) {
        let on_dispose = self.release().take();
        if let Some(on_dispose) = on_dispose {
            on_dispose();
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.release().is_none()
    }

    fn release(&self) -> MutexGuard<'_, Option<Box<dyn FnOnce() + Send>>> {
        self.on_dispose.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Disposable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disposable")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
