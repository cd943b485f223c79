//! In-memory [`Host`] that records every call, for tests and dry runs.

use super::{
    CommandCallback, ConfigurationChangeEvent, ConfigurationListener, Disposable, Host,
    QuickPickItem, StatusBarAlignment, StatusBarItem,
};
use crate::buttons::descriptor::CommandDescriptor;
use crate::config::settings::Configuration;
use anyhow::Result;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, PartialEq)]
pub struct ItemRecord {
    pub id: usize,
    pub alignment: StatusBarAlignment,
    pub priority: i32,
    pub text: String,
    pub tooltip: String,
    pub command: Option<CommandDescriptor>,
    pub visible: bool,
    pub show_calls: usize,
    pub dispose_calls: usize,
}

impl ItemRecord {
    pub fn is_live(&self) -> bool {
        self.dispose_calls == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationRecord {
    pub id: usize,
    pub command_id: String,
    pub dispose_calls: usize,
}

#[derive(Default)]
struct Recorded {
    items: Vec<ItemRecord>,
    item_creations: usize,
    failing_creations: HashSet<usize>,
    registrations: Vec<RegistrationRecord>,
    next_registration: usize,
    commands: HashMap<String, CommandCallback>,
    executed: Vec<(String, Vec<Value>)>,
    picks: Vec<Vec<QuickPickItem>>,
    pick_responses: VecDeque<Option<usize>>,
    listeners: BTreeMap<usize, ConfigurationListener>,
    next_listener: usize,
    settings: Map<String, Value>,
}

#[derive(Clone, Default)]
pub struct MemoryHost {
    inner: Arc<Mutex<Recorded>>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Recorded> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_configuration(&self, section: &str, value: Value) {
        self.lock().settings.insert(section.to_string(), value);
    }

    /// Makes the `nth` call (zero-based, counted over the host's lifetime) to
    /// `create_status_bar_item` fail.
    pub fn fail_item_creation(&self, nth: usize) {
        self.lock().failing_creations.insert(nth);
    }

    /// Queues the answer for the next quick pick. Unanswered picks are dismissed.
    pub fn push_pick_response(&self, response: Option<usize>) {
        self.lock().pick_responses.push_back(response);
    }

    pub fn items(&self) -> Vec<ItemRecord> {
        self.lock().items.clone()
    }

    pub fn live_items(&self) -> Vec<ItemRecord> {
        self.lock().items.iter().filter(|i| i.is_live()).cloned().collect()
    }

    pub fn registrations(&self) -> Vec<RegistrationRecord> {
        self.lock().registrations.clone()
    }

    pub fn registered_commands(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.lock().commands.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn executed_commands(&self) -> Vec<(String, Vec<Value>)> {
        self.lock().executed.clone()
    }

    pub fn shown_picks(&self) -> Vec<Vec<QuickPickItem>> {
        self.lock().picks.clone()
    }

    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }

    pub fn fire_configuration_changed(&self, event: &ConfigurationChangeEvent) {
        let listeners: Vec<ConfigurationListener> =
            self.lock().listeners.values().cloned().collect();
        for listener in listeners {
            listener(event);
        }
    }
}

impl Host for MemoryHost {
    fn create_status_bar_item(
        &self,
        alignment: StatusBarAlignment,
        priority: i32,
    ) -> Result<Box<dyn StatusBarItem>> {
        let mut recorded = self.lock();
        let id = recorded.item_creations;
        recorded.item_creations += 1;
        if recorded.failing_creations.contains(&id) {
            anyhow::bail!("Status bar item creation #{} refused", id);
        }

        recorded.items.push(ItemRecord {
            id,
            alignment,
            priority,
            text: String::new(),
            tooltip: String::new(),
            command: None,
            visible: false,
            show_calls: 0,
            dispose_calls: 0,
        });

        Ok(Box::new(MemoryItem {
            id,
            host: self.clone(),
        }))
    }

    fn register_command(&self, command_id: &str, callback: CommandCallback) -> Result<Disposable> {
        let mut recorded = self.lock();
        if recorded.commands.contains_key(command_id) {
            anyhow::bail!("Command already registered: {}", command_id);
        }
        recorded.commands.insert(command_id.to_string(), callback);
        let registration = recorded.next_registration;
        recorded.next_registration += 1;
        recorded.registrations.push(RegistrationRecord {
            id: registration,
            command_id: command_id.to_string(),
            dispose_calls: 0,
        });
        drop(recorded);

        let host = self.clone();
        let command_id = command_id.to_string();
        Ok(Disposable::new(move || {
            let mut recorded = host.lock();
            recorded.commands.remove(&command_id);
            if let Some(record) = recorded.registrations.iter_mut().find(|r| r.id == registration) {
                record.dispose_calls += 1;
            }
        }))
    }

    fn execute_command(
        &self,
        command_id: &str,
        args: Vec<Value>,
    ) -> BoxFuture<'static, Result<()>> {
        let callback = {
            let mut recorded = self.lock();
            recorded.executed.push((command_id.to_string(), args.clone()));
            recorded.commands.get(command_id).cloned()
        };

        match callback {
            Some(callback) => callback(args),
            None => async { anyhow::Ok(()) }.boxed(),
        }
    }

    fn show_quick_pick(&self, items: Vec<QuickPickItem>) -> BoxFuture<'static, Option<usize>> {
        let mut recorded = self.lock();
        recorded.picks.push(items);
        let response = recorded.pick_responses.pop_front().flatten();
        async move { response }.boxed()
    }

    fn on_did_change_configuration(&self, listener: ConfigurationListener) -> Disposable {
        let id = {
            let mut recorded = self.lock();
            let id = recorded.next_listener;
            recorded.next_listener += 1;
            recorded.listeners.insert(id, listener);
            id
        };

        let host = self.clone();
        Disposable::new(move || {
            host.lock().listeners.remove(&id);
        })
    }

    fn get_configuration(&self, section: &str) -> Configuration {
        let value = self.lock().settings.get(section).cloned().unwrap_or(Value::Null);
        Configuration::new(section, value)
    }
}

struct MemoryItem {
    id: usize,
    host: MemoryHost,
}

impl MemoryItem {
    fn update(&self, apply: impl FnOnce(&mut ItemRecord)) {
        if let Some(record) = self.host.lock().items.iter_mut().find(|i| i.id == self.id) {
            apply(record);
        }
    }
}

impl StatusBarItem for MemoryItem {
    fn set_text(&mut self, text: &str) {
        self.update(|r| r.text = text.to_string());
    }

    fn set_tooltip(&mut self, tooltip: &str) {
        self.update(|r| r.tooltip = tooltip.to_string());
    }

    fn set_command(&mut self, command: CommandDescriptor) {
        self.update(|r| r.command = Some(command));
    }

    fn show(&mut self) {
        self.update(|r| {
            r.visible = true;
            r.show_calls += 1;
        });
    }

    fn hide(&mut self) {
        self.update(|r| r.visible = false);
    }

    fn dispose(&mut self) {
        self.update(|r| {
            r.visible = false;
            r.dispose_calls += 1;
        });
    }
}
