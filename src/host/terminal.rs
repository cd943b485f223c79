//! [`Host`] that draws the status bar as a line on stdout and reads clicks and
//! pick-list answers from stdin.

use super::{
    CommandCallback, ConfigurationChangeEvent, ConfigurationListener, Disposable, Host,
    QuickPickItem, StatusBarAlignment, StatusBarItem, RUN_TASK_COMMAND,
};
use crate::buttons::descriptor::CommandDescriptor;
use crate::config::settings::Configuration;
use crate::config::watcher::LiveSettings;
use crate::runner::{TaskOutcome, TaskRunner};
use anyhow::Result;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Empty,
    Index(usize),
    Reload,
    Quit,
    Help,
    Unknown(String),
}

pub fn parse_input(line: &str) -> Input {
    let line = line.trim();
    match line.to_lowercase().as_str() {
        "" => Input::Empty,
        "q" | "quit" | "exit" => Input::Quit,
        "r" | "reload" => Input::Reload,
        "h" | "help" | "?" => Input::Help,
        other => match other.parse::<usize>() {
            Ok(index) => Input::Index(index),
            Err(_) => Input::Unknown(line.to_string()),
        },
    }
}

/// What the caller's loop should do with a line of input.
#[derive(Debug, Clone, PartialEq)]
pub enum InputOutcome {
    Handled,
    Run(CommandDescriptor),
    Reload,
    Quit,
}

#[derive(Debug, Clone)]
struct ItemState {
    alignment: StatusBarAlignment,
    priority: i32,
    text: String,
    tooltip: String,
    command: Option<CommandDescriptor>,
    visible: bool,
}

struct PendingPick {
    choices: usize,
    reply: oneshot::Sender<Option<usize>>,
}

#[derive(Default)]
struct TerminalState {
    next_id: u64,
    items: BTreeMap<u64, ItemState>,
    commands: HashMap<String, CommandCallback>,
    listeners: BTreeMap<u64, ConfigurationListener>,
    pending_pick: Option<PendingPick>,
    dirty: bool,
}

impl TerminalState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Visible items in display order: left side, then right side, each by
    /// descending priority and creation order.
    fn visible_items(&self) -> Vec<&ItemState> {
        let mut items: Vec<(&u64, &ItemState)> =
            self.items.iter().filter(|(_, i)| i.visible).collect();
        items.sort_by(|(id_a, a), (id_b, b)| {
            side_rank(a.alignment)
                .cmp(&side_rank(b.alignment))
                .then(b.priority.cmp(&a.priority))
                .then(id_a.cmp(id_b))
        });
        items.into_iter().map(|(_, item)| item).collect()
    }

    fn clickable(&self) -> Vec<&ItemState> {
        self.visible_items()
            .into_iter()
            .filter(|item| item.command.is_some())
            .collect()
    }
}

fn side_rank(alignment: StatusBarAlignment) -> u8 {
    match alignment {
        StatusBarAlignment::Left => 0,
        StatusBarAlignment::Right => 1,
    }
}

fn render(state: &TerminalState) -> String {
    let mut clicks = 0;
    let mut left = Vec::new();
    let mut right = Vec::new();

    for item in state.visible_items() {
        let label = if item.command.is_some() {
            clicks += 1;
            format!("[{}] {}", clicks, item.text)
        } else {
            item.text.clone()
        };
        match item.alignment {
            StatusBarAlignment::Left => left.push(label),
            StatusBarAlignment::Right => right.push(label),
        }
    }

    if right.is_empty() {
        left.join("  ")
    } else {
        format!("{}  |  {}", left.join("  "), right.join("  "))
    }
}

pub struct TerminalHost {
    state: Arc<Mutex<TerminalState>>,
    settings: Arc<LiveSettings>,
    runner: Arc<TaskRunner>,
}

impl TerminalHost {
    pub fn new(settings: Arc<LiveSettings>, runner: Arc<TaskRunner>) -> Self {
        Self {
            state: Arc::new(Mutex::new(TerminalState::default())),
            settings,
            runner,
        }
    }

    fn lock(&self) -> MutexGuard<'_, TerminalState> {
        lock_state(&self.state)
    }

    /// Current status line, `[n]` marking clickable items.
    pub fn status_line(&self) -> String {
        render(&self.lock())
    }

    /// Prints the status line if anything changed since the last flush.
    pub fn flush(&self) {
        let line = {
            let mut state = self.lock();
            if !state.dirty {
                return;
            }
            state.dirty = false;
            render(&state)
        };
        println!("{}", if line.is_empty() { "(no task buttons)" } else { line.as_str() });
    }

    pub fn handle_input(&self, line: &str) -> InputOutcome {
        let input = parse_input(line);
        let mut state = self.lock();

        if let Some(pending) = state.pending_pick.take() {
            match input {
                Input::Empty => {
                    let _ = pending.reply.send(None);
                }
                Input::Index(n) if (1..=pending.choices).contains(&n) => {
                    let _ = pending.reply.send(Some(n - 1));
                }
                _ => {
                    println!(
                        "Pick a number between 1 and {}, or press enter to cancel",
                        pending.choices
                    );
                    state.pending_pick = Some(pending);
                }
            }
            return InputOutcome::Handled;
        }

        match input {
            Input::Empty => InputOutcome::Handled,
            Input::Quit => InputOutcome::Quit,
            Input::Reload => InputOutcome::Reload,
            Input::Help => {
                print_help();
                for (n, item) in state.clickable().into_iter().enumerate() {
                    println!("  [{}] {} - {}", n + 1, item.text, item.tooltip);
                }
                InputOutcome::Handled
            }
            Input::Index(n) => match n
                .checked_sub(1)
                .and_then(|i| state.clickable().into_iter().nth(i))
                .and_then(|item| item.command.clone())
            {
                Some(command) => InputOutcome::Run(command),
                None => {
                    println!("No task button [{}]", n);
                    InputOutcome::Handled
                }
            },
            Input::Unknown(text) => {
                println!("Unknown input: {} (type 'help')", text);
                InputOutcome::Handled
            }
        }
    }

    pub fn fire_configuration_changed(&self, event: &ConfigurationChangeEvent) {
        let listeners: Vec<ConfigurationListener> =
            self.lock().listeners.values().cloned().collect();
        log::debug!(
            "Configuration changed ({}), notifying {} listener(s)",
            event.sections().join(", "),
            listeners.len()
        );
        for listener in listeners {
            listener(event);
        }
    }
}

fn lock_state(state: &Mutex<TerminalState>) -> MutexGuard<'_, TerminalState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn print_help() {
    println!("  <n>      click task button [n] / choose item n of an open pick list");
    println!("  <enter>  cancel an open pick list");
    println!("  r        reload settings");
    println!("  q        quit");
}

fn report(task: &str, outcome: &TaskOutcome) {
    for line in outcome.stdout.lines() {
        println!("[{}] {}", task, line);
    }
    for line in outcome.stderr.lines() {
        eprintln!("[{}] {}", task, line);
    }
    if outcome.success {
        log::info!("Task {} finished", task);
    } else {
        log::warn!("Task {} exited with code {}", task, outcome.exit_code);
    }
}

impl Host for TerminalHost {
    fn create_status_bar_item(
        &self,
        alignment: StatusBarAlignment,
        priority: i32,
    ) -> Result<Box<dyn StatusBarItem>> {
        let mut state = self.lock();
        let id = state.next_id();
        state.items.insert(
            id,
            ItemState {
                alignment,
                priority,
                text: String::new(),
                tooltip: String::new(),
                command: None,
                visible: false,
            },
        );

        Ok(Box::new(TerminalItem {
            id,
            state: Arc::clone(&self.state),
        }))
    }

    fn register_command(&self, command_id: &str, callback: CommandCallback) -> Result<Disposable> {
        let mut state = self.lock();
        if state.commands.contains_key(command_id) {
            anyhow::bail!("Command already registered: {}", command_id);
        }
        state.commands.insert(command_id.to_string(), callback);
        log::debug!("Registered command {}", command_id);

        let shared = Arc::clone(&self.state);
        let command_id = command_id.to_string();
        Ok(Disposable::new(move || {
            lock_state(&shared).commands.remove(&command_id);
        }))
    }

    fn execute_command(
        &self,
        command_id: &str,
        args: Vec<Value>,
    ) -> BoxFuture<'static, Result<()>> {
        let callback = self.lock().commands.get(command_id).cloned();
        if let Some(callback) = callback {
            return callback(args);
        }

        if command_id == RUN_TASK_COMMAND {
            let runner = Arc::clone(&self.runner);
            let task = args.first().and_then(Value::as_str).map(str::to_string);
            return async move {
                let Some(task) = task else {
                    anyhow::bail!("{} expects a task name argument", RUN_TASK_COMMAND);
                };
                let outcome = runner.run(&task).await?;
                report(&task, &outcome);
                Ok(())
            }
            .boxed();
        }

        let command_id = command_id.to_string();
        async move { anyhow::bail!("Command not found: {}", command_id) }.boxed()
    }

    fn show_quick_pick(&self, items: Vec<QuickPickItem>) -> BoxFuture<'static, Option<usize>> {
        if items.is_empty() {
            return async { None }.boxed();
        }

        let (reply, answer) = oneshot::channel();
        {
            let mut state = self.lock();
            if let Some(previous) = state.pending_pick.take() {
                let _ = previous.reply.send(None);
            }
            state.pending_pick = Some(PendingPick {
                choices: items.len(),
                reply,
            });
        }

        println!("Select a task (enter cancels):");
        for (i, item) in items.iter().enumerate() {
            if item.description.is_empty() {
                println!("  {}) {}", i + 1, item.label);
            } else {
                println!("  {}) {} - {}", i + 1, item.label, item.description);
            }
        }

        async move { answer.await.ok().flatten() }.boxed()
    }

    fn on_did_change_configuration(&self, listener: ConfigurationListener) -> Disposable {
        let id = {
            let mut state = self.lock();
            let id = state.next_id();
            state.listeners.insert(id, listener);
            id
        };

        let shared = Arc::clone(&self.state);
        Disposable::new(move || {
            lock_state(&shared).listeners.remove(&id);
        })
    }

    fn get_configuration(&self, section: &str) -> Configuration {
        self.settings.configuration(section)
    }
}

struct TerminalItem {
    id: u64,
    state: Arc<Mutex<TerminalState>>,
}

impl TerminalItem {
    fn update(&self, apply: impl FnOnce(&mut ItemState)) {
        let mut state = lock_state(&self.state);
        if let Some(item) = state.items.get_mut(&self.id) {
            apply(item);
            state.dirty = true;
        }
    }
}

impl StatusBarItem for TerminalItem {
    fn set_text(&mut self, text: &str) {
        self.update(|item| item.text = text.to_string());
    }

    fn set_tooltip(&mut self, tooltip: &str) {
        self.update(|item| item.tooltip = tooltip.to_string());
    }

    fn set_command(&mut self, command: CommandDescriptor) {
        self.update(|item| item.command = Some(command));
    }

    fn show(&mut self) {
        self.update(|item| item.visible = true);
    }

    fn hide(&mut self) {
        self.update(|item| item.visible = false);
    }

    fn dispose(&mut self) {
        let mut state = lock_state(&self.state);
        if state.items.remove(&self.id).is_some() {
            state.dirty = true;
        }
    }
}
