use anyhow::Result;
use std::sync::Arc;
use task_buttons::buttons::CommandDescriptor;
use task_buttons::config::events::{EventBus, SettingsEvent};
use task_buttons::config::settings::SettingsStore;
use task_buttons::config::watcher::{watch_settings, LiveSettings};
use task_buttons::extension::{Extension, ExtensionContext};
use task_buttons::host::terminal::{InputOutcome, TerminalHost};
use task_buttons::host::{ConfigurationChangeEvent, Host};
use task_buttons::paths;
use task_buttons::runner::{default_variables, TaskRunner};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .init();

    log::info!("Starting task buttons...");

    let config_dir = paths::config_dir()?;
    let events = Arc::new(EventBus::new());
    let settings = Arc::new(LiveSettings::load(
        SettingsStore::new(paths::settings_path()?),
        Arc::clone(&events),
    ));
    let runner = Arc::new(TaskRunner::new(paths::tasks_path()?, default_variables(&config_dir)));
    log::info!("Settings: {:?}", settings.path());
    log::info!("Tasks: {:?}", runner.tasks_path());

    let terminal = Arc::new(TerminalHost::new(Arc::clone(&settings), runner));
    let host: Arc<dyn Host> = terminal.clone();

    let mut settings_rx = events.subscribe();
    let _watcher = match watch_settings(Arc::clone(&settings)) {
        Ok(watcher) => Some(watcher),
        Err(e) => {
            log::warn!("Settings will only reload on 'r': {:#}", e);
            None
        }
    };

    let mut context = ExtensionContext::new();
    let mut extension = Extension::new(Arc::clone(&host));
    extension.activate(&mut context);
    terminal.flush();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match terminal.handle_input(&line) {
                    InputOutcome::Handled => {}
                    InputOutcome::Quit => break,
                    InputOutcome::Reload => {
                        if let Err(e) = settings.reload() {
                            log::warn!("Keeping previous settings: {:#}", e);
                        }
                    }
                    InputOutcome::Run(command) => spawn_command(&host, command),
                }
            }
            event = settings_rx.recv() => match event {
                Ok(SettingsEvent::Changed { sections }) => {
                    terminal.fire_configuration_changed(&ConfigurationChangeEvent::new(sections));
                }
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("Missed {} settings event(s), refreshing everything", skipped);
                    let everything = ConfigurationChangeEvent::new(settings.sections());
                    terminal.fire_configuration_changed(&everything);
                }
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
        terminal.flush();
    }

    extension.deactivate();
    context.dispose();
    log::info!("Task buttons stopped");
    Ok(())
}

fn spawn_command(host: &Arc<dyn Host>, command: CommandDescriptor) {
    log::debug!("Clicked {} -> {}", command.title, command.command_id);
    let run = host.execute_command(&command.command_id, command.arguments);
    tokio::spawn(async move {
        if let Err(e) = run.await {
            log::error!("{} failed: {:#}", command.title, e);
        }
    });
}
