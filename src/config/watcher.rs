use super::events::{EventBus, SettingsEvent};
use super::settings::{changed_sections, Configuration, SettingsStore};
use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde_json::{Map, Value};
use std::ffi::OsStr;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

/// Settings document kept in memory and re-read when the file changes.
pub struct LiveSettings {
    store: SettingsStore,
    current: RwLock<Value>,
    events: Arc<EventBus>,
}

impl LiveSettings {
    /// Loads the initial document. A broken file starts out empty instead of
    /// failing, so fixing it later is picked up by the watcher.
    pub fn load(store: SettingsStore, events: Arc<EventBus>) -> Self {
        let current = store.load().unwrap_or_else(|e| {
            log::warn!("Starting with empty settings: {:#}", e);
            Value::Object(Map::new())
        });

        Self {
            store,
            current: RwLock::new(current),
            events,
        }
    }

    pub fn path(&self) -> &Path {
        self.store.path()
    }

    pub fn configuration(&self, section: &str) -> Configuration {
        let current = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Configuration::new(section, current.get(section).cloned().unwrap_or(Value::Null))
    }

    pub fn sections(&self) -> Vec<String> {
        let current = self.current.read().unwrap_or_else(PoisonError::into_inner);
        current
            .as_object()
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Re-reads the file and announces the sections that changed. On a parse
    /// error the last good document stays in place.
    pub fn reload(&self) -> Result<Vec<String>> {
        let settings = self.store.load()?;

        let sections = {
            let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
            let sections = changed_sections(&current, &settings);
            *current = settings;
            sections
        };

        if sections.is_empty() {
            log::debug!("Settings reloaded without changes");
        } else {
            log::info!("Settings changed: {}", sections.join(", "));
            self.events.send(SettingsEvent::Changed {
                sections: sections.clone(),
            });
        }
        Ok(sections)
    }
}

/// Watches the settings file's directory and reloads on every modify, create
/// or remove event that names the file. Editors that save through a temp file
/// and a rename only show up on the directory. The watcher stops when the
/// returned handle is dropped.
pub fn watch_settings(settings: Arc<LiveSettings>) -> Result<RecommendedWatcher> {
    let path = settings.path().to_path_buf();
    let dir = path
        .parent()
        .map(Path::to_path_buf)
        .context("Settings file has no parent directory")?;
    let file_name = path
        .file_name()
        .map(OsStr::to_os_string)
        .context("Settings path has no file name")?;
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create settings directory {:?}", dir))?;

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) if touches(&event, &file_name) => {
            if let Err(e) = settings.reload() {
                log::warn!("Keeping previous settings: {:#}", e);
            }
        }
        Ok(_) => {}
        Err(e) => log::error!("Settings watcher error: {}", e),
    })
    .context("Failed to create settings watcher")?;

    watcher
        .watch(&dir, RecursiveMode::NonRecursive)
        .with_context(|| format!("Failed to watch {:?}", dir))?;
    log::debug!("Watching settings file {:?}", path);
    Ok(watcher)
}

fn touches(event: &Event, file_name: &OsStr) -> bool {
    matches!(
        event.kind,
        EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
    ) && event
        .paths
        .iter()
        .any(|p| p.file_name() == Some(file_name))
}
