use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Read-only view over one top-level section of the settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Configuration {
    section: String,
    values: Map<String, Value>,
}

impl Configuration {
    pub fn new(section: impl Into<String>, value: Value) -> Self {
        let section = section.into();
        let values = match value {
            Value::Object(values) => values,
            Value::Null => Map::new(),
            other => {
                log::warn!("Settings section {} is not an object: {}", section, other);
                Map::new()
            }
        };
        Self { section, values }
    }

    pub fn section(&self) -> &str {
        &self.section
    }

    pub fn has(&self, key: &str) -> bool {
        self.values.get(key).is_some_and(|v| !v.is_null())
    }

    /// Returns the value under `key`, or `default` when it is missing, null or
    /// of the wrong shape.
    pub fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        let Some(value) = self.values.get(key).filter(|v| !v.is_null()) else {
            return default;
        };

        match serde_json::from_value(value.clone()) {
            Ok(parsed) => parsed,
            Err(e) => {
                log::warn!("Ignoring setting {}.{}: {}", self.section, key, e);
                default
            }
        }
    }
}

pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Value> {
        if !self.path.exists() {
            return Ok(Value::Object(Map::new()));
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {:?}", self.path))?;
        if content.trim().is_empty() {
            return Ok(Value::Object(Map::new()));
        }

        let settings: Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {:?}", self.path))?;
        if !settings.is_object() {
            anyhow::bail!("Settings root in {:?} must be a JSON object", self.path);
        }
        Ok(settings)
    }

    pub fn save(&self, settings: &Value) -> Result<()> {
        ensure_parent_dir(&self.path)?;
        let content = serde_json::to_string_pretty(settings)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

/// Top-level keys whose value differs between two settings documents, sorted.
pub fn changed_sections(old: &Value, new: &Value) -> Vec<String> {
    let keys: BTreeSet<&String> = object_keys(old).chain(object_keys(new)).collect();

    keys.into_iter()
        .filter(|key| old.get(key.as_str()) != new.get(key.as_str()))
        .cloned()
        .collect()
}

fn object_keys(value: &Value) -> impl Iterator<Item = &String> {
    value.as_object().into_iter().flat_map(|map| map.keys())
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}
