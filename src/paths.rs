use anyhow::{Context, Result};
use std::ffi::OsString;
use std::path::PathBuf;

pub const HOME_ENV: &str = "TASK_BUTTONS_HOME";

pub fn config_dir() -> Result<PathBuf> {
    config_dir_from(std::env::var_os(HOME_ENV))
}

fn config_dir_from(home_override: Option<OsString>) -> Result<PathBuf> {
    if let Some(dir) = home_override.filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }

    dirs::config_dir()
        .context("Could not determine config directory")
        .map(|p| p.join("task-buttons"))
}

pub fn settings_path() -> Result<PathBuf> {
    config_dir().map(|p| p.join("settings.json"))
}

pub fn tasks_path() -> Result<PathBuf> {
    config_dir().map(|p| p.join("tasks.toml"))
}
