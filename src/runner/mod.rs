use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{(\w+)\}\}").expect("valid placeholder regex"));

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub command: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default)]
    pub cwd: Option<String>,
}

fn default_timeout() -> u64 {
    60
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TasksFile {
    #[serde(default)]
    pub tasks: BTreeMap<String, TaskDefinition>,
}

impl TasksFile {
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {:?}", path))?;
        Self::parse(&content).with_context(|| format!("Failed to parse {:?}", path))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutcome {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Runs tasks from a TOML file as shell commands. The file is re-read on every
/// run so edits apply without a restart.
pub struct TaskRunner {
    tasks_path: PathBuf,
    variables: HashMap<String, String>,
}

impl TaskRunner {
    pub fn new(tasks_path: impl Into<PathBuf>, variables: HashMap<String, String>) -> Self {
        Self {
            tasks_path: tasks_path.into(),
            variables,
        }
    }

    pub fn tasks_path(&self) -> &Path {
        &self.tasks_path
    }

    pub async fn run(&self, name: &str) -> Result<TaskOutcome> {
        let tasks = TasksFile::load(&self.tasks_path)?;
        let Some(task) = tasks.tasks.get(name) else {
            anyhow::bail!("Unknown task: {} (not defined in {:?})", name, self.tasks_path);
        };

        let command = interpolate(&task.command, &self.variables);
        let cwd = task.cwd.as_ref().map(|c| interpolate(c, &self.variables));
        let timeout = task.timeout;

        log::info!("[task] {}: {}", name, command);

        let mut cmd = shell_command(&command);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        if let Some(dir) = cwd.filter(|d| !d.is_empty()) {
            cmd.current_dir(dir);
        }

        let output = tokio::time::timeout(std::time::Duration::from_secs(timeout), cmd.output())
            .await
            .map_err(|_| anyhow::anyhow!("Task {} timed out after {}s", name, timeout))?
            .with_context(|| format!("Task {} failed to start", name))?;

        Ok(TaskOutcome {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}

#[cfg(not(windows))]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(windows)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

/// Variables available to `{{name}}` placeholders besides the environment.
pub fn default_variables(config_dir: &Path) -> HashMap<String, String> {
    let mut variables = HashMap::new();
    if let Ok(cwd) = std::env::current_dir() {
        variables.insert("workspaceFolder".to_string(), cwd.display().to_string());
    }
    if let Some(home) = dirs::home_dir() {
        variables.insert("userHome".to_string(), home.display().to_string());
    }
    variables.insert("configDir".to_string(), config_dir.display().to_string());
    variables
}

/// Replaces `{{name}}` from `variables`, then the environment; unknown names become empty.
pub fn interpolate(template: &str, variables: &HashMap<String, String>) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &regex::Captures| {
            let key = &caps[1];
            variables
                .get(key)
                .cloned()
                .or_else(|| std::env::var(key).ok())
                .unwrap_or_default()
        })
        .to_string()
}
