// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::{FailurePolicy, RunMode};

/// Graph file as read from TOML, before validation.
///
/// ```toml
/// [config]
/// mode = "concurrent_mixed"
/// on_failure = "cancel_outstanding"
///
/// [default]
/// cwd = "build"
///
/// [task.fetch]
/// cmd = "git fetch"
///
/// [task.compile]
/// cmd = "make"
/// after = ["fetch"]
/// blocking = true
/// ```
///
/// All sections are optional at the TOML level; validation requires at
/// least one task.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub default: DefaultSection,

    /// Keyed by node name.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// A graph file that passed validation: every `after` entry names a task,
/// no task depends on itself and the dependencies are acyclic.
///
/// Only obtainable through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub default: DefaultSection,
    pub task: BTreeMap<String, TaskConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        default: DefaultSection,
        task: BTreeMap<String, TaskConfig>,
    ) -> Self {
        Self {
            config,
            default,
            task,
        }
    }
}

/// `[config]` section: how the graph is run.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ConfigSection {
    /// `"sequential"`, `"concurrent"` (default) or `"concurrent_mixed"`.
    #[serde(default)]
    pub mode: RunMode,

    /// `"leave_running"` (default) or `"cancel_outstanding"`.
    #[serde(default)]
    pub on_failure: FailurePolicy,
}

/// `[default]` section: fallbacks for per-task settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DefaultSection {
    /// Default for `task.blocking`; `false` when unset.
    #[serde(default)]
    pub blocking: Option<bool>,

    /// Default working directory for commands.
    #[serde(default)]
    pub cwd: Option<String>,
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    /// Shell command to execute (`sh -c`).
    pub cmd: String,

    /// This task waits for every task listed here.
    #[serde(default)]
    pub after: Vec<String>,

    /// Run the command synchronously on the runner's thread instead of as a
    /// suspending task. Meant for quick commands only.
    #[serde(default)]
    pub blocking: Option<bool>,

    /// Working directory; falls back to `default.cwd`.
    #[serde(default)]
    pub cwd: Option<String>,
}

impl TaskConfig {
    pub fn effective_blocking(&self, defaults: &DefaultSection) -> bool {
        self.blocking.or(defaults.blocking).unwrap_or(false)
    }

    pub fn effective_cwd<'a>(&'a self, defaults: &'a DefaultSection) -> Option<&'a str> {
        self.cwd.as_deref().or(defaults.cwd.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_are_optional() {
        let raw: RawConfigFile = toml::from_str(
            r#"
[task.a]
cmd = "true"
"#,
        )
        .unwrap();

        assert_eq!(raw.config.mode, RunMode::Concurrent);
        assert_eq!(raw.config.on_failure, FailurePolicy::LeaveRunning);
        assert!(raw.task["a"].after.is_empty());
        assert!(!raw.task["a"].effective_blocking(&raw.default));
    }

    #[test]
    fn task_settings_override_defaults() {
        let raw: RawConfigFile = toml::from_str(
            r#"
[config]
mode = "concurrent_mixed"
on_failure = "cancel_outstanding"

[default]
blocking = true
cwd = "/tmp"

[task.a]
cmd = "true"

[task.b]
cmd = "true"
blocking = false
cwd = "/"
"#,
        )
        .unwrap();

        assert_eq!(raw.config.mode, RunMode::ConcurrentMixed);
        assert_eq!(raw.config.on_failure, FailurePolicy::CancelOutstanding);
        assert!(raw.task["a"].effective_blocking(&raw.default));
        assert_eq!(raw.task["a"].effective_cwd(&raw.default), Some("/tmp"));
        assert!(!raw.task["b"].effective_blocking(&raw.default));
        assert_eq!(raw.task["b"].effective_cwd(&raw.default), Some("/"));
    }

    #[test]
    fn unknown_mode_is_a_parse_error() {
        let parsed: Result<RawConfigFile, _> = toml::from_str(
            r#"
[config]
mode = "parallel"
"#,
        );
        assert!(parsed.is_err());
    }
}
