#![allow(dead_code)]

use std::collections::BTreeMap;

use dagrun::config::{ConfigFile, ConfigSection, DefaultSection, RawConfigFile, TaskConfig};
use dagrun::types::{FailurePolicy, RunMode};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                default: DefaultSection::default(),
                task: BTreeMap::new(),
            },
        }
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn with_mode(mut self, mode: RunMode) -> Self {
        self.config.config.mode = mode;
        self
    }

    pub fn with_on_failure(mut self, policy: FailurePolicy) -> Self {
        self.config.config.on_failure = policy;
        self
    }

    pub fn with_default_blocking(mut self, val: bool) -> Self {
        self.config.default.blocking = Some(val);
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new(cmd: &str) -> Self {
        Self {
            task: TaskConfig {
                cmd: cmd.to_string(),
                after: vec![],
                blocking: None,
                cwd: None,
            },
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.after.push(dep.to_string());
        self
    }

    pub fn blocking(mut self, val: bool) -> Self {
        self.task.blocking = Some(val);
        self
    }

    pub fn cwd(mut self, dir: &str) -> Self {
        self.task.cwd = Some(dir.to_string());
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}
