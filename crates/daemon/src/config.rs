// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task and node definitions.
//!
//! The daemon reads one TOML file:
//!
//! ```toml
//! [queue]
//! quiet_period_secs = 5
//! saver_delay_secs = 60      # negative disables delayed saves
//!
//! [[task]]
//! name = "compile"
//! label = "linux && !arm"
//! script = "make -j8"
//!
//! [[node]]
//! name = "agent-1"
//! labels = ["linux"]
//! executors = 4
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use fm_core::{Label, LabelError, Task};
use fm_engine::{
    ComputerSpec, NodeMode, RuntimeConfig, SaverDelay, TaskRegistry, DEFAULT_MAINTAIN_INTERVAL,
};
use serde::Deserialize;
use thiserror::Error;

use crate::shell::ShellRunner;

/// Name of the node created when the file declares none
pub const BUILT_IN_NODE: &str = "built-in";

/// Executors on the implicit built-in node
pub const BUILT_IN_EXECUTORS: usize = 2;

/// Errors loading or validating definitions
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid definitions: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("task '{task}' has an invalid label: {source}")]
    InvalidLabel { task: String, source: LabelError },

    #[error("task '{0}' is defined more than once")]
    DuplicateTask(String),

    #[error("node '{0}' is defined more than once")]
    DuplicateNode(String),

    #[error("task '{task}' blocks on unknown task '{upstream}'")]
    UnknownBlockOn { task: String, upstream: String },

    #[error("task '{0}' has an empty script")]
    EmptyScript(String),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Definitions {
    #[serde(default)]
    pub queue: QueueSection,
    #[serde(default, rename = "task")]
    pub tasks: Vec<TaskDef>,
    #[serde(default, rename = "node")]
    pub nodes: Vec<NodeDef>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueueSection {
    /// Quiet period for tasks that set none
    pub quiet_period_secs: u64,
    pub saver_delay_secs: i64,
    pub maintain_interval_ms: u64,
    /// How long running builds may finish on shutdown before being aborted
    pub shutdown_grace_secs: u64,
}

impl Default for QueueSection {
    fn default() -> Self {
        Self {
            quiet_period_secs: 0,
            saver_delay_secs: 60,
            maintain_interval_ms: DEFAULT_MAINTAIN_INTERVAL.as_millis() as u64,
            shutdown_grace_secs: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskDef {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub concurrent: bool,
    #[serde(default)]
    pub quiet_period_secs: Option<u64>,
    #[serde(default)]
    pub block_on: Vec<String>,
    /// Run with `sh -c`
    pub script: String,
    /// Exit code that marks the build unstable instead of failed
    #[serde(default)]
    pub unstable_exit_code: Option<i32>,
    #[serde(default)]
    pub estimated_duration_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeDef {
    pub name: String,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default = "default_executors")]
    pub executors: usize,
    #[serde(default)]
    pub mode: NodeMode,
}

fn default_executors() -> usize {
    1
}

impl Definitions {
    /// Load definitions from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let defs: Definitions = toml::from_str(text)?;
        defs.validate()?;
        Ok(defs)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut names = HashSet::new();
        for def in &self.tasks {
            if !names.insert(def.name.as_str()) {
                return Err(ConfigError::DuplicateTask(def.name.clone()));
            }
            if def.script.trim().is_empty() {
                return Err(ConfigError::EmptyScript(def.name.clone()));
            }
        }
        for def in &self.tasks {
            if let Some(upstream) = def.block_on.iter().find(|t| !names.contains(t.as_str())) {
                return Err(ConfigError::UnknownBlockOn {
                    task: def.name.clone(),
                    upstream: upstream.clone(),
                });
            }
        }

        let mut nodes = HashSet::new();
        for node in &self.nodes {
            if !nodes.insert(node.name.as_str()) {
                return Err(ConfigError::DuplicateNode(node.name.clone()));
            }
        }
        Ok(())
    }

    /// Register every task with a shell runner logging under `logs_dir`.
    pub fn registry(&self, logs_dir: &Path) -> Result<TaskRegistry, ConfigError> {
        let mut registry = TaskRegistry::new();
        for def in &self.tasks {
            let runner = ShellRunner::new(def.script.clone(), logs_dir.to_path_buf())
                .with_unstable_exit_code(def.unstable_exit_code);
            registry.register(def.to_task()?, Arc::new(runner));
        }
        Ok(registry)
    }

    /// Declared nodes, or the built-in node when there are none
    pub fn computers(&self) -> Vec<ComputerSpec> {
        if self.nodes.is_empty() {
            return vec![ComputerSpec::new(BUILT_IN_NODE, BUILT_IN_EXECUTORS)];
        }
        self.nodes
            .iter()
            .map(|node| {
                node.labels
                    .iter()
                    .fold(ComputerSpec::new(node.name.as_str(), node.executors), |spec, l| {
                        spec.label(l.as_str())
                    })
                    .mode(node.mode)
            })
            .collect()
    }

    pub fn runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            default_quiet_period: Duration::from_secs(self.queue.quiet_period_secs),
            saver_delay: SaverDelay::from_secs(self.queue.saver_delay_secs),
            maintain_interval: Duration::from_millis(self.queue.maintain_interval_ms),
        }
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.queue.shutdown_grace_secs)
    }
}

impl TaskDef {
    pub fn to_task(&self) -> Result<Task, ConfigError> {
        let mut task = Task::new(self.name.as_str()).with_concurrent(self.concurrent);
        if let Some(name) = &self.display_name {
            task = task.with_display_name(name.as_str());
        }
        if let Some(label) = &self.label {
            let label = Label::parse(label).map_err(|source| ConfigError::InvalidLabel {
                task: self.name.clone(),
                source,
            })?;
            task = task.with_label(label);
        }
        if let Some(secs) = self.quiet_period_secs {
            task = task.with_quiet_period(Duration::from_secs(secs));
        }
        if let Some(secs) = self.estimated_duration_secs {
            task = task.with_estimated_duration(Duration::from_secs(secs));
        }
        for upstream in &self.block_on {
            task = task.blocked_by(upstream.as_str());
        }
        Ok(task)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
