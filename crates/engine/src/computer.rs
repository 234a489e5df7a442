// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Computers (nodes) and the executor slots they own.

use crate::executor::Executor;
use fm_core::{ComputerId, Task};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// How a computer picks up work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeMode {
    /// Runs any task whose label it satisfies, and tasks without a label
    #[default]
    Normal,
    /// Runs only tasks whose label it satisfies
    Exclusive,
}

/// Declaration of a computer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputerSpec {
    pub name: ComputerId,
    #[serde(default)]
    pub labels: BTreeSet<String>,
    pub executors: usize,
    #[serde(default)]
    pub mode: NodeMode,
}

impl ComputerSpec {
    pub fn new(name: impl Into<ComputerId>, executors: usize) -> Self {
        Self {
            name: name.into(),
            labels: BTreeSet::new(),
            executors,
            mode: NodeMode::Normal,
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.labels.insert(label.into());
        self
    }

    pub fn mode(mut self, mode: NodeMode) -> Self {
        self.mode = mode;
        self
    }
}

#[derive(Debug)]
pub struct Computer {
    name: ComputerId,
    labels: BTreeSet<String>,
    mode: NodeMode,
    online: AtomicBool,
    executors: Vec<Arc<Executor>>,
}

impl Computer {
    pub fn new(spec: ComputerSpec) -> Self {
        let mut labels = spec.labels;
        labels.insert(spec.name.to_string());
        let executors = (0..spec.executors)
            .map(|n| Arc::new(Executor::new(spec.name.clone(), n)))
            .collect();
        Self {
            name: spec.name,
            labels,
            mode: spec.mode,
            online: AtomicBool::new(true),
            executors,
        }
    }

    pub fn name(&self) -> &ComputerId {
        &self.name
    }

    /// Labels including the computer's own name
    pub fn labels(&self) -> &BTreeSet<String> {
        &self.labels
    }

    pub fn mode(&self) -> NodeMode {
        self.mode
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    pub(crate) fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn executors(&self) -> &[Arc<Executor>] {
        &self.executors
    }

    pub fn executor(&self, number: usize) -> Option<&Arc<Executor>> {
        self.executors.get(number)
    }

    /// Whether the task's label and this computer's mode allow it to run here.
    /// Does not consider whether any executor is idle.
    pub fn accepts(&self, task: &Task) -> bool {
        match &task.label {
            Some(label) => label.matches(&self.labels),
            None => self.mode == NodeMode::Normal,
        }
    }

    pub fn idle_executors(&self) -> usize {
        self.executors.iter().filter(|e| e.is_idle()).count()
    }
}

#[cfg(test)]
#[path = "computer_tests.rs"]
mod tests;
