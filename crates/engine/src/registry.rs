// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registry of known tasks and their runners.
//!
//! Built once at startup and shared read-only; queue items and persisted
//! records refer to tasks by id and resolve them here.

use crate::runner::TaskRunner;
use fm_core::{Task, TaskId};
use indexmap::IndexMap;
use std::sync::Arc;

/// A task together with the runner that builds it.
#[derive(Clone)]
pub struct RegisteredTask {
    pub task: Arc<Task>,
    pub runner: Arc<dyn TaskRunner>,
}

impl std::fmt::Debug for RegisteredTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredTask")
            .field("task", &self.task.id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    tasks: IndexMap<TaskId, RegisteredTask>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task, replacing any previous task with the same id.
    pub fn register(&mut self, task: Task, runner: Arc<dyn TaskRunner>) -> Option<RegisteredTask> {
        self.tasks.insert(
            task.id.clone(),
            RegisteredTask {
                task: Arc::new(task),
                runner,
            },
        )
    }

    pub fn with(mut self, task: Task, runner: Arc<dyn TaskRunner>) -> Self {
        self.register(task, runner);
        self
    }

    pub fn get(&self, id: &str) -> Option<&RegisteredTask> {
        self.tasks.get(id)
    }

    pub fn task(&self, id: &str) -> Option<&Arc<Task>> {
        self.tasks.get(id).map(|r| &r.task)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tasks.contains_key(id)
    }

    /// Tasks in registration order
    pub fn tasks(&self) -> impl Iterator<Item = &Arc<Task>> {
        self.tasks.values().map(|r| &r.task)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
