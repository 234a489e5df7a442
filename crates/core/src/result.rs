// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build results ordered by severity.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Terminal result of a build.
///
/// Variants are declared in increasing severity so the derived `Ord`
/// is the severity ordering: `Success < Unstable < Failure < Aborted < NotBuilt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildResult {
    Success,
    Unstable,
    Failure,
    Aborted,
    NotBuilt,
}

impl BuildResult {
    pub const ALL: [BuildResult; 5] = [
        BuildResult::Success,
        BuildResult::Unstable,
        BuildResult::Failure,
        BuildResult::Aborted,
        BuildResult::NotBuilt,
    ];

    /// The more severe of two results
    pub fn worse(self, other: BuildResult) -> BuildResult {
        self.max(other)
    }

    pub fn is_worse_than(self, other: BuildResult) -> bool {
        self > other
    }

    /// Whether the build completed (possibly with test failures)
    pub fn is_completed(self) -> bool {
        matches!(self, BuildResult::Success | BuildResult::Unstable)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BuildResult::Success => "SUCCESS",
            BuildResult::Unstable => "UNSTABLE",
            BuildResult::Failure => "FAILURE",
            BuildResult::Aborted => "ABORTED",
            BuildResult::NotBuilt => "NOT_BUILT",
        }
    }
}

impl fmt::Display for BuildResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown build result: {0}")]
pub struct ParseResultError(String);

impl FromStr for BuildResult {
    type Err = ParseResultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        BuildResult::ALL
            .into_iter()
            .find(|r| r.as_str() == normalized)
            .ok_or_else(|| ParseResultError(s.to_string()))
    }
}

#[cfg(test)]
#[path = "result_tests.rs"]
mod tests;
