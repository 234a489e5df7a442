// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fm-core: data model for the Foreman build queue

pub mod cause;
pub mod clock;
pub mod id;
pub mod item;
pub mod label;
pub mod result;
pub mod task;
pub mod time_fmt;

#[cfg(any(test, feature = "test-support"))]
#[allow(clippy::panic)]
pub mod test_support;

pub use cause::{parameters_of, Action, Cause, CauseOfInterruption};
pub use clock::{Clock, FakeClock, SystemClock};
pub use id::{ComputerId, ItemId, TaskId};
pub use item::{CauseOfBlockage, LeftItem, LeftOutcome, QueueItem, Stage};
pub use label::{Label, LabelError, LabelExpr};
pub use result::{BuildResult, ParseResultError};
pub use task::Task;
pub use time_fmt::{format_elapsed, format_elapsed_ms, format_remaining_ms};
