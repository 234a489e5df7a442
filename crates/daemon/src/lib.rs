// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Foreman daemon library
//!
//! The `fmd` binary is a thin wrapper over these modules. The `fm` CLI uses
//! the protocol types and the state directory layout.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
mod env;
pub mod lifecycle;
pub mod listener;
pub mod protocol;
pub mod shell;

pub use lifecycle::{Config, LifecycleError};
pub use protocol::{
    ProtocolError, Request, Response, StatusSummary, DEFAULT_TIMEOUT, MAX_MESSAGE_SIZE,
    PROTOCOL_VERSION,
};

/// Startup marker prefix written to the log before anything else.
/// The CLI uses this to find where the current startup attempt begins.
/// Full format: "--- fmd: starting (pid: 12345) ---"
pub const STARTUP_MARKER_PREFIX: &str = "--- fmd: starting (pid: ";
