// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Human-readable duration formatting for queue status lines.

/// Format seconds as a short duration: `"5s"`, `"2m"`, `"1h30m"`, `"3d"`.
pub fn format_elapsed(secs: u64) -> String {
    match secs {
        0..=59 => format!("{}s", secs),
        60..=3599 => format!("{}m", secs / 60),
        3600..=86399 => match (secs / 3600, (secs % 3600) / 60) {
            (h, 0) => format!("{}h", h),
            (h, m) => format!("{}h{}m", h, m),
        },
        _ => format!("{}d", secs / 86400),
    }
}

/// Format elapsed milliseconds, truncating to whole seconds.
pub fn format_elapsed_ms(ms: u64) -> String {
    format_elapsed(ms / 1000)
}

/// Format a remaining time, rounding up so a pending deadline never reads `"0s"`.
pub fn format_remaining_ms(ms: u64) -> String {
    format_elapsed(ms.div_ceil(1000))
}

#[cfg(test)]
#[path = "time_fmt_tests.rs"]
mod tests;
