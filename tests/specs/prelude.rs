//! Test helpers for behavioral specifications.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

// Aggressive timeouts for fast tests.
const FM_TIMEOUT_CONNECT_MS: &str = "2000";
const FM_TIMEOUT_EXIT_MS: &str = "1000";
const FM_TIMEOUT_IPC_MS: &str = "1000";
const FM_CONNECT_POLL_MS: &str = "5";
const FM_MAINTAIN_MS: &str = "20";

pub const SPEC_POLL_INTERVAL_MS: u64 = 10;
pub const SPEC_WAIT_MAX_MS: u64 = 3000;

/// Binaries of the workspace, wherever cargo put them.
fn binary_path(name: &str) -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    let standard = manifest_dir.join("target/debug").join(name);
    if standard.exists() {
        return standard;
    }

    // The test binary lives at target/debug/deps/specs-<hash>
    if let Ok(exe) = std::env::current_exe() {
        if let Some(debug_dir) = exe.parent().and_then(|d| d.parent()) {
            let fallback = debug_dir.join(name);
            if fallback.exists() {
                return fallback;
            }
        }
    }

    assert_cmd::cargo::cargo_bin(name)
}

pub fn fm_binary() -> PathBuf {
    binary_path("fm")
}

pub fn fmd_binary() -> PathBuf {
    binary_path("fmd")
}

/// A command for `fmd` itself
pub fn fmd_cmd() -> Command {
    Command::new(fmd_binary())
}

/// Create a CLI builder for fm commands
pub fn cli() -> CliBuilder {
    CliBuilder::new()
}

/// High-level CLI builder for fluent test assertions
pub struct CliBuilder {
    args: Vec<String>,
    envs: Vec<(String, String)>,
}

impl CliBuilder {
    fn new() -> Self {
        Self {
            args: Vec::new(),
            envs: vec![
                (
                    "FM_DAEMON_BINARY".into(),
                    fmd_binary().to_string_lossy().into(),
                ),
                ("FM_TIMEOUT_CONNECT_MS".into(), FM_TIMEOUT_CONNECT_MS.into()),
                ("FM_TIMEOUT_EXIT_MS".into(), FM_TIMEOUT_EXIT_MS.into()),
                ("FM_TIMEOUT_IPC_MS".into(), FM_TIMEOUT_IPC_MS.into()),
                ("FM_CONNECT_POLL_MS".into(), FM_CONNECT_POLL_MS.into()),
                ("FM_MAINTAIN_MS".into(), FM_MAINTAIN_MS.into()),
                ("NO_COLOR".into(), "1".into()),
            ],
        }
    }

    pub fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    pub fn env(mut self, key: &str, value: impl AsRef<Path>) -> Self {
        self.envs.push((
            key.to_string(),
            value.as_ref().to_string_lossy().to_string(),
        ));
        self
    }

    /// Build the command without running it
    pub fn command(self) -> Command {
        let mut cmd = Command::new(fm_binary());
        cmd.args(&self.args);

        // A developer's own daemon must never leak into tests
        cmd.env_remove("FM_CONFIG");
        cmd.env_remove("FM_STATE_DIR");

        for (key, value) in self.envs {
            cmd.env(key, value);
        }
        cmd
    }

    pub fn output(self) -> RunAssert {
        let output = self.command().output().expect("command should run");
        RunAssert { output }
    }

    /// Run and expect success (exit code 0)
    pub fn passes(self) -> RunAssert {
        let run = self.output();
        assert!(
            run.output.status.success(),
            "expected command to pass, got exit code {:?}\nstdout: {}\nstderr: {}",
            run.output.status.code(),
            run.stdout(),
            run.stderr()
        );
        run
    }

    /// Run and expect failure (non-zero exit code)
    pub fn fails(self) -> RunAssert {
        let run = self.output();
        assert!(
            !run.output.status.success(),
            "expected command to fail, but it passed\nstdout: {}\nstderr: {}",
            run.stdout(),
            run.stderr()
        );
        run
    }
}

/// Result of a CLI run for chaining assertions
pub struct RunAssert {
    output: Output,
}

impl RunAssert {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    pub fn code(&self) -> Option<i32> {
        self.output.status.code()
    }

    /// Exact stdout, with a diff on failure
    pub fn stdout_eq(self, expected: &str) -> Self {
        similar_asserts::assert_eq!(self.stdout(), expected);
        self
    }

    pub fn stdout_has(self, expected: &str) -> Self {
        let stdout = self.stdout();
        assert!(
            stdout.contains(expected),
            "stdout does not contain '{}'\nstdout: {}",
            expected,
            stdout
        );
        self
    }

    pub fn stdout_lacks(self, unexpected: &str) -> Self {
        let stdout = self.stdout();
        assert!(
            !stdout.contains(unexpected),
            "stdout should not contain '{}'\nstdout: {}",
            unexpected,
            stdout
        );
        self
    }

    pub fn stderr_has(self, expected: &str) -> Self {
        let stderr = self.stderr();
        assert!(
            stderr.contains(expected),
            "stderr does not contain '{}'\nstderr: {}",
            expected,
            stderr
        );
        self
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.stdout()).unwrap_or_else(|e| {
            panic!("stdout is not JSON ({e}):\n{}", self.stdout())
        })
    }
}

/// Poll a condition until it returns true or timeout is reached.
pub fn wait_for<F>(timeout_ms: u64, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let start = std::time::Instant::now();
    let timeout = std::time::Duration::from_millis(timeout_ms);
    let poll_interval = std::time::Duration::from_millis(SPEC_POLL_INTERVAL_MS);

    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        std::thread::sleep(poll_interval);
    }
    false
}

/// An isolated state directory with its own daemon.
pub struct Foreman {
    state_dir: tempfile::TempDir,
}

impl Foreman {
    /// No definitions file: one built-in node, no tasks
    pub fn empty() -> Self {
        Self {
            state_dir: tempfile::tempdir().unwrap(),
        }
    }

    /// With the given definitions file
    pub fn with_definitions(definitions: &str) -> Self {
        let foreman = Self::empty();
        std::fs::write(foreman.state_path().join("foreman.toml"), definitions).unwrap();
        foreman
    }

    pub fn state_path(&self) -> &Path {
        self.state_dir.path()
    }

    /// Run fm against this state directory
    pub fn fm(&self) -> CliBuilder {
        cli().env("FM_STATE_DIR", self.state_path())
    }

    pub fn daemon_log(&self) -> String {
        std::fs::read_to_string(self.state_path().join("daemon.log"))
            .unwrap_or_else(|_| "(no daemon log)".to_string())
    }

    pub fn pid_file_exists(&self) -> bool {
        self.state_path().join("daemon.pid").exists()
    }
}

impl Drop for Foreman {
    fn drop(&mut self) {
        // No-op when the daemon is not running
        let mut cmd = self.fm().args(&["daemon", "stop"]).command();
        cmd.stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null());
        let _ = cmd.status();
    }
}

/// Tasks that finish immediately, one per result the shell can produce
pub const BUILD_DEFINITIONS: &str = r#"
[queue]
quiet_period_secs = 0
saver_delay_secs = 0

[[task]]
name = "pass"
script = "true"

[[task]]
name = "fail"
script = "exit 1"

[[task]]
name = "slow"
quiet_period_secs = 3600
script = "true"

[[node]]
name = "built-in"
executors = 1
"#;
