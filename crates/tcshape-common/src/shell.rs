//! Shell command execution for the read-only `tc`/`iptables` listings.
//!
//! Commands are run synchronously: each call blocks until the child exits
//! and hands back its exit code and captured output. The [`CommandRunner`]
//! trait is the seam that lets the parser run against canned output in tests.
//!
//! # Example
//!
//! ```ignore
//! use tcshape_common::shell::{CommandRunner, ShellRunner, TC_CMD, shellquote};
//!
//! let cmd = format!("{} qdisc show dev {}", TC_CMD, shellquote("eth0"));
//! let result = ShellRunner::new().run(&cmd)?;
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use std::process::{Command, Stdio};

use crate::error::{TcShapeError, TcShapeResult};

/// Path to the `tc` command for traffic-control introspection.
pub const TC_CMD: &str = "/sbin/tc";

/// Path to the `iptables` command for the IPv4 mangle table.
pub const IPTABLES_CMD: &str = "/sbin/iptables";

/// Path to the `ip6tables` command for the IPv6 mangle table.
pub const IP6TABLES_CMD: &str = "/sbin/ip6tables";

/// Path to the shell used to run command strings.
pub const SH_CMD: &str = "/bin/sh";

/// Regex for characters that need escaping in shell double-quotes.
/// Matches: $, `, ", \, and newline
static SHELL_ESCAPE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"([$`"\\\n])"#).expect("Invalid regex pattern"));

/// Quotes a string for safe use in shell commands.
///
/// The string is wrapped in double quotes and every character with special
/// meaning inside double quotes (`$`, `` ` ``, `"`, `\`, newline) is escaped.
///
/// # Example
///
/// ```
/// use tcshape_common::shell::shellquote;
///
/// assert_eq!(shellquote("eth0"), "\"eth0\"");
/// assert_eq!(shellquote("with$var"), "\"with\\$var\"");
/// ```
pub fn shellquote(s: &str) -> String {
    let escaped = SHELL_ESCAPE_RE.replace_all(s, r"\$1");
    format!("\"{}\"", escaped)
}

/// Result of a shell command execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecResult {
    /// The exit code of the command (0 = success).
    pub exit_code: i32,
    /// The captured stdout output.
    pub stdout: String,
    /// The captured stderr output.
    pub stderr: String,
}

impl ExecResult {
    /// Creates a successful result carrying `stdout`.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Creates a failed result carrying `stderr`.
    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Returns true if the command succeeded (exit code 0).
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Returns the combined output (stdout + stderr) for error messages.
    pub fn combined_output(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// Runs a command string and captures its outcome.
///
/// A non-zero exit is not an error at this level; only a failure to spawn
/// the command is. Callers decide what a non-zero exit means.
pub trait CommandRunner {
    /// Runs `cmd` to completion.
    fn run(&self, cmd: &str) -> TcShapeResult<ExecResult>;

    /// Runs `cmd` and returns its stdout, failing on a non-zero exit.
    fn run_or_fail(&self, cmd: &str) -> TcShapeResult<String> {
        let result = self.run(cmd)?;
        if result.success() {
            Ok(result.stdout)
        } else {
            Err(TcShapeError::ShellCommandFailed {
                command: cmd.to_string(),
                exit_code: result.exit_code,
                output: result.combined_output(),
            })
        }
    }
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, cmd: &str) -> TcShapeResult<ExecResult> {
        (**self).run(cmd)
    }
}

/// Runs commands through `/bin/sh -c`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellRunner;

impl ShellRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for ShellRunner {
    fn run(&self, cmd: &str) -> TcShapeResult<ExecResult> {
        tracing::debug!(command = %cmd, "Executing shell command");

        let output = Command::new(SH_CMD)
            .arg("-c")
            .arg(cmd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| TcShapeError::ShellExec {
                command: cmd.to_string(),
                source: e,
            })?;

        let exit_code = output.status.code().unwrap_or(-1);
        let result = ExecResult {
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        };

        if result.success() {
            tracing::trace!(command = %cmd, exit_code = exit_code, "Command succeeded");
        } else {
            tracing::warn!(
                command = %cmd,
                exit_code = exit_code,
                stderr = %result.stderr,
                "Command failed"
            );
        }

        Ok(result)
    }
}
