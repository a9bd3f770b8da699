//! Common infrastructure for traffic-control shaping inspection.
//!
//! This crate provides the pieces every consumer of `tc` listings needs:
//!
//! - [`shell`]: blocking command execution behind the [`CommandRunner`] trait
//! - [`commands`]: builders for the read-only `tc`/`iptables` show commands
//! - [`error`]: error types shared by the parser and the CLI
//!
//! # Example
//!
//! ```ignore
//! use tcshape_common::{commands, ShellRunner};
//! use tcshape_types::TcObjectKind;
//!
//! let runner = ShellRunner::new();
//! let text = commands::run_tc_show(&runner, TcObjectKind::Qdisc, "eth0")?;
//! ```

pub mod commands;
pub mod error;
pub mod shell;

// Re-export commonly used items at crate root
pub use error::{TcShapeError, TcShapeResult};
pub use shell::{CommandRunner, ExecResult, ShellRunner};
