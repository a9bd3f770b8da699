//! Test infrastructure for traffic-shaping inspection
//!
//! Provides:
//! - Canned `tc` and `iptables` listings for realistic hosts
//! - A scripted [`CommandRunner`](tcshape_common::CommandRunner) that
//!   answers commands without spawning processes
//! - Assertion helpers for assembled shaping rules

pub mod fixtures;
mod runner;
mod verification;

pub use fixtures::*;
pub use runner::ScriptedRunner;
pub use verification::*;
