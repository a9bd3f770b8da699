//! Scripted command runner
//!
//! Answers `tc`/`iptables` commands from a table of canned results so that
//! parsers can be driven end to end without touching the host.

use std::cell::RefCell;
use std::collections::HashMap;

use tcshape_common::commands::{build_mangle_list_cmd, build_root_filter_cmd, build_show_cmd};
use tcshape_common::{CommandRunner, ExecResult, TcShapeResult};
use tcshape_types::{IpVersion, TcObjectKind};

use crate::fixtures::DeviceListings;

/// Command runner returning canned results.
///
/// Commands without a scripted result succeed with empty output, the way
/// `tc` lists a device that has nothing configured. Every issued command
/// is recorded in order.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    responses: HashMap<String, ExecResult>,
    issued: RefCell<Vec<String>>,
}

impl ScriptedRunner {
    /// Create an empty runner
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a successful command
    pub fn with_output(mut self, cmd: impl Into<String>, stdout: impl Into<String>) -> Self {
        self.responses.insert(cmd.into(), ExecResult::ok(stdout));
        self
    }

    /// Script a failing command
    pub fn with_failure(
        mut self,
        cmd: impl Into<String>,
        exit_code: i32,
        stderr: impl Into<String>,
    ) -> Self {
        self.responses
            .insert(cmd.into(), ExecResult::failed(exit_code, stderr));
        self
    }

    /// Script every listing of one device
    pub fn with_device(mut self, listings: &DeviceListings) -> Self {
        for (cmd, stdout) in listings.commands() {
            self = self.with_output(cmd, stdout);
        }
        self
    }

    /// Script every listing of a device that does not exist
    pub fn with_missing_device(mut self, device: &str) -> Self {
        let stderr = format!("Cannot find device \"{}\"", device);
        self = self.with_failure(build_root_filter_cmd(device), 1, stderr.clone());
        for kind in TcObjectKind::ALL {
            self = self.with_failure(build_show_cmd(kind, device), 1, stderr.clone());
        }
        self
    }

    /// Script the mangle table listing
    pub fn with_mangle_listing(self, ip_version: IpVersion, listing: impl Into<String>) -> Self {
        self.with_output(build_mangle_list_cmd(ip_version), listing)
    }

    /// Commands issued so far, in order
    pub fn issued(&self) -> Vec<String> {
        self.issued.borrow().clone()
    }

    /// Number of times `cmd` was issued
    pub fn issued_count(&self, cmd: &str) -> usize {
        self.issued.borrow().iter().filter(|c| *c == cmd).count()
    }

    /// Forget the recorded commands
    pub fn reset_issued(&self) {
        self.issued.borrow_mut().clear();
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, cmd: &str) -> TcShapeResult<ExecResult> {
        self.issued.borrow_mut().push(cmd.to_string());

        match self.responses.get(cmd) {
            Some(result) => Ok(result.clone()),
            None => {
                tracing::trace!(cmd = %cmd, "Unscripted command, returning empty output");
                Ok(ExecResult::ok(""))
            }
        }
    }
}
