//! Show-command builders and runners for `tc` and the mangle table.

use tcshape_types::{IpVersion, TcObjectKind};

use crate::error::{TcShapeError, TcShapeResult};
use crate::shell::{self, CommandRunner, ExecResult};

/// Message `tc` prints on stderr when the device does not exist.
pub const DEVICE_NOT_FOUND_MSG: &str = "Cannot find device";

/// Build `tc <kind> show dev <device>`
pub fn build_show_cmd(kind: TcObjectKind, device: &str) -> String {
    format!(
        "{} {} show dev {}",
        shell::TC_CMD,
        kind.as_str(),
        shell::shellquote(device)
    )
}

/// Build `tc filter show dev <device> root`
///
/// The root listing carries the ingress redirect action used to find the
/// mirror device.
pub fn build_root_filter_cmd(device: &str) -> String {
    format!("{} root", build_show_cmd(TcObjectKind::Filter, device))
}

/// Build the mangle table listing command for an IP version
pub fn build_mangle_list_cmd(ip_version: IpVersion) -> String {
    let cmd = match ip_version {
        IpVersion::V4 => shell::IPTABLES_CMD,
        IpVersion::V6 => shell::IP6TABLES_CMD,
    };
    format!("{} -t mangle --line-numbers -n -L", cmd)
}

/// Runs a show command for `device` and returns its stdout.
///
/// # Errors
///
/// * [`TcShapeError::DeviceNotFound`] if the command fails and stderr says
///   the device does not exist
/// * [`TcShapeError::ShellCommandFailed`] for any other non-zero exit
pub fn run_device_show<R: CommandRunner + ?Sized>(
    runner: &R,
    cmd: &str,
    device: &str,
) -> TcShapeResult<String> {
    let result = runner.run(cmd)?;
    check_device_result(cmd, device, result)
}

/// Runs `tc <kind> show dev <device>` and returns its stdout.
pub fn run_tc_show<R: CommandRunner + ?Sized>(
    runner: &R,
    kind: TcObjectKind,
    device: &str,
) -> TcShapeResult<String> {
    run_device_show(runner, &build_show_cmd(kind, device), device)
}

fn check_device_result(cmd: &str, device: &str, result: ExecResult) -> TcShapeResult<String> {
    if result.success() {
        return Ok(result.stdout);
    }

    if result.stderr.contains(DEVICE_NOT_FOUND_MSG) {
        return Err(TcShapeError::device_not_found(device));
    }

    Err(TcShapeError::ShellCommandFailed {
        command: cmd.to_string(),
        exit_code: result.exit_code,
        output: result.combined_output(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;

    struct CannedRunner {
        result: ExecResult,
        issued: RefCell<Vec<String>>,
    }

    impl CannedRunner {
        fn new(result: ExecResult) -> Self {
            Self {
                result,
                issued: RefCell::new(Vec::new()),
            }
        }
    }

    impl CommandRunner for CannedRunner {
        fn run(&self, cmd: &str) -> TcShapeResult<ExecResult> {
            self.issued.borrow_mut().push(cmd.to_string());
            Ok(self.result.clone())
        }
    }

    #[test]
    fn test_build_show_cmd() {
        assert_eq!(
            build_show_cmd(TcObjectKind::Qdisc, "eth0"),
            "/sbin/tc qdisc show dev \"eth0\""
        );
        assert_eq!(
            build_show_cmd(TcObjectKind::Class, "ifb4eth0"),
            "/sbin/tc class show dev \"ifb4eth0\""
        );
    }

    #[test]
    fn test_build_root_filter_cmd() {
        assert_eq!(
            build_root_filter_cmd("eth0"),
            "/sbin/tc filter show dev \"eth0\" root"
        );
    }

    #[test]
    fn test_build_mangle_list_cmd() {
        assert_eq!(
            build_mangle_list_cmd(IpVersion::V4),
            "/sbin/iptables -t mangle --line-numbers -n -L"
        );
        assert!(build_mangle_list_cmd(IpVersion::V6).starts_with("/sbin/ip6tables"));
    }

    #[test]
    fn test_run_tc_show_success() {
        let runner = CannedRunner::new(ExecResult::ok("qdisc noqueue 0: root refcnt 2"));
        let out = run_tc_show(&runner, TcObjectKind::Qdisc, "eth0").unwrap();
        assert_eq!(out, "qdisc noqueue 0: root refcnt 2");
        assert_eq!(
            runner.issued.borrow().as_slice(),
            ["/sbin/tc qdisc show dev \"eth0\"".to_string()]
        );
    }

    #[test]
    fn test_run_tc_show_device_not_found() {
        let runner = CannedRunner::new(ExecResult::failed(1, "Cannot find device \"eth9\""));
        let err = run_tc_show(&runner, TcObjectKind::Filter, "eth9").unwrap_err();
        assert!(err.is_device_not_found());
    }

    #[test]
    fn test_run_tc_show_other_failure() {
        let runner = CannedRunner::new(ExecResult::failed(2, "RTNETLINK answers: Operation not permitted"));
        match run_tc_show(&runner, TcObjectKind::Class, "eth0") {
            Err(TcShapeError::ShellCommandFailed { exit_code, output, .. }) => {
                assert_eq!(exit_code, 2);
                assert!(output.contains("Operation not permitted"));
            }
            other => panic!("Expected ShellCommandFailed, got {:?}", other),
        }
    }
}
