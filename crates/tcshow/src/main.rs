//! tcshow entry point.

use std::process::ExitCode;

use clap::Parser;
use tcshape_common::ShellRunner;
use tcshow::Args;

/// Initialize tracing/logging on stderr.
///
/// `RUST_LOG` takes precedence over the command-line level.
fn init_logging(log_level: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.effective_log_level());

    tracing::debug!(devices = ?args.devices, ip_version = %args.ip_version(), "Starting tcshow");

    match tcshow::run(&args, &ShellRunner::new()) {
        Ok(text) => {
            println!("{}", text);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("tcshow failed: {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
