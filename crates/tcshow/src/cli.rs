//! Command-line arguments.

use clap::{Parser, ValueEnum};
use tcshape_parser::ParserConfig;
use tcshape_types::IpVersion;

/// Output encoding of the shaping rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

/// Show the traffic-shaping rules active on network devices
#[derive(Parser, Debug)]
#[command(name = "tcshow")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Network device to inspect (repeatable)
    #[arg(short = 'd', long = "device", required = true)]
    pub devices: Vec<String>,

    /// Read IPv6 filters and ip6tables marks
    #[arg(long)]
    pub ipv6: bool,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Print the parsed filter rows instead of the shaping rules
    #[arg(long)]
    pub filters: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "warn")]
    pub log_level: String,

    /// Shorthand for --log-level debug
    #[arg(long, conflicts_with = "quiet")]
    pub debug: bool,

    /// Only log errors
    #[arg(long)]
    pub quiet: bool,
}

impl Args {
    /// Log level after applying `--debug` and `--quiet`.
    pub fn effective_log_level(&self) -> &str {
        if self.debug {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            &self.log_level
        }
    }

    pub fn ip_version(&self) -> IpVersion {
        if self.ipv6 {
            IpVersion::V6
        } else {
            IpVersion::V4
        }
    }

    pub fn parser_config(&self) -> ParserConfig {
        ParserConfig::new().with_ip_version(self.ip_version())
    }
}
