//! Traffic-shaping inspection CLI.
//!
//! `tcshow` rebuilds the shaping rules of one or more devices from the
//! host's `tc` and iptables listings and prints them as JSON or YAML:
//!
//! ```text
//! $ tcshow --device eth0
//! {
//!   "eth0": {
//!     "incoming": {},
//!     "outgoing": {
//!       "dst_network=192.0.2.0/24, protocol=ip": { "filter_id": "800::800", "kind": "htb", "rate": "1Mbit" }
//!     }
//!   }
//! }
//! ```

pub mod cli;
pub mod output;

use std::collections::BTreeMap;

use anyhow::Context;
use serde::Serialize;
use tcshape_common::CommandRunner;
use tcshape_parser::{FilterRecord, IptablesMangleReader, ParserConfig, ShapingRuleParser, TcParameters};

pub use cli::{Args, OutputFormat};

/// Raw filter rows of one device in both directions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceFilters {
    pub outgoing: Vec<FilterRecord>,
    pub incoming: Vec<FilterRecord>,
}

fn device_parser<'a, R: CommandRunner>(
    device: &str,
    config: ParserConfig,
    runner: &'a R,
) -> anyhow::Result<ShapingRuleParser<&'a R, IptablesMangleReader<&'a R>>> {
    let mangle = IptablesMangleReader::new(runner, config.ip_version);
    ShapingRuleParser::new(device, config, runner, mangle)
        .with_context(|| format!("failed to inspect device {}", device))
}

/// Merges the shaping rules of every device.
pub fn collect_tc_parameters<R: CommandRunner>(
    devices: &[String],
    config: ParserConfig,
    runner: &R,
) -> anyhow::Result<TcParameters> {
    let mut result = TcParameters::new();

    for device in devices {
        let mut parser = device_parser(device, config, runner)?;
        let params = parser
            .get_tc_parameter()
            .with_context(|| format!("failed to read shaping rules of {}", device))?;
        let rules: usize = params
            .values()
            .map(|shaping| shaping.outgoing.len() + shaping.incoming.len())
            .sum();
        tracing::info!(device = %device, rules = rules, "Collected shaping rules");
        result.extend(params);
    }

    Ok(result)
}

/// Collects the filter rows of every device.
pub fn collect_filters<R: CommandRunner>(
    devices: &[String],
    config: ParserConfig,
    runner: &R,
) -> anyhow::Result<BTreeMap<String, DeviceFilters>> {
    let mut result = BTreeMap::new();

    for device in devices {
        let mut parser = device_parser(device, config, runner)?;
        let filters = DeviceFilters {
            outgoing: parser
                .outgoing_filters()
                .with_context(|| format!("failed to read filters of {}", device))?,
            incoming: parser
                .incoming_filters()
                .with_context(|| format!("failed to read incoming filters of {}", device))?,
        };
        result.insert(device.clone(), filters);
    }

    Ok(result)
}

/// Runs one invocation and returns the text to print.
pub fn run<R: CommandRunner>(args: &Args, runner: &R) -> anyhow::Result<String> {
    let config = args.parser_config();

    if args.filters {
        let filters = collect_filters(&args.devices, config, runner)?;
        output::render(&filters, args.format)
    } else {
        let params = collect_tc_parameters(&args.devices, config, runner)?;
        output::render(&params, args.format)
    }
}
