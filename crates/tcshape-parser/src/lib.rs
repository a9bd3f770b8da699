//! Reconstructs the traffic-shaping rules active on a network device.
//!
//! The kernel's `tc` tool only shows shaping as three loosely linked object
//! listings (qdiscs, classes, filters). This crate parses those listings,
//! links every filter to the qdisc/class parameters it directs traffic to,
//! and keys the result by the flow the filter matches:
//!
//! ```text
//! {
//!   "eth0": {
//!     "outgoing": { "dst_network=192.0.2.0/24, protocol=ip": { "filter_id": "800::800", "rate": "1Mbit", ... } },
//!     "incoming": { ... }
//!   }
//! }
//! ```
//!
//! Incoming shaping lives on the mirror (ifb) device the root filter of the
//! real device redirects ingress traffic to. Mark-based (`fw`) filters are
//! keyed through the iptables mangle rule that sets their mark.
//!
//! # Modules
//!
//! - [`qdisc`], [`class`], [`filter`]: per-kind listing parsers
//! - [`store`]: parsed rows, one table per kind
//! - [`mangle`]: packet-mark rules from the iptables mangle table
//! - [`flow_key`]: canonical flow keys for filters
//! - [`shaping_rule`]: the assembler producing the final mapping

pub mod class;
pub mod config;
pub mod filter;
pub mod flow_key;
pub mod mangle;
pub mod params;
pub mod qdisc;
pub mod record;
pub mod shaping_rule;
pub mod store;

mod tokens;

pub use class::ClassParser;
pub use config::ParserConfig;
pub use filter::FilterParser;
pub use flow_key::FlowKeyResolver;
pub use mangle::{parse_mangle_listing, IptablesMangleReader, MangleRule, MangleRuleSource};
pub use qdisc::QdiscParser;
pub use record::{ClassRecord, FilterRecord, Params, QdiscRecord};
pub use shaping_rule::{
    DeviceShaping, ShapingRule, ShapingRuleMapping, ShapingRuleParser, SystemShapingRuleParser,
    TcParameters,
};
pub use store::{RecordStore, StoredRecord, Table};
