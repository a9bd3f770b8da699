//! Common types for traffic-control shaping inspection.
//!
//! This crate provides type-safe representations of the primitives shared
//! by the parser and the CLI:
//!
//! - [`IpVersion`]: the address family a host is inspected for
//! - [`IpPrefix`]: IP network prefixes (CIDR notation)
//! - [`TcObjectKind`]: the three `tc` object kinds (qdisc, class, filter)
//! - [`TrafficDirection`]: outgoing or incoming shaping

mod ip;
mod kind;

pub use ip::{IpPrefix, IpVersion};
pub use kind::{TcObjectKind, TrafficDirection};

/// Common error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid IP address format: {0}")]
    InvalidIpAddress(String),

    #[error("invalid IP prefix format: {0}")]
    InvalidIpPrefix(String),

    #[error("invalid IP version: {0} (must be 4 or 6)")]
    InvalidIpVersion(String),

    #[error("invalid traffic-control object kind: {0}")]
    InvalidObjectKind(String),

    #[error("invalid traffic direction: {0}")]
    InvalidDirection(String),
}
