//! Traffic-control object kinds and shaping directions.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of traffic-control object listed by `tc <kind> show`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TcObjectKind {
    /// Queueing discipline.
    Qdisc,
    /// Traffic class attached to a classful qdisc.
    Class,
    /// Classifier filter.
    Filter,
}

impl TcObjectKind {
    /// All kinds, in the order a device is parsed.
    pub const ALL: [TcObjectKind; 3] = [TcObjectKind::Class, TcObjectKind::Filter, TcObjectKind::Qdisc];

    /// Returns the `tc` sub-command name (also the store table name).
    pub const fn as_str(&self) -> &'static str {
        match self {
            TcObjectKind::Qdisc => "qdisc",
            TcObjectKind::Class => "class",
            TcObjectKind::Filter => "filter",
        }
    }
}

impl fmt::Display for TcObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TcObjectKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "qdisc" => Ok(TcObjectKind::Qdisc),
            "class" => Ok(TcObjectKind::Class),
            "filter" => Ok(TcObjectKind::Filter),
            _ => Err(ParseError::InvalidObjectKind(s.to_string())),
        }
    }
}

/// Direction of shaped traffic.
///
/// Outgoing shaping lives on the device itself; incoming shaping lives on
/// the mirror (ifb) device that ingress traffic is redirected to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrafficDirection {
    Outgoing,
    Incoming,
}

impl TrafficDirection {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TrafficDirection::Outgoing => "outgoing",
            TrafficDirection::Incoming => "incoming",
        }
    }
}

impl fmt::Display for TrafficDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrafficDirection {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "outgoing" | "out" => Ok(TrafficDirection::Outgoing),
            "incoming" | "in" => Ok(TrafficDirection::Incoming),
            _ => Err(ParseError::InvalidDirection(s.to_string())),
        }
    }
}
