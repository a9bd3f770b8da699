//! Parser for `tc filter show dev <device>` listings.
//!
//! Only header lines naming a target (`flowid` for u32, `classid` for fw)
//! produce rows; u32 hash-table headers are skipped. The `match` lines
//! under a u32 row are decoded back into networks and ports:
//!
//! | Family | Offset | Field |
//! |--------|--------|-------|
//! | IPv4 | 12 | source network |
//! | IPv4 | 16 | destination network |
//! | IPv4 | 20 | source/destination ports |
//! | IPv6 | 8, 12, 16, 20 | source network words |
//! | IPv6 | 24, 28, 32, 36 | destination network words |
//! | IPv6 | 40 | source/destination ports |

use once_cell::sync::Lazy;
use regex::Regex;
use tcshape_types::{IpPrefix, IpVersion};

use crate::record::FilterRecord;
use crate::tokens::{split_blocks, value_after, Block};

/// Classifier whose `handle` is a firewall packet mark.
const FW_CLASSIFIER: &str = "fw";

static REDIRECT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Egress Redirect to device ([^\s)]+)").expect("Invalid regex pattern")
});

mod ipv4_offset {
    pub const SRC_NETWORK: i32 = 12;
    pub const DST_NETWORK: i32 = 16;
    pub const PORTS: i32 = 20;
}

mod ipv6_offset {
    pub const SRC_NETWORK: [i32; 4] = [8, 12, 16, 20];
    pub const DST_NETWORK: [i32; 4] = [24, 28, 32, 36];
    pub const PORTS: i32 = 40;
}

/// One decoded `match <value>/<mask> at <offset>` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct U32Match {
    value: u32,
    mask: u32,
    offset: i32,
}

impl U32Match {
    fn parse(line: &str) -> Option<Self> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let [keyword, selector, at, offset, ..] = tokens.as_slice() else {
            return None;
        };
        if *keyword != "match" || *at != "at" {
            return None;
        }

        let (value, mask) = selector.split_once('/')?;
        Some(Self {
            value: u32::from_str_radix(value, 16).ok()?,
            mask: u32::from_str_radix(mask, 16).ok()?,
            offset: offset.parse().ok()?,
        })
    }
}

/// Accumulates the four 32-bit words of an IPv6 network.
#[derive(Debug, Clone, Copy, Default)]
struct Ipv6Words {
    words: [u32; 4],
    masks: [u32; 4],
    seen: bool,
}

impl Ipv6Words {
    fn set(&mut self, idx: usize, m: U32Match) {
        self.words[idx] = m.value;
        self.masks[idx] = m.mask;
        self.seen = true;
    }

    fn to_network(self) -> Option<String> {
        self.seen
            .then(|| IpPrefix::from_v6_match(self.words, self.masks).to_string())
    }
}

/// Turns one device's filter listing into [`FilterRecord`] rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterParser {
    ip_version: IpVersion,
}

impl FilterParser {
    pub fn new(ip_version: IpVersion) -> Self {
        Self { ip_version }
    }

    pub fn ip_version(&self) -> IpVersion {
        self.ip_version
    }

    /// Parses `text` and tags every row with `device`.
    pub fn parse(&self, device: &str, text: &str) -> Vec<FilterRecord> {
        let mut records = Vec::new();

        for block in split_blocks(text, "filter") {
            match self.parse_block(device, &block) {
                Some(record) => {
                    tracing::debug!(device = %device, record = ?record, "Parsed filter");
                    records.push(record);
                }
                None => {
                    tracing::trace!(device = %device, header = ?block.header, "Filter line without target");
                }
            }
        }

        records
    }

    /// Returns the mirror device named by a root filter's redirect action.
    ///
    /// `None` if the listing has no `mirred` redirect.
    pub fn parse_incoming_device(&self, text: &str) -> Option<String> {
        REDIRECT_RE
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    fn parse_block(&self, device: &str, block: &Block<'_>) -> Option<FilterRecord> {
        let header = block.header.as_slice();
        let flow_id = value_after(header, "flowid");
        let class_id = value_after(header, "classid");
        if flow_id.is_none() && class_id.is_none() {
            return None;
        }

        // `pref <n> <classifier>`
        let classifier = header
            .iter()
            .position(|t| *t == "pref")
            .and_then(|idx| header.get(idx + 2))
            .copied();
        let handle = value_after(header, "handle");

        let mut record = FilterRecord {
            parent: value_after(header, "parent").map(str::to_string),
            protocol: value_after(header, "protocol").map(str::to_string),
            priority: value_after(header, "pref").and_then(|p| p.parse().ok()),
            flow_id: flow_id.map(str::to_string),
            class_id: class_id.map(str::to_string),
            ..FilterRecord::new(device)
        };

        if classifier == Some(FW_CLASSIFIER) {
            let Some(mark) = handle.and_then(parse_mark) else {
                tracing::warn!(device = %device, handle = ?handle, "Skipping fw filter with unreadable mark");
                return None;
            };
            record.handle = Some(mark);
            record.filter_id = value_after(header, "fh").map(str::to_string);
        } else {
            record.filter_id = value_after(header, "fh")
                .or(handle)
                .map(str::to_string);
        }

        self.apply_matches(&mut record, block);
        Some(record)
    }

    fn apply_matches(&self, record: &mut FilterRecord, block: &Block<'_>) {
        let mut src_v6 = Ipv6Words::default();
        let mut dst_v6 = Ipv6Words::default();

        for m in block.body.iter().filter_map(|line| U32Match::parse(line)) {
            match self.ip_version {
                IpVersion::V4 => match m.offset {
                    ipv4_offset::SRC_NETWORK => {
                        record.src_network =
                            Some(IpPrefix::from_v4_match(m.value, m.mask).to_string());
                    }
                    ipv4_offset::DST_NETWORK => {
                        record.dst_network =
                            Some(IpPrefix::from_v4_match(m.value, m.mask).to_string());
                    }
                    ipv4_offset::PORTS => apply_ports(record, m),
                    _ => tracing::trace!(offset = m.offset, "Ignoring u32 match"),
                },
                IpVersion::V6 => {
                    if let Some(idx) = ipv6_offset::SRC_NETWORK.iter().position(|o| *o == m.offset) {
                        src_v6.set(idx, m);
                    } else if let Some(idx) =
                        ipv6_offset::DST_NETWORK.iter().position(|o| *o == m.offset)
                    {
                        dst_v6.set(idx, m);
                    } else if m.offset == ipv6_offset::PORTS {
                        apply_ports(record, m);
                    } else {
                        tracing::trace!(offset = m.offset, "Ignoring u32 match");
                    }
                }
            }
        }

        if let Some(network) = src_v6.to_network() {
            record.src_network = Some(network);
        }
        if let Some(network) = dst_v6.to_network() {
            record.dst_network = Some(network);
        }
    }
}

/// Upper half of the port word is the source port, lower half the destination.
fn apply_ports(record: &mut FilterRecord, m: U32Match) {
    let src_port = ((m.value & m.mask) >> 16) as u16;
    let dst_port = (m.value & m.mask & 0xffff) as u16;

    if src_port != 0 {
        record.src_port = Some(src_port);
    }
    if dst_port != 0 {
        record.dst_port = Some(dst_port);
    }
}

fn parse_mark(text: &str) -> Option<u32> {
    let text = text.split('/').next().unwrap_or(text);
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}
