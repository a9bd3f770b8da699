//! Parser for `tc qdisc show dev <device>` listings.

use crate::record::QdiscRecord;
use crate::tokens::{parse_node_block, split_blocks};

/// Turns one device's qdisc listing into [`QdiscRecord`] rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct QdiscParser;

impl QdiscParser {
    pub fn new() -> Self {
        Self
    }

    /// Parses `text` and tags every row with `device`.
    ///
    /// Kind-specific parameters are kept verbatim; malformed header lines
    /// are skipped.
    pub fn parse(&self, device: &str, text: &str) -> Vec<QdiscRecord> {
        let mut records = Vec::new();

        for block in split_blocks(text, "qdisc") {
            let Some(node) = parse_node_block(&block) else {
                tracing::debug!(device = %device, header = ?block.header, "Skipping malformed qdisc line");
                continue;
            };

            let record = QdiscRecord {
                device: device.to_string(),
                handle: Some(node.id),
                parent: node.parent,
                kind: node.kind,
                params: node.params,
            };
            tracing::debug!(device = %device, record = ?record, "Parsed qdisc");
            records.push(record);
        }

        records
    }
}
