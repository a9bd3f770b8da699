//! Parser for `tc class show dev <device>` listings.

use crate::record::ClassRecord;
use crate::tokens::{parse_node_block, split_blocks};

/// Turns one device's class listing into [`ClassRecord`] rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassParser;

impl ClassParser {
    pub fn new() -> Self {
        Self
    }

    /// Parses `text` and tags every row with `device`.
    pub fn parse(&self, device: &str, text: &str) -> Vec<ClassRecord> {
        let mut records = Vec::new();

        for block in split_blocks(text, "class") {
            let Some(node) = parse_node_block(&block) else {
                tracing::debug!(device = %device, header = ?block.header, "Skipping malformed class line");
                continue;
            };

            let record = ClassRecord {
                device: device.to_string(),
                class_id: node.id,
                parent: node.parent,
                kind: node.kind,
                params: node.params,
            };
            tracing::debug!(device = %device, record = ?record, "Parsed class");
            records.push(record);
        }

        records
    }
}
