//! Parser configuration.

use serde::{Deserialize, Serialize};
use tcshape_types::IpVersion;

/// Settings shared by every device a [`ShapingRuleParser`](crate::ShapingRuleParser) reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParserConfig {
    /// Address family of the filters and mangle rules to read.
    #[serde(default)]
    pub ip_version: IpVersion,
}

impl ParserConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the IP version (builder pattern)
    pub fn with_ip_version(mut self, ip_version: IpVersion) -> Self {
        self.ip_version = ip_version;
        self
    }
}
