//! Flow-key derivation for filter rows.
//!
//! A flow key names the traffic a filter matches as `name=value` pairs
//! joined by `", "`, always in the same field order, so that two reads of
//! the same configuration produce identical keys.

use tcshape_common::{TcShapeError, TcShapeResult};
use tcshape_types::IpVersion;

use crate::mangle::MangleRule;
use crate::params;
use crate::record::FilterRecord;

const KEY_SEPARATOR: &str = ", ";

/// Computes flow keys for one IP version.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlowKeyResolver {
    ip_version: IpVersion,
}

impl FlowKeyResolver {
    pub fn new(ip_version: IpVersion) -> Self {
        Self { ip_version }
    }

    /// Derives the flow key of `filter`.
    ///
    /// Mark-based filters (those with a `handle`) are resolved through the
    /// mangle rule carrying the same mark; all others use their own match
    /// fields. An empty key means the filter matches nothing specific.
    ///
    /// # Errors
    ///
    /// [`TcShapeError::MangleMarkNotFound`] if no mangle rule sets the
    /// filter's mark.
    pub fn flow_key(&self, filter: &FilterRecord, mangle_rules: &[MangleRule]) -> TcShapeResult<String> {
        match filter.handle {
            Some(mark_id) => {
                let rule = mangle_rules
                    .iter()
                    .find(|rule| rule.mark_id == mark_id)
                    .ok_or(TcShapeError::MangleMarkNotFound { mark_id })?;
                Ok(mangle_key(rule))
            }
            None => Ok(self.match_key(filter)),
        }
    }

    fn match_key(&self, filter: &FilterRecord) -> String {
        let mut items = Vec::new();

        let networks = [
            (params::SRC_NETWORK, filter.src_network.as_deref()),
            (params::DST_NETWORK, filter.dst_network.as_deref()),
        ];
        for (name, network) in networks {
            if let Some(network) = network.filter(|n| is_meaningful_network(n, self.ip_version)) {
                items.push(format!("{}={}", name, network));
            }
        }

        if let Some(port) = filter.src_port {
            items.push(format!("{}={}", params::SRC_PORT, port));
        }
        if let Some(port) = filter.dst_port {
            items.push(format!("{}={}", params::DST_PORT, port));
        }
        if let Some(protocol) = filter.protocol.as_deref().filter(|p| !p.is_empty()) {
            items.push(format!("{}={}", params::PROTOCOL, protocol));
        }

        items.join(KEY_SEPARATOR)
    }
}

fn is_meaningful_network(network: &str, ip_version: IpVersion) -> bool {
    !network.trim().is_empty() && !ip_version.is_anywhere_network(network)
}

/// Destination, then source (if any), then protocol.
fn mangle_key(rule: &MangleRule) -> String {
    let mut items = vec![format!("{}={}", params::DST_NETWORK, rule.destination)];
    if let Some(source) = rule.source.as_deref().filter(|s| !s.is_empty()) {
        items.push(format!("{}={}", params::SRC_NETWORK, source));
    }
    items.push(format!("{}={}", params::PROTOCOL, rule.protocol));
    items.join(KEY_SEPARATOR)
}
