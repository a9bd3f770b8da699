//! Field names of parsed records and shaping rules.
//!
//! Downstream consumers match on these names, so they are fixed.

/// Device the record was read from.
pub const DEVICE: &str = "device";

/// Qdisc handle (e.g. `1a1a:`).
pub const HANDLE: &str = "handle";

/// Parent qdisc or class identifier.
pub const PARENT: &str = "parent";

/// Scheduler or classifier algorithm (e.g. `htb`, `netem`).
pub const KIND: &str = "kind";

/// Class identifier (e.g. `1a1a:1`).
pub const CLASS_ID: &str = "classid";

/// Target class of a u32 filter.
pub const FLOW_ID: &str = "flowid";

/// Filter identifier (`fh` of a u32 filter).
pub const FILTER_ID: &str = "filter_id";

/// Filter preference.
pub const PRIORITY: &str = "priority";

/// Filter protocol (e.g. `ip`, `ipv6`, `all`).
pub const PROTOCOL: &str = "protocol";

/// Source network matched by a filter.
pub const SRC_NETWORK: &str = "src_network";

/// Destination network matched by a filter.
pub const DST_NETWORK: &str = "dst_network";

/// Source port matched by a filter.
pub const SRC_PORT: &str = "src_port";

/// Destination port matched by a filter.
pub const DST_PORT: &str = "dst_port";

/// Root marker on a qdisc/class header line.
pub(crate) const ROOT: &str = "root";
