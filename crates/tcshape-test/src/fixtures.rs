//! Test fixtures for common shaping setups
//!
//! Listings are written the way `tc` and `iptables` print them on a host
//! configured with htb classes, netem qdiscs and u32/fw filters.

use tcshape_common::commands::{build_root_filter_cmd, build_show_cmd};
use tcshape_types::{IpVersion, TcObjectKind};

use crate::runner::ScriptedRunner;

/// The four `tc` listings of one device
#[derive(Debug, Clone, Default)]
pub struct DeviceListings {
    /// Device name
    pub device: String,
    /// `tc qdisc show` output
    pub qdiscs: String,
    /// `tc class show` output
    pub classes: String,
    /// `tc filter show` output
    pub filters: String,
    /// `tc filter show ... root` output
    pub root_filters: String,
}

impl DeviceListings {
    /// Create a device with empty listings
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            ..Default::default()
        }
    }

    /// Set the qdisc listing
    pub fn with_qdiscs(mut self, text: impl Into<String>) -> Self {
        self.qdiscs = text.into();
        self
    }

    /// Set the class listing
    pub fn with_classes(mut self, text: impl Into<String>) -> Self {
        self.classes = text.into();
        self
    }

    /// Set the filter listing
    pub fn with_filters(mut self, text: impl Into<String>) -> Self {
        self.filters = text.into();
        self
    }

    /// Set the root filter listing
    pub fn with_root_filters(mut self, text: impl Into<String>) -> Self {
        self.root_filters = text.into();
        self
    }

    /// Command and output pairs for every listing
    pub fn commands(&self) -> Vec<(String, String)> {
        vec![
            (build_show_cmd(TcObjectKind::Qdisc, &self.device), self.qdiscs.clone()),
            (build_show_cmd(TcObjectKind::Class, &self.device), self.classes.clone()),
            (build_show_cmd(TcObjectKind::Filter, &self.device), self.filters.clone()),
            (build_root_filter_cmd(&self.device), self.root_filters.clone()),
        ]
    }
}

/// Outgoing htb/netem shaping on eth0
pub mod htb_fixtures {
    use super::*;

    pub const ETH0_QDISCS: &str = "\
qdisc htb 1a1a: root refcnt 2 r2q 10 default 0x1 direct_packets_stat 0 direct_qlen 1000
qdisc netem 2a1a: parent 1a1a:2 limit 1000 delay 10ms  1ms
qdisc netem 2a1b: parent 1a1a:3 limit 1000 loss 0.1%
";

    pub const ETH0_CLASSES: &str = "\
class htb 1a1a:1 root rate 32Gbit ceil 32Gbit burst 0b cburst 0b
class htb 1a1a:2 parent 1a1a:1 leaf 2a1a: prio 0 rate 1Mbit ceil 1Mbit burst 1600b cburst 1600b
class htb 1a1a:3 parent 1a1a:1 leaf 2a1b: prio 0 rate 500Kbit ceil 500Kbit burst 1599b cburst 1599b
";

    pub const ETH0_FILTERS: &str = "\
filter parent 1a1a: protocol ip pref 1 u32 chain 0
filter parent 1a1a: protocol ip pref 1 u32 chain 0 fh 800: ht divisor 1
filter parent 1a1a: protocol ip pref 1 u32 chain 0 fh 800::800 order 2048 key ht 800 bkt 0 flowid 1a1a:2 not_in_hw
  match c0000200/ffffff00 at 16
filter parent 1a1a: protocol ip pref 2 u32 chain 0
filter parent 1a1a: protocol ip pref 2 u32 chain 0 fh 801: ht divisor 1
filter parent 1a1a: protocol ip pref 2 u32 chain 0 fh 801::800 order 2048 key ht 801 bkt 0 flowid 1a1a:3 not_in_hw
  match c6336400/ffffff00 at 12
  match 00000050/0000ffff at 20
";

    /// Root ingress filter redirecting everything to ifb4eth0
    pub const ETH0_MIRROR_ROOT_FILTERS: &str = "\
filter parent ffff: protocol all pref 49152 u32 chain 0
filter parent ffff: protocol all pref 49152 u32 chain 0 fh 800: ht divisor 1
filter parent ffff: protocol all pref 49152 u32 chain 0 fh 800::800 order 2048 key ht 800 bkt 0 terminal flowid ??? not_in_hw
  match 00000000/00000000 at 0
\taction order 1: mirred (Egress Redirect to device ifb4eth0) stolen
\tindex 1 ref 1 bind 1
";

    pub const IFB_QDISCS: &str = "\
qdisc htb 1f87: root refcnt 2 r2q 10 default 0x1 direct_packets_stat 0 direct_qlen 32
qdisc netem 2f87: parent 1f87:2 limit 1000 delay 50ms
";

    pub const IFB_CLASSES: &str = "\
class htb 1f87:1 root rate 32Gbit ceil 32Gbit burst 0b cburst 0b
class htb 1f87:2 parent 1f87:1 leaf 2f87: prio 0 rate 2Mbit ceil 2Mbit burst 1600b cburst 1600b
";

    pub const IFB_FILTERS: &str = "\
filter parent 1f87: protocol ip pref 1 u32 chain 0
filter parent 1f87: protocol ip pref 1 u32 chain 0 fh 800: ht divisor 1
filter parent 1f87: protocol ip pref 1 u32 chain 0 fh 800::800 order 2048 key ht 800 bkt 0 flowid 1f87:2 not_in_hw
  match cb007100/ffffff00 at 12
";

    /// eth0 with outgoing shaping only
    pub fn eth0_outgoing() -> DeviceListings {
        DeviceListings::new("eth0")
            .with_qdiscs(ETH0_QDISCS)
            .with_classes(ETH0_CLASSES)
            .with_filters(ETH0_FILTERS)
    }

    /// eth0 with outgoing shaping and ingress redirected to ifb4eth0
    pub fn eth0_with_mirror() -> DeviceListings {
        eth0_outgoing().with_root_filters(ETH0_MIRROR_ROOT_FILTERS)
    }

    /// The mirror device of [`eth0_with_mirror`]
    pub fn ifb4eth0() -> DeviceListings {
        DeviceListings::new("ifb4eth0")
            .with_qdiscs(IFB_QDISCS)
            .with_classes(IFB_CLASSES)
            .with_filters(IFB_FILTERS)
    }
}

/// Mark-based (fw) shaping resolved through iptables mangle rules
pub mod mark_fixtures {
    use super::*;

    pub const ETH0_CLASSES: &str = "\
class htb 1a1a:1 root rate 32Gbit ceil 32Gbit burst 0b cburst 0b
class htb 1a1a:65 parent 1a1a:1 prio 0 rate 3Mbit ceil 3Mbit burst 1600b cburst 1600b
";

    pub const ETH0_FILTERS: &str = "\
filter parent 1a1a: protocol ip pref 1 fw chain 0
filter parent 1a1a: protocol ip pref 1 fw chain 0 handle 0x65 classid 1a1a:65
";

    pub const MANGLE_LISTING: &str = "\
Chain PREROUTING (policy ACCEPT)
num  target     prot opt source               destination

Chain OUTPUT (policy ACCEPT)
num  target     prot opt source               destination
1    MARK       all  --  0.0.0.0/0            192.0.2.10           MARK set 0x65
";

    /// Mangle listing without the mark the filter refers to
    pub const MANGLE_LISTING_OTHER_MARK: &str = "\
Chain OUTPUT (policy ACCEPT)
num  target     prot opt source               destination
1    MARK       all  --  0.0.0.0/0            192.0.2.10           MARK set 0x66
";

    pub fn eth0_marked() -> DeviceListings {
        DeviceListings::new("eth0")
            .with_qdiscs("qdisc htb 1a1a: root refcnt 2 r2q 10 default 0x1 direct_packets_stat 0 direct_qlen 1000\n")
            .with_classes(ETH0_CLASSES)
            .with_filters(ETH0_FILTERS)
    }
}

/// IPv6 u32 shaping on eth0
pub mod ipv6_fixtures {
    use super::*;

    pub const ETH0_CLASSES: &str = "\
class htb 1a1a:1 root rate 32Gbit ceil 32Gbit burst 0b cburst 0b
class htb 1a1a:2 parent 1a1a:1 prio 0 rate 10Mbit ceil 10Mbit burst 1600b cburst 1600b
";

    pub const ETH0_FILTERS: &str = "\
filter parent 1a1a: protocol ipv6 pref 1 u32 chain 0
filter parent 1a1a: protocol ipv6 pref 1 u32 chain 0 fh 800: ht divisor 1
filter parent 1a1a: protocol ipv6 pref 1 u32 chain 0 fh 800::800 order 2048 key ht 800 bkt 0 flowid 1a1a:2 not_in_hw
  match 20010db8/ffffffff at 24
  match 00010000/ffff0000 at 28
  match 000001bb/0000ffff at 40
";

    pub fn eth0_v6() -> DeviceListings {
        DeviceListings::new("eth0")
            .with_qdiscs("qdisc htb 1a1a: root refcnt 2 r2q 10 default 0x1 direct_packets_stat 0 direct_qlen 1000\n")
            .with_classes(ETH0_CLASSES)
            .with_filters(ETH0_FILTERS)
    }
}

/// Host-level scenario: several devices plus an optional mangle table
#[derive(Debug, Clone)]
pub struct ShapingScenario {
    /// Scenario name
    pub name: String,
    /// Devices present on the host
    pub devices: Vec<DeviceListings>,
    /// Mangle table listing, if the scenario uses marks
    pub mangle_listing: Option<(IpVersion, String)>,
}

impl ShapingScenario {
    /// Create an empty scenario
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            devices: Vec::new(),
            mangle_listing: None,
        }
    }

    /// Add a device
    pub fn with_device(mut self, device: DeviceListings) -> Self {
        self.devices.push(device);
        self
    }

    /// Set the mangle table listing
    pub fn with_mangle_listing(mut self, ip_version: IpVersion, listing: impl Into<String>) -> Self {
        self.mangle_listing = Some((ip_version, listing.into()));
        self
    }

    /// Build a runner answering every listing of the scenario
    pub fn runner(&self) -> ScriptedRunner {
        let mut runner = self
            .devices
            .iter()
            .fold(ScriptedRunner::new(), |runner, device| runner.with_device(device));

        if let Some((ip_version, listing)) = &self.mangle_listing {
            runner = runner.with_mangle_listing(*ip_version, listing.clone());
        }
        runner
    }
}

/// eth0 shaped in both directions through ifb4eth0
pub fn mirrored_host() -> ShapingScenario {
    ShapingScenario::new("mirrored_host")
        .with_device(htb_fixtures::eth0_with_mirror())
        .with_device(htb_fixtures::ifb4eth0())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tcshape_common::CommandRunner;

    #[test]
    fn test_device_listings_commands() {
        let listings = htb_fixtures::eth0_outgoing();
        let commands = listings.commands();
        assert_eq!(commands.len(), 4);
        assert_eq!(commands[0].0, "/sbin/tc qdisc show dev \"eth0\"");
        assert_eq!(commands[3].0, "/sbin/tc filter show dev \"eth0\" root");
        assert!(commands[3].1.is_empty());
    }

    #[test]
    fn test_scenario_runner() {
        let scenario = mirrored_host();
        assert_eq!(scenario.devices.len(), 2);

        let runner = scenario.runner();
        let result = runner
            .run(&build_show_cmd(TcObjectKind::Class, "ifb4eth0"))
            .unwrap();
        assert_eq!(result.stdout, htb_fixtures::IFB_CLASSES);
    }
}
