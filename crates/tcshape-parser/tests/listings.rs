//! Parsers against full listings as printed by `tc` and `tc -s`.

use pretty_assertions::assert_eq;
use tcshape_parser::{ClassParser, FilterParser, QdiscParser, RecordStore, StoredRecord};
use tcshape_parser::{ClassRecord, FilterRecord, QdiscRecord};
use tcshape_types::{IpVersion, TcObjectKind};

const QDISC_STATS: &str = "\
qdisc htb 1a1a: root refcnt 2 r2q 10 default 0x1 direct_packets_stat 0 direct_qlen 1000
 Sent 1264 bytes 14 pkt (dropped 0, overlimits 0 requeues 0)
 backlog 0b 0p requeues 0
qdisc netem 2a1a: parent 1a1a:2 limit 1000 delay 100ms  20ms 25% distribution normal loss 1% duplicate 0.5%
 Sent 0 bytes 0 pkt (dropped 0, overlimits 0 requeues 0)
 backlog 0b 0p requeues 0
qdisc tbf 2a1b: parent 1a1a:3 rate 1Mbit burst 1600b lat 50ms
qdisc ingress ffff: parent ffff:fff1 ----------------
";

const CLASS_STATS: &str = "\
class htb 1a1a:1 root rate 32Gbit ceil 32Gbit burst 0b cburst 0b
 Sent 0 bytes 0 pkt (dropped 0, overlimits 0 requeues 0)
 backlog 0b 0p requeues 0
 lended: 0 borrowed: 0 giants: 0
 tokens: 0 ctokens: 0

class htb 1a1a:2 parent 1a1a:1 leaf 2a1a: prio 0 rate 1Mbit ceil 1Mbit burst 1600b cburst 1600b
 Sent 0 bytes 0 pkt (dropped 0, overlimits 0 requeues 0)
 lended: 0 borrowed: 0 giants: 0
";

#[test]
fn test_qdisc_listing_with_statistics() {
    let rows = QdiscParser::new().parse("eth0", QDISC_STATS);
    assert_eq!(rows.len(), 4);

    let htb = &rows[0];
    assert_eq!(htb.kind, "htb");
    assert_eq!(htb.handle.as_deref(), Some("1a1a:"));
    assert_eq!(htb.parent, None);
    assert_eq!(htb.params.get("default").map(String::as_str), Some("0x1"));
    assert!(!htb.params.contains_key("refcnt"));
    assert!(!htb.params.contains_key("Sent"));

    let netem = &rows[1];
    assert_eq!(netem.parent.as_deref(), Some("1a1a:2"));
    assert_eq!(netem.params["delay"], "100ms 20ms 25%");
    assert_eq!(netem.params["distribution"], "normal");
    assert_eq!(netem.params["loss"], "1%");
    assert_eq!(netem.params["duplicate"], "0.5%");

    let tbf = &rows[2];
    assert_eq!(tbf.kind, "tbf");
    assert_eq!(tbf.params["rate"], "1Mbit");
    assert_eq!(tbf.params["lat"], "50ms");

    let ingress = &rows[3];
    assert_eq!(ingress.kind, "ingress");
    assert_eq!(ingress.parent.as_deref(), Some("ffff:fff1"));
    assert!(ingress.params.is_empty());
}

#[test]
fn test_class_listing_with_statistics() {
    let rows = ClassParser::new().parse("eth0", CLASS_STATS);
    assert_eq!(rows.len(), 2);

    assert_eq!(rows[0].class_id, "1a1a:1");
    assert_eq!(rows[0].parent, None);
    assert!(!rows[0].params.contains_key("lended:"));
    assert!(!rows[0].params.contains_key("tokens:"));

    assert_eq!(rows[1].parent.as_deref(), Some("1a1a:1"));
    assert_eq!(rows[1].params["leaf"], "2a1a:");
    assert_eq!(rows[1].params["rate"], "1Mbit");
}

#[test]
fn test_empty_listings() {
    assert!(QdiscParser::new().parse("eth0", "").is_empty());
    assert!(ClassParser::new().parse("eth0", "").is_empty());
    assert!(FilterParser::new(IpVersion::V4).parse("eth0", "").is_empty());
}

#[test]
fn test_store_holds_all_kinds() {
    let mut store = RecordStore::new();
    store.insert(QdiscParser::new().parse("eth0", QDISC_STATS));
    store.insert(ClassParser::new().parse("eth0", CLASS_STATS));

    assert!(store.has_table(QdiscRecord::KIND));
    assert!(store.has_table(ClassRecord::KIND));
    assert!(!store.has_table(TcObjectKind::Filter));
    assert_eq!(store.select::<QdiscRecord>("eth0").unwrap().len(), 4);
    assert!(store.select::<FilterRecord>("eth0").unwrap_err().is_missing_data());
}
