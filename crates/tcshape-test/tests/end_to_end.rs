//! End-to-end tests: canned host listings through the full shaping parser.

use pretty_assertions::assert_eq;
use tcshape_common::commands::{build_mangle_list_cmd, build_root_filter_cmd, build_show_cmd};
use tcshape_common::TcShapeError;
use tcshape_parser::{IptablesMangleReader, ParserConfig, ShapingRuleParser};
use tcshape_test::{
    htb_fixtures, ipv6_fixtures, mark_fixtures, mirrored_host, ScriptedRunner, ShapingScenario,
    ShapingVerifier,
};
use tcshape_types::{IpVersion, TcObjectKind, TrafficDirection};

const OUT: TrafficDirection = TrafficDirection::Outgoing;
const IN: TrafficDirection = TrafficDirection::Incoming;

fn parser_for<'a>(
    device: &str,
    config: ParserConfig,
    runner: &'a ScriptedRunner,
) -> ShapingRuleParser<&'a ScriptedRunner, IptablesMangleReader<&'a ScriptedRunner>> {
    let mangle = IptablesMangleReader::new(runner, config.ip_version);
    ShapingRuleParser::new(device, config, runner, mangle).expect("parser should be created")
}

#[test]
fn test_outgoing_and_incoming_rules() {
    let runner = mirrored_host().runner();
    let mut parser = parser_for("eth0", ParserConfig::new(), &runner);
    assert_eq!(parser.ifb_device(), Some("ifb4eth0"));

    let params = parser.get_tc_parameter().unwrap();
    assert_eq!(params.keys().collect::<Vec<_>>(), vec!["eth0"]);

    let verifier = ShapingVerifier::new(&params);
    verifier.assert_rule_count("eth0", OUT, 2).unwrap();
    verifier
        .assert_fields(
            "eth0",
            OUT,
            "dst_network=192.0.2.0/24, protocol=ip",
            &[
                ("filter_id", "800::800"),
                ("kind", "htb"),
                ("rate", "1Mbit"),
                ("ceil", "1Mbit"),
                ("delay", "10ms 1ms"),
                ("limit", "1000"),
            ],
        )
        .unwrap();
    verifier
        .assert_fields(
            "eth0",
            OUT,
            "src_network=198.51.100.0/24, dst_port=80, protocol=ip",
            &[("filter_id", "801::800"), ("rate", "500Kbit"), ("loss", "0.1%")],
        )
        .unwrap();

    verifier.assert_rule_count("eth0", IN, 1).unwrap();
    verifier
        .assert_fields(
            "eth0",
            IN,
            "src_network=203.0.113.0/24, protocol=ip",
            &[("filter_id", "800::800"), ("rate", "2Mbit"), ("delay", "50ms")],
        )
        .unwrap();
}

#[test]
fn test_mirror_listings_are_queried_on_ifb() {
    let runner = mirrored_host().runner();
    let mut parser = parser_for("eth0", ParserConfig::new(), &runner);
    parser.get_tc_parameter().unwrap();

    for kind in TcObjectKind::ALL {
        assert_eq!(runner.issued_count(&build_show_cmd(kind, "ifb4eth0")), 1);
    }
    assert_eq!(runner.issued_count(&build_root_filter_cmd("eth0")), 1);
}

#[test]
fn test_no_mirror_means_no_incoming() {
    let runner = ShapingScenario::new("outgoing_only")
        .with_device(htb_fixtures::eth0_outgoing())
        .runner();
    let mut parser = parser_for("eth0", ParserConfig::new(), &runner);
    assert_eq!(parser.ifb_device(), None);

    let params = parser.get_tc_parameter().unwrap();
    let verifier = ShapingVerifier::new(&params);
    verifier.assert_no_incoming("eth0").unwrap();
    verifier.assert_rule_count("eth0", OUT, 2).unwrap();
    assert!(parser.incoming_filters().unwrap().is_empty());
    assert!(runner.issued().iter().all(|cmd| !cmd.contains("ifb")));
}

#[test]
fn test_parse_twice_is_idempotent() {
    let runner = mirrored_host().runner();
    let mut parser = parser_for("eth0", ParserConfig::new(), &runner);

    parser.parse().unwrap();
    let first = parser.get_tc_parameter().unwrap();
    parser.parse().unwrap();
    let second = parser.get_tc_parameter().unwrap();

    assert_eq!(first, second);
    assert_eq!(parser.outgoing_filters().unwrap().len(), 2);
    assert_eq!(parser.incoming_filters().unwrap().len(), 1);
    assert_eq!(runner.issued_count(&build_show_cmd(TcObjectKind::Class, "eth0")), 1);
}

#[test]
fn test_clear_rereads_listings() {
    let runner = mirrored_host().runner();
    let mut parser = parser_for("eth0", ParserConfig::new(), &runner);

    let before = parser.get_tc_parameter().unwrap();
    parser.clear();
    let after = parser.get_tc_parameter().unwrap();

    assert_eq!(before, after);
    assert_eq!(runner.issued_count(&build_show_cmd(TcObjectKind::Filter, "eth0")), 2);
}

#[test]
fn test_mark_filter_keyed_by_mangle_rule() {
    let runner = ShapingScenario::new("marked")
        .with_device(mark_fixtures::eth0_marked())
        .with_mangle_listing(IpVersion::V4, mark_fixtures::MANGLE_LISTING)
        .runner();
    let mut parser = parser_for("eth0", ParserConfig::new(), &runner);

    let params = parser.get_tc_parameter().unwrap();
    let verifier = ShapingVerifier::new(&params);
    verifier.assert_rule_count("eth0", OUT, 1).unwrap();

    let rule = verifier
        .assert_rule_exists("eth0", OUT, "dst_network=192.0.2.10, protocol=all")
        .unwrap();
    assert_eq!(rule.filter_id, None);
    assert_eq!(rule.get("rate"), Some("3Mbit"));

    parser.get_tc_parameter().unwrap();
    assert_eq!(runner.issued_count(&build_mangle_list_cmd(IpVersion::V4)), 1);
}

#[test]
fn test_unknown_mark_is_an_error() {
    let runner = ShapingScenario::new("stale_mark")
        .with_device(mark_fixtures::eth0_marked())
        .with_mangle_listing(IpVersion::V4, mark_fixtures::MANGLE_LISTING_OTHER_MARK)
        .runner();
    let mut parser = parser_for("eth0", ParserConfig::new(), &runner);

    let err = parser.get_tc_parameter().unwrap_err();
    assert!(err.is_data_inconsistency());
    assert!(matches!(err, TcShapeError::MangleMarkNotFound { mark_id: 101 }));
}

#[test]
fn test_mangle_table_not_read_without_marks() {
    let runner = mirrored_host().runner();
    let mut parser = parser_for("eth0", ParserConfig::new(), &runner);
    parser.get_tc_parameter().unwrap();

    assert_eq!(runner.issued_count(&build_mangle_list_cmd(IpVersion::V4)), 0);
}

#[test]
fn test_ipv6_rules() {
    let runner = ShapingScenario::new("ipv6")
        .with_device(ipv6_fixtures::eth0_v6())
        .runner();
    let config = ParserConfig::new().with_ip_version(IpVersion::V6);
    let mut parser = parser_for("eth0", config, &runner);
    assert_eq!(parser.ip_version(), IpVersion::V6);

    let params = parser.get_tc_parameter().unwrap();
    ShapingVerifier::new(&params)
        .assert_fields(
            "eth0",
            OUT,
            "dst_network=2001:db8:1::/48, dst_port=443, protocol=ipv6",
            &[("filter_id", "800::800"), ("rate", "10Mbit")],
        )
        .unwrap();
}

#[test]
fn test_missing_device() {
    let runner = ScriptedRunner::new().with_missing_device("eth9");
    let mangle = IptablesMangleReader::new(&runner, IpVersion::V4);
    let err = ShapingRuleParser::new("eth9", ParserConfig::new(), &runner, mangle)
        .err()
        .expect("missing device should fail");

    assert!(err.is_device_not_found());
    assert_eq!(err.to_string(), TcShapeError::device_not_found("eth9").to_string());
}

#[test]
fn test_other_command_failure() {
    let runner = ScriptedRunner::new().with_failure(
        build_root_filter_cmd("eth0"),
        2,
        "RTNETLINK answers: Operation not permitted",
    );
    let mangle = IptablesMangleReader::new(&runner, IpVersion::V4);
    let err = ShapingRuleParser::new("eth0", ParserConfig::new(), &runner, mangle)
        .err()
        .expect("failed listing should fail");

    assert!(matches!(err, TcShapeError::ShellCommandFailed { exit_code: 2, .. }));
}

#[test]
fn test_json_shape() {
    let runner = mirrored_host().runner();
    let mut parser = parser_for("eth0", ParserConfig::new(), &runner);
    let params = parser.get_tc_parameter().unwrap();

    let json = serde_json::to_value(&params).unwrap();
    let rule = &json["eth0"]["outgoing"]["dst_network=192.0.2.0/24, protocol=ip"];
    assert_eq!(rule["filter_id"], "800::800");
    assert_eq!(rule["rate"], "1Mbit");
    assert_eq!(
        json["eth0"]["incoming"]["src_network=203.0.113.0/24, protocol=ip"]["rate"],
        "2Mbit"
    );
}
