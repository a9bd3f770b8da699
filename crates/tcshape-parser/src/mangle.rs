//! Firewall packet-mark rules from the iptables mangle table.
//!
//! `fw` filters match packets by the mark a mangle rule set on them, so the
//! flow they shape can only be recovered from the rule itself.
//!
//! # Listing format
//!
//! ```text
//! Chain OUTPUT (policy ACCEPT)
//! num  target     prot opt source               destination
//! 1    MARK       all  --  0.0.0.0/0            203.0.113.5          MARK set 0xa
//! ```
//!
//! `ip6tables` prints the same layout with an empty `opt` column.

use serde::Serialize;
use tcshape_common::commands::build_mangle_list_cmd;
use tcshape_common::{CommandRunner, TcShapeError, TcShapeResult};
use tcshape_types::IpVersion;

const MARK_TARGET: &str = "MARK";
const OPT_VALUES: &[&str] = &["--", "-f", "!f"];

/// A mangle rule tagging matching packets with `mark_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MangleRule {
    pub mark_id: u32,
    pub destination: String,
    /// `None` when the rule matches any source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub protocol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_number: Option<u32>,
}

impl MangleRule {
    /// Create a rule with mark, destination and protocol
    pub fn new(mark_id: u32, destination: impl Into<String>, protocol: impl Into<String>) -> Self {
        Self {
            mark_id,
            destination: destination.into(),
            source: None,
            protocol: protocol.into(),
            chain: None,
            line_number: None,
        }
    }

    /// Set the source network (builder pattern)
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Set the chain the rule lives in (builder pattern)
    pub fn with_chain(mut self, chain: impl Into<String>) -> Self {
        self.chain = Some(chain.into());
        self
    }
}

/// Supplies the mangle rules that mark-based filters are resolved against.
pub trait MangleRuleSource {
    fn mangle_rules(&self) -> TcShapeResult<Vec<MangleRule>>;
}

impl MangleRuleSource for Vec<MangleRule> {
    fn mangle_rules(&self) -> TcShapeResult<Vec<MangleRule>> {
        Ok(self.clone())
    }
}

impl MangleRuleSource for [MangleRule] {
    fn mangle_rules(&self) -> TcShapeResult<Vec<MangleRule>> {
        Ok(self.to_vec())
    }
}

impl<S: MangleRuleSource + ?Sized> MangleRuleSource for &S {
    fn mangle_rules(&self) -> TcShapeResult<Vec<MangleRule>> {
        (**self).mangle_rules()
    }
}

/// Reads mangle rules by listing the live iptables mangle table.
#[derive(Debug, Clone)]
pub struct IptablesMangleReader<R> {
    runner: R,
    ip_version: IpVersion,
}

impl<R: CommandRunner> IptablesMangleReader<R> {
    pub fn new(runner: R, ip_version: IpVersion) -> Self {
        Self { runner, ip_version }
    }
}

impl<R: CommandRunner> MangleRuleSource for IptablesMangleReader<R> {
    fn mangle_rules(&self) -> TcShapeResult<Vec<MangleRule>> {
        let cmd = build_mangle_list_cmd(self.ip_version);
        let listing = self.runner.run_or_fail(&cmd)?;
        parse_mangle_listing(&listing, self.ip_version)
    }
}

/// Parses an `iptables -t mangle --line-numbers -n -L` listing.
///
/// Only `MARK` rows are returned. A source equal to the anywhere network is
/// stored as `None`.
///
/// # Errors
///
/// [`TcShapeError::InvalidRecord`] for a `MARK` row whose columns or mark
/// value cannot be read.
pub fn parse_mangle_listing(text: &str, ip_version: IpVersion) -> TcShapeResult<Vec<MangleRule>> {
    let mut rules = Vec::new();
    let mut chain: Option<String> = None;

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let tokens: Vec<&str> = line.split_whitespace().collect();

        if tokens[0] == "Chain" {
            chain = tokens.get(1).map(|c| c.to_string());
            continue;
        }
        if tokens.get(1) != Some(&MARK_TARGET) {
            continue;
        }
        let Ok(line_number) = tokens[0].parse::<u32>() else {
            continue;
        };

        let Some(mut rule) = parse_mark_row(line, &tokens, ip_version)? else {
            tracing::debug!(line = %line, "Skipping MARK rule without a mark value");
            continue;
        };
        rule.line_number = Some(line_number);
        rule.chain = chain.clone();
        tracing::debug!(rule = ?rule, "Parsed mangle rule");
        rules.push(rule);
    }

    Ok(rules)
}

/// Returns `None` for a row whose mark cannot be read and is not a `set`/`xset` row.
fn parse_mark_row(
    line: &str,
    tokens: &[&str],
    ip_version: IpVersion,
) -> TcShapeResult<Option<MangleRule>> {
    let invalid = |message: &str| TcShapeError::invalid_record("mangle", line, message);

    let protocol = tokens.get(2).ok_or_else(|| invalid("missing protocol"))?;
    let mut idx = 3;
    if tokens.get(idx).is_some_and(|t| OPT_VALUES.contains(t)) {
        idx += 1;
    }
    let source = tokens.get(idx).ok_or_else(|| invalid("missing source"))?;
    let destination = tokens
        .get(idx + 1)
        .ok_or_else(|| invalid("missing destination"))?;

    // `MARK set 0xa` / `MARK xset 0xa/0xffffffff`; other verbs (`or`, `and`,
    // `xor`) carry their operand as the trailing token.
    let set_value = tokens
        .iter()
        .position(|t| *t == "set" || *t == "xset")
        .map(|pos| tokens.get(pos + 1).ok_or_else(|| invalid("missing mark value")))
        .transpose()?;

    let mark_id = match set_value {
        Some(value) => parse_hex_mark(value).ok_or_else(|| invalid("unreadable mark value"))?,
        None => match tokens.last().and_then(|t| parse_hex_mark(t)) {
            Some(mark_id) => mark_id,
            None => return Ok(None),
        },
    };

    let mut rule = MangleRule::new(mark_id, *destination, *protocol);
    if !is_any_source(source, ip_version) {
        rule.source = Some(source.to_string());
    }
    Ok(Some(rule))
}

fn is_any_source(source: &str, ip_version: IpVersion) -> bool {
    source == "anywhere" || ip_version.is_anywhere_network(source)
}

fn parse_hex_mark(text: &str) -> Option<u32> {
    let value = text.split('/').next()?;
    let hex = value.strip_prefix("0x")?;
    u32::from_str_radix(hex, 16).ok()
}
