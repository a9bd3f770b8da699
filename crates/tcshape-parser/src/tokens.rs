//! Line grammar shared by the `tc` listing parsers.
//!
//! A listing is a sequence of blocks. A block opens with a line starting
//! with the object keyword (`qdisc`, `class`, `filter`) and owns every
//! following indented line until the next header.

use crate::params;
use crate::record::Params;

/// Keys whose value may be a word rather than a number or handle
/// (`bandwidth unlimited`, `linklayer atm`, `loss state 1% 2%`).
const WORD_VALUED_KEYS: &[&str] = &[
    "distribution",
    "mode",
    "bandwidth",
    "linklayer",
    "loss",
];

/// Runtime noise that is not part of the configuration.
const IGNORED_KEYS: &[&str] = &["refcnt", "dev"];

/// Continuation lines carrying statistics (only printed with `-s`).
const STAT_PREFIXES: &[&str] = &[
    "Sent ",
    "backlog ",
    "lended:",
    "tokens:",
    "maxpacket ",
    "new_flows_len ",
    "requeues ",
];

/// One header line plus its continuation lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Block<'a> {
    /// Header tokens, keyword excluded.
    pub header: Vec<&'a str>,
    /// Trimmed, non-empty continuation lines.
    pub body: Vec<&'a str>,
}

/// Splits a listing into blocks opened by `keyword`.
///
/// Lines before the first header are dropped.
pub(crate) fn split_blocks<'a>(text: &'a str, keyword: &str) -> Vec<Block<'a>> {
    let mut blocks: Vec<Block<'a>> = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let mut tokens = trimmed.split_whitespace();
        let is_header = !line.starts_with(char::is_whitespace) && tokens.next() == Some(keyword);

        if is_header {
            blocks.push(Block {
                header: tokens.collect(),
                body: Vec::new(),
            });
        } else if let Some(block) = blocks.last_mut() {
            block.body.push(trimmed);
        } else {
            tracing::trace!(line = %trimmed, "Skipping line outside any {} block", keyword);
        }
    }

    blocks
}

/// Returns the token following the first occurrence of `key`.
pub(crate) fn value_after<'a>(tokens: &[&'a str], key: &str) -> Option<&'a str> {
    tokens
        .iter()
        .position(|t| *t == key)
        .and_then(|idx| tokens.get(idx + 1))
        .copied()
}

fn is_value_token(token: &str) -> bool {
    let mut chars = token.chars();
    match chars.next() {
        Some(c) if c.is_ascii_digit() => true,
        Some('-') | Some('+') => chars.next().is_some_and(|c| c.is_ascii_digit()),
        Some(_) => token.contains(':'),
        None => false,
    }
}

fn is_separator(token: &str) -> bool {
    token.len() > 1 && token.chars().all(|c| c == '-')
}

fn is_statistics_line(line: &str) -> bool {
    STAT_PREFIXES.iter().any(|prefix| line.starts_with(prefix))
}

/// Tokenizes opaque `key value...` pairs into `params`.
///
/// Values are kept verbatim; multi-token values are joined with a single
/// space and flags get an empty value. Later keys overwrite earlier ones.
pub(crate) fn collect_params<'a, I>(tokens: I, params: &mut Params)
where
    I: IntoIterator<Item = &'a str>,
{
    let tokens: Vec<&str> = tokens.into_iter().collect();
    let mut idx = 0;

    while idx < tokens.len() {
        let key = tokens[idx];
        idx += 1;

        if is_separator(key) || is_value_token(key) {
            continue;
        }

        let mut values = Vec::new();
        if WORD_VALUED_KEYS.contains(&key)
            && idx < tokens.len()
            && !is_separator(tokens[idx])
            && !is_value_token(tokens[idx])
        {
            values.push(tokens[idx]);
            idx += 1;
        }
        while idx < tokens.len() && is_value_token(tokens[idx]) {
            values.push(tokens[idx]);
            idx += 1;
        }

        if IGNORED_KEYS.contains(&key) {
            continue;
        }
        params.insert(key.to_string(), values.join(" "));
    }
}

/// Header shared by qdisc and class lines: `<kind> <id> (root | parent <id>) ...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NodeHeader {
    pub kind: String,
    pub id: String,
    pub parent: Option<String>,
    pub params: Params,
}

/// Parses a qdisc/class block into its header fields and opaque params.
///
/// Returns `None` if the header lacks a kind or identifier.
pub(crate) fn parse_node_block(block: &Block<'_>) -> Option<NodeHeader> {
    let (kind, id) = match block.header.as_slice() {
        [kind, id, ..] => (*kind, *id),
        _ => return None,
    };

    let mut params = Params::new();
    collect_params(block.header[2..].iter().copied(), &mut params);
    for line in block.body.iter().filter(|l| !is_statistics_line(l)) {
        collect_params(line.split_whitespace(), &mut params);
    }

    params.remove(params::ROOT);
    let parent = params.remove(params::PARENT).filter(|p| !p.is_empty());

    Some(NodeHeader {
        kind: kind.to_string(),
        id: id.to_string(),
        parent,
        params,
    })
}
