//! Rendering of results for the terminal.

use anyhow::Context;
use serde::Serialize;

use crate::cli::OutputFormat;

/// Serializes `value` in the requested format.
pub fn render<T: Serialize>(value: &T, format: OutputFormat) -> anyhow::Result<String> {
    let text = match format {
        OutputFormat::Json => serde_json::to_string_pretty(value).context("failed to encode JSON")?,
        OutputFormat::Yaml => serde_yaml::to_string(value).context("failed to encode YAML")?,
    };
    Ok(text.trim_end().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn sample() -> BTreeMap<&'static str, BTreeMap<&'static str, &'static str>> {
        let mut inner = BTreeMap::new();
        inner.insert("rate", "1Mbit");
        let mut outer = BTreeMap::new();
        outer.insert("eth0", inner);
        outer
    }

    #[test]
    fn test_render_json() {
        let text = render(&sample(), OutputFormat::Json).unwrap();
        assert_eq!(text, "{\n  \"eth0\": {\n    \"rate\": \"1Mbit\"\n  }\n}");
    }

    #[test]
    fn test_render_yaml() {
        let text = render(&sample(), OutputFormat::Yaml).unwrap();
        assert_eq!(text, "eth0:\n  rate: 1Mbit");
    }
}
