#![forbid(unsafe_code)]

//! `xs:dateTime` attributes. SAML requires them in UTC.

use chrono::{DateTime, SecondsFormat, Utc};
use samlkit_core::{Error, Result};
use samlkit_xml::Node;

/// Format as `2021-01-15T20:49:57Z`, with fractional seconds only when
/// they are non-zero.
pub fn format(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Instant at `secs` seconds after the Unix epoch.
pub fn from_timestamp(secs: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| Error::Other(format!("timestamp {secs} out of range")))
}

fn parse_value(node: &Node, name: &str, raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if !raw.ends_with('Z') {
        return Err(Error::schema(
            node.clark(),
            format!("attribute {name} must be a UTC dateTime, got '{raw}'"),
        ));
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| {
            Error::schema(
                node.clark(),
                format!("attribute {name} has invalid value '{raw}', expected dateTime"),
            )
        })
}

pub(crate) fn parse_attr(node: &Node, name: &str) -> Result<Option<DateTime<Utc>>> {
    node.attr(name)
        .map(|raw| parse_value(node, name, raw))
        .transpose()
}

pub(crate) fn parse_required_attr(node: &Node, name: &str) -> Result<DateTime<Utc>> {
    parse_value(node, name, node.required_attr(name)?)
}

/// Parse the text content of `node` as a dateTime.
pub(crate) fn parse_text(node: &Node) -> Result<DateTime<Utc>> {
    parse_value(node, "content", node.text())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_whole_seconds() {
        let t = from_timestamp(1610743797).unwrap();
        assert_eq!(format(&t), "2021-01-15T20:49:57Z");
    }

    #[test]
    fn test_parse_rejects_offset() {
        let node = Node::new("urn:t", "t", "E").with_attr("At", "2021-01-15T20:49:57+01:00");
        let err = parse_attr(&node, "At").unwrap_err();
        assert!(err.is_schema_violation());
    }

    #[test]
    fn test_parse_fractional() {
        let node = Node::new("urn:t", "t", "E").with_attr("At", "1984-08-26T10:01:30.000Z");
        let t = parse_required_attr(&node, "At").unwrap();
        assert_eq!(format(&t), "1984-08-26T10:01:30Z");
    }

    #[test]
    fn test_missing_required() {
        let node = Node::new("urn:t", "t", "E");
        assert!(parse_required_attr(&node, "At").unwrap_err().is_schema_violation());
        assert_eq!(parse_attr(&node, "At").unwrap(), None);
    }
}
