#![forbid(unsafe_code)]

//! `saml:Conditions` and the conditions it may carry.

use chrono::{DateTime, Utc};
use samlkit_core::{ns, Result};
use samlkit_xml::{ChildCursor, Node, Serializable, XmlElement};

use crate::chunk::Chunk;
use crate::time;

const NOT_BEFORE: &str = "NotBefore";
const NOT_ON_OR_AFTER: &str = "NotOnOrAfter";

/// `saml:Audience`: a URI naming an intended relying party.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Audience(pub String);

impl Serializable for Audience {
    fn to_node(&self) -> Node {
        Self::new_node().with_text(self.0.clone())
    }
}

impl XmlElement for Audience {
    const NAMESPACE: &'static str = ns::SAML;
    const PREFIX: &'static str = ns::prefix::SAML;
    const LOCAL_NAME: &'static str = "Audience";

    fn from_node(node: &Node) -> Result<Self> {
        Self::expect_identity(node)?;
        let value = node.text().trim();
        if value.is_empty() {
            return Err(Self::violation("empty audience"));
        }
        Ok(Self(value.to_owned()))
    }
}

fn audiences(values: impl IntoIterator<Item = impl Into<String>>) -> Vec<Audience> {
    values.into_iter().map(|v| Audience(v.into())).collect()
}

/// `saml:AudienceRestriction`: one or more audiences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudienceRestriction {
    audiences: Vec<Audience>,
}

impl AudienceRestriction {
    pub fn new(values: impl IntoIterator<Item = impl Into<String>>) -> Result<Self> {
        let audiences = audiences(values);
        if audiences.is_empty() {
            return Err(Self::violation("at least one Audience is required"));
        }
        Ok(Self { audiences })
    }

    pub fn audiences(&self) -> &[Audience] {
        &self.audiences
    }
}

impl Serializable for AudienceRestriction {
    fn to_node(&self) -> Node {
        Self::new_node().with_children(self.audiences.iter().map(Audience::to_node))
    }
}

impl XmlElement for AudienceRestriction {
    const NAMESPACE: &'static str = ns::SAML;
    const PREFIX: &'static str = ns::prefix::SAML;
    const LOCAL_NAME: &'static str = "AudienceRestriction";

    fn from_node(node: &Node) -> Result<Self> {
        Self::expect_identity(node)?;
        let mut cursor = ChildCursor::new(node);
        let audiences = cursor.at_least_one()?;
        cursor.finish()?;
        Ok(Self { audiences })
    }
}

/// `saml:OneTimeUse`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OneTimeUse;

impl Serializable for OneTimeUse {
    fn to_node(&self) -> Node {
        Self::new_node()
    }
}

impl XmlElement for OneTimeUse {
    const NAMESPACE: &'static str = ns::SAML;
    const PREFIX: &'static str = ns::prefix::SAML;
    const LOCAL_NAME: &'static str = "OneTimeUse";

    fn from_node(node: &Node) -> Result<Self> {
        Self::expect_identity(node)?;
        ChildCursor::new(node).finish()?;
        Ok(Self)
    }
}

/// `saml:ProxyRestriction`: limits on further assertions based on this one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProxyRestriction {
    /// Maximum number of indirections, a non-negative integer.
    pub count: Option<u32>,
    pub audiences: Vec<Audience>,
}

impl ProxyRestriction {
    pub fn new(count: Option<u32>, values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            count,
            audiences: audiences(values),
        }
    }
}

impl Serializable for ProxyRestriction {
    fn to_node(&self) -> Node {
        Self::new_node()
            .with_opt_attr("Count", self.count.map(|c| c.to_string()))
            .with_children(self.audiences.iter().map(Audience::to_node))
    }
}

impl XmlElement for ProxyRestriction {
    const NAMESPACE: &'static str = ns::SAML;
    const PREFIX: &'static str = ns::prefix::SAML;
    const LOCAL_NAME: &'static str = "ProxyRestriction";

    fn from_node(node: &Node) -> Result<Self> {
        Self::expect_identity(node)?;
        let count = node.parse_attr::<u32>("Count")?;
        let mut cursor = ChildCursor::new(node);
        let audiences = cursor.many()?;
        cursor.finish()?;
        Ok(Self { count, audiences })
    }
}

/// `saml:Conditions`.
///
/// The schema is an unordered choice; children are written back grouped
/// as `Condition*`, `AudienceRestriction*`, `OneTimeUse?`,
/// `ProxyRestriction?`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Conditions {
    pub not_before: Option<DateTime<Utc>>,
    pub not_on_or_after: Option<DateTime<Utc>>,
    /// Extension `saml:Condition`s, identified by `xsi:type`.
    pub conditions: Vec<Chunk>,
    pub audience_restrictions: Vec<AudienceRestriction>,
    pub one_time_use: bool,
    pub proxy_restriction: Option<ProxyRestriction>,
}

impl Conditions {
    /// Validity window; `NotBefore` must be earlier than `NotOnOrAfter`.
    pub fn new(
        not_before: Option<DateTime<Utc>>,
        not_on_or_after: Option<DateTime<Utc>>,
    ) -> Result<Self> {
        check_window(not_before, not_on_or_after)?;
        Ok(Self {
            not_before,
            not_on_or_after,
            ..Self::default()
        })
    }

    pub fn with_audience_restriction(mut self, restriction: AudienceRestriction) -> Self {
        self.audience_restrictions.push(restriction);
        self
    }

    pub fn with_one_time_use(mut self) -> Self {
        self.one_time_use = true;
        self
    }

    pub fn with_proxy_restriction(mut self, restriction: ProxyRestriction) -> Self {
        self.proxy_restriction = Some(restriction);
        self
    }

    /// Add an extension condition. The node must be a `saml:Condition`.
    pub fn with_condition(mut self, condition: Node) -> Result<Self> {
        if !condition.is(ns::SAML, "Condition") {
            return Err(Self::violation(format!(
                "unexpected condition element {}",
                condition.clark()
            )));
        }
        self.conditions.push(Chunk::new(condition));
        Ok(self)
    }

    /// All audiences across the audience restrictions.
    pub fn audiences(&self) -> impl Iterator<Item = &str> {
        self.audience_restrictions
            .iter()
            .flat_map(|r| r.audiences())
            .map(|a| a.0.as_str())
    }
}

fn check_window(
    not_before: Option<DateTime<Utc>>,
    not_on_or_after: Option<DateTime<Utc>>,
) -> Result<()> {
    match (not_before, not_on_or_after) {
        (Some(start), Some(end)) if start >= end => Err(Conditions::violation(format!(
            "NotBefore {} is not earlier than NotOnOrAfter {}",
            time::format(&start),
            time::format(&end)
        ))),
        _ => Ok(()),
    }
}

impl Serializable for Conditions {
    fn to_node(&self) -> Node {
        Self::new_node()
            .with_opt_attr(NOT_BEFORE, self.not_before.as_ref().map(time::format))
            .with_opt_attr(NOT_ON_OR_AFTER, self.not_on_or_after.as_ref().map(time::format))
            .with_children(self.conditions.iter().map(Chunk::to_node))
            .with_children(self.audience_restrictions.iter().map(AudienceRestriction::to_node))
            .with_children(self.one_time_use.then(|| OneTimeUse.to_node()))
            .with_children(self.proxy_restriction.as_ref().map(ProxyRestriction::to_node))
    }
}

impl XmlElement for Conditions {
    const NAMESPACE: &'static str = ns::SAML;
    const PREFIX: &'static str = ns::prefix::SAML;
    const LOCAL_NAME: &'static str = "Conditions";

    fn from_node(node: &Node) -> Result<Self> {
        Self::expect_identity(node)?;
        let mut out = Self::new(
            time::parse_attr(node, NOT_BEFORE)?,
            time::parse_attr(node, NOT_ON_OR_AFTER)?,
        )?;
        let mut cursor = ChildCursor::new(node);
        while let Some(child) = cursor.next_node() {
            if child.is(ns::SAML, "Condition") {
                out.conditions.push(Chunk::new(child.clone()));
            } else if child.is(ns::SAML, AudienceRestriction::LOCAL_NAME) {
                out.audience_restrictions
                    .push(AudienceRestriction::from_node(child)?);
            } else if child.is(ns::SAML, OneTimeUse::LOCAL_NAME) {
                OneTimeUse::from_node(child)?;
                if out.one_time_use {
                    return Err(Self::violation("more than one OneTimeUse"));
                }
                out.one_time_use = true;
            } else if child.is(ns::SAML, ProxyRestriction::LOCAL_NAME) {
                if out.proxy_restriction.is_some() {
                    return Err(Self::violation("more than one ProxyRestriction"));
                }
                out.proxy_restriction = Some(ProxyRestriction::from_node(child)?);
            } else {
                return Err(Self::violation(format!("unexpected child {}", child.clark())));
            }
        }
        cursor.finish()?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use samlkit_core::Error;
    use samlkit_xml::QName;

    const AUDIENCE_RESTRICTION: &str = r#"<saml:AudienceRestriction xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion"><saml:Audience>urn:test:audience1</saml:Audience><saml:Audience>urn:test:audience2</saml:Audience></saml:AudienceRestriction>"#;

    #[test]
    fn test_audience_restriction_wire_form() {
        let r = AudienceRestriction::new(["urn:test:audience1", "urn:test:audience2"]).unwrap();
        assert_eq!(samlkit_c14n::to_string(&r.to_node()), AUDIENCE_RESTRICTION);
        let parsed = samlkit_xml::element::from_bytes::<AudienceRestriction>(
            AUDIENCE_RESTRICTION.as_bytes(),
        )
        .unwrap();
        assert_eq!(parsed, r);
    }

    #[test]
    fn test_audience_restriction_needs_audience() {
        let empty: [&str; 0] = [];
        assert!(AudienceRestriction::new(empty).unwrap_err().is_schema_violation());
        let err = AudienceRestriction::from_node(&AudienceRestriction::new_node()).unwrap_err();
        assert!(err.is_schema_violation());
    }

    #[test]
    fn test_proxy_restriction_count() {
        let r = ProxyRestriction::new(Some(2), ["urn:test:audience1", "urn:test:audience2"]);
        let node = r.to_node();
        assert_eq!(node.attr("Count"), Some("2"));
        assert_eq!(ProxyRestriction::from_node(&node).unwrap(), r);

        let negative = ProxyRestriction::new_node().with_attr("Count", "-1");
        match ProxyRestriction::from_node(&negative).unwrap_err() {
            Error::SchemaViolation { element, reason } => {
                assert_eq!(element, format!("{{{}}}ProxyRestriction", ns::SAML));
                assert!(reason.contains("Count"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_window_must_be_ordered() {
        let t1 = time::from_timestamp(1_600_000_000).unwrap();
        let t2 = time::from_timestamp(1_600_000_600).unwrap();
        assert!(Conditions::new(Some(t1), Some(t2)).is_ok());
        assert!(Conditions::new(Some(t2), Some(t1)).unwrap_err().is_schema_violation());
        assert!(Conditions::new(Some(t1), Some(t1)).is_err());
    }

    #[test]
    fn test_children_written_grouped() {
        let node = Conditions::new_node()
            .with_child(OneTimeUse.to_node())
            .with_child(AudienceRestriction::new(["urn:a"]).unwrap().to_node());
        let c = Conditions::from_node(&node).unwrap();
        assert!(c.one_time_use);
        assert_eq!(c.audiences().collect::<Vec<_>>(), vec!["urn:a"]);
        let names: Vec<_> = c
            .to_node()
            .children
            .iter()
            .map(|n| n.local_name.clone())
            .collect();
        assert_eq!(names, vec!["AudienceRestriction", "OneTimeUse"]);
    }

    #[test]
    fn test_single_one_time_use() {
        let node = Conditions::new_node()
            .with_child(OneTimeUse.to_node())
            .with_child(OneTimeUse.to_node());
        let err = Conditions::from_node(&node).unwrap_err();
        assert!(err.to_string().contains("OneTimeUse"));
    }

    #[test]
    fn test_round_trip_with_everything() {
        let condition = Node::new(ns::SAML, "saml", "Condition")
            .with_namespace("ext", "urn:x-test:ext")
            .with_ns_attr(ns::XSI, "xsi", "type", "ext:Delegation");
        let c = Conditions::new(
            Some(time::from_timestamp(1_600_000_000).unwrap()),
            Some(time::from_timestamp(1_600_000_600).unwrap()),
        )
        .unwrap()
        .with_condition(condition)
        .unwrap()
        .with_audience_restriction(AudienceRestriction::new(["urn:a", "urn:b"]).unwrap())
        .with_one_time_use()
        .with_proxy_restriction(ProxyRestriction::new(Some(0), ["urn:c"]));
        assert_eq!(Conditions::from_node(&c.to_node()).unwrap(), c);
        assert_eq!(
            c.to_node().attr("NotBefore"),
            Some("2020-09-13T12:26:40Z")
        );
    }

    #[test]
    fn test_extension_condition_wire_round_trip() {
        let condition = Node::new(ns::SAML, "saml", "Condition")
            .with_namespace("ext", "urn:x-test:ext")
            .with_ns_attr(ns::XSI, "xsi", "type", "ext:Delegation");
        let c = Conditions::default()
            .with_condition(condition)
            .unwrap()
            .with_one_time_use();
        let wire = samlkit_c14n::render(&c.to_node());
        let parsed = Conditions::from_node(&samlkit_xml::parse(&wire).unwrap()).unwrap();
        assert_eq!(parsed, c);
        assert_eq!(
            parsed.conditions[0].xsi_type().unwrap(),
            Some(QName::new("urn:x-test:ext", "Delegation"))
        );
    }
}
