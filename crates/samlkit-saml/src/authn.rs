#![forbid(unsafe_code)]

//! `saml:AuthnStatement`.

use chrono::{DateTime, Utc};
use samlkit_core::{ns, Result};
use samlkit_xml::{ChildCursor, Node, Serializable, XmlElement};

use crate::time;

const CLASS_REF: &str = "AuthnContextClassRef";
const DECL_REF: &str = "AuthnContextDeclRef";
const AUTHENTICATING_AUTHORITY: &str = "AuthenticatingAuthority";

fn text_node(local: &str, value: &str) -> Node {
    Node::new(ns::SAML, ns::prefix::SAML, local).with_text(value)
}

/// `saml:SubjectLocality`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubjectLocality {
    pub address: Option<String>,
    pub dns_name: Option<String>,
}

impl Serializable for SubjectLocality {
    fn to_node(&self) -> Node {
        Self::new_node()
            .with_opt_attr("Address", self.address.clone())
            .with_opt_attr("DNSName", self.dns_name.clone())
    }
}

impl XmlElement for SubjectLocality {
    const NAMESPACE: &'static str = ns::SAML;
    const PREFIX: &'static str = ns::prefix::SAML;
    const LOCAL_NAME: &'static str = "SubjectLocality";

    fn from_node(node: &Node) -> Result<Self> {
        Self::expect_identity(node)?;
        ChildCursor::new(node).finish()?;
        Ok(Self {
            address: node.attr("Address").map(str::to_owned),
            dns_name: node.attr("DNSName").map(str::to_owned),
        })
    }
}

/// `saml:AuthnContext` by reference. Inline `AuthnContextDecl` is not
/// supported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthnContext {
    class_ref: Option<String>,
    decl_ref: Option<String>,
    pub authenticating_authorities: Vec<String>,
}

impl AuthnContext {
    pub const PASSWORD_PROTECTED_TRANSPORT: &'static str =
        "urn:oasis:names:tc:SAML:2.0:ac:classes:PasswordProtectedTransport";

    pub fn new(class_ref: Option<String>, decl_ref: Option<String>) -> Result<Self> {
        if class_ref.is_none() && decl_ref.is_none() {
            return Err(Self::violation(
                "AuthnContextClassRef or AuthnContextDeclRef is required",
            ));
        }
        Ok(Self {
            class_ref,
            decl_ref,
            authenticating_authorities: Vec::new(),
        })
    }

    pub fn from_class_ref(class_ref: impl Into<String>) -> Self {
        Self {
            class_ref: Some(class_ref.into()),
            decl_ref: None,
            authenticating_authorities: Vec::new(),
        }
    }

    pub fn class_ref(&self) -> Option<&str> {
        self.class_ref.as_deref()
    }

    pub fn decl_ref(&self) -> Option<&str> {
        self.decl_ref.as_deref()
    }
}

impl Serializable for AuthnContext {
    fn to_node(&self) -> Node {
        Self::new_node()
            .with_children(self.class_ref.as_deref().map(|v| text_node(CLASS_REF, v)))
            .with_children(self.decl_ref.as_deref().map(|v| text_node(DECL_REF, v)))
            .with_children(
                self.authenticating_authorities
                    .iter()
                    .map(|v| text_node(AUTHENTICATING_AUTHORITY, v)),
            )
    }
}

impl XmlElement for AuthnContext {
    const NAMESPACE: &'static str = ns::SAML;
    const PREFIX: &'static str = ns::prefix::SAML;
    const LOCAL_NAME: &'static str = "AuthnContext";

    fn from_node(node: &Node) -> Result<Self> {
        Self::expect_identity(node)?;
        let mut cursor = ChildCursor::new(node);
        let class_ref = cursor
            .optional_node(ns::SAML, CLASS_REF)
            .map(|n| n.text().trim().to_owned());
        let decl_ref = cursor
            .optional_node(ns::SAML, DECL_REF)
            .map(|n| n.text().trim().to_owned());
        let mut authorities = Vec::new();
        while let Some(n) = cursor.optional_node(ns::SAML, AUTHENTICATING_AUTHORITY) {
            authorities.push(n.text().trim().to_owned());
        }
        cursor.finish()?;
        let mut ctx = Self::new(class_ref, decl_ref)?;
        ctx.authenticating_authorities = authorities;
        Ok(ctx)
    }
}

/// `saml:AuthnStatement`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthnStatement {
    pub authn_instant: DateTime<Utc>,
    pub session_index: Option<String>,
    pub session_not_on_or_after: Option<DateTime<Utc>>,
    pub subject_locality: Option<SubjectLocality>,
    pub authn_context: AuthnContext,
}

impl AuthnStatement {
    pub fn new(authn_instant: DateTime<Utc>, authn_context: AuthnContext) -> Self {
        Self {
            authn_instant,
            session_index: None,
            session_not_on_or_after: None,
            subject_locality: None,
            authn_context,
        }
    }
}

impl Serializable for AuthnStatement {
    fn to_node(&self) -> Node {
        Self::new_node()
            .with_attr("AuthnInstant", time::format(&self.authn_instant))
            .with_opt_attr("SessionIndex", self.session_index.clone())
            .with_opt_attr(
                "SessionNotOnOrAfter",
                self.session_not_on_or_after.as_ref().map(time::format),
            )
            .with_children(self.subject_locality.as_ref().map(SubjectLocality::to_node))
            .with_child(self.authn_context.to_node())
    }
}

impl XmlElement for AuthnStatement {
    const NAMESPACE: &'static str = ns::SAML;
    const PREFIX: &'static str = ns::prefix::SAML;
    const LOCAL_NAME: &'static str = "AuthnStatement";

    fn from_node(node: &Node) -> Result<Self> {
        Self::expect_identity(node)?;
        let mut cursor = ChildCursor::new(node);
        let subject_locality = cursor.optional()?;
        let authn_context = cursor.one()?;
        cursor.finish()?;
        Ok(Self {
            authn_instant: time::parse_required_attr(node, "AuthnInstant")?,
            session_index: node.attr("SessionIndex").map(str::to_owned),
            session_not_on_or_after: time::parse_attr(node, "SessionNotOnOrAfter")?,
            subject_locality,
            authn_context,
        })
    }
}
