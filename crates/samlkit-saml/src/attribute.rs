#![forbid(unsafe_code)]

//! `saml:Attribute`, `saml:AttributeValue` and `saml:AttributeStatement`.

use chrono::{DateTime, Utc};
use samlkit_core::{ns, Result};
use samlkit_xml::{ChildCursor, Node, QName, Serializable, XmlElement};

use crate::encrypted::EncryptedAttribute;
use crate::time;

/// Attribute names are URIs.
pub const NAMEFORMAT_URI: &str = "urn:oasis:names:tc:SAML:2.0:attrname-format:uri";
pub const NAMEFORMAT_BASIC: &str = "urn:oasis:names:tc:SAML:2.0:attrname-format:basic";
pub const NAMEFORMAT_UNSPECIFIED: &str =
    "urn:oasis:names:tc:SAML:2.0:attrname-format:unspecified";

/// `saml:AttributeValue`, by content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    /// `xsi:type="xs:string"`.
    String(String),
    /// `xsi:type="xs:integer"`.
    Integer(i64),
    /// `xsi:type="xs:dateTime"`.
    DateTime(DateTime<Utc>),
    /// Any other `xsi:type`, kept as text.
    Typed {
        type_name: QName,
        prefix: String,
        value: String,
    },
    /// Text without an `xsi:type`.
    Text(String),
    /// `xsi:nil="true"`.
    Nil,
    /// Element content.
    Elements(Vec<Node>),
}

impl AttributeValue {
    fn typed_node(prefix: &str, namespace: &str, local: &str) -> Node {
        Self::new_node()
            .with_namespace(prefix, namespace)
            .with_ns_attr(ns::XSI, ns::prefix::XSI, "type", format!("{prefix}:{local}"))
    }

    /// The value as text, when it has a textual form.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::String(s) | Self::Text(s) => Some(s.clone()),
            Self::Typed { value, .. } => Some(value.clone()),
            Self::Integer(i) => Some(i.to_string()),
            Self::DateTime(dt) => Some(time::format(dt)),
            Self::Nil | Self::Elements(_) => None,
        }
    }
}

impl Serializable for AttributeValue {
    fn to_node(&self) -> Node {
        match self {
            Self::String(s) => {
                Self::typed_node(ns::prefix::XS, ns::XS, "string").with_text(s.clone())
            }
            Self::Integer(i) => {
                Self::typed_node(ns::prefix::XS, ns::XS, "integer").with_text(i.to_string())
            }
            Self::DateTime(dt) => {
                Self::typed_node(ns::prefix::XS, ns::XS, "dateTime").with_text(time::format(dt))
            }
            Self::Typed {
                type_name,
                prefix,
                value,
            } => Self::typed_node(prefix, &type_name.namespace, &type_name.local_name)
                .with_text(value.clone()),
            Self::Text(s) => Self::new_node().with_text(s.clone()),
            Self::Nil => Self::new_node().with_ns_attr(ns::XSI, ns::prefix::XSI, "nil", "true"),
            Self::Elements(children) => Self::new_node().with_children(children.iter().cloned()),
        }
    }
}

impl XmlElement for AttributeValue {
    const NAMESPACE: &'static str = ns::SAML;
    const PREFIX: &'static str = ns::prefix::SAML;
    const LOCAL_NAME: &'static str = "AttributeValue";

    fn from_node(node: &Node) -> Result<Self> {
        Self::expect_identity(node)?;
        if matches!(node.attr_ns(ns::XSI, "nil"), Some("true" | "1")) {
            if !node.children.is_empty() || !node.text().is_empty() {
                return Err(Self::violation("nil value with content"));
            }
            return Ok(Self::Nil);
        }

        let Some(raw_type) = node.attr_ns(ns::XSI, "type") else {
            return Ok(if node.children.is_empty() {
                Self::Text(node.text().to_owned())
            } else {
                Self::Elements(node.children.clone())
            });
        };

        if let Some(child) = node.children.first() {
            return Err(Self::violation(format!(
                "unexpected child {} in a {raw_type} value",
                child.clark()
            )));
        }
        let type_name = node.resolve_qname_value(raw_type)?;
        let text = node.text();
        if type_name.namespace == ns::XS {
            match type_name.local_name.as_str() {
                "string" => return Ok(Self::String(text.to_owned())),
                "integer" => {
                    return text.trim().parse().map(Self::Integer).map_err(|_| {
                        Self::violation(format!("'{text}' is not an xs:integer"))
                    })
                }
                "dateTime" => return time::parse_text(node).map(Self::DateTime),
                _ => {}
            }
        }
        let prefix = raw_type
            .trim()
            .split_once(':')
            .map(|(p, _)| p.to_owned())
            .unwrap_or_default();
        Ok(Self::Typed {
            type_name,
            prefix,
            value: text.to_owned(),
        })
    }
}

/// `saml:Attribute`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub name_format: Option<String>,
    pub friendly_name: Option<String>,
    pub values: Vec<AttributeValue>,
}

impl Attribute {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            name_format: None,
            friendly_name: None,
            values: Vec::new(),
        }
    }

    pub fn with_name_format(mut self, format: impl Into<String>) -> Self {
        self.name_format = Some(format.into());
        self
    }

    pub fn with_friendly_name(mut self, name: impl Into<String>) -> Self {
        self.friendly_name = Some(name.into());
        self
    }

    pub fn with_value(mut self, value: AttributeValue) -> Self {
        self.values.push(value);
        self
    }
}

impl Serializable for Attribute {
    fn to_node(&self) -> Node {
        Self::new_node()
            .with_attr("Name", self.name.clone())
            .with_opt_attr("NameFormat", self.name_format.clone())
            .with_opt_attr("FriendlyName", self.friendly_name.clone())
            .with_children(self.values.iter().map(AttributeValue::to_node))
    }
}

impl XmlElement for Attribute {
    const NAMESPACE: &'static str = ns::SAML;
    const PREFIX: &'static str = ns::prefix::SAML;
    const LOCAL_NAME: &'static str = "Attribute";

    fn from_node(node: &Node) -> Result<Self> {
        Self::expect_identity(node)?;
        let mut cursor = ChildCursor::new(node);
        let values = cursor.many()?;
        cursor.finish()?;
        Ok(Self {
            name: node.required_attr("Name")?.to_owned(),
            name_format: node.attr("NameFormat").map(str::to_owned),
            friendly_name: node.attr("FriendlyName").map(str::to_owned),
            values,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeStatementItem {
    Attribute(Attribute),
    Encrypted(EncryptedAttribute),
}

impl AttributeStatementItem {
    fn to_node(&self) -> Node {
        match self {
            Self::Attribute(a) => a.to_node(),
            Self::Encrypted(e) => e.to_node(),
        }
    }
}

/// `saml:AttributeStatement`: one or more attributes, plain or
/// encrypted, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeStatement {
    items: Vec<AttributeStatementItem>,
}

impl AttributeStatement {
    pub fn new(items: Vec<AttributeStatementItem>) -> Result<Self> {
        if items.is_empty() {
            return Err(Self::violation(
                "at least one Attribute or EncryptedAttribute is required",
            ));
        }
        Ok(Self { items })
    }

    pub fn from_attributes(attributes: impl IntoIterator<Item = Attribute>) -> Result<Self> {
        Self::new(
            attributes
                .into_iter()
                .map(AttributeStatementItem::Attribute)
                .collect(),
        )
    }

    pub fn items(&self) -> &[AttributeStatementItem] {
        &self.items
    }

    /// The plaintext attributes.
    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.items.iter().filter_map(|item| match item {
            AttributeStatementItem::Attribute(a) => Some(a),
            AttributeStatementItem::Encrypted(_) => None,
        })
    }
}

impl Serializable for AttributeStatement {
    fn to_node(&self) -> Node {
        Self::new_node().with_children(self.items.iter().map(AttributeStatementItem::to_node))
    }
}

impl XmlElement for AttributeStatement {
    const NAMESPACE: &'static str = ns::SAML;
    const PREFIX: &'static str = ns::prefix::SAML;
    const LOCAL_NAME: &'static str = "AttributeStatement";

    fn from_node(node: &Node) -> Result<Self> {
        Self::expect_identity(node)?;
        let mut items = Vec::new();
        let mut cursor = ChildCursor::new(node);
        while let Some(child) = cursor.next_node() {
            let item = if child.is(ns::SAML, Attribute::LOCAL_NAME) {
                AttributeStatementItem::Attribute(Attribute::from_node(child)?)
            } else if child.is(ns::SAML, EncryptedAttribute::LOCAL_NAME) {
                AttributeStatementItem::Encrypted(EncryptedAttribute::from_node(child)?)
            } else {
                return Err(Self::violation(format!("unexpected child {}", child.clark())));
            };
            items.push(item);
        }
        cursor.finish()?;
        Self::new(items)
    }
}
