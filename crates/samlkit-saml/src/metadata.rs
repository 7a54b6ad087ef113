#![forbid(unsafe_code)]

//! Metadata elements: `md:NameIDFormat`, `mdattr:EntityAttributes` and
//! the algorithm support extension (`alg:DigestMethod`,
//! `alg:SigningMethod`).

use samlkit_core::{ns, Result};
use samlkit_xml::{ChildCursor, Node, Serializable, XmlElement};

use crate::assertion::Assertion;
use crate::attribute::Attribute;
use crate::chunk::Chunk;

/// `md:NameIDFormat`: a name identifier format URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameIdFormat(String);

impl NameIdFormat {
    pub fn new(format: impl Into<String>) -> Result<Self> {
        let format = format.into();
        if format.trim().is_empty() {
            return Err(Self::violation("empty NameIDFormat"));
        }
        Ok(Self(format))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Serializable for NameIdFormat {
    fn to_node(&self) -> Node {
        Self::new_node().with_text(self.0.clone())
    }
}

impl XmlElement for NameIdFormat {
    const NAMESPACE: &'static str = ns::MD;
    const PREFIX: &'static str = ns::prefix::MD;
    const LOCAL_NAME: &'static str = "NameIDFormat";

    fn from_node(node: &Node) -> Result<Self> {
        Self::expect_identity(node)?;
        Self::new(node.text().trim())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityAttributesItem {
    Attribute(Attribute),
    Assertion(Box<Assertion>),
}

impl EntityAttributesItem {
    fn to_node(&self) -> Node {
        match self {
            Self::Attribute(a) => a.to_node(),
            Self::Assertion(a) => a.to_node(),
        }
    }
}

/// `mdattr:EntityAttributes`: attributes and assertions about an
/// entity, interleaved in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityAttributes {
    items: Vec<EntityAttributesItem>,
}

impl EntityAttributes {
    pub fn new(items: Vec<EntityAttributesItem>) -> Result<Self> {
        if items.is_empty() {
            return Err(Self::violation("at least one Attribute or Assertion is required"));
        }
        Ok(Self { items })
    }

    pub fn items(&self) -> &[EntityAttributesItem] {
        &self.items
    }
}

impl Serializable for EntityAttributes {
    fn to_node(&self) -> Node {
        Self::new_node().with_children(self.items.iter().map(EntityAttributesItem::to_node))
    }
}

impl XmlElement for EntityAttributes {
    const NAMESPACE: &'static str = ns::MDATTR;
    const PREFIX: &'static str = ns::prefix::MDATTR;
    const LOCAL_NAME: &'static str = "EntityAttributes";

    fn from_node(node: &Node) -> Result<Self> {
        Self::expect_identity(node)?;
        let mut items = Vec::new();
        let mut cursor = ChildCursor::new(node);
        while let Some(child) = cursor.next_node() {
            let item = if child.is(ns::SAML, Attribute::LOCAL_NAME) {
                EntityAttributesItem::Attribute(Attribute::from_node(child)?)
            } else if child.is(ns::SAML, Assertion::LOCAL_NAME) {
                EntityAttributesItem::Assertion(Box::new(Assertion::from_node(child)?))
            } else {
                return Err(Self::violation(format!("unexpected child {}", child.clark())));
            };
            items.push(item);
        }
        cursor.finish()?;
        Self::new(items)
    }
}

/// `alg:DigestMethod`: a digest algorithm the entity supports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlgDigestMethod {
    pub algorithm: String,
    pub extensions: Vec<Chunk>,
}

impl AlgDigestMethod {
    pub fn new(algorithm: impl Into<String>) -> Self {
        Self {
            algorithm: algorithm.into(),
            extensions: Vec::new(),
        }
    }
}

impl Serializable for AlgDigestMethod {
    fn to_node(&self) -> Node {
        Self::new_node()
            .with_attr(ns::attr::ALGORITHM, self.algorithm.clone())
            .with_children(self.extensions.iter().map(Chunk::to_node))
    }
}

impl XmlElement for AlgDigestMethod {
    const NAMESPACE: &'static str = ns::ALG;
    const PREFIX: &'static str = ns::prefix::ALG;
    const LOCAL_NAME: &'static str = "DigestMethod";

    fn from_node(node: &Node) -> Result<Self> {
        Self::expect_identity(node)?;
        Ok(Self {
            algorithm: node.required_attr(ns::attr::ALGORITHM)?.to_owned(),
            extensions: node.children.iter().cloned().map(Chunk::new).collect(),
        })
    }
}

/// `alg:SigningMethod`: a signature algorithm with optional key size
/// bounds in bits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningMethod {
    algorithm: String,
    min_key_size: Option<u32>,
    max_key_size: Option<u32>,
    pub extensions: Vec<Chunk>,
}

impl SigningMethod {
    pub fn new(
        algorithm: impl Into<String>,
        min_key_size: Option<u32>,
        max_key_size: Option<u32>,
    ) -> Result<Self> {
        for (name, size) in [("MinKeySize", min_key_size), ("MaxKeySize", max_key_size)] {
            if size == Some(0) {
                return Err(Self::violation(format!("{name} must be a positive integer")));
            }
        }
        if let (Some(min), Some(max)) = (min_key_size, max_key_size) {
            if min > max {
                return Err(Self::violation(format!(
                    "MinKeySize {min} exceeds MaxKeySize {max}"
                )));
            }
        }
        Ok(Self {
            algorithm: algorithm.into(),
            min_key_size,
            max_key_size,
            extensions: Vec::new(),
        })
    }

    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    pub fn min_key_size(&self) -> Option<u32> {
        self.min_key_size
    }

    pub fn max_key_size(&self) -> Option<u32> {
        self.max_key_size
    }
}

impl Serializable for SigningMethod {
    fn to_node(&self) -> Node {
        Self::new_node()
            .with_attr(ns::attr::ALGORITHM, self.algorithm.clone())
            .with_opt_attr("MinKeySize", self.min_key_size.map(|v| v.to_string()))
            .with_opt_attr("MaxKeySize", self.max_key_size.map(|v| v.to_string()))
            .with_children(self.extensions.iter().map(Chunk::to_node))
    }
}

impl XmlElement for SigningMethod {
    const NAMESPACE: &'static str = ns::ALG;
    const PREFIX: &'static str = ns::prefix::ALG;
    const LOCAL_NAME: &'static str = "SigningMethod";

    fn from_node(node: &Node) -> Result<Self> {
        Self::expect_identity(node)?;
        let mut method = Self::new(
            node.required_attr(ns::attr::ALGORITHM)?,
            node.parse_attr("MinKeySize")?,
            node.parse_attr("MaxKeySize")?,
        )?;
        method.extensions = node.children.iter().cloned().map(Chunk::new).collect();
        Ok(method)
    }
}
