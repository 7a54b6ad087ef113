#![forbid(unsafe_code)]

//! `saml:Subject` and its confirmations.

use chrono::{DateTime, Utc};
use samlkit_core::{ns, Result};
use samlkit_xml::{ChildCursor, Node, Serializable, XmlElement};

use crate::encrypted::EncryptedId;
use crate::name::{BaseId, NameId};
use crate::time;

/// The identifier choice shared by `Subject` and `SubjectConfirmation`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubjectIdentifier {
    BaseId(BaseId),
    NameId(NameId),
    EncryptedId(EncryptedId),
}

impl SubjectIdentifier {
    fn read(cursor: &mut ChildCursor<'_>) -> Result<Option<Self>> {
        if let Some(v) = cursor.optional::<BaseId>()? {
            return Ok(Some(Self::BaseId(v)));
        }
        if let Some(v) = cursor.optional::<NameId>()? {
            return Ok(Some(Self::NameId(v)));
        }
        Ok(cursor.optional::<EncryptedId>()?.map(Self::EncryptedId))
    }

    fn to_node(&self) -> Node {
        match self {
            Self::BaseId(v) => v.to_node(),
            Self::NameId(v) => v.to_node(),
            Self::EncryptedId(v) => v.to_node(),
        }
    }
}

/// `saml:SubjectConfirmationData`. Any element content is kept opaque.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubjectConfirmationData {
    pub not_before: Option<DateTime<Utc>>,
    pub not_on_or_after: Option<DateTime<Utc>>,
    pub recipient: Option<String>,
    pub in_response_to: Option<String>,
    pub address: Option<String>,
    pub content: Vec<Node>,
}

impl Serializable for SubjectConfirmationData {
    fn to_node(&self) -> Node {
        Self::new_node()
            .with_opt_attr("NotBefore", self.not_before.as_ref().map(time::format))
            .with_opt_attr("NotOnOrAfter", self.not_on_or_after.as_ref().map(time::format))
            .with_opt_attr("Recipient", self.recipient.clone())
            .with_opt_attr("InResponseTo", self.in_response_to.clone())
            .with_opt_attr("Address", self.address.clone())
            .with_children(self.content.iter().cloned())
    }
}

impl XmlElement for SubjectConfirmationData {
    const NAMESPACE: &'static str = ns::SAML;
    const PREFIX: &'static str = ns::prefix::SAML;
    const LOCAL_NAME: &'static str = "SubjectConfirmationData";

    fn from_node(node: &Node) -> Result<Self> {
        Self::expect_identity(node)?;
        Ok(Self {
            not_before: time::parse_attr(node, "NotBefore")?,
            not_on_or_after: time::parse_attr(node, "NotOnOrAfter")?,
            recipient: node.attr("Recipient").map(str::to_owned),
            in_response_to: node.attr("InResponseTo").map(str::to_owned),
            address: node.attr("Address").map(str::to_owned),
            content: node.children.clone(),
        })
    }
}

/// `saml:SubjectConfirmation`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectConfirmation {
    pub method: String,
    pub identifier: Option<SubjectIdentifier>,
    pub data: Option<SubjectConfirmationData>,
}

impl SubjectConfirmation {
    pub const BEARER: &'static str = "urn:oasis:names:tc:SAML:2.0:cm:bearer";
    pub const HOLDER_OF_KEY: &'static str = "urn:oasis:names:tc:SAML:2.0:cm:holder-of-key";

    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            identifier: None,
            data: None,
        }
    }
}

impl Serializable for SubjectConfirmation {
    fn to_node(&self) -> Node {
        Self::new_node()
            .with_attr("Method", self.method.clone())
            .with_children(self.identifier.as_ref().map(SubjectIdentifier::to_node))
            .with_children(self.data.as_ref().map(SubjectConfirmationData::to_node))
    }
}

impl XmlElement for SubjectConfirmation {
    const NAMESPACE: &'static str = ns::SAML;
    const PREFIX: &'static str = ns::prefix::SAML;
    const LOCAL_NAME: &'static str = "SubjectConfirmation";

    fn from_node(node: &Node) -> Result<Self> {
        Self::expect_identity(node)?;
        let method = node.required_attr("Method")?.to_owned();
        let mut cursor = ChildCursor::new(node);
        let identifier = SubjectIdentifier::read(&mut cursor)?;
        let data = cursor.optional()?;
        cursor.finish()?;
        Ok(Self {
            method,
            identifier,
            data,
        })
    }
}

/// `saml:Subject`: an identifier, confirmations, or both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    identifier: Option<SubjectIdentifier>,
    confirmations: Vec<SubjectConfirmation>,
}

impl Subject {
    pub fn new(
        identifier: Option<SubjectIdentifier>,
        confirmations: Vec<SubjectConfirmation>,
    ) -> Result<Self> {
        if identifier.is_none() && confirmations.is_empty() {
            return Err(Self::violation(
                "an identifier or at least one SubjectConfirmation is required",
            ));
        }
        Ok(Self {
            identifier,
            confirmations,
        })
    }

    pub fn with_name_id(name_id: NameId) -> Self {
        Self {
            identifier: Some(SubjectIdentifier::NameId(name_id)),
            confirmations: Vec::new(),
        }
    }

    pub fn identifier(&self) -> Option<&SubjectIdentifier> {
        self.identifier.as_ref()
    }

    pub fn confirmations(&self) -> &[SubjectConfirmation] {
        &self.confirmations
    }
}

impl Serializable for Subject {
    fn to_node(&self) -> Node {
        Self::new_node()
            .with_children(self.identifier.as_ref().map(SubjectIdentifier::to_node))
            .with_children(self.confirmations.iter().map(SubjectConfirmation::to_node))
    }
}

impl XmlElement for Subject {
    const NAMESPACE: &'static str = ns::SAML;
    const PREFIX: &'static str = ns::prefix::SAML;
    const LOCAL_NAME: &'static str = "Subject";

    fn from_node(node: &Node) -> Result<Self> {
        Self::expect_identity(node)?;
        let mut cursor = ChildCursor::new(node);
        let identifier = SubjectIdentifier::read(&mut cursor)?;
        let confirmations = cursor.many()?;
        cursor.finish()?;
        Self::new(identifier, confirmations)
    }
}
