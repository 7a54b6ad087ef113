#![forbid(unsafe_code)]

//! Identifiers: the elements that can stand in for an `EncryptedID`.

use std::any::Any;

use samlkit_core::{ns, Error, Result};
use samlkit_xml::{Node, Serializable, XmlElement};

use crate::container::{Container, LogLevel};
use crate::name::{BaseId, Issuer, NameId};

/// Marker for elements usable as identifiers.
///
/// Types outside this crate implement it and register a constructor with
/// the [`Container`] so decryption can rebuild them.
pub trait Identifier: Serializable + Any {
    fn as_any(&self) -> &dyn Any;
}

/// A decrypted identifier in its concrete form.
#[derive(Debug)]
pub enum IdentifierValue {
    NameId(NameId),
    Issuer(Issuer),
    BaseId(BaseId),
    Custom(Box<dyn Identifier>),
}

impl IdentifierValue {
    /// Resolve `node` to a concrete identifier type.
    ///
    /// `NameID` and `Issuer` are built in. A `BaseID` goes to the handler
    /// registered for its `xsi:type`, or stays a generic [`BaseId`]. Any
    /// other element needs a handler registered for its own name.
    pub fn resolve(node: &Node, container: &dyn Container) -> Result<Self> {
        if node.is(ns::SAML, NameId::LOCAL_NAME) {
            return NameId::from_node(node).map(Self::NameId);
        }
        if node.is(ns::SAML, Issuer::LOCAL_NAME) {
            return Issuer::from_node(node).map(Self::Issuer);
        }
        if node.is(ns::SAML, BaseId::LOCAL_NAME) {
            let base = BaseId::from_node(node)?;
            return match container.identifier_handler(&base.type_name) {
                Some(build) => {
                    container.log(
                        LogLevel::Debug,
                        &format!("BaseID of type {} built by registered handler", base.type_name),
                    );
                    build(node).map(Self::Custom)
                }
                None => Ok(Self::BaseId(base)),
            };
        }
        match container.identifier_handler(&node.qname()) {
            Some(build) => build(node).map(Self::Custom),
            None => {
                container.log(
                    LogLevel::Warn,
                    &format!("no identifier handler for {}", node.clark()),
                );
                Err(Error::UnsupportedIdentifier(format!(
                    "unknown or unsupported encrypted identifier {}",
                    node.clark()
                )))
            }
        }
    }

    pub fn as_identifier(&self) -> &dyn Identifier {
        match self {
            Self::NameId(v) => v,
            Self::Issuer(v) => v,
            Self::BaseId(v) => v,
            Self::Custom(v) => v.as_ref(),
        }
    }

    /// The custom identifier, if it is a `T`.
    pub fn downcast_ref<T: Identifier>(&self) -> Option<&T> {
        match self {
            Self::Custom(v) => v.as_any().downcast_ref(),
            _ => None,
        }
    }
}

impl Serializable for IdentifierValue {
    fn to_node(&self) -> Node {
        self.as_identifier().to_node()
    }
}

impl PartialEq for IdentifierValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::NameId(a), Self::NameId(b)) => a == b,
            (Self::Issuer(a), Self::Issuer(b)) => a == b,
            (Self::BaseId(a), Self::BaseId(b)) => a == b,
            (Self::Custom(a), Self::Custom(b)) => a.to_node() == b.to_node(),
            _ => false,
        }
    }
}

impl From<NameId> for IdentifierValue {
    fn from(v: NameId) -> Self {
        Self::NameId(v)
    }
}

impl From<Issuer> for IdentifierValue {
    fn from(v: Issuer) -> Self {
        Self::Issuer(v)
    }
}

impl From<BaseId> for IdentifierValue {
    fn from(v: BaseId) -> Self {
        Self::BaseId(v)
    }
}
