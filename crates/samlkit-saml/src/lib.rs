#![forbid(unsafe_code)]

//! SAML 2.0 protocol elements.
//!
//! Every element converts to and from a [`Node`](samlkit_xml::Node)
//! through [`Serializable`](samlkit_xml::Serializable) and
//! [`XmlElement`](samlkit_xml::XmlElement). On top of that sit three small
//! capabilities:
//!
//! - [`Identifier`]: `NameID`, `Issuer`, `BaseID` and runtime-registered
//!   types that can travel inside an [`EncryptedId`].
//! - [`Encryptable`]: any element can be encrypted into an
//!   [`Envelope`](samlkit_enc::Envelope).
//! - [`Signable`]: elements carrying an enveloped `ds:Signature`.
//!
//! Runtime services (ID generation, logging, the identifier registry and
//! the algorithm blacklist) come from the active [`Container`].

pub mod assertion;
pub mod attribute;
pub mod authn;
pub mod chunk;
pub mod conditions;
pub mod container;
pub mod encrypted;
pub mod identifier;
pub mod metadata;
pub mod name;
pub mod signable;
pub mod subject;
pub mod time;

pub use assertion::{Assertion, Statement};
pub use attribute::{Attribute, AttributeStatement, AttributeStatementItem, AttributeValue};
pub use authn::{AuthnContext, AuthnStatement, SubjectLocality};
pub use chunk::Chunk;
pub use conditions::{Audience, AudienceRestriction, Conditions, OneTimeUse, ProxyRestriction};
pub use container::{
    container, reset_container, set_container, Container, DefaultContainer,
    IdentifierConstructor, LogLevel,
};
pub use encrypted::{Encryptable, EncryptedAssertion, EncryptedAttribute, EncryptedId};
pub use identifier::{Identifier, IdentifierValue};
pub use metadata::{AlgDigestMethod, EntityAttributes, EntityAttributesItem, NameIdFormat, SigningMethod};
pub use name::{BaseId, Issuer, NameId};
pub use signable::{Signable, SignatureSlot};
pub use subject::{Subject, SubjectConfirmation, SubjectConfirmationData, SubjectIdentifier};
