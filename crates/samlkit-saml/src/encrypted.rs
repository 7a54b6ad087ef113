#![forbid(unsafe_code)]

//! Encrypted envelopes: `saml:EncryptedID`, `saml:EncryptedAssertion`
//! and `saml:EncryptedAttribute`.
//!
//! Each holds one `xenc:EncryptedData` followed by zero or more detached
//! `xenc:EncryptedKey`s.

use samlkit_core::{ns, Result};
use samlkit_enc::{EncContext, EncryptedData, EncryptedKey, Envelope};
use samlkit_keys::EncryptionHandle;
use samlkit_xml::{ChildCursor, Node, Serializable, XmlElement};

use crate::assertion::Assertion;
use crate::attribute::Attribute;
use crate::container::{container, Container, LogLevel};
use crate::identifier::{Identifier, IdentifierValue};

/// Encryption context honouring the container's blacklist.
pub(crate) fn enc_context(container: &dyn Container) -> EncContext {
    EncContext::new().with_blacklist(container.blacklisted_algorithms())
}

/// Encryption of any element into an [`Envelope`].
pub trait Encryptable: Serializable {
    /// Encrypt with the active container's settings.
    fn encrypt(&self, handle: &dyn EncryptionHandle) -> Result<Envelope> {
        self.encrypt_with(handle, &enc_context(container().as_ref()))
    }

    fn encrypt_with(&self, handle: &dyn EncryptionHandle, ctx: &EncContext) -> Result<Envelope> {
        samlkit_enc::encrypt_node(&self.to_node(), handle, ctx)
    }
}

impl<T: Serializable + ?Sized> Encryptable for T {}

macro_rules! encrypted_element {
    ($(#[$doc:meta])* $name:ident, $local:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            pub envelope: Envelope,
        }

        impl $name {
            pub fn new(envelope: Envelope) -> Self {
                Self { envelope }
            }

            /// Decrypt the payload and parse it, without resolving its type.
            pub fn decrypt_node(
                &self,
                handle: &dyn EncryptionHandle,
                ctx: &EncContext,
            ) -> Result<Node> {
                samlkit_enc::decrypt_to_node(&self.envelope, handle, ctx)
            }
        }

        impl Serializable for $name {
            fn to_node(&self) -> Node {
                Self::new_node()
                    .with_child(self.envelope.data.to_node())
                    .with_children(self.envelope.keys.iter().map(EncryptedKey::to_node))
            }
        }

        impl XmlElement for $name {
            const NAMESPACE: &'static str = ns::SAML;
            const PREFIX: &'static str = ns::prefix::SAML;
            const LOCAL_NAME: &'static str = $local;

            fn from_node(node: &Node) -> Result<Self> {
                Self::expect_identity(node)?;
                let mut cursor = ChildCursor::new(node);
                let data = cursor.one::<EncryptedData>()?;
                let keys = cursor.many::<EncryptedKey>()?;
                cursor.finish()?;
                Ok(Self::new(Envelope { data, keys }))
            }
        }
    };
}

encrypted_element!(
    /// An encrypted [`Identifier`].
    EncryptedId,
    "EncryptedID"
);

encrypted_element!(
    /// An encrypted [`Assertion`].
    EncryptedAssertion,
    "EncryptedAssertion"
);

encrypted_element!(
    /// An encrypted [`Attribute`].
    EncryptedAttribute,
    "EncryptedAttribute"
);

impl EncryptedId {
    pub fn from_identifier(
        identifier: &dyn Identifier,
        handle: &dyn EncryptionHandle,
    ) -> Result<Self> {
        identifier.encrypt(handle).map(Self::new)
    }

    /// Decrypt with the active container.
    pub fn decrypt(&self, handle: &dyn EncryptionHandle) -> Result<IdentifierValue> {
        self.decrypt_with(handle, container().as_ref())
    }

    pub fn decrypt_with(
        &self,
        handle: &dyn EncryptionHandle,
        container: &dyn Container,
    ) -> Result<IdentifierValue> {
        let node = self.decrypt_node(handle, &enc_context(container))?;
        container.log(
            LogLevel::Debug,
            &format!("decrypted EncryptedID payload {}", node.clark()),
        );
        IdentifierValue::resolve(&node, container)
    }
}

impl EncryptedAssertion {
    pub fn from_assertion(assertion: &Assertion, handle: &dyn EncryptionHandle) -> Result<Self> {
        assertion.encrypt(handle).map(Self::new)
    }

    pub fn decrypt(&self, handle: &dyn EncryptionHandle) -> Result<Assertion> {
        let node = self.decrypt_node(handle, &enc_context(container().as_ref()))?;
        Assertion::from_node(&node)
    }
}

impl EncryptedAttribute {
    pub fn from_attribute(attribute: &Attribute, handle: &dyn EncryptionHandle) -> Result<Self> {
        attribute.encrypt(handle).map(Self::new)
    }

    pub fn decrypt(&self, handle: &dyn EncryptionHandle) -> Result<Attribute> {
        let node = self.decrypt_node(handle, &enc_context(container().as_ref()))?;
        Attribute::from_node(&node)
    }
}
