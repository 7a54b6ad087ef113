#![forbid(unsafe_code)]

//! Enveloped signatures on SAML elements.
//!
//! A signable element keeps its `ds:Signature` in a [`SignatureSlot`].
//! Signing computes the signature once over the element without any
//! signature and caches it; `to_node` then places the cached block at
//! the element's schema position, so repeated serialization is stable.
//! Mutating the element after signing invalidates the cached signature;
//! sign again.

use samlkit_core::{ns, Error, Result};
use samlkit_dsig::{DsigContext, Signature, VerifyResult};
use samlkit_keys::SignatureHandle;
use samlkit_xml::{Node, Serializable, XmlElement};

use crate::container::{container, LogLevel};

/// Cached signature plus, for parsed elements, the node as received.
#[derive(Debug, Clone, Default)]
pub struct SignatureSlot {
    signature: Option<Signature>,
    original: Option<Node>,
}

impl SignatureSlot {
    /// Slot for an element parsed from `node`.
    pub(crate) fn parsed(signature: Option<Signature>, node: &Node) -> Self {
        let original = signature.is_some().then(|| node.clone());
        Self {
            signature,
            original,
        }
    }

    pub fn signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }

    pub(crate) fn to_node(&self) -> Option<Node> {
        self.signature.as_ref().map(Signature::to_node)
    }
}

/// Two elements are equal whatever their wire history.
impl PartialEq for SignatureSlot {
    fn eq(&self, other: &Self) -> bool {
        self.signature == other.signature
    }
}

impl Eq for SignatureSlot {}

pub trait Signable: Serializable {
    fn signature_slot(&self) -> &SignatureSlot;

    fn signature_slot_mut(&mut self) -> &mut SignatureSlot;

    fn signature(&self) -> Option<&Signature> {
        self.signature_slot().signature()
    }

    /// Sign with the active container's blacklist.
    fn sign(&mut self, handle: &dyn SignatureHandle) -> Result<()> {
        let ctx = DsigContext::new().with_blacklist(container().blacklisted_algorithms());
        self.sign_with(handle, &ctx)
    }

    /// Compute a signature over the element and cache it, replacing any
    /// previous one.
    fn sign_with(&mut self, handle: &dyn SignatureHandle, ctx: &DsigContext) -> Result<()> {
        let unsigned = self
            .to_node()
            .without_children(ns::DSIG, Signature::LOCAL_NAME);
        let signature = samlkit_dsig::create_signature(&unsigned, handle, ctx)?;
        container().log(
            LogLevel::Debug,
            &format!("signed {} with {}", unsigned.clark(), handle.uri()),
        );
        let slot = self.signature_slot_mut();
        slot.signature = Some(signature);
        slot.original = None;
        Ok(())
    }

    /// Verify the signature over the element as received, or as built
    /// when it was signed locally.
    fn verify(&self, handle: &dyn SignatureHandle) -> Result<VerifyResult> {
        let blacklist = container().blacklisted_algorithms();
        if blacklist.iter().any(|b| b == handle.uri()) {
            return Err(Error::BlacklistedAlgorithm(handle.uri().to_owned()));
        }
        match &self.signature_slot().original {
            Some(node) => samlkit_dsig::verify(node, handle),
            None => samlkit_dsig::verify(&self.to_node(), handle),
        }
    }
}
