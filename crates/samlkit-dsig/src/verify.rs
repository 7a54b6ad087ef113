#![forbid(unsafe_code)]

//! XML-DSig enveloped signature verification.
//!
//! Processing order:
//! 1. Take the `ds:Signature` child of the element
//! 2. Read `SignedInfo`: CanonicalizationMethod, SignatureMethod
//! 3. Require exactly one `Reference`, pointing at the element itself
//!    (`""` or `#` + its own ID); run transforms, digest, compare
//! 4. Canonicalize `SignedInfo`
//! 5. Verify `SignatureValue` with the supplied handle

use base64::Engine;
use samlkit_c14n::C14nMode;
use samlkit_core::{algorithm, ns, Error, Result};
use samlkit_keys::SignatureHandle;
use samlkit_xml::{Node, XmlElement};

use crate::sign::ID_ATTRIBUTES;
use crate::types::{Reference, Signature};

/// Result of signature verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyResult {
    /// Signature is valid.
    Valid,
    /// Signature is invalid.
    Invalid { reason: String },
}

impl VerifyResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, VerifyResult::Valid)
    }

    fn invalid(reason: impl Into<String>) -> Self {
        VerifyResult::Invalid {
            reason: reason.into(),
        }
    }
}

/// Verify the enveloped signature of `node` as it was received.
///
/// Structural problems (no signature, malformed `ds:` content, unknown
/// algorithms) are errors; a signature that does not match is
/// [`VerifyResult::Invalid`].
pub fn verify(node: &Node, handle: &dyn SignatureHandle) -> Result<VerifyResult> {
    let sig_node = node
        .child(ns::DSIG, Signature::LOCAL_NAME)
        .ok_or_else(|| Error::SignatureInvalid(format!("{} carries no ds:Signature", node.clark())))?;
    let signature = Signature::from_node(sig_node)?;

    if signature.algorithm() != handle.uri() {
        return Ok(VerifyResult::invalid(format!(
            "signed with {}, key is bound to {}",
            signature.algorithm(),
            handle.uri()
        )));
    }

    let c14n = &signature.signed_info.canonicalization_method;
    let c14n_mode = C14nMode::from_uri(&c14n.algorithm)
        .ok_or_else(|| Error::UnsupportedAlgorithm(format!("C14N: {}", c14n.algorithm)))?;

    let reference = match signature.signed_info.references.as_slice() {
        [reference] => reference,
        refs => {
            return Ok(VerifyResult::invalid(format!(
                "expected exactly one Reference, found {}",
                refs.len()
            )))
        }
    };
    if let Some(reason) = check_reference(node, sig_node, reference)? {
        return Ok(VerifyResult::invalid(format!(
            "Reference digest failed: {reason}"
        )));
    }

    let Some(signed_info) = sig_node.child(ns::DSIG, "SignedInfo") else {
        return Err(Error::SignatureInvalid("missing SignedInfo".into()));
    };
    let c14n_signed_info = samlkit_c14n::canonicalize(
        signed_info,
        c14n_mode,
        c14n.inclusive_prefixes.as_deref().unwrap_or(&[]),
    );

    let sig_value = decode_base64(&signature.signature_value.0, "SignatureValue")?;
    if handle.verify(&c14n_signed_info, &sig_value)? {
        tracing::debug!(element = %node.clark(), "signature verified");
        Ok(VerifyResult::Valid)
    } else {
        Ok(VerifyResult::invalid("signature value verification failed"))
    }
}

/// Returns the failure reason, or `None` when the digest matches.
///
/// The reference must cover `node` itself. A URI naming any other
/// element, even one nested inside `node`, is refused.
fn check_reference(node: &Node, sig_node: &Node, reference: &Reference) -> Result<Option<String>> {
    let uri = reference.uri.as_deref().unwrap_or("");
    if let Some(id) = uri.strip_prefix('#') {
        if !ID_ATTRIBUTES.iter().any(|a| node.attr(a) == Some(id)) {
            return Ok(Some(format!("URI {uri} does not name {}", node.clark())));
        }
    } else if !uri.is_empty() {
        return Err(Error::UnsupportedAlgorithm(format!(
            "external reference URI: {uri}"
        )));
    }

    let mut data = node.clone();
    let mut prefixes: Vec<String> = Vec::new();
    let mut mode = C14nMode::Exclusive;
    let transforms = reference.transforms.as_ref().map(|t| t.0.as_slice()).unwrap_or(&[]);
    for transform in transforms {
        match transform.algorithm.as_str() {
            algorithm::ENVELOPED_SIGNATURE => {
                data.children.retain(|c| c != sig_node);
            }
            uri => {
                mode = C14nMode::from_uri(uri)
                    .ok_or_else(|| Error::UnsupportedAlgorithm(format!("transform: {uri}")))?;
                prefixes = transform.inclusive_prefixes.clone().unwrap_or_default();
            }
        }
    }

    let canonical = samlkit_c14n::canonicalize(&data, mode, &prefixes);
    let computed = samlkit_crypto::digest::digest(&reference.digest_method.algorithm, &canonical)?;
    let expected = decode_base64(&reference.digest_value.0, "DigestValue")?;
    if computed == expected {
        Ok(None)
    } else {
        Ok(Some(format!("digest mismatch for {uri}")))
    }
}

fn decode_base64(text: &str, what: &str) -> Result<Vec<u8>> {
    let clean: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(clean)
        .map_err(|e| Error::Base64(format!("{what}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::DsigContext;
    use crate::sign::create_signature;
    use samlkit_keys::{loader, AlgorithmFactory};
    use samlkit_xml::{parse, Serializable};

    const RSA_PRIVATE: &[u8] = include_bytes!("../../../testdata/keys/rsa-private.pem");
    const RSA_OTHER: &[u8] = include_bytes!("../../../testdata/keys/rsa-other-private.pem");
    const EC_PRIVATE: &[u8] = include_bytes!("../../../testdata/keys/ec-p256-private.pem");

    fn element() -> Node {
        Node::new(ns::SAML, "saml", "Assertion")
            .with_attr("ID", "_a1")
            .with_child(Node::new(ns::SAML, "saml", "Issuer").with_text("https://idp.example.org"))
            .with_child(
                Node::new(ns::SAML, "saml", "AttributeValue")
                    .with_namespace("xs", ns::XS)
                    .with_ns_attr(ns::XSI, "xsi", "type", "xs:string")
                    .with_text("a & b"),
            )
    }

    /// Sign, insert the signature after the first child, and return the
    /// element as a receiver would parse it.
    fn signed_wire(handle: &dyn SignatureHandle) -> Node {
        let mut node = element();
        let sig = create_signature(&node, handle, &DsigContext::new()).unwrap();
        node.children.insert(1, sig.to_node());
        parse(&samlkit_c14n::render(&node)).unwrap()
    }

    fn rsa(pem: &[u8]) -> Box<dyn SignatureHandle> {
        let key = loader::load_rsa_private_pem(pem).unwrap();
        AlgorithmFactory::default()
            .signature(algorithm::RSA_SHA256, key)
            .unwrap()
    }

    #[test]
    fn test_rsa_round_trip() {
        let handle = rsa(RSA_PRIVATE);
        let wire = signed_wire(handle.as_ref());
        assert_eq!(verify(&wire, handle.as_ref()).unwrap(), VerifyResult::Valid);
    }

    #[test]
    fn test_ecdsa_round_trip() {
        let key = loader::load_ec_p256_private_pem(EC_PRIVATE).unwrap();
        let handle = AlgorithmFactory::default()
            .signature(algorithm::ECDSA_SHA256, key)
            .unwrap();
        let wire = signed_wire(handle.as_ref());
        assert!(verify(&wire, handle.as_ref()).unwrap().is_valid());
    }

    #[test]
    fn test_tampered_content_fails_digest() {
        let handle = rsa(RSA_PRIVATE);
        let mut wire = signed_wire(handle.as_ref());
        wire.children[0].text = Some("https://evil.example.org".into());
        match verify(&wire, handle.as_ref()).unwrap() {
            VerifyResult::Invalid { reason } => assert!(reason.contains("digest mismatch")),
            VerifyResult::Valid => panic!("tampered element verified"),
        }
    }

    #[test]
    fn test_wrong_key_fails() {
        let wire = signed_wire(rsa(RSA_PRIVATE).as_ref());
        let result = verify(&wire, rsa(RSA_OTHER).as_ref()).unwrap();
        assert_eq!(
            result,
            VerifyResult::Invalid {
                reason: "signature value verification failed".into()
            }
        );
    }

    #[test]
    fn test_unsigned_element_is_an_error() {
        let err = verify(&element(), rsa(RSA_PRIVATE).as_ref()).unwrap_err();
        assert!(matches!(err, Error::SignatureInvalid(_)));
    }

    /// A signed element moved inside a forged one: the copied signature
    /// still digests correctly for the nested element, but must not
    /// vouch for the outer one.
    #[test]
    fn test_reference_to_nested_element_is_invalid() {
        let handle = rsa(RSA_PRIVATE);
        let legit = element();
        let sig = create_signature(&legit, handle.as_ref(), &DsigContext::new()).unwrap();

        let forged = Node::new(ns::SAML, "saml", "Assertion")
            .with_attr("ID", "_forged")
            .with_child(Node::new(ns::SAML, "saml", "Issuer").with_text("https://idp.example.org"))
            .with_child(sig.to_node())
            .with_child(Node::new(ns::SAML, "saml", "Advice").with_child(legit));
        let wire = parse(&samlkit_c14n::render(&forged)).unwrap();
        match verify(&wire, handle.as_ref()).unwrap() {
            VerifyResult::Invalid { reason } => assert!(reason.contains("#_a1"), "{reason}"),
            VerifyResult::Valid => panic!("wrapped signature verified"),
        }
    }

    #[test]
    fn test_several_references_are_invalid() {
        let handle = rsa(RSA_PRIVATE);
        let mut node = element();
        let mut sig = create_signature(&node, handle.as_ref(), &DsigContext::new()).unwrap();
        let extra = sig.signed_info.references[0].clone();
        sig.signed_info.references.push(extra);
        node.children.insert(1, sig.to_node());
        match verify(&node, handle.as_ref()).unwrap() {
            VerifyResult::Invalid { reason } => {
                assert!(reason.contains("exactly one Reference"), "{reason}")
            }
            VerifyResult::Valid => panic!("two references verified"),
        }
    }

    #[test]
    fn test_empty_reference_uri_covers_element() {
        let handle = rsa(RSA_PRIVATE);
        let mut node = element();
        let mut sig = create_signature(&node, handle.as_ref(), &DsigContext::new()).unwrap();
        sig.signed_info.references[0].uri = Some(String::new());
        node.children.insert(1, sig.to_node());
        // The digest still matches; only SignedInfo changed, so the
        // signature value no longer does.
        match verify(&node, handle.as_ref()).unwrap() {
            VerifyResult::Invalid { reason } => {
                assert_eq!(reason, "signature value verification failed")
            }
            VerifyResult::Valid => panic!("altered SignedInfo verified"),
        }
    }

    #[test]
    fn test_algorithm_mismatch_is_invalid() {
        let wire = signed_wire(rsa(RSA_PRIVATE).as_ref());
        let key = loader::load_rsa_private_pem(RSA_PRIVATE).unwrap();
        let sha512 = AlgorithmFactory::default()
            .signature(algorithm::RSA_SHA512, key)
            .unwrap();
        assert!(!verify(&wire, sha512.as_ref()).unwrap().is_valid());
    }
}
