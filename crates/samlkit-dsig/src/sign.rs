#![forbid(unsafe_code)]

//! XML-DSig enveloped signature creation.
//!
//! Signs one element: a single `Reference` pointing at the element's ID,
//! with the enveloped-signature and Exclusive C14N transforms. The
//! caller decides where in the element the returned `ds:Signature` goes.

use base64::Engine;
use samlkit_core::{algorithm, ns, Result};
use samlkit_keys::SignatureHandle;
use samlkit_xml::{Node, Serializable, XmlElement};

use crate::context::DsigContext;
use crate::types::{
    CanonicalizationMethod, DigestMethod, DigestValue, KeyInfo, KeyInfoItem, KeyName, Reference,
    Signature, SignatureMethod, SignatureValue, SignedInfo, Transform, Transforms,
    X509Certificate, X509Data,
};

/// ID attributes recognised on signed elements, in lookup order.
pub(crate) const ID_ATTRIBUTES: &[&str] = &["ID", "Id", "id"];

/// Build a `ds:Signature` over `node`.
///
/// Any `ds:Signature` children already present on `node` are excluded
/// from the digest, as the enveloped-signature transform requires.
pub fn create_signature(
    node: &Node,
    handle: &dyn SignatureHandle,
    ctx: &DsigContext,
) -> Result<Signature> {
    let digest_uri = ctx
        .digest_method
        .clone()
        .unwrap_or_else(|| handle.digest_uri().to_owned());
    ctx.check(handle.uri())?;
    ctx.check(&digest_uri)?;

    let uri = match ID_ATTRIBUTES.iter().find_map(|a| node.attr(a)) {
        Some(id) => format!("#{id}"),
        None => String::new(),
    };

    // Prefixes declared inside the element but not visibly utilized at
    // the point of declaration (xsi:type values) must stay in the digest.
    let prefixes = samlkit_c14n::declared_prefixes(node);
    let target = node.without_children(ns::DSIG, Signature::LOCAL_NAME);
    let canonical = samlkit_c14n::canonicalize(&target, ctx.c14n_mode, &prefixes);
    let digest = samlkit_crypto::digest::digest(&digest_uri, &canonical)?;

    let engine = base64::engine::general_purpose::STANDARD;
    tracing::debug!(reference = %uri, digest = %digest_uri, "computed reference digest");

    let signed_info = SignedInfo {
        canonicalization_method: CanonicalizationMethod {
            algorithm: ctx.c14n_mode.uri().to_owned(),
            inclusive_prefixes: None,
        },
        signature_method: SignatureMethod::new(handle.uri()),
        references: vec![Reference {
            id: None,
            uri: Some(uri),
            transforms: Some(Transforms(vec![
                Transform::new(algorithm::ENVELOPED_SIGNATURE),
                Transform {
                    algorithm: ctx.c14n_mode.uri().to_owned(),
                    inclusive_prefixes: (!prefixes.is_empty()).then_some(prefixes),
                },
            ])),
            digest_method: DigestMethod::new(digest_uri),
            digest_value: DigestValue(engine.encode(digest)),
        }],
    };

    let c14n_signed_info = samlkit_c14n::canonicalize(&signed_info.to_node(), ctx.c14n_mode, &[]);
    let signature_value = handle.sign(&c14n_signed_info)?;

    Ok(Signature {
        id: None,
        signed_info,
        signature_value: SignatureValue(engine.encode(signature_value)),
        key_info: key_info(handle, ctx),
    })
}

fn key_info(handle: &dyn SignatureHandle, ctx: &DsigContext) -> Option<KeyInfo> {
    let mut items = Vec::new();
    if let Some(name) = ctx.key_name.as_deref().or_else(|| handle.key_name()) {
        items.push(KeyInfoItem::KeyName(KeyName(name.to_owned())));
    }
    if !ctx.certificates.is_empty() {
        items.push(KeyInfoItem::X509Data(X509Data {
            certificates: ctx
                .certificates
                .iter()
                .cloned()
                .map(X509Certificate)
                .collect(),
        }));
    }
    (!items.is_empty()).then(|| KeyInfo { id: None, items })
}

#[cfg(test)]
mod tests {
    use super::*;
    use samlkit_core::Error;
    use samlkit_keys::{loader, AlgorithmFactory};

    const RSA_PRIVATE: &[u8] = include_bytes!("../../../testdata/keys/rsa-private.pem");

    fn rsa_handle() -> Box<dyn SignatureHandle> {
        let key = loader::load_rsa_private_pem(RSA_PRIVATE)
            .unwrap()
            .with_name("idp-signing");
        AlgorithmFactory::default()
            .signature(algorithm::RSA_SHA256, key)
            .unwrap()
    }

    fn element() -> Node {
        Node::new("urn:test", "t", "Doc")
            .with_attr("ID", "_d1")
            .with_child(Node::new("urn:test", "t", "Value").with_text("42"))
    }

    #[test]
    fn test_reference_points_at_id() {
        let sig = create_signature(&element(), rsa_handle().as_ref(), &DsigContext::new()).unwrap();
        let reference = &sig.signed_info.references[0];
        assert_eq!(reference.uri.as_deref(), Some("#_d1"));
        assert_eq!(reference.digest_method.algorithm, algorithm::SHA256);
        let transforms = &reference.transforms.as_ref().unwrap().0;
        assert_eq!(transforms[0].algorithm, algorithm::ENVELOPED_SIGNATURE);
        assert_eq!(transforms[1].algorithm, algorithm::EXC_C14N);
        assert_eq!(transforms[1].inclusive_prefixes, None);
        assert_eq!(sig.key_info.unwrap().key_names().collect::<Vec<_>>(), vec!["idp-signing"]);
    }

    #[test]
    fn test_signature_is_deterministic() {
        let handle = rsa_handle();
        let a = create_signature(&element(), handle.as_ref(), &DsigContext::new()).unwrap();
        let b = create_signature(&element(), handle.as_ref(), &DsigContext::new()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_declared_prefixes_become_prefix_list() {
        let node = element().with_child(
            Node::new("urn:test", "t", "Typed")
                .with_namespace("xs", ns::XS)
                .with_ns_attr(ns::XSI, "xsi", "type", "xs:string")
                .with_text("v"),
        );
        let sig = create_signature(&node, rsa_handle().as_ref(), &DsigContext::new()).unwrap();
        let transforms = &sig.signed_info.references[0].transforms.as_ref().unwrap().0;
        assert_eq!(transforms[1].inclusive_prefixes, Some(vec!["xs".to_string()]));
    }

    #[test]
    fn test_blacklisted_digest_refused() {
        let ctx = DsigContext::new().with_digest_method(algorithm::SHA1);
        let ctx = ctx.with_blacklist(vec![algorithm::SHA1.to_string()]);
        let err = create_signature(&element(), rsa_handle().as_ref(), &ctx).unwrap_err();
        assert!(matches!(err, Error::BlacklistedAlgorithm(_)));
    }

    #[test]
    fn test_no_key_info_without_name() {
        let key = loader::load_hmac_key(b"shared secret key material");
        let handle = AlgorithmFactory::default()
            .signature(algorithm::HMAC_SHA256, key)
            .unwrap();
        let sig = create_signature(&element(), handle.as_ref(), &DsigContext::new()).unwrap();
        assert!(sig.key_info.is_none());
        assert_eq!(sig.algorithm(), algorithm::HMAC_SHA256);
    }
}
