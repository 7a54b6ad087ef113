#![forbid(unsafe_code)]

//! XML-Enc encryption of a single element.
//!
//! The element is rendered to bytes, encrypted with a session key under
//! the context's data algorithm, and the session key is wrapped with the
//! key transport handle.

use base64::Engine;
use samlkit_core::{algorithm, ns, Error, Result};
use samlkit_dsig::{KeyInfo, KeyInfoItem, KeyName};
use samlkit_keys::EncryptionHandle;
use samlkit_xml::Node;

use crate::context::{EncContext, KeyPlacement};
use crate::types::{
    key_info_with, CipherData, EncryptedData, EncryptedKey, EncryptionMethod, ReferenceList,
    ReferenceListItem,
};

/// An `EncryptedData` with the `EncryptedKey`s delivered beside it.
///
/// `keys` is empty when the key is carried inside the data's `KeyInfo`
/// or delivered out of band.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub data: EncryptedData,
    pub keys: Vec<EncryptedKey>,
}

/// Encrypt `node`, wrapping the session key with `handle`.
pub fn encrypt_node(
    node: &Node,
    handle: &dyn EncryptionHandle,
    ctx: &EncContext,
) -> Result<Envelope> {
    ctx.check(&ctx.data_algorithm)?;
    ctx.check(handle.uri())?;

    let cipher = samlkit_crypto::cipher::from_uri(&ctx.data_algorithm)?;
    let session_key = match &ctx.session_key {
        Some(k) if k.len() == cipher.key_size() => k.clone(),
        Some(k) => {
            return Err(Error::Key(format!(
                "{} needs a {} byte session key, got {}",
                ctx.data_algorithm,
                cipher.key_size(),
                k.len()
            )))
        }
        None => cipher.generate_key(),
    };

    let plaintext = samlkit_c14n::render(node);
    let engine = base64::engine::general_purpose::STANDARD;
    let ciphertext = cipher.encrypt(&session_key, &plaintext)?;
    let wrapped = handle.encrypt(&session_key)?;
    tracing::debug!(
        data = %ctx.data_algorithm,
        transport = handle.uri(),
        placement = ?ctx.placement,
        "encrypted element {}",
        node.clark()
    );

    let reference_list = match ctx.placement {
        KeyPlacement::Inline => None,
        KeyPlacement::Detached => {
            let id = ctx.data_id.as_deref().ok_or_else(|| {
                Error::Encryption("detached key placement needs an EncryptedData Id".into())
            })?;
            Some(ReferenceList(vec![ReferenceListItem::DataReference(format!(
                "#{id}"
            ))]))
        }
    };

    let key = EncryptedKey {
        id: ctx.key_id.clone(),
        type_: None,
        mime_type: None,
        encoding: None,
        recipient: ctx.recipient.clone(),
        encryption_method: Some(transport_method(handle, &engine)),
        key_info: handle.key_name().map(|name| KeyInfo {
            id: None,
            items: vec![KeyInfoItem::KeyName(KeyName(name.to_owned()))],
        }),
        cipher_data: CipherData::Value(engine.encode(wrapped)),
        reference_list,
        carried_key_name: ctx.carried_key_name.clone(),
    };

    let (key_info, keys) = match ctx.placement {
        KeyPlacement::Inline => (Some(key_info_with(&key)), Vec::new()),
        KeyPlacement::Detached => (detached_key_info(ctx), vec![key]),
    };

    Ok(Envelope {
        data: EncryptedData {
            id: ctx.data_id.clone(),
            type_: Some(ns::ENC_TYPE_ELEMENT.to_owned()),
            mime_type: None,
            encoding: None,
            encryption_method: Some(EncryptionMethod::new(ctx.data_algorithm.clone())),
            key_info,
            cipher_data: CipherData::Value(engine.encode(ciphertext)),
        },
        keys,
    })
}

fn transport_method(
    handle: &dyn EncryptionHandle,
    engine: &base64::engine::GeneralPurpose,
) -> EncryptionMethod {
    let mut method = EncryptionMethod::new(handle.uri());
    if let Some(params) = handle.oaep_params() {
        method.oaep_params = params.label.as_ref().map(|l| engine.encode(l));
        method.digest_method = params
            .digest_uri
            .as_ref()
            .map(samlkit_dsig::DigestMethod::new);
        // MGF is only expressible for the xmlenc 1.1 identifier.
        if handle.uri() == algorithm::RSA_OAEP_ENC11 {
            method.mgf = params.mgf_uri.clone();
        }
    }
    method
}

/// Points the data at its detached key, by `RetrievalMethod` when the
/// key has an Id and by `KeyName` when it carries a name.
fn detached_key_info(ctx: &EncContext) -> Option<KeyInfo> {
    let mut items = Vec::new();
    if let Some(id) = &ctx.key_id {
        items.push(KeyInfoItem::Element(
            Node::new(ns::DSIG, ns::prefix::DSIG, "RetrievalMethod")
                .with_attr(ns::attr::URI, format!("#{id}"))
                .with_attr(ns::attr::TYPE, algorithm::ENCRYPTED_KEY),
        ));
    }
    if let Some(name) = &ctx.carried_key_name {
        items.push(KeyInfoItem::KeyName(KeyName(name.clone())));
    }
    (!items.is_empty()).then_some(KeyInfo { id: None, items })
}

#[cfg(test)]
mod tests {
    use super::*;
    use samlkit_keys::{loader, AlgorithmFactory};

    const RSA_PUBLIC: &[u8] = include_bytes!("../../../testdata/keys/rsa-public.pem");

    fn transport() -> Box<dyn EncryptionHandle> {
        let key = loader::load_rsa_public_pem(RSA_PUBLIC).unwrap().with_name("sp-enc");
        AlgorithmFactory::default()
            .key_transport(algorithm::RSA_OAEP, key)
            .unwrap()
    }

    fn payload() -> Node {
        Node::new(ns::SAML, "saml", "Issuer").with_text("https://idp.example.org")
    }

    #[test]
    fn test_inline_placement() {
        let env = encrypt_node(&payload(), transport().as_ref(), &EncContext::new()).unwrap();
        assert!(env.keys.is_empty());
        assert_eq!(env.data.algorithm(), Some(algorithm::AES256_GCM));
        assert_eq!(env.data.type_.as_deref(), Some(ns::ENC_TYPE_ELEMENT));
        let inline = env.data.inline_keys().unwrap();
        assert_eq!(inline.len(), 1);
        assert_eq!(inline[0].algorithm(), Some(algorithm::RSA_OAEP));
        let names: Vec<_> = inline[0].key_info.as_ref().unwrap().key_names().collect();
        assert_eq!(names, vec!["sp-enc"]);
    }

    #[test]
    fn test_detached_placement_links_data() {
        let ctx = EncContext::new().detached("_data", "_key");
        let env = encrypt_node(&payload(), transport().as_ref(), &ctx).unwrap();
        assert_eq!(env.keys.len(), 1);
        assert!(env.data.inline_keys().unwrap().is_empty());
        assert!(env.keys[0]
            .reference_list
            .as_ref()
            .unwrap()
            .references_data("_data"));
        assert_eq!(env.keys[0].id.as_deref(), Some("_key"));
    }

    #[test]
    fn test_detached_without_id_fails() {
        let ctx = EncContext {
            placement: KeyPlacement::Detached,
            ..EncContext::new()
        };
        let err = encrypt_node(&payload(), transport().as_ref(), &ctx).unwrap_err();
        assert!(matches!(err, Error::Encryption(_)));
    }

    #[test]
    fn test_session_key_length_checked() {
        let ctx = EncContext::new()
            .with_data_algorithm(algorithm::AES128_CBC)
            .with_session_key(vec![0u8; 32]);
        let err = encrypt_node(&payload(), transport().as_ref(), &ctx).unwrap_err();
        assert!(matches!(err, Error::Key(_)));
    }

    #[test]
    fn test_blacklisted_data_algorithm() {
        let ctx = EncContext::new()
            .with_data_algorithm(algorithm::TRIPLEDES_CBC)
            .with_blacklist(vec![algorithm::TRIPLEDES_CBC.to_string()]);
        let err = encrypt_node(&payload(), transport().as_ref(), &ctx).unwrap_err();
        assert!(matches!(err, Error::BlacklistedAlgorithm(_)));
    }
}
