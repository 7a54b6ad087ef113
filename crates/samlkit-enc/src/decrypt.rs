#![forbid(unsafe_code)]

//! XML-Enc decryption of an [`Envelope`].
//!
//! Processing order:
//! 1. Read the data `EncryptionMethod` URI
//! 2. Collect `EncryptedKey`s: inline in `KeyInfo`, then detached ones
//!    whose `ReferenceList` (if any) names the data
//! 3. Keep the keys whose transport algorithm is the handle's
//! 4. Unwrap the session key with the first key that yields one
//! 5. Decrypt `CipherData` with the data algorithm

use base64::Engine;
use samlkit_core::{algorithm, Error, Result};
use samlkit_keys::EncryptionHandle;
use samlkit_xml::{Node, XmlElement};

use crate::context::EncContext;
use crate::encrypt::Envelope;
use crate::types::{CipherData, EncryptedData, EncryptedKey};

/// Decrypt the envelope's payload bytes.
///
/// When the envelope carries no `EncryptedKey` at all, `handle` is used
/// directly as the data key.
pub fn decrypt_envelope(
    env: &Envelope,
    handle: &dyn EncryptionHandle,
    ctx: &EncContext,
) -> Result<Vec<u8>> {
    let data_uri = env
        .data
        .algorithm()
        .ok_or_else(|| EncryptedData::violation("missing EncryptionMethod"))?;
    ctx.check(data_uri)?;
    let cipher = samlkit_crypto::cipher::from_uri(data_uri)?;
    let ciphertext = cipher_bytes(&env.data.cipher_data, "EncryptedData")?;

    let mut keys = env.data.inline_keys()?;
    keys.extend(
        env.keys
            .iter()
            .filter(|k| applies_to(k, env.data.id.as_deref()))
            .cloned(),
    );

    if keys.is_empty() {
        if handle.uri() != data_uri {
            return Err(Error::KeyMismatch(format!(
                "no EncryptedKey, and the key is bound to {} not {data_uri}",
                handle.uri()
            )));
        }
        tracing::debug!(algorithm = data_uri, "decrypting with out-of-band key");
        return handle.decrypt(&ciphertext);
    }

    let session_key = unwrap_session_key(&keys, handle, ctx)?;
    let size = cipher.key_size();
    if session_key.len() != size {
        return Err(Error::DecryptionFailure(format!(
            "session key is {} bytes, {data_uri} needs {size}",
            session_key.len()
        )));
    }
    cipher.decrypt(&session_key, &ciphertext)
}

/// Decrypt the envelope and parse the plaintext as an element.
pub fn decrypt_to_node(
    env: &Envelope,
    handle: &dyn EncryptionHandle,
    ctx: &EncContext,
) -> Result<Node> {
    let plaintext = decrypt_envelope(env, handle, ctx)?;
    samlkit_xml::parse(&plaintext)
}

/// A detached key applies when it has no `ReferenceList`, or its list
/// names the data.
fn applies_to(key: &EncryptedKey, data_id: Option<&str>) -> bool {
    match (&key.reference_list, data_id) {
        (None, _) => true,
        (Some(list), Some(id)) => list.references_data(id),
        (Some(_), None) => false,
    }
}

fn unwrap_session_key(
    keys: &[EncryptedKey],
    handle: &dyn EncryptionHandle,
    ctx: &EncContext,
) -> Result<Vec<u8>> {
    let candidates: Vec<&EncryptedKey> = keys
        .iter()
        .filter(|k| k.algorithm() == Some(handle.uri()) && oaep_matches(k, handle))
        .collect();
    if candidates.is_empty() {
        return Err(Error::KeyMismatch(format!(
            "none of {} EncryptedKey(s) uses {}",
            keys.len(),
            handle.uri()
        )));
    }
    ctx.check(handle.uri())?;

    let mut last_err = None;
    for (i, key) in candidates.iter().enumerate() {
        let wrapped = cipher_bytes(&key.cipher_data, "EncryptedKey")?;
        match handle.decrypt(&wrapped) {
            Ok(session_key) => {
                tracing::debug!(index = i, id = ?key.id, "unwrapped session key");
                return Ok(session_key);
            }
            Err(e @ Error::KeyMismatch(_)) => return Err(e),
            Err(e) => {
                tracing::warn!(index = i, id = ?key.id, error = %e, "EncryptedKey rejected");
                last_err = Some(e);
            }
        }
    }
    Err(last_err.unwrap_or_else(|| Error::DecryptionFailure("no EncryptedKey unwrapped".into())))
}

/// RSA-OAEP keys must agree on the digest the handle was built with.
fn oaep_matches(key: &EncryptedKey, handle: &dyn EncryptionHandle) -> bool {
    let Some(params) = handle.oaep_params() else {
        return true;
    };
    let declared = key
        .encryption_method
        .as_ref()
        .and_then(|m| m.digest_method.as_ref())
        .map(|d| d.algorithm.as_str())
        .unwrap_or(algorithm::SHA1);
    declared == params.digest_uri.as_deref().unwrap_or(algorithm::SHA1)
}

fn cipher_bytes(data: &CipherData, owner: &str) -> Result<Vec<u8>> {
    match data {
        CipherData::Value(v) => {
            let clean: String = v.chars().filter(|c| !c.is_whitespace()).collect();
            base64::engine::general_purpose::STANDARD
                .decode(clean)
                .map_err(|e| Error::Base64(format!("{owner} CipherValue: {e}")))
        }
        CipherData::Reference { uri, .. } => Err(Error::UnsupportedAlgorithm(format!(
            "{owner} CipherReference {uri} is not resolved"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encrypt::encrypt_node;
    use crate::types::{ReferenceList, ReferenceListItem};
    use samlkit_core::ns;
    use samlkit_keys::{loader, AlgorithmFactory};
    use samlkit_xml::{parse, Serializable};

    const RSA_PRIVATE: &[u8] = include_bytes!("../../../testdata/keys/rsa-private.pem");
    const RSA_PUBLIC: &[u8] = include_bytes!("../../../testdata/keys/rsa-public.pem");
    const RSA_OTHER: &[u8] = include_bytes!("../../../testdata/keys/rsa-other-private.pem");

    fn handle(pem: &[u8], public: bool, uri: &str) -> Box<dyn EncryptionHandle> {
        let key = if public {
            loader::load_rsa_public_pem(pem).unwrap()
        } else {
            loader::load_rsa_private_pem(pem).unwrap()
        };
        AlgorithmFactory::default().key_transport(uri, key).unwrap()
    }

    fn payload() -> Node {
        Node::new(ns::SAML, "saml", "NameID")
            .with_attr("Format", "urn:oasis:names:tc:SAML:2.0:nameid-format:persistent")
            .with_text("abc123")
    }

    #[test]
    fn test_round_trip_each_data_algorithm() {
        let enc = handle(RSA_PUBLIC, true, algorithm::RSA_OAEP);
        let dec = handle(RSA_PRIVATE, false, algorithm::RSA_OAEP);
        for uri in [
            algorithm::AES128_CBC,
            algorithm::AES256_CBC,
            algorithm::AES128_GCM,
            algorithm::AES256_GCM,
            algorithm::TRIPLEDES_CBC,
        ] {
            let ctx = EncContext::new().with_data_algorithm(uri);
            let env = encrypt_node(&payload(), enc.as_ref(), &ctx).unwrap();
            let expected = parse(&samlkit_c14n::render(&payload())).unwrap();
            assert_eq!(decrypt_to_node(&env, dec.as_ref(), &ctx).unwrap(), expected);
        }
    }

    #[test]
    fn test_round_trip_through_wire() {
        let enc = handle(RSA_PUBLIC, true, algorithm::RSA_OAEP_ENC11);
        let dec = handle(RSA_PRIVATE, false, algorithm::RSA_OAEP_ENC11);
        let ctx = EncContext::new();
        let env = encrypt_node(&payload(), enc.as_ref(), &ctx).unwrap();
        let wire = samlkit_c14n::render(&env.data.to_node());
        let data = EncryptedData::from_node(&parse(&wire).unwrap()).unwrap();
        let received = Envelope { data, keys: Vec::new() };
        let plaintext = decrypt_envelope(&received, dec.as_ref(), &ctx).unwrap();
        assert_eq!(plaintext, samlkit_c14n::render(&payload()));
    }

    #[test]
    fn test_transport_mismatch() {
        let enc = handle(RSA_PUBLIC, true, algorithm::RSA_OAEP);
        let dec = handle(RSA_PRIVATE, false, algorithm::RSA_OAEP_ENC11);
        let ctx = EncContext::new();
        let env = encrypt_node(&payload(), enc.as_ref(), &ctx).unwrap();
        let err = decrypt_envelope(&env, dec.as_ref(), &ctx).unwrap_err();
        assert!(matches!(err, Error::KeyMismatch(_)));
    }

    #[test]
    fn test_wrong_private_key_fails() {
        let enc = handle(RSA_PUBLIC, true, algorithm::RSA_OAEP);
        let dec = handle(RSA_OTHER, false, algorithm::RSA_OAEP);
        let ctx = EncContext::new();
        let env = encrypt_node(&payload(), enc.as_ref(), &ctx).unwrap();
        let err = decrypt_envelope(&env, dec.as_ref(), &ctx).unwrap_err();
        assert!(matches!(err, Error::DecryptionFailure(_)));
    }

    #[test]
    fn test_public_key_cannot_decrypt() {
        let enc = handle(RSA_PUBLIC, true, algorithm::RSA_OAEP);
        let ctx = EncContext::new();
        let env = encrypt_node(&payload(), enc.as_ref(), &ctx).unwrap();
        let err = decrypt_envelope(&env, enc.as_ref(), &ctx).unwrap_err();
        assert!(matches!(err, Error::KeyMismatch(_)));
    }

    #[test]
    fn test_tampered_ciphertext() {
        let enc = handle(RSA_PUBLIC, true, algorithm::RSA_OAEP);
        let dec = handle(RSA_PRIVATE, false, algorithm::RSA_OAEP);
        let ctx = EncContext::new();
        let mut env = encrypt_node(&payload(), enc.as_ref(), &ctx).unwrap();
        let engine = base64::engine::general_purpose::STANDARD;
        let mut bytes = cipher_bytes(&env.data.cipher_data, "test").unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        env.data.cipher_data = CipherData::Value(engine.encode(bytes));
        let err = decrypt_envelope(&env, dec.as_ref(), &ctx).unwrap_err();
        assert!(matches!(err, Error::DecryptionFailure(_)));
    }

    #[test]
    fn test_detached_keys_tried_in_order() {
        let enc = handle(RSA_PUBLIC, true, algorithm::RSA_OAEP);
        let dec = handle(RSA_PRIVATE, false, algorithm::RSA_OAEP);
        let other = handle(RSA_OTHER, false, algorithm::RSA_OAEP);
        let ctx = EncContext::new().detached("_d", "_k");
        let mut env = encrypt_node(&payload(), enc.as_ref(), &ctx).unwrap();

        // A key for a different recipient comes first and is skipped.
        let mut foreign = env.keys[0].clone();
        foreign.id = Some("_k0".into());
        foreign.cipher_data = CipherData::Value(
            base64::engine::general_purpose::STANDARD.encode(vec![7u8; 256]),
        );
        env.keys.insert(0, foreign);
        assert_eq!(
            decrypt_envelope(&env, dec.as_ref(), &ctx).unwrap(),
            samlkit_c14n::render(&payload())
        );
        assert!(decrypt_envelope(&env, other.as_ref(), &ctx).is_err());
    }

    #[test]
    fn test_session_key_of_wrong_length_refused() {
        let enc = handle(RSA_PUBLIC, true, algorithm::RSA_OAEP);
        let dec = handle(RSA_PRIVATE, false, algorithm::RSA_OAEP);
        let ctx = EncContext::new()
            .with_data_algorithm(algorithm::AES128_CBC)
            .detached("_d", "_k");
        let mut env = encrypt_node(&payload(), enc.as_ref(), &ctx).unwrap();
        let oversized = enc.encrypt(&[1u8; 32]).unwrap();
        env.keys[0].cipher_data =
            CipherData::Value(base64::engine::general_purpose::STANDARD.encode(oversized));
        match decrypt_envelope(&env, dec.as_ref(), &ctx).unwrap_err() {
            Error::DecryptionFailure(reason) => assert!(reason.contains("needs 16"), "{reason}"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_detached_key_for_other_data_ignored() {
        let enc = handle(RSA_PUBLIC, true, algorithm::RSA_OAEP);
        let dec = handle(RSA_PRIVATE, false, algorithm::RSA_OAEP);
        let ctx = EncContext::new().detached("_d", "_k");
        let mut env = encrypt_node(&payload(), enc.as_ref(), &ctx).unwrap();
        env.keys[0].reference_list = Some(ReferenceList(vec![ReferenceListItem::DataReference(
            "#_elsewhere".into(),
        )]));
        // The RetrievalMethod pointer is not an EncryptedKey, so the data
        // falls back to the out-of-band path and the handle is refused.
        let err = decrypt_envelope(&env, dec.as_ref(), &ctx).unwrap_err();
        assert!(matches!(err, Error::KeyMismatch(_)));
    }

    #[test]
    fn test_out_of_band_key() {
        let data_key = vec![9u8; 16];
        let ctx = EncContext::new()
            .with_data_algorithm(algorithm::AES128_GCM)
            .with_session_key(data_key.clone());
        let enc = handle(RSA_PUBLIC, true, algorithm::RSA_OAEP);
        let mut env = encrypt_node(&payload(), enc.as_ref(), &ctx).unwrap();
        env.data.key_info = None;
        let direct = AlgorithmFactory::default()
            .block_cipher(algorithm::AES128_GCM, &data_key)
            .unwrap();
        assert_eq!(
            decrypt_envelope(&env, direct.as_ref(), &ctx).unwrap(),
            samlkit_c14n::render(&payload())
        );
    }

    #[test]
    fn test_blacklisted_data_algorithm_refused() {
        let enc = handle(RSA_PUBLIC, true, algorithm::RSA_OAEP);
        let dec = handle(RSA_PRIVATE, false, algorithm::RSA_OAEP);
        let env = encrypt_node(
            &payload(),
            enc.as_ref(),
            &EncContext::new().with_data_algorithm(algorithm::AES128_CBC),
        )
        .unwrap();
        let strict = EncContext::new().with_blacklist(vec![algorithm::AES128_CBC.to_string()]);
        let err = decrypt_envelope(&env, dec.as_ref(), &strict).unwrap_err();
        assert!(matches!(err, Error::BlacklistedAlgorithm(_)));
    }
}
