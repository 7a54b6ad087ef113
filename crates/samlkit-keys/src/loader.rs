#![forbid(unsafe_code)]

//! Key loading from PEM and raw binary data.

use samlkit_core::{Error, Result};

use crate::key::{Key, KeyData, KeyUsage};

fn pem_str(pem_data: &[u8]) -> Result<&str> {
    std::str::from_utf8(pem_data).map_err(|e| Error::Key(format!("invalid PEM encoding: {e}")))
}

fn rsa_key(private: rsa::RsaPrivateKey) -> Key {
    let public = private.to_public_key();
    Key::new(
        KeyData::Rsa {
            private: Some(private),
            public,
        },
        KeyUsage::Any,
    )
}

/// Load an RSA private key from PEM data (PKCS#8, then PKCS#1).
pub fn load_rsa_private_pem(pem_data: &[u8]) -> Result<Key> {
    use pkcs1::DecodeRsaPrivateKey;
    use pkcs8::DecodePrivateKey;
    let pem = pem_str(pem_data)?;

    if let Ok(pk) = rsa::RsaPrivateKey::from_pkcs8_pem(pem) {
        return Ok(rsa_key(pk));
    }
    rsa::RsaPrivateKey::from_pkcs1_pem(pem)
        .map(rsa_key)
        .map_err(|e| Error::Key(format!("failed to parse RSA private key PEM: {e}")))
}

/// Load an RSA public key from PEM data (SPKI, then PKCS#1).
pub fn load_rsa_public_pem(pem_data: &[u8]) -> Result<Key> {
    use pkcs1::DecodeRsaPublicKey;
    use pkcs8::DecodePublicKey;
    let pem = pem_str(pem_data)?;

    let public = match rsa::RsaPublicKey::from_public_key_pem(pem) {
        Ok(pk) => pk,
        Err(_) => rsa::RsaPublicKey::from_pkcs1_pem(pem)
            .map_err(|e| Error::Key(format!("failed to parse RSA public key PEM: {e}")))?,
    };
    Ok(Key::new(
        KeyData::Rsa {
            private: None,
            public,
        },
        KeyUsage::Verify,
    ))
}

/// Load an EC P-256 private key from PKCS#8 PEM data.
pub fn load_ec_p256_private_pem(pem_data: &[u8]) -> Result<Key> {
    use pkcs8::DecodePrivateKey;
    let sk = p256::ecdsa::SigningKey::from_pkcs8_pem(pem_str(pem_data)?)
        .map_err(|e| Error::Key(format!("failed to parse EC P-256 private key: {e}")))?;
    let public = *sk.verifying_key();
    Ok(Key::new(
        KeyData::EcP256 {
            private: Some(sk),
            public,
        },
        KeyUsage::Any,
    ))
}

/// Load an EC P-256 public key from SPKI PEM data.
pub fn load_ec_p256_public_pem(pem_data: &[u8]) -> Result<Key> {
    use pkcs8::DecodePublicKey;
    let public = p256::ecdsa::VerifyingKey::from_public_key_pem(pem_str(pem_data)?)
        .map_err(|e| Error::Key(format!("failed to parse EC P-256 public key: {e}")))?;
    Ok(Key::new(
        KeyData::EcP256 {
            private: None,
            public,
        },
        KeyUsage::Verify,
    ))
}

pub fn load_hmac_key(data: &[u8]) -> Key {
    Key::new(KeyData::Hmac(data.to_vec()), KeyUsage::Any)
}

pub fn load_aes_key(data: &[u8]) -> Result<Key> {
    match data.len() {
        16 | 24 | 32 => Ok(Key::new(KeyData::Aes(data.to_vec()), KeyUsage::Any)),
        n => Err(Error::Key(format!(
            "invalid AES key size: {n} (expected 16, 24, or 32)"
        ))),
    }
}

pub fn load_des3_key(data: &[u8]) -> Result<Key> {
    if data.len() != 24 {
        return Err(Error::Key(format!(
            "invalid 3DES key size: {} (expected 24)",
            data.len()
        )));
    }
    Ok(Key::new(KeyData::Des3(data.to_vec()), KeyUsage::Any))
}

/// Auto-detect the key type of PEM data.
///
/// Tries RSA private, RSA public, EC P-256 private and EC P-256 public
/// in that order.
pub fn load_pem_auto(pem_data: &[u8]) -> Result<Key> {
    load_rsa_private_pem(pem_data)
        .or_else(|_| load_rsa_public_pem(pem_data))
        .or_else(|_| load_ec_p256_private_pem(pem_data))
        .or_else(|_| load_ec_p256_public_pem(pem_data))
        .map_err(|_| Error::Key("unable to auto-detect key format from PEM data".into()))
}

/// Load a PEM key file, auto-detecting its type. The file stem becomes
/// the key name.
pub fn load_key_file(path: &std::path::Path) -> Result<Key> {
    let data = std::fs::read(path)?;
    if !data.starts_with(b"-----BEGIN") {
        return Err(Error::Key(format!(
            "{} is not a PEM file",
            path.display()
        )));
    }
    let key = load_pem_auto(&data)?;
    Ok(match path.file_stem().and_then(|s| s.to_str()) {
        Some(stem) => key.with_name(stem),
        None => key,
    })
}
