#![forbid(unsafe_code)]

//! Algorithm handles: an algorithm URI bound to key material.
//!
//! The encryption engine and signing integration only ever see these
//! traits. They never touch the key itself, and they read the URI back
//! to write it into `EncryptionMethod` / `SignatureMethod` metadata.

use samlkit_core::{Error, Result};
use samlkit_crypto::cipher::CipherAlgorithm;
use samlkit_crypto::keytransport::{KeyTransportAlgorithm, OaepParams};
use samlkit_crypto::keywrap::KeyWrapAlgorithm;
use samlkit_crypto::sign::SignatureAlgorithm;

use crate::key::Key;

/// Encrypt/decrypt capability bound to one algorithm and one key.
pub trait EncryptionHandle: Send + Sync {
    fn uri(&self) -> &str;
    fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>>;
    fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>>;

    /// OAEP parameters to record in `EncryptionMethod`.
    fn oaep_params(&self) -> Option<&OaepParams> {
        None
    }

    /// Name of the bound key, written as `ds:KeyName`.
    fn key_name(&self) -> Option<&str> {
        None
    }
}

/// Sign/verify capability bound to one algorithm and one key.
pub trait SignatureHandle: Send + Sync {
    fn uri(&self) -> &str;
    /// `DigestMethod` used for references signed with this handle.
    fn digest_uri(&self) -> &str;
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>>;
    fn verify(&self, data: &[u8], signature: &[u8]) -> Result<bool>;

    fn key_name(&self) -> Option<&str> {
        None
    }
}

// ── RSA key transport ────────────────────────────────────────────────

pub struct RsaTransportHandle {
    pub(crate) alg: Box<dyn KeyTransportAlgorithm>,
    pub(crate) params: OaepParams,
    pub(crate) key: Key,
}

impl EncryptionHandle for RsaTransportHandle {
    fn uri(&self) -> &str {
        self.alg.uri()
    }

    fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        let public = self
            .key
            .rsa_public_key()
            .ok_or_else(|| Error::Key("RSA key required for key transport".into()))?;
        self.alg.encrypt(public, data)
    }

    fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        let private = self.key.rsa_private_key().ok_or_else(|| {
            Error::KeyMismatch(format!("{} needs an RSA private key", self.alg.uri()))
        })?;
        self.alg.decrypt(private, data)
    }

    fn oaep_params(&self) -> Option<&OaepParams> {
        (self.alg.uri() != samlkit_core::algorithm::RSA_PKCS1).then_some(&self.params)
    }

    fn key_name(&self) -> Option<&str> {
        self.key.name.as_deref()
    }
}

// ── Symmetric key wrap ───────────────────────────────────────────────

pub struct KeyWrapHandle {
    pub(crate) alg: Box<dyn KeyWrapAlgorithm>,
    pub(crate) key: Key,
}

impl KeyWrapHandle {
    fn kek(&self) -> Result<&[u8]> {
        self.key
            .symmetric_key_bytes()
            .ok_or_else(|| Error::Key("symmetric key required for key wrap".into()))
    }
}

impl EncryptionHandle for KeyWrapHandle {
    fn uri(&self) -> &str {
        self.alg.uri()
    }

    fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        self.alg.wrap(self.kek()?, data)
    }

    fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        self.alg.unwrap(self.kek()?, data)
    }

    fn key_name(&self) -> Option<&str> {
        self.key.name.as_deref()
    }
}

// ── Block cipher with a known key ────────────────────────────────────

/// Data encryption with a symmetric key the caller already holds, for
/// envelopes whose key travels out of band.
pub struct BlockCipherHandle {
    pub(crate) alg: Box<dyn CipherAlgorithm>,
    pub(crate) key: Vec<u8>,
}

impl EncryptionHandle for BlockCipherHandle {
    fn uri(&self) -> &str {
        self.alg.uri()
    }

    fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        self.alg.encrypt(&self.key, data)
    }

    fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        self.alg.decrypt(&self.key, data)
    }
}

// ── Signatures ───────────────────────────────────────────────────────

pub struct SignerHandle {
    pub(crate) alg: Box<dyn SignatureAlgorithm>,
    pub(crate) key: Key,
}

impl SignatureHandle for SignerHandle {
    fn uri(&self) -> &str {
        self.alg.uri()
    }

    fn digest_uri(&self) -> &str {
        self.alg.hash().digest_uri()
    }

    fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        let key = self
            .key
            .to_signing_key()
            .ok_or_else(|| Error::Key("key cannot be used for signatures".into()))?;
        self.alg.sign(&key, data)
    }

    fn verify(&self, data: &[u8], signature: &[u8]) -> Result<bool> {
        let key = self
            .key
            .to_signing_key()
            .ok_or_else(|| Error::Key("key cannot be used for signatures".into()))?;
        self.alg.verify(&key, data, signature)
    }

    fn key_name(&self) -> Option<&str> {
        self.key.name.as_deref()
    }
}
