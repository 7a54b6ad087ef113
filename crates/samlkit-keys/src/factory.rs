#![forbid(unsafe_code)]

//! Builds algorithm handles, refusing blacklisted algorithms.

use samlkit_core::{algorithm, Error, Result};
use samlkit_crypto::keytransport::OaepParams;
use samlkit_crypto::AlgorithmRegistry;

use crate::handle::{
    BlockCipherHandle, EncryptionHandle, KeyWrapHandle, RsaTransportHandle, SignatureHandle,
    SignerHandle,
};
use crate::key::Key;

#[derive(Debug, Clone)]
pub struct AlgorithmFactory {
    blacklist: Vec<String>,
}

impl Default for AlgorithmFactory {
    fn default() -> Self {
        Self::new(algorithm::DEFAULT_BLACKLIST.iter().map(|s| s.to_string()))
    }
}

impl AlgorithmFactory {
    pub fn new(blacklist: impl IntoIterator<Item = String>) -> Self {
        Self {
            blacklist: blacklist.into_iter().collect(),
        }
    }

    /// A factory that refuses nothing.
    pub fn permissive() -> Self {
        Self::new(Vec::new())
    }

    pub fn blacklist(&self) -> &[String] {
        &self.blacklist
    }

    pub fn check(&self, uri: &str) -> Result<()> {
        if self.blacklist.iter().any(|b| b == uri) {
            tracing::warn!(algorithm = uri, "refusing blacklisted algorithm");
            return Err(Error::BlacklistedAlgorithm(uri.to_owned()));
        }
        Ok(())
    }

    /// Key transport handle: RSA (PKCS#1 v1.5 / OAEP) or AES key wrap,
    /// chosen by `uri`.
    pub fn key_transport(&self, uri: &str, key: Key) -> Result<Box<dyn EncryptionHandle>> {
        self.key_transport_with_params(uri, key, OaepParams::default())
    }

    pub fn key_transport_with_params(
        &self,
        uri: &str,
        key: Key,
        params: OaepParams,
    ) -> Result<Box<dyn EncryptionHandle>> {
        self.check(uri)?;
        if AlgorithmRegistry::is_key_wrap(uri) {
            let alg = AlgorithmRegistry::key_wrap(uri)?;
            match key.symmetric_key_bytes() {
                Some(k) if k.len() == alg.kek_size() => {}
                _ => {
                    return Err(Error::Key(format!(
                        "{uri} needs a {} byte symmetric key",
                        alg.kek_size()
                    )))
                }
            }
            return Ok(Box::new(KeyWrapHandle { alg, key }));
        }
        let alg = AlgorithmRegistry::key_transport(uri, params.clone())?;
        if key.rsa_public_key().is_none() {
            return Err(Error::Key(format!("{uri} needs an RSA key")));
        }
        Ok(Box::new(RsaTransportHandle { alg, params, key }))
    }

    /// Data encryption handle bound to a symmetric key.
    pub fn block_cipher(&self, uri: &str, key: &[u8]) -> Result<Box<dyn EncryptionHandle>> {
        self.check(uri)?;
        let alg = AlgorithmRegistry::cipher(uri)?;
        if key.len() != alg.key_size() {
            return Err(Error::Key(format!(
                "{uri} needs a {} byte key, got {}",
                alg.key_size(),
                key.len()
            )));
        }
        Ok(Box::new(BlockCipherHandle {
            alg,
            key: key.to_vec(),
        }))
    }

    pub fn signature(&self, uri: &str, key: Key) -> Result<Box<dyn SignatureHandle>> {
        self.check(uri)?;
        let alg = AlgorithmRegistry::signature(uri)?;
        if key.to_signing_key().is_none() {
            return Err(Error::Key(format!("key cannot be used with {uri}")));
        }
        Ok(Box::new(SignerHandle { alg, key }))
    }
}
