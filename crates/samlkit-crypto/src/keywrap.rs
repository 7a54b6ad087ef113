#![forbid(unsafe_code)]

//! AES key wrap (RFC 3394) for symmetric `EncryptedKey` transport.

use aes_kw::Kek;
use samlkit_core::{algorithm, Error, Result};

/// Trait for key wrap algorithms.
pub trait KeyWrapAlgorithm: Send + Sync {
    fn uri(&self) -> &'static str;
    fn wrap(&self, kek: &[u8], key_data: &[u8]) -> Result<Vec<u8>>;
    /// An integrity check failure is reported as [`Error::DecryptionFailure`].
    fn unwrap(&self, kek: &[u8], wrapped: &[u8]) -> Result<Vec<u8>>;
    fn kek_size(&self) -> usize;
}

/// Create a key wrap algorithm from its URI.
pub fn from_uri(uri: &str) -> Result<Box<dyn KeyWrapAlgorithm>> {
    let (kek_size, uri) = match uri {
        algorithm::KW_AES128 => (16, algorithm::KW_AES128),
        algorithm::KW_AES192 => (24, algorithm::KW_AES192),
        algorithm::KW_AES256 => (32, algorithm::KW_AES256),
        _ => return Err(Error::UnsupportedAlgorithm(format!("key wrap: {uri}"))),
    };
    Ok(Box::new(AesKeyWrap { kek_size, uri }))
}

struct AesKeyWrap {
    kek_size: usize,
    uri: &'static str,
}

impl AesKeyWrap {
    fn check_kek(&self, kek: &[u8]) -> Result<()> {
        if kek.len() != self.kek_size {
            return Err(Error::Crypto(format!(
                "{}: expected {} byte KEK, got {}",
                self.uri,
                self.kek_size,
                kek.len()
            )));
        }
        Ok(())
    }
}

impl KeyWrapAlgorithm for AesKeyWrap {
    fn uri(&self) -> &'static str {
        self.uri
    }

    fn kek_size(&self) -> usize {
        self.kek_size
    }

    fn wrap(&self, kek: &[u8], key_data: &[u8]) -> Result<Vec<u8>> {
        self.check_kek(kek)?;
        macro_rules! run {
            ($aes:ty) => {
                Kek::<$aes>::new(kek.into())
                    .wrap_vec(key_data)
                    .map_err(|e| Error::Encryption(format!("AES-KW wrap: {e}")))
            };
        }
        match self.kek_size {
            16 => run!(aes::Aes128),
            24 => run!(aes::Aes192),
            _ => run!(aes::Aes256),
        }
    }

    fn unwrap(&self, kek: &[u8], wrapped: &[u8]) -> Result<Vec<u8>> {
        self.check_kek(kek)?;
        macro_rules! run {
            ($aes:ty) => {
                Kek::<$aes>::new(kek.into())
                    .unwrap_vec(wrapped)
                    .map_err(|e| Error::DecryptionFailure(format!("AES-KW unwrap: {e}")))
            };
        }
        match self.kek_size {
            16 => run!(aes::Aes128),
            24 => run!(aes::Aes192),
            _ => run!(aes::Aes256),
        }
    }
}
