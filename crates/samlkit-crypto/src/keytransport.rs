#![forbid(unsafe_code)]

//! RSA key transport for `EncryptedKey` (RSA PKCS#1 v1.5, RSA-OAEP).

use rsa::{Oaep, Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};
use samlkit_core::{algorithm, Error, Result};

use crate::digest::HashAlg;

/// Trait for key transport algorithms.
pub trait KeyTransportAlgorithm: Send + Sync {
    fn uri(&self) -> &'static str;
    fn encrypt(&self, public_key: &RsaPublicKey, key_data: &[u8]) -> Result<Vec<u8>>;
    fn decrypt(&self, private_key: &RsaPrivateKey, encrypted: &[u8]) -> Result<Vec<u8>>;
}

/// RSA-OAEP parameters carried by `EncryptionMethod`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OaepParams {
    /// `ds:DigestMethod` URI, SHA-1 when absent.
    pub digest_uri: Option<String>,
    /// `xenc11:MGF` URI.
    pub mgf_uri: Option<String>,
    /// Decoded `OAEPparams` label.
    pub label: Option<Vec<u8>>,
}

/// Create a key transport algorithm from its URI.
pub fn from_uri(uri: &str) -> Result<Box<dyn KeyTransportAlgorithm>> {
    from_uri_with_params(uri, OaepParams::default())
}

pub fn from_uri_with_params(uri: &str, params: OaepParams) -> Result<Box<dyn KeyTransportAlgorithm>> {
    match uri {
        algorithm::RSA_PKCS1 => Ok(Box::new(RsaPkcs1Transport)),
        algorithm::RSA_OAEP | algorithm::RSA_OAEP_ENC11 => {
            let digest = match params.digest_uri.as_deref() {
                None => HashAlg::Sha1,
                Some(d) => HashAlg::from_digest_uri(d)?,
            };
            let mgf = match params.mgf_uri.as_deref() {
                Some(algorithm::MGF1_SHA1) => HashAlg::Sha1,
                Some(algorithm::MGF1_SHA256) => HashAlg::Sha256,
                Some(other) => {
                    return Err(Error::UnsupportedAlgorithm(format!("OAEP MGF: {other}")))
                }
                // mgf1p always uses MGF1-SHA1; xmlenc11 defaults to SHA1 too.
                None => HashAlg::Sha1,
            };
            let uri = if uri == algorithm::RSA_OAEP {
                algorithm::RSA_OAEP
            } else {
                algorithm::RSA_OAEP_ENC11
            };
            Ok(Box::new(RsaOaepTransport {
                uri,
                digest,
                mgf,
                label: params.label,
            }))
        }
        _ => Err(Error::UnsupportedAlgorithm(format!("key transport: {uri}"))),
    }
}

struct RsaPkcs1Transport;

impl KeyTransportAlgorithm for RsaPkcs1Transport {
    fn uri(&self) -> &'static str {
        algorithm::RSA_PKCS1
    }

    fn encrypt(&self, public_key: &RsaPublicKey, key_data: &[u8]) -> Result<Vec<u8>> {
        public_key
            .encrypt(&mut rand::thread_rng(), Pkcs1v15Encrypt, key_data)
            .map_err(|e| Error::Encryption(format!("RSA PKCS#1 encrypt: {e}")))
    }

    fn decrypt(&self, private_key: &RsaPrivateKey, encrypted: &[u8]) -> Result<Vec<u8>> {
        private_key
            .decrypt(Pkcs1v15Encrypt, encrypted)
            .map_err(|e| Error::DecryptionFailure(format!("RSA PKCS#1 decrypt: {e}")))
    }
}

struct RsaOaepTransport {
    uri: &'static str,
    digest: HashAlg,
    mgf: HashAlg,
    label: Option<Vec<u8>>,
}

fn oaep<D, M>(label: Option<&[u8]>) -> Oaep
where
    D: 'static + digest::Digest + digest::DynDigest + Send + Sync,
    M: 'static + digest::Digest + digest::DynDigest + Send + Sync,
{
    let mut padding = Oaep::new_with_mgf_hash::<D, M>();
    padding.label = label.map(|l| String::from_utf8_lossy(l).into_owned());
    padding
}

impl RsaOaepTransport {
    fn padding(&self) -> Oaep {
        let label = self.label.as_deref();
        macro_rules! with_mgf {
            ($d:ty) => {
                match self.mgf {
                    HashAlg::Sha256 => oaep::<$d, sha2::Sha256>(label),
                    _ => oaep::<$d, sha1::Sha1>(label),
                }
            };
        }
        match self.digest {
            HashAlg::Sha1 => with_mgf!(sha1::Sha1),
            HashAlg::Sha224 => with_mgf!(sha2::Sha224),
            HashAlg::Sha256 => with_mgf!(sha2::Sha256),
            HashAlg::Sha384 => with_mgf!(sha2::Sha384),
            HashAlg::Sha512 => with_mgf!(sha2::Sha512),
        }
    }
}

impl KeyTransportAlgorithm for RsaOaepTransport {
    fn uri(&self) -> &'static str {
        self.uri
    }

    fn encrypt(&self, public_key: &RsaPublicKey, key_data: &[u8]) -> Result<Vec<u8>> {
        public_key
            .encrypt(&mut rand::thread_rng(), self.padding(), key_data)
            .map_err(|e| Error::Encryption(format!("RSA-OAEP encrypt: {e}")))
    }

    fn decrypt(&self, private_key: &RsaPrivateKey, encrypted: &[u8]) -> Result<Vec<u8>> {
        private_key
            .decrypt(self.padding(), encrypted)
            .map_err(|e| Error::DecryptionFailure(format!("RSA-OAEP decrypt: {e}")))
    }
}
