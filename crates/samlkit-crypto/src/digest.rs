#![forbid(unsafe_code)]

//! Digest (hash) algorithms.

use digest::Digest;
use samlkit_core::{algorithm, Error, Result};

/// Hash functions shared by digests, OAEP and signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlg {
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlg {
    /// Hash for a `DigestMethod` URI.
    pub fn from_digest_uri(uri: &str) -> Result<Self> {
        match uri {
            algorithm::SHA1 => Ok(Self::Sha1),
            algorithm::SHA224 => Ok(Self::Sha224),
            algorithm::SHA256 => Ok(Self::Sha256),
            algorithm::SHA384 => Ok(Self::Sha384),
            algorithm::SHA512 => Ok(Self::Sha512),
            _ => Err(Error::UnsupportedAlgorithm(format!("digest algorithm: {uri}"))),
        }
    }

    pub fn digest_uri(&self) -> &'static str {
        match self {
            Self::Sha1 => algorithm::SHA1,
            Self::Sha224 => algorithm::SHA224,
            Self::Sha256 => algorithm::SHA256,
            Self::Sha384 => algorithm::SHA384,
            Self::Sha512 => algorithm::SHA512,
        }
    }

    pub fn hash(&self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha1 => sha1::Sha1::digest(data).to_vec(),
            Self::Sha224 => sha2::Sha224::digest(data).to_vec(),
            Self::Sha256 => sha2::Sha256::digest(data).to_vec(),
            Self::Sha384 => sha2::Sha384::digest(data).to_vec(),
            Self::Sha512 => sha2::Sha512::digest(data).to_vec(),
        }
    }
}

/// Compute a digest in one shot.
pub fn digest(uri: &str, data: &[u8]) -> Result<Vec<u8>> {
    Ok(HashAlg::from_digest_uri(uri)?.hash(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    #[test]
    fn test_sha256_known_value() {
        let result = digest(algorithm::SHA256, b"hello").unwrap();
        assert_eq!(
            hex(&result),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_lengths_and_uris() {
        for (alg, len) in [
            (HashAlg::Sha1, 20),
            (HashAlg::Sha224, 28),
            (HashAlg::Sha384, 48),
            (HashAlg::Sha512, 64),
        ] {
            assert_eq!(alg.hash(b"x").len(), len);
            assert_eq!(HashAlg::from_digest_uri(alg.digest_uri()).unwrap(), alg);
        }
    }

    #[test]
    fn test_unknown_digest() {
        assert!(matches!(
            digest("http://www.w3.org/2001/04/xmldsig-more#md5", b"x"),
            Err(Error::UnsupportedAlgorithm(_))
        ));
    }
}
