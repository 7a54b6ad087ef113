#![forbid(unsafe_code)]

//! Signature algorithms for `ds:SignatureMethod` (RSA, ECDSA, HMAC).

use samlkit_core::{algorithm, Error, Result};
use signature::SignatureEncoding;

use crate::digest::HashAlg;

/// Key material for signature operations.
pub enum SigningKey {
    Rsa(rsa::RsaPrivateKey),
    RsaPublic(rsa::RsaPublicKey),
    EcP256(p256::ecdsa::SigningKey),
    EcP256Public(p256::ecdsa::VerifyingKey),
    Hmac(Vec<u8>),
}

/// Trait for signature algorithms.
pub trait SignatureAlgorithm: Send + Sync {
    fn uri(&self) -> &'static str;
    /// Digest used for `ds:Reference` values paired with this method.
    fn hash(&self) -> HashAlg;
    fn sign(&self, key: &SigningKey, data: &[u8]) -> Result<Vec<u8>>;
    fn verify(&self, key: &SigningKey, data: &[u8], signature: &[u8]) -> Result<bool>;
}

#[derive(Debug, Clone, Copy)]
enum Family {
    RsaPkcs1,
    EcdsaP256,
    Hmac,
}

const METHODS: &[(&str, Family, HashAlg)] = &[
    (algorithm::RSA_SHA1, Family::RsaPkcs1, HashAlg::Sha1),
    (algorithm::RSA_SHA256, Family::RsaPkcs1, HashAlg::Sha256),
    (algorithm::RSA_SHA384, Family::RsaPkcs1, HashAlg::Sha384),
    (algorithm::RSA_SHA512, Family::RsaPkcs1, HashAlg::Sha512),
    (algorithm::ECDSA_SHA256, Family::EcdsaP256, HashAlg::Sha256),
    (algorithm::HMAC_SHA1, Family::Hmac, HashAlg::Sha1),
    (algorithm::HMAC_SHA256, Family::Hmac, HashAlg::Sha256),
    (algorithm::HMAC_SHA384, Family::Hmac, HashAlg::Sha384),
    (algorithm::HMAC_SHA512, Family::Hmac, HashAlg::Sha512),
];

/// Create a signature algorithm from its URI.
pub fn from_uri(uri: &str) -> Result<Box<dyn SignatureAlgorithm>> {
    let &(uri, family, hash) = METHODS
        .iter()
        .find(|(u, _, _)| *u == uri)
        .ok_or_else(|| Error::UnsupportedAlgorithm(format!("signature algorithm: {uri}")))?;
    Ok(match family {
        Family::RsaPkcs1 => Box::new(RsaPkcs1v15 { uri, hash }),
        Family::EcdsaP256 => Box::new(EcdsaP256 { uri }),
        Family::Hmac => Box::new(HmacSign { uri, hash }),
    })
}

// ── RSA PKCS#1 v1.5 ─────────────────────────────────────────────────

struct RsaPkcs1v15 {
    uri: &'static str,
    hash: HashAlg,
}

impl SignatureAlgorithm for RsaPkcs1v15 {
    fn uri(&self) -> &'static str {
        self.uri
    }

    fn hash(&self) -> HashAlg {
        self.hash
    }

    fn sign(&self, key: &SigningKey, data: &[u8]) -> Result<Vec<u8>> {
        use signature::Signer;
        let SigningKey::Rsa(private_key) = key else {
            return Err(Error::Key("RSA private key required".into()));
        };
        macro_rules! run {
            ($h:ty) => {
                rsa::pkcs1v15::SigningKey::<$h>::new(private_key.clone())
                    .try_sign(data)
                    .map(|s| s.to_vec())
            };
        }
        let sig = match self.hash {
            HashAlg::Sha1 => run!(sha1::Sha1),
            HashAlg::Sha224 => run!(sha2::Sha224),
            HashAlg::Sha256 => run!(sha2::Sha256),
            HashAlg::Sha384 => run!(sha2::Sha384),
            HashAlg::Sha512 => run!(sha2::Sha512),
        };
        sig.map_err(|e| Error::Crypto(format!("RSA sign: {e}")))
    }

    fn verify(&self, key: &SigningKey, data: &[u8], sig_bytes: &[u8]) -> Result<bool> {
        use signature::Verifier;
        let public_key = match key {
            SigningKey::Rsa(pk) => pk.to_public_key(),
            SigningKey::RsaPublic(pk) => pk.clone(),
            _ => return Err(Error::Key("RSA key required".into())),
        };
        let Ok(sig) = rsa::pkcs1v15::Signature::try_from(sig_bytes) else {
            return Ok(false);
        };
        macro_rules! run {
            ($h:ty) => {
                rsa::pkcs1v15::VerifyingKey::<$h>::new(public_key)
                    .verify(data, &sig)
                    .is_ok()
            };
        }
        Ok(match self.hash {
            HashAlg::Sha1 => run!(sha1::Sha1),
            HashAlg::Sha224 => run!(sha2::Sha224),
            HashAlg::Sha256 => run!(sha2::Sha256),
            HashAlg::Sha384 => run!(sha2::Sha384),
            HashAlg::Sha512 => run!(sha2::Sha512),
        })
    }
}

// ── ECDSA P-256 ──────────────────────────────────────────────────────

struct EcdsaP256 {
    uri: &'static str,
}

/// Convert an XML-DSig `r||s` value to a P-256 signature.
pub fn xmldsig_to_p256(rs: &[u8]) -> Result<p256::ecdsa::Signature> {
    if rs.len() != 64 {
        return Err(Error::Crypto(format!(
            "P-256 signature must be 64 bytes, got {}",
            rs.len()
        )));
    }
    p256::ecdsa::Signature::from_slice(rs)
        .map_err(|e| Error::Crypto(format!("invalid P-256 signature: {e}")))
}

impl SignatureAlgorithm for EcdsaP256 {
    fn uri(&self) -> &'static str {
        self.uri
    }

    fn hash(&self) -> HashAlg {
        HashAlg::Sha256
    }

    fn sign(&self, key: &SigningKey, data: &[u8]) -> Result<Vec<u8>> {
        use signature::Signer;
        let SigningKey::EcP256(sk) = key else {
            return Err(Error::Key("P-256 signing key required".into()));
        };
        let sig: p256::ecdsa::Signature = sk.sign(data);
        // Fixed-width r||s, as XML-DSig requires.
        Ok(sig.to_bytes().to_vec())
    }

    fn verify(&self, key: &SigningKey, data: &[u8], sig_bytes: &[u8]) -> Result<bool> {
        use signature::Verifier;
        let vk = match key {
            SigningKey::EcP256(sk) => *sk.verifying_key(),
            SigningKey::EcP256Public(vk) => *vk,
            _ => return Err(Error::Key("P-256 key required".into())),
        };
        let Ok(sig) = xmldsig_to_p256(sig_bytes) else {
            return Ok(false);
        };
        Ok(vk.verify(data, &sig).is_ok())
    }
}

// ── HMAC ─────────────────────────────────────────────────────────────

struct HmacSign {
    uri: &'static str,
    hash: HashAlg,
}

impl SignatureAlgorithm for HmacSign {
    fn uri(&self) -> &'static str {
        self.uri
    }

    fn hash(&self) -> HashAlg {
        self.hash
    }

    fn sign(&self, key: &SigningKey, data: &[u8]) -> Result<Vec<u8>> {
        let SigningKey::Hmac(key_bytes) = key else {
            return Err(Error::Key("HMAC key required".into()));
        };
        compute_hmac(self.hash, key_bytes, data)
    }

    fn verify(&self, key: &SigningKey, data: &[u8], sig_bytes: &[u8]) -> Result<bool> {
        let SigningKey::Hmac(key_bytes) = key else {
            return Err(Error::Key("HMAC key required".into()));
        };
        let expected = compute_hmac(self.hash, key_bytes, data)?;
        Ok(constant_time_eq(&expected, sig_bytes))
    }
}

fn compute_hmac(hash: HashAlg, key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    use hmac::{Hmac, Mac};
    macro_rules! run {
        ($h:ty) => {{
            let mut mac = <Hmac<$h>>::new_from_slice(key)
                .map_err(|e| Error::Key(format!("HMAC key: {e}")))?;
            mac.update(data);
            mac.finalize().into_bytes().to_vec()
        }};
    }
    Ok(match hash {
        HashAlg::Sha1 => run!(sha1::Sha1),
        HashAlg::Sha224 => run!(sha2::Sha224),
        HashAlg::Sha256 => run!(sha2::Sha256),
        HashAlg::Sha384 => run!(sha2::Sha384),
        HashAlg::Sha512 => run!(sha2::Sha512),
    })
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::pkcs8::DecodePrivateKey;

    const RSA_PEM: &str = include_str!("../../../testdata/keys/rsa-private.pem");
    const EC_PEM: &str = include_str!("../../../testdata/keys/ec-p256-private.pem");

    #[test]
    fn test_rsa_sha256_sign_verify() {
        let sk = rsa::RsaPrivateKey::from_pkcs8_pem(RSA_PEM).unwrap();
        let alg = from_uri(algorithm::RSA_SHA256).unwrap();
        assert_eq!(alg.hash(), HashAlg::Sha256);
        let sig = alg.sign(&SigningKey::Rsa(sk.clone()), b"signed info").unwrap();
        let public = SigningKey::RsaPublic(sk.to_public_key());
        assert!(alg.verify(&public, b"signed info", &sig).unwrap());
        assert!(!alg.verify(&public, b"signed inf0", &sig).unwrap());
        assert!(!alg.verify(&public, b"signed info", b"short").unwrap());
    }

    #[test]
    fn test_ecdsa_p256_fixed_width() {
        let sk = p256::ecdsa::SigningKey::from_pkcs8_pem(EC_PEM).unwrap();
        let alg = from_uri(algorithm::ECDSA_SHA256).unwrap();
        let sig = alg.sign(&SigningKey::EcP256(sk.clone()), b"data").unwrap();
        assert_eq!(sig.len(), 64);
        let vk = SigningKey::EcP256Public(*sk.verifying_key());
        assert!(alg.verify(&vk, b"data", &sig).unwrap());
    }

    #[test]
    fn test_hmac_rejects_truncated() {
        let alg = from_uri(algorithm::HMAC_SHA256).unwrap();
        let key = SigningKey::Hmac(b"secret".to_vec());
        let mac = alg.sign(&key, b"data").unwrap();
        assert!(alg.verify(&key, b"data", &mac).unwrap());
        assert!(!alg.verify(&key, b"data", &mac[..16]).unwrap());
    }

    #[test]
    fn test_wrong_key_type() {
        let alg = from_uri(algorithm::RSA_SHA256).unwrap();
        assert!(matches!(
            alg.sign(&SigningKey::Hmac(vec![1]), b"x"),
            Err(Error::Key(_))
        ));
    }
}
