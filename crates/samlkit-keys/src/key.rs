#![forbid(unsafe_code)]

//! Key types.

use samlkit_crypto::sign::SigningKey;

/// Usage flags for a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyUsage {
    Sign,
    Verify,
    Encrypt,
    Decrypt,
    Any,
}

/// The underlying key data.
#[derive(Clone)]
pub enum KeyData {
    Rsa {
        private: Option<rsa::RsaPrivateKey>,
        public: rsa::RsaPublicKey,
    },
    EcP256 {
        private: Option<p256::ecdsa::SigningKey>,
        public: p256::ecdsa::VerifyingKey,
    },
    Hmac(Vec<u8>),
    Aes(Vec<u8>),
    Des3(Vec<u8>),
}

impl std::fmt::Debug for KeyData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let half = |private: bool| if private { "private+public" } else { "public" };
        match self {
            Self::Rsa { private, .. } => write!(f, "RSA {} key", half(private.is_some())),
            Self::EcP256 { private, .. } => {
                write!(f, "EC P-256 {} key", half(private.is_some()))
            }
            Self::Hmac(k) => write!(f, "HMAC key ({} bytes)", k.len()),
            Self::Aes(k) => write!(f, "AES key ({} bytes)", k.len()),
            Self::Des3(_) => write!(f, "3DES key"),
        }
    }
}

/// A named key.
#[derive(Debug, Clone)]
pub struct Key {
    /// Written as `ds:KeyName` when the key is referenced from XML.
    pub name: Option<String>,
    pub data: KeyData,
    pub usage: KeyUsage,
}

impl Key {
    pub fn new(data: KeyData, usage: KeyUsage) -> Self {
        Self {
            name: None,
            data,
            usage,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Copy without private material.
    pub fn public_only(&self) -> Key {
        let data = match &self.data {
            KeyData::Rsa { public, .. } => KeyData::Rsa {
                private: None,
                public: public.clone(),
            },
            KeyData::EcP256 { public, .. } => KeyData::EcP256 {
                private: None,
                public: *public,
            },
            other => other.clone(),
        };
        Key {
            name: self.name.clone(),
            data,
            usage: KeyUsage::Verify,
        }
    }

    pub fn has_private(&self) -> bool {
        match &self.data {
            KeyData::Rsa { private, .. } => private.is_some(),
            KeyData::EcP256 { private, .. } => private.is_some(),
            _ => true,
        }
    }

    /// Convert to a `SigningKey` for use with signature algorithms.
    pub fn to_signing_key(&self) -> Option<SigningKey> {
        match &self.data {
            KeyData::Rsa { private: Some(pk), .. } => Some(SigningKey::Rsa(pk.clone())),
            KeyData::Rsa { public, .. } => Some(SigningKey::RsaPublic(public.clone())),
            KeyData::EcP256 { private: Some(sk), .. } => Some(SigningKey::EcP256(sk.clone())),
            KeyData::EcP256 { public, .. } => Some(SigningKey::EcP256Public(*public)),
            KeyData::Hmac(k) => Some(SigningKey::Hmac(k.clone())),
            _ => None,
        }
    }

    /// Raw symmetric key bytes (AES, 3DES, HMAC).
    pub fn symmetric_key_bytes(&self) -> Option<&[u8]> {
        match &self.data {
            KeyData::Hmac(k) | KeyData::Aes(k) | KeyData::Des3(k) => Some(k),
            _ => None,
        }
    }

    pub fn rsa_public_key(&self) -> Option<&rsa::RsaPublicKey> {
        match &self.data {
            KeyData::Rsa { public, .. } => Some(public),
            _ => None,
        }
    }

    pub fn rsa_private_key(&self) -> Option<&rsa::RsaPrivateKey> {
        match &self.data {
            KeyData::Rsa { private: Some(pk), .. } => Some(pk),
            _ => None,
        }
    }
}
