#![forbid(unsafe_code)]

//! Encryption context: data algorithm, session key and key placement.

use samlkit_core::{algorithm, Error, Result};

/// Where the wrapped session key goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyPlacement {
    /// Inside `EncryptedData/ds:KeyInfo`.
    #[default]
    Inline,
    /// As a sibling `EncryptedKey` whose `ReferenceList` names the data.
    Detached,
}

/// Context for XML-Enc operations.
#[derive(Debug, Clone)]
pub struct EncContext {
    /// Block cipher for the payload.
    pub data_algorithm: String,
    /// Session key to use instead of a freshly generated one.
    pub session_key: Option<Vec<u8>>,
    pub placement: KeyPlacement,
    /// `Recipient` attribute of the `EncryptedKey`.
    pub recipient: Option<String>,
    pub carried_key_name: Option<String>,
    /// `Id` of the `EncryptedData`. Detached placement requires one.
    pub data_id: Option<String>,
    /// `Id` of the `EncryptedKey`.
    pub key_id: Option<String>,
    /// Algorithm URIs refused for encryption and decryption.
    pub blacklist: Vec<String>,
}

impl Default for EncContext {
    fn default() -> Self {
        Self {
            data_algorithm: algorithm::AES256_GCM.to_owned(),
            session_key: None,
            placement: KeyPlacement::default(),
            recipient: None,
            carried_key_name: None,
            data_id: None,
            key_id: None,
            blacklist: algorithm::DEFAULT_BLACKLIST
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl EncContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data_algorithm(mut self, uri: impl Into<String>) -> Self {
        self.data_algorithm = uri.into();
        self
    }

    pub fn with_session_key(mut self, key: Vec<u8>) -> Self {
        self.session_key = Some(key);
        self
    }

    pub fn with_blacklist(mut self, blacklist: impl IntoIterator<Item = String>) -> Self {
        self.blacklist = blacklist.into_iter().collect();
        self
    }

    pub fn detached(mut self, data_id: impl Into<String>, key_id: impl Into<String>) -> Self {
        self.placement = KeyPlacement::Detached;
        self.data_id = Some(data_id.into());
        self.key_id = Some(key_id.into());
        self
    }

    pub(crate) fn check(&self, uri: &str) -> Result<()> {
        if self.blacklist.iter().any(|b| b == uri) {
            tracing::warn!(algorithm = uri, "refusing blacklisted algorithm");
            return Err(Error::BlacklistedAlgorithm(uri.to_owned()));
        }
        Ok(())
    }
}
