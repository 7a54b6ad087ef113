#![forbid(unsafe_code)]

//! DSig context: configuration for signature creation.

use samlkit_c14n::C14nMode;
use samlkit_core::{algorithm, Error, Result};

/// Context for XML-DSig operations.
#[derive(Debug, Clone)]
pub struct DsigContext {
    /// Canonicalization used for both `SignedInfo` and the reference.
    pub c14n_mode: C14nMode,
    /// Digest algorithm for references; defaults to the one paired with
    /// the signature algorithm.
    pub digest_method: Option<String>,
    /// Name written as `ds:KeyName`, overriding the handle's key name.
    pub key_name: Option<String>,
    /// Base64 DER certificates written as `ds:X509Data`.
    pub certificates: Vec<String>,
    /// Algorithm URIs refused for signing and verification.
    pub blacklist: Vec<String>,
}

impl Default for DsigContext {
    fn default() -> Self {
        Self {
            c14n_mode: C14nMode::default(),
            digest_method: None,
            key_name: None,
            certificates: Vec::new(),
            blacklist: algorithm::DEFAULT_BLACKLIST
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl DsigContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blacklist(mut self, blacklist: impl IntoIterator<Item = String>) -> Self {
        self.blacklist = blacklist.into_iter().collect();
        self
    }

    pub fn with_digest_method(mut self, uri: impl Into<String>) -> Self {
        self.digest_method = Some(uri.into());
        self
    }

    pub fn with_key_name(mut self, name: impl Into<String>) -> Self {
        self.key_name = Some(name.into());
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
