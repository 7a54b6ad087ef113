#![forbid(unsafe_code)]

/// Errors produced by samlkit.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input bytes could not be parsed as XML at all.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// A node did not match the shape its element type expects.
    ///
    /// `element` is the Clark-notation name (`{namespace}local`) of the
    /// element whose rules were violated.
    #[error("schema violation in {element}: {reason}")]
    SchemaViolation { element: String, reason: String },

    #[error("no usable key: {0}")]
    KeyMismatch(String),

    #[error("decryption failed: {0}")]
    DecryptionFailure(String),

    #[error("unsupported identifier: {0}")]
    UnsupportedIdentifier(String),

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("algorithm is blacklisted: {0}")]
    BlacklistedAlgorithm(String),

    #[error("cryptographic error: {0}")]
    Crypto(String),

    #[error("key error: {0}")]
    Key(String),

    #[error("signature verification failed: {0}")]
    SignatureInvalid(String),

    #[error("digest mismatch for reference: {0}")]
    DigestMismatch(String),

    #[error("encryption error: {0}")]
    Encryption(String),

    #[error("base64 decode error: {0}")]
    Base64(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Build a [`Error::SchemaViolation`] for the element `{ns}local`.
    pub fn schema(element: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::SchemaViolation {
            element: element.into(),
            reason: reason.into(),
        }
    }

    /// `true` for the errors raised by element parsing and construction.
    pub fn is_schema_violation(&self) -> bool {
        matches!(self, Error::SchemaViolation { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
