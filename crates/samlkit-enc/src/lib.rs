#![forbid(unsafe_code)]

//! XML Encryption (XML-Enc) for samlkit elements.
//!
//! Provides the `xenc:` element types and the envelope engine: an
//! element is rendered, encrypted under a fresh session key, and the
//! session key is wrapped for the recipient with an
//! [`EncryptionHandle`](samlkit_keys::EncryptionHandle).

pub mod context;
pub mod decrypt;
pub mod encrypt;
pub mod types;

pub use context::{EncContext, KeyPlacement};
pub use decrypt::{decrypt_envelope, decrypt_to_node};
pub use encrypt::{encrypt_node, Envelope};
pub use types::{
    CipherData, EncryptedData, EncryptedKey, EncryptionMethod, ReferenceList, ReferenceListItem,
};
