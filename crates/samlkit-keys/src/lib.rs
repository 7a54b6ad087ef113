#![forbid(unsafe_code)]

//! Key material and algorithm handles for samlkit.
//!
//! Keys load from PEM or raw bytes. An [`AlgorithmFactory`] binds a key
//! to an algorithm URI and hands back an [`EncryptionHandle`] or
//! [`SignatureHandle`], refusing any blacklisted algorithm.

pub mod factory;
pub mod handle;
pub mod key;
pub mod loader;

pub use factory::AlgorithmFactory;
pub use handle::{EncryptionHandle, SignatureHandle};
pub use key::{Key, KeyData, KeyUsage};
