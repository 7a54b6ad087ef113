#![forbid(unsafe_code)]

//! Cryptographic algorithm implementations for samlkit.
//!
//! Digests, signatures, block ciphers, key wrapping and key transport,
//! each looked up by its XML-DSig / XML-Enc algorithm URI.

pub mod cipher;
pub mod digest;
pub mod keytransport;
pub mod keywrap;
pub mod registry;
pub mod sign;

pub use digest::HashAlg;
pub use registry::AlgorithmRegistry;
pub use sign::SigningKey;
