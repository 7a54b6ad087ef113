#![forbid(unsafe_code)]

//! XML Digital Signature (XML-DSig) for samlkit elements.
//!
//! Provides the `ds:` element types plus enveloped signature creation
//! and verification over an owned [`Node`](samlkit_xml::Node), using
//! Exclusive C14N for both the reference and `SignedInfo`.

pub mod context;
pub mod sign;
pub mod types;
pub mod verify;

pub use context::DsigContext;
pub use sign::create_signature;
pub use types::{
    CanonicalizationMethod, DigestMethod, KeyInfo, KeyInfoItem, KeyName, Reference, Signature,
    SignatureMethod, SignedInfo, Transform, Transforms, X509Data,
};
pub use verify::{verify, VerifyResult};
