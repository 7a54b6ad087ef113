#![forbid(unsafe_code)]

//! Algorithm registry mapping URIs to implementations.

use samlkit_core::Result;

use crate::cipher::CipherAlgorithm;
use crate::digest::HashAlg;
use crate::keytransport::{KeyTransportAlgorithm, OaepParams};
use crate::keywrap::KeyWrapAlgorithm;
use crate::sign::SignatureAlgorithm;

/// Central lookup for all cryptographic algorithms.
pub struct AlgorithmRegistry;

impl AlgorithmRegistry {
    pub fn digest(uri: &str) -> Result<HashAlg> {
        HashAlg::from_digest_uri(uri)
    }

    pub fn signature(uri: &str) -> Result<Box<dyn SignatureAlgorithm>> {
        crate::sign::from_uri(uri)
    }

    pub fn cipher(uri: &str) -> Result<Box<dyn CipherAlgorithm>> {
        crate::cipher::from_uri(uri)
    }

    pub fn key_wrap(uri: &str) -> Result<Box<dyn KeyWrapAlgorithm>> {
        crate::keywrap::from_uri(uri)
    }

    pub fn key_transport(uri: &str, params: OaepParams) -> Result<Box<dyn KeyTransportAlgorithm>> {
        crate::keytransport::from_uri_with_params(uri, params)
    }

    /// `true` when `uri` names a symmetric key wrap rather than RSA transport.
    pub fn is_key_wrap(uri: &str) -> bool {
        crate::keywrap::from_uri(uri).is_ok()
    }
}
