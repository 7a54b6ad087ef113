#![forbid(unsafe_code)]

//! Core types for samlkit: the shared error type, XML namespace
//! constants and algorithm URIs.

pub mod algorithm;
pub mod error;
pub mod ns;

pub use error::{Error, Result};
