#![forbid(unsafe_code)]

pub use samlkit_core as core;
pub use samlkit_xml as xml;
pub use samlkit_c14n as c14n;
pub use samlkit_crypto as crypto;
pub use samlkit_keys as keys;
pub use samlkit_dsig as dsig;
pub use samlkit_enc as enc;
pub use samlkit_saml as saml;
