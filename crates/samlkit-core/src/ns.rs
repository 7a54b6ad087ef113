#![forbid(unsafe_code)]

//! XML namespace constants used across the library.

/// XML Digital Signature namespace
pub const DSIG: &str = "http://www.w3.org/2000/09/xmldsig#";

/// XML Encryption namespace
pub const ENC: &str = "http://www.w3.org/2001/04/xmlenc#";

/// XML Encryption 1.1 namespace
pub const ENC11: &str = "http://www.w3.org/2009/xmlenc11#";

/// Exclusive C14N namespace
pub const EXC_C14N: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";

/// SAML 2.0 assertion namespace
pub const SAML: &str = "urn:oasis:names:tc:SAML:2.0:assertion";

/// SAML 2.0 protocol namespace
pub const SAMLP: &str = "urn:oasis:names:tc:SAML:2.0:protocol";

/// SAML 2.0 metadata namespace
pub const MD: &str = "urn:oasis:names:tc:SAML:2.0:metadata";

/// Metadata extension for entity attributes
pub const MDATTR: &str = "urn:oasis:names:tc:SAML:metadata:attribute";

/// Metadata extension for algorithm support
pub const ALG: &str = "urn:oasis:names:tc:SAML:metadata:algsupport";

/// XML Schema instance namespace
pub const XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// XML Schema namespace
pub const XS: &str = "http://www.w3.org/2001/XMLSchema";

/// XML namespace
pub const XML: &str = "http://www.w3.org/XML/1998/namespace";

/// XMLNS namespace
pub const XMLNS: &str = "http://www.w3.org/2000/xmlns/";

/// Conventional prefixes used when serializing.
pub mod prefix {
    pub const DSIG: &str = "ds";
    pub const ENC: &str = "xenc";
    pub const SAML: &str = "saml";
    pub const MD: &str = "md";
    pub const MDATTR: &str = "mdattr";
    pub const ALG: &str = "alg";
    pub const XSI: &str = "xsi";
    pub const XS: &str = "xs";
}

// ── Attribute names ──────────────────────────────────────────────────

pub mod attr {
    pub const ID: &str = "Id";
    pub const URI: &str = "URI";
    pub const TYPE: &str = "Type";
    pub const MIME_TYPE: &str = "MimeType";
    pub const ENCODING: &str = "Encoding";
    pub const ALGORITHM: &str = "Algorithm";
    pub const RECIPIENT: &str = "Recipient";
    pub const PREFIX_LIST: &str = "PrefixList";
    pub const KEY_SIZE: &str = "KeySize";
}

// ── Encryption type URIs ─────────────────────────────────────────────

pub const ENC_TYPE_CONTENT: &str = "http://www.w3.org/2001/04/xmlenc#Content";
pub const ENC_TYPE_ELEMENT: &str = "http://www.w3.org/2001/04/xmlenc#Element";
