#![forbid(unsafe_code)]

//! `ds:` element types.

use samlkit_core::{ns, Result};
use samlkit_xml::{ChildCursor, Node, Serializable, XmlElement};

/// Prefix written for `ec:InclusiveNamespaces`.
const EC_PREFIX: &str = "ec";
const INCLUSIVE_NAMESPACES: &str = "InclusiveNamespaces";

/// Element whose whole content is a single text value.
macro_rules! text_element {
    ($(#[$meta:meta])* $name:ident, $local:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name(pub String);

        impl Serializable for $name {
            fn to_node(&self) -> Node {
                Self::new_node().with_text(self.0.clone())
            }
        }

        impl XmlElement for $name {
            const NAMESPACE: &'static str = ns::DSIG;
            const PREFIX: &'static str = ns::prefix::DSIG;
            const LOCAL_NAME: &'static str = $local;

            fn from_node(node: &Node) -> Result<Self> {
                Self::expect_identity(node)?;
                ChildCursor::new(node).finish()?;
                Ok(Self(node.text().to_owned()))
            }
        }
    };
}

/// Element carrying nothing but an `Algorithm` attribute.
macro_rules! algorithm_element {
    ($(#[$meta:meta])* $name:ident, $local:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            pub algorithm: String,
        }

        impl $name {
            pub fn new(algorithm: impl Into<String>) -> Self {
                Self {
                    algorithm: algorithm.into(),
                }
            }
        }

        impl Serializable for $name {
            fn to_node(&self) -> Node {
                Self::new_node().with_attr(ns::attr::ALGORITHM, self.algorithm.clone())
            }
        }

        impl XmlElement for $name {
            const NAMESPACE: &'static str = ns::DSIG;
            const PREFIX: &'static str = ns::prefix::DSIG;
            const LOCAL_NAME: &'static str = $local;

            fn from_node(node: &Node) -> Result<Self> {
                Self::expect_identity(node)?;
                ChildCursor::new(node).finish()?;
                Ok(Self::new(node.required_attr(ns::attr::ALGORITHM)?))
            }
        }
    };
}

text_element!(
    /// Base64 digest of a reference.
    DigestValue,
    "DigestValue"
);
text_element!(
    /// Base64 signature over the canonical `SignedInfo`.
    SignatureValue,
    "SignatureValue"
);
text_element!(KeyName, "KeyName");
text_element!(
    /// Base64 DER certificate.
    X509Certificate,
    "X509Certificate"
);

algorithm_element!(SignatureMethod, "SignatureMethod");
algorithm_element!(
    /// Also used inside `xenc:EncryptionMethod` for OAEP.
    DigestMethod,
    "DigestMethod"
);

// ── InclusiveNamespaces ──────────────────────────────────────────────

fn inclusive_namespaces_node(prefixes: &[String]) -> Node {
    Node::new(ns::EXC_C14N, EC_PREFIX, INCLUSIVE_NAMESPACES)
        .with_attr(ns::attr::PREFIX_LIST, prefixes.join(" "))
}

fn read_inclusive_prefixes(cursor: &mut ChildCursor<'_>) -> Option<Vec<String>> {
    cursor
        .optional_node(ns::EXC_C14N, INCLUSIVE_NAMESPACES)
        .map(|n| {
            n.attr(ns::attr::PREFIX_LIST)
                .unwrap_or("")
                .split_whitespace()
                .map(str::to_owned)
                .collect()
        })
}

/// `CanonicalizationMethod`, optionally with an exc-c14n PrefixList.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalizationMethod {
    pub algorithm: String,
    pub inclusive_prefixes: Option<Vec<String>>,
}

impl Serializable for CanonicalizationMethod {
    fn to_node(&self) -> Node {
        let node = Self::new_node().with_attr(ns::attr::ALGORITHM, self.algorithm.clone());
        match &self.inclusive_prefixes {
            Some(p) => node.with_child(inclusive_namespaces_node(p)),
            None => node,
        }
    }
}

impl XmlElement for CanonicalizationMethod {
    const NAMESPACE: &'static str = ns::DSIG;
    const PREFIX: &'static str = ns::prefix::DSIG;
    const LOCAL_NAME: &'static str = "CanonicalizationMethod";

    fn from_node(node: &Node) -> Result<Self> {
        Self::expect_identity(node)?;
        let mut cursor = ChildCursor::new(node);
        let inclusive_prefixes = read_inclusive_prefixes(&mut cursor);
        cursor.finish()?;
        Ok(Self {
            algorithm: node.required_attr(ns::attr::ALGORITHM)?.to_owned(),
            inclusive_prefixes,
        })
    }
}

/// One step of a reference's transform chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transform {
    pub algorithm: String,
    pub inclusive_prefixes: Option<Vec<String>>,
}

impl Transform {
    pub fn new(algorithm: impl Into<String>) -> Self {
        Self {
            algorithm: algorithm.into(),
            inclusive_prefixes: None,
        }
    }
}

impl Serializable for Transform {
    fn to_node(&self) -> Node {
        let node = Self::new_node().with_attr(ns::attr::ALGORITHM, self.algorithm.clone());
        match &self.inclusive_prefixes {
            Some(p) => node.with_child(inclusive_namespaces_node(p)),
            None => node,
        }
    }
}

impl XmlElement for Transform {
    const NAMESPACE: &'static str = ns::DSIG;
    const PREFIX: &'static str = ns::prefix::DSIG;
    const LOCAL_NAME: &'static str = "Transform";

    fn from_node(node: &Node) -> Result<Self> {
        Self::expect_identity(node)?;
        let mut cursor = ChildCursor::new(node);
        let inclusive_prefixes = read_inclusive_prefixes(&mut cursor);
        cursor.finish()?;
        Ok(Self {
            algorithm: node.required_attr(ns::attr::ALGORITHM)?.to_owned(),
            inclusive_prefixes,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transforms(pub Vec<Transform>);

impl Serializable for Transforms {
    fn to_node(&self) -> Node {
        Self::new_node().with_children(self.0.iter().map(Transform::to_node))
    }
}

impl XmlElement for Transforms {
    const NAMESPACE: &'static str = ns::DSIG;
    const PREFIX: &'static str = ns::prefix::DSIG;
    const LOCAL_NAME: &'static str = "Transforms";

    fn from_node(node: &Node) -> Result<Self> {
        Self::expect_identity(node)?;
        let mut cursor = ChildCursor::new(node);
        let transforms = cursor.at_least_one::<Transform>()?;
        cursor.finish()?;
        Ok(Self(transforms))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub id: Option<String>,
    pub uri: Option<String>,
    pub transforms: Option<Transforms>,
    pub digest_method: DigestMethod,
    pub digest_value: DigestValue,
}

impl Serializable for Reference {
    fn to_node(&self) -> Node {
        Self::new_node()
            .with_opt_attr(ns::attr::ID, self.id.clone())
            .with_opt_attr(ns::attr::URI, self.uri.clone())
            .with_children(self.transforms.as_ref().map(Transforms::to_node))
            .with_child(self.digest_method.to_node())
            .with_child(self.digest_value.to_node())
    }
}

impl XmlElement for Reference {
    const NAMESPACE: &'static str = ns::DSIG;
    const PREFIX: &'static str = ns::prefix::DSIG;
    const LOCAL_NAME: &'static str = "Reference";

    fn from_node(node: &Node) -> Result<Self> {
        Self::expect_identity(node)?;
        let mut cursor = ChildCursor::new(node);
        let transforms = cursor.optional()?;
        let digest_method = cursor.one()?;
        let digest_value = cursor.one()?;
        cursor.finish()?;
        Ok(Self {
            id: node.attr(ns::attr::ID).map(str::to_owned),
            uri: node.attr(ns::attr::URI).map(str::to_owned),
            transforms,
            digest_method,
            digest_value,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedInfo {
    pub canonicalization_method: CanonicalizationMethod,
    pub signature_method: SignatureMethod,
    pub references: Vec<Reference>,
}

impl Serializable for SignedInfo {
    fn to_node(&self) -> Node {
        Self::new_node()
            .with_child(self.canonicalization_method.to_node())
            .with_child(self.signature_method.to_node())
            .with_children(self.references.iter().map(Reference::to_node))
    }
}

impl XmlElement for SignedInfo {
    const NAMESPACE: &'static str = ns::DSIG;
    const PREFIX: &'static str = ns::prefix::DSIG;
    const LOCAL_NAME: &'static str = "SignedInfo";

    fn from_node(node: &Node) -> Result<Self> {
        Self::expect_identity(node)?;
        let mut cursor = ChildCursor::new(node);
        let canonicalization_method = cursor.one()?;
        let signature_method = cursor.one()?;
        let references = cursor.at_least_one()?;
        cursor.finish()?;
        Ok(Self {
            canonicalization_method,
            signature_method,
            references,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct X509Data {
    pub certificates: Vec<X509Certificate>,
}

impl Serializable for X509Data {
    fn to_node(&self) -> Node {
        Self::new_node().with_children(self.certificates.iter().map(X509Certificate::to_node))
    }
}

impl XmlElement for X509Data {
    const NAMESPACE: &'static str = ns::DSIG;
    const PREFIX: &'static str = ns::prefix::DSIG;
    const LOCAL_NAME: &'static str = "X509Data";

    fn from_node(node: &Node) -> Result<Self> {
        Self::expect_identity(node)?;
        let mut cursor = ChildCursor::new(node);
        let certificates = cursor.at_least_one()?;
        cursor.finish()?;
        Ok(Self { certificates })
    }
}

/// One child of `ds:KeyInfo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyInfoItem {
    KeyName(KeyName),
    X509Data(X509Data),
    /// Any other content, such as an `xenc:EncryptedKey`.
    Element(Node),
}

impl KeyInfoItem {
    fn to_node(&self) -> Node {
        match self {
            Self::KeyName(k) => k.to_node(),
            Self::X509Data(x) => x.to_node(),
            Self::Element(n) => n.clone(),
        }
    }

    fn from_node(node: &Node) -> Result<Self> {
        if node.is(ns::DSIG, KeyName::LOCAL_NAME) {
            KeyName::from_node(node).map(Self::KeyName)
        } else if node.is(ns::DSIG, X509Data::LOCAL_NAME) {
            X509Data::from_node(node).map(Self::X509Data)
        } else {
            Ok(Self::Element(node.clone()))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyInfo {
    pub id: Option<String>,
    pub items: Vec<KeyInfoItem>,
}

impl KeyInfo {
    pub fn key_names(&self) -> impl Iterator<Item = &str> {
        self.items.iter().filter_map(|i| match i {
            KeyInfoItem::KeyName(k) => Some(k.0.as_str()),
            _ => None,
        })
    }

    /// Children that are not `ds:` key information.
    pub fn elements(&self) -> impl Iterator<Item = &Node> {
        self.items.iter().filter_map(|i| match i {
            KeyInfoItem::Element(n) => Some(n),
            _ => None,
        })
    }
}

impl Serializable for KeyInfo {
    fn to_node(&self) -> Node {
        Self::new_node()
            .with_opt_attr(ns::attr::ID, self.id.clone())
            .with_children(self.items.iter().map(KeyInfoItem::to_node))
    }
}

impl XmlElement for KeyInfo {
    const NAMESPACE: &'static str = ns::DSIG;
    const PREFIX: &'static str = ns::prefix::DSIG;
    const LOCAL_NAME: &'static str = "KeyInfo";

    fn from_node(node: &Node) -> Result<Self> {
        Self::expect_identity(node)?;
        Ok(Self {
            id: node.attr(ns::attr::ID).map(str::to_owned),
            items: node
                .children
                .iter()
                .map(KeyInfoItem::from_node)
                .collect::<Result<_>>()?,
        })
    }
}

/// An enveloped `ds:Signature`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub id: Option<String>,
    pub signed_info: SignedInfo,
    pub signature_value: SignatureValue,
    pub key_info: Option<KeyInfo>,
}

impl Signature {
    /// URI of the `SignatureMethod`.
    pub fn algorithm(&self) -> &str {
        &self.signed_info.signature_method.algorithm
    }
}

impl Serializable for Signature {
    fn to_node(&self) -> Node {
        Self::new_node()
            .with_opt_attr(ns::attr::ID, self.id.clone())
            .with_child(self.signed_info.to_node())
            .with_child(self.signature_value.to_node())
            .with_children(self.key_info.as_ref().map(KeyInfo::to_node))
    }
}

impl XmlElement for Signature {
    const NAMESPACE: &'static str = ns::DSIG;
    const PREFIX: &'static str = ns::prefix::DSIG;
    const LOCAL_NAME: &'static str = "Signature";

    fn from_node(node: &Node) -> Result<Self> {
        Self::expect_identity(node)?;
        let mut cursor = ChildCursor::new(node);
        let signed_info = cursor.one()?;
        let signature_value = cursor.one()?;
        let key_info = cursor.optional()?;
        // ds:Object children are not produced or interpreted.
        cursor.finish()?;
        Ok(Self {
            id: node.attr(ns::attr::ID).map(str::to_owned),
            signed_info,
            signature_value,
            key_info,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use samlkit_core::{algorithm, Error};
    use samlkit_xml::parse;

    fn sample() -> Signature {
        Signature {
            id: None,
            signed_info: SignedInfo {
                canonicalization_method: CanonicalizationMethod {
                    algorithm: algorithm::EXC_C14N.into(),
                    inclusive_prefixes: None,
                },
                signature_method: SignatureMethod::new(algorithm::RSA_SHA256),
                references: vec![Reference {
                    id: None,
                    uri: Some("#_abc".into()),
                    transforms: Some(Transforms(vec![
                        Transform::new(algorithm::ENVELOPED_SIGNATURE),
                        Transform {
                            algorithm: algorithm::EXC_C14N.into(),
                            inclusive_prefixes: Some(vec!["xs".into(), "xsi".into()]),
                        },
                    ])),
                    digest_method: DigestMethod::new(algorithm::SHA256),
                    digest_value: DigestValue("ZGlnZXN0".into()),
                }],
            },
            signature_value: SignatureValue("c2ln".into()),
            key_info: Some(KeyInfo {
                id: None,
                items: vec![KeyInfoItem::KeyName(KeyName("idp".into()))],
            }),
        }
    }

    #[test]
    fn test_signature_round_trip_through_bytes() {
        let sig = sample();
        let bytes = samlkit_c14n::render(&sig.to_node());
        let parsed = Signature::from_node(&parse(&bytes).unwrap()).unwrap();
        assert_eq!(parsed, sig);
        let reference = &parsed.signed_info.references[0];
        let prefixes = reference.transforms.as_ref().unwrap().0[1]
            .inclusive_prefixes
            .clone();
        assert_eq!(prefixes, Some(vec!["xs".to_string(), "xsi".to_string()]));
    }

    #[test]
    fn test_reference_order_enforced() {
        let xml = format!(
            r#"<ds:Reference xmlns:ds="{}" URI=""><ds:DigestValue>AA==</ds:DigestValue><ds:DigestMethod Algorithm="{}"/></ds:Reference>"#,
            ns::DSIG,
            algorithm::SHA256
        );
        let err = Reference::from_node(&parse(xml.as_bytes()).unwrap()).unwrap_err();
        assert!(err.is_schema_violation());
    }

    #[test]
    fn test_signed_info_needs_reference() {
        let node = SignedInfo::new_node()
            .with_child(
                CanonicalizationMethod {
                    algorithm: algorithm::EXC_C14N.into(),
                    inclusive_prefixes: None,
                }
                .to_node(),
            )
            .with_child(SignatureMethod::new(algorithm::RSA_SHA256).to_node());
        match SignedInfo::from_node(&node).unwrap_err() {
            Error::SchemaViolation { element, reason } => {
                assert_eq!(element, format!("{{{}}}SignedInfo", ns::DSIG));
                assert!(reason.contains("Reference"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_key_info_keeps_foreign_children() {
        let foreign = Node::new(ns::ENC, "xenc", "EncryptedKey");
        let ki = KeyInfo {
            id: None,
            items: vec![
                KeyInfoItem::KeyName(KeyName("k".into())),
                KeyInfoItem::Element(foreign.clone()),
            ],
        };
        let parsed = KeyInfo::from_node(&ki.to_node()).unwrap();
        assert_eq!(parsed.key_names().collect::<Vec<_>>(), vec!["k"]);
        assert_eq!(parsed.elements().next(), Some(&foreign));
    }

    #[test]
    fn test_algorithm_attribute_required() {
        let err = DigestMethod::from_node(&DigestMethod::new_node()).unwrap_err();
        assert!(err.is_schema_violation());
    }
}
