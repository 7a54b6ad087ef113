#![forbid(unsafe_code)]

//! `saml:NameID`, `saml:Issuer` and `saml:BaseID`.

use std::any::Any;

use samlkit_core::{ns, Result};
use samlkit_xml::{Node, QName, Serializable, XmlElement};

use crate::identifier::Identifier;

const NAME_QUALIFIER: &str = "NameQualifier";
const SP_NAME_QUALIFIER: &str = "SPNameQualifier";
const FORMAT: &str = "Format";
const SP_PROVIDED_ID: &str = "SPProvidedID";

fn reject_children<T: XmlElement>(node: &Node) -> Result<()> {
    match node.children.first() {
        Some(child) => Err(T::violation(format!(
            "unexpected child {}, expected text content",
            child.clark()
        ))),
        None => Ok(()),
    }
}

/// `NameIDType`: a string value with optional qualifiers.
macro_rules! name_id_type {
    ($(#[$doc:meta])* $name:ident, $local:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Default)]
        pub struct $name {
            pub value: String,
            pub name_qualifier: Option<String>,
            pub sp_name_qualifier: Option<String>,
            pub format: Option<String>,
            pub sp_provided_id: Option<String>,
        }

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self {
                    value: value.into(),
                    ..Default::default()
                }
            }

            pub fn with_format(mut self, format: impl Into<String>) -> Self {
                self.format = Some(format.into());
                self
            }

            pub fn with_name_qualifier(mut self, qualifier: impl Into<String>) -> Self {
                self.name_qualifier = Some(qualifier.into());
                self
            }

            pub fn with_sp_name_qualifier(mut self, qualifier: impl Into<String>) -> Self {
                self.sp_name_qualifier = Some(qualifier.into());
                self
            }
        }

        impl Serializable for $name {
            fn to_node(&self) -> Node {
                Self::new_node()
                    .with_opt_attr(NAME_QUALIFIER, self.name_qualifier.clone())
                    .with_opt_attr(SP_NAME_QUALIFIER, self.sp_name_qualifier.clone())
                    .with_opt_attr(FORMAT, self.format.clone())
                    .with_opt_attr(SP_PROVIDED_ID, self.sp_provided_id.clone())
                    .with_text(self.value.clone())
            }
        }

        impl XmlElement for $name {
            const NAMESPACE: &'static str = ns::SAML;
            const PREFIX: &'static str = ns::prefix::SAML;
            const LOCAL_NAME: &'static str = $local;

            fn from_node(node: &Node) -> Result<Self> {
                Self::expect_identity(node)?;
                reject_children::<Self>(node)?;
                Ok(Self {
                    value: node.text().to_owned(),
                    name_qualifier: node.attr(NAME_QUALIFIER).map(str::to_owned),
                    sp_name_qualifier: node.attr(SP_NAME_QUALIFIER).map(str::to_owned),
                    format: node.attr(FORMAT).map(str::to_owned),
                    sp_provided_id: node.attr(SP_PROVIDED_ID).map(str::to_owned),
                })
            }
        }

        impl Identifier for $name {
            fn as_any(&self) -> &dyn Any {
                self
            }
        }
    };
}

name_id_type!(
    /// Identifies a subject.
    NameId,
    "NameID"
);

name_id_type!(
    /// Identifies the entity that issued a message or assertion.
    Issuer,
    "Issuer"
);

/// `saml:BaseID`: an identifier whose concrete kind is named by its
/// `xsi:type`.
///
/// Types registered with the container decrypt to their own Rust type;
/// anything else stays a `BaseId` with the raw text value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseId {
    pub type_name: QName,
    /// Prefix bound to the type's namespace when serialized.
    pub type_prefix: String,
    pub value: String,
    pub name_qualifier: Option<String>,
    pub sp_name_qualifier: Option<String>,
}

impl BaseId {
    pub fn new(type_name: QName, type_prefix: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            type_name,
            type_prefix: type_prefix.into(),
            value: value.into(),
            name_qualifier: None,
            sp_name_qualifier: None,
        }
    }

    pub fn with_name_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.name_qualifier = Some(qualifier.into());
        self
    }

    /// The `xsi:type` value as written: `prefix:local`.
    pub fn type_value(&self) -> String {
        if self.type_prefix.is_empty() {
            self.type_name.local_name.clone()
        } else {
            format!("{}:{}", self.type_prefix, self.type_name.local_name)
        }
    }
}

impl Serializable for BaseId {
    fn to_node(&self) -> Node {
        Self::new_node()
            .with_namespace(&self.type_prefix, &self.type_name.namespace)
            .with_opt_attr(NAME_QUALIFIER, self.name_qualifier.clone())
            .with_opt_attr(SP_NAME_QUALIFIER, self.sp_name_qualifier.clone())
            .with_ns_attr(ns::XSI, ns::prefix::XSI, "type", self.type_value())
            .with_text(self.value.clone())
    }
}

impl XmlElement for BaseId {
    const NAMESPACE: &'static str = ns::SAML;
    const PREFIX: &'static str = ns::prefix::SAML;
    const LOCAL_NAME: &'static str = "BaseID";

    fn from_node(node: &Node) -> Result<Self> {
        Self::expect_identity(node)?;
        reject_children::<Self>(node)?;
        let raw = node
            .attr_ns(ns::XSI, "type")
            .ok_or_else(|| Self::violation("missing attribute xsi:type"))?;
        let type_name = node.resolve_qname_value(raw)?;
        let type_prefix = raw
            .trim()
            .split_once(':')
            .map(|(p, _)| p.to_owned())
            .unwrap_or_default();
        Ok(Self {
            type_name,
            type_prefix,
            value: node.text().to_owned(),
            name_qualifier: node.attr(NAME_QUALIFIER).map(str::to_owned),
            sp_name_qualifier: node.attr(SP_NAME_QUALIFIER).map(str::to_owned),
        })
    }
}

impl Identifier for BaseId {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use samlkit_core::Error;

    const ENTITY: &str = "urn:oasis:names:tc:SAML:2.0:nameid-format:entity";

    #[test]
    fn test_name_id_attribute_order() {
        let id = NameId {
            sp_provided_id: Some("sp-id".into()),
            ..NameId::new("user@example.org")
                .with_format(ENTITY)
                .with_name_qualifier("urn:idp")
        };
        let node = id.to_node();
        let names: Vec<_> = node.attributes.iter().map(|a| a.local_name.as_str()).collect();
        assert_eq!(names, vec!["NameQualifier", "Format", "SPProvidedID"]);
        assert_eq!(NameId::from_node(&node).unwrap(), id);
    }

    #[test]
    fn test_issuer_wire_form() {
        let issuer = Issuer::new("https://idp.example.org");
        assert_eq!(
            samlkit_c14n::to_string(&issuer.to_node()),
            r#"<saml:Issuer xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion">https://idp.example.org</saml:Issuer>"#
        );
    }

    #[test]
    fn test_issuer_is_not_name_id() {
        let err = NameId::from_node(&Issuer::new("x").to_node()).unwrap_err();
        match err {
            Error::SchemaViolation { element, .. } => {
                assert_eq!(element, format!("{{{}}}NameID", ns::SAML));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_name_id_rejects_children() {
        let node = NameId::new_node().with_child(Node::new(ns::SAML, "saml", "Audience"));
        assert!(NameId::from_node(&node).unwrap_err().is_schema_violation());
    }

    #[test]
    fn test_base_id_through_wire() {
        let id = BaseId::new(QName::new("urn:x-test:ids", "AccountIDType"), "acct", "1.0")
            .with_name_qualifier("name_qualifier");
        let xml = samlkit_c14n::to_string(&id.to_node());
        assert!(xml.contains(r#"xsi:type="acct:AccountIDType""#));
        assert!(xml.contains(r#"xmlns:acct="urn:x-test:ids""#));
        let parsed = BaseId::from_node(&samlkit_xml::parse(xml.as_bytes()).unwrap()).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_base_id_requires_type() {
        let node = BaseId::new_node().with_text("v");
        let err = BaseId::from_node(&node).unwrap_err();
        assert!(err.to_string().contains("xsi:type"));
    }
}
