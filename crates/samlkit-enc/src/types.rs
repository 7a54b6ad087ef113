#![forbid(unsafe_code)]

//! `xenc:` element types.

use samlkit_core::{ns, Result};
use samlkit_dsig::{DigestMethod, KeyInfo, KeyInfoItem};
use samlkit_xml::{ChildCursor, Node, Serializable, XmlElement};

const MGF: &str = "MGF";

fn enc_node(local_name: &str) -> Node {
    Node::new(ns::ENC, ns::prefix::ENC, local_name)
}

/// `EncryptionMethod`, with the RSA-OAEP parameters it may carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionMethod {
    pub algorithm: String,
    pub key_size: Option<u32>,
    /// Base64 `OAEPparams`.
    pub oaep_params: Option<String>,
    pub digest_method: Option<DigestMethod>,
    /// `xenc11:MGF` algorithm.
    pub mgf: Option<String>,
}

impl EncryptionMethod {
    pub fn new(algorithm: impl Into<String>) -> Self {
        Self {
            algorithm: algorithm.into(),
            key_size: None,
            oaep_params: None,
            digest_method: None,
            mgf: None,
        }
    }
}

impl Serializable for EncryptionMethod {
    fn to_node(&self) -> Node {
        let mut node = Self::new_node().with_attr(ns::attr::ALGORITHM, self.algorithm.clone());
        if let Some(size) = self.key_size {
            node = node.with_child(enc_node(ns::attr::KEY_SIZE).with_text(size.to_string()));
        }
        if let Some(p) = &self.oaep_params {
            node = node.with_child(enc_node("OAEPparams").with_text(p.clone()));
        }
        if let Some(d) = &self.digest_method {
            node = node.with_child(d.to_node());
        }
        if let Some(m) = &self.mgf {
            node = node
                .with_child(Node::new(ns::ENC11, "xenc11", MGF).with_attr(ns::attr::ALGORITHM, m.clone()));
        }
        node
    }
}

impl XmlElement for EncryptionMethod {
    const NAMESPACE: &'static str = ns::ENC;
    const PREFIX: &'static str = ns::prefix::ENC;
    const LOCAL_NAME: &'static str = "EncryptionMethod";

    fn from_node(node: &Node) -> Result<Self> {
        Self::expect_identity(node)?;
        let mut cursor = ChildCursor::new(node);
        let key_size = match cursor.optional_node(ns::ENC, ns::attr::KEY_SIZE) {
            Some(n) => Some(n.text().trim().parse::<u32>().map_err(|_| {
                Self::violation(format!("KeySize '{}' is not an integer", n.text()))
            })?),
            None => None,
        };
        let oaep_params = cursor
            .optional_node(ns::ENC, "OAEPparams")
            .map(|n| n.text().trim().to_owned());
        let digest_method = cursor.optional()?;
        let mgf = match cursor.optional_node(ns::ENC11, MGF) {
            Some(n) => Some(n.required_attr(ns::attr::ALGORITHM)?.to_owned()),
            None => None,
        };
        cursor.finish()?;
        Ok(Self {
            algorithm: node.required_attr(ns::attr::ALGORITHM)?.to_owned(),
            key_size,
            oaep_params,
            digest_method,
            mgf,
        })
    }
}

/// `CipherData`: the ciphertext inline, or a pointer to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CipherData {
    /// Base64 `CipherValue`.
    Value(String),
    Reference {
        uri: String,
        transforms: Option<Node>,
    },
}

impl Serializable for CipherData {
    fn to_node(&self) -> Node {
        let child = match self {
            Self::Value(v) => enc_node("CipherValue").with_text(v.clone()),
            Self::Reference { uri, transforms } => enc_node("CipherReference")
                .with_attr(ns::attr::URI, uri.clone())
                .with_children(transforms.clone()),
        };
        Self::new_node().with_child(child)
    }
}

impl XmlElement for CipherData {
    const NAMESPACE: &'static str = ns::ENC;
    const PREFIX: &'static str = ns::prefix::ENC;
    const LOCAL_NAME: &'static str = "CipherData";

    fn from_node(node: &Node) -> Result<Self> {
        Self::expect_identity(node)?;
        let mut cursor = ChildCursor::new(node);
        let data = if let Some(v) = cursor.optional_node(ns::ENC, "CipherValue") {
            Self::Value(v.text().to_owned())
        } else if let Some(r) = cursor.optional_node(ns::ENC, "CipherReference") {
            Self::Reference {
                uri: r.required_attr(ns::attr::URI)?.to_owned(),
                transforms: r.child(ns::ENC, "Transforms").cloned(),
            }
        } else {
            return Err(Self::violation("expected CipherValue or CipherReference"));
        };
        cursor.finish()?;
        Ok(data)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceListItem {
    DataReference(String),
    KeyReference(String),
}

impl ReferenceListItem {
    pub fn uri(&self) -> &str {
        match self {
            Self::DataReference(u) | Self::KeyReference(u) => u,
        }
    }
}

/// `ReferenceList` on an `EncryptedKey`: what the key decrypts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceList(pub Vec<ReferenceListItem>);

impl ReferenceList {
    /// Whether a `DataReference` names the element with `id`.
    pub fn references_data(&self, id: &str) -> bool {
        self.0.iter().any(|r| {
            matches!(r, ReferenceListItem::DataReference(u) if u.strip_prefix('#') == Some(id))
        })
    }
}

impl Serializable for ReferenceList {
    fn to_node(&self) -> Node {
        Self::new_node().with_children(self.0.iter().map(|r| match r {
            ReferenceListItem::DataReference(u) => {
                enc_node("DataReference").with_attr(ns::attr::URI, u.clone())
            }
            ReferenceListItem::KeyReference(u) => {
                enc_node("KeyReference").with_attr(ns::attr::URI, u.clone())
            }
        }))
    }
}

impl XmlElement for ReferenceList {
    const NAMESPACE: &'static str = ns::ENC;
    const PREFIX: &'static str = ns::prefix::ENC;
    const LOCAL_NAME: &'static str = "ReferenceList";

    fn from_node(node: &Node) -> Result<Self> {
        Self::expect_identity(node)?;
        let mut items = Vec::new();
        for child in &node.children {
            let uri = child.required_attr(ns::attr::URI)?.to_owned();
            if child.is(ns::ENC, "DataReference") {
                items.push(ReferenceListItem::DataReference(uri));
            } else if child.is(ns::ENC, "KeyReference") {
                items.push(ReferenceListItem::KeyReference(uri));
            } else {
                return Err(Self::violation(format!(
                    "unexpected child {}",
                    child.clark()
                )));
            }
        }
        if items.is_empty() {
            return Err(Self::violation("at least one reference is required"));
        }
        Ok(Self(items))
    }
}

/// Attributes and children shared by `EncryptedData` and `EncryptedKey`.
struct EncryptedType {
    id: Option<String>,
    type_: Option<String>,
    mime_type: Option<String>,
    encoding: Option<String>,
    encryption_method: Option<EncryptionMethod>,
    key_info: Option<KeyInfo>,
}

impl EncryptedType {
    fn write(&self, node: Node) -> Node {
        node.with_opt_attr(ns::attr::ID, self.id.clone())
            .with_opt_attr(ns::attr::TYPE, self.type_.clone())
            .with_opt_attr(ns::attr::MIME_TYPE, self.mime_type.clone())
            .with_opt_attr(ns::attr::ENCODING, self.encoding.clone())
            .with_children(self.encryption_method.as_ref().map(EncryptionMethod::to_node))
            .with_children(self.key_info.as_ref().map(KeyInfo::to_node))
    }

    fn read<'a>(node: &'a Node) -> Result<(Self, ChildCursor<'a>)> {
        let mut cursor = ChildCursor::new(node);
        let encryption_method = cursor.optional()?;
        let key_info = cursor.optional()?;
        Ok((
            Self {
                id: node.attr(ns::attr::ID).map(str::to_owned),
                type_: node.attr(ns::attr::TYPE).map(str::to_owned),
                mime_type: node.attr(ns::attr::MIME_TYPE).map(str::to_owned),
                encoding: node.attr(ns::attr::ENCODING).map(str::to_owned),
                encryption_method,
                key_info,
            },
            cursor,
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedData {
    pub id: Option<String>,
    /// `Type`, `xenc#Element` for encrypted elements.
    pub type_: Option<String>,
    pub mime_type: Option<String>,
    pub encoding: Option<String>,
    pub encryption_method: Option<EncryptionMethod>,
    pub key_info: Option<KeyInfo>,
    pub cipher_data: CipherData,
}

impl EncryptedData {
    pub fn algorithm(&self) -> Option<&str> {
        self.encryption_method.as_ref().map(|m| m.algorithm.as_str())
    }

    /// `EncryptedKey`s carried inside this element's `KeyInfo`.
    pub fn inline_keys(&self) -> Result<Vec<EncryptedKey>> {
        let Some(ki) = &self.key_info else {
            return Ok(Vec::new());
        };
        ki.elements()
            .filter(|n| n.is(ns::ENC, EncryptedKey::LOCAL_NAME))
            .map(EncryptedKey::from_node)
            .collect()
    }
}

impl Serializable for EncryptedData {
    fn to_node(&self) -> Node {
        let base = EncryptedType {
            id: self.id.clone(),
            type_: self.type_.clone(),
            mime_type: self.mime_type.clone(),
            encoding: self.encoding.clone(),
            encryption_method: self.encryption_method.clone(),
            key_info: self.key_info.clone(),
        };
        base.write(Self::new_node())
            .with_child(self.cipher_data.to_node())
    }
}

impl XmlElement for EncryptedData {
    const NAMESPACE: &'static str = ns::ENC;
    const PREFIX: &'static str = ns::prefix::ENC;
    const LOCAL_NAME: &'static str = "EncryptedData";

    fn from_node(node: &Node) -> Result<Self> {
        Self::expect_identity(node)?;
        let (base, mut cursor) = EncryptedType::read(node)?;
        let cipher_data = cursor.one()?;
        // EncryptionProperties are not interpreted.
        cursor.optional_node(ns::ENC, "EncryptionProperties");
        cursor.finish()?;
        Ok(Self {
            id: base.id,
            type_: base.type_,
            mime_type: base.mime_type,
            encoding: base.encoding,
            encryption_method: base.encryption_method,
            key_info: base.key_info,
            cipher_data,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedKey {
    pub id: Option<String>,
    pub type_: Option<String>,
    pub mime_type: Option<String>,
    pub encoding: Option<String>,
    pub recipient: Option<String>,
    pub encryption_method: Option<EncryptionMethod>,
    pub key_info: Option<KeyInfo>,
    pub cipher_data: CipherData,
    pub reference_list: Option<ReferenceList>,
    pub carried_key_name: Option<String>,
}

impl EncryptedKey {
    pub fn algorithm(&self) -> Option<&str> {
        self.encryption_method.as_ref().map(|m| m.algorithm.as_str())
    }
}

impl Serializable for EncryptedKey {
    fn to_node(&self) -> Node {
        let base = EncryptedType {
            id: self.id.clone(),
            type_: self.type_.clone(),
            mime_type: self.mime_type.clone(),
            encoding: self.encoding.clone(),
            encryption_method: self.encryption_method.clone(),
            key_info: self.key_info.clone(),
        };
        base.write(Self::new_node().with_opt_attr(ns::attr::RECIPIENT, self.recipient.clone()))
            .with_child(self.cipher_data.to_node())
            .with_children(self.reference_list.as_ref().map(ReferenceList::to_node))
            .with_children(
                self.carried_key_name
                    .as_ref()
                    .map(|n| enc_node("CarriedKeyName").with_text(n.clone())),
            )
    }
}

impl XmlElement for EncryptedKey {
    const NAMESPACE: &'static str = ns::ENC;
    const PREFIX: &'static str = ns::prefix::ENC;
    const LOCAL_NAME: &'static str = "EncryptedKey";

    fn from_node(node: &Node) -> Result<Self> {
        Self::expect_identity(node)?;
        let (base, mut cursor) = EncryptedType::read(node)?;
        let cipher_data = cursor.one()?;
        cursor.optional_node(ns::ENC, "EncryptionProperties");
        let reference_list = cursor.optional()?;
        let carried_key_name = cursor
            .optional_node(ns::ENC, "CarriedKeyName")
            .map(|n| n.text().to_owned());
        cursor.finish()?;
        Ok(Self {
            id: base.id,
            type_: base.type_,
            mime_type: base.mime_type,
            encoding: base.encoding,
            recipient: node.attr(ns::attr::RECIPIENT).map(str::to_owned),
            encryption_method: base.encryption_method,
            key_info: base.key_info,
            cipher_data,
            reference_list,
            carried_key_name,
        })
    }
}

/// `KeyInfo` holding a single `EncryptedKey`.
pub(crate) fn key_info_with(key: &EncryptedKey) -> KeyInfo {
    KeyInfo {
        id: None,
        items: vec![KeyInfoItem::Element(key.to_node())],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use samlkit_core::{algorithm, Error};
    use samlkit_xml::parse;

    fn key() -> EncryptedKey {
        EncryptedKey {
            id: Some("_k1".into()),
            type_: None,
            mime_type: None,
            encoding: None,
            recipient: Some("https://sp.example.org".into()),
            encryption_method: Some(EncryptionMethod {
                digest_method: Some(DigestMethod::new(algorithm::SHA256)),
                ..EncryptionMethod::new(algorithm::RSA_OAEP)
            }),
            key_info: None,
            cipher_data: CipherData::Value("AAEC".into()),
            reference_list: Some(ReferenceList(vec![ReferenceListItem::DataReference(
                "#_d1".into(),
            )])),
            carried_key_name: Some("session".into()),
        }
    }

    #[test]
    fn test_encrypted_key_round_trip_through_bytes() {
        let k = key();
        let parsed = EncryptedKey::from_node(&parse(&samlkit_c14n::render(&k.to_node())).unwrap())
            .unwrap();
        assert_eq!(parsed, k);
        assert!(parsed.reference_list.unwrap().references_data("_d1"));
    }

    #[test]
    fn test_inline_keys() {
        let data = EncryptedData {
            id: None,
            type_: Some(ns::ENC_TYPE_ELEMENT.into()),
            mime_type: None,
            encoding: None,
            encryption_method: Some(EncryptionMethod::new(algorithm::AES128_GCM)),
            key_info: Some(key_info_with(&key())),
            cipher_data: CipherData::Value("AAAA".into()),
        };
        let parsed = EncryptedData::from_node(&data.to_node()).unwrap();
        assert_eq!(parsed.inline_keys().unwrap(), vec![key()]);
        assert_eq!(parsed.algorithm(), Some(algorithm::AES128_GCM));
    }

    #[test]
    fn test_key_size_must_be_integer() {
        let node = EncryptionMethod::new_node()
            .with_attr(ns::attr::ALGORITHM, algorithm::AES128_CBC)
            .with_child(enc_node(ns::attr::KEY_SIZE).with_text("large"));
        match EncryptionMethod::from_node(&node).unwrap_err() {
            Error::SchemaViolation { reason, .. } => assert!(reason.contains("KeySize")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_cipher_data_requires_payload() {
        let err = CipherData::from_node(&CipherData::new_node()).unwrap_err();
        assert!(err.is_schema_violation());
    }

    #[test]
    fn test_cipher_data_order() {
        // CipherData must follow EncryptionMethod and KeyInfo.
        let node = EncryptedData::new_node()
            .with_child(CipherData::Value("AA==".into()).to_node())
            .with_child(EncryptionMethod::new(algorithm::AES128_CBC).to_node());
        assert!(EncryptedData::from_node(&node).unwrap_err().is_schema_violation());
    }
}
