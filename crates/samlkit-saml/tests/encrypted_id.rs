//! Encrypting identifiers into `saml:EncryptedID` and resolving them
//! back to their concrete types.

use std::any::Any;

use samlkit_core::{algorithm, ns, Error, Result};
use samlkit_enc::{EncContext, KeyPlacement};
use samlkit_keys::{loader, AlgorithmFactory, EncryptionHandle};
use samlkit_saml::attribute::NAMEFORMAT_URI;
use samlkit_saml::{
    Attribute, AttributeValue, BaseId, DefaultContainer, Encryptable, EncryptedId, Identifier,
    IdentifierValue, Issuer, NameId,
};
use samlkit_xml::{Node, QName, Serializable, XmlElement};

const RSA_PRIVATE: &[u8] = include_bytes!("../../../testdata/keys/rsa-private.pem");
const RSA_PUBLIC: &[u8] = include_bytes!("../../../testdata/keys/rsa-public.pem");

const CUSTOM_NS: &str = "urn:x-test:custom";

fn encryptor() -> Box<dyn EncryptionHandle> {
    let key = loader::load_rsa_public_pem(RSA_PUBLIC).unwrap();
    AlgorithmFactory::default()
        .key_transport(algorithm::RSA_OAEP, key)
        .unwrap()
}

fn decryptor() -> Box<dyn EncryptionHandle> {
    let key = loader::load_rsa_private_pem(RSA_PRIVATE).unwrap();
    AlgorithmFactory::default()
        .key_transport(algorithm::RSA_OAEP, key)
        .unwrap()
}

/// A `BaseID` subtype the library does not know about.
#[derive(Debug, Clone, PartialEq)]
struct CustomBaseId {
    value: f64,
    name_qualifier: String,
}

impl Serializable for CustomBaseId {
    fn to_node(&self) -> Node {
        Node::new(ns::SAML, "saml", "BaseID")
            .with_namespace("ssp", CUSTOM_NS)
            .with_attr("NameQualifier", self.name_qualifier.clone())
            .with_ns_attr(ns::XSI, "xsi", "type", "ssp:CustomBaseIDType")
            .with_text(format!("{:.1}", self.value))
    }
}

impl Identifier for CustomBaseId {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn build_custom_base_id(node: &Node) -> Result<Box<dyn Identifier>> {
    let value = node
        .text()
        .trim()
        .parse()
        .map_err(|_| Error::schema(node.clark(), "value is not a number"))?;
    Ok(Box::new(CustomBaseId {
        value,
        name_qualifier: node.attr("NameQualifier").unwrap_or_default().to_owned(),
    }))
}

/// An identifier with its own element name.
#[derive(Debug, Clone, PartialEq)]
struct AccountId(String);

impl Serializable for AccountId {
    fn to_node(&self) -> Node {
        Node::new(CUSTOM_NS, "ssp", "AccountID").with_text(self.0.clone())
    }
}

impl Identifier for AccountId {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn build_account_id(node: &Node) -> Result<Box<dyn Identifier>> {
    Ok(Box::new(AccountId(node.text().to_owned())))
}

/// Serialize to bytes and parse back, as a receiver would.
fn transfer(encrypted: &EncryptedId) -> EncryptedId {
    let wire = samlkit_c14n::render(&encrypted.to_node());
    EncryptedId::from_node(&samlkit_xml::parse(&wire).unwrap()).unwrap()
}

#[test]
fn issuer_survives_encryption_over_the_wire() {
    let issuer = Issuer::new("entityID");
    let encrypted = EncryptedId::from_identifier(&issuer, encryptor().as_ref()).unwrap();
    let received = transfer(&encrypted);

    let id = received.decrypt(decryptor().as_ref()).unwrap();
    assert!(matches!(id, IdentifierValue::Issuer(_)));
    assert_eq!(
        samlkit_c14n::render(&id.to_node()),
        samlkit_c14n::render(&issuer.to_node())
    );
}

#[test]
fn name_id_with_qualifier() {
    let name_id = NameId::new("value").with_name_qualifier("name_qualifier");
    let encrypted = EncryptedId::from_identifier(&name_id, encryptor().as_ref()).unwrap();
    let id = transfer(&encrypted)
        .decrypt_with(decryptor().as_ref(), &DefaultContainer::new())
        .unwrap();
    assert_eq!(id, IdentifierValue::NameId(name_id));
}

#[test]
fn unregistered_custom_base_id_stays_generic() {
    let custom = CustomBaseId {
        value: 1.0,
        name_qualifier: "name_qualifier".into(),
    };
    let encrypted = EncryptedId::from_identifier(&custom, encryptor().as_ref()).unwrap();
    let id = transfer(&encrypted)
        .decrypt_with(decryptor().as_ref(), &DefaultContainer::new())
        .unwrap();
    match id {
        IdentifierValue::BaseId(base) => {
            assert_eq!(base.type_name, QName::new(CUSTOM_NS, "CustomBaseIDType"));
            assert_eq!(base.value, "1.0");
            assert_eq!(base.name_qualifier.as_deref(), Some("name_qualifier"));
        }
        other => panic!("expected a generic BaseID, got {other:?}"),
    }
}

#[test]
fn registered_custom_base_id_is_rebuilt() {
    let custom = CustomBaseId {
        value: 1.0,
        name_qualifier: "name_qualifier".into(),
    };
    let container = DefaultContainer::new().with_identifier(
        QName::new(CUSTOM_NS, "CustomBaseIDType"),
        build_custom_base_id,
    );
    let encrypted = EncryptedId::from_identifier(&custom, encryptor().as_ref()).unwrap();
    let id = transfer(&encrypted)
        .decrypt_with(decryptor().as_ref(), &container)
        .unwrap();
    assert_eq!(id.downcast_ref::<CustomBaseId>(), Some(&custom));
}

#[test]
fn registered_custom_element_is_rebuilt() {
    let account = AccountId("acct-7".into());
    let encrypted = EncryptedId::from_identifier(&account, encryptor().as_ref()).unwrap();

    let err = encrypted
        .decrypt_with(decryptor().as_ref(), &DefaultContainer::new())
        .unwrap_err();
    assert!(matches!(err, Error::UnsupportedIdentifier(_)));

    let container = DefaultContainer::new()
        .with_identifier(QName::new(CUSTOM_NS, "AccountID"), build_account_id);
    let id = encrypted.decrypt_with(decryptor().as_ref(), &container).unwrap();
    assert_eq!(id.downcast_ref::<AccountId>(), Some(&account));
}

#[test]
fn encrypted_attribute_is_not_an_identifier() {
    let attribute = Attribute::new("urn:encrypted:attribute")
        .with_name_format(NAMEFORMAT_URI)
        .with_value(AttributeValue::String("value".into()));
    let envelope = attribute.encrypt(encryptor().as_ref()).unwrap();
    let err = EncryptedId::new(envelope)
        .decrypt_with(decryptor().as_ref(), &DefaultContainer::new())
        .unwrap_err();
    match err {
        Error::UnsupportedIdentifier(msg) => assert!(msg.contains("Attribute")),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn detached_key_with_reference_list() {
    let ctx = EncContext {
        recipient: Some("some_ENTITY_ID".into()),
        carried_key_name: Some("Name of the key".into()),
        ..EncContext::new().detached("Encrypted_DATA_ID", "Encrypted_KEY_ID")
    };
    assert_eq!(ctx.placement, KeyPlacement::Detached);
    let issuer = Issuer::new("entityID");
    let encrypted = EncryptedId::new(issuer.encrypt_with(encryptor().as_ref(), &ctx).unwrap());

    let node = encrypted.to_node();
    let names: Vec<_> = node.children.iter().map(|c| c.local_name.as_str()).collect();
    assert_eq!(names, vec!["EncryptedData", "EncryptedKey"]);

    let received = transfer(&encrypted);
    let key = &received.envelope.keys[0];
    assert_eq!(key.id.as_deref(), Some("Encrypted_KEY_ID"));
    assert_eq!(key.recipient.as_deref(), Some("some_ENTITY_ID"));
    assert_eq!(key.carried_key_name.as_deref(), Some("Name of the key"));
    assert!(key
        .reference_list
        .as_ref()
        .unwrap()
        .references_data("Encrypted_DATA_ID"));

    let id = received
        .decrypt_with(decryptor().as_ref(), &DefaultContainer::new())
        .unwrap();
    assert_eq!(id, IdentifierValue::Issuer(issuer));
}

#[test]
fn keys_must_follow_data() {
    let encrypted =
        EncryptedId::from_identifier(&Issuer::new("entityID"), encryptor().as_ref()).unwrap();
    let ctx = EncContext::new().detached("d1", "k1");
    let detached = EncryptedId::new(
        Issuer::new("entityID")
            .encrypt_with(encryptor().as_ref(), &ctx)
            .unwrap(),
    );
    assert!(EncryptedId::from_node(&encrypted.to_node()).is_ok());

    let mut node = detached.to_node();
    node.children.reverse();
    let err = EncryptedId::from_node(&node).unwrap_err();
    assert!(err.is_schema_violation());
    node.children.reverse();
    assert!(EncryptedId::from_node(&node).is_ok());
}

#[test]
fn out_of_band_session_key() {
    let session_key = vec![7u8; 32];
    let ctx = EncContext::new().with_session_key(session_key.clone());
    let mut envelope = NameId::new("user")
        .encrypt_with(encryptor().as_ref(), &ctx)
        .unwrap();
    envelope.data.key_info = None;
    let encrypted = EncryptedId::new(envelope);

    let data_key = AlgorithmFactory::default()
        .block_cipher(algorithm::AES256_GCM, &session_key)
        .unwrap();
    let id = transfer(&encrypted)
        .decrypt_with(data_key.as_ref(), &DefaultContainer::new())
        .unwrap();
    assert_eq!(id, NameId::new("user").into());

    let err = encrypted
        .decrypt_with(decryptor().as_ref(), &DefaultContainer::new())
        .unwrap_err();
    assert!(matches!(err, Error::KeyMismatch(_)));
}

#[test]
fn container_blacklist_applies_to_decryption() {
    let encrypted =
        EncryptedId::from_identifier(&Issuer::new("entityID"), encryptor().as_ref()).unwrap();
    let strict = DefaultContainer::new().with_blacklist(vec![algorithm::RSA_OAEP.to_string()]);
    let err = encrypted
        .decrypt_with(decryptor().as_ref(), &strict)
        .unwrap_err();
    assert!(matches!(err, Error::BlacklistedAlgorithm(_)));
}

#[test]
fn tampered_ciphertext_fails() {
    let encrypted =
        EncryptedId::from_identifier(&Issuer::new("entityID"), encryptor().as_ref()).unwrap();
    let wire = String::from_utf8(samlkit_c14n::render(&encrypted.to_node())).unwrap();
    let node = samlkit_xml::parse(wire.as_bytes()).unwrap();
    let mut received = EncryptedId::from_node(&node).unwrap();
    if let samlkit_enc::CipherData::Value(v) = &mut received.envelope.data.cipher_data {
        let flipped = if v.starts_with('A') { "B" } else { "A" };
        v.replace_range(0..1, flipped);
    }
    let err = received
        .decrypt_with(decryptor().as_ref(), &DefaultContainer::new())
        .unwrap_err();
    assert!(matches!(err, Error::DecryptionFailure(_)), "{err:?}");
}

#[test]
fn base_id_generic_round_trip() {
    let base = BaseId::new(QName::new(CUSTOM_NS, "CustomBaseIDType"), "ssp", "2.5");
    let encrypted = EncryptedId::from_identifier(&base, encryptor().as_ref()).unwrap();
    let id = encrypted
        .decrypt_with(decryptor().as_ref(), &DefaultContainer::new())
        .unwrap();
    assert_eq!(id, IdentifierValue::BaseId(base));
}
