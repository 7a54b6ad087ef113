//! A signed assertion nested among attributes keeps verifying after the
//! surrounding metadata is serialized and parsed again.

use samlkit_core::algorithm;
use samlkit_keys::{loader, AlgorithmFactory, SignatureHandle};
use samlkit_saml::attribute::NAMEFORMAT_URI;
use samlkit_saml::conditions::AudienceRestriction;
use samlkit_saml::time::from_timestamp;
use samlkit_saml::{
    Assertion, Attribute, AttributeStatement, AttributeValue, Conditions, EntityAttributes,
    EntityAttributesItem, Issuer, NameId, Signable, Statement, Subject,
};
use samlkit_xml::{Serializable, XmlElement};

const EC_PRIVATE: &[u8] = include_bytes!("../../../testdata/keys/ec-p256-private.pem");

fn signer() -> Box<dyn SignatureHandle> {
    let key = loader::load_ec_p256_private_pem(EC_PRIVATE).unwrap();
    AlgorithmFactory::default()
        .signature(algorithm::ECDSA_SHA256, key)
        .unwrap()
}

fn attribute(name: &str, values: &[&str]) -> Attribute {
    values.iter().fold(
        Attribute::new(name).with_name_format(NAMEFORMAT_URI),
        |attr, v| attr.with_value(AttributeValue::String((*v).to_owned())),
    )
}

fn signed_assertion() -> Assertion {
    let statement = AttributeStatement::from_attributes([attribute(
        "urn:simplesamlphp:v1:simplesamlphp",
        &["is", "really", "cool"],
    )])
    .unwrap();
    let mut assertion = Assertion::new(
        Issuer::new("urn:x-simplesamlphp:issuer"),
        from_timestamp(1610743797).unwrap(),
        Some(Subject::with_name_id(
            NameId::new("some:entity").with_format("urn:oasis:names:tc:SAML:2.0:nameid-format:entity"),
        )),
        vec![Statement::Attribute(statement)],
    )
    .unwrap()
    .with_id("_93af655219464fb403b34436cfb0c5cb1d9a5502")
    .with_conditions(
        Conditions::default().with_audience_restriction(
            AudienceRestriction::new(["https://simplesamlphp.org/idp/metadata", "urn:x-simplesamlphp:phpunit"])
                .unwrap(),
        ),
    );
    assertion.sign(signer().as_ref()).unwrap();
    assertion
}

fn entity_attributes() -> EntityAttributes {
    EntityAttributes::new(vec![
        EntityAttributesItem::Attribute(attribute(
            "attrib1",
            &["is", "really", "cool"],
        )),
        EntityAttributesItem::Assertion(Box::new(signed_assertion())),
        EntityAttributesItem::Attribute(attribute("foo", &["bar"])),
    ])
    .unwrap()
}

#[test]
fn nested_signed_assertion_verifies_after_parse() {
    let ea = entity_attributes();
    let wire = samlkit_c14n::render(&ea.to_node());
    let parsed = EntityAttributes::from_node(&samlkit_xml::parse(&wire).unwrap()).unwrap();
    assert_eq!(parsed, ea);

    let EntityAttributesItem::Assertion(assertion) = &parsed.items()[1] else {
        panic!("second item should be the assertion");
    };
    assert!(assertion.is_signed());
    assert!(assertion.verify(signer().as_ref()).unwrap().is_valid());
}

#[test]
fn rendering_is_stable() {
    let ea = entity_attributes();
    assert_eq!(
        samlkit_c14n::render(&ea.to_node()),
        samlkit_c14n::render(&ea.to_node())
    );
}

#[test]
fn tampered_nested_assertion_is_invalid() {
    let wire = String::from_utf8(samlkit_c14n::render(&entity_attributes().to_node())).unwrap();
    let tampered = wire.replacen(">cool<", ">lame<", 2);
    let parsed = EntityAttributes::from_node(&samlkit_xml::parse(tampered.as_bytes()).unwrap()).unwrap();
    let EntityAttributesItem::Assertion(assertion) = &parsed.items()[1] else {
        panic!("second item should be the assertion");
    };
    assert!(!assertion.verify(signer().as_ref()).unwrap().is_valid());
}
