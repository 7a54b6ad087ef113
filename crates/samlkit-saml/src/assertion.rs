#![forbid(unsafe_code)]

//! `saml:Assertion`.

use chrono::{DateTime, Utc};
use samlkit_core::{ns, Result};
use samlkit_dsig::Signature;
use samlkit_xml::{ChildCursor, Node, Serializable, XmlElement};

use crate::attribute::AttributeStatement;
use crate::authn::AuthnStatement;
use crate::chunk::Chunk;
use crate::conditions::Conditions;
use crate::container::container;
use crate::name::Issuer;
use crate::signable::{Signable, SignatureSlot};
use crate::subject::Subject;
use crate::time;

const VERSION: &str = "2.0";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Authn(AuthnStatement),
    Attribute(AttributeStatement),
    /// `AuthzDecisionStatement` or an extension `Statement`.
    Other(Chunk),
}

impl Statement {
    fn to_node(&self) -> Node {
        match self {
            Self::Authn(s) => s.to_node(),
            Self::Attribute(s) => s.to_node(),
            Self::Other(c) => c.to_node(),
        }
    }
}

/// `saml:Assertion`.
///
/// Children are `Issuer`, `ds:Signature?`, `Subject?`, `Conditions?`,
/// `Advice?` and then the statements. An assertion without statements
/// must have a subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assertion {
    id: String,
    issue_instant: DateTime<Utc>,
    issuer: Issuer,
    subject: Option<Subject>,
    conditions: Option<Conditions>,
    advice: Option<Chunk>,
    statements: Vec<Statement>,
    signature: SignatureSlot,
}

impl Assertion {
    /// New assertion with an `ID` from the active container.
    pub fn new(
        issuer: Issuer,
        issue_instant: DateTime<Utc>,
        subject: Option<Subject>,
        statements: Vec<Statement>,
    ) -> Result<Self> {
        if subject.is_none() && statements.is_empty() {
            return Err(Self::violation("an assertion without statements needs a Subject"));
        }
        Ok(Self {
            id: container().generate_id(),
            issue_instant,
            issuer,
            subject,
            conditions: None,
            advice: None,
            statements,
            signature: SignatureSlot::default(),
        })
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_conditions(mut self, conditions: Conditions) -> Self {
        self.conditions = Some(conditions);
        self
    }

    pub fn with_advice(mut self, advice: Node) -> Self {
        self.advice = Some(Chunk::new(advice));
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn issue_instant(&self) -> DateTime<Utc> {
        self.issue_instant
    }

    pub fn issuer(&self) -> &Issuer {
        &self.issuer
    }

    pub fn subject(&self) -> Option<&Subject> {
        self.subject.as_ref()
    }

    pub fn conditions(&self) -> Option<&Conditions> {
        self.conditions.as_ref()
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn is_signed(&self) -> bool {
        self.signature.signature().is_some()
    }
}

impl Serializable for Assertion {
    fn to_node(&self) -> Node {
        Self::new_node()
            .with_attr("Version", VERSION)
            .with_attr("ID", self.id.clone())
            .with_attr("IssueInstant", time::format(&self.issue_instant))
            .with_child(self.issuer.to_node())
            .with_children(self.signature.to_node())
            .with_children(self.subject.as_ref().map(Subject::to_node))
            .with_children(self.conditions.as_ref().map(Conditions::to_node))
            .with_children(self.advice.as_ref().map(Chunk::to_node))
            .with_children(self.statements.iter().map(Statement::to_node))
    }
}

impl XmlElement for Assertion {
    const NAMESPACE: &'static str = ns::SAML;
    const PREFIX: &'static str = ns::prefix::SAML;
    const LOCAL_NAME: &'static str = "Assertion";

    fn from_node(node: &Node) -> Result<Self> {
        Self::expect_identity(node)?;
        let version = node.required_attr("Version")?;
        if version != VERSION {
            return Err(Self::violation(format!("unsupported Version '{version}'")));
        }
        let id = node.required_attr("ID")?.to_owned();
        let issue_instant = time::parse_required_attr(node, "IssueInstant")?;

        let mut cursor = ChildCursor::new(node);
        let issuer = cursor.one()?;
        let signature: Option<Signature> = cursor.optional()?;
        let subject: Option<Subject> = cursor.optional()?;
        let conditions = cursor.optional()?;
        let advice = cursor.optional_node(ns::SAML, "Advice").cloned().map(Chunk::new);

        let mut statements = Vec::new();
        while let Some(child) = cursor.next_node() {
            let statement = if child.is(ns::SAML, AuthnStatement::LOCAL_NAME) {
                Statement::Authn(AuthnStatement::from_node(child)?)
            } else if child.is(ns::SAML, AttributeStatement::LOCAL_NAME) {
                Statement::Attribute(AttributeStatement::from_node(child)?)
            } else if child.is(ns::SAML, "AuthzDecisionStatement") || child.is(ns::SAML, "Statement")
            {
                Statement::Other(Chunk::new(child.clone()))
            } else {
                return Err(Self::violation(format!(
                    "unexpected child {} among statements",
                    child.clark()
                )));
            };
            statements.push(statement);
        }
        cursor.finish()?;

        if subject.is_none() && statements.is_empty() {
            return Err(Self::violation("an assertion without statements needs a Subject"));
        }
        Ok(Self {
            id,
            issue_instant,
            issuer,
            subject,
            conditions,
            advice,
            statements,
            signature: SignatureSlot::parsed(signature, node),
        })
    }
}

impl Signable for Assertion {
    fn signature_slot(&self) -> &SignatureSlot {
        &self.signature
    }

    fn signature_slot_mut(&mut self) -> &mut SignatureSlot {
        &mut self.signature
    }
}
