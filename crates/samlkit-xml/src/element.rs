#![forbid(unsafe_code)]

//! The contract every typed protocol element implements.

use samlkit_core::{Error, Result};

use crate::node::{Node, QName};

/// Anything that can render itself as a [`Node`].
///
/// Object safe, so heterogeneous elements (including identifier types
/// registered at runtime) can be held behind `dyn Serializable`.
pub trait Serializable: std::fmt::Debug + Send + Sync {
    /// Build the tree for this element. Children and attributes come out
    /// in schema order regardless of the order fields were set in.
    fn to_node(&self) -> Node;

    /// The element's qualified identity.
    fn qname(&self) -> QName {
        self.to_node().qname()
    }
}

/// A typed element with a fixed qualified identity.
pub trait XmlElement: Serializable + Sized {
    const NAMESPACE: &'static str;
    /// Prefix used when serializing.
    const PREFIX: &'static str;
    const LOCAL_NAME: &'static str;

    /// Rebuild the element from a tree, validating its shape.
    ///
    /// Fails with [`Error::SchemaViolation`] when the node's name does not
    /// match, a required attribute or child is absent, an attribute fails
    /// its type coercion, or the children are out of order.
    fn from_node(node: &Node) -> Result<Self>;

    fn element_qname() -> QName {
        QName::new(Self::NAMESPACE, Self::LOCAL_NAME)
    }

    /// Empty node carrying this element's name.
    fn new_node() -> Node {
        Node::new(Self::NAMESPACE, Self::PREFIX, Self::LOCAL_NAME)
    }

    /// Check that `node` carries this element's name.
    fn expect_identity(node: &Node) -> Result<()> {
        if node.is(Self::NAMESPACE, Self::LOCAL_NAME) {
            Ok(())
        } else {
            Err(Self::violation(format!("unexpected element {}", node.clark())))
        }
    }

    fn violation(reason: impl Into<String>) -> Error {
        Error::schema(Self::element_qname().clark(), reason)
    }
}

/// Parse bytes straight into a typed element.
pub fn from_bytes<T: XmlElement>(data: &[u8]) -> Result<T> {
    T::from_node(&crate::parse(data)?)
}
