#![forbid(unsafe_code)]

//! Opaque elements at extension points.

use samlkit_core::{ns, Result};
use samlkit_xml::{Node, QName, Serializable};

/// An element kept as received, for schema positions that admit
/// arbitrary or not-yet-modelled content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk(pub Node);

impl Chunk {
    pub fn new(node: Node) -> Self {
        Self(node)
    }

    pub fn node(&self) -> &Node {
        &self.0
    }

    /// The resolved `xsi:type`, if any.
    pub fn xsi_type(&self) -> Result<Option<QName>> {
        self.0
            .attr_ns(ns::XSI, "type")
            .map(|raw| self.0.resolve_qname_value(raw))
            .transpose()
    }
}

impl Serializable for Chunk {
    fn to_node(&self) -> Node {
        self.0.clone()
    }

    fn qname(&self) -> QName {
        self.0.qname()
    }
}
