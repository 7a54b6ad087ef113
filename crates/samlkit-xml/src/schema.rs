#![forbid(unsafe_code)]

//! Ordered child consumption for element parsing.
//!
//! An element's `from_node` walks its declared child schema in order,
//! taking matching children greedily with one cursor call per entry.
//! [`ChildCursor::finish`] then rejects anything left over, which is how
//! out-of-order and unknown children surface as schema violations.

use samlkit_core::{Error, Result};

use crate::element::XmlElement;
use crate::node::Node;

pub struct ChildCursor<'a> {
    parent: &'a Node,
    pos: usize,
}

impl<'a> ChildCursor<'a> {
    pub fn new(parent: &'a Node) -> Self {
        Self { parent, pos: 0 }
    }

    fn peek(&self) -> Option<&'a Node> {
        self.parent.children.get(self.pos)
    }

    fn peek_is<T: XmlElement>(&self) -> bool {
        self.peek()
            .is_some_and(|n| n.is(T::NAMESPACE, T::LOCAL_NAME))
    }

    fn violation(&self, reason: String) -> Error {
        Error::schema(self.parent.clark(), reason)
    }

    /// Exactly one `T`.
    pub fn one<T: XmlElement>(&mut self) -> Result<T> {
        match self.optional::<T>()? {
            Some(v) => Ok(v),
            None => Err(self.violation(match self.peek() {
                Some(found) => format!(
                    "expected {}, found {}",
                    T::element_qname(),
                    found.clark()
                ),
                None => format!("missing required child {}", T::element_qname()),
            })),
        }
    }

    /// Zero or one `T`.
    pub fn optional<T: XmlElement>(&mut self) -> Result<Option<T>> {
        if !self.peek_is::<T>() {
            return Ok(None);
        }
        let node = &self.parent.children[self.pos];
        self.pos += 1;
        T::from_node(node).map(Some)
    }

    /// Zero or more `T`.
    pub fn many<T: XmlElement>(&mut self) -> Result<Vec<T>> {
        let mut out = Vec::new();
        while let Some(v) = self.optional::<T>()? {
            out.push(v);
        }
        Ok(out)
    }

    /// One or more `T`.
    pub fn at_least_one<T: XmlElement>(&mut self) -> Result<Vec<T>> {
        let out = self.many::<T>()?;
        if out.is_empty() {
            return Err(self.violation(format!(
                "at least one {} is required",
                T::element_qname()
            )));
        }
        Ok(out)
    }

    /// Zero or one untyped child named `namespace:local_name`.
    pub fn optional_node(&mut self, namespace: &str, local_name: &str) -> Option<&'a Node> {
        let node = self.peek().filter(|n| n.is(namespace, local_name))?;
        self.pos += 1;
        Some(node)
    }

    /// Next child whatever its name, for choice groups and extension points.
    pub fn next_node(&mut self) -> Option<&'a Node> {
        let node = self.peek()?;
        self.pos += 1;
        Some(node)
    }

    /// All remaining children, consumed as an "any" extension point.
    pub fn remaining(&mut self) -> &'a [Node] {
        let rest = &self.parent.children[self.pos..];
        self.pos = self.parent.children.len();
        rest
    }

    /// Fail if any child was not consumed by the schema walk.
    pub fn finish(self) -> Result<()> {
        match self.peek() {
            None => Ok(()),
            Some(extra) => Err(self.violation(format!(
                "unexpected child {} at position {}",
                extra.clark(),
                self.pos
            ))),
        }
    }
}
