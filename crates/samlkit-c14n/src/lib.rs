#![forbid(unsafe_code)]

//! Canonical rendering of samlkit node trees.
//!
//! Two entry points share one Exclusive C14N 1.0 renderer:
//! - [`canonicalize`] is the strict algorithm, used for digests and
//!   signatures.
//! - [`render`] additionally keeps every namespace declaration recorded
//!   on the nodes, so QName-valued content such as `xsi:type="xs:string"`
//!   stays resolvable. It is the wire serialization.
//!
//! Both are pure: the same tree always yields the same bytes.

pub mod escape;
mod exclusive;

use std::collections::BTreeSet;

use samlkit_core::algorithm;
use samlkit_xml::Node;

use crate::exclusive::ExcC14n;

/// The canonicalization mode.
///
/// Comments are not part of the node model, so both modes produce the
/// same bytes; they differ only in the URI written to metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum C14nMode {
    /// Exclusive Canonical XML 1.0
    #[default]
    Exclusive,
    /// Exclusive Canonical XML 1.0 with comments
    ExclusiveWithComments,
}

impl C14nMode {
    /// Get the algorithm URI for this mode.
    pub fn uri(&self) -> &'static str {
        match self {
            Self::Exclusive => algorithm::EXC_C14N,
            Self::ExclusiveWithComments => algorithm::EXC_C14N_WITH_COMMENTS,
        }
    }

    /// Parse a C14N mode from an algorithm URI.
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            algorithm::EXC_C14N => Some(Self::Exclusive),
            algorithm::EXC_C14N_WITH_COMMENTS => Some(Self::ExclusiveWithComments),
            _ => None,
        }
    }
}

/// Canonicalize a subtree with Exclusive C14N.
///
/// `inclusive_prefixes` is the InclusiveNamespaces PrefixList; `#default`
/// names the default namespace.
pub fn canonicalize(node: &Node, _mode: C14nMode, inclusive_prefixes: &[String]) -> Vec<u8> {
    ExcC14n {
        inclusive_prefixes: inclusive_prefixes
            .iter()
            .map(|p| if p == "#default" { String::new() } else { p.clone() })
            .collect(),
        keep_declared: false,
    }
    .run(node)
    .into_bytes()
}

/// Serialize a tree to its wire form.
pub fn render(node: &Node) -> Vec<u8> {
    to_string(node).into_bytes()
}

pub fn to_string(node: &Node) -> String {
    ExcC14n {
        inclusive_prefixes: BTreeSet::new(),
        keep_declared: true,
    }
    .run(node)
}

/// Prefixes declared anywhere in the subtree that are not bound by an
/// element or attribute name, for use as an InclusiveNamespaces list.
pub fn declared_prefixes(node: &Node) -> Vec<String> {
    fn walk(node: &Node, out: &mut BTreeSet<String>) {
        for decl in &node.namespaces {
            if let Some(p) = &decl.prefix {
                out.insert(p.clone());
            }
        }
        for child in &node.children {
            walk(child, out);
        }
    }
    let mut out = BTreeSet::new();
    walk(node, &mut out);
    out.into_iter().collect()
}
