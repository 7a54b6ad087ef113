#![forbid(unsafe_code)]

//! Exclusive Canonical XML 1.0 over an owned [`Node`] tree.
//!
//! Only "visibly utilized" namespace declarations are output. A prefix
//! is visibly utilized by an element if:
//! 1. it is the prefix of the element's own name (or the default
//!    namespace for an unprefixed element), OR
//! 2. it is the prefix of one of the element's attributes, OR
//! 3. it appears in the InclusiveNamespaces PrefixList (`#default` for
//!    the default namespace) and is in scope.
//!
//! A declaration is emitted only when the nearest output ancestor did
//! not already render the same binding.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use samlkit_core::ns;
use samlkit_xml::Node;

use crate::escape::{push_escaped, Context};

type Bindings = BTreeMap<String, String>;

pub(crate) struct ExcC14n {
    /// Prefixes treated as utilized wherever they are in scope. The
    /// empty string stands for the default namespace.
    pub(crate) inclusive_prefixes: BTreeSet<String>,
    /// Also treat every declaration recorded on a node as utilized.
    pub(crate) keep_declared: bool,
}

struct NsDecl<'a> {
    prefix: &'a str,
    uri: &'a str,
}

struct Attr<'a> {
    ns_uri: &'a str,
    local_name: &'a str,
    qualified_name: String,
    value: &'a str,
}

impl Attr<'_> {
    // Unqualified attributes first, then by (namespace URI, local name).
    fn canonical_cmp(&self, other: &Self) -> Ordering {
        match (self.ns_uri.is_empty(), other.ns_uri.is_empty()) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => self
                .ns_uri
                .cmp(other.ns_uri)
                .then_with(|| self.local_name.cmp(other.local_name)),
        }
    }
}

impl ExcC14n {
    pub(crate) fn run(&self, node: &Node) -> String {
        let mut out = String::new();
        self.element(node, &Bindings::new(), &Bindings::new(), &mut out);
        out
    }

    fn element(&self, node: &Node, parent_scope: &Bindings, rendered: &Bindings, out: &mut String) {
        let scope = scope_of(node, parent_scope);

        let mut utilized: BTreeSet<&str> = BTreeSet::new();
        utilized.insert(node.prefix.as_deref().unwrap_or(""));
        for attr in &node.attributes {
            if let Some(p) = attr.prefix.as_deref() {
                utilized.insert(p);
            }
        }
        for p in &self.inclusive_prefixes {
            if p.is_empty() || scope.contains_key(p) {
                utilized.insert(p.as_str());
            }
        }
        if self.keep_declared {
            for decl in &node.namespaces {
                utilized.insert(decl.prefix.as_deref().unwrap_or(""));
            }
        }
        utilized.remove("xml");

        // BTreeSet iteration yields "" first, so the default namespace
        // sorts ahead of prefixed declarations.
        let mut decls: Vec<NsDecl<'_>> = Vec::new();
        for prefix in utilized {
            let uri = scope.get(prefix).map(String::as_str).unwrap_or("");
            let previous = rendered.get(prefix).map(String::as_str).unwrap_or("");
            if prefix.is_empty() {
                if uri != previous {
                    decls.push(NsDecl { prefix, uri });
                }
            } else if !uri.is_empty() && rendered.get(prefix).map(String::as_str) != Some(uri) {
                decls.push(NsDecl { prefix, uri });
            }
        }

        let mut attrs: Vec<Attr<'_>> = node
            .attributes
            .iter()
            .map(|a| Attr {
                ns_uri: a.namespace.as_deref().unwrap_or(""),
                local_name: &a.local_name,
                qualified_name: a.qualified_name(),
                value: &a.value,
            })
            .collect();
        attrs.sort_by(Attr::canonical_cmp);

        let name = node.qualified_name();
        out.push('<');
        out.push_str(&name);
        for decl in &decls {
            if decl.prefix.is_empty() {
                out.push_str(" xmlns=\"");
            } else {
                out.push_str(" xmlns:");
                out.push_str(decl.prefix);
                out.push_str("=\"");
            }
            push_escaped(out, decl.uri, Context::Attribute);
            out.push('"');
        }
        for attr in &attrs {
            out.push(' ');
            out.push_str(&attr.qualified_name);
            out.push_str("=\"");
            push_escaped(out, attr.value, Context::Attribute);
            out.push('"');
        }
        out.push('>');

        if node.children.is_empty() {
            if let Some(text) = &node.text {
                push_escaped(out, text, Context::Text);
            }
        } else {
            let mut child_rendered = rendered.clone();
            for decl in &decls {
                child_rendered.insert(decl.prefix.to_owned(), decl.uri.to_owned());
            }
            for child in &node.children {
                self.element(child, &scope, &child_rendered, out);
            }
        }

        out.push_str("</");
        out.push_str(&name);
        out.push('>');
    }
}

/// Bindings in scope at `node`: inherited ones, overridden by the
/// declarations recorded on the node, overridden by the bindings its own
/// name and attributes imply.
fn scope_of(node: &Node, parent: &Bindings) -> Bindings {
    let mut scope = parent.clone();
    for decl in &node.namespaces {
        scope.insert(decl.prefix.clone().unwrap_or_default(), decl.uri.clone());
    }
    scope.insert(
        node.prefix.clone().unwrap_or_default(),
        node.namespace.clone().unwrap_or_default(),
    );
    for attr in &node.attributes {
        if let (Some(p), Some(uri)) = (&attr.prefix, &attr.namespace) {
            if uri != ns::XML {
                scope.insert(p.clone(), uri.clone());
            }
        }
    }
    scope
}

#[cfg(test)]
mod tests {
    use super::*;
    use samlkit_xml::parse;

    fn exc(xml: &str, inclusive: &[&str]) -> String {
        ExcC14n {
            inclusive_prefixes: inclusive.iter().map(|s| s.to_string()).collect(),
            keep_declared: false,
        }
        .run(&parse(xml.as_bytes()).unwrap())
    }

    #[test]
    fn test_attribute_order() {
        assert_eq!(
            exc(r#"<root><a b="1" a="2"/></root>"#, &[]),
            r#"<root><a a="2" b="1"></a></root>"#
        );
    }

    #[test]
    fn test_unused_namespace_dropped() {
        let xml = r#"<a:root xmlns:a="http://a" xmlns:b="http://b"><a:child/></a:root>"#;
        assert_eq!(
            exc(xml, &[]),
            r#"<a:root xmlns:a="http://a"><a:child></a:child></a:root>"#
        );
    }

    #[test]
    fn test_namespace_pushed_down() {
        let xml = r#"<root xmlns:b="http://b"><b:child b:x="1"/></root>"#;
        assert_eq!(
            exc(xml, &[]),
            r#"<root><b:child xmlns:b="http://b" b:x="1"></b:child></root>"#
        );
    }

    #[test]
    fn test_inclusive_prefix_list() {
        let xml = r#"<a:root xmlns:a="http://a" xmlns:xs="http://www.w3.org/2001/XMLSchema"/>"#;
        assert_eq!(
            exc(xml, &["xs"]),
            r#"<a:root xmlns:a="http://a" xmlns:xs="http://www.w3.org/2001/XMLSchema"></a:root>"#
        );
    }

    #[test]
    fn test_default_namespace_undeclared() {
        let xml = r#"<root xmlns="http://d"><child xmlns=""/></root>"#;
        assert_eq!(
            exc(xml, &[]),
            r#"<root xmlns="http://d"><child xmlns=""></child></root>"#
        );
    }

    #[test]
    fn test_namespaced_attrs_sort_after_plain() {
        let xml = r#"<r xmlns:z="http://z" z:a="1" b="2" a="3"/>"#;
        assert_eq!(
            exc(xml, &[]),
            r#"<r xmlns:z="http://z" a="3" b="2" z:a="1"></r>"#
        );
    }
}
