#![forbid(unsafe_code)]

//! Conversion from XML bytes to an owned [`Node`] tree.

use std::collections::BTreeMap;

use samlkit_core::{ns, Error, Result};

use crate::node::{Attribute, Namespace, Node};

/// Parse XML bytes into the tree of the document element.
///
/// Whitespace-only text between element children is dropped. Comments
/// and processing instructions are not kept. Mixed content (element
/// children next to non-whitespace text) is refused.
pub fn parse(data: &[u8]) -> Result<Node> {
    let text = std::str::from_utf8(data)
        .map_err(|e| Error::MalformedInput(format!("invalid UTF-8: {e}")))?;
    parse_str(text)
}

pub fn parse_str(text: &str) -> Result<Node> {
    let doc = roxmltree::Document::parse_with_options(text, crate::parsing_options())
        .map_err(|e| Error::MalformedInput(e.to_string()))?;
    convert(text, doc.root_element())
}

fn convert(source: &str, node: roxmltree::Node<'_, '_>) -> Result<Node> {
    let scope = in_scope_namespaces(node);

    let namespace = node.tag_name().namespace().map(str::to_owned);
    let prefix = element_prefix(source, node).or_else(|| {
        let uri = namespace.as_deref()?;
        if scope.get("").map(String::as_str) == Some(uri) {
            return None;
        }
        prefix_for(&scope, uri)
    });

    let mut attributes = Vec::new();
    for attr in node.attributes() {
        let attr_ns = attr.namespace().map(str::to_owned);
        let attr_prefix = match attr_ns.as_deref() {
            None => None,
            Some(ns::XML) => Some("xml".to_owned()),
            Some(uri) => Some(prefix_for(&scope, uri).ok_or_else(|| {
                Error::MalformedInput(format!("no prefix bound to {uri}"))
            })?),
        };
        attributes.push(Attribute {
            namespace: attr_ns,
            prefix: attr_prefix,
            local_name: attr.name().to_owned(),
            value: attr.value().to_owned(),
        });
    }

    let mut children = Vec::new();
    let mut text = String::new();
    for child in node.children() {
        if child.is_element() {
            children.push(convert(source, child)?);
        } else if child.is_text() {
            text.push_str(child.text().unwrap_or(""));
        }
    }

    let text = if children.is_empty() {
        (!text.is_empty()).then_some(text)
    } else if text.trim().is_empty() {
        None
    } else {
        return Err(Error::MalformedInput(format!(
            "mixed content in element {}",
            node.tag_name().name()
        )));
    };

    let namespaces = scope
        .into_iter()
        .map(|(p, uri)| Namespace {
            prefix: (!p.is_empty()).then_some(p),
            uri,
        })
        .collect();

    Ok(Node {
        namespace,
        prefix,
        local_name: node.tag_name().name().to_owned(),
        attributes,
        children,
        text,
        namespaces,
    })
}

/// Prefix of the element as written in its start tag.
fn element_prefix(source: &str, node: roxmltree::Node<'_, '_>) -> Option<String> {
    let start = source.get(node.range())?.strip_prefix('<')?;
    let end = start
        .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
        .unwrap_or(start.len());
    let (prefix, _) = start[..end].split_once(':')?;
    Some(prefix.to_owned())
}

fn prefix_for(scope: &BTreeMap<String, String>, uri: &str) -> Option<String> {
    scope
        .iter()
        .find(|(p, u)| !p.is_empty() && u.as_str() == uri)
        .map(|(p, _)| p.clone())
}

/// Collect all namespace bindings in scope at `node`, closer
/// declarations overriding more distant ones.
fn in_scope_namespaces(node: roxmltree::Node<'_, '_>) -> BTreeMap<String, String> {
    let mut levels: Vec<Vec<(String, String)>> = Vec::new();
    let mut current = Some(node);
    while let Some(n) = current {
        if n.is_element() {
            levels.push(
                n.namespaces()
                    .map(|ns| (ns.name().unwrap_or("").to_owned(), ns.uri().to_owned()))
                    .collect(),
            );
        }
        current = n.parent();
    }

    let mut result = BTreeMap::new();
    for level in levels.into_iter().rev() {
        for (prefix, uri) in level {
            if prefix == "xml" {
                continue;
            }
            if uri.is_empty() {
                result.remove(&prefix);
            } else {
                result.insert(prefix, uri);
            }
        }
    }
    result
}
