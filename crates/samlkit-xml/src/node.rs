#![forbid(unsafe_code)]

//! Owned XML element tree.

use std::collections::BTreeMap;
use std::fmt;

use samlkit_core::{ns, Error, Result};

/// A namespace-qualified name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QName {
    /// Namespace URI, empty for names in no namespace.
    pub namespace: String,
    pub local_name: String,
}

impl QName {
    pub fn new(namespace: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            local_name: local_name.into(),
        }
    }

    /// Clark notation: `{namespace}local`, or just `local` without a namespace.
    pub fn clark(&self) -> String {
        if self.namespace.is_empty() {
            self.local_name.clone()
        } else {
            format!("{{{}}}{}", self.namespace, self.local_name)
        }
    }

    pub fn is(&self, namespace: &str, local_name: &str) -> bool {
        self.namespace == namespace && self.local_name == local_name
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.clark())
    }
}

/// A namespace declaration (`xmlns:prefix="uri"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    /// `None` for the default namespace.
    pub prefix: Option<String>,
    pub uri: String,
}

/// An attribute on an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub namespace: Option<String>,
    pub prefix: Option<String>,
    pub local_name: String,
    pub value: String,
}

impl Attribute {
    /// Prefixed name as written on the wire.
    pub fn qualified_name(&self) -> String {
        match &self.prefix {
            Some(p) => format!("{p}:{}", self.local_name),
            None => self.local_name.clone(),
        }
    }
}

/// An owned XML element.
///
/// Children are ordered and that order is significant. Attribute order
/// is not: rendering sorts attributes canonically. An element either has
/// element children or text content, never both.
///
/// Equality compares content, not wire history: namespace declarations
/// only count through the `xsi:type` values they resolve.
#[derive(Debug, Clone, Default)]
pub struct Node {
    pub namespace: Option<String>,
    pub prefix: Option<String>,
    pub local_name: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
    pub text: Option<String>,
    /// Namespace declarations that must stay available when this element
    /// is rendered on its own. For parsed nodes these are all bindings in
    /// scope at the element.
    pub namespaces: Vec<Namespace>,
}

impl Node {
    /// Create an element in `namespace`, written with `prefix`.
    pub fn new(namespace: &str, prefix: &str, local_name: &str) -> Self {
        Self {
            namespace: (!namespace.is_empty()).then(|| namespace.to_owned()),
            prefix: (!prefix.is_empty()).then(|| prefix.to_owned()),
            local_name: local_name.to_owned(),
            ..Default::default()
        }
    }

    pub fn qname(&self) -> QName {
        QName::new(self.namespace.clone().unwrap_or_default(), &self.local_name)
    }

    /// Clark-notation name, used in error messages.
    pub fn clark(&self) -> String {
        self.qname().clark()
    }

    pub fn is(&self, namespace: &str, local_name: &str) -> bool {
        self.local_name == local_name && self.namespace.as_deref().unwrap_or("") == namespace
    }

    /// Prefixed name as written on the wire.
    pub fn qualified_name(&self) -> String {
        match &self.prefix {
            Some(p) => format!("{p}:{}", self.local_name),
            None => self.local_name.clone(),
        }
    }

    // ── Builders ─────────────────────────────────────────────────────

    /// Set an unqualified attribute, replacing an existing one.
    #[must_use]
    pub fn with_attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    #[must_use]
    pub fn with_opt_attr(self, name: &str, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(v) => self.with_attr(name, v),
            None => self,
        }
    }

    #[must_use]
    pub fn with_ns_attr(
        mut self,
        namespace: &str,
        prefix: &str,
        local_name: &str,
        value: impl Into<String>,
    ) -> Self {
        self.attributes
            .retain(|a| !(a.local_name == local_name && a.namespace.as_deref() == Some(namespace)));
        self.attributes.push(Attribute {
            namespace: Some(namespace.to_owned()),
            prefix: Some(prefix.to_owned()),
            local_name: local_name.to_owned(),
            value: value.into(),
        });
        self
    }

    #[must_use]
    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    #[must_use]
    pub fn with_children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(children);
        self
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Declare `prefix` for `uri` on this element.
    #[must_use]
    pub fn with_namespace(mut self, prefix: &str, uri: &str) -> Self {
        self.declare_namespace(prefix, uri);
        self
    }

    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .attributes
            .iter_mut()
            .find(|a| a.namespace.is_none() && a.local_name == name)
        {
            Some(existing) => existing.value = value,
            None => self.attributes.push(Attribute {
                namespace: None,
                prefix: None,
                local_name: name.to_owned(),
                value,
            }),
        }
    }

    pub fn declare_namespace(&mut self, prefix: &str, uri: &str) {
        let prefix = (!prefix.is_empty()).then(|| prefix.to_owned());
        self.namespaces.retain(|n| n.prefix != prefix);
        self.namespaces.push(Namespace {
            prefix,
            uri: uri.to_owned(),
        });
    }

    // ── Accessors ────────────────────────────────────────────────────

    /// Value of an unqualified attribute.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.namespace.is_none() && a.local_name == name)
            .map(|a| a.value.as_str())
    }

    /// Value of a namespace-qualified attribute.
    pub fn attr_ns(&self, namespace: &str, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.local_name == name && a.namespace.as_deref() == Some(namespace))
            .map(|a| a.value.as_str())
    }

    /// Value of a required unqualified attribute.
    pub fn required_attr(&self, name: &str) -> Result<&str> {
        self.attr(name)
            .ok_or_else(|| Error::schema(self.clark(), format!("missing attribute {name}")))
    }

    /// Parse an optional attribute with `FromStr`.
    pub fn parse_attr<T: std::str::FromStr>(&self, name: &str) -> Result<Option<T>> {
        match self.attr(name) {
            None => Ok(None),
            Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
                Error::schema(
                    self.clark(),
                    format!(
                        "attribute {name} has invalid value '{raw}', expected {}",
                        short_type_name::<T>()
                    ),
                )
            }),
        }
    }

    pub fn parse_required_attr<T: std::str::FromStr>(&self, name: &str) -> Result<T> {
        self.parse_attr(name)?
            .ok_or_else(|| Error::schema(self.clark(), format!("missing attribute {name}")))
    }

    /// Text content, empty when the element has none.
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    /// First child element with the given name.
    pub fn child(&self, namespace: &str, local_name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.is(namespace, local_name))
    }

    pub fn children_named<'a>(
        &'a self,
        namespace: &'a str,
        local_name: &'a str,
    ) -> impl Iterator<Item = &'a Node> + 'a {
        self.children.iter().filter(move |c| c.is(namespace, local_name))
    }

    /// Copy of this element without direct children named `namespace:local_name`.
    pub fn without_children(&self, namespace: &str, local_name: &str) -> Node {
        let mut copy = self.clone();
        copy.children.retain(|c| !c.is(namespace, local_name));
        copy
    }

    /// Resolve a prefix against the declarations recorded on this element.
    pub fn lookup_namespace(&self, prefix: Option<&str>) -> Option<&str> {
        if prefix == Some("xml") {
            return Some(ns::XML);
        }
        self.namespaces
            .iter()
            .find(|n| n.prefix.as_deref() == prefix)
            .map(|n| n.uri.as_str())
            .or_else(|| {
                // The element's own and its attributes' bindings are implied.
                if self.prefix.as_deref() == prefix {
                    return self.namespace.as_deref();
                }
                self.attributes
                    .iter()
                    .find(|a| a.prefix.is_some() && a.prefix.as_deref() == prefix)
                    .and_then(|a| a.namespace.as_deref())
            })
    }

    /// Resolve a `prefix:local` value (such as an `xsi:type`) to a [`QName`].
    pub fn resolve_qname_value(&self, value: &str) -> Result<QName> {
        let value = value.trim();
        let (prefix, local) = match value.split_once(':') {
            Some((p, l)) => (Some(p), l),
            None => (None, value),
        };
        match self.lookup_namespace(prefix) {
            Some(uri) => Ok(QName::new(uri, local)),
            None if prefix.is_none() => Ok(QName::new("", local)),
            None => Err(Error::schema(
                self.clark(),
                format!("undeclared namespace prefix in QName value '{value}'"),
            )),
        }
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        same_content(self, other, &Scope::new(), &Scope::new())
    }
}

impl Eq for Node {}

/// Declared bindings visible at an element, keyed by prefix (`""` for
/// the default namespace).
type Scope<'a> = BTreeMap<&'a str, &'a str>;

fn declared_scope<'a>(node: &'a Node, parent: &Scope<'a>) -> Scope<'a> {
    let mut scope = parent.clone();
    for decl in &node.namespaces {
        scope.insert(decl.prefix.as_deref().unwrap_or(""), decl.uri.as_str());
    }
    scope
}

/// The element's own name and attributes bind ahead of inherited
/// declarations.
fn resolve_in<'a>(node: &'a Node, scope: &Scope<'a>, prefix: &str) -> Option<&'a str> {
    if node.prefix.as_deref().unwrap_or("") == prefix {
        if let Some(uri) = node.namespace.as_deref() {
            return Some(uri);
        }
    }
    node.attributes
        .iter()
        .find(|a| a.prefix.as_deref() == Some(prefix))
        .and_then(|a| a.namespace.as_deref())
        .or_else(|| scope.get(prefix).copied())
}

fn same_content<'a, 'b>(a: &'a Node, b: &'b Node, a_parent: &Scope<'a>, b_parent: &Scope<'b>) -> bool {
    if a.namespace != b.namespace
        || a.prefix != b.prefix
        || a.local_name != b.local_name
        || a.attributes != b.attributes
        || a.text != b.text
        || a.children.len() != b.children.len()
    {
        return false;
    }
    let a_scope = declared_scope(a, a_parent);
    let b_scope = declared_scope(b, b_parent);
    if let Some(value) = a.attr_ns(ns::XSI, "type") {
        let prefix = value.trim().split_once(':').map_or("", |(p, _)| p);
        if resolve_in(a, &a_scope, prefix) != resolve_in(b, &b_scope, prefix) {
            return false;
        }
    }
    a.children
        .iter()
        .zip(&b.children)
        .all(|(x, y)| same_content(x, y, &a_scope, &b_scope))
}

fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}
