#![forbid(unsafe_code)]

//! Generic XML tree used as the substrate for every samlkit element.
//!
//! Documents are parsed with `roxmltree` into an owned [`Node`] tree.
//! Typed protocol elements convert to and from that tree through the
//! [`Serializable`] and [`XmlElement`] traits, and use [`ChildCursor`]
//! to enforce their child ordering and cardinality.

pub mod element;
pub mod node;
pub mod parse;
pub mod schema;

pub use element::{Serializable, XmlElement};
pub use node::{Attribute, Namespace, Node, QName};
pub use parse::parse;
pub use schema::ChildCursor;

/// Return roxmltree parsing options.
///
/// DTDs are refused; protocol messages never carry one.
pub fn parsing_options() -> roxmltree::ParsingOptions {
    roxmltree::ParsingOptions {
        allow_dtd: false,
        ..roxmltree::ParsingOptions::default()
    }
}
