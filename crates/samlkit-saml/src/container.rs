#![forbid(unsafe_code)]

//! Runtime capability container.
//!
//! One container is active per process. ID generation, the log sink, the
//! identifier handler registry and the algorithm blacklist are looked up
//! on the active container at the moment each operation runs, so a
//! container swapped in between two calls takes effect on the second.
//!
//! Handlers must be registered before the container is shared with
//! threads that decrypt; the registry is read-only once installed.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use rand::RngCore;
use samlkit_core::{algorithm, Result};
use samlkit_xml::{Node, QName};

use crate::identifier::Identifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Builds a registered identifier type from its decrypted node.
pub type IdentifierConstructor = fn(&Node) -> Result<Box<dyn Identifier>>;

pub trait Container: Send + Sync {
    /// A fresh identifier suitable for an `ID` attribute.
    fn generate_id(&self) -> String;

    /// Log sink. Forwards to `tracing` unless overridden.
    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Error => tracing::error!("{message}"),
            LogLevel::Warn => tracing::warn!("{message}"),
            LogLevel::Info => tracing::info!("{message}"),
            LogLevel::Debug => tracing::debug!("{message}"),
            LogLevel::Trace => tracing::trace!("{message}"),
        }
    }

    /// Constructor registered for `qname`: an element name, or the
    /// `xsi:type` of a `saml:BaseID`.
    fn identifier_handler(&self, qname: &QName) -> Option<IdentifierConstructor>;

    /// Algorithm URIs refused for signing and encryption.
    fn blacklisted_algorithms(&self) -> Vec<String>;
}

/// Container with a random ID generator, `tracing` logging and an
/// in-memory handler registry.
#[derive(Clone)]
pub struct DefaultContainer {
    handlers: HashMap<QName, IdentifierConstructor>,
    blacklist: Vec<String>,
}

impl Default for DefaultContainer {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
            blacklist: algorithm::DEFAULT_BLACKLIST
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl DefaultContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identifier(mut self, qname: QName, constructor: IdentifierConstructor) -> Self {
        self.handlers.insert(qname, constructor);
        self
    }

    /// Replace the blacklist. An empty list allows every algorithm.
    pub fn with_blacklist(mut self, blacklist: impl IntoIterator<Item = String>) -> Self {
        self.blacklist = blacklist.into_iter().collect();
        self
    }
}

impl fmt::Debug for DefaultContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<String> = self.handlers.keys().map(QName::clark).collect();
        names.sort();
        f.debug_struct("DefaultContainer")
            .field("handlers", &names)
            .field("blacklist", &self.blacklist)
            .finish()
    }
}

impl Container for DefaultContainer {
    /// `_` followed by 42 lowercase hex characters.
    fn generate_id(&self) -> String {
        let mut bytes = [0u8; 21];
        rand::thread_rng().fill_bytes(&mut bytes);
        format!("_{}", hex::encode(bytes))
    }

    fn identifier_handler(&self, qname: &QName) -> Option<IdentifierConstructor> {
        self.handlers.get(qname).copied()
    }

    fn blacklisted_algorithms(&self) -> Vec<String> {
        self.blacklist.clone()
    }
}

static ACTIVE: RwLock<Option<Arc<dyn Container>>> = parking_lot::const_rwlock(None);

/// Make `container` the active one.
pub fn set_container(container: Arc<dyn Container>) {
    *ACTIVE.write() = Some(container);
}

/// Drop the active container; later lookups get a [`DefaultContainer`].
pub fn reset_container() {
    *ACTIVE.write() = None;
}

/// The active container, or a [`DefaultContainer`] when none is set.
pub fn container() -> Arc<dyn Container> {
    match ACTIVE.read().as_ref() {
        Some(active) => Arc::clone(active),
        None => Arc::new(DefaultContainer::new()),
    }
}
