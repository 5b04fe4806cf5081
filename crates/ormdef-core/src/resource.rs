//! Resource bundle lookup for captions, descriptions and mnemonics.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Resolves localized strings by bundle name and key.
///
/// Implementations are supplied by the host application; a missing key is
/// `None`, never an error.
pub trait ResourceLookup: Send + Sync {
    /// Look up `key` in the bundle named `bundle`.
    fn resolve(&self, bundle: &str, key: &str) -> Option<String>;
}

/// A named bundle backed by a [`ResourceLookup`].
#[derive(Clone)]
pub struct ResourceBundle {
    name: String,
    lookup: Arc<dyn ResourceLookup>,
}

impl ResourceBundle {
    pub fn new(name: impl Into<String>, lookup: Arc<dyn ResourceLookup>) -> Self {
        Self {
            name: name.into(),
            lookup,
        }
    }

    /// The bundle name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolve `key`, if present.
    pub fn get(&self, key: &str) -> Option<String> {
        self.lookup.resolve(&self.name, key)
    }

    /// Check whether `key` resolves in this bundle.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

impl fmt::Debug for ResourceBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceBundle")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// In-memory resource lookup, keyed by bundle name then key.
#[derive(Debug, Clone, Default)]
pub struct MemoryResources {
    bundles: HashMap<String, HashMap<String, String>>,
}

impl MemoryResources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry to a bundle.
    pub fn with_entry(
        mut self,
        bundle: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.bundles
            .entry(bundle.into())
            .or_default()
            .insert(key.into(), value.into());
        self
    }

    /// Wrap this lookup in a bundle handle.
    pub fn bundle(self, name: impl Into<String>) -> ResourceBundle {
        ResourceBundle::new(name, Arc::new(self))
    }
}

impl ResourceLookup for MemoryResources {
    fn resolve(&self, bundle: &str, key: &str) -> Option<String> {
        self.bundles.get(bundle)?.get(key).cloned()
    }
}
