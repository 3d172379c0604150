//! Authoritative in-memory record of the active filter bindings.
//!
//! The registry holds an immutable [`BindingSet`] behind an `Arc`. Readers
//! clone the `Arc` and never observe a half-applied update; a commit builds a
//! complete replacement set and swaps it in with [`BindingRegistry::install`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde_json::Value;
use thiserror::Error;

/// A downstream filter attached to the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterBinding {
    name: String,
    filter: String,
    target_socket: String,
    config_ref: PathBuf,
    config: Arc<Value>,
}

impl FilterBinding {
    /// Builds a binding from validated parts.
    pub fn new(
        name: impl Into<String>,
        filter: impl Into<String>,
        target_socket: impl Into<String>,
        config_ref: impl Into<PathBuf>,
        config: Value,
    ) -> Self {
        Self {
            name: name.into(),
            filter: filter.into(),
            target_socket: target_socket.into(),
            config_ref: config_ref.into(),
            config: Arc::new(config),
        }
    }

    /// Unique binding name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Filter type resolved in the catalogue.
    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Address of the downstream filter.
    pub fn target_socket(&self) -> &str {
        &self.target_socket
    }

    /// Configuration artefact the binding was validated from.
    pub fn config_ref(&self) -> &Path {
        &self.config_ref
    }

    /// Configuration document captured at validation time.
    pub fn config(&self) -> &Value {
        &self.config
    }
}

/// Immutable set of bindings keyed by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindingSet {
    bindings: BTreeMap<String, FilterBinding>,
}

impl BindingSet {
    /// The empty set.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a set, rejecting repeated names.
    pub fn from_bindings<I>(bindings: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = FilterBinding>,
    {
        let mut map = BTreeMap::new();
        for binding in bindings {
            if map.contains_key(binding.name()) {
                return Err(RegistryError::DuplicateName {
                    name: binding.name().to_owned(),
                });
            }
            map.insert(binding.name().to_owned(), binding);
        }
        Ok(Self { bindings: map })
    }

    /// Looks up a binding by name.
    pub fn get(&self, name: &str) -> Option<&FilterBinding> {
        self.bindings.get(name)
    }

    /// True when `name` is bound.
    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Binding names in lexical order.
    pub fn names(&self) -> Vec<String> {
        self.bindings.keys().cloned().collect()
    }

    /// Iterates bindings in name order.
    pub fn iter(&self) -> impl Iterator<Item = &FilterBinding> {
        self.bindings.values()
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// True when nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Errors raised by the registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Two bindings shared a name.
    #[error("binding name '{name}' appears more than once")]
    DuplicateName {
        /// Repeated name.
        name: String,
    },
    /// A thread panicked while holding the registry lock.
    #[error("binding registry lock poisoned")]
    Poisoned,
}

/// Copy-on-write holder of the active [`BindingSet`].
#[derive(Debug, Default)]
pub struct BindingRegistry {
    current: RwLock<Arc<BindingSet>>,
}

impl BindingRegistry {
    /// Creates a registry holding `initial`.
    pub fn new(initial: BindingSet) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
        }
    }

    /// Returns the current set. The lock is held only to clone the `Arc`.
    pub fn snapshot(&self) -> Result<Arc<BindingSet>, RegistryError> {
        self.current
            .read()
            .map(|guard| Arc::clone(&*guard))
            .map_err(|_| RegistryError::Poisoned)
    }

    /// Replaces the whole set and returns the previous one.
    pub fn install(&self, next: BindingSet) -> Result<Arc<BindingSet>, RegistryError> {
        let mut guard = self.current.write().map_err(|_| RegistryError::Poisoned)?;
        Ok(std::mem::replace(&mut *guard, Arc::new(next)))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn binding(name: &str) -> FilterBinding {
        FilterBinding::new(
            name,
            "ftest",
            format!("/run/{name}.sock"),
            format!("/etc/{name}.conf"),
            json!({}),
        )
    }

    #[test]
    fn rejects_duplicate_names() {
        let error = BindingSet::from_bindings([binding("a"), binding("a")])
            .expect_err("duplicates must be rejected");
        assert!(matches!(error, RegistryError::DuplicateName { name } if name == "a"));
    }

    #[rstest]
    fn names_are_sorted() {
        let set = BindingSet::from_bindings([binding("b"), binding("a"), binding("c")])
            .expect("unique names");
        assert_eq!(set.names(), vec!["a", "b", "c"]);
    }

    #[test]
    fn install_swaps_whole_set() {
        let registry = BindingRegistry::new(BindingSet::empty());
        let before = registry.snapshot().expect("snapshot");
        let next = BindingSet::from_bindings([binding("a")]).expect("set");
        let previous = registry.install(next).expect("install");

        assert!(previous.is_empty());
        assert!(before.is_empty(), "earlier snapshots are immutable");
        assert_eq!(registry.snapshot().expect("snapshot").names(), vec!["a"]);
    }

    #[test]
    fn captured_config_is_compared_by_value() {
        let first = binding("a");
        let second = FilterBinding::new("a", "ftest", "/run/a.sock", "/etc/a.conf", json!({"x": 1}));
        assert_ne!(first, second);
        assert_eq!(first, binding("a"));
    }
}
