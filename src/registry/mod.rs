//! Dependency registry.
//!
//! The registry is the single record of which dependencies a run knows about.
//! It preserves insertion order (dependencies are dispatched and reported in
//! the order they were first declared) and enforces at most one record per
//! name: the first declaration wins and later ones are ignored by the
//! resolver.
//!
//! It also tracks every tag seen while processing configurations, including
//! tags of dependencies that tag filtering excluded, so unknown/unused tag
//! diagnostics stay accurate.
//!
//! The registry is only mutated by the resolver between scheduling rounds,
//! never while fetch jobs are running, so it carries no locking.

use std::collections::{BTreeSet, HashMap};

use crate::dependency::Dependency;

/// Insertion-ordered map of dependency name to [`Dependency`].
#[derive(Debug, Default, Clone)]
pub struct DependencyRegistry {
    entries: Vec<Dependency>,
    index: HashMap<String, usize>,
    tags: BTreeSet<String>,
}

impl DependencyRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a dependency with this name is registered.
    #[must_use]
    pub fn exists(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Look up a registered dependency.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Dependency> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    /// Register a dependency.
    ///
    /// Returns `false` (and leaves the registry unchanged) if the name is
    /// already registered.
    pub fn store(&mut self, dependency: Dependency) -> bool {
        if self.exists(&dependency.name) {
            return false;
        }

        self.index.insert(dependency.name.clone(), self.entries.len());
        self.entries.push(dependency);
        true
    }

    /// Record tags as seen.
    pub fn track_tags<'a>(&mut self, tags: impl IntoIterator<Item = &'a String>) {
        self.tags.extend(tags.into_iter().cloned());
    }

    /// Every tag seen so far.
    #[must_use]
    pub const fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    /// Registered names in insertion order.
    #[must_use]
    pub fn entries(&self) -> Vec<&str> {
        self.entries.iter().map(|d| d.name.as_str()).collect()
    }

    /// Registered dependencies in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Dependency> {
        self.entries.iter()
    }

    /// Number of registered dependencies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
