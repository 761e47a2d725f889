//! Dependency graph resolution.
//!
//! The [`GraphResolver`] reads a configuration file and registers its
//! dependencies in a [`DependencyRegistry`], applying tag filtering and
//! first-writer-wins deduplication. When recursion is enabled it also walks
//! configuration files found inside working copies that already exist on
//! disk; nested configurations discovered while processing one file are
//! handled after all of that file's records, in declaration order.
//!
//! Dependencies whose working copy does not exist yet cannot be recursed into
//! here. The scheduler feeds their nested configurations back once they have
//! been fetched.
//!
//! Resolution returns the names it newly registered rather than mutating any
//! caller-owned list, so the scheduler can turn them directly into the next
//! round's fetch candidates.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::config::{Config, find_configuration};
use crate::registry::DependencyRegistry;

/// Tag-based selection of dependencies.
///
/// Untagged dependencies are always included. Tagged dependencies are
/// included when every tag is accepted (`--all-tags`) or when at least one of
/// their tags was selected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagFilter {
    /// Include every tagged dependency
    pub all: bool,
    /// Selected (normalised) tags
    pub selected: BTreeSet<String>,
}

impl TagFilter {
    /// Whether a dependency carrying `tags` passes this filter.
    #[must_use]
    pub fn includes(&self, tags: &BTreeSet<String>) -> bool {
        self.all || tags.is_empty() || !self.selected.is_disjoint(tags)
    }
}

/// Result of resolving one configuration (and any nested ones it reached).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Names newly registered, in registration order
    pub registered: Vec<String>,
    /// Configuration files processed, in processing order
    pub configs: Vec<PathBuf>,
}

/// Reads configurations into a [`DependencyRegistry`].
#[derive(Debug, Clone)]
pub struct GraphResolver {
    work_dir: PathBuf,
    recursive: bool,
    filter: TagFilter,
}

impl GraphResolver {
    /// Create a resolver.
    ///
    /// `work_dir` is where working copies live, `recursive` is the global
    /// recursion switch.
    pub fn new(work_dir: impl Into<PathBuf>, recursive: bool, filter: TagFilter) -> Self {
        Self {
            work_dir: work_dir.into(),
            recursive,
            filter,
        }
    }

    /// Process a configuration file.
    ///
    /// # Errors
    ///
    /// Any configuration error (unreadable file, missing name or site,
    /// unclassifiable site, ...) aborts resolution; these are authoring
    /// mistakes, not transient faults.
    pub fn process(
        &self,
        registry: &mut DependencyRegistry,
        config_path: &Path,
    ) -> Result<Resolution> {
        let mut resolution = Resolution::default();
        self.process_into(registry, config_path, &mut resolution)?;
        Ok(resolution)
    }

    fn process_into(
        &self,
        registry: &mut DependencyRegistry,
        config_path: &Path,
        resolution: &mut Resolution,
    ) -> Result<()> {
        let config = Config::load(config_path)?;
        resolution.configs.push(config_path.to_path_buf());

        let mut additional = Vec::new();
        for dep in config.extract()? {
            registry.track_tags(&dep.tags);

            if registry.exists(&dep.name) {
                tracing::debug!("ignoring already registered dependency: {}", dep.name);
                continue;
            }

            if !self.filter.includes(&dep.tags) {
                tracing::debug!("excluding dependency by tags: {}", dep.name);
                continue;
            }

            let nested = if self.recursive && dep.recursive {
                tracing::debug!("check if package has a fetchdep config: {}", dep.name);
                let expected_dir = dep.target_dir(&self.work_dir);
                if expected_dir.exists() { find_configuration(&expected_dir) } else { None }
            } else {
                None
            };

            resolution.registered.push(dep.name.clone());
            registry.store(dep);

            if let Some(nested) = nested {
                tracing::info!("new dependency configuration: {}", nested.display());
                additional.push(nested);
            }
        }

        for nested in additional {
            self.process_into(registry, &nested, resolution)?;
        }

        Ok(())
    }
}
