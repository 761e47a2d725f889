//! Dependency configuration loading.
//!
//! A fetchdep configuration is a YAML document with a top-level `fetchdep`
//! key holding an ordered list of dependency entries:
//!
//! ```yaml
//! fetchdep:
//!   - name: libfoo
//!     site: git+https://example.com/libfoo
//!     tags:
//!       - optional
//!   - name: tools
//!     site: https://example.com/tools.git
//!     recursive: false
//! ```
//!
//! [`Config::load`] reads and validates the document shape and
//! [`Config::extract`] turns the entries into [`Dependency`] records in
//! declaration order. Structural mistakes are reported as typed
//! [`FetchdepError`]s naming the offending file and field.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde_yaml::Value;

use crate::constants::{
    CONFIG_BASE_KEY, CONFIG_NAME_KEY, CONFIG_RECURSIVE_KEY, CONFIG_SITE_KEY, CONFIG_TAGS_KEY,
    SUPPORTED_CONFIG_NAMES,
};
use crate::core::FetchdepError;
use crate::dependency::{Dependency, build_dependency};
use crate::utils::names::resolve_tag;

/// A loaded fetchdep configuration file.
#[derive(Debug, Clone)]
pub struct Config {
    path: PathBuf,
    entries: Vec<Value>,
}

impl Config {
    /// Load a configuration file.
    ///
    /// # Errors
    ///
    /// - [`FetchdepError::ConfigurationLoad`] if the file cannot be read or
    ///   is not valid YAML
    /// - [`FetchdepError::InvalidConfiguration`] if the document has no
    ///   `fetchdep` key or that key does not hold a list
    pub fn load(path: &Path) -> Result<Self, FetchdepError> {
        tracing::info!("attempting to load configuration file: {}", path.display());

        let content =
            std::fs::read_to_string(path).map_err(|e| FetchdepError::ConfigurationLoad {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        Self::parse(path, &content)
    }

    /// Parse configuration content that was read from `path`.
    ///
    /// # Errors
    ///
    /// Same as [`Config::load`], minus read failures.
    pub fn parse(path: &Path, content: &str) -> Result<Self, FetchdepError> {
        let invalid = || FetchdepError::InvalidConfiguration {
            path: path.display().to_string(),
        };

        let document: Value =
            serde_yaml::from_str(content).map_err(|e| FetchdepError::ConfigurationLoad {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        let root = document.get(CONFIG_BASE_KEY).ok_or_else(invalid)?;
        let entries = match root {
            Value::Null => Vec::new(),
            Value::Sequence(entries) => entries.clone(),
            _ => return Err(invalid()),
        };

        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    /// Path this configuration was loaded from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Extract dependency records, in declaration order.
    ///
    /// # Errors
    ///
    /// Fails on the first entry missing a `name` or `site`, carrying an
    /// invalid name or tag, or whose site cannot be classified.
    pub fn extract(&self) -> Result<Vec<Dependency>, FetchdepError> {
        let config = self.path.display().to_string();
        let mut deps = Vec::with_capacity(self.entries.len());

        for entry in &self.entries {
            let name = entry
                .get(CONFIG_NAME_KEY)
                .and_then(scalar_string)
                .filter(|name| !name.is_empty())
                .ok_or_else(|| FetchdepError::MissingName {
                    config: config.clone(),
                })?;

            let site = entry
                .get(CONFIG_SITE_KEY)
                .and_then(scalar_string)
                .filter(|site| !site.is_empty())
                .ok_or_else(|| FetchdepError::MissingSite {
                    config: config.clone(),
                    name: name.clone(),
                })?;

            let recursive = match entry.get(CONFIG_RECURSIVE_KEY) {
                None => true,
                Some(value) => truthy(value).ok_or_else(|| FetchdepError::InvalidRecursive {
                    config: config.clone(),
                    name: name.clone(),
                    value: scalar_string(value).unwrap_or_else(|| "(not a scalar)".to_string()),
                })?,
            };

            let mut tags = BTreeSet::new();
            for raw_tag in raw_tags(entry.get(CONFIG_TAGS_KEY)) {
                let tag = resolve_tag(&raw_tag).map_err(|reason| FetchdepError::InvalidTag {
                    config: config.clone(),
                    tag: raw_tag.clone(),
                    reason: reason.to_string(),
                })?;
                tags.insert(tag);
            }

            deps.push(build_dependency(&self.path, &name, &site, tags, recursive)?);
        }

        Ok(deps)
    }
}

/// Find a configuration file in a directory.
///
/// Checks the recognised configuration names in order and returns the first
/// one that exists as a file.
#[must_use]
pub fn find_configuration(dir: &Path) -> Option<PathBuf> {
    SUPPORTED_CONFIG_NAMES.iter().map(|name| dir.join(name)).find(|candidate| candidate.is_file())
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

// A key given without a value counts as "no".
fn truthy(value: &Value) -> Option<bool> {
    match value {
        Value::Null => Some(false),
        Value::Bool(b) => Some(*b),
        Value::Number(n) => Some(n.as_f64().is_some_and(|n| n != 0.0)),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

// `tags` may be a list or a single scalar.
fn raw_tags(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Sequence(items)) => items.iter().filter_map(scalar_string).collect(),
        Some(other) => scalar_string(other).into_iter().collect(),
        None => Vec::new(),
    }
}
