//! The `mkdir` fetch handler.
//!
//! Creates the target directory without any host tool. Words following
//! `mkdir` in the site describe nested dependencies; each becomes an entry of
//! a `fetchdep.yml` written into the new directory, which lets a single
//! configuration grow an arbitrarily deep dependency graph:
//!
//! ```text
//! site: mkdir a b:c
//! ```
//!
//! produces `fetchdep-a` (site `mkdir`) and `fetchdep-b` (site `mkdir c`).
//! Words are lowercased, stripped to `[a-z:]` and truncated to ten
//! characters; a word may carry a `name:extra` pair.

use std::path::Path;

use anyhow::{Context, Result};
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::Serialize;

use super::{FetchOptions, FetchOutput, Fetcher};
use crate::constants::CONFIG_BASE_KEY;
use crate::utils::ensure_dir;

const MAX_WORD_LEN: usize = 10;

/// Creates directories instead of fetching anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct MkdirFetcher;

#[derive(Debug, Serialize)]
struct NestedEntry {
    name: String,
    site: String,
}

/// Nested dependencies described by a `mkdir` site, as `(name, extra)` pairs
/// in first-seen order.
fn nested_entries(site: &str) -> Vec<(String, String)> {
    let mut entries: Vec<(String, String)> = Vec::new();

    for word in site.split_whitespace().skip(1) {
        let cleaned: String = word
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_lowercase() || *c == ':')
            .take(MAX_WORD_LEN)
            .collect();

        let mut parts = cleaned.split(':');
        let name = parts.next().unwrap_or_default();
        if name.is_empty() {
            continue;
        }
        let extra = parts.next().unwrap_or_default().to_string();

        // a repeated name keeps its position but takes the latest extra
        if let Some(existing) = entries.iter_mut().find(|(n, _)| n == name) {
            existing.1 = extra;
        } else {
            entries.push((name.to_string(), extra));
        }
    }

    entries
}

fn write_nested_config(target_dir: &Path, entries: &[(String, String)]) -> Result<()> {
    let document = std::collections::BTreeMap::from([(
        CONFIG_BASE_KEY,
        entries
            .iter()
            .map(|(name, extra)| NestedEntry {
                name: format!("fetchdep-{name}"),
                site: format!("mkdir {extra}").trim_end().to_string(),
            })
            .collect::<Vec<_>>(),
    )]);

    let path = target_dir.join("fetchdep.yml");
    let content = serde_yaml::to_string(&document)?;
    std::fs::write(&path, content).with_context(|| format!("unable to write {}", path.display()))
}

impl Fetcher for MkdirFetcher {
    fn fetch<'a>(&'a self, opts: &'a FetchOptions, out: &'a mut FetchOutput) -> BoxFuture<'a, bool> {
        async move {
            out.note(format!("fetching {}...", opts.name));

            let entries = nested_entries(&opts.site);

            let result = ensure_dir(&opts.target_dir).and_then(|()| {
                if entries.is_empty() {
                    Ok(())
                } else {
                    write_nested_config(&opts.target_dir, &entries)
                }
            });

            match result {
                Ok(()) => true,
                Err(e) => {
                    out.error(format!("{e:#}"));
                    false
                }
            }
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, find_configuration};
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn pairs(values: &[(&str, &str)]) -> Vec<(String, String)> {
        values.iter().map(|(n, e)| ((*n).to_string(), (*e).to_string())).collect()
    }

    #[test]
    fn test_nested_entries() {
        assert!(nested_entries("mkdir").is_empty());
        assert_eq!(nested_entries("mkdir a b"), pairs(&[("a", ""), ("b", "")]));
        assert_eq!(nested_entries("mkdir b:c"), pairs(&[("b", "c")]));
        assert_eq!(
            nested_entries("mkdir Hello-World! abcdefghijklmnop 123 :x"),
            pairs(&[("helloworld", ""), ("abcdefghij", "")])
        );
        assert_eq!(nested_entries("mkdir a:x a:y"), pairs(&[("a", "y")]));
    }

    #[tokio::test]
    async fn test_creates_directory_and_nested_config() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("recursive");
        let opts = FetchOptions {
            name: "recursive".to_string(),
            site: "mkdir a b:c".to_string(),
            target_dir: target.clone(),
            extra: BTreeMap::new(),
        };
        let mut out = FetchOutput::new(true);

        assert!(MkdirFetcher.fetch(&opts, &mut out).await);
        assert!(target.is_dir());

        let cfg = find_configuration(&target).unwrap();
        let deps = Config::load(&cfg).unwrap().extract().unwrap();
        let names: Vec<_> = deps.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["fetchdep-a", "fetchdep-b"]);
        assert_eq!(deps[0].site, "mkdir");
        assert_eq!(deps[1].site, "mkdir c");
    }

    #[tokio::test]
    async fn test_plain_mkdir_writes_no_config() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("plain");
        let opts = FetchOptions {
            name: "plain".to_string(),
            site: "mkdir".to_string(),
            target_dir: target.clone(),
            extra: BTreeMap::new(),
        };

        assert!(MkdirFetcher.fetch(&opts, &mut FetchOutput::new(true)).await);
        assert!(target.is_dir());
        assert_eq!(find_configuration(&target), None);
    }

    #[tokio::test]
    async fn test_fails_when_target_is_a_file() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("occupied");
        std::fs::write(&target, "").unwrap();

        let opts = FetchOptions {
            name: "occupied".to_string(),
            site: "mkdir".to_string(),
            target_dir: target,
            extra: BTreeMap::new(),
        };
        let mut out = FetchOutput::new(true);

        assert!(!MkdirFetcher.fetch(&opts, &mut out).await);
        assert!(out.into_message().unwrap().contains("not a directory"));
    }
}
