//! Engine options.
//!
//! [`EngineOptions`] collects everything a run is configured with. The CLI
//! fills it from arguments; [`apply_environment`](EngineOptions::apply_environment)
//! layers `FETCHDEP_*` environment overrides on top and
//! [`finalize`](EngineOptions::finalize) derives the remaining defaults.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::constants::{ENV_DEBUG, ENV_PARALLEL, ENV_VERBOSE, FALLBACK_CORE_COUNT};
use crate::core::FetchdepError;
use crate::resolver::TagFilter;
use crate::utils::names::resolve_tag;

/// Options configuring an engine run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Include every tagged dependency
    pub all_tags: bool,
    /// Standing answer to the request-limit question (`None` asks)
    pub assume_yes: Option<bool>,
    /// Explicit configuration file
    pub conf_point: Option<PathBuf>,
    /// Debug output
    pub debug: bool,
    /// Log what would be fetched instead of fetching
    pub dry_run: bool,
    /// Print the resolved state and stop
    pub dump_state: bool,
    /// Disable coloured output
    pub no_color: bool,
    /// Concurrent fetches; 0 derives a count from the host, `None` runs one
    /// at a time unless `FETCHDEP_PARALLEL` says otherwise
    pub parallel: Option<usize>,
    /// Follow nested configurations
    pub recursive: bool,
    /// Fail when no configuration is found
    pub required: bool,
    /// Tolerate dependencies that cannot be fetched
    pub skip_missing: bool,
    /// Selected tags, as given
    pub tags: Vec<String>,
    /// Directory whose configuration is processed
    pub target_dir: Option<PathBuf>,
    /// Verbose output
    pub verbose: bool,
    /// Directory working copies are created in
    pub work_dir: Option<PathBuf>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            all_tags: false,
            assume_yes: None,
            conf_point: None,
            debug: false,
            dry_run: false,
            dump_state: false,
            no_color: false,
            parallel: None,
            recursive: false,
            required: false,
            skip_missing: false,
            tags: Vec::new(),
            target_dir: None,
            verbose: false,
            work_dir: None,
        }
    }
}

fn env_flag(key: &str) -> bool {
    std::env::var_os(key).is_some_and(|value| !value.is_empty())
}

impl EngineOptions {
    /// Apply `FETCHDEP_DEBUG`, `FETCHDEP_VERBOSE` and `FETCHDEP_PARALLEL`.
    ///
    /// Debug implies verbose. The worker count only applies when none was
    /// given explicitly; an unparsable one is ignored with a warning.
    pub fn apply_environment(&mut self) {
        if env_flag(ENV_DEBUG) {
            self.debug = true;
            self.verbose = true;
        }
        if env_flag(ENV_VERBOSE) {
            self.verbose = true;
        }

        if self.parallel.is_some() {
            return;
        }
        if let Ok(value) = std::env::var(ENV_PARALLEL) {
            match value.trim().parse::<usize>() {
                Ok(parallel) => self.parallel = Some(parallel),
                Err(_) => tracing::warn!("ignoring invalid {ENV_PARALLEL} value: {value}"),
            }
        }
    }

    /// Derive defaults that depend on other options.
    ///
    /// - the target directory defaults to the current directory
    /// - the work directory defaults to the target's parent
    /// - a relative configuration path is anchored at the target directory
    /// - a worker count of 0 becomes the host's available parallelism
    ///
    /// # Errors
    ///
    /// Fails if the current directory cannot be determined.
    pub fn finalize(&mut self) -> Result<()> {
        let target_dir = match self.target_dir.take() {
            Some(dir) => absolute(&dir)?,
            None => std::env::current_dir().context("unable to determine current directory")?,
        };

        let work_dir = match self.work_dir.take() {
            Some(dir) => absolute(&dir)?,
            None => target_dir.parent().unwrap_or(&target_dir).to_path_buf(),
        };
        self.work_dir = Some(work_dir);

        if let Some(conf_point) = self.conf_point.take() {
            self.conf_point = Some(if conf_point.is_absolute() {
                conf_point
            } else {
                target_dir.join(conf_point)
            });
        }

        if self.parallel == Some(0) {
            self.parallel = Some(available_parallelism());
        }

        self.target_dir = Some(target_dir);
        Ok(())
    }

    /// Number of fetches to run at once.
    #[must_use]
    pub fn workers(&self) -> usize {
        match self.parallel {
            None => 1,
            Some(0) => available_parallelism(),
            Some(count) => count,
        }
    }

    /// The target directory, or the current directory before finalisation.
    #[must_use]
    pub fn target_dir(&self) -> PathBuf {
        self.target_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    /// The work directory, or the target's parent before finalisation.
    #[must_use]
    pub fn work_dir(&self) -> PathBuf {
        self.work_dir.clone().unwrap_or_else(|| {
            let target = self.target_dir();
            target.parent().map_or_else(|| PathBuf::from(".."), Path::to_path_buf)
        })
    }

    /// Selected tags, normalised.
    ///
    /// # Errors
    ///
    /// [`FetchdepError::InvalidTag`] for a tag that cannot be normalised.
    pub fn selected_tags(&self) -> Result<BTreeSet<String>, FetchdepError> {
        self.tags
            .iter()
            .map(|tag| {
                resolve_tag(tag).map_err(|reason| FetchdepError::InvalidTag {
                    config: "command line".to_string(),
                    tag: tag.clone(),
                    reason: reason.to_string(),
                })
            })
            .collect()
    }

    /// The tag filter these options select.
    ///
    /// # Errors
    ///
    /// Same as [`selected_tags`](Self::selected_tags).
    pub fn tag_filter(&self) -> Result<TagFilter, FetchdepError> {
        Ok(TagFilter {
            all: self.all_tags,
            selected: self.selected_tags()?,
        })
    }
}

fn available_parallelism() -> usize {
    std::thread::available_parallelism().map(std::num::NonZeroUsize::get).unwrap_or(FALLBACK_CORE_COUNT)
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).with_context(|| format!("unable to resolve path: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_defaults() {
        let opts = EngineOptions::default();
        assert_eq!(opts.parallel, None);
        assert_eq!(opts.workers(), 1);
        assert!(!opts.recursive);
        assert_eq!(opts.assume_yes, None);
    }

    #[test]
    fn test_finalize_derives_directories() {
        let mut opts = EngineOptions {
            target_dir: Some(PathBuf::from("/work/project")),
            conf_point: Some(PathBuf::from("deps/fetchdep.yml")),
            ..EngineOptions::default()
        };
        opts.finalize().unwrap();

        assert_eq!(opts.target_dir(), Path::new("/work/project"));
        assert_eq!(opts.work_dir(), Path::new("/work"));
        assert_eq!(opts.conf_point.as_deref(), Some(Path::new("/work/project/deps/fetchdep.yml")));
    }

    #[test]
    fn test_finalize_keeps_explicit_values() {
        let mut opts = EngineOptions {
            target_dir: Some(PathBuf::from("/work/project")),
            work_dir: Some(PathBuf::from("/elsewhere")),
            conf_point: Some(PathBuf::from("/etc/fetchdep.yml")),
            parallel: Some(3),
            ..EngineOptions::default()
        };
        opts.finalize().unwrap();

        assert_eq!(opts.work_dir(), Path::new("/elsewhere"));
        assert_eq!(opts.conf_point.as_deref(), Some(Path::new("/etc/fetchdep.yml")));
        assert_eq!(opts.parallel, Some(3));
    }

    #[test]
    fn test_finalize_automatic_parallelism() {
        let mut opts = EngineOptions {
            target_dir: Some(PathBuf::from("/work/project")),
            parallel: Some(0),
            ..EngineOptions::default()
        };
        assert!(opts.workers() >= 1);
        opts.finalize().unwrap();
        assert!(opts.parallel.is_some_and(|count| count >= 1));
    }

    #[test]
    fn test_tag_filter() {
        let opts = EngineOptions {
            tags: vec!["Tag1".to_string(), " tag2 ".to_string()],
            ..EngineOptions::default()
        };
        let filter = opts.tag_filter().unwrap();
        assert!(!filter.all);
        assert_eq!(filter.selected, BTreeSet::from(["tag1".to_string(), "tag2".to_string()]));

        let bad = EngineOptions {
            tags: vec!["two words".to_string()],
            ..EngineOptions::default()
        };
        assert!(matches!(bad.tag_filter(), Err(FetchdepError::InvalidTag { .. })));
    }

    #[test]
    #[serial]
    fn test_environment_overrides() {
        // SAFETY: serialised with every other test touching these variables
        unsafe {
            std::env::set_var(ENV_DEBUG, "1");
            std::env::set_var(ENV_PARALLEL, "6");
        }

        let mut opts = EngineOptions::default();
        opts.apply_environment();

        unsafe {
            std::env::remove_var(ENV_DEBUG);
            std::env::remove_var(ENV_PARALLEL);
        }

        assert!(opts.debug);
        assert!(opts.verbose);
        assert_eq!(opts.parallel, Some(6));
    }

    #[test]
    #[serial]
    fn test_invalid_parallel_is_ignored() {
        // SAFETY: serialised with every other test touching these variables
        unsafe {
            std::env::set_var(ENV_PARALLEL, "many");
        }

        let mut opts = EngineOptions::default();
        opts.apply_environment();

        unsafe {
            std::env::remove_var(ENV_PARALLEL);
        }

        assert_eq!(opts.parallel, None);
        assert!(!opts.debug);
    }

    #[test]
    #[serial]
    fn test_explicit_parallel_wins_over_environment() {
        // SAFETY: serialised with every other test touching these variables
        unsafe {
            std::env::set_var(ENV_PARALLEL, "6");
        }

        let mut explicit = EngineOptions {
            parallel: Some(2),
            ..EngineOptions::default()
        };
        explicit.apply_environment();

        let mut automatic = EngineOptions {
            parallel: Some(0),
            ..EngineOptions::default()
        };
        automatic.apply_environment();

        unsafe {
            std::env::remove_var(ENV_PARALLEL);
        }

        assert_eq!(explicit.parallel, Some(2));
        assert_eq!(automatic.parallel, Some(0));
    }
}
