//! Dependency records.
//!
//! A [`Dependency`] is the immutable description of one external source tree:
//! its normalised name, the site (locator) to fetch it from, the version
//! control kind inferred from that site, its tags, whether fetchdep may
//! recurse into it, and the configuration file that declared it.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::core::FetchdepError;
use crate::utils::names::resolve_dirname;

/// Version control kinds a dependency can be fetched with.
///
/// The enumeration is closed: every site is classified into one of these at
/// configuration-extraction time, or rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VcsKind {
    /// Concurrent Versions System
    Cvs,
    /// Git
    Git,
    /// Mercurial
    Hg,
    /// Creates an empty directory; used for testing the engine without any
    /// host tool.
    Mkdir,
    /// Subversion
    Svn,
}

impl VcsKind {
    /// Short identifier used in logs and the state dump.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cvs => "cvs",
            Self::Git => "git",
            Self::Hg => "hg",
            Self::Mkdir => "mkdir",
            Self::Svn => "svn",
        }
    }

    /// Classify a site value, returning the kind and the locator with any
    /// kind prefix stripped.
    ///
    /// Matching is case-insensitive. Returns `None` when no kind applies.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use fetchdep::dependency::VcsKind;
    ///
    /// assert_eq!(
    ///     VcsKind::classify("git+https://example.com/repo"),
    ///     Some((VcsKind::Git, "https://example.com/repo".to_string()))
    /// );
    /// assert_eq!(VcsKind::classify("ftp://example.com/repo"), None);
    /// ```
    #[must_use]
    pub fn classify(site: &str) -> Option<(Self, String)> {
        const CVS_ROOT_PREFIXES: [&str; 5] = [":ext:", ":extssh:", ":gserver:", ":kserver:", ":pserver:"];

        let site_lc = site.to_lowercase();
        let strip = |n: usize| site.get(n..).unwrap_or_default().to_string();

        if site_lc.starts_with("cvs+") {
            Some((Self::Cvs, strip(4)))
        } else if CVS_ROOT_PREFIXES.iter().any(|p| site_lc.starts_with(p)) {
            Some((Self::Cvs, site.to_string()))
        } else if site_lc.starts_with("git+") {
            Some((Self::Git, strip(4)))
        } else if site_lc.ends_with(".git") {
            Some((Self::Git, site.to_string()))
        } else if site_lc.starts_with("hg+") {
            Some((Self::Hg, strip(3)))
        } else if site_lc.starts_with("mkdir") {
            Some((Self::Mkdir, site.to_string()))
        } else if site_lc.starts_with("svn+") {
            Some((Self::Svn, strip(4)))
        } else {
            None
        }
    }
}

impl fmt::Display for VcsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A project dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    /// Normalised, filesystem-safe name; also the working copy's directory name
    pub name: String,
    /// Source locator with any kind prefix stripped
    pub site: String,
    /// Version control kind
    pub vcs: VcsKind,
    /// Normalised tags
    pub tags: BTreeSet<String>,
    /// Whether fetchdep may look for a nested configuration in this dependency
    pub recursive: bool,
    /// Configuration file that declared this dependency
    pub origin: PathBuf,
}

impl Dependency {
    /// Directory this dependency's working copy lives in.
    #[must_use]
    pub fn target_dir(&self, work_dir: &Path) -> PathBuf {
        work_dir.join(&self.name)
    }
}

/// Build a dependency entry from raw configuration values.
///
/// The name is normalised with [`resolve_dirname`] and the site is classified
/// with [`VcsKind::classify`]. Tags are expected to be resolved already.
///
/// # Errors
///
/// - [`FetchdepError::InvalidName`] when the name cannot be a directory name
/// - [`FetchdepError::UnknownVcsType`] when the site's kind cannot be determined
pub fn build_dependency(
    origin: &Path,
    name: &str,
    site: &str,
    tags: BTreeSet<String>,
    recursive: bool,
) -> Result<Dependency, FetchdepError> {
    let final_name = resolve_dirname(name).map_err(|reason| FetchdepError::InvalidName {
        config: origin.display().to_string(),
        name: name.to_string(),
        reason: reason.to_string(),
    })?;

    let (vcs, final_site) =
        VcsKind::classify(site).ok_or_else(|| FetchdepError::UnknownVcsType {
            config: origin.display().to_string(),
            name: name.to_string(),
            site: site.to_string(),
        })?;

    Ok(Dependency {
        name: final_name,
        site: final_site,
        vcs,
        tags,
        recursive,
        origin: origin.to_path_buf(),
    })
}
