//! Fetch handlers.
//!
//! A [`Fetcher`] materialises one dependency's working copy. Handlers exist
//! for every [`VcsKind`]; the version control ones shell out to a host tool
//! located through the shared [`ToolRegistry`], and the `mkdir` handler only
//! creates directories (and, optionally, a nested configuration) so the
//! engine can be exercised without any tool installed.
//!
//! Handlers report operational failure by returning `false`. They never
//! return errors: a failed clone is a fact about a dependency, not a fault in
//! fetchdep.
//!
//! The [`FetcherRegistry`] maps kinds to handlers and turns a [`Dependency`]
//! into a [`FetchJob`] bound to its target directory.

pub mod cvs;
pub mod git;
pub mod hg;
pub mod mkdir;
pub mod svn;

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use colored::Colorize;
use futures::future::BoxFuture;

use crate::core::FetchdepError;
use crate::dependency::{Dependency, VcsKind};
use crate::tool::ToolRegistry;
use crate::tool::command::ToolCommand;
use crate::utils::console;

/// Options handed to a fetch handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    /// Dependency name
    pub name: String,
    /// Site to fetch from, kind prefix stripped
    pub site: String,
    /// Directory the working copy must end up in
    pub target_dir: PathBuf,
    /// Pass-through options for specific handlers
    pub extra: BTreeMap<String, String>,
}

impl FetchOptions {
    /// Options for fetching `dependency` into `target_dir`.
    pub fn new(dependency: &Dependency, target_dir: impl Into<PathBuf>) -> Self {
        Self {
            name: dependency.name.clone(),
            site: dependency.site.clone(),
            target_dir: target_dir.into(),
            extra: BTreeMap::new(),
        }
    }
}

/// Console output of a fetch.
///
/// With a single worker, output goes straight to the console. With several,
/// it is buffered and relayed in one block when the job finishes so lines of
/// concurrent jobs do not interleave.
#[derive(Debug, Default)]
pub struct FetchOutput {
    buffer: Option<Vec<String>>,
}

impl FetchOutput {
    /// Create output that is buffered (`true`) or printed directly (`false`).
    #[must_use]
    pub fn new(buffered: bool) -> Self {
        Self {
            buffer: buffered.then(Vec::new),
        }
    }

    /// Whether output is being buffered.
    #[must_use]
    pub const fn is_buffered(&self) -> bool {
        self.buffer.is_some()
    }

    /// Announce progress on a dependency.
    pub fn note(&mut self, msg: impl AsRef<str>) {
        match &mut self.buffer {
            Some(lines) => lines.push(msg.as_ref().reversed().to_string()),
            None => console::note(msg),
        }
    }

    /// Plain output (typically what a host tool printed).
    pub fn log(&mut self, msg: impl AsRef<str>) {
        let msg = msg.as_ref();
        if msg.is_empty() {
            return;
        }
        match &mut self.buffer {
            Some(lines) => lines.push(msg.to_string()),
            None => console::log(msg),
        }
    }

    /// Report an error.
    pub fn error(&mut self, msg: impl AsRef<str>) {
        match &mut self.buffer {
            Some(lines) => lines.push(format!("(error) {}", msg.as_ref()).red().bold().to_string()),
            None => console::error(msg),
        }
    }

    /// Buffered output as one block, if anything was buffered.
    #[must_use]
    pub fn into_message(self) -> Option<String> {
        self.buffer.filter(|lines| !lines.is_empty()).map(|lines| lines.join("\n"))
    }
}

/// A fetch handler for one version control kind.
///
/// Implementations must not depend on the process's working directory and
/// report failure by returning `false`.
pub trait Fetcher: Send + Sync {
    /// Fetch `opts.site` into `opts.target_dir`.
    fn fetch<'a>(&'a self, opts: &'a FetchOptions, out: &'a mut FetchOutput) -> BoxFuture<'a, bool>;
}

/// A dependency bound to its handler and target directory.
#[derive(Clone)]
pub struct FetchJob {
    /// The dependency to fetch
    pub dependency: Dependency,
    /// Handler for the dependency's kind
    pub fetcher: Arc<dyn Fetcher>,
    /// Where the working copy goes
    pub target_dir: PathBuf,
}

impl std::fmt::Debug for FetchJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchJob")
            .field("dependency", &self.dependency.name)
            .field("kind", &self.dependency.vcs)
            .field("target_dir", &self.target_dir)
            .finish()
    }
}

/// Maps version control kinds to handlers.
#[derive(Default, Clone)]
pub struct FetcherRegistry {
    handlers: HashMap<VcsKind, Arc<dyn Fetcher>>,
}

impl std::fmt::Debug for FetcherRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<_> = self.handlers.keys().collect();
        kinds.sort();
        f.debug_struct("FetcherRegistry").field("kinds", &kinds).finish()
    }
}

impl FetcherRegistry {
    /// A registry with no handlers.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry with the built-in handler for every kind.
    #[must_use]
    pub fn standard(tools: Arc<ToolRegistry>) -> Self {
        let mut registry = Self::empty();
        registry.register(VcsKind::Cvs, Arc::new(cvs::CvsFetcher::new(Arc::clone(&tools))));
        registry.register(VcsKind::Git, Arc::new(git::GitFetcher::new(Arc::clone(&tools))));
        registry.register(VcsKind::Hg, Arc::new(hg::HgFetcher::new(Arc::clone(&tools))));
        registry.register(VcsKind::Mkdir, Arc::new(mkdir::MkdirFetcher));
        registry.register(VcsKind::Svn, Arc::new(svn::SvnFetcher::new(tools)));
        registry
    }

    /// Install (or replace) the handler for a kind.
    pub fn register(&mut self, kind: VcsKind, fetcher: Arc<dyn Fetcher>) {
        self.handlers.insert(kind, fetcher);
    }

    /// Handler for a kind, if any.
    #[must_use]
    pub fn get(&self, kind: VcsKind) -> Option<Arc<dyn Fetcher>> {
        self.handlers.get(&kind).cloned()
    }

    /// Build the fetch job for a dependency.
    ///
    /// # Errors
    ///
    /// [`FetchdepError::FetchNotImplemented`] when no handler is registered
    /// for the dependency's kind.
    pub fn prepare(&self, dependency: &Dependency, work_dir: &Path) -> Result<FetchJob, FetchdepError> {
        let fetcher = self.get(dependency.vcs).ok_or_else(|| FetchdepError::FetchNotImplemented {
            kind: dependency.vcs.to_string(),
        })?;

        Ok(FetchJob {
            dependency: dependency.clone(),
            fetcher,
            target_dir: dependency.target_dir(work_dir),
        })
    }
}

/// Run a prepared tool command on behalf of a handler.
///
/// Tool output is captured into `out` when it is buffered and streamed to the
/// terminal otherwise. On failure, `failure` is reported through `out`.
pub(crate) async fn run_tool(
    command: ToolCommand,
    opts: &FetchOptions,
    out: &mut FetchOutput,
    failure: &str,
) -> bool {
    let command = command.capture(out.is_buffered()).with_context(opts.name.as_str());

    match command.execute().await {
        Ok(output) => {
            out.log(output.combined());
            true
        }
        Err(e) => {
            if let Some(FetchdepError::ToolCommandFailed { output, .. }) = e.downcast_ref() {
                out.log(output);
            } else {
                tracing::debug!("({}) {e:#}", opts.name);
            }
            out.error(failure);
            false
        }
    }
}
