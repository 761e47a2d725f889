//! The fetch engine.
//!
//! An [`Engine`] run locates the root configuration, resolves it into the
//! [`DependencyRegistry`], and then schedules fetches in rounds:
//!
//! 1. every registered dependency whose working copy is missing is counted
//!    against the [`ConfirmationGate`] and, if authorized, dispatched to the
//!    [`WorkerPool`]
//! 2. the [`Coordinator`] collects completions, failures and the nested
//!    configurations fetched working copies carry, until the round drains
//! 3. with recursion enabled, the nested configurations are resolved; the
//!    dependencies they newly register form the next round
//!
//! A failed fetch stops the run after the round drains, unless missing
//! dependencies are tolerated, in which case the run finishes as
//! [`RunOutcome::Partial`]. Errors (configuration mistakes, worker pool
//! faults) abort outstanding fetches and propagate to the caller.
//!
//! # Modules
//!
//! - [`coordinator`] - Worker event channel and job accounting
//! - [`gate`] - Request-volume confirmation
//! - [`options`] - Run configuration
//! - [`pool`] - Bounded worker pool
//! - [`worker`] - Execution of a single job

pub mod coordinator;
pub mod gate;
pub mod options;
pub mod pool;
pub mod worker;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use crate::config::find_configuration;
use crate::constants::MAX_REQUEST_BEFORE_CONFIRM;
use crate::core::FetchdepError;
use crate::fetch::FetcherRegistry;
use crate::registry::DependencyRegistry;
use crate::resolver::{GraphResolver, TagFilter};
use crate::tool::ToolRegistry;
use crate::utils::console;

pub use coordinator::{Coordinator, CoordinatorStats};
pub use gate::ConfirmationGate;
pub use options::EngineOptions;
pub use pool::WorkerPool;
use worker::{WorkerSettings, run_job};

/// Why a run failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// A dependency could not be fetched and failures are not tolerated
    FetchFailed,
    /// The request limit was reached and continuing was not authorized
    RequestLimit,
    /// No configuration was found and one is required
    NoConfiguration,
}

/// Result of an engine run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every dependency is prepared
    Complete,
    /// Every round finished, but some dependencies could not be fetched
    Partial,
    /// The run stopped early
    Failed(FailureReason),
}

impl RunOutcome {
    /// Whether the run counts as successful (complete or partial).
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Complete | Self::Partial)
    }
}

/// Drives a fetchdep run.
#[derive(Debug)]
pub struct Engine {
    opts: EngineOptions,
    registry: DependencyRegistry,
    fetchers: FetcherRegistry,
    gate: ConfirmationGate,
    stats: CoordinatorStats,
}

impl Engine {
    /// Create an engine with the standard fetch handlers and an interactive
    /// confirmation gate.
    #[must_use]
    pub fn new(opts: EngineOptions) -> Self {
        let fetchers = FetcherRegistry::standard(Arc::new(ToolRegistry::new()));
        let gate = ConfirmationGate::new(MAX_REQUEST_BEFORE_CONFIRM, opts.assume_yes);
        Self {
            opts,
            registry: DependencyRegistry::new(),
            fetchers,
            gate,
            stats: CoordinatorStats::default(),
        }
    }

    /// Replace the fetch handlers.
    #[must_use]
    pub fn with_fetchers(mut self, fetchers: FetcherRegistry) -> Self {
        self.fetchers = fetchers;
        self
    }

    /// Replace the confirmation gate.
    #[must_use]
    pub fn with_gate(mut self, gate: ConfirmationGate) -> Self {
        self.gate = gate;
        self
    }

    /// Options this engine runs with.
    #[must_use]
    pub const fn options(&self) -> &EngineOptions {
        &self.opts
    }

    /// Dependencies registered so far.
    #[must_use]
    pub const fn registry(&self) -> &DependencyRegistry {
        &self.registry
    }

    /// Job accounting of the last run.
    #[must_use]
    pub const fn stats(&self) -> CoordinatorStats {
        self.stats
    }

    /// Run the engine.
    ///
    /// # Errors
    ///
    /// - [`FetchdepError::MissingConfiguration`] for an explicit
    ///   configuration that does not exist
    /// - any configuration error met while resolving, including nested
    ///   configurations discovered mid-run
    /// - [`FetchdepError::WorkerPool`] if a worker faults
    pub async fn run(&mut self) -> Result<RunOutcome> {
        tracing::info!("detecting configuration...");

        let conf_point = match &self.opts.conf_point {
            Some(path) if !path.exists() => {
                return Err(FetchdepError::MissingConfiguration {
                    path: path.display().to_string(),
                }
                .into());
            }
            Some(path) => path.clone(),
            None => {
                let Some(found) = find_configuration(&self.opts.target_dir()) else {
                    if self.opts.required {
                        console::error("no configuration");
                        return Ok(RunOutcome::Failed(FailureReason::NoConfiguration));
                    }
                    console::log("no configuration");
                    return Ok(RunOutcome::Complete);
                };
                found
            }
        };

        let filter = self.opts.tag_filter()?;
        let work_dir = self.opts.work_dir();
        let resolver = GraphResolver::new(&work_dir, self.opts.recursive, filter.clone());
        resolver.process(&mut self.registry, &conf_point)?;

        if self.opts.dump_state {
            for line in self.state_report(&work_dir, &filter) {
                console::log(line);
            }
            return Ok(RunOutcome::Complete);
        }

        let missing: Vec<String> = self
            .registry
            .iter()
            .filter(|dep| !dep.target_dir(&work_dir).exists())
            .map(|dep| dep.name.clone())
            .collect();

        let unknown_tags: Vec<&str> =
            filter.selected.difference(self.registry.tags()).map(String::as_str).collect();
        if !unknown_tags.is_empty() {
            console::warn(format!("unknown tags: {}", unknown_tags.join(", ")));
        }

        if missing.is_empty() {
            console::success("no missing dependencies");
            return Ok(RunOutcome::Complete);
        }

        let outcome = self.schedule(&resolver, &work_dir, missing).await?;
        match outcome {
            RunOutcome::Complete => console::success("all dependencies prepared"),
            RunOutcome::Partial => console::warn("not all dependencies prepared"),
            RunOutcome::Failed(_) => {}
        }
        Ok(outcome)
    }

    async fn schedule(
        &mut self,
        resolver: &GraphResolver,
        work_dir: &Path,
        missing: Vec<String>,
    ) -> Result<RunOutcome> {
        let mut coordinator = Coordinator::new(self.opts.skip_missing);
        let mut pool = WorkerPool::new(self.opts.workers());
        tracing::debug!("starting worker pool ({})", pool.size());

        let settings = WorkerSettings {
            dry_run: self.opts.dry_run,
            recursive: self.opts.recursive,
            buffered: pool.size() > 1,
        };

        let result = self.rounds(resolver, work_dir, missing, &mut coordinator, &mut pool, settings).await;

        let outcome = match result {
            Ok(outcome) => {
                tracing::debug!("waiting for worker pool to complete");
                pool.close();
                let joined = pool.join_all().await;
                coordinator.settle();
                self.stats = coordinator.stats();
                joined?;
                outcome
            }
            Err(e) => {
                tracing::debug!("signalling worker pool to stop");
                pool.cancel_all().await;
                coordinator.settle();
                self.stats = coordinator.stats();
                return Err(e);
            }
        };

        Ok(outcome)
    }

    async fn rounds(
        &mut self,
        resolver: &GraphResolver,
        work_dir: &Path,
        mut missing: Vec<String>,
        coordinator: &mut Coordinator,
        pool: &mut WorkerPool,
        settings: WorkerSettings,
    ) -> Result<RunOutcome> {
        let mut partial = false;

        while !missing.is_empty() {
            if !self.gate.authorize(missing.len()).await? {
                console::error("Stopping due to request limit.");
                return Ok(RunOutcome::Failed(FailureReason::RequestLimit));
            }

            for name in missing.drain(..) {
                let Some(dep) = self.registry.get(&name) else {
                    continue;
                };
                let job = self.fetchers.prepare(dep, work_dir)?;

                tracing::debug!("queuing dependency: {name}");
                pool.submit(run_job(job, settings, coordinator.sender()))?;
                coordinator.mark_queued();

                // surfaces a worker that faulted straight away
                pool.probe()?;
            }

            tracing::debug!("waiting for dependencies to be fetched");
            let mut discovered: Vec<PathBuf> = Vec::new();
            while let Some(path) = coordinator.await_next().await {
                discovered.push(path);
            }
            pool.probe()?;

            if coordinator.failure() {
                partial = true;
                if !self.opts.skip_missing {
                    tracing::debug!("stop processing due to detected failure");
                    return Ok(RunOutcome::Failed(FailureReason::FetchFailed));
                }
            }

            if self.opts.recursive {
                for config in discovered {
                    tracing::debug!("checking for new dependencies in: {}", config.display());
                    let resolution = resolver.process(&mut self.registry, &config)?;
                    missing.extend(resolution.registered.into_iter().filter(|name| {
                        self.registry.get(name).is_some_and(|dep| !dep.target_dir(work_dir).exists())
                    }));
                }
            }
        }

        tracing::debug!("dependency processing has completed");
        Ok(if partial { RunOutcome::Partial } else { RunOutcome::Complete })
    }

    fn state_report(&self, work_dir: &Path, filter: &TagFilter) -> Vec<String> {
        let mut lines = vec![
            format!("fetchdep {}", env!("CARGO_PKG_VERSION")),
            format!(
                "Tool: {}",
                std::env::current_exe().map_or_else(|_| "unknown".to_string(), |p| p.display().to_string())
            ),
            format!("Target container: {}", work_dir.display()),
        ];

        if !filter.all {
            let unused: Vec<&str> =
                self.registry.tags().difference(&filter.selected).map(String::as_str).collect();
            if !unused.is_empty() {
                lines.push(format!("Unused tags: {}", unused.join(", ")));
            }
        }

        if self.registry.is_empty() {
            lines.push("No detected dependencies.".to_string());
            return lines;
        }

        lines.push("Detected dependencies:".to_string());
        for dep in self.registry.iter() {
            let state = if dep.target_dir(work_dir).exists() { "" } else { " (pending)" };
            let tags = if dep.tags.is_empty() {
                "(none)".to_string()
            } else {
                dep.tags.iter().map(String::as_str).collect::<Vec<_>>().join(",")
            };
            lines.push(format!("  {}{state}", dep.name));
            lines.push(format!("    Site: {}", dep.site));
            lines.push(format!("    Type: {}", dep.vcs));
            lines.push(format!("    Tags: {tags}"));
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::VcsKind;
    use crate::fetch::{FetchOptions, FetchOutput, Fetcher};
    use futures::FutureExt;
    use futures::future::BoxFuture;
    use std::fs;
    use tempfile::TempDir;

    fn project(temp: &TempDir, config: &str) -> EngineOptions {
        let target = temp.path().join("project");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("fetchdep.yml"), config).unwrap();

        EngineOptions {
            target_dir: Some(target),
            work_dir: Some(temp.path().to_path_buf()),
            assume_yes: Some(false),
            ..EngineOptions::default()
        }
    }

    struct Panicking;

    impl Fetcher for Panicking {
        fn fetch<'a>(&'a self, _: &'a FetchOptions, _: &'a mut FetchOutput) -> BoxFuture<'a, bool> {
            async move { panic!("simulated panic") }.boxed()
        }
    }

    #[test]
    fn test_outcome_success() {
        assert!(RunOutcome::Complete.is_success());
        assert!(RunOutcome::Partial.is_success());
        assert!(!RunOutcome::Failed(FailureReason::FetchFailed).is_success());
    }

    #[tokio::test]
    async fn test_missing_explicit_configuration() {
        let temp = TempDir::new().unwrap();
        let opts = EngineOptions {
            conf_point: Some(temp.path().join("nope.yml")),
            ..project(&temp, "fetchdep:\n")
        };

        let err = Engine::new(opts).run().await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FetchdepError>(),
            Some(FetchdepError::MissingConfiguration { .. })
        ));
    }

    #[tokio::test]
    async fn test_no_configuration() {
        let temp = TempDir::new().unwrap();
        let opts = EngineOptions {
            target_dir: Some(temp.path().to_path_buf()),
            ..EngineOptions::default()
        };
        assert_eq!(Engine::new(opts.clone()).run().await.unwrap(), RunOutcome::Complete);

        let required = EngineOptions {
            required: true,
            ..opts
        };
        assert_eq!(
            Engine::new(required).run().await.unwrap(),
            RunOutcome::Failed(FailureReason::NoConfiguration)
        );
    }

    #[tokio::test]
    async fn test_fetches_missing_dependencies() {
        let temp = TempDir::new().unwrap();
        let opts = project(&temp, "fetchdep:\n  - name: one\n    site: mkdir\n  - name: two\n    site: mkdir\n");

        let mut engine = Engine::new(opts);
        assert_eq!(engine.run().await.unwrap(), RunOutcome::Complete);
        assert!(temp.path().join("one").is_dir());
        assert!(temp.path().join("two").is_dir());

        let stats = engine.stats();
        assert_eq!(stats.queued, 2);
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.pending, 0);
    }

    #[tokio::test]
    async fn test_existing_dependencies_are_not_fetched() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("one")).unwrap();
        let opts = project(&temp, "fetchdep:\n  - name: one\n    site: git+file:///nowhere\n");

        let mut engine = Engine::new(opts);
        assert_eq!(engine.run().await.unwrap(), RunOutcome::Complete);
        assert_eq!(engine.stats().queued, 0);
    }

    #[tokio::test]
    async fn test_state_dump_fetches_nothing() {
        let temp = TempDir::new().unwrap();
        let opts = EngineOptions {
            dump_state: true,
            ..project(
                &temp,
                "fetchdep:\n  - name: one\n    site: mkdir\n  - name: two\n    site: mkdir\n    tags: [extra]\n",
            )
        };

        let mut engine = Engine::new(opts);
        assert_eq!(engine.run().await.unwrap(), RunOutcome::Complete);
        assert_eq!(engine.registry().entries(), ["one"]);
        assert!(!temp.path().join("one").exists());

        let report = engine.state_report(temp.path(), &TagFilter::default());
        assert!(report.contains(&"Unused tags: extra".to_string()));
        assert!(report.contains(&"  one (pending)".to_string()));
        assert!(report.contains(&"    Type: mkdir".to_string()));
        assert!(report.contains(&"    Tags: (none)".to_string()));
    }

    #[tokio::test]
    async fn test_worker_fault_propagates() {
        let temp = TempDir::new().unwrap();
        let opts = project(&temp, "fetchdep:\n  - name: boom\n    site: mkdir\n");

        let mut fetchers = FetcherRegistry::empty();
        fetchers.register(VcsKind::Mkdir, Arc::new(Panicking));

        let mut engine = Engine::new(opts).with_fetchers(fetchers);
        let err = engine.run().await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FetchdepError>(),
            Some(FetchdepError::WorkerPool { .. })
        ));
        assert_eq!(engine.stats().pending, 0);
    }

    #[tokio::test]
    async fn test_unimplemented_kind_is_fatal() {
        let temp = TempDir::new().unwrap();
        let opts = project(&temp, "fetchdep:\n  - name: one\n    site: mkdir\n");

        let err = Engine::new(opts).with_fetchers(FetcherRegistry::empty()).run().await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FetchdepError>(),
            Some(FetchdepError::FetchNotImplemented { .. })
        ));
    }

    #[tokio::test]
    async fn test_cancelled_round_balances_pending_jobs() {
        let temp = TempDir::new().unwrap();
        let opts = project(
            &temp,
            "fetchdep:\n  - name: a\n    site: mkdir\n  - name: b\n    site: mkdir\n  - name: c\n    site: git+file:///x\n",
        );

        let mut fetchers = FetcherRegistry::empty();
        fetchers.register(VcsKind::Mkdir, Arc::new(crate::fetch::mkdir::MkdirFetcher));

        let mut engine = Engine::new(opts).with_fetchers(fetchers);
        let err = engine.run().await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FetchdepError>(),
            Some(FetchdepError::FetchNotImplemented { .. })
        ));

        let stats = engine.stats();
        assert_eq!(stats.queued, 2);
        assert_eq!(stats.completed + stats.failed, 2);
        assert_eq!(stats.pending, 0);
    }
}
