//! Execution of a single fetch job.
//!
//! A worker runs one [`FetchJob`] and reports its outcome through an
//! [`EventSender`]: output to relay first, then exactly one completion or
//! failure. The report is guaranteed even if the job panics or is aborted,
//! so the coordinator's pending count always balances.

use std::future::Future;
use std::path::PathBuf;

use crate::config::find_configuration;
use crate::fetch::{FetchJob, FetchOptions, FetchOutput};
use crate::utils::console;

use super::coordinator::EventSender;

/// Run-wide settings every worker needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerSettings {
    /// Log instead of fetching
    pub dry_run: bool,
    /// Look for nested configurations after a successful fetch
    pub recursive: bool,
    /// Buffer handler output and relay it in one block
    pub buffered: bool,
}

/// Reports a job's outcome exactly once; a job that ends without reporting
/// (panic or abort) is reported as failed.
struct Report {
    events: EventSender,
    name: String,
    reported: bool,
}

impl Report {
    fn complete(mut self, discovered: Option<PathBuf>) {
        self.reported = true;
        self.events.mark_complete(&self.name, discovered);
    }

    fn fail(mut self) {
        self.reported = true;
        self.events.mark_failed(&self.name);
    }
}

impl Drop for Report {
    fn drop(&mut self) {
        if !self.reported {
            self.events.mark_failed(&self.name);
        }
    }
}

/// Fetch one dependency and report the outcome.
///
/// The report guard is taken before the returned future exists, so a job
/// that is dropped without ever being polled (cancelled while waiting for a
/// worker slot) is still reported as failed.
pub fn run_job(
    job: FetchJob,
    settings: WorkerSettings,
    events: EventSender,
) -> impl Future<Output = ()> + Send + 'static {
    let report = Report {
        events: events.clone(),
        name: job.dependency.name.clone(),
        reported: false,
    };

    async move {
        let dep = &job.dependency;

        let fetched = if settings.dry_run {
            let line = format!("[dry-run] perform fetch of site ({}: {}): {}", dep.name, dep.vcs, dep.site);
            if settings.buffered {
                events.post_message(line);
            } else {
                console::log(line);
            }
            true
        } else {
            let opts = FetchOptions::new(dep, &job.target_dir);
            let mut out = FetchOutput::new(settings.buffered);

            if settings.buffered {
                events.post_message(format!("[parallel] started: {}", dep.name));
            }

            let fetched = job.fetcher.fetch(&opts, &mut out).await;

            if let Some(output) = out.into_message() {
                events.post_message(format!("[parallel] output: {}\n{output}", dep.name));
            }
            fetched
        };

        if fetched {
            let discovered = if settings.recursive && dep.recursive {
                find_configuration(&job.target_dir)
            } else {
                None
            };
            report.complete(discovered);
        } else {
            report.fail();
        }
    }
}
