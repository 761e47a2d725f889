//! Test utilities for fetchdep
//!
//! Shared helpers for unit and integration tests: logging setup, temporary
//! workspaces with configuration writers, and local git repositories to
//! fetch from.

pub mod git_helper;
pub mod workspace;

pub use git_helper::TestGit;
pub use workspace::TestWorkspace;

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Logging is only installed when a level is given or `RUST_LOG` is set, and
/// only once per test binary.
///
/// ```bash
/// RUST_LOG=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}
