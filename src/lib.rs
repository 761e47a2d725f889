//! fetchdep - fetch the external dependencies of a project
//!
//! A project lists the source trees it depends on in a small YAML file
//! (`fetchdep.yml`, `.fetchdep.yml` or `.fetchdep`). fetchdep reads that
//! file, works out which dependencies have no working copy yet, and fetches
//! them with the matching version control tool (git, hg, svn or cvs) into a
//! shared work directory next to the project. Fetched dependencies may carry
//! configurations of their own, which fetchdep follows when recursion is
//! enabled.
//!
//! # Configuration Format
//!
//! ```yaml
//! fetchdep:
//!   - name: libfoo
//!     site: git+https://example.com/libfoo
//!   - name: docs
//!     site: hg+https://example.com/docs
//!     tags:
//!       - documentation
//!   - name: vendor
//!     site: https://example.com/vendor.git
//!     recursive: false
//! ```
//!
//! Tagged dependencies are only fetched when one of their tags is selected
//! (`--tag`) or every tag is (`--all-tags`).
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface
//! - [`config`] - Configuration discovery and loading
//! - [`constants`] - Shared constants
//! - [`core`] - Error types and user-facing error reporting
//! - [`dependency`] - Dependency records and site classification
//! - [`engine`] - Fetch scheduling, worker pool and coordination
//! - [`fetch`] - Fetch handlers per version control kind
//! - [`registry`] - Registered dependencies and seen tags
//! - [`resolver`] - Configuration graph traversal
//! - [`tool`] - Host tool detection and invocation
//! - [`utils`] - Console output, names and file system helpers

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod dependency;
pub mod engine;
pub mod fetch;
pub mod registry;
pub mod resolver;
pub mod tool;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
