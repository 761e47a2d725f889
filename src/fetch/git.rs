//! Git fetch handler: `git clone <site> --progress <target>`.

use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;

use super::{FetchOptions, FetchOutput, Fetcher, run_tool};
use crate::tool::{GIT, ToolRegistry};

/// Clones git repositories.
#[derive(Debug, Clone)]
pub struct GitFetcher {
    tools: Arc<ToolRegistry>,
}

impl GitFetcher {
    /// Create a handler using the shared tool registry.
    pub const fn new(tools: Arc<ToolRegistry>) -> Self {
        Self {
            tools,
        }
    }
}

impl Fetcher for GitFetcher {
    fn fetch<'a>(&'a self, opts: &'a FetchOptions, out: &'a mut FetchOutput) -> BoxFuture<'a, bool> {
        async move {
            let Ok(command) = self.tools.command(&GIT) else {
                out.error("unable to fetch package; git is not installed");
                return false;
            };

            out.note(format!("fetching {}...", opts.name));

            let command = command
                .args(["clone", opts.site.as_str(), "--progress"])
                .arg(opts.target_dir.display().to_string());
            run_tool(command, opts, out, "unable to clone git repository").await
        }
        .boxed()
    }
}
