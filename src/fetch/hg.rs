//! Mercurial fetch handler: `hg --verbose clone <site> <target>`.

use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;

use super::{FetchOptions, FetchOutput, Fetcher, run_tool};
use crate::tool::{HG, ToolRegistry};

/// Clones Mercurial repositories.
#[derive(Debug, Clone)]
pub struct HgFetcher {
    tools: Arc<ToolRegistry>,
}

impl HgFetcher {
    /// Create a handler using the shared tool registry.
    pub const fn new(tools: Arc<ToolRegistry>) -> Self {
        Self {
            tools,
        }
    }
}

impl Fetcher for HgFetcher {
    fn fetch<'a>(&'a self, opts: &'a FetchOptions, out: &'a mut FetchOutput) -> BoxFuture<'a, bool> {
        async move {
            let Ok(command) = self.tools.command(&HG) else {
                out.error("unable to fetch package; hg is not installed");
                return false;
            };

            out.note(format!("fetching {}...", opts.name));

            let command = command
                .args(["--verbose", "clone", opts.site.as_str()])
                .arg(opts.target_dir.display().to_string());
            run_tool(command, opts, out, "unable to clone mercurial repository").await
        }
        .boxed()
    }
}
