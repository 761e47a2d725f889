//! Subversion fetch handler: `svn checkout <site> <target>`.

use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;

use super::{FetchOptions, FetchOutput, Fetcher, run_tool};
use crate::tool::{SVN, ToolRegistry};

/// Checks out Subversion repositories.
#[derive(Debug, Clone)]
pub struct SvnFetcher {
    tools: Arc<ToolRegistry>,
}

impl SvnFetcher {
    /// Create a handler using the shared tool registry.
    pub const fn new(tools: Arc<ToolRegistry>) -> Self {
        Self {
            tools,
        }
    }
}

impl Fetcher for SvnFetcher {
    fn fetch<'a>(&'a self, opts: &'a FetchOptions, out: &'a mut FetchOutput) -> BoxFuture<'a, bool> {
        async move {
            let Ok(command) = self.tools.command(&SVN) else {
                out.error("unable to fetch package; svn is not installed");
                return false;
            };

            out.note(format!("fetching {}...", opts.name));

            let command = command
                .args(["checkout", opts.site.as_str()])
                .arg(opts.target_dir.display().to_string());
            run_tool(command, opts, out, "unable to checkout module").await
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn test_missing_tool_fails() {
        let tools = Arc::new(ToolRegistry::new());
        tools.register("svn", None);

        let opts = FetchOptions {
            name: "test".to_string(),
            site: "https://example.com/repo/trunk".to_string(),
            target_dir: "/nonexistent/test".into(),
            extra: BTreeMap::new(),
        };
        let mut out = FetchOutput::new(true);

        assert!(!SvnFetcher::new(tools).fetch(&opts, &mut out).await);
        assert!(out.into_message().unwrap().contains("svn is not installed"));
    }
}
