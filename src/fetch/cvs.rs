//! CVS fetch handler.
//!
//! A CVS site names both the repository root and the module to check out,
//! separated by the last space:
//!
//! ```text
//! :pserver:anonymous@cvs.example.com:/var/lib/cvsroot mymodule
//! ```
//!
//! CVS cannot check out into an arbitrary path, so the handler creates the
//! target's parent directory and runs `cvs -d <root> checkout -d <basename>
//! <module>` from inside it.

use std::path::Path;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;

use super::{FetchOptions, FetchOutput, Fetcher, run_tool};
use crate::tool::{CVS, ToolRegistry};
use crate::utils::ensure_dir;

/// Checks out CVS modules.
#[derive(Debug, Clone)]
pub struct CvsFetcher {
    tools: Arc<ToolRegistry>,
}

impl CvsFetcher {
    /// Create a handler using the shared tool registry.
    pub const fn new(tools: Arc<ToolRegistry>) -> Self {
        Self {
            tools,
        }
    }
}

/// Split a CVS site into its repository root and module.
fn split_site(site: &str) -> Option<(&str, &str)> {
    site.rsplit_once(' ').filter(|(root, module)| !root.trim().is_empty() && !module.is_empty())
}

impl Fetcher for CvsFetcher {
    fn fetch<'a>(&'a self, opts: &'a FetchOptions, out: &'a mut FetchOutput) -> BoxFuture<'a, bool> {
        async move {
            let Ok(command) = self.tools.command(&CVS) else {
                out.error("unable to fetch package; cvs is not installed");
                return false;
            };

            out.note(format!("fetching {}...", opts.name));

            let Some((cvsroot, module)) = split_site(&opts.site) else {
                out.error(format!(
                    "improper cvs site defined\n\n\
                     The provided CVS site does not define both the CVSROOT as well as the target\n\
                     module to checkout. For example:\n\n    \
                     :pserver:anonymous@cvs.example.com:/var/lib/cvsroot mymodule\n\n Site: {}",
                    opts.site
                ));
                return false;
            };

            let container_dir = opts.target_dir.parent().unwrap_or_else(|| Path::new("."));
            let Some(basename) = opts.target_dir.file_name() else {
                out.error(format!("invalid target directory: {}", opts.target_dir.display()));
                return false;
            };

            tracing::info!("({}) preparing container directory", opts.name);
            if let Err(e) = ensure_dir(container_dir) {
                out.error(format!("{e:#}"));
                return false;
            }

            let command = command
                .args(["-d", cvsroot.trim_end(), "checkout", "-d"])
                .arg(basename.to_string_lossy())
                .arg(module)
                .current_dir(container_dir);
            run_tool(command, opts, out, "unable to checkout module").await
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[test]
    fn test_split_site() {
        assert_eq!(
            split_site(":pserver:anonymous@cvs.example.com:/var/lib/cvsroot mymodule"),
            Some((":pserver:anonymous@cvs.example.com:/var/lib/cvsroot", "mymodule"))
        );
        assert_eq!(split_site(":ext:me@host:/root  spaced"), Some((":ext:me@host:/root ", "spaced")));
        assert_eq!(split_site(":pserver:anonymous@cvs.example.com:/var/lib/cvsroot"), None);
        assert_eq!(split_site(":pserver:host:/root "), None);
    }

    #[tokio::test]
    async fn test_improper_site() {
        let tools = Arc::new(ToolRegistry::new());
        tools.register("cvs", Some("/usr/bin/cvs".into()));

        let temp = TempDir::new().unwrap();
        let opts = FetchOptions {
            name: "module".to_string(),
            site: ":pserver:anonymous@cvs.example.com:/var/lib/cvsroot".to_string(),
            target_dir: temp.path().join("module"),
            extra: BTreeMap::new(),
        };
        let mut out = FetchOutput::new(true);

        assert!(!CvsFetcher::new(tools).fetch(&opts, &mut out).await);
        assert!(out.into_message().unwrap().contains("improper cvs site defined"));
        assert!(!opts.target_dir.exists());
    }

    #[tokio::test]
    async fn test_missing_tool_fails() {
        let tools = Arc::new(ToolRegistry::new());
        tools.register("cvs", None);

        let opts = FetchOptions {
            name: "module".to_string(),
            site: ":pserver:anonymous@cvs.example.com:/var/lib/cvsroot mymodule".to_string(),
            target_dir: "/nonexistent/module".into(),
            extra: BTreeMap::new(),
        };
        let mut out = FetchOutput::new(true);

        assert!(!CvsFetcher::new(tools).fetch(&opts, &mut out).await);
        assert!(out.into_message().unwrap().contains("cvs is not installed"));
    }
}
