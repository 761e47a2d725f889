//! Host tool detection.
//!
//! Fetch handlers delegate the actual checkout to version control tools
//! installed on the host. A [`HostTool`] describes one such tool: its
//! executable name and the environment adjustments every invocation needs.
//! The [`ToolRegistry`] locates tools (honouring `FETCHDEP_<TOOL>` overrides)
//! and remembers the outcome, so each tool is searched for at most once per
//! registry.
//!
//! A registry is built once per engine and shared by all handlers through an
//! `Arc`.

pub mod command;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use crate::constants::TOOL_OVERRIDE_ENV_PREFIX;
use crate::core::FetchdepError;
use command::ToolCommand;

/// Description of a host tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostTool {
    /// Executable name searched on `PATH`
    pub name: &'static str,
    /// Environment variables removed from every invocation
    pub sanitize: &'static [&'static str],
    /// Environment variables set on every invocation
    pub include: &'static [(&'static str, &'static str)],
}

impl HostTool {
    /// Environment variable that overrides this tool's executable.
    #[must_use]
    pub fn override_var(&self) -> String {
        format!("{TOOL_OVERRIDE_ENV_PREFIX}{}", self.name.to_uppercase())
    }
}

/// Git; repository-locating variables are cleared so a clone started from
/// inside another repository (a hook, for instance) is not redirected.
pub const GIT: HostTool = HostTool {
    name: "git",
    sanitize: &[
        "GIT_ALTERNATE_OBJECT_DIRECTORIES",
        "GIT_DIR",
        "GIT_INDEX_FILE",
        "GIT_OBJECT_DIRECTORY",
        "GIT_WORK_TREE",
    ],
    include: &[],
};

/// Mercurial.
pub const HG: HostTool = HostTool {
    name: "hg",
    sanitize: &[],
    include: &[("PYTHONUNBUFFERED", "1")],
};

/// Subversion.
pub const SVN: HostTool = HostTool {
    name: "svn",
    sanitize: &[],
    include: &[],
};

/// CVS.
pub const CVS: HostTool = HostTool {
    name: "cvs",
    sanitize: &["CVSIGNORE", "CVSREAD", "CVSUMASK", "CVSWRAPPERS", "CVS_SERVER"],
    include: &[],
};

/// Locates host tools and caches the result.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    detected: Mutex<HashMap<String, Option<PathBuf>>>,
}

impl ToolRegistry {
    /// Create an empty registry; nothing is detected until first use.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the location of a tool (or its absence) without searching.
    pub fn register(&self, name: &str, path: Option<PathBuf>) {
        self.detected.lock().unwrap_or_else(PoisonError::into_inner).insert(name.to_string(), path);
    }

    /// Locate a tool.
    ///
    /// `FETCHDEP_<TOOL>` takes precedence over the tool name; either is
    /// resolved with [`which::which`]. The outcome, found or not, is cached.
    pub fn detect(&self, tool: &HostTool) -> Option<PathBuf> {
        let mut detected = self.detected.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cached) = detected.get(tool.name) {
            return cached.clone();
        }

        let candidate = std::env::var_os(tool.override_var())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| tool.name.into());

        let found = which::which(&candidate).ok();
        match &found {
            Some(path) => tracing::debug!("{} tool detected: {}", tool.name, path.display()),
            None => tracing::debug!("{} tool not detected", tool.name),
        }

        detected.insert(tool.name.to_string(), found.clone());
        found
    }

    /// Build a command for a tool, with its environment adjustments applied.
    ///
    /// # Errors
    ///
    /// [`FetchdepError::ToolNotFound`] if the tool cannot be located.
    pub fn command(&self, tool: &HostTool) -> Result<ToolCommand, FetchdepError> {
        let program = self.detect(tool).ok_or_else(|| FetchdepError::ToolNotFound {
            tool: tool.name.to_string(),
        })?;

        let mut command = ToolCommand::new(tool.name, program);
        for (key, value) in tool.include {
            command = command.env(*key, *value);
        }
        for key in tool.sanitize {
            command = command.env_remove(*key);
        }
        Ok(command)
    }
}
