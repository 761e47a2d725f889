//! Temporary fetchdep workspaces.
//!
//! A [`TestWorkspace`] is a temporary work directory with a `project`
//! directory inside it; the project's configuration is what a run resolves
//! and every dependency lands next to the project, as it would for a real
//! checkout.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::engine::EngineOptions;

/// A temporary work directory holding a project to run fetchdep on.
pub struct TestWorkspace {
    temp: TempDir,
    target: PathBuf,
}

impl TestWorkspace {
    /// Create an empty workspace.
    pub fn new() -> Result<Self> {
        let temp = TempDir::new().context("Failed to create temporary directory")?;
        let target = temp.path().join("project");
        std::fs::create_dir_all(&target).context("Failed to create project directory")?;
        Ok(Self {
            temp,
            target,
        })
    }

    /// Where dependencies are fetched to.
    pub fn work_dir(&self) -> &Path {
        self.temp.path()
    }

    /// The project directory.
    pub fn target_dir(&self) -> &Path {
        &self.target
    }

    /// Where a dependency's working copy ends up.
    pub fn dependency_dir(&self, name: &str) -> PathBuf {
        self.work_dir().join(name)
    }

    /// Write the project's `fetchdep.yml`.
    pub fn write_config(&self, content: &str) -> Result<PathBuf> {
        let path = self.target.join("fetchdep.yml");
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    /// Write a configuration file at a path relative to the work directory.
    pub fn write_file(&self, relative: &str, content: &str) -> Result<PathBuf> {
        let path = self.work_dir().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    /// Engine options pointing at this workspace.
    ///
    /// Confirmation is preset to "no" so a test never waits on stdin.
    pub fn options(&self) -> EngineOptions {
        EngineOptions {
            target_dir: Some(self.target.clone()),
            work_dir: Some(self.work_dir().to_path_buf()),
            assume_yes: Some(false),
            ..EngineOptions::default()
        }
    }
}
