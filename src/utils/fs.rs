//! File system helpers shared by the fetch handlers and the resolver.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Ensures a directory exists, creating it and any missing parents.
///
/// # Errors
///
/// Fails when the directory cannot be created or when the path exists but
/// is not a directory.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("unable to create directory: {}", path.display()))?;
    } else if !path.is_dir() {
        return Err(anyhow::anyhow!("path exists but is not a directory: {}", path.display()));
    }
    Ok(())
}
