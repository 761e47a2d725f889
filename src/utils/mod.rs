//! Utility helpers
//!
//! - [`console`] - Coloured user-facing status lines
//! - [`fs`] - Directory helpers
//! - [`names`] - Dependency name and tag normalisation

pub mod console;
pub mod fs;
pub mod names;

pub use fs::ensure_dir;
pub use names::{resolve_dirname, resolve_tag};
