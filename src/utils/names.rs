//! Dependency name and tag normalisation.
//!
//! Dependency names become directory names under the work directory, so they
//! must be usable on every platform fetchdep runs on. Tags are free-form labels
//! compared case-insensitively.
//!
//! Both functions are idempotent: feeding a resolved value back in returns it
//! unchanged.

use regex::Regex;
use std::sync::OnceLock;
use unicode_normalization::UnicodeNormalization;

/// Characters that may not appear in a dependency name.
const INVALID_DIRNAME_CHARS: &str = r#"["*/:'<>?\\|]"#;

/// Directory names that are reserved on at least one supported platform.
const RESTRICTED_DIRNAMES: &[&str] = &[
    ".", "..", "AUX", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8", "COM9",
    "CON", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9", "NUL", "PRN",
];

fn has_invalid_chars(value: &str) -> bool {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(INVALID_DIRNAME_CHARS).ok())
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(value))
}

/// Validate and normalise a dependency name for use as a directory name.
///
/// The name is checked for path separators and other characters that are
/// unusable in file names, NFKC-normalised and trimmed. Empty results and
/// reserved names are rejected.
///
/// # Errors
///
/// Returns a short reason string when the name cannot be used.
///
/// # Examples
///
/// ```rust
/// use fetchdep::utils::names::resolve_dirname;
///
/// assert_eq!(resolve_dirname("  libfoo ").unwrap(), "libfoo");
/// assert!(resolve_dirname("../escape").is_err());
/// assert!(resolve_dirname("CON").is_err());
/// ```
pub fn resolve_dirname(dirname: &str) -> Result<String, &'static str> {
    if dirname.is_empty() {
        return Err("empty name");
    }

    if has_invalid_chars(dirname) {
        return Err("invalid characters in name");
    }

    let normalized: String = dirname.nfkc().collect();
    let final_dirname = normalized.trim();

    if final_dirname.is_empty() {
        return Err("empty name after normalize/strip");
    }

    // NFKC can fold compatibility characters (fullwidth solidus, for example)
    // into characters that were rejected above.
    if has_invalid_chars(final_dirname) {
        return Err("invalid characters in name");
    }

    if RESTRICTED_DIRNAMES.contains(&final_dirname) {
        return Err("restricted name");
    }

    Ok(final_dirname.to_string())
}

/// Validate and normalise a tag value.
///
/// Tags are lowercased, trimmed and NFKC-normalised. A tag may not be empty
/// and may not contain whitespace.
///
/// # Errors
///
/// Returns a short reason string when the tag is invalid.
pub fn resolve_tag(tag: &str) -> Result<String, &'static str> {
    if tag.is_empty() {
        return Err("empty tag");
    }

    let lowered = tag.to_lowercase();
    let trimmed = lowered.trim();
    if trimmed.is_empty() {
        return Err("empty tag after cleanup");
    }

    let final_tag: String = trimmed.nfkc().collect();
    if final_tag.chars().any(char::is_whitespace) {
        return Err("tag using invalid characters");
    }

    Ok(final_tag)
}
