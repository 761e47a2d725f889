//! Error handling for fetchdep
//!
//! This module provides the typed error enum used across the crate and the
//! user-facing wrapper the CLI prints when a run aborts. Two principles apply:
//! 1. **Strongly-typed errors** so callers (and tests) can match on the
//!    precise configuration mistake that stopped a run
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Error Categories
//!
//! - **Configuration**: [`FetchdepError::MissingConfiguration`],
//!   [`FetchdepError::MissingName`], [`FetchdepError::UnknownVcsType`], etc.
//!   These are authoring mistakes: they abort the run before any fetch work
//!   is dispatched and are never retried.
//! - **Host tools**: [`FetchdepError::ToolNotFound`],
//!   [`FetchdepError::ToolCommandFailed`]. Fetch handlers translate these into
//!   a failed fetch rather than propagating them.
//! - **Scheduling**: [`FetchdepError::WorkerPool`] for faults inside the
//!   worker pool itself.
//!
//! Fetch failures are deliberately *not* represented here; a handler that
//! cannot fetch returns `false` and the scheduler records it.
//!
//! # Examples
//!
//! ```rust,no_run
//! use fetchdep::core::{FetchdepError, user_friendly_error};
//!
//! let error = FetchdepError::MissingSite {
//!     config: "fetchdep.yml".into(),
//!     name: "libfoo".into(),
//! };
//! let context = user_friendly_error(anyhow::Error::from(error));
//! context.display(); // Shows a coloured error with a suggestion
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for fetchdep operations
#[derive(Error, Debug)]
pub enum FetchdepError {
    /// An explicitly requested configuration file does not exist
    #[error("missing configuration file: {path}")]
    MissingConfiguration {
        /// The path that was requested
        path: String,
    },

    /// A configuration file could not be read or parsed as YAML
    #[error("unable to load configuration file: {path}")]
    ConfigurationLoad {
        /// The configuration file path
        path: String,
        /// The underlying read or parse failure
        reason: String,
    },

    /// A configuration file parsed but does not describe fetchdep dependencies
    #[error("invalid fetchdep configuration: {path}")]
    InvalidConfiguration {
        /// The configuration file path
        path: String,
    },

    /// A dependency entry has no `name`
    #[error("missing configuration entry name in {config}")]
    MissingName {
        /// The configuration file defining the entry
        config: String,
    },

    /// A dependency entry has no `site`
    #[error("missing configuration entry site for '{name}' in {config}")]
    MissingSite {
        /// The configuration file defining the entry
        config: String,
        /// The dependency name
        name: String,
    },

    /// A dependency name cannot be used as a directory name
    #[error("invalid dependency name '{name}' in {config}: {reason}")]
    InvalidName {
        /// The configuration file defining the entry
        config: String,
        /// The rejected name
        name: String,
        /// Why the name was rejected
        reason: String,
    },

    /// A dependency tag is malformed
    #[error("invalid tag '{tag}' in {config}: {reason}")]
    InvalidTag {
        /// The configuration file defining the entry
        config: String,
        /// The rejected tag
        tag: String,
        /// Why the tag was rejected
        reason: String,
    },

    /// A `recursive` option holds something other than a yes/no value
    #[error("invalid recursive option for '{name}' in {config}: {value}")]
    InvalidRecursive {
        /// The configuration file defining the entry
        config: String,
        /// The dependency name
        name: String,
        /// The rejected value
        value: String,
    },

    /// The version control system of a site could not be determined
    #[error("unknown vcs type for '{name}' in {config}: {site}")]
    UnknownVcsType {
        /// The configuration file defining the entry
        config: String,
        /// The dependency name
        name: String,
        /// The site value that could not be classified
        site: String,
    },

    /// No fetch handler is registered for a version control kind
    #[error("fetch type is not implemented: {kind}")]
    FetchNotImplemented {
        /// The version control kind
        kind: String,
    },

    /// A host tool is not installed
    #[error("{tool} is not installed or not found in PATH")]
    ToolNotFound {
        /// The tool executable name
        tool: String,
    },

    /// A host tool ran but reported failure
    #[error("{tool} {operation} failed")]
    ToolCommandFailed {
        /// The tool executable name
        tool: String,
        /// The sub-command (for example "clone")
        operation: String,
        /// Combined output of the failed command
        output: String,
    },

    /// The worker pool faulted (a worker panicked or could not be joined)
    #[error("worker pool failure: {message}")]
    WorkerPool {
        /// Description of the fault
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error for cases not covered by specific variants
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

impl FetchdepError {
    /// Whether this error is a configuration-authoring mistake.
    #[must_use]
    pub const fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::MissingConfiguration { .. }
                | Self::ConfigurationLoad { .. }
                | Self::InvalidConfiguration { .. }
                | Self::MissingName { .. }
                | Self::MissingSite { .. }
                | Self::InvalidName { .. }
                | Self::InvalidTag { .. }
                | Self::InvalidRecursive { .. }
                | Self::UnknownVcsType { .. }
                | Self::FetchNotImplemented { .. }
        )
    }
}

/// Error context wrapper that provides user-friendly error information
///
/// Pairs a [`FetchdepError`] with optional details and a suggestion. The CLI
/// prints it with [`ErrorContext::display`]; `Display` renders the same
/// content without colours for logs and tests.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: FetchdepError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: FetchdepError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors
    ///
    /// - Error message: Red and bold
    /// - Details: Yellow
    /// - Suggestion: Green
    pub fn display(&self) {
        crate::utils::console::flush_stdout();
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error to a user-friendly [`ErrorContext`] with actionable suggestions
///
/// Recognises [`FetchdepError`] variants (anywhere in the error chain) and
/// [`std::io::Error`]; anything else is reported with its full cause chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    for cause in error.chain() {
        if let Some(fetchdep_error) = cause.downcast_ref::<FetchdepError>() {
            return create_error_context(fetchdep_error);
        }
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        if io_error.kind() == std::io::ErrorKind::PermissionDenied {
            return ErrorContext::new(FetchdepError::Other {
                message: io_error.to_string(),
            })
            .with_suggestion("Check the permissions of the work directory and its parents");
        }
    }

    let mut message = error.to_string();
    let chain: Vec<String> = error.chain().skip(1).map(ToString::to_string).collect();
    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(FetchdepError::Other {
        message,
    })
}

fn create_error_context(error: &FetchdepError) -> ErrorContext {
    let context = ErrorContext::new(clone_error(error));
    match error {
        FetchdepError::MissingConfiguration { path } => context
            .with_details(format!(
                "The configuration file cannot be found:\n\n    {path}"
            ))
            .with_suggestion(
                "Ensure the configuration file exists in the target directory or pass the correct path with --config",
            ),
        FetchdepError::ConfigurationLoad { reason, .. } => context
            .with_details(reason.clone())
            .with_suggestion("Check the YAML syntax of the configuration file"),
        FetchdepError::InvalidConfiguration { .. } => context.with_suggestion(
            "A configuration file must define its dependencies under a top-level `fetchdep` key",
        ),
        FetchdepError::MissingName { config } => context
            .with_details(format!(
                "A configuration file defines a dependency entry without a name.\n\n  Configuration: {config}"
            ))
            .with_suggestion("Ensure each dependency entry has a `name` option set"),
        FetchdepError::MissingSite { config, name } => context
            .with_details(format!(
                "A configuration file defines a dependency entry without a site.\n\n  Configuration: {config}\n           Name: {name}"
            ))
            .with_suggestion("Ensure each dependency entry has a `site` option set"),
        FetchdepError::InvalidName { .. } => context.with_suggestion(
            "Dependency names become directory names; avoid path separators, quotes and reserved device names",
        ),
        FetchdepError::InvalidTag { .. } => {
            context.with_suggestion("Tags must be non-empty and must not contain whitespace")
        }
        FetchdepError::InvalidRecursive { .. } => context
            .with_suggestion("Set `recursive` to true or false (yes/no, on/off and 1/0 are accepted too)"),
        FetchdepError::UnknownVcsType { config, name, site } => context
            .with_details(format!(
                "A VCS type cannot be determined from the site value.\n\n  Configuration: {config}\n           Name: {name}\n           Site: {site}"
            ))
            .with_suggestion(
                "Prefix the site with its type (cvs+, git+, hg+ or svn+) or use a URL ending in .git",
            ),
        FetchdepError::ToolNotFound { tool } => {
            context.with_suggestion(format!("Install {tool} or point FETCHDEP_{} at it", tool.to_uppercase()))
        }
        _ => context,
    }
}

// `std::io::Error` is not `Clone`; rebuild the variant by kind and message.
fn clone_error(error: &FetchdepError) -> FetchdepError {
    match error {
        FetchdepError::MissingConfiguration { path } => FetchdepError::MissingConfiguration {
            path: path.clone(),
        },
        FetchdepError::ConfigurationLoad { path, reason } => FetchdepError::ConfigurationLoad {
            path: path.clone(),
            reason: reason.clone(),
        },
        FetchdepError::InvalidConfiguration { path } => FetchdepError::InvalidConfiguration {
            path: path.clone(),
        },
        FetchdepError::MissingName { config } => FetchdepError::MissingName {
            config: config.clone(),
        },
        FetchdepError::MissingSite { config, name } => FetchdepError::MissingSite {
            config: config.clone(),
            name: name.clone(),
        },
        FetchdepError::InvalidName { config, name, reason } => FetchdepError::InvalidName {
            config: config.clone(),
            name: name.clone(),
            reason: reason.clone(),
        },
        FetchdepError::InvalidTag { config, tag, reason } => FetchdepError::InvalidTag {
            config: config.clone(),
            tag: tag.clone(),
            reason: reason.clone(),
        },
        FetchdepError::InvalidRecursive { config, name, value } => FetchdepError::InvalidRecursive {
            config: config.clone(),
            name: name.clone(),
            value: value.clone(),
        },
        FetchdepError::UnknownVcsType { config, name, site } => FetchdepError::UnknownVcsType {
            config: config.clone(),
            name: name.clone(),
            site: site.clone(),
        },
        FetchdepError::FetchNotImplemented { kind } => FetchdepError::FetchNotImplemented {
            kind: kind.clone(),
        },
        FetchdepError::ToolNotFound { tool } => FetchdepError::ToolNotFound {
            tool: tool.clone(),
        },
        FetchdepError::ToolCommandFailed { tool, operation, output } => {
            FetchdepError::ToolCommandFailed {
                tool: tool.clone(),
                operation: operation.clone(),
                output: output.clone(),
            }
        }
        FetchdepError::WorkerPool { message } => FetchdepError::WorkerPool {
            message: message.clone(),
        },
        FetchdepError::Io(e) => FetchdepError::Io(std::io::Error::new(e.kind(), e.to_string())),
        FetchdepError::Other { message } => FetchdepError::Other {
            message: message.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_errors_are_classified() {
        let error = FetchdepError::MissingName {
            config: "fetchdep.yml".to_string(),
        };
        assert!(error.is_configuration_error());

        let error = FetchdepError::WorkerPool {
            message: "boom".to_string(),
        };
        assert!(!error.is_configuration_error());
    }

    #[test]
    fn test_user_friendly_error_names_offending_field() {
        let error = FetchdepError::MissingSite {
            config: "deps/fetchdep.yml".to_string(),
            name: "libfoo".to_string(),
        };
        let context = user_friendly_error(anyhow::Error::from(error));

        let rendered = context.to_string();
        assert!(rendered.contains("libfoo"));
        assert!(rendered.contains("deps/fetchdep.yml"));
        assert!(rendered.contains("`site`"));
    }

    #[test]
    fn test_user_friendly_error_finds_typed_error_in_chain() {
        let error = anyhow::Error::from(FetchdepError::UnknownVcsType {
            config: "fetchdep.yml".to_string(),
            name: "thing".to_string(),
            site: "ftp://example.com/thing".to_string(),
        })
        .context("while processing nested configuration");

        let context = user_friendly_error(error);
        assert!(matches!(context.error, FetchdepError::UnknownVcsType { .. }));
        assert!(context.suggestion.is_some());
    }

    #[test]
    fn test_user_friendly_error_generic_includes_chain() {
        let error = anyhow::anyhow!("root cause").context("outer");
        let context = user_friendly_error(error);

        let rendered = context.to_string();
        assert!(rendered.contains("outer"));
        assert!(rendered.contains("Caused by:"));
        assert!(rendered.contains("root cause"));
    }
}
