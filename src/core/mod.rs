//! Core types for fetchdep
//!
//! Currently this is the error system: [`FetchdepError`] for typed failures
//! inside the crate and [`ErrorContext`] / [`user_friendly_error`] for what
//! the CLI shows a user when a run aborts.

pub mod error;

pub use error::{ErrorContext, FetchdepError, user_friendly_error};
