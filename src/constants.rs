//! Global constants used throughout the fetchdep codebase.
//!
//! Configuration keys, recognised configuration filenames and the policy
//! numbers used by the fetch scheduler live here so they are discoverable in
//! one place.

/// Root key every fetchdep configuration document must carry.
pub const CONFIG_BASE_KEY: &str = "fetchdep";

/// Configuration key for a dependency's name.
pub const CONFIG_NAME_KEY: &str = "name";

/// Configuration key for a dependency's recursive flag.
pub const CONFIG_RECURSIVE_KEY: &str = "recursive";

/// Configuration key for the site (source locator) of a dependency.
pub const CONFIG_SITE_KEY: &str = "site";

/// Configuration key for the tags associated to a dependency.
pub const CONFIG_TAGS_KEY: &str = "tags";

/// Recognised configuration filenames, in lookup order.
pub const SUPPORTED_CONFIG_NAMES: [&str; 3] = [".fetchdep", ".fetchdep.yml", "fetchdep.yml"];

/// Number of cumulative fetch requests that may be queued before the user
/// must explicitly authorize more.
pub const MAX_REQUEST_BEFORE_CONFIRM: usize = 25;

/// Default CPU core count when detection fails.
///
/// Used as a fallback when `std::thread::available_parallelism()` returns an error.
pub const FALLBACK_CORE_COUNT: usize = 4;

/// Prefix of environment variables overriding a host tool's executable
/// (for example `FETCHDEP_GIT`).
pub const TOOL_OVERRIDE_ENV_PREFIX: &str = "FETCHDEP_";

/// Environment variable enabling debug output.
pub const ENV_DEBUG: &str = "FETCHDEP_DEBUG";

/// Environment variable enabling verbose output.
pub const ENV_VERBOSE: &str = "FETCHDEP_VERBOSE";

/// Environment variable overriding the number of fetch workers.
pub const ENV_PARALLEL: &str = "FETCHDEP_PARALLEL";
