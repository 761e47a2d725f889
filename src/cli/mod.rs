//! Command-line interface for fetchdep.
//!
//! fetchdep has no subcommands: it reads the dependency configuration of a
//! target directory (the current directory by default) and fetches every
//! dependency whose working copy is missing into the work directory.
//!
//! # Examples
//!
//! ```bash
//! # fetch dependencies of the current directory
//! fetchdep
//!
//! # fetch recursively, four at a time, tolerating failures
//! fetchdep --recursive -p 4 --skip-missing
//!
//! # include optional dependencies tagged `docs`
//! fetchdep --tag docs
//!
//! # show what would be fetched
//! fetchdep --state
//! fetchdep --dry-run
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser};
use tracing_subscriber::EnvFilter;

use crate::engine::{Engine, EngineOptions, RunOutcome};
use crate::utils::console;

/// Main CLI structure for fetchdep.
#[derive(Parser, Debug)]
#[command(
    name = "fetchdep",
    about = "Fetch the external dependencies of a project",
    version,
    disable_version_flag = true,
    long_about = "fetchdep reads a project's dependency configuration and fetches every \
                  missing dependency (git, hg, svn or cvs) next to the project."
)]
pub struct Cli {
    /// Directory whose configuration is processed (defaults to the current directory)
    #[arg(value_name = "TARGET")]
    target: Option<PathBuf>,

    /// Include all dependencies that have a tag
    #[arg(long)]
    all_tags: bool,

    /// Automatically answer no for any question
    #[arg(long, conflicts_with = "assume_yes")]
    assume_no: bool,

    /// Automatically answer yes for any question
    #[arg(short = 'y', long)]
    assume_yes: bool,

    /// Configuration file to load
    #[arg(short = 'C', long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Show debug-related messages
    #[arg(long)]
    debug: bool,

    /// Perform a dry-run of what will be fetched
    #[arg(long)]
    dry_run: bool,

    /// Explicitly disable colorized output
    #[arg(long)]
    nocolorout: bool,

    /// Enable parallel fetching.
    ///
    /// Without a count (or with 0) the count is derived from the host.
    #[arg(
        short = 'p',
        long,
        visible_alias = "jobs",
        visible_short_alias = 'j',
        value_name = "COUNT",
        num_args = 0..=1,
        default_missing_value = "0"
    )]
    parallel: Option<usize>,

    /// Allow fetching dependency's dependencies
    #[arg(short = 'R', long)]
    recursive: bool,

    /// Require a configuration to exist
    #[arg(long)]
    required: bool,

    /// Continue even if a dependency cannot be fetched
    #[arg(short = 's', long)]
    skip_missing: bool,

    /// Dump the state of this tool
    #[arg(long)]
    state: bool,

    /// Tags to use (repeatable)
    #[arg(long = "tag", value_name = "VALUE", action = ArgAction::Append)]
    tags: Vec<String>,

    /// Show additional messages
    #[arg(short = 'V', long)]
    verbose: bool,

    /// Show the version
    #[arg(short = 'v', long, action = ArgAction::Version)]
    #[allow(dead_code)]
    version: Option<bool>,

    /// Directory to fetch content
    #[arg(long, value_name = "DIR")]
    work_dir: Option<PathBuf>,
}

impl Cli {
    /// Engine options for these arguments, before environment overrides.
    #[must_use]
    pub fn build_options(&self) -> EngineOptions {
        let assume_yes = if self.assume_yes {
            Some(true)
        } else if self.assume_no {
            Some(false)
        } else {
            None
        };

        EngineOptions {
            all_tags: self.all_tags,
            assume_yes,
            conf_point: self.config.clone(),
            debug: self.debug,
            dry_run: self.dry_run,
            dump_state: self.state,
            no_color: self.nocolorout || no_color_requested(),
            parallel: self.parallel,
            recursive: self.recursive,
            required: self.required,
            skip_missing: self.skip_missing,
            tags: self.tags.clone(),
            target_dir: self.target.clone(),
            verbose: self.verbose,
            work_dir: self.work_dir.clone(),
        }
    }

    /// Execute fetchdep with the parsed arguments.
    ///
    /// # Errors
    ///
    /// Any error raised while preparing options or running the engine.
    pub async fn execute(self) -> Result<RunOutcome> {
        let mut opts = self.build_options();
        opts.apply_environment();

        init_logging(&opts);
        console::configure_color(!opts.no_color);

        opts.finalize()?;

        console::log(format!("fetchdep {}", env!("CARGO_PKG_VERSION")));
        tracing::debug!("({})", std::env::current_exe().unwrap_or_default().display());
        if opts.dry_run {
            console::warn("[dry-run] performing a dry-run");
        }

        let mut engine = Engine::new(opts);
        engine.run().await
    }
}

fn no_color_requested() -> bool {
    std::env::var_os("NO_COLOR").is_some_and(|value| !value.is_empty())
}

/// Install the diagnostic log subscriber. `RUST_LOG` overrides the level the
/// options select.
fn init_logging(opts: &EngineOptions) {
    let level = if opts.debug {
        "debug"
    } else if opts.verbose {
        "info"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(!opts.no_color)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use clap::error::ErrorKind;
    use std::path::Path;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("fetchdep").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_command_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let opts = parse(&[]).build_options();
        assert_eq!(opts.parallel, None);
        assert_eq!(opts.assume_yes, None);
        assert!(!opts.recursive);
        assert!(opts.tags.is_empty());
        assert!(opts.target_dir.is_none());
    }

    #[test]
    fn test_parallel_forms() {
        assert_eq!(parse(&["--parallel"]).build_options().parallel, Some(0));
        assert_eq!(parse(&["-p", "3"]).build_options().parallel, Some(3));
        assert_eq!(parse(&["--jobs", "5"]).build_options().parallel, Some(5));
        assert_eq!(parse(&["-j", "2"]).build_options().parallel, Some(2));
        assert!(Cli::try_parse_from(["fetchdep", "-p", "-1"]).is_err());
    }

    #[test]
    fn test_flags_map_to_options() {
        let opts = parse(&[
            "--all-tags",
            "-y",
            "-C",
            "deps.yml",
            "--dry-run",
            "-R",
            "--required",
            "-s",
            "--state",
            "--tag",
            "docs",
            "--tag",
            "extra",
            "-V",
            "--work-dir",
            "/tmp/work",
            "project",
        ])
        .build_options();

        assert!(opts.all_tags);
        assert_eq!(opts.assume_yes, Some(true));
        assert_eq!(opts.conf_point.as_deref(), Some(Path::new("deps.yml")));
        assert!(opts.dry_run);
        assert!(opts.recursive);
        assert!(opts.required);
        assert!(opts.skip_missing);
        assert!(opts.dump_state);
        assert_eq!(opts.tags, vec!["docs", "extra"]);
        assert!(opts.verbose);
        assert_eq!(opts.work_dir.as_deref(), Some(Path::new("/tmp/work")));
        assert_eq!(opts.target_dir.as_deref(), Some(Path::new("project")));
    }

    #[test]
    fn test_assume_no() {
        assert_eq!(parse(&["--assume-no"]).build_options().assume_yes, Some(false));

        let err = Cli::try_parse_from(["fetchdep", "--assume-no", "--assume-yes"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_version_flag() {
        for flag in ["-v", "--version"] {
            let err = Cli::try_parse_from(["fetchdep", flag]).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::DisplayVersion);
        }
    }
}
