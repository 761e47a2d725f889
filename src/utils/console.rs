//! User-facing console output.
//!
//! fetchdep talks to its user with short prefixed status lines: plain
//! messages, notes (inverted), successes (green), warnings (magenta) and
//! errors (red). Diagnostics that only matter when troubleshooting go through
//! `tracing` instead.
//!
//! Warnings and errors are written to stderr. Stdout is always flushed first
//! so that a warning never lands in the middle of output that was printed
//! before it.
//!
//! Colour is controlled globally through [`colored::control`]; see
//! [`configure_color`].

use colored::Colorize;
use std::io::Write;

/// Enable or disable colourised output for the whole process.
pub fn configure_color(enabled: bool) {
    colored::control::set_override(enabled);
}

/// Print a normal message.
pub fn log(msg: impl AsRef<str>) {
    println!("{}", msg.as_ref());
    flush_stdout();
}

/// Print a notification message (used when a fetch starts).
pub fn note(msg: impl AsRef<str>) {
    println!("{}", msg.as_ref().reversed());
    flush_stdout();
}

/// Print a success message.
pub fn success(msg: impl AsRef<str>) {
    println!("{}", format!("(success) {}", msg.as_ref()).green().bold());
    flush_stdout();
}

/// Print a warning message to stderr.
pub fn warn(msg: impl AsRef<str>) {
    flush_stdout();
    eprintln!("{}", format!("(warn) {}", msg.as_ref()).magenta().bold());
    flush_stderr();
}

/// Print an error message to stderr.
pub fn error(msg: impl AsRef<str>) {
    flush_stdout();
    eprintln!("{}", format!("(error) {}", msg.as_ref()).red().bold());
    flush_stderr();
}

/// Force a flush of stdout.
pub fn flush_stdout() {
    let _ = std::io::stdout().flush();
}

/// Force a flush of stderr.
pub fn flush_stderr() {
    let _ = std::io::stderr().flush();
}
