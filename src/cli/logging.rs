// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Console output helpers for the CLI.
//!
//! The library itself logs through `tracing`; these macros format the
//! human-facing CLI output with `colored`.

use std::sync::atomic::{AtomicBool, Ordering};

/// Global verbosity flag.
static VERBOSE: AtomicBool = AtomicBool::new(true);

/// Set the global verbosity flag.
pub fn set_verbose(verbose: bool) {
    VERBOSE.store(verbose, Ordering::Relaxed);
}

/// Check if verbose output is enabled.
pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::Relaxed)
}

/// Label column width used by [`field!`](crate::field).
pub const LABEL_WIDTH: usize = 12;

/// Format a score in 0..=100 with a traffic-light color.
#[must_use]
pub fn colored_score(score: f32) -> String {
    use colored::Colorize;
    let text = format!("{score:.1}%");
    if score >= 80.0 {
        text.green().bold().to_string()
    } else if score >= 50.0 {
        text.yellow().bold().to_string()
    } else {
        text.red().bold().to_string()
    }
}

/// Macro for standard info messages.
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        println!("{}", format!($($arg)*))
    };
}

/// Macro for warning messages.
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {{
        use ::colored::Colorize;
        eprintln!("{} {}", "WARNING ⚠️".yellow().bold(), format!($($arg)*));
    }};
}

/// Macro for error messages.
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {{
        use ::colored::Colorize;
        eprintln!("{} {}", "Error:".red().bold(), format!($($arg)*));
    }};
}

/// Macro for success messages.
#[macro_export]
macro_rules! success {
    ($($arg:tt)*) => {{
        use ::colored::Colorize;
        println!("{} {}", "✅".green(), format!($($arg)*));
    }};
}

/// Macro for verbose messages.
#[macro_export]
macro_rules! verbose {
    ($($arg:tt)*) => {
        if $crate::cli::logging::is_verbose() {
            println!("{}", format!($($arg)*));
        }
    };
}

/// Macro for section headers (verbose only).
#[macro_export]
macro_rules! section {
    ($($arg:tt)*) => {{
        use ::colored::Colorize;
        if $crate::cli::logging::is_verbose() {
            println!();
            println!("{}", format!($($arg)*).cyan().bold());
        }
    }};
}

/// Macro for aligned `label: value` lines.
#[macro_export]
macro_rules! field {
    ($label:expr, $($arg:tt)*) => {{
        use ::colored::Colorize;
        println!(
            "  {:<width$} {}",
            format!("{}:", $label).dimmed(),
            format!($($arg)*),
            width = $crate::cli::logging::LABEL_WIDTH
        );
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_toggle() {
        set_verbose(true);
        assert!(is_verbose());

        set_verbose(false);
        assert!(!is_verbose());

        set_verbose(true);
        assert!(is_verbose());
    }

    #[test]
    fn test_colored_score_keeps_value() {
        colored::control::set_override(false);
        assert_eq!(colored_score(87.0), "87.0%");
        assert_eq!(colored_score(50.0), "50.0%");
        colored::control::unset_override();
    }
}
