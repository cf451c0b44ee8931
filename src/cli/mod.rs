// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Command-line interface.
//!
//! Argument parsing, console output helpers and the `estimate`, `reference`
//! and `poses` commands.

// Modules
/// CLI arguments.
pub mod args;

/// Command implementations.
pub mod commands;

/// Console output macros.
pub mod logging;
