//! Command-line interface for reconkit.
//!
//! - [`args`] - Argument definitions using clap derive macros
//! - [`install`] - The install command and its exit codes

pub mod args;
pub mod install;

pub use args::Cli;
pub use install::{CommandResult, InstallCommand, EXIT_INTERRUPTED};
