//! reconkit - resilient installer for a domain reconnaissance tool chain.
//!
//! reconkit probes the host, then walks a fixed pipeline of install steps.
//! Every tool is resolved through a chain of install methods and counts as
//! installed only when its own check command passes.
//!
//! # Modules
//!
//! - [`catalog`] - The built-in tool catalog
//! - [`cli`] - Command-line interface and argument parsing
//! - [`config`] - Installer configuration loading and validation
//! - [`environment`] - Host, package manager and network probing
//! - [`error`] - Error types and result aliases
//! - [`host`] - Shell profile, repository, download and source patch edits
//! - [`logging`] - Tracing subscriber setup
//! - [`orchestrator`] - The step pipeline and the installation report
//! - [`resolver`] - Install methods, strategy chains and verification
//! - [`shell`] - Process execution and interrupt handling
//! - [`ui`] - Spinners, themed output and the final summary
//!
//! # Example
//!
//! ```
//! use reconkit::orchestrator::ratio_met;
//!
//! // Three of four security tools meet a 0.75 threshold.
//! assert!(ratio_met(3, 4, 0.75));
//! assert!(!ratio_met(2, 4, 0.75));
//! ```

pub mod catalog;
pub mod cli;
pub mod config;
pub mod environment;
pub mod error;
pub mod host;
pub mod logging;
pub mod orchestrator;
pub mod resolver;
pub mod shell;
pub mod ui;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{ResolverError, Result};
