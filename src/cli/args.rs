//! CLI argument definitions.
//!
//! This module defines all CLI arguments using clap's derive macros.
//! The main entry point is the [`Cli`] struct.

use clap::Parser;
use std::path::PathBuf;

use crate::config::InstallerConfig;
use crate::shell::platform::expand_home;
use crate::ui::OutputMode;

/// reconkit - install the recon toolchain on this host.
#[derive(Debug, Parser)]
#[command(name = "reconkit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.reconkit/config.yml)
    #[arg(short, long, env = "RECONKIT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Append the install log here instead of the configured log file
    #[arg(long, env = "RECONKIT_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Write the final installation report as JSON
    #[arg(long, env = "RECONKIT_REPORT_JSON")]
    pub report_json: Option<PathBuf>,

    /// Never attempt this tool (repeatable)
    #[arg(long = "skip", value_name = "TOOL")]
    pub skip: Vec<String>,

    /// Show every install attempt in the summary
    #[arg(short, long)]
    pub verbose: bool,

    /// Only warnings, errors and the summary
    #[arg(short, long)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR", value_parser = clap::builder::FalseyValueParser::new())]
    pub no_color: bool,

    /// Enable debug logging
    #[arg(long, env = "RECONKIT_DEBUG", value_parser = clap::builder::FalseyValueParser::new())]
    pub debug: bool,
}

impl Cli {
    pub fn output_mode(&self) -> OutputMode {
        OutputMode::from_flags(self.verbose, self.quiet)
    }

    /// Fold flag overrides into the loaded configuration.
    ///
    /// Runs after the config's own paths were expanded, so overrides are
    /// expanded here.
    pub fn apply_to(&self, config: &mut InstallerConfig) {
        if let Some(log_file) = &self.log_file {
            config.paths.log_file = expand_home(log_file);
        }
        for tool in &self.skip {
            if !config.is_skipped(tool) {
                config.skip_tools.push(tool.clone());
            }
        }
    }
}
