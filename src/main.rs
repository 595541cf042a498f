//! reconkit CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use reconkit::cli::{Cli, InstallCommand, EXIT_INTERRUPTED};
use reconkit::config::load_config;
use reconkit::logging::init_tracing;
use reconkit::shell::install_handler;
use reconkit::ui::{Reporter, TerminalReporter};

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Handle --no-color
    if cli.no_color {
        std::env::set_var("NO_COLOR", "1");
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    let mut reporter = TerminalReporter::new(cli.output_mode());

    let mut config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            reporter.error(&format!("Error: {}", e));
            return ExitCode::from(1);
        }
    };
    cli.apply_to(&mut config);

    init_tracing(cli.debug, &config.paths.log_file);
    tracing::debug!("reconkit starting with args: {:?}", cli);
    install_handler();

    let command = InstallCommand::new(config, cli.report_json.clone());
    match command.execute(&mut reporter) {
        Ok(result) => ExitCode::from(result.exit_code as u8),
        Err(e) if e.is_interrupt() => ExitCode::from(EXIT_INTERRUPTED as u8),
        Err(e) => {
            reporter.error(&format!("Error: {}", e));
            ExitCode::from(1)
        }
    }
}
