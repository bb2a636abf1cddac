//! teststack CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use teststack::cli::{Cli, CommandDispatcher};
use teststack::shell::is_ci;
use teststack::ui::{create_ui, OutputMode};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Filter directive forced by the output flags, if any.
///
/// `--debug` wins over `--quiet`; without either flag `RUST_LOG` applies.
fn forced_filter(debug: bool, quiet: bool) -> Option<&'static str> {
    if debug {
        Some("teststack=debug")
    } else if quiet {
        Some("teststack=warn")
    } else {
        None
    }
}

/// Initialize the tracing subscriber for logging.
///
/// Log level is controlled by:
/// 1. `--debug` flag sets level to DEBUG, `--quiet` to WARN
/// 2. `RUST_LOG` environment variable (if set)
/// 3. Default is INFO
fn init_tracing(debug: bool, quiet: bool) {
    let filter = match forced_filter(debug, quiet) {
        Some(directive) => EnvFilter::new(directive),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("teststack=info")),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug, cli.quiet);

    tracing::debug!("teststack starting with args: {:?}", cli);

    let output_mode = OutputMode::from_flags(cli.verbose, cli.quiet);

    // Handle --no-color
    if cli.no_color {
        std::env::set_var("NO_COLOR", "1");
    }

    // Determine project root
    let project_root = cli
        .path
        .as_ref()
        .cloned()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());

    let mut ui = create_ui(!is_ci(), output_mode);

    let dispatcher = CommandDispatcher::new(project_root);

    match dispatcher.dispatch(&cli, ui.as_mut()) {
        Ok(result) => ExitCode::from(result.exit_code.clamp(0, 255) as u8),
        Err(e) => {
            ui.error(&format!("Error: {}", e));
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_raises_log_level_to_warn() {
        assert_eq!(forced_filter(false, true), Some("teststack=warn"));
    }

    #[test]
    fn debug_wins_over_quiet() {
        assert_eq!(forced_filter(true, true), Some("teststack=debug"));
        assert_eq!(forced_filter(true, false), Some("teststack=debug"));
    }

    #[test]
    fn no_flags_defer_to_environment() {
        assert_eq!(forced_filter(false, false), None);
    }
}
