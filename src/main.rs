//! Reactor CLI - Character Compressor
//!
//! Command-line interface for the Reactor compression engine.

use clap::Parser;
use env_logger::Env;
use log::{error, info};

use reactor::cli::{commands, Cli, Commands};
use reactor::Result;

fn main() {
    let cli = Cli::parse();

    // Initialize logger
    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    info!("Reactor v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(cli) {
        error!("[{}] {}", e.error_code(), e);
        for suggestion in e.recovery_suggestions() {
            eprintln!("  hint: {}", suggestion);
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Some(Commands::Render(args)) => commands::render(&args),
        Some(Commands::Curve(args)) => commands::curve(&args),
        None => {
            println!("Reactor v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    }
}
