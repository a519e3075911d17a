use action_prioritizer::cli::commands::{cmd_prioritize, cmd_tree};
use action_prioritizer::cli::config::{Cli, Commands, Overrides, load_config, resolve_settings};
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref());

    // Resolve settings: CLI > config > env > defaults
    let settings = resolve_settings(&Overrides::from_cli(&cli), &config, |var| {
        std::env::var(var).ok()
    });

    match &cli.command {
        Commands::Prioritize(args) => cmd_prioritize(args, &settings)?,
        Commands::Tree { xml, candidates } => cmd_tree(xml, *candidates)?,
    }

    Ok(())
}

/// Logs go to stderr so stdout carries only the JSON result.
fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
