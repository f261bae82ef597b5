//! logfwd -- compile a log forwarder spec into a collector configuration.
//!
//! # Exit codes
//!
//! See [`CliError::exit_code`].

use clap::Parser;

use logfwd_cli::cli::{Cli, Commands};
use logfwd_cli::commands;
use logfwd_cli::error::CliError;
use logfwd_cli::logging::init_tracing;
use logfwd_cli::output::OutputWriter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // config errors surface through the command, logging still starts
    let loaded = commands::load_config(&cli.config).await;

    let mut general = loaded
        .as_ref()
        .map(|config| config.general.clone())
        .unwrap_or_default();
    if let Some(ref level) = cli.log_level {
        general.log_level = level.clone();
    }
    if let Err(e) = init_tracing(&general) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }

    logfwd_core::metrics::describe_all();
    tracing::debug!(config = %cli.config.display(), "logfwd starting");

    let writer = OutputWriter::new(cli.output);
    let result: Result<(), CliError> = match cli.command {
        Commands::Generate(args) => match loaded {
            Ok(config) => commands::generate::execute(args, &config, &writer).await,
            Err(e) => Err(e),
        },
        Commands::Validate(args) => match loaded {
            Ok(config) => commands::validate::execute(args, &config, &writer).await,
            Err(e) => Err(e),
        },
        Commands::Config(args) => commands::config::execute(args, &cli.config, &writer).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(e.exit_code());
    }
}
