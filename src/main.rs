//! cfsync - Cloudflare IP range synchronizer for nginx and nftables

use anyhow::Result;
use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use tracing::error;

use cfsync::cli::{Cli, Commands};
use cfsync::config::{Config, DEFAULT_LOG_FILE};
use cfsync::logging::{self, Verbosity};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let command = cli.subcommand();

    // Neither needs a config file or a log
    match command {
        Commands::Version => {
            println!("cfsync {}", env!("CARGO_PKG_VERSION"));
            return ExitCode::SUCCESS;
        }
        Commands::DefaultConfig => {
            print!("{}", Config::generate_default_yaml());
            return ExitCode::SUCCESS;
        }
        _ => {}
    }

    let config = Config::load_or_default(&cli.config);

    // Log where the config says, or to the default file if it could not be read
    let log_file = match &config {
        Ok(config) => config.log_file.as_path(),
        Err(_) => Path::new(DEFAULT_LOG_FILE),
    };
    let verbosity = Verbosity::from_flags(cli.quiet, cli.verbose);
    if let Err(e) = logging::init(log_file, verbosity) {
        eprintln!("Error: {:#}", e);
        return ExitCode::FAILURE;
    }

    match run(&cli, command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Error occurred: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli, command: Commands, config: Result<Config>) -> Result<()> {
    let config = config?;

    match command {
        Commands::Update { dry_run, force } => {
            cfsync::commands::update::run(config, dry_run, force).await
        }
        Commands::Status => cfsync::commands::status::run(&config, &cli.config).await,
        Commands::Version | Commands::DefaultConfig => Ok(()),
    }
}
