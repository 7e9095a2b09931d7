//! review-phases CLI entry point.

use anyhow::Result;
use clap::Parser;

use review_phases::cli::{self, Cli};
use review_phases::infrastructure::config::ConfigLoader;
use review_phases::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(&cli).await {
        cli::handle_error(err, cli.json);
    }
}

async fn run(cli: &Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };
    let log_config = LogConfig::try_from(&config.logging)?;
    let _logger = LoggerImpl::init(&log_config)?;

    cli::run(cli, config).await
}
