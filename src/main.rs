mod cli;
mod commands;

use clap::Parser;
use cli::Cli;
use resdesk::config::Config;
use resdesk::observability;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();

    let config = Config::load()?;
    observability::init_tracing(&config.telemetry);

    commands::run(cli.command, config).await
}
