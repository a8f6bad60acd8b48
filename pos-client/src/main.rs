//! Command-line front end for the POS backend.

use clap::Parser;
use pos_client::config::get_configuration;
use pos_client::session::TracingNavigator;
use pos_client::startup::build_state;
use pos_core::observability::init_tracing;
use std::sync::Arc;

mod commands;

use commands::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let configuration = get_configuration(cli.config.clone())
        .map_err(|e| anyhow::anyhow!("Failed to read configuration: {}", e))?;

    init_tracing(
        "pos-client",
        &configuration.logging.level,
        configuration.logging.otlp_endpoint.as_deref(),
    )?;

    let state = build_state(&configuration, Arc::new(TracingNavigator))?;

    cli.execute(&state).await
}
