//! DocBridge CLI — capability detection and document normalization driver.
//!
//! Runs the detection and adapter stack against replay bundles: JSON scripts
//! of a provider's operation catalog and canned responses.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
