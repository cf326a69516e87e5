//! arxivdigest CLI — ordered digest of new submissions across categories.
//!
//! Fetches each category's listing in priority order, resolves revisions,
//! and writes one deduplicated, globally ordered record stream.

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
