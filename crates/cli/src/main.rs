//! Marine Data Pipeline - Main Entry Point

use clap::Parser;
use marine_cli::{init_logging, run, Cli};
use tracing::info;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json);

    info!("=== Marine Data Pipeline v{} ===", env!("CARGO_PKG_VERSION"));

    run(cli)
}
