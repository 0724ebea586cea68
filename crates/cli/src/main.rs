#![forbid(unsafe_code)]

mod cli;
mod commands;
mod config;
mod logging;
mod timestamps;

use clap::Parser;
use qd_storage::SqliteStore;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    let mut config = config::Config::load(cli.config.as_deref())?;
    if let Some(dir) = cli.storage_dir.clone() {
        config.storage_dir = dir;
    }
    logging::init(cli.verbose, &config.log_filter);

    tracing::debug!(storage_dir = %config.storage_dir.display(), "opening store");
    let mut store = SqliteStore::open(&config.storage_dir)?;
    commands::run(&mut store, &config, cli.command)
}
