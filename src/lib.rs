pub mod assistant;
pub mod cli;
pub mod db;
pub mod error;
pub mod focus;
pub mod highlights;
pub mod persistence;
pub mod reader;
pub mod session;
pub mod settings;
mod utils;

use anyhow::Result;

use cli::{Cli, CliContext};
use db::Database;
use settings::SettingsStore;

pub async fn run(cli: Cli) -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    std::fs::create_dir_all(&cli.data_dir)?;

    let db = Database::new(cli.data_dir.join("hibiscus.sqlite3"))?;
    let settings = SettingsStore::new(cli.data_dir.join("settings.json"))?;

    cli::dispatch(CliContext { db, settings }, cli.command).await
}
