// SPDX-FileCopyrightText: 2026 Pixrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pixrelay - a Telegram image-generation bot with a staff support relay.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod health;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pixrelay_config::model::PixrelayConfig;
use pixrelay_core::RelayError;
use pixrelay_storage::SqliteUserStore;

/// Pixrelay - a Telegram image-generation bot with a staff support relay.
#[derive(Parser, Debug)]
#[command(name = "pixrelay", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the bot until SIGINT/SIGTERM.
    Serve,
    /// Insert every user id listed in FILE that is not stored yet.
    ImportUsers {
        /// Plain-text list: a `User IDs:` header, then one id per line.
        file: PathBuf,
    },
    /// Write every stored user id to FILE.
    ExportUsers { file: PathBuf },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let config = match pixrelay_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            pixrelay_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::ImportUsers { file }) => import_users(config, file).await,
        Some(Commands::ExportUsers { file }) => export_users(config, file).await,
        None => {
            println!("pixrelay: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn open_store(config: &PixrelayConfig) -> Result<SqliteUserStore, RelayError> {
    let store = SqliteUserStore::new(config.storage.clone());
    store.initialize().await?;
    Ok(store)
}

async fn import_users(config: PixrelayConfig, file: PathBuf) -> Result<(), RelayError> {
    let store = open_store(&config).await?;
    let report = pixrelay_storage::import_users(&store, &file).await?;
    println!(
        "imported {} of {} user ids ({} lines skipped)",
        report.inserted, report.parsed, report.skipped
    );
    Ok(())
}

async fn export_users(config: PixrelayConfig, file: PathBuf) -> Result<(), RelayError> {
    let store = open_store(&config).await?;
    let count = pixrelay_storage::export_users(&store, &file).await?;
    println!("exported {count} users to {}", file.display());
    Ok(())
}
