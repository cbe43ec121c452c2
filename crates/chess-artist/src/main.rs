//! chess-artist
//!
//! Annotates PGN games and EPD positions with the analysis of a UCI engine,
//! tests engines on EPD suites and mines puzzle positions from games.

use std::fs::OpenOptions;
use std::sync::Mutex;

use clap::Parser;
use tracing::info;

use chess_artist::config::{ArtistConfig, CliArgs, LOG_FILE};
use chess_artist::format::{APP_NAME, APP_VERSION};
use chess_artist::jobs;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file for the engine path
    let _ = dotenvy::dotenv();

    let args = CliArgs::parse();

    if args.log {
        let file = OpenOptions::new().create(true).append(true).open(LOG_FILE)?;
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::from_default_env()
                    .add_directive(tracing::Level::DEBUG.into()),
            )
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::from_default_env()
                    .add_directive(tracing::Level::INFO.into()),
            )
            .init();
    }

    info!(app = APP_NAME, version = APP_VERSION, "Starting");

    let config = ArtistConfig::from_args(args)?;
    info!(
        infile = %config.infile.display(),
        outfile = %config.outfile.display(),
        engine = %config.engine.path.display(),
        eval = ?config.eval,
        movetime_ms = config.movetime_ms,
        "Config loaded"
    );

    jobs::run(&config).await?;

    info!("Done");
    Ok(())
}
