//! Job dispatch: one engine for the whole run, one job per invocation.

pub mod epd;
pub mod puzzle;

use tracing::info;

use crate::analyzer::Annotator;
use crate::book::PolyglotBook;
use crate::config::{ArtistConfig, InputKind, Job};
use crate::engine::EngineHandle;
use crate::error::ArtistError;

pub async fn run(config: &ArtistConfig) -> Result<(), ArtistError> {
    let book = config
        .bookfile
        .as_deref()
        .map(PolyglotBook::open)
        .transpose()?;

    let engine = EngineHandle::start(config.engine.clone()).await?;
    info!(
        engine = %engine.identity().name,
        family = ?engine.identity().family,
        job = ?config.job,
        input = %config.infile.display(),
        "Engine ready"
    );

    let result = dispatch(config, &engine, book.as_ref()).await;
    engine.shutdown().await;
    result
}

pub async fn dispatch(
    config: &ArtistConfig,
    engine: &EngineHandle,
    book: Option<&PolyglotBook>,
) -> Result<(), ArtistError> {
    match (config.input, config.job) {
        (InputKind::Pgn, Job::Analyze) => {
            Annotator::new(config, engine, book).annotate_pgn().await?;
        }
        (InputKind::Pgn, Job::CreatePuzzle) => {
            puzzle::create_puzzles(config, engine).await?;
        }
        (InputKind::Epd, Job::Analyze) => {
            epd::annotate_epd(config, engine).await?;
        }
        (InputKind::Epd, Job::Test) => {
            epd::test_epd(config, engine).await?;
        }
        (input, job) => {
            return Err(ArtistError::Config(format!(
                "job {job:?} cannot run on {input:?} input"
            )))
        }
    }
    Ok(())
}
