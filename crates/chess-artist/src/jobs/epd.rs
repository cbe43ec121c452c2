//! EPD jobs: annotate every position with engine opcodes, or score the
//! engine against the `bm` / `am` solutions of a test suite.

use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};

use chess_core::epd::EpdRecord;
use chess_core::notation::{parse_fen, uci_to_san};
use chess_core::score::relative;
use shakmaty::{CastlingMode, Chess, Position};
use tracing::{error, info, warn};

use crate::config::{ArtistConfig, EvalType};
use crate::engine::{EngineHandle, SearchLimit};
use crate::error::ArtistError;
use crate::format::{epd_search_line, epd_static_line, open_append};

/// Result of a test-suite run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EpdTestSummary {
    pub total_lines: usize,
    pub tested: usize,
    pub correct: usize,
    pub elapsed: Duration,
}

impl EpdTestSummary {
    pub fn percentage(&self) -> f64 {
        if self.tested == 0 {
            0.0
        } else {
            100.0 * self.correct as f64 / self.tested as f64
        }
    }

    pub fn report(&self, infile: &Path, engine: &str, movetime_ms: u64) -> String {
        format!(
            ":: EPD {} TEST RESULTS ::\n\
             Engine                : {engine}\n\
             Time/pos (sec)        : {:.1}\n\n\
             Total epd lines       : {}\n\
             Total tested positions: {}\n\
             Total correct         : {}\n\
             Correct percentage    : {:.2}\n\
             Elapsed (sec)         : {:.2}\n\n",
            infile.display(),
            movetime_ms as f64 / 1000.0,
            self.total_lines,
            self.tested,
            self.correct,
            self.percentage(),
            self.elapsed.as_secs_f64(),
        )
    }
}

/// Parse an EPD line into its record and a playable position, or `None`
/// when the side to move has no legal move.
fn playable(line: &str) -> Result<Option<(EpdRecord, Chess)>, ArtistError> {
    let record = EpdRecord::parse(line)?;
    let pos = parse_fen(&record.fen(), CastlingMode::Standard)?;
    if pos.legal_moves().is_empty() {
        warn!(epd = %record.epd, "Position has no legal move, skipped");
        return Ok(None);
    }
    Ok(Some((record, pos)))
}

fn read_lines(path: &Path) -> Result<Vec<String>, ArtistError> {
    let text = std::fs::read_to_string(path)?;
    Ok(text.lines().map(str::to_string).collect())
}

/// Append every position of the input with `ce` (static) or `acd`, `acs`,
/// `bm` and `ce` (search). Returns the number of lines written.
pub async fn annotate_epd(config: &ArtistConfig, engine: &EngineHandle) -> Result<usize, ArtistError> {
    let limit = SearchLimit::time_and_depth(config.movetime_ms, config.depth);
    if config.eval == EvalType::Search {
        limit.go_command()?;
    }

    let mut out = open_append(&config.outfile)?;
    let mut written = 0;
    for (n, line) in read_lines(&config.infile)?.iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match annotate_line(config, engine, line, limit).await {
            Ok(Some(annotated)) => {
                writeln!(out, "{annotated}")?;
                written += 1;
            }
            Ok(None) => {}
            Err(e) => error!(line = n + 1, error = %e, "EPD line skipped"),
        }
    }
    out.flush()?;

    info!(lines = written, outfile = %config.outfile.display(), "EPD annotation finished");
    Ok(written)
}

pub async fn annotate_line(
    config: &ArtistConfig,
    engine: &EngineHandle,
    line: &str,
    limit: SearchLimit,
) -> Result<Option<String>, ArtistError> {
    let Some((record, pos)) = playable(line)? else {
        return Ok(None);
    };
    let fen = record.fen();
    let name = engine.identity().name.as_str();
    engine.new_game().await?;

    match config.eval {
        EvalType::Static => {
            let eval = engine.static_eval(&fen).await?;
            let Some(total) = eval.total else {
                warn!(epd = %record.epd, "Engine gave no static evaluation, skipped");
                return Ok(None);
            };
            let ce = (relative(pos.turn(), total) * 100.0) as i32;
            info!(epd = %record.epd, ce, "Static eval");
            Ok(Some(epd_static_line(&record.line, ce, name)))
        }
        EvalType::Search => {
            let reply = engine.search(&fen, limit, false).await?;
            let bm = uci_to_san(&pos, &reply.best_move)?;
            let ce = reply.score.to_centipawns();
            info!(epd = %record.epd, bm = %bm, ce, depth = reply.depth, "Search result");
            Ok(Some(epd_search_line(
                &record.line,
                reply.depth,
                config.movetime_ms / 1000,
                &bm,
                ce,
                name,
            )))
        }
    }
}

/// Search every position that has a `bm` or `am` opcode and count the
/// solved ones. The summary is appended to the output file.
pub async fn test_epd(config: &ArtistConfig, engine: &EngineHandle) -> Result<EpdTestSummary, ArtistError> {
    let limit = SearchLimit::time_and_depth(config.movetime_ms, config.depth);
    limit.go_command()?;

    let started = Instant::now();
    let mut summary = EpdTestSummary::default();
    for (n, line) in read_lines(&config.infile)?.iter().enumerate() {
        summary.total_lines += 1;
        if line.trim().is_empty() {
            continue;
        }
        match test_line(engine, line, limit).await {
            Ok(Some(solved)) => {
                summary.tested += 1;
                if solved {
                    summary.correct += 1;
                }
                info!(
                    line = n + 1,
                    solved,
                    correct = summary.correct,
                    tested = summary.tested,
                    "EPD test position"
                );
            }
            Ok(None) => {}
            Err(e) => error!(line = n + 1, error = %e, "EPD line skipped"),
        }
    }
    summary.elapsed = started.elapsed();

    let report = summary.report(&config.infile, &engine.identity().name, config.movetime_ms);
    let mut out = open_append(&config.outfile)?;
    out.write_all(report.as_bytes())?;
    out.flush()?;

    info!(
        total_lines = summary.total_lines,
        tested = summary.tested,
        correct = summary.correct,
        percentage = summary.percentage(),
        elapsed_secs = summary.elapsed.as_secs_f64(),
        "EPD test finished"
    );
    Ok(summary)
}

/// `Some(solved)` for a tested position, `None` when it was skipped.
pub async fn test_line(
    engine: &EngineHandle,
    line: &str,
    limit: SearchLimit,
) -> Result<Option<bool>, ArtistError> {
    let Some((record, pos)) = playable(line)? else {
        return Ok(None);
    };
    if !record.has_solution() {
        warn!(epd = %record.epd, "Position has no bm or am opcode, skipped");
        return Ok(None);
    }

    engine.new_game().await?;
    let reply = engine.search(&record.fen(), limit, false).await?;
    let san = uci_to_san(&pos, &reply.best_move)?;
    Ok(Some(record.is_solved_by(&san)))
}
