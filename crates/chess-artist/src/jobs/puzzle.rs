//! Puzzle mining: positions where the engine changes its mind late in the
//! search and the late move scores clearly better.

use std::io::Write;
use std::time::Duration;

use chess_core::game_data::GameData;
use chess_core::notation::{epd_of, uci_to_san};
use chess_core::pgn::PgnGames;
use tracing::{debug, error, info};

use crate::config::ArtistConfig;
use crate::engine::{EngineHandle, SearchLimit, SearchSample};
use crate::error::ArtistError;
use crate::format::open_append;

pub const PUZZLE_MIN_FULLMOVE: u32 = 12;
/// Centipawns the final score must gain over the early one.
pub const PUZZLE_SCORE_MARGIN: i32 = 25;
/// Early scores beyond this mean the game is decided; the rest is skipped.
pub const DECIDED_SCORE: i32 = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PuzzleVerdict {
    Puzzle,
    NotPuzzle,
    Decided,
}

/// Compare what the engine preferred during the first quarter of the
/// search with the move and score it ended on.
pub fn judge(samples: &[SearchSample], best_move: &str, movetime_ms: u64) -> PuzzleVerdict {
    let quarter = Duration::from_millis(movetime_ms / 4);
    let split = samples
        .iter()
        .position(|s| s.elapsed >= quarter)
        .unwrap_or(samples.len());
    let (early, late) = samples.split_at(split);

    if early
        .iter()
        .filter_map(|s| s.score)
        .any(|score| score.to_centipawns().abs() > DECIDED_SCORE)
    {
        return PuzzleVerdict::Decided;
    }

    let Some((early_move, early_score)) = early
        .iter()
        .rev()
        .find_map(|s| s.score.map(|score| (s.first_move.as_str(), score.to_centipawns())))
    else {
        return PuzzleVerdict::NotPuzzle;
    };
    let Some(late_score) = late.iter().rev().find_map(|s| s.score) else {
        return PuzzleVerdict::NotPuzzle;
    };

    debug!(early_move, early_score, best_move, late_score = late_score.to_centipawns(), "Puzzle candidate");
    if best_move != early_move && late_score.to_centipawns() >= early_score + PUZZLE_SCORE_MARGIN {
        PuzzleVerdict::Puzzle
    } else {
        PuzzleVerdict::NotPuzzle
    }
}

/// The `variant` opcode value for a game, from its `Variant` tag.
fn variant_of(game: &GameData) -> Option<String> {
    let tag = game.tag("Variant")?;
    Some(if game.is_chess960() {
        "chess960".to_string()
    } else {
        tag.to_lowercase()
    })
}

pub fn puzzle_line(
    epd: &str,
    san: &str,
    uci: &str,
    engine: &str,
    variant: Option<&str>,
    game960: bool,
) -> String {
    let mut line = format!("{epd} bm {san}; Ubm {uci}; Ae \"{engine}\";");
    if let Some(variant) = variant {
        line.push_str(&format!(" variant \"{variant}\";"));
        if variant != "chess960" && game960 {
            line.push_str(" Variant1 \"chess960\";");
        }
    }
    line
}

/// Mine every game of the input. Returns the number of puzzles written.
pub async fn create_puzzles(config: &ArtistConfig, engine: &EngineHandle) -> Result<usize, ArtistError> {
    let mut out = open_append(&config.puzzle_file)?;
    let mut found = 0;

    for (n, game) in PgnGames::open(&config.infile)?.enumerate() {
        let game = game?;
        match game_puzzles(config, engine, &game).await {
            Ok(lines) => {
                for line in &lines {
                    writeln!(out, "{line}")?;
                }
                out.flush()?;
                info!(game = n + 1, puzzles = lines.len(), "Game mined");
                found += lines.len();
            }
            Err(e) => error!(game = n + 1, error = %e, "Game skipped"),
        }
    }

    info!(puzzles = found, puzzle_file = %config.puzzle_file.display(), "Puzzle creation finished");
    Ok(found)
}

pub async fn game_puzzles(
    config: &ArtistConfig,
    engine: &EngineHandle,
    game: &GameData,
) -> Result<Vec<String>, ArtistError> {
    let plies = game.replay()?;
    let variant = variant_of(game);
    engine.set_chess960(game.is_chess960()).await?;

    let name = engine.identity().name.as_str();
    let mut lines = Vec::new();
    for ply in plies.iter().filter(|p| p.fullmove >= PUZZLE_MIN_FULLMOVE) {
        engine.new_game().await?;
        let reply = engine
            .search(&ply.fen_before, SearchLimit::by_time(config.movetime_ms), true)
            .await?;

        match judge(&reply.samples, &reply.best_move, config.movetime_ms) {
            PuzzleVerdict::Decided => {
                info!(fen = %ply.fen_before, "Position is decided, next game");
                break;
            }
            PuzzleVerdict::NotPuzzle => {}
            PuzzleVerdict::Puzzle => {
                let san = uci_to_san(&ply.before, &reply.best_move)?;
                info!(fen = %ply.fen_before, bm = %san, "Puzzle found");
                lines.push(puzzle_line(
                    &epd_of(&ply.fen_before),
                    &san,
                    &reply.best_move,
                    name,
                    variant.as_deref(),
                    config.game960,
                ));
            }
        }
    }
    Ok(lines)
}
