//! What the opponent would play if the mover could pass.

use chess_core::notation::{fen_of, null_move, parse_fen, uci_to_san};
use shakmaty::{CastlingMode, Color};
use tracing::debug;

use crate::engine::{EngineHandle, SearchLimit};
use crate::error::ArtistError;

pub const THREAT_MIN_MOVE_CHANGES: u32 = 3;
pub const THREAT_MAX_SCORE: f64 = 2.0;

/// Facts about one ply that decide whether a threat search is worthwhile.
#[derive(Debug, Clone, Copy)]
pub struct ThreatGate {
    pub move_changes: u32,
    pub played_is_best: bool,
    pub check_after: bool,
    /// Engine score before the move, pawns, either POV.
    pub engine_score: f64,
    pub mover: Color,
    pub fullmove: u32,
}

impl ThreatGate {
    pub fn is_open(&self) -> bool {
        self.move_changes >= THREAT_MIN_MOVE_CHANGES
            && self.played_is_best
            && !self.check_after
            && self.engine_score.abs() <= THREAT_MAX_SCORE
            && !(self.fullmove == 1 && self.mover == Color::White)
    }
}

/// Pass the turn in `fen_after` and search the result. Returns the reply as
/// SAN in the passed position.
pub async fn find_threat(
    engine: &EngineHandle,
    fen_after: &str,
    movetime_ms: u64,
    mode: CastlingMode,
) -> Result<Option<String>, ArtistError> {
    let pos = null_move(&parse_fen(fen_after, mode)?)?;
    let null_fen = fen_of(&pos);
    let reply = engine
        .search(&null_fen, SearchLimit::by_time(movetime_ms), false)
        .await?;

    if reply.best_move == "(none)" || reply.best_move == "0000" {
        return Ok(None);
    }
    let threat = uci_to_san(&pos, &reply.best_move)?;
    debug!(threat = %threat, "Threat move");
    Ok(Some(threat))
}
