use serde::{Deserialize, Serialize};
use shakmaty::{CastlingMode, Chess, Color, Position};

use crate::error::CoreError;
use crate::material::{material_balance, MaterialBalanceTrace};
use crate::notation::{fen_of, parse_fen, san_to_move, san_with_suffix, to_uci};

const CHESS960_VARIANTS: [&str; 4] = ["chess960", "fischerandom", "chess 960", "fischer random"];

/// One game as read from a PGN file: tag pairs in file order and mainline SAN.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameData {
    pub tags: Vec<(String, String)>,
    pub moves: Vec<String>, // SAN notation
}

/// One half-move of a replayed game.
#[derive(Debug, Clone)]
pub struct Ply {
    pub index: usize,
    pub before: Chess,
    pub fen_before: String,
    pub fen_after: String,
    pub san: String,
    pub uci: String,
    pub mover: Color,
    pub fullmove: u32,
    pub is_capture: bool,
    pub check_after: bool,
    pub game_over_after: bool,
}

impl GameData {
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn white(&self) -> &str {
        self.tag("White").unwrap_or("?")
    }

    pub fn black(&self) -> &str {
        self.tag("Black").unwrap_or("?")
    }

    pub fn result(&self) -> &str {
        self.tag("Result").unwrap_or("*")
    }

    pub fn is_chess960(&self) -> bool {
        self.tag("Variant")
            .map(|v| CHESS960_VARIANTS.contains(&v.to_lowercase().as_str()))
            .unwrap_or(false)
    }

    pub fn castling_mode(&self) -> CastlingMode {
        if self.is_chess960() {
            CastlingMode::Chess960
        } else {
            CastlingMode::Standard
        }
    }

    pub fn start_position(&self) -> Result<Chess, CoreError> {
        match self.tag("FEN") {
            Some(fen) => parse_fen(fen, self.castling_mode()),
            None => Ok(Chess::default()),
        }
    }

    /// Play through the mainline, producing one [`Ply`] per move.
    pub fn replay(&self) -> Result<Vec<Ply>, CoreError> {
        let mode = self.castling_mode();
        let mut pos = self.start_position()?;
        let mut plies = Vec::with_capacity(self.moves.len());

        for (index, san) in self.moves.iter().enumerate() {
            let mv = san_to_move(&pos, san)?;
            let fen_before = fen_of(&pos);
            let mover = pos.turn();
            let fullmove = pos.fullmoves().get();
            let san = san_with_suffix(&pos, &mv);
            let uci = to_uci(&mv, mode);
            let is_capture = mv.is_capture();

            let before = pos.clone();
            pos.play_unchecked(mv);

            plies.push(Ply {
                index,
                before,
                fen_before,
                fen_after: fen_of(&pos),
                san,
                uci,
                mover,
                fullmove,
                is_capture,
                check_after: pos.is_check(),
                game_over_after: pos.is_checkmate() || pos.is_stalemate(),
            });
        }

        Ok(plies)
    }

    /// Material balance of every position in the mainline.
    pub fn material_trace(&self) -> Result<MaterialBalanceTrace, CoreError> {
        let mut pos = self.start_position()?;
        let mut trace = MaterialBalanceTrace::new();
        trace.push(fen_of(&pos), material_balance(pos.board()));

        for san in &self.moves {
            let mv = san_to_move(&pos, san)?;
            pos.play_unchecked(mv);
            trace.push(fen_of(&pos), material_balance(pos.board()));
        }

        Ok(trace)
    }
}
