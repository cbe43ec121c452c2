//! Positional remarks read off the engine's `eval` table.
//!
//! Term values are white POV pawns; a remark applies when the term favours
//! the player who just moved by at least the threshold. A missing term
//! means the remark does not apply.

use chess_core::score::relative;
use serde::Serialize;
use shakmaty::Color;

use crate::engine::EvalBreakdown;

pub const PASSED_PAWN_THRESHOLD: f64 = 1.0;
pub const KING_SAFETY_THRESHOLD: f64 = 1.0;
pub const MOBILITY_THRESHOLD: f64 = 0.5;

/// King safety is only remarked on in roughly balanced positions.
pub const KING_SAFETY_MAX_SCORE: f64 = 1.5;
pub const MOBILITY_MAX_SCORE: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionalNote {
    PassedPawn,
    KingSafety,
    Mobility,
}

impl PositionalNote {
    pub fn term(self) -> &'static str {
        match self {
            PositionalNote::PassedPawn => "Passed",
            PositionalNote::KingSafety => "King safety",
            PositionalNote::Mobility => "Mobility",
        }
    }

    pub fn comment(self) -> &'static str {
        match self {
            PositionalNote::PassedPawn => "with a better passer",
            PositionalNote::KingSafety => "with a better king safety",
            PositionalNote::Mobility => "with a better piece mobility",
        }
    }

    /// Check the remark against an `eval` breakdown for `mover`.
    pub fn applies(self, eval: &EvalBreakdown, mover: Color) -> bool {
        let Some(term) = eval.term(self.term()) else {
            return false;
        };
        let mg = relative(mover, term.mg);
        let eg = relative(mover, term.eg);
        match self {
            PositionalNote::PassedPawn => mg >= PASSED_PAWN_THRESHOLD && eg >= PASSED_PAWN_THRESHOLD,
            PositionalNote::KingSafety => mg >= KING_SAFETY_THRESHOLD,
            PositionalNote::Mobility => mg >= MOBILITY_THRESHOLD && eg >= MOBILITY_THRESHOLD,
        }
    }
}
