//! Per-game counters: errors by side, average score loss, and which
//! positional notes have already been used.

use serde::Serialize;
use shakmaty::Color;

use crate::classify::Severity;
use crate::notes::PositionalNote;

/// Score loss is only averaged from this move on.
pub const ERROR_MIN_FULLMOVE: u32 = 12;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SideCounts {
    pub blunders: u32,
    pub mistakes: u32,
    pub error_sum: f64,
    pub error_moves: u32,
}

impl SideCounts {
    pub fn average_error(&self) -> Option<f64> {
        (self.error_moves > 0).then(|| self.error_sum / f64::from(self.error_moves))
    }
}

#[derive(Debug, Clone, Default)]
pub struct GameTally {
    white: SideCounts,
    black: SideCounts,
    notes_used: Vec<(Color, PositionalNote)>,
}

impl GameTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn side(&self, side: Color) -> &SideCounts {
        match side {
            Color::White => &self.white,
            Color::Black => &self.black,
        }
    }

    fn side_mut(&mut self, side: Color) -> &mut SideCounts {
        match side {
            Color::White => &mut self.white,
            Color::Black => &mut self.black,
        }
    }

    pub fn count(&mut self, side: Color, severity: Severity) {
        let counts = self.side_mut(side);
        match severity {
            Severity::Blunder => counts.blunders += 1,
            Severity::Mistake => counts.mistakes += 1,
        }
    }

    /// `error` is the engine score minus the played score, mover POV.
    pub fn record_error(&mut self, side: Color, error: f64) {
        let counts = self.side_mut(side);
        counts.error_sum += error;
        counts.error_moves += 1;
    }

    /// A positional note is given at most once per side per game.
    pub fn note_available(&self, side: Color, note: PositionalNote) -> bool {
        !self.notes_used.contains(&(side, note))
    }

    pub fn use_note(&mut self, side: Color, note: PositionalNote) {
        if self.note_available(side, note) {
            self.notes_used.push((side, note));
        }
    }

    pub fn summary(&self) -> GameSummary {
        let white_average_error = self.white.average_error();
        let black_average_error = self.black.average_error();
        let rating_difference = match (white_average_error, black_average_error) {
            (Some(w), Some(b)) => Some((rating_difference(w) - rating_difference(b)).abs()),
            _ => None,
        };
        GameSummary {
            white: self.white,
            black: self.black,
            white_average_error,
            black_average_error,
            rating_difference,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameSummary {
    pub white: SideCounts,
    pub black: SideCounts,
    pub white_average_error: Option<f64>,
    pub black_average_error: Option<f64>,
    /// Absolute gap between the two sides' performance estimates, Elo.
    pub rating_difference: Option<i32>,
}

/// Expected score for a pawn advantage.
pub fn win_probability(pawn_advantage: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf(-pawn_advantage / 4.0))
}

/// Rating gap implied by an average score loss per move.
pub fn rating_difference(average_error: f64) -> i32 {
    let wp = win_probability(-average_error);
    (400.0 * ((1.0 - wp) / wp).ln()) as i32
}
