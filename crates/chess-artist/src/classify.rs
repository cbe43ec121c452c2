//! Move quality symbols (NAGs) from the played-move and best-move scores.
//!
//! Every score passed in here is in pawns from the mover's point of view.

use std::fmt;

use serde::Serialize;

use crate::complexity::ComplexityResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Nag {
    None,
    Good,
    Mistake,
    Excellent,
    Blunder,
    Interesting,
    Dubious,
}

impl Nag {
    pub fn code(self) -> u8 {
        match self {
            Nag::None => 0,
            Nag::Good => 1,
            Nag::Mistake => 2,
            Nag::Excellent => 3,
            Nag::Blunder => 4,
            Nag::Interesting => 5,
            Nag::Dubious => 6,
        }
    }

    pub fn is_none(self) -> bool {
        self == Nag::None
    }
}

impl fmt::Display for Nag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.code())
    }
}

/// Errors that go into the per-game blunder/mistake tally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Blunder,
    Mistake,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BadVerdict {
    pub nag: Nag,
    /// Decided by the threshold table before the `!` / `!?` override.
    pub counted: Option<Severity>,
}

/// Book moves annotated with less search time than this get no symbol.
pub const BOOK_NAG_MIN_MOVETIME_MS: u64 = 20_000;

#[derive(Debug, Clone, PartialEq)]
pub struct NagThresholds {
    pub draw: f64,
    pub slight: f64,
    pub moderate: f64,
    pub decisive: f64,
    /// Gap to the engine move that still earns a `?` when not losing.
    pub mistake_gap: f64,
    pub very_good_changes: u32,
    pub very_good_complexity_factor: u32,
    pub long_movetime_ms: u64,
    pub very_long_movetime_ms: u64,
    pub good_changes: u32,
    pub good_complexity: u32,
    pub interesting_changes: u32,
    pub interesting_complexity: u32,
}

impl Default for NagThresholds {
    fn default() -> Self {
        Self {
            draw: 0.15,
            slight: 0.75,
            moderate: 1.50,
            decisive: 3.0,
            mistake_gap: 0.50,
            very_good_changes: 4,
            very_good_complexity_factor: 15,
            long_movetime_ms: 60_000,
            very_long_movetime_ms: 180_000,
            good_changes: 3,
            good_complexity: 35,
            interesting_changes: 2,
            interesting_complexity: 18,
        }
    }
}

impl NagThresholds {
    /// Played move differs from the engine move.
    pub fn classify_bad(&self, pos: f64, eng: f64) -> BadVerdict {
        let (mut nag, counted) = if pos < -self.moderate && eng >= -self.moderate {
            (Nag::Blunder, Some(Severity::Blunder))
        } else if pos < -self.slight && eng >= -self.slight {
            (Nag::Mistake, Some(Severity::Mistake))
        } else if pos < -self.draw && eng >= -self.draw {
            (Nag::Dubious, None)
        } else if eng > self.moderate && pos <= self.moderate {
            (Nag::Mistake, Some(Severity::Mistake))
        } else if eng >= -self.moderate && eng - pos >= self.mistake_gap {
            (Nag::Mistake, Some(Severity::Mistake))
        } else {
            (Nag::None, None)
        };

        // the engine's search of the played move found more than its own pick
        if pos >= -self.slight && pos > eng {
            nag = Nag::Good;
        } else if pos >= -self.slight && pos == eng {
            nag = Nag::Interesting;
        }

        BadVerdict { nag, counted }
    }

    pub fn very_good_threshold(&self, movetime_ms: u64) -> u32 {
        if movetime_ms >= self.very_long_movetime_ms {
            self.very_good_changes + 2
        } else if movetime_ms >= self.long_movetime_ms {
            self.very_good_changes + 1
        } else {
            self.very_good_changes
        }
    }

    /// Played move is the engine move.
    pub fn classify_good(&self, pos: f64, c: ComplexityResult, movetime_ms: u64) -> Nag {
        if pos >= self.decisive || pos < -self.slight {
            return Nag::None;
        }
        let t = self.very_good_threshold(movetime_ms);
        let changes = c.move_changes;
        let complexity = c.complexity;

        if (changes >= t && complexity >= self.very_good_complexity_factor * t) || changes >= t + 2 {
            Nag::Excellent
        } else if changes >= self.good_changes && complexity >= self.good_complexity {
            Nag::Good
        } else if changes >= self.interesting_changes
            || (changes >= 1 && complexity >= self.interesting_complexity)
        {
            Nag::Interesting
        } else {
            Nag::None
        }
    }
}
