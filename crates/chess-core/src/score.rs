//! Engine score conversion.
//!
//! Engines report scores from the point of view of the side to move, either
//! in centipawns or as a distance to mate. Everything downstream works in
//! pawn units with an explicit point of view.

use serde::{Deserialize, Serialize};
use shakmaty::Color;

/// Score magnitude used for mate values.
pub const MAX_SCORE: i32 = 32000;

/// A score as reported on an `info` line, side-to-move POV.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RawScore {
    Centipawns(i32),
    Mate(i32),
}

impl RawScore {
    /// Centipawn value, with mate distances folded into the +/- 32000 band.
    pub fn to_centipawns(self) -> i32 {
        match self {
            RawScore::Centipawns(cp) => cp,
            RawScore::Mate(d) => mate_distance_to_value(d),
        }
    }
}

/// Map a mate distance onto the centipawn scale.
///
/// Positive `d` means the side to move mates. Shorter mates get larger
/// magnitudes and `d == 0` maps to 0.
pub fn mate_distance_to_value(d: i32) -> i32 {
    if d < 0 {
        -2 * d - MAX_SCORE
    } else if d > 0 {
        MAX_SCORE - 2 * d + 1
    } else {
        0
    }
}

/// Which side a normalized score speaks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Perspective {
    /// Positive is good for white.
    White,
    /// Positive is good for the player who made the move being judged.
    Mover,
}

/// Convert a raw side-to-move centipawn value into pawn units.
///
/// `queried_after_move` is set when the engine was asked about the position
/// after `mover` played, so the engine speaks for the opponent.
pub fn normalize(raw_cp: i32, mover: Color, queried_after_move: bool, want: Perspective) -> f64 {
    let mut cp = if queried_after_move { -raw_cp } else { raw_cp };
    // cp is now from the mover's point of view
    if want == Perspective::White && mover == Color::Black {
        cp = -cp;
    }
    pawns(cp)
}

/// White-POV score to `side` POV. Applying it twice returns the input.
pub fn relative(side: Color, white_pov: f64) -> f64 {
    match side {
        Color::White => white_pov,
        Color::Black => -white_pov,
    }
}

pub fn pawns(cp: i32) -> f64 {
    f64::from(cp) / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mate_in_three() {
        assert_eq!(mate_distance_to_value(3), 31995);
        assert_eq!(mate_distance_to_value(-3), -31994);
        assert_eq!(mate_distance_to_value(0), 0);
    }

    #[test]
    fn test_mate_monotonic_and_sign_preserving() {
        for d in 1..200 {
            let v = mate_distance_to_value(d);
            let v_closer = mate_distance_to_value(d - 1);
            assert!(v > 0);
            assert!(mate_distance_to_value(-d) < 0);
            if d > 1 {
                assert!(v_closer > v, "mate in {} should outrank mate in {}", d - 1, d);
                assert!(mate_distance_to_value(-(d - 1)) < mate_distance_to_value(-d));
            }
        }
    }

    #[test]
    fn test_raw_score_folding() {
        assert_eq!(RawScore::Centipawns(-45).to_centipawns(), -45);
        assert_eq!(RawScore::Mate(1).to_centipawns(), 31999);
    }

    #[test]
    fn test_normalize_all_inversions() {
        // engine says +50 for the side to move
        assert_eq!(normalize(50, Color::White, false, Perspective::White), 0.5);
        assert_eq!(normalize(50, Color::White, true, Perspective::White), -0.5);
        assert_eq!(normalize(50, Color::Black, false, Perspective::White), -0.5);
        assert_eq!(normalize(50, Color::Black, true, Perspective::White), 0.5);
        assert_eq!(normalize(50, Color::Black, false, Perspective::Mover), 0.5);
        assert_eq!(normalize(50, Color::Black, true, Perspective::Mover), -0.5);
    }

    #[test]
    fn test_relative_is_involution() {
        for &s in &[-3.25, -0.5, 0.0, 0.15, 7.0] {
            for side in [Color::White, Color::Black] {
                assert_eq!(relative(side, relative(side, s)), s);
            }
        }
        assert_eq!(relative(Color::Black, 1.0), -1.0);
    }
}
