//! How hard a position was for the engine, judged by how often its
//! preferred move changed between iterations.

use chess_core::material::{is_center_closed, material_info};
use serde::Serialize;
use shakmaty::Board;

use crate::engine::SearchSample;

/// Shallower iterations are too noisy to count.
pub const MIN_SAMPLE_DEPTH: u32 = 10;
/// Sampling is only worth it with this much search time per position.
pub const COMPLEXITY_MINIMUM_TIME_MS: u64 = 2000;

const QUEEN_BONUS: i32 = 5;
const HEAVY_MATERIAL_BONUS: i32 = 5;
const HEAVY_MATERIAL_MIN: i32 = 46;
const HEAVY_MATERIAL_MAX_PAWNS: usize = 14;
const CLOSED_CENTER_PENALTY: i32 = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ComplexityResult {
    pub complexity: u32,
    pub move_changes: u32,
}

pub fn analyze(samples: &[SearchSample], board: &Board) -> ComplexityResult {
    let mut complexity: i32 = 0;
    let mut move_changes = 0;
    let mut last_move: Option<&str> = None;
    let mut last_depth = 0;

    for sample in samples {
        if sample.depth >= MIN_SAMPLE_DEPTH
            && last_move != Some(sample.first_move.as_str())
            && sample.depth != last_depth
        {
            complexity += sample.depth as i32;
            move_changes += 1;
        }
        last_move = Some(sample.first_move.as_str());
        last_depth = sample.depth;
    }

    if complexity > 0 {
        let info = material_info(board);
        if info.queens > 0 {
            complexity += QUEEN_BONUS;
        }
        if info.white + info.black >= HEAVY_MATERIAL_MIN && info.pawns <= HEAVY_MATERIAL_MAX_PAWNS {
            complexity += HEAVY_MATERIAL_BONUS;
        }
    }
    if is_center_closed(board) {
        complexity -= CLOSED_CENTER_PENALTY;
    }

    ComplexityResult {
        complexity: complexity.max(0) as u32,
        move_changes,
    }
}
