//! Material counting, closed-center detection and the per-game material trace
//! used to spot sacrifices.

use serde::Serialize;
use shakmaty::{Board, Color, Piece, Role, Square};

pub const QUEEN_WEIGHT: i32 = 9;
pub const ROOK_WEIGHT: i32 = 5;
pub const BISHOP_WEIGHT: i32 = 3;
pub const KNIGHT_WEIGHT: i32 = 3;
pub const PAWN_WEIGHT: i32 = 1;

/// Largest imbalance (in pawns) still treated as a sacrifice.
pub const MAX_SACRIFICE: i32 = 3;

/// Piece material (pawns excluded) per side plus queen and pawn counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterialInfo {
    pub white: i32,
    pub black: i32,
    pub queens: usize,
    pub pawns: usize,
}

fn count(board: &Board, color: Color, role: Role) -> i32 {
    board.by_piece(Piece { color, role }).count() as i32
}

fn piece_material(board: &Board, color: Color) -> i32 {
    QUEEN_WEIGHT * count(board, color, Role::Queen)
        + ROOK_WEIGHT * count(board, color, Role::Rook)
        + BISHOP_WEIGHT * count(board, color, Role::Bishop)
        + KNIGHT_WEIGHT * count(board, color, Role::Knight)
}

pub fn material_info(board: &Board) -> MaterialInfo {
    MaterialInfo {
        white: piece_material(board, Color::White),
        black: piece_material(board, Color::Black),
        queens: board.queens().count(),
        pawns: board.pawns().count(),
    }
}

/// White material minus black material, pawns included.
pub fn material_balance(board: &Board) -> i32 {
    piece_material(board, Color::White) - piece_material(board, Color::Black)
        + PAWN_WEIGHT * (count(board, Color::White, Role::Pawn) - count(board, Color::Black, Role::Pawn))
}

fn has(board: &Board, sq: Square, color: Color, role: Role) -> bool {
    board.piece_at(sq) == Some(Piece { color, role })
}

/// True for the two locked pawn chains: white d4+e5 against black d5+e6, or
/// white d5+e4 against black d6+e5.
pub fn is_center_closed(board: &Board) -> bool {
    let wp = |sq| has(board, sq, Color::White, Role::Pawn);
    let bp = |sq| has(board, sq, Color::Black, Role::Pawn);

    (wp(Square::D4) && wp(Square::E5) && bp(Square::D5) && bp(Square::E6))
        || (wp(Square::D5) && wp(Square::E4) && bp(Square::D6) && bp(Square::E5))
}

/// A detected sacrifice: who gave material and how many pawns it was worth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Sacrifice {
    #[serde(serialize_with = "crate::notation::serialize_color")]
    pub side: Color,
    pub pawns: i32,
}

/// Material balance of every position of one game, start position first.
#[derive(Debug, Clone, Default)]
pub struct MaterialBalanceTrace {
    entries: Vec<(String, i32)>,
}

impl MaterialBalanceTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, fen: impl Into<String>, balance: i32) {
        self.entries.push((fen.into(), balance));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn balances(&self) -> impl Iterator<Item = i32> + '_ {
        self.entries.iter().map(|(_, b)| *b)
    }

    /// Sacrifice starting at position `index`: level material there, then the
    /// same small imbalance for the next two positions.
    pub fn sacrifice_at(&self, index: usize) -> Option<Sacrifice> {
        let at = |i: usize| self.entries.get(i).map(|(_, b)| *b);
        if at(index)? != 0 {
            return None;
        }
        let next = at(index + 1)?;
        if next == 0 || next.abs() > MAX_SACRIFICE || at(index + 2)? != next {
            return None;
        }
        // the side that fell behind gave the material
        let side = if next > 0 { Color::Black } else { Color::White };
        Some(Sacrifice { side, pawns: next.abs() })
    }

    /// Same as [`sacrifice_at`](Self::sacrifice_at), locating the position by FEN.
    pub fn sacrifice_at_fen(&self, fen: &str) -> Option<Sacrifice> {
        let index = self.entries.iter().position(|(f, _)| f == fen)?;
        self.sacrifice_at(index)
    }
}
