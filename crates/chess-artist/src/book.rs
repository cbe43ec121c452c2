//! Polyglot opening book, loaded into memory once per run.
//!
//! Entries are 16 bytes, big-endian: key u64, move u16, weight u16,
//! learn u32. Files are sorted by key.

use std::path::Path;

use chess_core::notation::uci_to_san;
use shakmaty::zobrist::{Zobrist64, ZobristHash};
use shakmaty::{CastlingMode, Chess, EnPassantMode, Position, Role, Square};
use tracing::{debug, info};

use crate::error::ArtistError;

/// The book is only consulted up to this fullmove number.
pub const BOOK_MOVE_LIMIT: u32 = 30;

pub const BOOK_COMMENT: &str = "Polyglot book";

const ENTRY_SIZE: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BookEntry {
    key: u64,
    raw_move: u16,
    weight: u16,
}

#[derive(Debug, Clone, Default)]
pub struct PolyglotBook {
    entries: Vec<BookEntry>,
}

impl PolyglotBook {
    pub fn open(path: &Path) -> Result<Self, ArtistError> {
        let bytes = std::fs::read(path)
            .map_err(|e| ArtistError::Book(format!("{}: {e}", path.display())))?;
        let book = Self::from_bytes(&bytes)?;
        info!(path = %path.display(), entries = book.len(), "Loaded opening book");
        Ok(book)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ArtistError> {
        if bytes.len() % ENTRY_SIZE != 0 {
            return Err(ArtistError::Book(format!(
                "book size {} is not a multiple of {ENTRY_SIZE}",
                bytes.len()
            )));
        }

        let mut entries: Vec<BookEntry> = bytes
            .chunks_exact(ENTRY_SIZE)
            .map(|chunk| {
                let mut key = [0u8; 8];
                key.copy_from_slice(&chunk[0..8]);
                BookEntry {
                    key: u64::from_be_bytes(key),
                    raw_move: u16::from_be_bytes([chunk[8], chunk[9]]),
                    weight: u16::from_be_bytes([chunk[10], chunk[11]]),
                }
            })
            .collect();
        // a stable sort keeps file order among equal keys
        entries.sort_by_key(|e| e.key);
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The highest-weight book move for `pos` as SAN. Ties go to the entry
    /// stored first.
    pub fn lookup(&self, pos: &Chess, mode: CastlingMode) -> Result<Option<String>, ArtistError> {
        let key = polyglot_key(pos);
        let start = self.entries.partition_point(|e| e.key < key);

        let mut best: Option<&BookEntry> = None;
        for entry in self.entries[start..].iter().take_while(|e| e.key == key) {
            if best.map_or(true, |b| entry.weight > b.weight) {
                best = Some(entry);
            }
        }

        let Some(entry) = best else {
            return Ok(None);
        };
        let uci = decode_move(entry.raw_move, pos, mode);
        let san = uci_to_san(pos, &uci)
            .map_err(|e| ArtistError::Book(format!("book move {uci} is not legal: {e}")))?;
        debug!(key = %format!("{key:016x}"), book_move = %san, weight = entry.weight, "Book hit");
        Ok(Some(san))
    }
}

pub fn polyglot_key(pos: &Chess) -> u64 {
    pos.zobrist_hash::<Zobrist64>(EnPassantMode::Legal).0
}

/// Polyglot move bits to a UCI string. Castling is stored as king takes
/// rook, which standard UCI writes as the king's two-square step.
fn decode_move(raw: u16, pos: &Chess, mode: CastlingMode) -> String {
    let to = square(raw & 0x3f);
    let from = square((raw >> 6) & 0x3f);
    let promotion = match (raw >> 12) & 0x7 {
        1 => Some(Role::Knight),
        2 => Some(Role::Bishop),
        3 => Some(Role::Rook),
        4 => Some(Role::Queen),
        _ => None,
    };

    let king_moves = pos.board().role_at(from) == Some(Role::King);
    let to = match (mode, king_moves, from, to) {
        (CastlingMode::Standard, true, Square::E1, Square::H1) => Square::G1,
        (CastlingMode::Standard, true, Square::E1, Square::A1) => Square::C1,
        (CastlingMode::Standard, true, Square::E8, Square::H8) => Square::G8,
        (CastlingMode::Standard, true, Square::E8, Square::A8) => Square::C8,
        _ => to,
    };

    match promotion {
        Some(role) => format!("{from}{to}{}", role.char()),
        None => format!("{from}{to}"),
    }
}

fn square(index: u16) -> Square {
    Square::new(u32::from(index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_core::notation::parse_fen;

    fn encode(from: Square, to: Square, promotion: u16) -> u16 {
        (promotion << 12) | ((from as u16) << 6) | to as u16
    }

    fn entry(key: u64, mv: u16, weight: u16) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(ENTRY_SIZE);
        bytes.extend_from_slice(&key.to_be_bytes());
        bytes.extend_from_slice(&mv.to_be_bytes());
        bytes.extend_from_slice(&weight.to_be_bytes());
        bytes.extend_from_slice(&0u32.to_be_bytes());
        bytes
    }

    #[test]
    fn test_start_position_key() {
        assert_eq!(polyglot_key(&Chess::default()), 0x463b96181691fc9c);
    }

    #[test]
    fn test_highest_weight_wins() {
        let key = polyglot_key(&Chess::default());
        let mut bytes = entry(key, encode(Square::D2, Square::D4, 0), 10);
        bytes.extend(entry(key, encode(Square::E2, Square::E4, 0), 40));
        bytes.extend(entry(key.wrapping_add(1), encode(Square::C2, Square::C4, 0), 90));
        let book = PolyglotBook::from_bytes(&bytes).unwrap();

        assert_eq!(book.len(), 3);
        let mv = book.lookup(&Chess::default(), CastlingMode::Standard).unwrap();
        assert_eq!(mv.as_deref(), Some("e4"));
    }

    #[test]
    fn test_miss_returns_none() {
        let book = PolyglotBook::from_bytes(&entry(1, 0, 1)).unwrap();
        assert_eq!(book.lookup(&Chess::default(), CastlingMode::Standard).unwrap(), None);
    }

    #[test]
    fn test_castling_is_remapped() {
        let pos = parse_fen(
            "r1bqk2r/pppp1ppp/2n2n2/2b1p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 4 4",
            CastlingMode::Standard,
        )
        .unwrap();
        let book = PolyglotBook::from_bytes(&entry(
            polyglot_key(&pos),
            encode(Square::E1, Square::H1, 0),
            1,
        ))
        .unwrap();
        assert_eq!(book.lookup(&pos, CastlingMode::Standard).unwrap().as_deref(), Some("O-O"));
    }

    #[test]
    fn test_promotion_bits() {
        let pos = parse_fen("8/4P3/8/8/8/k7/8/K7 w - - 0 1", CastlingMode::Standard).unwrap();
        assert_eq!(decode_move(encode(Square::E7, Square::E8, 4), &pos, CastlingMode::Standard), "e7e8q");
        assert_eq!(decode_move(encode(Square::E7, Square::E8, 1), &pos, CastlingMode::Standard), "e7e8n");
    }

    #[test]
    fn test_truncated_file_is_rejected() {
        assert!(matches!(PolyglotBook::from_bytes(&[0u8; 17]), Err(ArtistError::Book(_))));
    }
}
