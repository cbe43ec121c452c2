//! EPD line parsing: position fields plus the `bm`, `am` and `hmvc` opcodes.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::CoreError;

static MOVE_OPCODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)(bm|am)\s+([^;]+)").expect("valid regex"));
static HMVC_OPCODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)hmvc\s+(\d+)").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpdRecord {
    /// The input line, trimmed.
    pub line: String,
    /// Piece placement, side, castling and en passant fields.
    pub epd: String,
    pub hmvc: u32,
    pub best_moves: Vec<String>,
    pub avoid_moves: Vec<String>,
}

impl EpdRecord {
    pub fn parse(line: &str) -> Result<Self, CoreError> {
        let line = line.trim();
        let fields: Vec<&str> = line.split_whitespace().take(4).collect();
        if fields.len() < 4 {
            return Err(CoreError::InvalidEpd(line.to_string()));
        }

        let hmvc = HMVC_OPCODE
            .captures(line)
            .and_then(|c| c[1].parse().ok())
            .unwrap_or(0);

        let mut best_moves = Vec::new();
        let mut avoid_moves = Vec::new();
        // quoted operands (id, c0, Ae) never carry move lists
        for part in line.split(';').filter(|p| !p.contains('"')) {
            let Some(cap) = MOVE_OPCODE.captures(part) else {
                continue;
            };
            let moves = cap[2].split_whitespace().map(String::from);
            match &cap[1] {
                "bm" if best_moves.is_empty() => best_moves.extend(moves),
                "am" if avoid_moves.is_empty() => avoid_moves.extend(moves),
                _ => {}
            }
        }

        Ok(Self {
            line: line.to_string(),
            epd: fields.join(" "),
            hmvc,
            best_moves,
            avoid_moves,
        })
    }

    /// FEN for the engine: EPD fields, `hmvc` (default 0) and fullmove 1.
    pub fn fen(&self) -> String {
        format!("{} {} 1", self.epd, self.hmvc)
    }

    pub fn has_solution(&self) -> bool {
        !self.best_moves.is_empty() || !self.avoid_moves.is_empty()
    }

    /// A move solves the record when it is a listed best move, or when only
    /// avoid moves are given and it is none of them.
    pub fn is_solved_by(&self, san: &str) -> bool {
        if self.best_moves.iter().any(|m| m == san) {
            return true;
        }
        !self.avoid_moves.is_empty() && !self.avoid_moves.iter().any(|m| m == san)
    }
}
