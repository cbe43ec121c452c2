//! One annotated half-move, as written to the PGN and to the records dump.

use std::fmt;

use chess_core::game_data::Ply;
use chess_core::material::Sacrifice;
use chess_core::notation::{color_name, serialize_color};
use serde::Serialize;
use shakmaty::Color;

use crate::classify::Nag;
use crate::complexity::ComplexityResult;
use crate::notes::PositionalNote;

/// Scores are pawns, white POV.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotationRecord {
    #[serde(serialize_with = "serialize_color")]
    pub side: Color,
    pub fullmove: u32,
    pub played: String,
    pub game_score: Option<f64>,
    pub engine_score: Option<f64>,
    pub engine_move: Option<String>,
    /// Numbered SAN from the position before the move.
    pub engine_line: Option<String>,
    pub nag: Nag,
    pub complexity: Option<ComplexityResult>,
    pub threat: Option<String>,
    pub sacrifice: Option<Sacrifice>,
    pub book_move: Option<String>,
    pub note: Option<PositionalNote>,
    pub game_over: bool,
}

/// The text after the score inside a move comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remark<'a> {
    Threat(&'a str),
    Note(PositionalNote),
    Sacrifice(Color),
}

impl fmt::Display for Remark<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Remark::Threat(mv) => write!(f, "planning {mv}"),
            Remark::Note(note) => f.write_str(note.comment()),
            Remark::Sacrifice(side) => write!(f, "{} had sacrificed material", color_name(*side)),
        }
    }
}

impl AnnotationRecord {
    /// A move that is written without any analysis.
    pub fn plain(ply: &Ply) -> Self {
        Self {
            side: ply.mover,
            fullmove: ply.fullmove,
            played: ply.san.clone(),
            game_score: None,
            engine_score: None,
            engine_move: None,
            engine_line: None,
            nag: Nag::None,
            complexity: None,
            threat: None,
            sacrifice: None,
            book_move: None,
            note: None,
            game_over: ply.game_over_after,
        }
    }

    pub fn played_engine_move(&self) -> bool {
        self.engine_move.as_deref() == Some(self.played.as_str())
    }

    pub fn is_annotated(&self) -> bool {
        !self.game_over && (self.game_score.is_some() || self.book_move.is_some())
    }

    /// The remark shown in the score comment, if any. A book move leaves
    /// room only for a threat; a move that differs from the engine's only
    /// for a sacrifice.
    pub fn remark(&self) -> Option<Remark<'_>> {
        if self.game_over || self.game_score.is_none() {
            return None;
        }
        let threat = self
            .threat
            .as_deref()
            .filter(|_| self.played_engine_move())
            .map(Remark::Threat);
        let note = self.note.map(Remark::Note);
        let sacrifice = self.sacrifice.map(|s| Remark::Sacrifice(s.side));

        if self.book_move.is_some() {
            return threat;
        }
        match &self.engine_move {
            None => note.or(sacrifice),
            Some(_) if self.played_engine_move() => threat.or(note).or(sacrifice),
            Some(_) => sacrifice,
        }
    }
}
