//! PGN and EPD output.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use chess_core::game_data::GameData;
use shakmaty::Color;

use crate::book::BOOK_COMMENT;
use crate::config::SummaryScope;
use crate::engine::EngineIdentity;
use crate::error::ArtistError;
use crate::record::AnnotationRecord;
use crate::tally::GameSummary;

pub const APP_NAME: &str = "chess-artist";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

const PLAIN_MOVES_PER_LINE: u32 = 4;
const ANNOTATED_MOVES_PER_LINE: u32 = 2;

/// Output files are appended to, never truncated.
pub fn open_append(path: &Path) -> Result<BufWriter<File>, ArtistError> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(BufWriter::new(file))
}

/// Line breaking for movetext: a newline goes after black's move once
/// enough moves are on the line.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatCursor {
    count: u32,
}

impl FormatCursor {
    /// Register one written move and report whether a newline follows it.
    pub fn after_move(&mut self, mover: Color, annotated: bool) -> bool {
        self.count += 1;
        let limit = if annotated {
            ANNOTATED_MOVES_PER_LINE
        } else {
            PLAIN_MOVES_PER_LINE
        };
        if mover == Color::Black && self.count >= limit {
            self.count = 0;
            true
        } else {
            false
        }
    }
}

fn number_prefix(side: Color, fullmove: u32) -> String {
    match side {
        Color::White => format!("{fullmove}."),
        Color::Black => format!("{fullmove}..."),
    }
}

/// `{+0.25}` style score, two decimals and always signed.
pub fn score_text(pawns: f64) -> String {
    format!("{pawns:+.2}")
}

/// Movetext for one record, with a trailing space.
pub fn render_move(record: &AnnotationRecord) -> String {
    if !record.is_annotated() {
        return match record.side {
            Color::White => format!("{}. {} ", record.fullmove, record.played),
            Color::Black => format!("{} ", record.played),
        };
    }

    let prefix = number_prefix(record.side, record.fullmove);
    let mut out = format!("{prefix} {}", record.played);
    if !record.nag.is_none() {
        out.push_str(&format!(" {}", record.nag));
    }
    if let Some(score) = record.game_score {
        match record.remark() {
            Some(remark) => out.push_str(&format!(" {{{}, {remark}}}", score_text(score))),
            None => out.push_str(&format!(" {{{}}}", score_text(score))),
        }
    }
    if let Some(book) = &record.book_move {
        out.push_str(&format!(" ({prefix} {book} {{{BOOK_COMMENT}}})"));
    }
    if let (Some(line), Some(score)) = (&record.engine_line, record.engine_score) {
        if !record.played_engine_move() {
            out.push_str(&format!(" ({line} {{{}}})", score_text(score)));
        }
    }
    out.push(' ');
    out
}

/// How the search was set up, for the comment above the movetext.
#[derive(Debug, Clone)]
pub enum AnalysisHeader {
    Static,
    Search {
        hash_mb: Option<u32>,
        threads: u32,
        movetime_ms: u64,
    },
}

impl AnalysisHeader {
    pub fn comment(&self) -> String {
        match self {
            AnalysisHeader::Static => "{Move comments are from engine static evaluation.}".into(),
            AnalysisHeader::Search {
                hash_mb,
                threads,
                movetime_ms,
            } => {
                let hash = hash_mb.map(|mb| format!("Hash {mb}mb, ")).unwrap_or_default();
                format!(
                    "{{{hash}Threads {threads}, analysis {:.1}s per position, move score is in pawn unit,\n\
                     positive is good for white and negative is good for black}}",
                    *movetime_ms as f64 / 1000.0
                )
            }
        }
    }
}

pub fn annotator_tag(engine: &EngineIdentity) -> String {
    format!(
        "[Annotator \"engine: {}, prog: {APP_NAME} {APP_VERSION}\"]",
        engine.name
    )
}

/// Blunder and mistake counts, then the average errors as a null-move
/// variation when both sides have them.
pub fn summary_comment(summary: &GameSummary, scope: SummaryScope) -> Option<String> {
    let w = &summary.white;
    let b = &summary.black;
    let counts = match scope {
        SummaryScope::Neither => return None,
        SummaryScope::Both => format!(
            "{{WhiteBlunder={}, BlackBlunder={}, WhiteBad={}, BlackBad={}}}",
            w.blunders, b.blunders, w.mistakes, b.mistakes
        ),
        SummaryScope::Only(Color::White) => {
            format!("{{WhiteBlunder={}, WhiteBad={}}}", w.blunders, w.mistakes)
        }
        SummaryScope::Only(Color::Black) => {
            format!("{{BlackBlunder={}, BlackBad={}}}", b.blunders, b.mistakes)
        }
    };

    let errors = match (
        scope,
        summary.white_average_error,
        summary.black_average_error,
        summary.rating_difference,
    ) {
        (SummaryScope::Both, Some(we), Some(be), Some(diff)) => format!(
            " (-- {{WhiteAveError={we:.2}, BlackAveError={be:.2}, ratingDiff={diff}}})"
        ),
        _ => String::new(),
    };
    Some(format!("{counts}{errors}"))
}

/// Writes annotated games one after another.
pub struct PgnWriter<W: Write> {
    out: W,
    cursor: FormatCursor,
}

impl<W: Write> PgnWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            cursor: FormatCursor::default(),
        }
    }

    /// Tag section with an `Annotator` tag, then the analysis comment.
    pub fn begin_game(
        &mut self,
        game: &GameData,
        engine: &EngineIdentity,
        header: &AnalysisHeader,
    ) -> Result<(), ArtistError> {
        self.cursor = FormatCursor::default();
        for (name, value) in game.tags.iter().filter(|(name, _)| name != "Annotator") {
            writeln!(self.out, "[{name} \"{value}\"]")?;
        }
        writeln!(self.out, "{}\n", annotator_tag(engine))?;
        writeln!(self.out, "{}", header.comment())?;
        Ok(())
    }

    pub fn write_move(&mut self, record: &AnnotationRecord) -> Result<(), ArtistError> {
        self.out.write_all(render_move(record).as_bytes())?;
        if self.cursor.after_move(record.side, record.is_annotated()) {
            self.out.write_all(b"\n")?;
        }
        Ok(())
    }

    pub fn end_game(&mut self, summary: Option<&str>, result: &str) -> Result<(), ArtistError> {
        match summary {
            Some(text) => write!(self.out, "{text} {result}\n\n")?,
            None => write!(self.out, "{result}\n\n")?,
        }
        self.out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

pub fn epd_static_line(line: &str, ce: i32, engine: &str) -> String {
    format!("{line} ce {ce:+}; c0 \"ce is static eval of engine\"; Ae \"{engine}\";")
}

pub fn epd_search_line(line: &str, acd: u32, acs: u64, bm: &str, ce: i32, engine: &str) -> String {
    format!("{line} acd {acd}; acs {acs}; bm {bm}; ce {ce:+}; Ae \"{engine}\";")
}
