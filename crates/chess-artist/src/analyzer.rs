//! Game annotation: walks every move of every selected game, asks the
//! engine about it and turns the answers into annotation records.

use std::io::Write;

use chess_core::game_data::{GameData, Ply};
use chess_core::material::MaterialBalanceTrace;
use chess_core::notation::{uci_line_to_san, uci_to_san};
use chess_core::pgn::PgnGames;
use chess_core::score::{normalize, relative, Perspective};
use shakmaty::{CastlingMode, Position};
use tracing::{debug, error, info, warn};

use crate::book::{PolyglotBook, BOOK_MOVE_LIMIT};
use crate::classify::{Nag, NagThresholds, BOOK_NAG_MIN_MOVETIME_MS};
use crate::complexity::{self, ComplexityResult, COMPLEXITY_MINIMUM_TIME_MS};
use crate::config::{ArtistConfig, EvalType};
use crate::engine::{EngineHandle, EvalBreakdown, SearchLimit};
use crate::error::ArtistError;
use crate::format::{open_append, summary_comment, AnalysisHeader, PgnWriter};
use crate::notes::{PositionalNote, KING_SAFETY_MAX_SCORE, MOBILITY_MAX_SCORE};
use crate::record::{AnnotationRecord, Remark};
use crate::tally::{GameSummary, GameTally, ERROR_MIN_FULLMOVE};
use crate::threat::{find_threat, ThreatGate};

/// Longest engine variation written after a move, in plies.
pub const MAX_ENGINE_LINE: usize = 5;

/// Records and statistics of one annotated game.
#[derive(Debug, Clone)]
pub struct GameAnnotation {
    pub records: Vec<AnnotationRecord>,
    pub summary: GameSummary,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PgnRunStats {
    pub games: usize,
    pub annotated: usize,
    pub filtered: usize,
    pub failed: usize,
}

/// What the engine said about the position before the move.
struct BestLine {
    san: String,
    /// White POV pawns.
    score: f64,
    line: String,
    complexity: ComplexityResult,
}

pub struct Annotator<'a> {
    config: &'a ArtistConfig,
    engine: &'a EngineHandle,
    book: Option<&'a PolyglotBook>,
    thresholds: NagThresholds,
}

impl<'a> Annotator<'a> {
    pub fn new(
        config: &'a ArtistConfig,
        engine: &'a EngineHandle,
        book: Option<&'a PolyglotBook>,
    ) -> Self {
        Self {
            config,
            engine,
            book,
            thresholds: NagThresholds::default(),
        }
    }

    pub fn header(&self) -> AnalysisHeader {
        let identity = self.engine.identity();
        let options = &self.config.engine.options;
        match self.config.eval {
            EvalType::Static => AnalysisHeader::Static,
            EvalType::Search => AnalysisHeader::Search {
                hash_mb: identity.capabilities.hash.then(|| options.hash_mb()),
                threads: options.threads(),
                movetime_ms: self.config.movetime_ms,
            },
        }
    }

    /// Annotate every selected game of the input file, appending to the
    /// output file. A game that fails is logged and left out.
    pub async fn annotate_pgn(&self) -> Result<PgnRunStats, ArtistError> {
        let games = PgnGames::open(&self.config.infile)?;
        let mut out = PgnWriter::new(open_append(&self.config.outfile)?);
        let mut records_out = match &self.config.records {
            Some(path) => Some(open_append(path)?),
            None => None,
        };
        let header = self.header();
        let mut stats = PgnRunStats::default();

        for game in games {
            let game = game?;
            stats.games += 1;

            if !self.config.filter.accepts(&game) {
                debug!(game = stats.games, "Game filtered out");
                stats.filtered += 1;
                continue;
            }

            info!(game = stats.games, white = game.white(), black = game.black(), "Annotating game");
            match self.annotate_game(&game).await {
                Ok(annotation) => {
                    self.write_game(&mut out, &game, &header, &annotation)?;
                    if let Some(records_out) = records_out.as_mut() {
                        for record in &annotation.records {
                            serde_json::to_writer(&mut *records_out, record)?;
                            records_out.write_all(b"\n")?;
                        }
                        records_out.flush()?;
                    }
                    stats.annotated += 1;
                }
                Err(e) => {
                    error!(game = stats.games, error = %e, "Game skipped");
                    stats.failed += 1;
                }
            }
        }

        info!(
            games = stats.games,
            annotated = stats.annotated,
            filtered = stats.filtered,
            failed = stats.failed,
            "PGN annotation finished"
        );
        Ok(stats)
    }

    pub fn write_game<W: Write>(
        &self,
        out: &mut PgnWriter<W>,
        game: &GameData,
        header: &AnalysisHeader,
        annotation: &GameAnnotation,
    ) -> Result<(), ArtistError> {
        out.begin_game(game, self.engine.identity(), header)?;
        for record in &annotation.records {
            out.write_move(record)?;
        }
        let scope = self.config.filter.summary_scope(game);
        let summary = summary_comment(&annotation.summary, scope);
        out.end_game(summary.as_deref(), game.result())
    }

    /// Analyze one game. Nothing is written here, so a failure part way
    /// through leaves no partial output.
    pub async fn annotate_game(&self, game: &GameData) -> Result<GameAnnotation, ArtistError> {
        let plies = game.replay()?;
        let trace = game.material_trace()?;
        debug!(balances = ?trace.balances().collect::<Vec<_>>(), "Material balance, white POV");

        self.engine.set_chess960(game.is_chess960()).await?;
        self.engine.new_game().await?;

        let mode = game.castling_mode();
        let mut tally = GameTally::new();
        let mut records = Vec::with_capacity(plies.len());

        for ply in &plies {
            let analyze = self.config.filter.analyzes_move(game, ply.mover)
                && ply.fullmove >= self.config.move_start
                && ply.fullmove <= self.config.move_end
                && !ply.game_over_after;

            let record = if analyze {
                self.annotate_ply(ply, &trace, &mut tally, mode).await?
            } else {
                AnnotationRecord::plain(ply)
            };
            records.push(record);
        }

        Ok(GameAnnotation {
            records,
            summary: tally.summary(),
        })
    }

    async fn annotate_ply(
        &self,
        ply: &Ply,
        trace: &MaterialBalanceTrace,
        tally: &mut GameTally,
        mode: CastlingMode,
    ) -> Result<AnnotationRecord, ArtistError> {
        let mover = ply.mover;
        let mut record = AnnotationRecord::plain(ply);

        if let Some(book) = self.book.filter(|_| ply.fullmove <= BOOK_MOVE_LIMIT) {
            record.book_move = book.lookup(&ply.before, mode)?;
        }

        // the score of the game move, white POV
        let mut eval_after: Option<EvalBreakdown> = None;
        let game_score = match self.config.eval {
            EvalType::Static => {
                let eval = self.engine.static_eval(&ply.fen_after).await?;
                let total = eval.total;
                eval_after = Some(eval);
                total
            }
            EvalType::Search => {
                let reply = self
                    .engine
                    .search(&ply.fen_after, SearchLimit::by_time(self.config.movetime_ms), false)
                    .await?;
                Some(normalize(
                    reply.score.to_centipawns(),
                    mover,
                    true,
                    Perspective::White,
                ))
            }
        };
        record.game_score = game_score;

        let Some(pos_white) = game_score else {
            debug!(san = %ply.san, "No score for the position after the move");
            return Ok(record);
        };
        let pos = relative(mover, pos_white);

        if pos > self.config.min_score_stop && pos < self.config.max_score_stop {
            let best = self.best_line(ply).await?;
            let eng = relative(mover, best.score);
            record.engine_move = Some(best.san);
            record.engine_score = Some(best.score);
            record.engine_line = Some(best.line);
            record.complexity = Some(best.complexity);

            record.nag = if record.played_engine_move() {
                self.thresholds
                    .classify_good(pos, best.complexity, self.config.movetime_ms)
            } else {
                let verdict = self.thresholds.classify_bad(pos, eng);
                if let Some(severity) = verdict.counted {
                    tally.count(mover, severity);
                }
                if self.config.eval == EvalType::Search && ply.fullmove >= ERROR_MIN_FULLMOVE {
                    tally.record_error(mover, eng - pos);
                }
                verdict.nag
            };
            if record.book_move.is_some() && self.config.movetime_ms < BOOK_NAG_MIN_MOVETIME_MS {
                record.nag = Nag::None;
            }

            let gate = ThreatGate {
                move_changes: best.complexity.move_changes,
                played_is_best: record.played_engine_move(),
                check_after: ply.check_after,
                engine_score: best.score,
                mover,
                fullmove: ply.fullmove,
            };
            if gate.is_open() {
                record.threat =
                    find_threat(self.engine, &ply.fen_after, self.config.movetime_ms, mode).await?;
            }
        }

        record.sacrifice = trace.sacrifice_at(ply.index);
        if let Some(sac) = record.sacrifice {
            debug!(side = ?sac.side, pawns = sac.pawns, "Material sacrificed");
        }

        let note_visible = record.book_move.is_none()
            && record.threat.is_none()
            && (record.engine_move.is_none() || record.played_engine_move());
        if note_visible && self.engine.identity().capabilities.eval_breakdown {
            record.note = self.positional_note(ply, pos_white, tally, eval_after).await?;
        }

        if let Some(Remark::Note(note)) = record.remark() {
            tally.use_note(mover, note);
        }
        Ok(record)
    }

    async fn best_line(&self, ply: &Ply) -> Result<BestLine, ArtistError> {
        let sample = self.config.movetime_ms >= COMPLEXITY_MINIMUM_TIME_MS;
        let reply = self
            .engine
            .search(&ply.fen_before, SearchLimit::by_time(self.config.movetime_ms), sample)
            .await?;

        let san = uci_to_san(&ply.before, &reply.best_move)?;
        let score = normalize(reply.score.to_centipawns(), ply.mover, false, Perspective::White);

        let mut pv = reply.pv;
        pv.truncate(MAX_ENGINE_LINE);
        // an odd length ends the line on the mover's own move
        if pv.len() % 2 == 0 {
            pv.pop();
        }
        let line = match uci_line_to_san(&ply.before, &pv) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, pv = ?pv, "Engine line is not playable, keeping the best move only");
                uci_line_to_san(&ply.before, std::slice::from_ref(&reply.best_move))?
            }
        };

        let complexity = if sample {
            complexity::analyze(&reply.samples, ply.before.board())
        } else {
            ComplexityResult::default()
        };
        debug!(
            best = %san,
            score,
            complexity = complexity.complexity,
            move_changes = complexity.move_changes,
            "Engine best move"
        );

        Ok(BestLine {
            san,
            score,
            line,
            complexity,
        })
    }

    /// First applicable note in the order passed pawn, king safety,
    /// mobility. Each kind is given once per side per game.
    async fn positional_note(
        &self,
        ply: &Ply,
        pos_white: f64,
        tally: &GameTally,
        eval_after: Option<EvalBreakdown>,
    ) -> Result<Option<PositionalNote>, ArtistError> {
        let mover = ply.mover;

        if tally.note_available(mover, PositionalNote::PassedPawn) {
            let eval = self.engine.static_eval(&ply.fen_before).await?;
            if PositionalNote::PassedPawn.applies(&eval, mover) {
                return Ok(Some(PositionalNote::PassedPawn));
            }
        }

        let want_king = tally.note_available(mover, PositionalNote::KingSafety)
            && !ply.is_capture
            && pos_white.abs() <= KING_SAFETY_MAX_SCORE;
        let want_mobility = tally.note_available(mover, PositionalNote::Mobility)
            && pos_white.abs() <= MOBILITY_MAX_SCORE;
        if !want_king && !want_mobility {
            return Ok(None);
        }

        let eval = match eval_after {
            Some(eval) => eval,
            None => self.engine.static_eval(&ply.fen_after).await?,
        };
        if want_king && PositionalNote::KingSafety.applies(&eval, mover) {
            return Ok(Some(PositionalNote::KingSafety));
        }
        if want_mobility && PositionalNote::Mobility.applies(&eval, mover) {
            return Ok(Some(PositionalNote::Mobility));
        }
        Ok(None)
    }
}
