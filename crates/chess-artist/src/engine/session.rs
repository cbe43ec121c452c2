//! One conversation with a UCI engine process (async I/O).

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chess_core::score::RawScore;
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use super::options::EngineOptions;
use super::protocol::{parse_line, EngineEvent, EvalTerm};
use crate::error::ArtistError;

type EngineReader = Box<dyn AsyncBufRead + Unpin + Send>;
type EngineWriter = Box<dyn AsyncWrite + Unpin + Send>;

/// How to start an engine and what to tell it before the first query.
#[derive(Debug, Clone)]
pub struct EngineSpec {
    pub path: PathBuf,
    /// Display name overriding the engine's `id name`.
    pub name: Option<String>,
    pub options: EngineOptions,
}

impl EngineSpec {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            name: None,
            options: EngineOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EngineFamily {
    Stockfish,
    Leela,
    Other,
}

impl EngineFamily {
    fn detect(id_name: &str) -> Self {
        let name = id_name.to_lowercase();
        if name.contains("stockfish") || name.contains("brainfish") {
            EngineFamily::Stockfish
        } else if name.contains("lc0") || name.contains("leela chess zero") {
            EngineFamily::Leela
        } else {
            EngineFamily::Other
        }
    }
}

/// Features negotiated once during the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Capabilities {
    /// `eval` prints a term-by-term table.
    pub eval_breakdown: bool,
    /// Advertises `UCI_Chess960`.
    pub chess960: bool,
    /// Uses a conventional transposition table sized by `Hash`.
    pub hash: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EngineIdentity {
    pub name: String,
    pub family: EngineFamily,
    pub capabilities: Capabilities,
    pub advertised_options: Vec<String>,
}

/// Search limit for one `go` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimit {
    pub movetime_ms: u64,
    pub depth: u32,
}

impl SearchLimit {
    pub fn by_time(movetime_ms: u64) -> Self {
        Self { movetime_ms, depth: 0 }
    }

    pub fn by_depth(depth: u32) -> Self {
        Self { movetime_ms: 0, depth }
    }

    pub fn time_and_depth(movetime_ms: u64, depth: u32) -> Self {
        Self { movetime_ms, depth }
    }

    pub fn go_command(&self) -> Result<String, ArtistError> {
        match (self.movetime_ms, self.depth) {
            (0, 0) => Err(ArtistError::Config(
                "movetime or depth must be greater than zero".into(),
            )),
            (ms, 0) => Ok(format!("go movetime {ms}")),
            (0, d) => Ok(format!("go depth {d}")),
            (ms, d) => Ok(format!("go movetime {ms} depth {d}")),
        }
    }
}

/// A principal move seen while the search was running.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSample {
    pub depth: u32,
    pub elapsed: Duration,
    pub first_move: String,
    pub score: Option<RawScore>,
}

/// Result of one search. Scores are from the side to move.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineReply {
    pub best_move: String,
    pub score: RawScore,
    pub depth: u32,
    pub pv: Vec<String>,
    pub samples: Vec<SearchSample>,
}

/// Output of the `eval` command. All values white POV, in pawns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvalBreakdown {
    pub total: Option<f64>,
    pub terms: Vec<EvalTerm>,
}

impl EvalBreakdown {
    pub fn term(&self, name: &str) -> Option<&EvalTerm> {
        self.terms.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }
}

pub struct Session {
    reader: EngineReader,
    writer: EngineWriter,
    child: Option<Child>,
    identity: EngineIdentity,
    line: String,
}

impl Session {
    /// Start the engine binary, run the handshake and apply the options.
    pub async fn spawn(spec: &EngineSpec) -> Result<Self, ArtistError> {
        spec.options.validate()?;

        let mut child = Command::new(&spec.path)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ArtistError::EngineSpawn {
                path: spec.path.display().to_string(),
                source,
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ArtistError::protocol("engine stdin is not piped"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ArtistError::protocol("engine stdout is not piped"))?;

        let mut session = Self::open(
            BufReader::new(stdout),
            stdin,
            Some(child),
            &file_stem(&spec.path),
        )
        .await?;
        if let Some(name) = &spec.name {
            session.identity.name = name.clone();
        }
        session.configure(&spec.options).await?;

        info!(engine = %session.identity.name, path = %spec.path.display(), "Engine started");
        Ok(session)
    }

    /// Run the `uci` handshake over an already connected stream pair.
    pub async fn open(
        reader: impl AsyncBufRead + Unpin + Send + 'static,
        writer: impl AsyncWrite + Unpin + Send + 'static,
        child: Option<Child>,
        fallback_name: &str,
    ) -> Result<Self, ArtistError> {
        let mut session = Self {
            reader: Box::new(reader),
            writer: Box::new(writer),
            child,
            identity: EngineIdentity {
                name: fallback_name.to_string(),
                family: EngineFamily::Other,
                capabilities: Capabilities::default(),
                advertised_options: Vec::new(),
            },
            line: String::new(),
        };

        session.send("uci").await?;
        let mut id_name = None;
        let mut advertised = Vec::new();
        loop {
            match session.next_event().await? {
                EngineEvent::IdName(name) => id_name = Some(name),
                EngineEvent::OptionName(name) => advertised.push(name),
                EngineEvent::UciOk => break,
                _ => {}
            }
        }

        let name = id_name.unwrap_or_else(|| fallback_name.to_string());
        let family = EngineFamily::detect(&name);
        let has_option = |n: &str| advertised.iter().any(|o| o.eq_ignore_ascii_case(n));
        session.identity = EngineIdentity {
            capabilities: Capabilities {
                eval_breakdown: family == EngineFamily::Stockfish,
                chess960: has_option("UCI_Chess960"),
                hash: family != EngineFamily::Leela,
            },
            name,
            family,
            advertised_options: advertised,
        };

        debug!(identity = ?session.identity, "Handshake complete");
        Ok(session)
    }

    pub fn identity(&self) -> &EngineIdentity {
        &self.identity
    }

    /// Validate and send options, then wait until the engine is ready.
    pub async fn configure(&mut self, options: &EngineOptions) -> Result<(), ArtistError> {
        options.validate()?;
        for option in options.iter() {
            self.send(&option.to_command()).await?;
        }
        self.sync().await
    }

    pub async fn set_chess960(&mut self, enabled: bool) -> Result<(), ArtistError> {
        if !self.identity.capabilities.chess960 {
            if enabled {
                warn!(engine = %self.identity.name, "Engine does not advertise UCI_Chess960");
            }
            return Ok(());
        }
        self.send(&format!("setoption name UCI_Chess960 value {enabled}"))
            .await?;
        self.sync().await
    }

    pub async fn new_game(&mut self) -> Result<(), ArtistError> {
        self.send("ucinewgame").await?;
        self.sync().await
    }

    /// One `isready` round trip.
    pub async fn ping(&mut self) -> Result<(), ArtistError> {
        self.sync().await
    }

    pub async fn set_position(&mut self, fen: &str) -> Result<(), ArtistError> {
        self.send(&format!("position fen {fen}")).await
    }

    /// Search `fen` until `bestmove`. With `sample` set, every exact
    /// main-line PV update is kept in [`EngineReply::samples`].
    pub async fn search(
        &mut self,
        fen: &str,
        limit: SearchLimit,
        sample: bool,
    ) -> Result<EngineReply, ArtistError> {
        let go = limit.go_command()?;
        self.set_position(fen).await?;
        self.send(&go).await?;
        let started = Instant::now();

        let mut score = None;
        let mut depth = 0;
        let mut pv: Vec<String> = Vec::new();
        let mut samples = Vec::new();

        let best_move = loop {
            match self.next_event().await? {
                EngineEvent::Info(info) if info.is_exact_primary() => {
                    if info.score.is_some() {
                        score = info.score;
                    }
                    if let Some(first) = info.pv.first() {
                        depth = info.depth.unwrap_or(depth);
                        if sample {
                            samples.push(SearchSample {
                                depth: info.depth.unwrap_or(0),
                                elapsed: started.elapsed(),
                                first_move: first.clone(),
                                score: info.score,
                            });
                        }
                        pv = info.pv;
                    }
                }
                EngineEvent::BestMove(mv) => break mv,
                _ => {}
            }
        };

        let score = score.ok_or_else(|| {
            ArtistError::protocol(format!("no score reported for position {fen}"))
        })?;

        if pv.first() != Some(&best_move) {
            debug!(best = %best_move, pv = ?pv, "PV does not start with bestmove, replacing");
            pv = vec![best_move.clone()];
        }

        Ok(EngineReply {
            best_move,
            score,
            depth,
            pv,
            samples,
        })
    }

    /// Run `eval` on `fen`. An `isready` is queued behind it so the read
    /// always terminates on `readyok`.
    pub async fn static_eval(&mut self, fen: &str) -> Result<EvalBreakdown, ArtistError> {
        self.set_position(fen).await?;
        self.send("eval").await?;
        self.send("isready").await?;

        let mut total = None;
        let mut terms = Vec::new();
        loop {
            match self.next_event().await? {
                EngineEvent::EvalTerm(term) => terms.push(term),
                EngineEvent::EvalTotal(value) => total = Some(value),
                EngineEvent::ReadyOk => break,
                _ => {}
            }
        }

        let total = total.ok_or_else(|| {
            ArtistError::protocol(format!("no total evaluation for position {fen}"))
        })?;
        Ok(EvalBreakdown { total, terms })
    }

    /// Ask the engine to quit and wait for the process to exit.
    pub async fn close(mut self) {
        let _ = self.send("quit").await;
        if let Some(mut child) = self.child.take() {
            let _ = child.wait().await;
        }
    }

    async fn sync(&mut self) -> Result<(), ArtistError> {
        self.send("isready").await?;
        loop {
            if self.next_event().await? == EngineEvent::ReadyOk {
                return Ok(());
            }
        }
    }

    async fn send(&mut self, cmd: &str) -> Result<(), ArtistError> {
        debug!(cmd, "UCI <");
        self.writer
            .write_all(format!("{cmd}\n").as_bytes())
            .await
            .map_err(|e| ArtistError::protocol(format!("failed to write to engine: {e}")))?;
        self.writer
            .flush()
            .await
            .map_err(|e| ArtistError::protocol(format!("failed to flush engine stdin: {e}")))
    }

    async fn next_event(&mut self) -> Result<EngineEvent, ArtistError> {
        self.line.clear();
        let n = self
            .reader
            .read_line(&mut self.line)
            .await
            .map_err(|e| ArtistError::protocol(format!("failed to read from engine: {e}")))?;
        if n == 0 {
            return Err(ArtistError::protocol("engine closed its output"));
        }
        let trimmed = self.line.trim();
        debug!(line = trimmed, "UCI >");
        Ok(parse_line(trimmed))
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(child) = self.child.as_mut() {
            let _ = child.start_kill();
        }
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
