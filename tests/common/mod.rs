#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use chess_artist::engine::{EngineHandle, Session};
use chess_core::notation::{parse_fen, to_uci};
use shakmaty::{CastlingMode, Position};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// Produces the engine's output lines for one `go` or `eval`, given the
/// FEN of the last `position` command.
pub type Responder = Arc<dyn Fn(&str) -> Vec<String> + Send + Sync>;

/// An in-memory UCI engine driven by two responders. A responder line
/// `#sleep <ms>` pauses the engine instead of being printed, and `#exit`
/// closes it.
pub struct FakeEngine {
    pub name: String,
    pub chess960: bool,
    pub on_go: Responder,
    pub on_eval: Responder,
}

impl FakeEngine {
    /// Plays the first legal move with a fixed score and evaluates every
    /// position as +0.25.
    pub fn first_legal(name: &str, cp: i32) -> Self {
        Self {
            name: name.to_string(),
            chess960: true,
            on_go: Arc::new(move |fen: &str| {
                let mv = first_legal_move(fen);
                vec![
                    format!("info depth 1 score cp {cp} pv {mv}"),
                    format!("info depth 2 score cp {cp} pv {mv}"),
                    format!("bestmove {mv}"),
                ]
            }),
            on_eval: Arc::new(|_: &str| vec!["Final evaluation       +0.25 (white side)".to_string()]),
        }
    }

    pub fn with_go(mut self, on_go: impl Fn(&str) -> Vec<String> + Send + Sync + 'static) -> Self {
        self.on_go = Arc::new(on_go);
        self
    }

    pub fn with_eval(mut self, on_eval: impl Fn(&str) -> Vec<String> + Send + Sync + 'static) -> Self {
        self.on_eval = Arc::new(on_eval);
        self
    }

    /// Run the engine task and complete the handshake against it.
    pub async fn session(self) -> Session {
        let (client, engine) = tokio::io::duplex(64 * 1024);
        let (client_read, client_write) = tokio::io::split(client);
        let (engine_read, mut engine_write) = tokio::io::split(engine);

        tokio::spawn(async move {
            let mut lines = BufReader::new(engine_read).lines();
            let mut fen = String::new();
            while let Ok(Some(cmd)) = lines.next_line().await {
                let out: Vec<String> = if cmd == "uci" {
                    let mut out = vec![format!("id name {}", self.name)];
                    if self.chess960 {
                        out.push("option name UCI_Chess960 type check default false".into());
                    }
                    out.push("uciok".into());
                    out
                } else if cmd == "isready" {
                    vec!["readyok".into()]
                } else if let Some(rest) = cmd.strip_prefix("position fen ") {
                    fen = rest.to_string();
                    Vec::new()
                } else if cmd.starts_with("go") {
                    (self.on_go)(fen.as_str())
                } else if cmd == "eval" {
                    (self.on_eval)(fen.as_str())
                } else if cmd == "quit" {
                    break;
                } else {
                    Vec::new()
                };
                for line in out {
                    if line == "#exit" {
                        return;
                    }
                    if let Some(ms) = line.strip_prefix("#sleep ") {
                        let ms = ms.parse().unwrap_or(0);
                        tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
                        continue;
                    }
                    if engine_write.write_all(format!("{line}\n").as_bytes()).await.is_err() {
                        return;
                    }
                }
            }
        });

        Session::open(BufReader::new(client_read), client_write, None, "fake")
            .await
            .expect("handshake with fake engine")
    }

    pub async fn handle(self) -> EngineHandle {
        EngineHandle::from_session(self.session().await, None)
    }
}

/// First legal move of `fen` in UCI, or `(none)` when there is none.
pub fn first_legal_move(fen: &str) -> String {
    let pos = parse_fen(fen, CastlingMode::Standard).expect("fake engine got a bad FEN");
    pos.legal_moves()
        .first()
        .map(|mv| to_uci(mv, CastlingMode::Standard))
        .unwrap_or_else(|| "(none)".to_string())
}

/// Every legal move of `fen` in UCI, in generation order.
pub fn legal_moves(fen: &str) -> Vec<String> {
    let pos = parse_fen(fen, CastlingMode::Standard).expect("fake engine got a bad FEN");
    pos.legal_moves()
        .iter()
        .map(|mv| to_uci(mv, CastlingMode::Standard))
        .collect()
}

/// Timestamp-based suffix so parallel tests do not share files.
pub fn unique_suffix() -> String {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{}", ts % 1_000_000_000)
}

/// A fresh path in the system temp directory.
pub fn temp_path(stem: &str, ext: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "chess-artist-{stem}-{}-{}.{ext}",
        std::process::id(),
        unique_suffix()
    ))
}

pub const SHORT_GAME: &str = r#"[Event "Casual"]
[Site "?"]
[White "Alice"]
[Black "Bob"]
[Result "1-0"]

1. e4 e5 2. Nf3 Nc6 3. Bc4 Nf6 4. Ng5 d5 5. exd5 Na5 1-0
"#;
