//! Long-lived engine task.
//!
//! The task owns the [`Session`]; callers talk to it through a cloneable
//! [`EngineHandle`]. Requests are served strictly one at a time. After a
//! protocol error the engine gets one `isready`; if it does not answer the
//! process is dropped and, if the handle was started from an
//! [`EngineSpec`], a fresh one is spawned for the next request.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tracing::{error, info, warn};

use super::session::{EngineIdentity, EngineReply, EngineSpec, EvalBreakdown, SearchLimit, Session};
use crate::error::ArtistError;

type Reply<T> = oneshot::Sender<Result<T, ArtistError>>;

enum Request {
    Search {
        fen: String,
        limit: SearchLimit,
        sample: bool,
        reply: Reply<EngineReply>,
    },
    StaticEval {
        fen: String,
        reply: Reply<EvalBreakdown>,
    },
    NewGame {
        reply: Reply<()>,
    },
    SetChess960 {
        enabled: bool,
        reply: Reply<()>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

impl Request {
    fn fail(self, err: ArtistError) {
        match self {
            Request::Search { reply, .. } => {
                let _ = reply.send(Err(err));
            }
            Request::StaticEval { reply, .. } => {
                let _ = reply.send(Err(err));
            }
            Request::NewGame { reply } | Request::SetChess960 { reply, .. } => {
                let _ = reply.send(Err(err));
            }
            Request::Shutdown { reply } => {
                let _ = reply.send(());
            }
        }
    }
}

#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<Request>,
    identity: Arc<EngineIdentity>,
}

impl EngineHandle {
    /// Spawn the engine described by `spec` and start serving requests.
    pub async fn start(spec: EngineSpec) -> Result<Self, ArtistError> {
        let session = Session::spawn(&spec).await?;
        Ok(Self::from_session(session, Some(spec)))
    }

    /// Serve requests from an already opened session. Without a spec a
    /// broken session is not replaced.
    pub fn from_session(session: Session, respawn: Option<EngineSpec>) -> Self {
        let identity = Arc::new(session.identity().clone());
        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(run(session, respawn, rx));
        Self { tx, identity }
    }

    pub fn identity(&self) -> &EngineIdentity {
        &self.identity
    }

    pub async fn search(
        &self,
        fen: &str,
        limit: SearchLimit,
        sample: bool,
    ) -> Result<EngineReply, ArtistError> {
        self.request(|reply| Request::Search {
            fen: fen.to_string(),
            limit,
            sample,
            reply,
        })
        .await
    }

    pub async fn static_eval(&self, fen: &str) -> Result<EvalBreakdown, ArtistError> {
        self.request(|reply| Request::StaticEval {
            fen: fen.to_string(),
            reply,
        })
        .await
    }

    pub async fn new_game(&self) -> Result<(), ArtistError> {
        self.request(|reply| Request::NewGame { reply }).await
    }

    pub async fn set_chess960(&self, enabled: bool) -> Result<(), ArtistError> {
        self.request(|reply| Request::SetChess960 { enabled, reply })
            .await
    }

    /// Quit the engine and wait for the task to finish.
    pub async fn shutdown(&self) {
        let (reply, done) = oneshot::channel();
        if self.tx.send(Request::Shutdown { reply }).await.is_ok() {
            let _ = done.await;
        }
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(Reply<T>) -> Request,
    ) -> Result<T, ArtistError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| ArtistError::EngineGone)?;
        rx.await.map_err(|_| ArtistError::EngineGone)?
    }
}

/// How long a suspect engine gets to answer `isready`.
const PING_TIMEOUT: Duration = Duration::from_secs(5);

fn is_broken<T>(result: &Result<T, ArtistError>) -> bool {
    matches!(result, Err(ArtistError::EngineProtocol(_)))
}

async fn still_answers(session: &mut Session) -> bool {
    matches!(timeout(PING_TIMEOUT, session.ping()).await, Ok(Ok(())))
}

async fn run(session: Session, respawn: Option<EngineSpec>, mut rx: mpsc::Receiver<Request>) {
    let mut session = Some(session);
    let mut chess960 = false;

    while let Some(request) = rx.recv().await {
        if let Request::Shutdown { reply } = request {
            if let Some(s) = session.take() {
                s.close().await;
            }
            let _ = reply.send(());
            break;
        }

        if session.is_none() {
            match reopen(respawn.as_ref(), chess960).await {
                Ok(s) => session = Some(s),
                Err(e) => {
                    error!(error = %e, "Engine restart failed");
                    request.fail(e);
                    continue;
                }
            }
        }
        let Some(s) = session.as_mut() else {
            continue;
        };

        let broken = match request {
            Request::Search {
                fen,
                limit,
                sample,
                reply,
            } => {
                let result = s.search(&fen, limit, sample).await;
                let broken = is_broken(&result);
                let _ = reply.send(result);
                broken
            }
            Request::StaticEval { fen, reply } => {
                let result = s.static_eval(&fen).await;
                let broken = is_broken(&result);
                let _ = reply.send(result);
                broken
            }
            Request::NewGame { reply } => {
                let result = s.new_game().await;
                let broken = is_broken(&result);
                let _ = reply.send(result);
                broken
            }
            Request::SetChess960 { enabled, reply } => {
                chess960 = enabled;
                let result = s.set_chess960(enabled).await;
                let broken = is_broken(&result);
                let _ = reply.send(result);
                broken
            }
            Request::Shutdown { .. } => false,
        };

        if broken {
            if still_answers(s).await {
                warn!("Protocol error, engine still answers isready, keeping it");
            } else {
                warn!("Discarding engine after protocol error");
                session = None;
            }
        }
    }
}

async fn reopen(spec: Option<&EngineSpec>, chess960: bool) -> Result<Session, ArtistError> {
    let spec = spec.ok_or(ArtistError::EngineGone)?;
    info!(path = %spec.path.display(), "Restarting engine");
    let mut session = Session::spawn(spec).await?;
    if chess960 {
        session.set_chess960(true).await?;
    }
    Ok(session)
}
