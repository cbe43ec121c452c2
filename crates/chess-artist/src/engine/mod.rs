pub mod actor;
pub mod options;
pub mod protocol;
pub mod session;

pub use actor::EngineHandle;
pub use options::{EngineOption, EngineOptions, DEFAULT_HASH, DEFAULT_THREADS};
pub use session::{
    Capabilities, EngineFamily, EngineIdentity, EngineReply, EngineSpec, EvalBreakdown,
    SearchLimit, SearchSample, Session,
};
