pub mod analyzer;
pub mod book;
pub mod classify;
pub mod complexity;
pub mod config;
pub mod engine;
pub mod error;
pub mod format;
pub mod jobs;
pub mod notes;
pub mod record;
pub mod tally;
pub mod threat;

pub use error::ArtistError;
