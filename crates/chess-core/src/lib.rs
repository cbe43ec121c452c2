pub mod epd;
pub mod error;
pub mod game_data;
pub mod material;
pub mod notation;
pub mod pgn;
pub mod score;

pub use error::CoreError;
