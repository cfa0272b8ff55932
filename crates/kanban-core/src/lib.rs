pub mod board;
pub mod card;
pub mod config;
pub mod error;
pub mod io;
pub mod loader;
pub mod paths;
pub mod precompile;
pub mod schema;
pub mod store;
pub mod sync;
pub mod timestamp;

pub use error::{KanbanError, Result};
