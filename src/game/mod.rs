//! Game Logic Module
//!
//! Everything the bot knows about one game instance. No I/O here.
//!
//! ## Module Structure
//!
//! - `state`: occupancy grid and player positions
//! - `policy`: baseline neighbor-aware random movement

pub mod policy;
pub mod state;

// Re-export key types
pub use policy::{decide, valid_moves_from, Move};
pub use state::{Cell, GameState, GridError, PlayerId};
