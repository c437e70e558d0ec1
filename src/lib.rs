//! # Gridbot
//!
//! Protocol session engine and baseline bot for a turn-based, grid-world
//! multiplayer game spoken over newline-terminated, pipe-delimited text.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         GRIDBOT                              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  game/           - Game logic (no I/O)                       │
//! │  ├── state.rs    - Occupancy grid, player positions          │
//! │  └── policy.rs   - Baseline neighbor-aware random moves      │
//! │                                                              │
//! │  network/        - Protocol plumbing                         │
//! │  ├── protocol.rs - Event/command types and the line codec    │
//! │  ├── session.rs  - Turn/session state machine                │
//! │  └── client.rs   - TCP connection and bot loop               │
//! │                                                              │
//! │  env.rs          - Gym-style reset/step wrapper              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Data flows one way: raw line -> codec -> typed event -> session dispatch
//! -> grid mutation / move decision -> codec -> raw line out. The engine is
//! strictly sequential: one event is fully dispatched, and its response
//! flushed, before the next read begins. One session per connection; nothing
//! is shared across sessions.
//!
//! ## Robustness Guarantee
//!
//! The decoder is total. Unknown or malformed server lines become events the
//! session logs and skips; only transport failures end a session, and a
//! rejected grid mutation never leaves partial state behind.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod env;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use env::{GameEnv, Observation, Step};
pub use game::policy::{decide, Move};
pub use game::state::{Cell, GameState, GridError, PlayerId};
pub use network::client::{ClientConfig, ClientError, Connection, GameClient};
pub use network::protocol::{decode, encode, Command, EncodeError, Event};
pub use network::session::{Credentials, Outcome, Session, SessionPhase};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
