//! Network Layer
//!
//! Line-delimited text protocol over TCP: codec, session state machine, and
//! the client loop. All game logic lives in `game/`; this layer only moves
//! events and commands.

pub mod client;
pub mod protocol;
pub mod session;

pub use client::{next_decision, run_session, ClientConfig, ClientError, Connection, GameClient};
pub use protocol::{decode, encode, Command, EncodeError, Event, DELIMITER};
pub use session::{Credentials, Outcome, Session, SessionPhase};
