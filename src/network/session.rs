//! Session State Machine
//!
//! Drives the protocol lifecycle: connect -> authenticate -> await game ->
//! play -> game over -> next game. The machine owns the grid for the current
//! game and is pure with respect to I/O: the driver feeds decoded events in
//! arrival order and acts on the returned [`Outcome`]. Protocol noise and
//! semantic errors are absorbed here and surfaced through `tracing`; only
//! transport failures end a session.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::game::policy::{self, Move};
use crate::game::state::GameState;
use crate::network::protocol::{Command, Event};

// =============================================================================
// PHASE
// =============================================================================

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Connection established, `join` not yet sent.
    Connecting,
    /// `join` sent, waiting for the server to acknowledge with traffic.
    Authenticating,
    /// Authenticated, waiting for a `game` announcement.
    AwaitingGame,
    /// A game is running; ticks must be answered.
    InGame,
    /// Last game finished; equivalent to `AwaitingGame` for dispatch.
    GameOver,
    /// Connection lost or torn down. Terminal.
    Disconnected,
}

// =============================================================================
// OUTCOME
// =============================================================================

/// What the driver must do after dispatching one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing to send; keep reading.
    Continue,
    /// A new game began and the grid was re-initialized.
    GameStarted,
    /// The server closed a turn; exactly one `move` must be sent before the
    /// next event is read.
    MoveRequired,
    /// The current game finished; the session is immediately eligible for
    /// the next `game` announcement.
    GameOver {
        /// Whether we won this game.
        won: bool,
        /// Games won so far this session.
        wins: u32,
        /// Games lost so far this session.
        losses: u32,
    },
}

// =============================================================================
// CREDENTIALS
// =============================================================================

/// Login credentials, immutable for the session's lifetime.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Account name.
    pub username: String,
    /// Account password.
    pub password: String,
}

// =============================================================================
// SESSION
// =============================================================================

/// One authenticated connection lifetime.
///
/// Owns the grid for the active game exclusively; nothing here is shared
/// across sessions.
pub struct Session {
    credentials: Credentials,
    phase: SessionPhase,
    game: Option<GameState>,
    wins: u32,
    losses: u32,
    awaiting_move: bool,
    rng: StdRng,
}

impl Session {
    /// Create a session in the `Connecting` phase.
    pub fn new(credentials: Credentials) -> Self {
        Self::with_rng(credentials, StdRng::from_entropy())
    }

    /// Create a session with a seeded policy RNG, for reproducible play.
    pub fn with_rng_seed(credentials: Credentials, seed: u64) -> Self {
        Self::with_rng(credentials, StdRng::seed_from_u64(seed))
    }

    fn with_rng(credentials: Credentials, rng: StdRng) -> Self {
        Self {
            credentials,
            phase: SessionPhase::Connecting,
            game: None,
            wins: 0,
            losses: 0,
            awaiting_move: false,
            rng,
        }
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Grid of the current (or just-finished) game, if any.
    pub fn game(&self) -> Option<&GameState> {
        self.game.as_ref()
    }

    /// Games won this session.
    pub fn wins(&self) -> u32 {
        self.wins
    }

    /// Games lost this session.
    pub fn losses(&self) -> u32 {
        self.losses
    }

    /// True while a tick is waiting for its move.
    pub fn move_pending(&self) -> bool {
        self.awaiting_move
    }

    /// Begin authentication: transitions `Connecting` to `Authenticating`
    /// and yields the `join` command to send.
    pub fn start(&mut self) -> Command {
        self.phase = SessionPhase::Authenticating;
        Command::Join {
            username: self.credentials.username.clone(),
            password: self.credentials.password.clone(),
        }
    }

    /// Choose the move answering the pending tick with the baseline policy.
    pub fn decide_move(&mut self) -> Move {
        match &self.game {
            Some(state) => policy::decide(state, &mut self.rng),
            // No grid mid-game should not happen; keep moving regardless.
            None => Move::DIRECTIONS[self.rng.gen_range(0..Move::DIRECTIONS.len())],
        }
    }

    /// Mark the pending tick as answered.
    pub fn move_sent(&mut self) {
        self.awaiting_move = false;
    }

    /// Record connection loss or teardown.
    pub fn disconnect(&mut self) {
        self.phase = SessionPhase::Disconnected;
        self.awaiting_move = false;
    }

    /// Dispatch one decoded event, in arrival order.
    pub fn dispatch(&mut self, event: Event) -> Outcome {
        match event {
            Event::Motd { message } => {
                info!("message of the day: {}", message);
                Outcome::Continue
            }

            Event::Game { width, height, self_id } => match GameState::new(width, height, self_id) {
                Ok(state) => {
                    info!(
                        "new game: {}x{} grid, playing as {}",
                        width, height, self_id
                    );
                    self.game = Some(state);
                    self.awaiting_move = false;
                    self.phase = SessionPhase::InGame;
                    Outcome::GameStarted
                }
                Err(e) => {
                    warn!("rejected game announcement: {}", e);
                    Outcome::Continue
                }
            },

            Event::Pos { player_id, x, y } => {
                match &mut self.game {
                    Some(state) => {
                        if let Err(e) = state.update(player_id, x, y) {
                            warn!("rejected position update for {}: {}", player_id, e);
                        }
                    }
                    None => warn!("position update for {} with no active game", player_id),
                }
                Outcome::Continue
            }

            Event::Tick => {
                if self.phase != SessionPhase::InGame {
                    warn!("tick outside an active game");
                    return Outcome::Continue;
                }
                if self.awaiting_move {
                    warn!("server ticked again before the previous move was sent");
                }
                self.awaiting_move = true;
                Outcome::MoveRequired
            }

            Event::Die { player_ids } => {
                match &mut self.game {
                    Some(state) => {
                        for id in &player_ids {
                            if state.remove(*id) {
                                info!("player {} eliminated", id);
                            } else {
                                warn!("eliminated player {} had no known position", id);
                            }
                        }
                    }
                    None => warn!("elimination report with no active game"),
                }
                Outcome::Continue
            }

            Event::Win { wins, losses } => self.finish_game(true, wins, losses),
            Event::Lose { wins, losses } => self.finish_game(false, wins, losses),

            Event::Error { message } => {
                warn!("server error: {}", message);
                Outcome::Continue
            }

            Event::Message { sender, text } => {
                info!("player {} says: {}", sender, text);
                Outcome::Continue
            }

            Event::Unknown { kind, fields } => {
                warn!("unknown event kind `{}` ({} fields)", kind, fields.len());
                Outcome::Continue
            }

            Event::Malformed { kind, reason, .. } => {
                warn!("malformed `{}` event: {}", kind, reason);
                Outcome::Continue
            }
        }
    }

    fn finish_game(&mut self, won: bool, wins: u32, losses: u32) -> Outcome {
        if won {
            info!("game won ({} wins / {} losses)", wins, losses);
        } else {
            info!("game lost ({} wins / {} losses)", wins, losses);
        }
        debug!("awaiting next game announcement");
        self.wins = wins;
        self.losses = losses;
        self.awaiting_move = false;
        self.phase = SessionPhase::GameOver;
        Outcome::GameOver { won, wins, losses }
    }
}

// =============================================================================
// TESTS
// =============================================================================
