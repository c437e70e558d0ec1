//! Gym-style Environment
//!
//! `reset`/`step` wrapper exposing the protocol engine to a training harness.
//! The harness supplies the move for each turn; everything else (codec,
//! session phases, grid bookkeeping) stays inside the engine.
//!
//! Between calls a server tick is always pending: `reset` drives the session
//! to the first turn boundary of a fresh game, and each `step` answers the
//! pending turn before driving to the next one. One move per tick is
//! therefore structural, not a convention the caller has to remember.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::net::TcpStream;

use crate::game::policy::Move;
use crate::game::state::{Cell, GameState, PlayerId};
use crate::network::client::{next_decision, ClientConfig, ClientError, Connection, GameClient};
use crate::network::protocol::Command;
use crate::network::session::{Outcome, Session};

// =============================================================================
// OBSERVATION
// =============================================================================

/// A snapshot of the grid handed to the harness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    /// Grid width in cells.
    pub width: u32,
    /// Grid height in cells.
    pub height: u32,
    /// Our player id this game.
    pub self_id: PlayerId,
    /// Row-major cell snapshot.
    pub cells: Vec<Cell>,
    /// Our own cell, if currently known.
    pub self_position: Option<(u32, u32)>,
}

impl From<&GameState> for Observation {
    fn from(state: &GameState) -> Self {
        Self {
            width: state.width,
            height: state.height,
            self_id: state.self_id,
            cells: state.cells().to_vec(),
            self_position: state.position_of(state.self_id),
        }
    }
}

// =============================================================================
// STEP RESULT
// =============================================================================

/// Result of one environment step.
#[derive(Debug, Clone)]
pub struct Step {
    /// Grid snapshot after the turn.
    pub observation: Observation,
    /// 1.0 while play continues, 0.0 at game end. The harness is free to
    /// reshape this.
    pub reward: f64,
    /// True exactly when the session left the game without immediately
    /// re-entering one.
    pub done: bool,
    /// Open metadata mapping.
    pub info: Map<String, Value>,
}

// =============================================================================
// ENVIRONMENT
// =============================================================================

/// A turn-based environment backed by one live game session.
pub struct GameEnv {
    client: GameClient,
    conn: Option<Connection<TcpStream>>,
    session: Session,
}

impl GameEnv {
    /// Create an environment for the given server and credentials. No
    /// connection is made until [`reset`](Self::reset).
    pub fn new(config: ClientConfig) -> Self {
        let session = Session::new(config.credentials());
        Self {
            client: GameClient::new(config),
            conn: None,
            session,
        }
    }

    /// Re-establish the session: connect, authenticate, and block until a
    /// game is running and its first turn is pending. Any previous
    /// connection is dropped.
    pub async fn reset(&mut self) -> Result<Observation, ClientError> {
        self.conn = None;
        let mut conn = self.client.connect().await?;
        let mut session = Session::new(self.client.config().credentials());
        conn.send(&session.start()).await?;

        loop {
            match next_decision(&mut conn, &mut session).await? {
                Some(Outcome::MoveRequired) => break,
                // A game finishing before our first tick just means the
                // server will announce the next one; keep waiting.
                Some(_) => {}
                None => return Err(ClientError::ConnectionClosed),
            }
        }

        let observation = observation_of(&session);
        self.conn = Some(conn);
        self.session = session;
        Ok(observation)
    }

    /// Answer the pending turn with `action`, then drive the session to the
    /// next turn boundary or to game end.
    pub async fn step(&mut self, action: Move) -> Result<Step, ClientError> {
        let conn = self.conn.as_mut().ok_or(ClientError::NotConnected)?;

        conn.send(&Command::Move(action)).await?;
        self.session.move_sent();

        loop {
            match next_decision(conn, &mut self.session).await? {
                Some(Outcome::MoveRequired) => {
                    return Ok(Step {
                        observation: observation_of(&self.session),
                        reward: 1.0,
                        done: false,
                        info: Map::new(),
                    });
                }
                Some(Outcome::GameOver { won, wins, losses }) => {
                    let mut info = Map::new();
                    info.insert("won".to_string(), Value::Bool(won));
                    info.insert("wins".to_string(), Value::from(wins));
                    info.insert("losses".to_string(), Value::from(losses));
                    return Ok(Step {
                        observation: observation_of(&self.session),
                        reward: 0.0,
                        done: true,
                        info,
                    });
                }
                Some(_) => {}
                None => {
                    self.conn = None;
                    return Err(ClientError::ConnectionClosed);
                }
            }
        }
    }

    /// The set of moves that are currently legal for us, the ground truth a
    /// learned policy must respect.
    pub fn valid_moves(&self) -> Vec<Move> {
        let Some(state) = self.session.game() else {
            return Vec::new();
        };
        match state.position_of(state.self_id) {
            Some((x, y)) => crate::game::policy::valid_moves_from(state, x, y),
            None => Move::DIRECTIONS.to_vec(),
        }
    }
}

/// Snapshot the session's grid; empty observation before the first game.
fn observation_of(session: &Session) -> Observation {
    match session.game() {
        Some(state) => Observation::from(state),
        None => Observation {
            width: 0,
            height: 0,
            self_id: PlayerId(0),
            cells: Vec::new(),
            self_position: None,
        },
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;

    #[test]
    fn test_observation_snapshot() {
        let mut state = GameState::new(4, 3, PlayerId(2)).unwrap();
        state.update(PlayerId(5), 0, 0).unwrap();

        let obs = Observation::from(&state);
        assert_eq!(obs.width, 4);
        assert_eq!(obs.height, 3);
        assert_eq!(obs.self_position, Some((2, 1)));
        assert_eq!(obs.cells.len(), 12);
        assert_eq!(obs.cells[0], Cell::Player(PlayerId(5)));
    }

    #[test]
    fn test_observation_serializes() {
        let state = GameState::new(2, 2, PlayerId(0)).unwrap();
        let obs = Observation::from(&state);
        let json = serde_json::to_string(&obs).unwrap();
        let back: Observation = serde_json::from_str(&json).unwrap();
        assert_eq!(obs, back);
    }

    #[tokio::test]
    async fn test_reset_and_step_over_loopback() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        // Scripted server: greet, start a game, tick twice, then end it.
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (read, mut write) = stream.into_split();
            let mut reader = BufReader::new(read);

            let mut join = String::new();
            reader.read_line(&mut join).await.unwrap();
            assert_eq!(join, "join|envbot|pw\n");

            write.write_all(b"motd|hi\ngame|5|5|3\ntick\n").await.unwrap();

            let mut first_move = String::new();
            reader.read_line(&mut first_move).await.unwrap();
            assert!(first_move.starts_with("move|"));

            write.write_all(b"pos|4|0|0\ntick\n").await.unwrap();

            let mut second_move = String::new();
            reader.read_line(&mut second_move).await.unwrap();
            assert!(second_move.starts_with("move|"));

            write.write_all(b"lose|0|1\n").await.unwrap();
        });

        let mut env = GameEnv::new(ClientConfig {
            host: addr.ip().to_string(),
            port: addr.port(),
            username: "envbot".to_string(),
            password: "pw".to_string(),
        });

        let obs = env.reset().await.unwrap();
        assert_eq!((obs.width, obs.height), (5, 5));
        assert_eq!(obs.self_position, Some((2, 2)));
        assert_eq!(env.valid_moves().len(), 4);

        let step = env.step(Move::Right).await.unwrap();
        assert!(!step.done);
        assert_eq!(step.reward, 1.0);
        assert_eq!(step.observation.cells[0], Cell::Player(PlayerId(4)));

        let terminal = env.step(Move::Stay).await.unwrap();
        assert!(terminal.done);
        assert_eq!(terminal.reward, 0.0);
        assert_eq!(terminal.info.get("won"), Some(&Value::Bool(false)));

        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_step_before_reset_fails() {
        let mut env = GameEnv::new(ClientConfig::default());
        let err = env.step(Move::Up).await.unwrap_err();
        assert!(matches!(err, ClientError::NotConnected));
    }
}
