//! Game Client
//!
//! TCP connection handling and the standalone bot loop. Reads are strictly
//! sequential: one line is decoded and fully dispatched, and any response is
//! flushed, before the next read begins. Nothing is pipelined or reordered.

use std::env;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::network::protocol::{decode, encode, Command, EncodeError};
use crate::network::session::{Credentials, Outcome, Session};

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server hostname or address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Account name for `join`.
    pub username: String,
    /// Account password for `join`.
    pub password: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 4000,
            username: "gridbot".to_string(),
            password: "changeme".to_string(),
        }
    }
}

impl ClientConfig {
    /// Create config from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: env::var("GRIDBOT_HOST").unwrap_or(defaults.host),
            port: env::var("GRIDBOT_PORT")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(defaults.port),
            username: env::var("GRIDBOT_USER").unwrap_or(defaults.username),
            password: env::var("GRIDBOT_PASS").unwrap_or(defaults.password),
        }
    }

    /// The credentials carried by a session built from this config.
    pub fn credentials(&self) -> Credentials {
        Credentials {
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Client errors. Only transport failures cross the session boundary;
/// protocol and semantic errors are absorbed inside the session.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Failed to establish the connection.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        /// Target address.
        addr: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The server closed the connection mid-session.
    #[error("connection closed by server")]
    ConnectionClosed,

    /// I/O failure on an established connection.
    #[error("connection I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An outgoing command could not be encoded.
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    /// No active session; `reset` has not been called.
    #[error("no active session")]
    NotConnected,
}

// =============================================================================
// CONNECTION
// =============================================================================

/// A line-oriented connection to the game server: line-buffered reads,
/// flush-on-write sends.
pub struct Connection<S> {
    reader: BufReader<ReadHalf<S>>,
    writer: WriteHalf<S>,
}

impl<S: AsyncRead + AsyncWrite + Unpin> Connection<S> {
    /// Wrap an established stream.
    pub fn new(stream: S) -> Self {
        let (read_half, write_half) = tokio::io::split(stream);
        Self {
            reader: BufReader::new(read_half),
            writer: write_half,
        }
    }

    /// Read the next protocol line. `Ok(None)` means the server closed the
    /// connection cleanly.
    pub async fn read_line(&mut self) -> Result<Option<String>, ClientError> {
        let mut line = String::new();
        let read = self.reader.read_line(&mut line).await?;
        if read == 0 {
            Ok(None)
        } else {
            debug!("<- {}", line.trim_end());
            Ok(Some(line))
        }
    }

    /// Encode and send one command, flushing immediately.
    pub async fn send(&mut self, command: &Command) -> Result<(), ClientError> {
        let line = encode(command)?;
        debug!("-> {}", line.trim_end());
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

// =============================================================================
// SESSION DRIVING
// =============================================================================

/// Read and dispatch events until the session needs a move or a game ends.
/// `Ok(None)` means the server closed the connection; the session is then
/// `Disconnected`.
pub async fn next_decision<S: AsyncRead + AsyncWrite + Unpin>(
    conn: &mut Connection<S>,
    session: &mut Session,
) -> Result<Option<Outcome>, ClientError> {
    loop {
        let line = match conn.read_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                session.disconnect();
                return Ok(None);
            }
            Err(e) => {
                session.disconnect();
                return Err(e);
            }
        };

        match session.dispatch(decode(&line)) {
            Outcome::MoveRequired => return Ok(Some(Outcome::MoveRequired)),
            outcome @ Outcome::GameOver { .. } => return Ok(Some(outcome)),
            Outcome::Continue | Outcome::GameStarted => {}
        }
    }
}

/// Drive a session over an established connection: authenticate, then play
/// games with the baseline policy until the server closes the connection.
pub async fn run_session<S: AsyncRead + AsyncWrite + Unpin>(
    conn: &mut Connection<S>,
    session: &mut Session,
) -> Result<(), ClientError> {
    let join = session.start();
    conn.send(&join).await?;

    loop {
        match next_decision(conn, session).await? {
            Some(Outcome::MoveRequired) => {
                let decision = session.decide_move();
                conn.send(&Command::Move(decision)).await?;
                session.move_sent();
            }
            // The session already recorded the score; loop back and wait
            // for the next game announcement.
            Some(_) => {}
            None => {
                info!("server closed the connection");
                return Ok(());
            }
        }
    }
}

// =============================================================================
// CLIENT
// =============================================================================

/// The standalone bot: connects, authenticates, and plays games with the
/// baseline policy until the connection drops. Exactly one session at a
/// time; reconnection is the caller's decision.
pub struct GameClient {
    config: ClientConfig,
}

impl GameClient {
    /// Create a client for the given server and credentials.
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    /// The client's configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Establish the TCP connection.
    pub async fn connect(&self) -> Result<Connection<TcpStream>, ClientError> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let stream = TcpStream::connect(&addr)
            .await
            .map_err(|source| ClientError::Connect { addr: addr.clone(), source })?;
        info!("connected to {}", addr);
        Ok(Connection::new(stream))
    }

    /// Run one full session end to end.
    pub async fn run(&self) -> Result<(), ClientError> {
        let mut conn = self.connect().await?;
        let mut session = Session::new(self.config.credentials());
        run_session(&mut conn, &mut session).await
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::policy::Move;
    use crate::network::session::SessionPhase;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};

    fn test_credentials() -> Credentials {
        Credentials {
            username: "bot".to_string(),
            password: "secret".to_string(),
        }
    }

    async fn expect_line(reader: &mut BufReader<tokio::io::ReadHalf<DuplexStream>>) -> String {
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        line
    }

    #[tokio::test]
    async fn test_connection_send_and_read() {
        let (client_end, server_end) = tokio::io::duplex(1024);
        let mut conn = Connection::new(client_end);
        let (server_read, mut server_write) = tokio::io::split(server_end);
        let mut server_reader = BufReader::new(server_read);

        conn.send(&Command::Move(Move::Up)).await.unwrap();
        assert_eq!(expect_line(&mut server_reader).await, "move|up\n");

        server_write.write_all(b"tick\n").await.unwrap();
        assert_eq!(conn.read_line().await.unwrap(), Some("tick\n".to_string()));

        server_write.shutdown().await.unwrap();
        assert_eq!(conn.read_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_run_session_plays_one_move_per_tick() {
        let (client_end, server_end) = tokio::io::duplex(4096);
        let mut session = Session::with_rng_seed(test_credentials(), 11);

        let client = tokio::spawn(async move {
            let mut conn = Connection::new(client_end);
            run_session(&mut conn, &mut session).await.map(|_| session)
        });

        let (server_read, mut server_write) = tokio::io::split(server_end);
        let mut server_reader = BufReader::new(server_read);

        // Authentication
        assert_eq!(expect_line(&mut server_reader).await, "join|bot|secret\n");

        // First game: two ticks, two moves, then a win.
        server_write.write_all(b"motd|welcome\n").await.unwrap();
        server_write.write_all(b"game|5|5|3\n").await.unwrap();
        server_write.write_all(b"pos|3|2|2\n").await.unwrap();
        server_write.write_all(b"tick\n").await.unwrap();

        let first = expect_line(&mut server_reader).await;
        assert!(first.starts_with("move|"), "unexpected line: {first}");

        server_write.write_all(b"pos|4|0|0\ntick\n").await.unwrap();
        let second = expect_line(&mut server_reader).await;
        assert!(second.starts_with("move|"), "unexpected line: {second}");

        server_write.write_all(b"win|1|0\n").await.unwrap();

        // Second game proves the session loops back without reconnecting.
        server_write.write_all(b"game|3|3|0\ntick\n").await.unwrap();
        let third = expect_line(&mut server_reader).await;
        assert!(third.starts_with("move|"), "unexpected line: {third}");

        // Close the connection; the client must end cleanly.
        server_write.shutdown().await.unwrap();
        let session = client.await.unwrap().unwrap();
        assert_eq!(session.phase(), SessionPhase::Disconnected);
        assert_eq!(session.wins(), 1);
    }

    #[tokio::test]
    async fn test_run_session_survives_noise() {
        let (client_end, server_end) = tokio::io::duplex(4096);
        let mut session = Session::with_rng_seed(test_credentials(), 5);

        let client = tokio::spawn(async move {
            let mut conn = Connection::new(client_end);
            run_session(&mut conn, &mut session).await.map(|_| session)
        });

        let (server_read, mut server_write) = tokio::io::split(server_end);
        let mut server_reader = BufReader::new(server_read);
        assert_eq!(expect_line(&mut server_reader).await, "join|bot|secret\n");

        server_write.write_all(b"game|5|5|3\n").await.unwrap();
        server_write
            .write_all(b"unknownkind|a|b\npos|notanint|1|1\nerror|whoops\ntick\n")
            .await
            .unwrap();

        // Despite the noise the tick still gets answered.
        let reply = expect_line(&mut server_reader).await;
        assert!(reply.starts_with("move|"), "unexpected line: {reply}");

        server_write.shutdown().await.unwrap();
        let session = client.await.unwrap().unwrap();
        assert_eq!(session.phase(), SessionPhase::Disconnected);
    }

    #[tokio::test]
    async fn test_connect_failure_is_a_transport_error() {
        // Port 1 on localhost is essentially never listening.
        let client = GameClient::new(ClientConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            ..ClientConfig::default()
        });
        let err = client.run().await.unwrap_err();
        assert!(matches!(err, ClientError::Connect { .. }));
    }
}
