//! Protocol Messages
//!
//! Wire format for client-server communication: newline-terminated UTF-8
//! lines, fields joined with `|`, first field is the message kind. No length
//! prefix, no binary framing.
//!
//! Decoding is total. An unrecognized kind becomes [`Event::Unknown`], a
//! recognized kind with bad arity or non-numeric fields becomes
//! [`Event::Malformed`]; neither ever terminates the session.

use thiserror::Error;

use crate::game::policy::Move;
use crate::game::state::PlayerId;

/// Field delimiter inside a protocol line.
pub const DELIMITER: char = '|';

// =============================================================================
// SERVER -> CLIENT EVENTS
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Server greeting, informational.
    Motd {
        /// Greeting text.
        message: String,
    },

    /// A new game begins. Replaces any game in progress.
    Game {
        /// Grid width.
        width: u32,
        /// Grid height.
        height: u32,
        /// Our player id for this game.
        self_id: PlayerId,
    },

    /// A player's position update.
    Pos {
        /// The player that moved.
        player_id: PlayerId,
        /// New x coordinate.
        x: u32,
        /// New y coordinate.
        y: u32,
    },

    /// Turn boundary; exactly one `move` must be sent before the next tick.
    Tick,

    /// The listed players were eliminated.
    Die {
        /// Ids of the eliminated players.
        player_ids: Vec<PlayerId>,
    },

    /// The current game was won.
    Win {
        /// Games won so far this session.
        wins: u32,
        /// Games lost so far this session.
        losses: u32,
    },

    /// The current game was lost.
    Lose {
        /// Games won so far this session.
        wins: u32,
        /// Games lost so far this session.
        losses: u32,
    },

    /// Server-reported error. Informational, never fatal to the session.
    Error {
        /// Error text.
        message: String,
    },

    /// Chat broadcast from another player.
    Message {
        /// Sending player.
        sender: PlayerId,
        /// Chat text.
        text: String,
    },

    /// A kind this client does not know. Logged and ignored.
    Unknown {
        /// Raw kind token.
        kind: String,
        /// Raw fields as received.
        fields: Vec<String>,
    },

    /// A known kind whose fields could not be interpreted.
    Malformed {
        /// Raw kind token.
        kind: String,
        /// Raw fields as received.
        fields: Vec<String>,
        /// Why decoding failed.
        reason: String,
    },
}

/// Decode one protocol line into a typed event. Never fails; see
/// [`Event::Unknown`] and [`Event::Malformed`].
pub fn decode(line: &str) -> Event {
    let line = line.trim_end_matches(['\r', '\n']);
    let mut parts = line.split(DELIMITER);
    let kind = parts.next().unwrap_or_default();
    let fields: Vec<&str> = parts.collect();

    match decode_known(kind, &fields) {
        Ok(Some(event)) => event,
        Ok(None) => Event::Unknown {
            kind: kind.to_string(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
        },
        Err(reason) => Event::Malformed {
            kind: kind.to_string(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
            reason,
        },
    }
}

/// Decode a recognized kind, `Ok(None)` for kinds we do not know.
fn decode_known(kind: &str, fields: &[&str]) -> Result<Option<Event>, String> {
    let event = match kind {
        // Trailing free text may itself contain the delimiter; rejoin it
        // instead of reporting an arity mismatch.
        "motd" => Event::Motd { message: joined_text(kind, fields, 0)? },
        "error" => Event::Error { message: joined_text(kind, fields, 0)? },
        "message" => Event::Message {
            sender: PlayerId(int_field(fields, 0, "senderId")?),
            text: joined_text(kind, fields, 1)?,
        },
        "game" => {
            expect_arity(kind, fields, 3)?;
            Event::Game {
                width: int_field(fields, 0, "width")?,
                height: int_field(fields, 1, "height")?,
                self_id: PlayerId(int_field(fields, 2, "selfId")?),
            }
        }
        "pos" => {
            expect_arity(kind, fields, 3)?;
            Event::Pos {
                player_id: PlayerId(int_field(fields, 0, "playerId")?),
                x: int_field(fields, 1, "x")?,
                y: int_field(fields, 2, "y")?,
            }
        }
        "tick" => {
            expect_arity(kind, fields, 0)?;
            Event::Tick
        }
        "die" => {
            // One trailing field carrying space-joined ids.
            expect_arity(kind, fields, 1)?;
            let player_ids = fields[0]
                .split_whitespace()
                .map(|raw| {
                    raw.parse()
                        .map(PlayerId)
                        .map_err(|_| format!("id `{raw}` is not an integer"))
                })
                .collect::<Result<Vec<_>, _>>()?;
            Event::Die { player_ids }
        }
        "win" => {
            expect_arity(kind, fields, 2)?;
            Event::Win {
                wins: int_field(fields, 0, "wins")?,
                losses: int_field(fields, 1, "losses")?,
            }
        }
        "lose" => {
            expect_arity(kind, fields, 2)?;
            Event::Lose {
                wins: int_field(fields, 0, "wins")?,
                losses: int_field(fields, 1, "losses")?,
            }
        }
        _ => return Ok(None),
    };
    Ok(Some(event))
}

fn expect_arity(kind: &str, fields: &[&str], expected: usize) -> Result<(), String> {
    if fields.len() == expected {
        Ok(())
    } else {
        Err(format!(
            "`{kind}` expects {expected} field(s), got {}",
            fields.len()
        ))
    }
}

fn int_field(fields: &[&str], index: usize, name: &str) -> Result<u32, String> {
    let raw = fields
        .get(index)
        .ok_or_else(|| format!("missing field `{name}`"))?;
    raw.parse()
        .map_err(|_| format!("field `{name}` is not an integer: `{raw}`"))
}

/// Rejoin the fields from `start` onward, requiring at least one.
fn joined_text(kind: &str, fields: &[&str], start: usize) -> Result<String, String> {
    if fields.len() <= start {
        return Err(format!(
            "`{kind}` expects at least {} field(s), got {}",
            start + 1,
            fields.len()
        ));
    }
    Ok(fields[start..].join("|"))
}

// =============================================================================
// CLIENT -> SERVER COMMANDS
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Authenticate with the server.
    Join {
        /// Account name.
        username: String,
        /// Account password.
        password: String,
    },

    /// Answer the current tick with a movement decision.
    Move(Move),

    /// Broadcast a chat message.
    Chat {
        /// Chat text.
        text: String,
    },
}

/// Encoding errors. Hitting one is a caller bug, not a protocol condition.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    /// An argument contains the field delimiter or a line terminator.
    #[error("argument `{0}` contains a protocol delimiter")]
    ReservedCharacter(String),
}

/// Encode an outgoing command as one newline-terminated protocol line.
pub fn encode(command: &Command) -> Result<String, EncodeError> {
    let line = match command {
        Command::Join { username, password } => {
            format!("join|{}|{}\n", checked(username)?, checked(password)?)
        }
        Command::Move(direction) => format!("move|{}\n", direction.as_str()),
        Command::Chat { text } => format!("chat|{}\n", checked(text)?),
    };
    Ok(line)
}

fn checked(argument: &str) -> Result<&str, EncodeError> {
    if argument.contains(DELIMITER) || argument.contains('\n') || argument.contains('\r') {
        Err(EncodeError::ReservedCharacter(argument.to_string()))
    } else {
        Ok(argument)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_decode_motd() {
        assert_eq!(
            decode("motd|Welcome to the arena\n"),
            Event::Motd { message: "Welcome to the arena".to_string() }
        );
    }

    #[test]
    fn test_decode_motd_keeps_embedded_delimiters() {
        assert_eq!(
            decode("motd|rules|be nice\n"),
            Event::Motd { message: "rules|be nice".to_string() }
        );
    }

    #[test]
    fn test_decode_game() {
        assert_eq!(
            decode("game|5|5|3\n"),
            Event::Game { width: 5, height: 5, self_id: PlayerId(3) }
        );
    }

    #[test]
    fn test_decode_pos() {
        assert_eq!(
            decode("pos|3|2|2\n"),
            Event::Pos { player_id: PlayerId(3), x: 2, y: 2 }
        );
    }

    #[test]
    fn test_decode_tick() {
        assert_eq!(decode("tick\n"), Event::Tick);
        assert_eq!(decode("tick"), Event::Tick);
    }

    #[test]
    fn test_decode_tick_with_fields_is_malformed() {
        assert!(matches!(decode("tick|1\n"), Event::Malformed { .. }));
    }

    #[test]
    fn test_decode_die_space_joined() {
        assert_eq!(
            decode("die|4 9 11\n"),
            Event::Die { player_ids: vec![PlayerId(4), PlayerId(9), PlayerId(11)] }
        );
    }

    #[test]
    fn test_decode_die_single_id() {
        assert_eq!(decode("die|7\n"), Event::Die { player_ids: vec![PlayerId(7)] });
    }

    #[test]
    fn test_decode_win_and_lose() {
        assert_eq!(decode("win|3|1\n"), Event::Win { wins: 3, losses: 1 });
        assert_eq!(decode("lose|3|2\n"), Event::Lose { wins: 3, losses: 2 });
    }

    #[test]
    fn test_decode_message_with_pipes_in_text() {
        assert_eq!(
            decode("message|8|hello|world\n"),
            Event::Message { sender: PlayerId(8), text: "hello|world".to_string() }
        );
    }

    #[test]
    fn test_decode_unknown_kind() {
        assert_eq!(
            decode("unknownkind|a|b\n"),
            Event::Unknown {
                kind: "unknownkind".to_string(),
                fields: vec!["a".to_string(), "b".to_string()],
            }
        );
    }

    #[test]
    fn test_decode_non_integer_field_is_malformed() {
        let event = decode("pos|3|two|2\n");
        match event {
            Event::Malformed { kind, reason, .. } => {
                assert_eq!(kind, "pos");
                assert!(reason.contains("x"));
            }
            other => panic!("expected Malformed, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_arity_mismatch_is_malformed() {
        assert!(matches!(decode("game|5|5\n"), Event::Malformed { .. }));
        assert!(matches!(decode("win|3\n"), Event::Malformed { .. }));
        assert!(matches!(decode("die|1|2\n"), Event::Malformed { .. }));
    }

    #[test]
    fn test_encode_join() {
        let line = encode(&Command::Join {
            username: "bot".to_string(),
            password: "hunter2".to_string(),
        })
        .unwrap();
        assert_eq!(line, "join|bot|hunter2\n");
    }

    #[test]
    fn test_encode_move() {
        let line = encode(&Command::Move(Move::Right)).unwrap();
        assert_eq!(line, "move|right\n");
    }

    #[test]
    fn test_encode_rejects_reserved_characters() {
        let err = encode(&Command::Chat { text: "a|b".to_string() }).unwrap_err();
        assert_eq!(err, EncodeError::ReservedCharacter("a|b".to_string()));

        assert!(encode(&Command::Join {
            username: "a\nb".to_string(),
            password: "p".to_string(),
        })
        .is_err());
    }

    proptest! {
        // Decoding arbitrary input must never panic.
        #[test]
        fn prop_decode_total(line in "\\PC*") {
            let _ = decode(&line);
        }

        // Commands survive the wire: decoding an encoded command recovers
        // the kind and fields verbatim (as an Unknown, since these kinds
        // only travel client -> server).
        #[test]
        fn prop_chat_round_trips(text in "[^|\\r\\n]*") {
            let line = encode(&Command::Chat { text: text.clone() }).unwrap();
            prop_assert_eq!(
                decode(&line),
                Event::Unknown { kind: "chat".to_string(), fields: vec![text] }
            );
        }

        #[test]
        fn prop_join_round_trips(user in "[^|\\r\\n]*", pass in "[^|\\r\\n]*") {
            let line = encode(&Command::Join {
                username: user.clone(),
                password: pass.clone(),
            })
            .unwrap();
            prop_assert_eq!(
                decode(&line),
                Event::Unknown { kind: "join".to_string(), fields: vec![user, pass] }
            );
        }
    }
}
