//! Baseline Move Policy
//!
//! Neighbor-aware random movement: pick uniformly among the in-bounds, empty
//! neighbor cells, stay put when boxed in. Intentionally non-learned; it keeps
//! the protocol engine runnable standalone. A trained policy may replace the
//! random choice but must treat [`valid_moves_from`] as ground truth for
//! legality.

use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::game::state::GameState;

// =============================================================================
// MOVE
// =============================================================================

/// A single-turn movement decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Move {
    /// Decrease y by one.
    Up,
    /// Increase y by one.
    Down,
    /// Decrease x by one.
    Left,
    /// Increase x by one.
    Right,
    /// Keep the current cell.
    Stay,
}

impl Move {
    /// The four actual directions, excluding `Stay`.
    pub const DIRECTIONS: [Move; 4] = [Move::Up, Move::Right, Move::Down, Move::Left];

    /// Wire name of the move.
    pub fn as_str(self) -> &'static str {
        match self {
            Move::Up => "up",
            Move::Down => "down",
            Move::Left => "left",
            Move::Right => "right",
            Move::Stay => "stay",
        }
    }

    /// The cell this move targets from `(x, y)`, or `None` when it would
    /// leave the non-negative coordinate range. Upper bounds are the grid's
    /// concern, not the move's.
    pub fn target(self, x: u32, y: u32) -> Option<(u32, u32)> {
        match self {
            Move::Up => y.checked_sub(1).map(|y| (x, y)),
            Move::Down => Some((x, y + 1)),
            Move::Left => x.checked_sub(1).map(|x| (x, y)),
            Move::Right => Some((x + 1, y)),
            Move::Stay => Some((x, y)),
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// DECISION
// =============================================================================

/// The directions whose target cell from `(x, y)` is inside the grid and
/// currently empty.
pub fn valid_moves_from(state: &GameState, x: u32, y: u32) -> Vec<Move> {
    Move::DIRECTIONS
        .iter()
        .copied()
        .filter(|direction| {
            direction
                .target(x, y)
                .and_then(|(tx, ty)| state.cell(tx, ty))
                .is_some_and(|cell| cell.is_empty())
        })
        .collect()
}

/// Decide the move for the current turn.
///
/// Unknown own position falls back to a uniformly random direction (never
/// `Stay`; the agent has to move to discover where it is). Otherwise one of
/// the valid directions is chosen uniformly, or `Stay` if there is none.
pub fn decide(state: &GameState, rng: &mut impl Rng) -> Move {
    let Some((x, y)) = state.position_of(state.self_id) else {
        return Move::DIRECTIONS[rng.gen_range(0..Move::DIRECTIONS.len())];
    };

    match valid_moves_from(state, x, y).choose(rng) {
        Some(&direction) => direction,
        None => Move::Stay,
    }
}

// =============================================================================
// TESTS
// =============================================================================
