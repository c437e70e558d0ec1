//! Game State Definitions
//!
//! The occupancy grid for one active game instance. A grid is created fresh
//! on every `game` announcement and discarded on the next one; nothing is
//! carried over between games.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// PLAYER ID
// =============================================================================

/// Unique player identifier assigned by the server.
///
/// `0` is a perfectly valid id on the wire. An empty cell is represented by
/// [`Cell::Empty`], never by a sentinel id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u32);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// CELL
// =============================================================================

/// One cell of the occupancy grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cell {
    /// Nobody occupies the cell.
    #[default]
    Empty,
    /// Occupied by the given player.
    Player(PlayerId),
}

impl Cell {
    /// True if nobody occupies the cell.
    #[inline]
    pub fn is_empty(self) -> bool {
        self == Cell::Empty
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Grid state errors. All of them are absorbed by the session: the attempted
/// mutation is rejected and the grid stays unchanged.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    /// The announced dimensions do not admit a starting position.
    #[error("invalid grid dimensions {width}x{height}")]
    InvalidDimensions {
        /// Announced width.
        width: u32,
        /// Announced height.
        height: u32,
    },

    /// A coordinate lies outside the grid.
    #[error("position ({x}, {y}) outside {width}x{height} grid")]
    OutOfBounds {
        /// Rejected x coordinate.
        x: u32,
        /// Rejected y coordinate.
        y: u32,
        /// Grid width.
        width: u32,
        /// Grid height.
        height: u32,
    },
}

// =============================================================================
// GAME STATE
// =============================================================================

/// The occupancy grid and own identity for one active game.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    /// Grid width in cells. Fixed for the game's duration.
    pub width: u32,
    /// Grid height in cells. Fixed for the game's duration.
    pub height: u32,
    /// Our own player id, assigned by the server at game start.
    pub self_id: PlayerId,
    /// Row-major cell storage, `width * height` entries.
    cells: Vec<Cell>,
}

impl GameState {
    /// Allocate an empty grid and place `self_id` at the geometric center
    /// (integer division). The center is re-checked against the bounds even
    /// though it cannot fall outside them for nonzero dimensions.
    pub fn new(width: u32, height: u32, self_id: PlayerId) -> Result<Self, GridError> {
        if width == 0 || height == 0 {
            return Err(GridError::InvalidDimensions { width, height });
        }

        let mut state = Self {
            width,
            height,
            self_id,
            cells: vec![Cell::Empty; (width as usize) * (height as usize)],
        };

        let (cx, cy) = (width / 2, height / 2);
        if cx >= width || cy >= height {
            return Err(GridError::InvalidDimensions { width, height });
        }
        let index = state.index(cx, cy);
        state.cells[index] = Cell::Player(self_id);

        Ok(state)
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.width as usize) + (x as usize)
    }

    /// True if `(x, y)` lies inside the grid.
    #[inline]
    pub fn in_bounds(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height
    }

    /// The cell at `(x, y)`, or `None` outside the grid.
    pub fn cell(&self, x: u32, y: u32) -> Option<Cell> {
        if self.in_bounds(x, y) {
            Some(self.cells[self.index(x, y)])
        } else {
            None
        }
    }

    /// Record a server-authoritative position update. Later updates overwrite
    /// earlier ones at the same cell (last-writer-wins).
    pub fn update(&mut self, player_id: PlayerId, x: u32, y: u32) -> Result<(), GridError> {
        if !self.in_bounds(x, y) {
            return Err(GridError::OutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        let index = self.index(x, y);
        self.cells[index] = Cell::Player(player_id);
        Ok(())
    }

    /// Locate a player by exhaustive scan. O(width * height), which is fine:
    /// grids are small and this runs at most once per turn.
    pub fn position_of(&self, player_id: PlayerId) -> Option<(u32, u32)> {
        self.cells
            .iter()
            .position(|&cell| cell == Cell::Player(player_id))
            .map(|index| {
                let index = index as u32;
                (index % self.width, index / self.width)
            })
    }

    /// Clear every cell occupied by an eliminated player, keeping the grid
    /// consistent with the set of players still alive. Returns true if at
    /// least one cell was cleared.
    pub fn remove(&mut self, player_id: PlayerId) -> bool {
        let mut cleared = false;
        for cell in &mut self.cells {
            if *cell == Cell::Player(player_id) {
                *cell = Cell::Empty;
                cleared = true;
            }
        }
        cleared
    }

    /// Row-major snapshot of all cells.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }
}

// =============================================================================
// TESTS
// =============================================================================
