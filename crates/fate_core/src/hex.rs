//! Hex cell addressing with row-parity offset tables.
//!
//! Rows are half-staggered: odd rows sit half a tile to the right of even
//! rows and every row sits half a tile below the previous one. A cell's
//! vertical neighbours are therefore two rows away, and the diagonal
//! neighbours are one row away with a column shift that depends on the
//! parity of the row.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Grid cell coordinate.
///
/// Signed so that off-grid positions can be represented and rejected
/// with a bounds error instead of wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    /// Row index, 0-based.
    pub row: i32,
    /// Column index, 0-based.
    pub col: i32,
}

impl Position {
    /// Create a new position.
    #[must_use]
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// Whether the row is odd (shifted right by half a tile).
    #[must_use]
    pub const fn is_odd_row(self) -> bool {
        self.row.rem_euclid(2) == 1
    }

    /// The cell one step away in `direction`, ignoring grid bounds.
    #[must_use]
    pub const fn step(self, direction: Direction) -> Self {
        let (dr, dc) = offsets_for_row(self.row)[direction.index()];
        Self::new(self.row + dr, self.col + dc)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// The six hex directions, in stable index order.
///
/// The index is what the path search compares to detect a repeated
/// heading, so the order must never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    /// Two rows up.
    North,
    /// One row up, to the right.
    NorthEast,
    /// One row down, to the right.
    SouthEast,
    /// Two rows down.
    South,
    /// One row down, to the left.
    SouthWest,
    /// One row up, to the left.
    NorthWest,
}

impl Direction {
    /// All directions in index order.
    pub const ALL: [Self; 6] = [
        Self::North,
        Self::NorthEast,
        Self::SouthEast,
        Self::South,
        Self::SouthWest,
        Self::NorthWest,
    ];

    /// Stable index 0-5.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Direction for an index, if it is in 0-5.
    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        if index < 6 {
            Some(Self::ALL[index])
        } else {
            None
        }
    }

    /// The direction pointing back the way this one came.
    #[must_use]
    pub const fn opposite(self) -> Self {
        Self::ALL[(self.index() + 3) % 6]
    }
}

/// `(row, col)` offsets for cells on even rows.
pub const EVEN_ROW_OFFSETS: [(i32, i32); 6] = [
    (-2, 0),  // N
    (-1, 0),  // NE
    (1, 0),   // SE
    (2, 0),   // S
    (1, -1),  // SW
    (-1, -1), // NW
];

/// `(row, col)` offsets for cells on odd rows.
pub const ODD_ROW_OFFSETS: [(i32, i32); 6] = [
    (-2, 0), // N
    (-1, 1), // NE
    (1, 1),  // SE
    (2, 0),  // S
    (1, 0),  // SW
    (-1, 0), // NW
];

/// Offset table for the parity of `row`.
#[must_use]
pub const fn offsets_for_row(row: i32) -> &'static [(i32, i32); 6] {
    if row.rem_euclid(2) == 0 {
        &EVEN_ROW_OFFSETS
    } else {
        &ODD_ROW_OFFSETS
    }
}
