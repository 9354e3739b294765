//! Error types for the tactics core.

use thiserror::Error;

use crate::data::DataLoadError;
use crate::hex::Position;
use crate::unit::UnitId;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all core errors.
///
/// Bounds violations and data-load failures are fatal during setup.
/// The remaining variants are validation failures raised at an input
/// entry point; when one of them is returned no state has changed.
#[derive(Debug, Error)]
pub enum GameError {
    /// A position fell outside the grid.
    #[error("Position {position} is outside the {rows}x{cols} grid")]
    OutOfBounds {
        /// Offending position.
        position: Position,
        /// Grid rows.
        rows: u16,
        /// Grid columns.
        cols: u16,
    },

    /// No unit occupies the given cell.
    #[error("No unit at {0}")]
    NoUnitAt(Position),

    /// The cell already holds a unit.
    #[error("Cell {0} is already occupied")]
    CellOccupied(Position),

    /// The unit handle no longer refers to a unit on the grid.
    #[error("Unit {0} not found")]
    UnitNotFound(UnitId),

    /// The unit belongs to a faction whose turn is not active.
    #[error("Unit {unit} belongs to '{alignment}' but it is {active}'s turn")]
    NotActiveFaction {
        /// Unit that was selected.
        unit: UnitId,
        /// Alignment of the unit.
        alignment: String,
        /// Alignment of the active faction.
        active: String,
    },

    /// The unit is part of an in-flight movement.
    #[error("Unit {0} is already moving")]
    UnitInFlight(UnitId),

    /// The unit is down to zero health and waits for removal.
    #[error("Unit {0} is dead")]
    UnitDead(UnitId),

    /// The unit has no attack with the given name.
    #[error("Unit '{unit}' has no attack named '{attack}'")]
    UnknownAttack {
        /// Unit template name.
        unit: String,
        /// Requested attack name.
        attack: String,
    },

    /// The unit cannot fight because its attack table is empty.
    #[error("Unit '{0}' has no attacks")]
    NoAttacks(String),

    /// The unit is not a side of the pending combat.
    #[error("Unit {0} is not part of the pending combat")]
    NotInCombat(UnitId),

    /// A combat is waiting for attack selection.
    #[error("A combat is pending; confirm or cancel it first")]
    CombatPending,

    /// No combat is waiting for attack selection.
    #[error("No combat is pending")]
    NoCombatPending,

    /// A landing unit found no free cell anywhere on the grid. The unit
    /// stays in flight.
    #[error("No free cell left to place unit {0}")]
    NoFreeCell(UnitId),

    /// A submitted path does not connect the unit to its destination.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// The game configuration cannot be used.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Static data failed to load or a template is missing.
    #[error(transparent)]
    DataLoad(#[from] DataLoadError),
}

impl GameError {
    /// Whether this error is an entry-point validation failure.
    ///
    /// Validation failures leave the session untouched and can be shown
    /// to the player; everything else indicates a setup problem.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        !matches!(
            self,
            Self::OutOfBounds { .. }
                | Self::NoFreeCell(_)
                | Self::InvalidConfig(_)
                | Self::DataLoad(_)
        )
    }
}
