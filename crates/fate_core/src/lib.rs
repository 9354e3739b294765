//! # Fate Core
//!
//! Rules engine for a turn-based hex tactics game.
//!
//! This crate contains **only** game logic:
//! - No rendering
//! - No window or input handling
//! - No system randomness
//! - No floating-point math in the simulation (uses fixed-point)
//!
//! The presentation layer feeds input through [`session::GameSession`],
//! calls [`GameSession::tick`](session::GameSession::tick) once per frame
//! and draws the [`FrameSnapshot`](session::FrameSnapshot) it gets back.
//!
//! ## Crate Structure
//!
//! - [`hex`] - Offset coordinates and the six directions
//! - [`grid`] - The board: tiles, occupancy, movement costs, influence
//! - [`pathfinding`] - Weighted shortest paths
//! - [`movement`] - Step-by-step movement sessions
//! - [`combat`] - Attack exchange between two units
//! - [`turn`] - Faction rotation and per-turn upkeep
//! - [`session`] - Input entry points and the per-tick driver
//! - [`data`] - Tile and unit templates loaded from RON or JSON

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod combat;
pub mod config;
pub mod data;
pub mod error;
pub mod factions;
pub mod grid;
pub mod hex;
pub mod math;
pub mod movement;
pub mod pathfinding;
pub mod session;
pub mod tile;
pub mod turn;
pub mod unit;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::combat::{CombatOutcome, CombatSession, CombatView};
    pub use crate::config::{GameConfig, Scenario, TerrainPatch, UnitPlacement};
    pub use crate::data::{DataLoadError, TemplateRegistry, TileData, UnitData};
    pub use crate::error::{GameError, Result};
    pub use crate::factions::{Alignment, TurnOrder};
    pub use crate::grid::HexGrid;
    pub use crate::hex::{Direction, Position};
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::movement::{MovementController, MovementEvent, StepAnimation};
    pub use crate::pathfinding::{find_path, path_cost, Path};
    pub use crate::session::{FrameSnapshot, GameSession, TickReport, UnitSummary};
    pub use crate::tile::Tile;
    pub use crate::turn::{TurnManager, TurnReport};
    pub use crate::unit::{AttackInfo, AttackTable, StatusEffect, Unit, UnitId};
}
