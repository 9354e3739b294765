//! Turn rotation.
//!
//! Factions act in a fixed cyclic order. Ending a turn hands control to
//! the next faction and refreshes every unit on the board: attacks and
//! movement are restored, and poisoned units take poison damage.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::factions::{Alignment, TurnOrder};
use crate::grid::HexGrid;
use crate::unit::{Unit, UnitId};

/// What happened at a turn rotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnReport {
    /// Faction now acting.
    pub active: Alignment,
    /// Current round.
    pub round: u32,
    /// Units that took poison damage, with the damage dealt.
    pub poisoned: Vec<(UnitId, u32)>,
}

/// Owns the turn order and applies the per-turn refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnManager {
    order: TurnOrder,
    poison_damage: u32,
}

impl TurnManager {
    /// Create a manager for `factions`, first faction to act.
    ///
    /// # Errors
    ///
    /// Returns an error if `factions` is empty.
    pub fn new(factions: Vec<Alignment>, poison_damage: u32) -> Result<Self> {
        let order = TurnOrder::new(factions)
            .ok_or_else(|| GameError::InvalidConfig("at least one faction is required".into()))?;
        Ok(Self {
            order,
            poison_damage,
        })
    }

    /// The turn order.
    #[must_use]
    pub const fn order(&self) -> &TurnOrder {
        &self.order
    }

    /// Faction whose turn it is.
    #[must_use]
    pub fn active(&self) -> &Alignment {
        self.order.active()
    }

    /// Current round, starting at 1.
    #[must_use]
    pub const fn round(&self) -> u32 {
        self.order.round()
    }

    /// Damage applied to poisoned units at each rotation.
    #[must_use]
    pub const fn poison_damage(&self) -> u32 {
        self.poison_damage
    }

    /// Check that `unit` may be given orders this turn.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::NotActiveFaction`] if it belongs to another
    /// faction.
    pub fn ensure_active(&self, unit: &Unit) -> Result<()> {
        if self.order.is_active(unit.alignment()) {
            Ok(())
        } else {
            Err(GameError::NotActiveFaction {
                unit: unit.id(),
                alignment: unit.alignment().to_string(),
                active: self.active().to_string(),
            })
        }
    }

    /// Hand control to the next faction and refresh every unit on the grid.
    ///
    /// Units in flight are not on the grid and are skipped.
    pub fn end_turn(&mut self, grid: &mut HexGrid) -> TurnReport {
        let active = self.order.advance().clone();
        let round = self.order.round();

        let mut poisoned = Vec::new();
        for unit in grid.units_mut() {
            unit.reset_for_turn();
            if unit.is_poisoned() && self.poison_damage > 0 {
                unit.take_damage(self.poison_damage);
                poisoned.push((unit.id(), self.poison_damage));
            }
        }

        tracing::info!(%active, round, poisoned = poisoned.len(), "Turn started");
        TurnReport {
            active,
            round,
            poisoned,
        }
    }
}
