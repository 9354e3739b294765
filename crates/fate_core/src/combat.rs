//! Combat resolution.
//!
//! A combat opens when a move ends next to an enemy. Each side picks one
//! attack, defaulting to its first, and both attacks land at once: there
//! is no early exit when one side would already be dead. Dead units stay
//! on the grid until the next cleanup.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::grid::HexGrid;
use crate::unit::{AttackInfo, StatusEffect, Unit, UnitId};

/// Result of one exchange of blows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatOutcome {
    /// Unit that initiated the combat.
    pub attacker: UnitId,
    /// Unit that was attacked.
    pub defender: UnitId,
    /// Damage the attacker took.
    pub damage_to_attacker: u32,
    /// Damage the defender took.
    pub damage_to_defender: u32,
    /// Attacker health afterwards, possibly negative.
    pub attacker_health: i32,
    /// Defender health afterwards, possibly negative.
    pub defender_health: i32,
    /// Statuses applied by the exchange.
    pub inflicted: Vec<(UnitId, StatusEffect)>,
}

impl CombatOutcome {
    /// Whether the attacker will be removed.
    #[must_use]
    pub const fn attacker_died(&self) -> bool {
        self.attacker_health <= 0
    }

    /// Whether the defender will be removed.
    #[must_use]
    pub const fn defender_died(&self) -> bool {
        self.defender_health <= 0
    }
}

/// Apply two attacks simultaneously.
///
/// The attacker spends its attack and any remaining movement. The
/// defender's resources are untouched.
pub fn exchange(
    attacker: &mut Unit,
    attacker_attack: &AttackInfo,
    defender: &mut Unit,
    defender_attack: &AttackInfo,
) -> CombatOutcome {
    let damage_to_attacker = defender_attack.total();
    let damage_to_defender = attacker_attack.total();

    attacker.take_damage(damage_to_attacker);
    defender.take_damage(damage_to_defender);

    let mut inflicted = Vec::new();
    for status in defender_attack.inflicted_statuses() {
        if attacker.statuses.insert(status) {
            inflicted.push((attacker.id(), status));
        }
    }
    for status in attacker_attack.inflicted_statuses() {
        if defender.statuses.insert(status) {
            inflicted.push((defender.id(), status));
        }
    }

    attacker.can_attack = false;
    attacker.exhaust_movement();

    CombatOutcome {
        attacker: attacker.id(),
        defender: defender.id(),
        damage_to_attacker,
        damage_to_defender,
        attacker_health: attacker.health,
        defender_health: defender.health,
        inflicted,
    }
}

/// One side of a combat as shown to the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatantView {
    /// The unit.
    pub unit: UnitId,
    /// Template name.
    pub name: String,
    /// Attacks in table order.
    pub attacks: Vec<(String, AttackInfo)>,
    /// Currently selected attack.
    pub selected: String,
}

/// Both sides of a pending combat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatView {
    /// The attacking side.
    pub attacker: CombatantView,
    /// The defending side.
    pub defender: CombatantView,
}

/// A pending combat waiting for attack selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatSession {
    attacker: UnitId,
    defender: UnitId,
    attacker_attack: String,
    defender_attack: String,
}

impl CombatSession {
    /// Open a combat between two units on the grid.
    ///
    /// # Errors
    ///
    /// Returns an error if either unit is missing or has no attacks.
    pub fn open(grid: &HexGrid, attacker: UnitId, defender: UnitId) -> Result<Self> {
        let attacker_attack = default_attack(grid, attacker)?;
        let defender_attack = default_attack(grid, defender)?;
        tracing::debug!(
            %attacker,
            %defender,
            attacker_attack = %attacker_attack,
            defender_attack = %defender_attack,
            "Combat opened"
        );
        Ok(Self {
            attacker,
            defender,
            attacker_attack,
            defender_attack,
        })
    }

    /// The initiating unit.
    #[must_use]
    pub const fn attacker(&self) -> UnitId {
        self.attacker
    }

    /// The attacked unit.
    #[must_use]
    pub const fn defender(&self) -> UnitId {
        self.defender
    }

    /// Whether `unit` is a side of this combat.
    #[must_use]
    pub fn involves(&self, unit: UnitId) -> bool {
        unit == self.attacker || unit == self.defender
    }

    /// Attack currently selected by `unit`.
    #[must_use]
    pub fn selection(&self, unit: UnitId) -> Option<&str> {
        if unit == self.attacker {
            Some(&self.attacker_attack)
        } else if unit == self.defender {
            Some(&self.defender_attack)
        } else {
            None
        }
    }

    /// Choose the attack `unit` will use.
    ///
    /// # Errors
    ///
    /// Returns an error if `unit` is not a side of this combat, is gone,
    /// or has no attack called `name`.
    pub fn select_attack(&mut self, grid: &HexGrid, unit: UnitId, name: &str) -> Result<()> {
        if !self.involves(unit) {
            return Err(GameError::NotInCombat(unit));
        }
        let combatant = grid.unit_by_id(unit).ok_or(GameError::UnitNotFound(unit))?;
        if !combatant.attacks.contains(name) {
            return Err(GameError::UnknownAttack {
                unit: combatant.name.clone(),
                attack: name.to_string(),
            });
        }

        let slot = if unit == self.attacker {
            &mut self.attacker_attack
        } else {
            &mut self.defender_attack
        };
        *slot = name.to_string();
        Ok(())
    }

    /// Resolve the exchange with the current selections.
    ///
    /// # Errors
    ///
    /// Returns an error if either unit has left the grid.
    pub fn resolve(&self, grid: &mut HexGrid) -> Result<CombatOutcome> {
        let attacker_attack = selected_attack(grid, self.attacker, &self.attacker_attack)?;
        let defender_attack = selected_attack(grid, self.defender, &self.defender_attack)?;

        let attacker_pos = grid
            .locate(self.attacker)
            .ok_or(GameError::UnitNotFound(self.attacker))?;
        let defender_pos = grid
            .locate(self.defender)
            .ok_or(GameError::UnitNotFound(self.defender))?;

        // Lift the attacker out so both units can be borrowed at once.
        let Some(mut attacker) = grid.take_unit(attacker_pos)? else {
            return Err(GameError::UnitNotFound(self.attacker));
        };
        let outcome = match grid.unit_at_mut(defender_pos)? {
            Some(defender) => Ok(exchange(
                &mut attacker,
                &attacker_attack,
                defender,
                &defender_attack,
            )),
            None => Err(GameError::UnitNotFound(self.defender)),
        };
        grid.place_unit(attacker_pos, Some(attacker))?;
        let outcome = outcome?;

        tracing::info!(
            attacker = %outcome.attacker,
            defender = %outcome.defender,
            damage_to_attacker = outcome.damage_to_attacker,
            damage_to_defender = outcome.damage_to_defender,
            "Combat resolved"
        );
        Ok(outcome)
    }

    /// Both sides' attack lists and selections.
    pub fn view(&self, grid: &HexGrid) -> Result<CombatView> {
        Ok(CombatView {
            attacker: combatant_view(grid, self.attacker, &self.attacker_attack)?,
            defender: combatant_view(grid, self.defender, &self.defender_attack)?,
        })
    }
}

fn default_attack(grid: &HexGrid, id: UnitId) -> Result<String> {
    let unit = grid.unit_by_id(id).ok_or(GameError::UnitNotFound(id))?;
    unit.attacks
        .first_name()
        .map(str::to_string)
        .ok_or_else(|| GameError::NoAttacks(unit.name.clone()))
}

fn selected_attack(grid: &HexGrid, id: UnitId, name: &str) -> Result<AttackInfo> {
    let unit = grid.unit_by_id(id).ok_or(GameError::UnitNotFound(id))?;
    unit.attacks
        .get(name)
        .cloned()
        .ok_or_else(|| GameError::UnknownAttack {
            unit: unit.name.clone(),
            attack: name.to_string(),
        })
}

fn combatant_view(grid: &HexGrid, id: UnitId, selected: &str) -> Result<CombatantView> {
    let unit = grid.unit_by_id(id).ok_or(GameError::UnitNotFound(id))?;
    Ok(CombatantView {
        unit: id,
        name: unit.name.clone(),
        attacks: unit
            .attacks
            .iter()
            .map(|(name, info)| (name.to_string(), info.clone()))
            .collect(),
        selected: selected.to_string(),
    })
}
