//! The game session: input entry points and the per-tick driver.
//!
//! `GameSession` owns the grid, the turn manager, the movement registry
//! and the pending combat. Input arrives through the entry points
//! ([`select_cell`](GameSession::select_cell),
//! [`confirm_move`](GameSession::confirm_move), ...), each of which either
//! validates and applies its effect or returns an error without changing
//! anything. [`tick`](GameSession::tick) advances animations once per
//! frame, and [`snapshot`](GameSession::snapshot) produces what the
//! presentation layer draws.
//!
//! Per-tick order: refresh tile influence, advance movement, remove dead
//! units, bump the tick counter.

use std::collections::hash_map::DefaultHasher;
use std::collections::VecDeque;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::combat::{CombatOutcome, CombatSession, CombatView};
use crate::config::{GameConfig, Scenario};
use crate::data::TemplateRegistry;
use crate::error::{GameError, Result};
use crate::factions::Alignment;
use crate::grid::HexGrid;
use crate::hex::Position;
use crate::math::Vec2Fixed;
use crate::movement::{MovementController, MovementEvent};
use crate::pathfinding::{find_path, Path};
use crate::turn::{TurnManager, TurnReport};
use crate::unit::{StatusEffect, Unit, UnitId};

/// Summary of a unit for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSummary {
    /// Unit handle.
    pub id: UnitId,
    /// Template name.
    pub name: String,
    /// Current alignment.
    pub alignment: Alignment,
    /// Current health.
    pub health: i32,
    /// Maximum health.
    pub max_health: i32,
    /// Remaining movement.
    pub movement: u32,
    /// Whether the unit may still attack.
    pub can_attack: bool,
    /// Active status effects.
    pub statuses: Vec<StatusEffect>,
}

impl From<&Unit> for UnitSummary {
    fn from(unit: &Unit) -> Self {
        Self {
            id: unit.id(),
            name: unit.name.clone(),
            alignment: unit.alignment().clone(),
            health: unit.health,
            max_health: unit.max_health,
            movement: unit.movement(),
            can_attack: unit.can_attack,
            statuses: unit.statuses.iter().copied().collect(),
        }
    }
}

/// One grid cell for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellSnapshot {
    /// Cell position.
    pub position: Position,
    /// Tile template name.
    pub tile: String,
    /// Visible influence on the tile.
    pub alignments: Vec<Alignment>,
    /// Unit standing on the cell.
    pub occupant: Option<UnitSummary>,
}

/// A unit in flight for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationSnapshot {
    /// The moving unit.
    pub unit: UnitSummary,
    /// Current pixel position.
    pub position: Vec2Fixed,
}

/// Everything the presentation layer needs to draw one frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSnapshot {
    /// Ticks elapsed.
    pub tick: u64,
    /// Faction whose turn it is.
    pub active_faction: Alignment,
    /// Current round.
    pub round: u32,
    /// Grid rows.
    pub rows: u16,
    /// Grid columns.
    pub cols: u16,
    /// Cells, row-major.
    pub cells: Vec<CellSnapshot>,
    /// Units in flight.
    pub animations: Vec<AnimationSnapshot>,
    /// Currently selected cell.
    pub selected: Option<Position>,
    /// Pending combat.
    pub combat: Option<CombatView>,
}

/// What one tick changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Tick number just completed.
    pub tick: u64,
    /// Movement events raised this tick.
    pub movement: Vec<MovementEvent>,
    /// Units removed because their health reached zero.
    pub removed: Vec<UnitId>,
}

/// A running game.
#[derive(Debug, Clone)]
pub struct GameSession {
    config: GameConfig,
    registry: TemplateRegistry,
    grid: HexGrid,
    turns: TurnManager,
    movement: MovementController,
    combat: Option<CombatSession>,
    queued_combats: VecDeque<(UnitId, UnitId)>,
    selected: Option<Position>,
    next_unit_id: u64,
    tick: u64,
}

impl GameSession {
    /// Create an empty board filled with the configured default tile.
    ///
    /// # Errors
    ///
    /// Returns an error if the grid would be empty, the tile size is too
    /// large to lay out, no factions are configured, or the default tile
    /// is not a registered template.
    pub fn new(config: GameConfig, registry: TemplateRegistry) -> Result<Self> {
        if config.rows == 0 || config.cols == 0 {
            return Err(GameError::InvalidConfig(format!(
                "grid must have at least one cell, got {}x{}",
                config.rows, config.cols
            )));
        }
        let max_tile_size = HexGrid::max_tile_size(config.rows, config.cols);
        if config.tile_size > max_tile_size {
            return Err(GameError::InvalidConfig(format!(
                "tile size {} exceeds {max_tile_size} for a {}x{} grid",
                config.tile_size, config.rows, config.cols
            )));
        }
        let fill = registry.get_tile(&config.default_tile)?;
        let grid = HexGrid::new(config.rows, config.cols, config.tile_size, &fill);
        let turns = TurnManager::new(config.factions.clone(), config.poison_damage)?;
        let movement = MovementController::new(config.step_duration_ticks);

        tracing::info!(
            rows = config.rows,
            cols = config.cols,
            factions = config.factions.len(),
            "Session created"
        );

        Ok(Self {
            config,
            registry,
            grid,
            turns,
            movement,
            combat: None,
            queued_combats: VecDeque::new(),
            selected: None,
            next_unit_id: 1,
            tick: 0,
        })
    }

    /// Build the opening position of a scenario.
    ///
    /// # Errors
    ///
    /// Fails on any unknown template, off-grid position or doubly
    /// occupied cell.
    pub fn from_scenario(scenario: &Scenario, registry: TemplateRegistry) -> Result<Self> {
        let mut session = Self::new(scenario.config.clone(), registry)?;
        for patch in &scenario.terrain {
            session.set_tiles(&patch.tile, &patch.positions)?;
        }
        for placement in &scenario.units {
            session.spawn_unit(
                &placement.unit,
                placement.position(),
                placement.alignment.clone(),
            )?;
        }
        session.grid.refresh_alignments();
        tracing::info!(scenario = %scenario.name, units = scenario.units.len(), "Scenario loaded");
        Ok(session)
    }

    /// The stock skirmish with the stock templates.
    pub fn skirmish() -> Result<Self> {
        Self::from_scenario(&Scenario::skirmish(), TemplateRegistry::stock()?)
    }

    /// Session configuration.
    #[must_use]
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Loaded templates.
    #[must_use]
    pub const fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    /// The board.
    #[must_use]
    pub const fn grid(&self) -> &HexGrid {
        &self.grid
    }

    /// Turn state.
    #[must_use]
    pub const fn turns(&self) -> &TurnManager {
        &self.turns
    }

    /// In-flight movement.
    #[must_use]
    pub const fn movement(&self) -> &MovementController {
        &self.movement
    }

    /// Pending combat, if any.
    #[must_use]
    pub const fn combat(&self) -> Option<&CombatSession> {
        self.combat.as_ref()
    }

    /// Ticks elapsed.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Currently selected cell.
    #[must_use]
    pub const fn selected(&self) -> Option<Position> {
        self.selected
    }

    /// Look a unit up on the grid or in flight.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.grid
            .unit_by_id(id)
            .or_else(|| self.movement.session(id).map(|s| s.unit()))
    }

    /// Spawn a unit from a template onto an empty cell.
    ///
    /// # Errors
    ///
    /// Fails if the template is unknown, the position is off the grid or
    /// the cell is taken.
    pub fn spawn_unit(
        &mut self,
        template: &str,
        pos: Position,
        alignment: Alignment,
    ) -> Result<UnitId> {
        let data = self.registry.get_unit(template)?;
        if self.grid.unit_at(pos)?.is_some() {
            return Err(GameError::CellOccupied(pos));
        }

        let id = UnitId(self.next_unit_id);
        self.next_unit_id += 1;
        let unit = data.instantiate(id, alignment);
        tracing::info!(unit = %id, template, %pos, alignment = %unit.alignment(), "Unit spawned");
        self.grid.place_unit(pos, Some(unit))?;
        Ok(id)
    }

    /// Overwrite the tile at every listed position.
    ///
    /// Either every position is updated or none is.
    pub fn set_tiles(&mut self, tile: &str, positions: &[Position]) -> Result<()> {
        let template = self.registry.get_tile(tile)?;
        for &pos in positions {
            self.grid.tile_at(pos)?;
        }
        for &pos in positions {
            self.grid.set_tile(pos, template.clone())?;
        }
        Ok(())
    }

    /// Select the unit on a cell, or clear the selection on an empty one.
    ///
    /// # Errors
    ///
    /// Fails if the cell is off the grid or holds a dead unit or one of
    /// another faction; the previous selection is kept.
    pub fn select_cell(&mut self, pos: Position) -> Result<Option<UnitId>> {
        match self.grid.unit_at(pos)? {
            Some(unit) => {
                if !unit.is_alive() {
                    return Err(GameError::UnitDead(unit.id()));
                }
                self.turns.ensure_active(unit)?;
                let id = unit.id();
                self.selected = Some(pos);
                Ok(Some(id))
            }
            None => {
                self.selected = None;
                Ok(None)
            }
        }
    }

    /// Path the unit would take to `destination`, for display.
    ///
    /// Empty if there is no route or the destination is off the grid.
    pub fn preview_path(&mut self, unit: UnitId, destination: Position) -> Result<Path> {
        let origin = self.locate_idle(unit)?;
        self.grid.refresh_alignments();
        let mover = self.grid.unit_by_id(unit).ok_or(GameError::UnitNotFound(unit))?;
        Ok(find_path(&self.grid, origin, destination, mover))
    }

    /// Start moving a unit along a path ending at `destination`.
    ///
    /// # Errors
    ///
    /// Rejected while a combat is pending, if the unit is gone, dead,
    /// already moving or belongs to another faction, or if the path does not lead
    /// from the unit to `destination` through passable neighbouring cells.
    pub fn confirm_move(
        &mut self,
        unit: UnitId,
        destination: Position,
        path: Path,
    ) -> Result<Vec<MovementEvent>> {
        if self.combat.is_some() {
            return Err(GameError::CombatPending);
        }
        let origin = self.locate_idle(unit)?;
        let mover = self.grid.unit_by_id(unit).ok_or(GameError::UnitNotFound(unit))?;
        self.turns.ensure_active(mover)?;

        if path.start() != Some(origin) {
            return Err(GameError::InvalidPath(format!(
                "path must start at the unit's cell {origin}"
            )));
        }
        if path.goal() != Some(destination) {
            return Err(GameError::InvalidPath(format!(
                "path must end at {destination}"
            )));
        }
        if !path.is_contiguous(&self.grid) {
            return Err(GameError::InvalidPath(
                "consecutive cells must be neighbours".to_string(),
            ));
        }
        for &pos in path.positions().iter().skip(1) {
            if self.grid.tile_at(pos)?.is_impassable() {
                return Err(GameError::InvalidPath(format!("{pos} is impassable")));
            }
        }

        self.grid.refresh_alignments();
        let events = self.movement.begin(&mut self.grid, path)?;
        self.selected = None;
        self.handle_movement_events(&events);
        Ok(events)
    }

    /// Choose the attack a side of the pending combat will use.
    pub fn select_attack(&mut self, unit: UnitId, name: &str) -> Result<()> {
        self.ensure_alive(unit)?;
        let combat = self.combat.as_mut().ok_or(GameError::NoCombatPending)?;
        combat.select_attack(&self.grid, unit, name)
    }

    /// Resolve the pending combat.
    ///
    /// A combat whose units have meanwhile disappeared is discarded with
    /// an error. Either way the next queued combat, if any, opens.
    pub fn confirm_attack(&mut self) -> Result<CombatOutcome> {
        let combat = self.combat.take().ok_or(GameError::NoCombatPending)?;
        let outcome = combat.resolve(&mut self.grid);
        self.open_next_combat();
        outcome
    }

    /// Dismiss the pending combat without effect.
    pub fn cancel_attack(&mut self) -> Result<()> {
        let combat = self.combat.take().ok_or(GameError::NoCombatPending)?;
        tracing::debug!(attacker = %combat.attacker(), defender = %combat.defender(), "Combat cancelled");
        self.open_next_combat();
        Ok(())
    }

    /// Hand control to the next faction.
    ///
    /// # Errors
    ///
    /// Rejected while a combat is pending or any unit is still moving.
    pub fn end_turn(&mut self) -> Result<TurnReport> {
        if self.combat.is_some() {
            return Err(GameError::CombatPending);
        }
        if let Some(session) = self.movement.sessions().next() {
            return Err(GameError::UnitInFlight(session.unit().id()));
        }
        self.selected = None;
        Ok(self.turns.end_turn(&mut self.grid))
    }

    /// Advance the game by one tick.
    pub fn tick(&mut self) -> TickReport {
        self.grid.refresh_alignments();
        let movement = self.movement.advance(&mut self.grid);
        self.handle_movement_events(&movement);
        let removed = self
            .grid
            .remove_dead_units()
            .into_iter()
            .map(|(_, unit)| unit.id())
            .collect();
        self.tick += 1;

        TickReport {
            tick: self.tick,
            movement,
            removed,
        }
    }

    /// Current frame for display.
    #[must_use]
    pub fn snapshot(&self) -> FrameSnapshot {
        let cells = self
            .grid
            .cells()
            .map(|(position, tile, unit)| CellSnapshot {
                position,
                tile: tile.name.clone(),
                alignments: tile.alignments.iter().cloned().collect(),
                occupant: unit.map(UnitSummary::from),
            })
            .collect();

        let animations = self
            .movement
            .sessions()
            .filter_map(|session| {
                session.step().map(|step| AnimationSnapshot {
                    unit: UnitSummary::from(session.unit()),
                    position: step.position(),
                })
            })
            .collect();

        FrameSnapshot {
            tick: self.tick,
            active_faction: self.turns.active().clone(),
            round: self.turns.round(),
            rows: self.grid.rows(),
            cols: self.grid.cols(),
            cells,
            animations,
            selected: self.selected,
            combat: self.combat.as_ref().and_then(|c| c.view(&self.grid).ok()),
        }
    }

    /// Hash of the full game state, for determinism checks.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.tick.hash(&mut hasher);
        self.next_unit_id.hash(&mut hasher);
        self.turns.order().index().hash(&mut hasher);
        self.turns.round().hash(&mut hasher);

        for (pos, tile, unit) in self.grid.cells() {
            pos.hash(&mut hasher);
            tile.name.hash(&mut hasher);
            tile.alignments.hash(&mut hasher);
            tile.hidden_alignments.hash(&mut hasher);
            if let Some(unit) = unit {
                hash_unit(unit, &mut hasher);
            }
        }

        for session in self.movement.sessions() {
            hash_unit(session.unit(), &mut hasher);
            session.path().hash(&mut hasher);
            session.index().hash(&mut hasher);
            session.defender().hash(&mut hasher);
            if let Some(step) = session.step() {
                step.elapsed.hash(&mut hasher);
                step.position().hash(&mut hasher);
            }
        }

        if let Some(combat) = &self.combat {
            combat.attacker().hash(&mut hasher);
            combat.defender().hash(&mut hasher);
            combat.selection(combat.attacker()).hash(&mut hasher);
            combat.selection(combat.defender()).hash(&mut hasher);
        }
        self.queued_combats.hash(&mut hasher);

        hasher.finish()
    }

    fn locate_idle(&self, unit: UnitId) -> Result<Position> {
        if self.movement.is_moving(unit) {
            return Err(GameError::UnitInFlight(unit));
        }
        let pos = self.grid.locate(unit).ok_or(GameError::UnitNotFound(unit))?;
        self.ensure_alive(unit)?;
        Ok(pos)
    }

    /// Dead units stay on the grid until the next tick but may not act.
    fn ensure_alive(&self, unit: UnitId) -> Result<()> {
        match self.grid.unit_by_id(unit) {
            Some(u) if !u.is_alive() => Err(GameError::UnitDead(unit)),
            _ => Ok(()),
        }
    }

    fn handle_movement_events(&mut self, events: &[MovementEvent]) {
        for event in events {
            if let MovementEvent::CombatTriggered { attacker, defender } = *event {
                self.queued_combats.push_back((attacker, defender));
            }
        }
        self.open_next_combat();
    }

    fn open_next_combat(&mut self) {
        while self.combat.is_none() {
            let Some((attacker, defender)) = self.queued_combats.pop_front() else {
                return;
            };
            let both_alive = [attacker, defender]
                .iter()
                .all(|&id| self.grid.unit_by_id(id).is_some_and(Unit::is_alive));
            if !both_alive {
                tracing::debug!(%attacker, %defender, "Dropping combat with a missing side");
                continue;
            }
            match CombatSession::open(&self.grid, attacker, defender) {
                Ok(combat) => self.combat = Some(combat),
                Err(e) => tracing::debug!(%attacker, %defender, error = %e, "Combat not opened"),
            }
        }
    }
}

fn hash_unit(unit: &Unit, hasher: &mut impl Hasher) {
    unit.id().hash(hasher);
    unit.name.hash(hasher);
    unit.health.hash(hasher);
    unit.max_health.hash(hasher);
    unit.alignment().hash(hasher);
    unit.movement().hash(hasher);
    unit.can_attack.hash(hasher);
    unit.statuses.hash(hasher);
}
