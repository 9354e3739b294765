//! Animated, step-by-step movement along a path.
//!
//! A move is a small state machine. [`MovementController::begin`] checks the
//! departure (proceed, attack or cancel), lifts the unit off the grid and
//! starts the first step. Every [`advance`](MovementController::advance)
//! moves each in-flight animation forward by one tick; when a step
//! completes, the session either starts the next step or lands the unit
//! and, if it was attacking, reports the combat.
//!
//! Nothing on the grid changes while a step is still animating. A unit
//! with nowhere to land stays in flight until a cell frees up.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::grid::HexGrid;
use crate::hex::Position;
use crate::math::{progress, Fixed, Vec2Fixed};
use crate::pathfinding::Path;
use crate::unit::{Unit, UnitId};

/// Something observable that happened during movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovementEvent {
    /// A unit started animating from one cell to the next.
    StepStarted {
        /// Moving unit.
        unit: UnitId,
        /// Cell being left.
        from: Position,
        /// Cell being entered.
        to: Position,
    },
    /// A unit finished its move and was placed on the grid.
    Arrived {
        /// Moving unit.
        unit: UnitId,
        /// Cell it now occupies.
        at: Position,
    },
    /// A move ended next to its target; the two should fight.
    CombatTriggered {
        /// Unit that moved in.
        attacker: UnitId,
        /// Unit being attacked.
        defender: UnitId,
    },
    /// A unit in flight found nowhere to land and will try again next tick.
    Stalled {
        /// Waiting unit.
        unit: UnitId,
        /// Cell it was heading for.
        at: Position,
    },
    /// The move could not start because its departure cell was taken.
    Cancelled {
        /// Unit that stays put.
        unit: UnitId,
        /// Occupied cell that blocked the move.
        blocked_at: Position,
    },
}

/// Interpolation of one step between two pixel positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepAnimation {
    /// Pixel position of the cell being left.
    pub from: Vec2Fixed,
    /// Pixel position of the cell being entered.
    pub to: Vec2Fixed,
    /// Ticks elapsed.
    pub elapsed: u32,
    /// Ticks the step takes.
    pub duration: u32,
}

impl StepAnimation {
    /// Start a new step.
    #[must_use]
    pub const fn new(from: Vec2Fixed, to: Vec2Fixed, duration: u32) -> Self {
        Self {
            from,
            to,
            elapsed: 0,
            duration,
        }
    }

    /// Progress in `[0, 1]`.
    #[must_use]
    pub fn fraction(&self) -> Fixed {
        progress(self.elapsed, self.duration)
    }

    /// Current pixel position.
    #[must_use]
    pub fn position(&self) -> Vec2Fixed {
        self.from.lerp(self.to, self.fraction())
    }

    /// Whether the step has reached its destination.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.fraction() == Fixed::ONE
    }

    /// Advance by one tick.
    pub fn tick(&mut self) {
        self.elapsed = self.elapsed.saturating_add(1);
    }
}

/// A unit in flight.
///
/// The session owns the unit until it lands; while it exists the unit is
/// not on the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct MovementSession {
    unit: Unit,
    path: Path,
    index: usize,
    end_point: usize,
    defender: Option<UnitId>,
    step: Option<StepAnimation>,
}

impl MovementSession {
    /// The unit being moved.
    #[must_use]
    pub const fn unit(&self) -> &Unit {
        &self.unit
    }

    /// Remaining path, truncated at the defender when attacking.
    #[must_use]
    pub const fn path(&self) -> &Path {
        &self.path
    }

    /// Index of the cell the unit is at, or stepping into.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Last index the unit may walk to.
    #[must_use]
    pub const fn end_point(&self) -> usize {
        self.end_point
    }

    /// Whether this move ends in an attack.
    #[must_use]
    pub const fn is_attacking(&self) -> bool {
        self.defender.is_some()
    }

    /// The unit being attacked.
    #[must_use]
    pub const fn defender(&self) -> Option<UnitId> {
        self.defender
    }

    /// The current step, if one is animating.
    #[must_use]
    pub const fn step(&self) -> Option<&StepAnimation> {
        self.step.as_ref()
    }

    fn max_steps(&self) -> usize {
        let movement = usize::try_from(self.unit.movement()).unwrap_or(usize::MAX);
        (self.path.len() - 1).min(movement)
    }
}

/// What the departure check decided.
enum Departure {
    Proceed,
    Attack(UnitId),
    AttackInPlace(UnitId),
    Blocked(Position),
}

/// Where a session stands after trying to move on.
enum Progress {
    InFlight(MovementSession),
    Landed,
    Stalled(MovementSession, GameError),
}

/// Registry of in-flight movements, advanced once per tick.
#[derive(Debug, Clone, PartialEq)]
pub struct MovementController {
    sessions: BTreeMap<UnitId, MovementSession>,
    step_duration: u32,
}

impl MovementController {
    /// Create a controller whose steps take `step_duration` ticks.
    #[must_use]
    pub fn new(step_duration: u32) -> Self {
        Self {
            sessions: BTreeMap::new(),
            step_duration,
        }
    }

    /// Ticks per step.
    #[must_use]
    pub const fn step_duration(&self) -> u32 {
        self.step_duration
    }

    /// Whether the unit is in flight.
    #[must_use]
    pub fn is_moving(&self, id: UnitId) -> bool {
        self.sessions.contains_key(&id)
    }

    /// Whether nothing is in flight.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.sessions.is_empty()
    }

    /// The session moving a unit.
    #[must_use]
    pub fn session(&self, id: UnitId) -> Option<&MovementSession> {
        self.sessions.get(&id)
    }

    /// All sessions in ascending unit id order.
    pub fn sessions(&self) -> impl Iterator<Item = &MovementSession> {
        self.sessions.values()
    }

    /// Current pixel position of every animating unit.
    pub fn animations(&self) -> impl Iterator<Item = (UnitId, Vec2Fixed)> + '_ {
        self.sessions
            .iter()
            .filter_map(|(&id, s)| s.step.as_ref().map(|step| (id, step.position())))
    }

    /// Start moving the unit standing on the first cell of `path`.
    ///
    /// An empty path does nothing. The move walks at most
    /// `min(path.len() - 1, movement)` cells. If the cell that far along
    /// holds an enemy and the unit can still attack, the move becomes an
    /// attack and stops short of the enemy. Any other occupant cancels
    /// the move.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not contiguous or no unit stands on
    /// its first cell.
    pub fn begin(&mut self, grid: &mut HexGrid, mut path: Path) -> Result<Vec<MovementEvent>> {
        let mut events = Vec::new();
        let Some(origin) = path.start() else {
            return Ok(events);
        };
        if !path.is_contiguous(grid) {
            return Err(GameError::InvalidPath(format!(
                "path from {origin} is not a chain of neighbouring cells"
            )));
        }
        let mover = grid.unit_at(origin)?.ok_or(GameError::NoUnitAt(origin))?;
        let id = mover.id();
        if self.sessions.contains_key(&id) {
            return Err(GameError::UnitInFlight(id));
        }

        let movement = usize::try_from(mover.movement()).unwrap_or(usize::MAX);
        let max_steps = (path.len() - 1).min(movement);

        let defender = match Self::check_departure(grid, mover, &path, max_steps)? {
            Departure::Blocked(blocked_at) => {
                tracing::debug!(unit = %id, %blocked_at, "Move cancelled");
                events.push(MovementEvent::Cancelled {
                    unit: id,
                    blocked_at,
                });
                return Ok(events);
            }
            Departure::AttackInPlace(defender) => {
                tracing::info!(attacker = %id, %defender, "Attacking without moving");
                events.push(MovementEvent::CombatTriggered {
                    attacker: id,
                    defender,
                });
                return Ok(events);
            }
            Departure::Attack(defender) => {
                path.truncate(max_steps + 1);
                Some(defender)
            }
            Departure::Proceed => None,
        };
        let end_point = if defender.is_some() {
            path.len() - 2
        } else {
            path.len() - 1
        };

        let Some(unit) = grid.take_unit(origin)? else {
            return Err(GameError::NoUnitAt(origin));
        };
        let session = MovementSession {
            unit,
            path,
            index: 0,
            end_point,
            defender,
            step: None,
        };

        match Self::proceed(session, grid, self.step_duration, &mut events) {
            Progress::InFlight(session) => {
                self.sessions.insert(id, session);
            }
            Progress::Landed => {}
            Progress::Stalled(session, e) => self.hold(session, &e, &mut events),
        }
        Ok(events)
    }

    fn check_departure(
        grid: &HexGrid,
        mover: &Unit,
        path: &Path,
        max_steps: usize,
    ) -> Result<Departure> {
        let hostile_target = |pos: Position| -> Result<Option<UnitId>> {
            Ok(grid
                .unit_at(pos)?
                .filter(|u| u.id() != mover.id() && u.is_alive() && mover.is_hostile_to(u))
                .map(Unit::id))
        };

        if max_steps == 0 && path.len() == 2 && mover.can_attack {
            if let Some(defender) = hostile_target(path.positions()[1])? {
                return Ok(Departure::AttackInPlace(defender));
            }
        }

        let target = path.positions()[max_steps];
        if grid.unit_at(target)?.is_none() {
            return Ok(Departure::Proceed);
        }
        match hostile_target(target)? {
            Some(defender) if mover.can_attack => Ok(Departure::Attack(defender)),
            _ => Ok(Departure::Blocked(target)),
        }
    }

    /// Start the next step, or land the unit.
    fn proceed(
        mut session: MovementSession,
        grid: &mut HexGrid,
        step_duration: u32,
        events: &mut Vec<MovementEvent>,
    ) -> Progress {
        if session.max_steps() > 0 && session.index < session.end_point {
            let from = session.path.positions()[session.index];
            let to = session.path.positions()[session.index + 1];
            let cost = match grid.cost_to_enter(to, &session.unit, true) {
                Ok(cost) => cost,
                Err(e) => return Progress::Stalled(session, e),
            };
            session.unit.spend_movement(cost);
            session.index += 1;
            session.step = Some(StepAnimation::new(
                grid.pixel_center(from),
                grid.pixel_center(to),
                step_duration,
            ));

            let id = session.unit.id();
            tracing::debug!(unit = %id, %from, %to, cost, remaining = session.unit.movement(), "Step");
            events.push(MovementEvent::StepStarted { unit: id, from, to });
            return Progress::InFlight(session);
        }

        Self::land(session, grid, events)
    }

    /// Cell the unit should land on: its target, else the nearest walked
    /// cell, else the nearest free cell anywhere.
    fn landing_cell(session: &MovementSession, grid: &HexGrid) -> Option<Position> {
        let target = session.path.positions()[session.index];
        if grid.in_bounds(target) && !grid.is_occupied(target) {
            return Some(target);
        }
        let fallback = session.path.positions()[..session.index]
            .iter()
            .rev()
            .copied()
            .find(|&p| grid.in_bounds(p) && !grid.is_occupied(p))
            .or_else(|| grid.nearest_free(target));
        if let Some(at) = fallback {
            tracing::warn!(unit = %session.unit.id(), %target, %at, "Arrival cell taken, backing off");
        }
        fallback
    }

    fn land(
        mut session: MovementSession,
        grid: &mut HexGrid,
        events: &mut Vec<MovementEvent>,
    ) -> Progress {
        let id = session.unit.id();
        let Some(at) = Self::landing_cell(&session, grid) else {
            return Progress::Stalled(session, GameError::NoFreeCell(id));
        };
        let defender = session.defender;
        if let Some(unit) = grid.try_place(at, session.unit) {
            session.unit = unit;
            return Progress::Stalled(session, GameError::CellOccupied(at));
        }
        events.push(MovementEvent::Arrived { unit: id, at });

        if let Some(defender) = defender {
            let engaged = grid
                .locate(defender)
                .is_some_and(|pos| grid.are_adjacent(at, pos));
            if engaged {
                tracing::info!(attacker = %id, %defender, "Combat triggered");
                events.push(MovementEvent::CombatTriggered {
                    attacker: id,
                    defender,
                });
            } else {
                tracing::debug!(attacker = %id, %defender, "Defender out of reach on arrival");
            }
        }
        Progress::Landed
    }

    /// Keep the session of a unit that could not move on or land. It stays
    /// in flight and tries again next tick.
    fn hold(
        &mut self,
        session: MovementSession,
        error: &GameError,
        events: &mut Vec<MovementEvent>,
    ) {
        let id = session.unit.id();
        let at = session.path.positions()[session.index];
        tracing::warn!(unit = %id, %at, error = %error, "Movement stalled");
        events.push(MovementEvent::Stalled { unit: id, at });
        self.sessions.insert(id, session);
    }

    /// Advance every in-flight move by one tick, in ascending unit id
    /// order.
    ///
    /// A move that cannot continue does not stop the others; its unit
    /// stays in flight and a [`MovementEvent::Stalled`] is reported.
    pub fn advance(&mut self, grid: &mut HexGrid) -> Vec<MovementEvent> {
        let mut events = Vec::new();
        let ids: Vec<UnitId> = self.sessions.keys().copied().collect();

        for id in ids {
            let Some(session) = self.sessions.get_mut(&id) else {
                continue;
            };
            let complete = match session.step.as_mut() {
                Some(step) => {
                    step.tick();
                    step.is_complete()
                }
                None => true,
            };
            if !complete {
                continue;
            }

            let Some(mut session) = self.sessions.remove(&id) else {
                continue;
            };
            session.step = None;
            match Self::proceed(session, grid, self.step_duration, &mut events) {
                Progress::InFlight(session) => {
                    self.sessions.insert(id, session);
                }
                Progress::Landed => {}
                Progress::Stalled(session, e) => self.hold(session, &e, &mut events),
            }
        }

        events
    }
}
