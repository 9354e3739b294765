//! The hex board: one tile and at most one unit per cell.
//!
//! Cells are stored row-major in a fixed-size vector. A cell owns its
//! occupant, so "at most one unit per cell" holds by construction; moving
//! a unit means taking it out of one slot and placing it into another.

use std::collections::{BTreeSet, VecDeque};

use crate::error::{GameError, Result};
use crate::hex::{offsets_for_row, Direction, Position};
use crate::math::{Fixed, Vec2Fixed};
use crate::tile::Tile;
use crate::unit::{Unit, UnitId};

/// Cost reported for tiles that can never be entered.
pub const IMPASSABLE_COST: u32 = u32::MAX;

#[derive(Debug, Clone, PartialEq)]
struct Cell {
    tile: Tile,
    unit: Option<Unit>,
}

/// Rectangular hex grid with row-parity adjacency.
#[derive(Debug, Clone, PartialEq)]
pub struct HexGrid {
    rows: u16,
    cols: u16,
    tile_size: Fixed,
    cells: Vec<Cell>,
}

impl HexGrid {
    /// Create a grid with every cell set to a copy of `fill`.
    #[must_use]
    pub fn new(rows: u16, cols: u16, tile_size: u32, fill: &Tile) -> Self {
        let count = usize::from(rows) * usize::from(cols);
        let cells = (0..count)
            .map(|_| Cell {
                tile: fill.clone(),
                unit: None,
            })
            .collect();
        Self {
            rows,
            cols,
            tile_size: Fixed::saturating_from_num(tile_size),
            cells,
        }
    }

    /// Largest tile size whose pixel layout fits in [`Fixed`] for a grid
    /// of this shape.
    #[must_use]
    pub fn max_tile_size(rows: u16, cols: u16) -> u32 {
        // Widest intermediate products in `pixel_center` are `row * ts * 17`
        // and `col * ts * 3`.
        let span = (u64::from(rows) * 17).max(u64::from(cols) * 3).max(3);
        let limit = u64::from(i32::MAX.unsigned_abs()) / span;
        u32::try_from(limit).unwrap_or(u32::MAX)
    }

    /// Number of rows.
    #[must_use]
    pub const fn rows(&self) -> u16 {
        self.rows
    }

    /// Number of columns.
    #[must_use]
    pub const fn cols(&self) -> u16 {
        self.cols
    }

    /// Tile size in pixels.
    #[must_use]
    pub const fn tile_size(&self) -> Fixed {
        self.tile_size
    }

    /// Check if a position lies on the grid.
    #[must_use]
    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.row >= 0
            && pos.col >= 0
            && pos.row < i32::from(self.rows)
            && pos.col < i32::from(self.cols)
    }

    #[inline]
    fn index(&self, pos: Position) -> Option<usize> {
        if !self.in_bounds(pos) {
            return None;
        }
        let row = usize::try_from(pos.row).ok()?;
        let col = usize::try_from(pos.col).ok()?;
        Some(row * usize::from(self.cols) + col)
    }

    fn checked_index(&self, pos: Position) -> Result<usize> {
        self.index(pos).ok_or(GameError::OutOfBounds {
            position: pos,
            rows: self.rows,
            cols: self.cols,
        })
    }

    fn position_of(&self, index: usize) -> Position {
        let cols = usize::from(self.cols).max(1);
        // Indices are bounded by rows * cols, which fits in i32.
        Position::new((index / cols) as i32, (index % cols) as i32)
    }

    /// All positions in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.cells.len()).map(|i| self.position_of(i))
    }

    /// In-bounds neighbours of `pos`, each tagged with the direction
    /// taken to reach it. Directions keep their stable indices; missing
    /// entries are simply skipped at the edges.
    pub fn neighbors(&self, pos: Position) -> Result<Vec<(Position, Direction)>> {
        self.checked_index(pos)?;
        Ok(self.neighbors_in_bounds(pos).collect())
    }

    fn neighbors_in_bounds(&self, pos: Position) -> impl Iterator<Item = (Position, Direction)> + '_ {
        offsets_for_row(pos.row)
            .iter()
            .zip(Direction::ALL)
            .map(move |(&(dr, dc), dir)| (Position::new(pos.row + dr, pos.col + dc), dir))
            .filter(|(p, _)| self.in_bounds(*p))
    }

    /// Whether `a` and `b` are adjacent cells.
    #[must_use]
    pub fn are_adjacent(&self, a: Position, b: Position) -> bool {
        self.in_bounds(a) && self.neighbors_in_bounds(a).any(|(p, _)| p == b)
    }

    /// Movement spent by `mover` to enter `tile`.
    ///
    /// Plain terrain costs 1 and difficult terrain 2. A tile next to a
    /// hostile unit costs the mover's whole base speed, which ends its
    /// move there. Hidden influence only counts when `count_hidden` is set.
    /// Impassable terrain costs [`IMPASSABLE_COST`].
    #[must_use]
    pub fn move_cost(tile: &Tile, mover: &Unit, count_hidden: bool) -> u32 {
        if tile.is_impassable() {
            return IMPASSABLE_COST;
        }
        if tile.is_contested_for(mover.alignment(), count_hidden) {
            return mover.speed;
        }
        if tile.is_difficult() {
            2
        } else {
            1
        }
    }

    /// [`move_cost`](Self::move_cost) for the tile at `pos`.
    pub fn cost_to_enter(&self, pos: Position, mover: &Unit, count_hidden: bool) -> Result<u32> {
        Ok(Self::move_cost(self.tile_at(pos)?, mover, count_hidden))
    }

    /// Tile at a position.
    pub fn tile_at(&self, pos: Position) -> Result<&Tile> {
        let i = self.checked_index(pos)?;
        Ok(&self.cells[i].tile)
    }

    /// Replace the tile at a position.
    ///
    /// Influence on the new tile is empty until the next refresh.
    pub fn set_tile(&mut self, pos: Position, tile: Tile) -> Result<()> {
        let i = self.checked_index(pos)?;
        self.cells[i].tile = tile;
        Ok(())
    }

    /// Occupant of a cell, if any.
    pub fn unit_at(&self, pos: Position) -> Result<Option<&Unit>> {
        let i = self.checked_index(pos)?;
        Ok(self.cells[i].unit.as_ref())
    }

    /// Mutable occupant of a cell, if any.
    pub fn unit_at_mut(&mut self, pos: Position) -> Result<Option<&mut Unit>> {
        let i = self.checked_index(pos)?;
        Ok(self.cells[i].unit.as_mut())
    }

    /// Whether a cell is on the grid and holds a unit.
    #[must_use]
    pub fn is_occupied(&self, pos: Position) -> bool {
        self.index(pos).is_some_and(|i| self.cells[i].unit.is_some())
    }

    /// Set the occupant of a cell, returning the previous one.
    pub fn place_unit(&mut self, pos: Position, unit: Option<Unit>) -> Result<Option<Unit>> {
        let i = self.checked_index(pos)?;
        Ok(std::mem::replace(&mut self.cells[i].unit, unit))
    }

    /// Put a unit into an empty cell.
    ///
    /// Hands the unit back if the cell is off the grid or already taken.
    #[must_use]
    pub fn try_place(&mut self, pos: Position, unit: Unit) -> Option<Unit> {
        match self.index(pos) {
            Some(i) if self.cells[i].unit.is_none() => {
                self.cells[i].unit = Some(unit);
                None
            }
            _ => Some(unit),
        }
    }

    /// Remove and return the occupant of a cell.
    pub fn take_unit(&mut self, pos: Position) -> Result<Option<Unit>> {
        let i = self.checked_index(pos)?;
        Ok(self.cells[i].unit.take())
    }

    /// Rebuild tile influence from current occupancy.
    ///
    /// Every occupant projects its alignment onto each neighbouring tile:
    /// into `hidden_alignments` if it is hidden, otherwise `alignments`.
    pub fn refresh_alignments(&mut self) {
        for cell in &mut self.cells {
            cell.tile.clear_influence();
        }

        let sources: Vec<_> = self
            .cells
            .iter()
            .enumerate()
            .filter_map(|(i, cell)| {
                cell.unit
                    .as_ref()
                    .map(|u| (self.position_of(i), u.alignment().clone(), u.is_hidden()))
            })
            .collect();

        for (pos, alignment, hidden) in sources {
            let targets: Vec<_> = self.neighbors_in_bounds(pos).map(|(p, _)| p).collect();
            for target in targets {
                if let Some(i) = self.index(target) {
                    let tile = &mut self.cells[i].tile;
                    if hidden {
                        tile.hidden_alignments.insert(alignment.clone());
                    } else {
                        tile.alignments.insert(alignment.clone());
                    }
                }
            }
        }
    }

    /// Cell holding the unit with this id.
    #[must_use]
    pub fn locate(&self, id: UnitId) -> Option<Position> {
        self.cells
            .iter()
            .position(|c| c.unit.as_ref().is_some_and(|u| u.id() == id))
            .map(|i| self.position_of(i))
    }

    /// Unit with this id, if it is on the grid.
    #[must_use]
    pub fn unit_by_id(&self, id: UnitId) -> Option<&Unit> {
        self.cells
            .iter()
            .filter_map(|c| c.unit.as_ref())
            .find(|u| u.id() == id)
    }

    /// Mutable unit with this id, if it is on the grid.
    pub fn unit_by_id_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.cells
            .iter_mut()
            .filter_map(|c| c.unit.as_mut())
            .find(|u| u.id() == id)
    }

    /// Units on the grid with their positions, row-major.
    pub fn units(&self) -> impl Iterator<Item = (Position, &Unit)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.unit.as_ref().map(|u| (self.position_of(i), u)))
    }

    /// Mutable units on the grid, row-major.
    pub fn units_mut(&mut self) -> impl Iterator<Item = &mut Unit> + '_ {
        self.cells.iter_mut().filter_map(|c| c.unit.as_mut())
    }

    /// Tiles with their positions and occupants, row-major.
    pub fn cells(&self) -> impl Iterator<Item = (Position, &Tile, Option<&Unit>)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(|(i, c)| (self.position_of(i), &c.tile, c.unit.as_ref()))
    }

    /// Remove every unit with health at or below zero.
    pub fn remove_dead_units(&mut self) -> Vec<(Position, Unit)> {
        let dead: Vec<usize> = self
            .cells
            .iter()
            .enumerate()
            .filter(|(_, c)| c.unit.as_ref().is_some_and(|u| !u.is_alive()))
            .map(|(i, _)| i)
            .collect();

        dead.into_iter()
            .filter_map(|i| {
                let unit = self.cells[i].unit.take()?;
                let pos = self.position_of(i);
                tracing::info!(unit = %unit.id(), name = %unit.name, %pos, "Unit destroyed");
                Some((pos, unit))
            })
            .collect()
    }

    /// Closest unoccupied cell to `pos` by step count, `pos` included.
    ///
    /// Breadth-first in direction order, so the result is deterministic.
    #[must_use]
    pub fn nearest_free(&self, pos: Position) -> Option<Position> {
        if !self.in_bounds(pos) {
            return None;
        }
        let mut seen = BTreeSet::from([pos]);
        let mut queue = VecDeque::from([pos]);
        while let Some(current) = queue.pop_front() {
            if !self.is_occupied(current) {
                return Some(current);
            }
            for (next, _) in self.neighbors_in_bounds(current) {
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        None
    }

    /// Pixel anchor of a cell.
    ///
    /// Columns are 1.5 tiles apart and rows 0.425 tiles apart; odd rows
    /// are shifted right by 0.75 tiles.
    #[must_use]
    pub fn pixel_center(&self, pos: Position) -> Vec2Fixed {
        let ts = self.tile_size;
        let mut x = Fixed::from_num(pos.col)
            .saturating_mul(ts)
            .saturating_mul(Fixed::from_num(3))
            / Fixed::from_num(2);
        if pos.is_odd_row() {
            x = x.saturating_add(ts.saturating_mul(Fixed::from_num(3)) / Fixed::from_num(4));
        }
        let y = Fixed::from_num(pos.row)
            .saturating_mul(ts)
            .saturating_mul(Fixed::from_num(17))
            / Fixed::from_num(40);
        Vec2Fixed::new(x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factions::Alignment;
    use crate::tile::TRAIT_DIFFICULT;
    use crate::unit::{AttackInfo, AttackTable, StatusEffect};

    fn blank() -> Tile {
        Tile::new("blank", "", Vec::new())
    }

    fn difficult() -> Tile {
        Tile::new("difficult", "", vec![TRAIT_DIFFICULT.to_string()])
    }

    fn grid() -> HexGrid {
        HexGrid::new(26, 10, 80, &blank())
    }

    fn slime(id: u64, alignment: &str) -> Unit {
        let attacks = AttackTable::new().with("bite", AttackInfo::new(3, 2));
        Unit::new(UnitId(id), "slime", 10, 3, attacks, Alignment::new(alignment))
    }

    #[test]
    fn test_interior_has_six_distinct_neighbours() {
        let grid = grid();
        for pos in [Position::new(4, 4), Position::new(5, 4)] {
            let neighbours = grid.neighbors(pos).unwrap();
            assert_eq!(neighbours.len(), 6);
            let dirs: BTreeSet<_> = neighbours.iter().map(|(_, d)| d.index()).collect();
            assert_eq!(dirs, (0..6).collect());
        }
    }

    #[test]
    fn test_corner_keeps_direction_indices() {
        let grid = grid();
        let neighbours = grid.neighbors(Position::new(0, 0)).unwrap();
        assert_eq!(
            neighbours,
            vec![
                (Position::new(1, 0), Direction::SouthEast),
                (Position::new(2, 0), Direction::South),
            ]
        );
    }

    #[test]
    fn test_out_of_bounds_errors() {
        let mut grid = grid();
        let outside = Position::new(26, 0);
        assert!(matches!(
            grid.neighbors(outside),
            Err(GameError::OutOfBounds { rows: 26, cols: 10, .. })
        ));
        assert!(grid.tile_at(Position::new(-1, 3)).is_err());
        assert!(grid.place_unit(outside, Some(slime(1, "white"))).is_err());
        assert!(grid.take_unit(Position::new(0, 10)).is_err());
        assert!(!grid.is_occupied(outside));
    }

    #[test]
    fn test_move_cost() {
        let mover = slime(1, "white");
        assert_eq!(HexGrid::move_cost(&blank(), &mover, false), 1);
        assert_eq!(HexGrid::move_cost(&difficult(), &mover, false), 2);

        let mut friendly = difficult();
        friendly.alignments.insert(Alignment::new("white"));
        assert_eq!(HexGrid::move_cost(&friendly, &mover, true), 2);

        let mut hostile = blank();
        hostile.alignments.insert(Alignment::new("blue"));
        assert_eq!(HexGrid::move_cost(&hostile, &mover, false), mover.speed);

        let mut hidden = blank();
        hidden.hidden_alignments.insert(Alignment::new("blue"));
        assert_eq!(HexGrid::move_cost(&hidden, &mover, false), 1);
        assert_eq!(HexGrid::move_cost(&hidden, &mover, true), mover.speed);

        let mut rock = Tile::new("rock", "", vec![crate::tile::TRAIT_IMPASSABLE.to_string()]);
        rock.alignments.insert(Alignment::new("blue"));
        assert_eq!(HexGrid::move_cost(&rock, &mover, true), IMPASSABLE_COST);
    }

    #[test]
    fn test_refresh_projects_onto_neighbours_only() {
        let mut grid = grid();
        let home = Position::new(4, 4);
        grid.place_unit(home, Some(slime(1, "blue"))).unwrap();
        grid.refresh_alignments();

        let blue = Alignment::new("blue");
        assert!(!grid.tile_at(home).unwrap().alignments.contains(&blue));
        for (pos, _) in grid.neighbors(home).unwrap() {
            assert!(grid.tile_at(pos).unwrap().alignments.contains(&blue));
        }

        grid.take_unit(home).unwrap();
        grid.refresh_alignments();
        assert!(grid.cells().all(|(_, t, _)| t.alignments.is_empty()));
    }

    #[test]
    fn test_invisible_units_project_hidden_influence() {
        let mut grid = grid();
        let mut ghost = slime(1, "blue");
        ghost.statuses.insert(StatusEffect::Invisible);
        grid.place_unit(Position::new(4, 4), Some(ghost)).unwrap();
        grid.refresh_alignments();

        let tile = grid.tile_at(Position::new(2, 4)).unwrap();
        assert!(tile.alignments.is_empty());
        assert!(tile.hidden_alignments.contains(&Alignment::new("blue")));
    }

    #[test]
    fn test_place_and_take_are_atomic() {
        let mut grid = grid();
        let pos = Position::new(3, 3);
        assert!(grid.place_unit(pos, Some(slime(1, "white"))).unwrap().is_none());
        let previous = grid.place_unit(pos, Some(slime(2, "blue"))).unwrap();
        assert_eq!(previous.map(|u| u.id()), Some(UnitId(1)));
        assert_eq!(grid.locate(UnitId(2)), Some(pos));
        assert!(grid.take_unit(pos).unwrap().is_some());
        assert!(grid.unit_at(pos).unwrap().is_none());
        assert_eq!(grid.locate(UnitId(2)), None);
    }

    #[test]
    fn test_try_place_hands_back_on_conflict() {
        let mut grid = grid();
        let pos = Position::new(3, 3);
        assert!(grid.try_place(pos, slime(1, "white")).is_none());
        let refused = grid.try_place(pos, slime(2, "blue"));
        assert_eq!(refused.map(|u| u.id()), Some(UnitId(2)));
        assert_eq!(grid.locate(UnitId(1)), Some(pos));

        let off_grid = grid.try_place(Position::new(-1, 0), slime(3, "blue"));
        assert_eq!(off_grid.map(|u| u.id()), Some(UnitId(3)));
    }

    #[test]
    fn test_remove_dead_units() {
        let mut grid = grid();
        let mut dying = slime(1, "white");
        dying.take_damage(10);
        grid.place_unit(Position::new(0, 0), Some(dying)).unwrap();
        grid.place_unit(Position::new(1, 1), Some(slime(2, "blue"))).unwrap();

        let removed = grid.remove_dead_units();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].0, Position::new(0, 0));
        assert_eq!(grid.units().count(), 1);
    }

    #[test]
    fn test_nearest_free() {
        let mut grid = HexGrid::new(5, 5, 80, &blank());
        let centre = Position::new(2, 2);
        assert_eq!(grid.nearest_free(centre), Some(centre));

        grid.place_unit(centre, Some(slime(1, "white"))).unwrap();
        // First neighbour in direction order.
        assert_eq!(grid.nearest_free(centre), Some(Position::new(0, 2)));

        let mut id = 2;
        for pos in grid.positions().collect::<Vec<_>>() {
            if !grid.is_occupied(pos) {
                grid.place_unit(pos, Some(slime(id, "white"))).unwrap();
                id += 1;
            }
        }
        assert_eq!(grid.nearest_free(centre), None);
    }

    #[test]
    fn test_pixel_layout() {
        let grid = grid();
        assert_eq!(grid.pixel_center(Position::new(0, 0)), Vec2Fixed::ZERO);
        assert_eq!(
            grid.pixel_center(Position::new(1, 1)),
            Vec2Fixed::new(Fixed::from_num(180), Fixed::from_num(34))
        );
        assert_eq!(
            grid.pixel_center(Position::new(2, 3)),
            Vec2Fixed::new(Fixed::from_num(360), Fixed::from_num(68))
        );
    }

    #[test]
    fn test_tile_size_limit() {
        assert_eq!(HexGrid::max_tile_size(26, 10), 4_858_560);
        assert_eq!(HexGrid::max_tile_size(1, 1), 126_322_567);

        let fits = HexGrid::new(26, 10, HexGrid::max_tile_size(26, 10), &blank());
        let far = fits.pixel_center(Position::new(25, 9));
        assert!(far.x < Fixed::MAX && far.y < Fixed::MAX);

        // Oversized tiles saturate instead of overflowing.
        let huge = HexGrid::new(26, 10, 3_000_000_000, &blank());
        assert_eq!(huge.tile_size(), Fixed::MAX);
        assert_eq!(huge.pixel_center(Position::new(25, 9)).y, Fixed::MAX / Fixed::from_num(40));
    }

    #[test]
    fn test_units_row_major() {
        let mut grid = grid();
        grid.place_unit(Position::new(5, 0), Some(slime(1, "white"))).unwrap();
        grid.place_unit(Position::new(0, 9), Some(slime(2, "white"))).unwrap();
        let order: Vec<_> = grid.units().map(|(_, u)| u.id()).collect();
        assert_eq!(order, vec![UnitId(2), UnitId(1)]);
    }
}
