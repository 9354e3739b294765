//! Weighted shortest paths over the hex grid.
//!
//! Uniform-cost search (Dijkstra, no heuristic) using the grid's movement
//! costs. Continuing in the same direction adds a half point to a node's
//! queue priority, which makes the search prefer turning over running
//! straight when routes tie. The penalty never enters the path cost.
//!
//! All priorities use fixed-point math and ties are broken by insertion
//! order, so the same inputs always produce the same path.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::grid::HexGrid;
use crate::hex::{Direction, Position};
use crate::math::{Fixed, HALF};
use crate::unit::Unit;

/// Ordered cells from start to goal, both inclusive.
///
/// An empty path means no route exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(Vec<Position>);

impl Path {
    /// Wrap a list of positions.
    #[must_use]
    pub fn new(positions: Vec<Position>) -> Self {
        Self(positions)
    }

    /// Path with no cells.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether the path has no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of cells, endpoints included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Cells in order.
    #[must_use]
    pub fn positions(&self) -> &[Position] {
        &self.0
    }

    /// First cell.
    #[must_use]
    pub fn start(&self) -> Option<Position> {
        self.0.first().copied()
    }

    /// Last cell.
    #[must_use]
    pub fn goal(&self) -> Option<Position> {
        self.0.last().copied()
    }

    /// Cell at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Position> {
        self.0.get(index).copied()
    }

    /// Drop every cell after `len`.
    pub fn truncate(&mut self, len: usize) {
        self.0.truncate(len);
    }

    /// Whether every cell is on the grid and each consecutive pair are
    /// neighbours. Empty paths are not contiguous.
    #[must_use]
    pub fn is_contiguous(&self, grid: &HexGrid) -> bool {
        !self.0.is_empty()
            && self.0.iter().all(|&p| grid.in_bounds(p))
            && self.0.windows(2).all(|w| grid.are_adjacent(w[0], w[1]))
    }

    /// Unwrap into the position list.
    #[must_use]
    pub fn into_inner(self) -> Vec<Position> {
        self.0
    }
}

impl From<Vec<Position>> for Path {
    fn from(positions: Vec<Position>) -> Self {
        Self(positions)
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a Position;
    type IntoIter = std::slice::Iter<'a, Position>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A node in the open set priority queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SearchNode {
    pos: Position,
    /// g plus the direction-continuity penalty.
    f_score: Fixed,
    /// Insertion order, breaks ties between equal scores.
    seq: u64,
}

impl Ord for SearchNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse so the lowest score pops first.
        match other.f_score.cmp(&self.f_score) {
            Ordering::Equal => other.seq.cmp(&self.seq),
            ord => ord,
        }
    }
}

impl PartialOrd for SearchNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Find the cheapest path for `mover` from `start` to `goal`.
///
/// Costs come from [`HexGrid::move_cost`] with hidden influence ignored,
/// so the route reflects what the player can see. Impassable tiles are
/// never entered.
///
/// Returns an empty path if either endpoint is off the grid or the goal
/// cannot be reached, and `[start]` if `start == goal`.
#[must_use]
pub fn find_path(grid: &HexGrid, start: Position, goal: Position, mover: &Unit) -> Path {
    if !grid.in_bounds(start) || !grid.in_bounds(goal) {
        return Path::empty();
    }

    let mut open_set = BinaryHeap::new();
    let mut came_from: HashMap<Position, Position> = HashMap::new();
    let mut g_score: HashMap<Position, u32> = HashMap::new();
    let mut arrived_by: HashMap<Position, Direction> = HashMap::new();
    let mut seq = 0u64;
    let mut expanded = 0usize;

    g_score.insert(start, 0);
    open_set.push(SearchNode {
        pos: start,
        f_score: Fixed::ZERO,
        seq,
    });

    while let Some(current) = open_set.pop() {
        if current.pos == goal {
            let path = reconstruct_path(&came_from, start, goal);
            tracing::debug!(%start, %goal, expanded, len = path.len(), "Path found");
            return path;
        }
        expanded += 1;

        let current_g = g_score.get(&current.pos).copied().unwrap_or(u32::MAX);
        let current_dir = arrived_by.get(&current.pos).copied();

        let Ok(neighbours) = grid.neighbors(current.pos) else {
            continue;
        };
        for (next, dir) in neighbours {
            let Ok(tile) = grid.tile_at(next) else {
                continue;
            };
            if tile.is_impassable() {
                continue;
            }

            let tentative = current_g.saturating_add(HexGrid::move_cost(tile, mover, false));
            let better = g_score.get(&next).map_or(true, |&g| tentative < g);
            if !better {
                continue;
            }

            g_score.insert(next, tentative);
            arrived_by.insert(next, dir);
            came_from.insert(next, current.pos);

            let mut f_score = Fixed::from_num(tentative);
            if current_dir == Some(dir) {
                f_score += HALF;
            }
            seq += 1;
            open_set.push(SearchNode {
                pos: next,
                f_score,
                seq,
            });
        }
    }

    tracing::debug!(%start, %goal, expanded, "No path");
    Path::empty()
}

fn reconstruct_path(
    came_from: &HashMap<Position, Position>,
    start: Position,
    goal: Position,
) -> Path {
    let mut path = vec![goal];
    let mut current = goal;
    while current != start {
        match came_from.get(&current) {
            Some(&prev) => {
                path.push(prev);
                current = prev;
            }
            None => break,
        }
    }
    path.reverse();
    Path(path)
}

/// Total movement `mover` spends walking `path`.
///
/// The start cell is free; every later cell costs its entry cost.
pub fn path_cost(grid: &HexGrid, path: &Path, mover: &Unit, count_hidden: bool) -> Result<u32> {
    path.positions().iter().skip(1).try_fold(0u32, |total, &pos| {
        Ok(total.saturating_add(grid.cost_to_enter(pos, mover, count_hidden)?))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factions::Alignment;
    use crate::tile::{Tile, TRAIT_DIFFICULT, TRAIT_IMPASSABLE};
    use crate::unit::{AttackInfo, AttackTable, UnitId};

    fn grid() -> HexGrid {
        HexGrid::new(26, 10, 80, &Tile::new("blank", "", Vec::new()))
    }

    fn mover() -> Unit {
        let attacks = AttackTable::new().with("bite", AttackInfo::new(3, 2));
        Unit::new(UnitId(1), "slime", 10, 3, attacks, Alignment::new("white"))
    }

    fn pos(row: i32, col: i32) -> Position {
        Position::new(row, col)
    }

    #[test]
    fn test_start_is_goal() {
        let path = find_path(&grid(), pos(3, 3), pos(3, 3), &mover());
        assert_eq!(path.positions(), &[pos(3, 3)]);
    }

    #[test]
    fn test_out_of_bounds_is_empty() {
        let grid = grid();
        assert!(find_path(&grid, pos(1, 1), pos(30, 1), &mover()).is_empty());
        assert!(find_path(&grid, pos(-1, 1), pos(3, 1), &mover()).is_empty());
    }

    #[test]
    fn test_plain_path_cost_three() {
        let grid = grid();
        let unit = mover();
        let path = find_path(&grid, pos(1, 1), pos(4, 3), &unit);
        assert_eq!(path.len(), 4);
        assert_eq!(path.start(), Some(pos(1, 1)));
        assert_eq!(path.goal(), Some(pos(4, 3)));
        assert!(path.is_contiguous(&grid));
        assert_eq!(path_cost(&grid, &path, &unit, false).unwrap(), 3);
    }

    #[test]
    fn test_far_goal_needs_five_steps() {
        let grid = grid();
        let path = find_path(&grid, pos(1, 1), pos(4, 4), &mover());
        assert_eq!(path.len(), 6);
        assert!(path.is_contiguous(&grid));
    }

    #[test]
    fn test_deterministic() {
        let grid = grid();
        let unit = mover();
        let first = find_path(&grid, pos(0, 0), pos(25, 9), &unit);
        for _ in 0..5 {
            assert_eq!(find_path(&grid, pos(0, 0), pos(25, 9), &unit), first);
        }
    }

    #[test]
    fn test_avoids_difficult_terrain_when_cheaper() {
        let mut grid = grid();
        let unit = mover();
        let direct = find_path(&grid, pos(4, 4), pos(10, 4), &unit);
        assert_eq!(direct.positions(), &[pos(4, 4), pos(6, 4), pos(8, 4), pos(10, 4)]);

        let difficult = Tile::new("difficult", "", vec![TRAIT_DIFFICULT.to_string()]);
        grid.set_tile(pos(6, 4), difficult.clone()).unwrap();
        grid.set_tile(pos(8, 4), difficult).unwrap();
        let around = find_path(&grid, pos(4, 4), pos(10, 4), &unit);
        assert_eq!(
            around.positions(),
            &[pos(4, 4), pos(5, 4), pos(7, 4), pos(9, 4), pos(10, 4)]
        );
        assert_eq!(path_cost(&grid, &around, &unit, false).unwrap(), 4);
    }

    #[test]
    fn test_enclosed_goal_is_empty() {
        let mut grid = grid();
        let rock = Tile::new("rock", "", vec![TRAIT_IMPASSABLE.to_string()]);
        let goal = pos(10, 5);
        for (p, _) in grid.neighbors(goal).unwrap() {
            grid.set_tile(p, rock.clone()).unwrap();
        }
        assert!(find_path(&grid, pos(1, 1), goal, &mover()).is_empty());
    }

    #[test]
    fn test_hostile_influence_raises_cost() {
        let mut grid = grid();
        let unit = mover();
        let mut enemy = mover();
        enemy.set_alignment(Alignment::new("blue"));
        grid.place_unit(pos(12, 4), Some(enemy)).unwrap();
        grid.refresh_alignments();

        let path = find_path(&grid, pos(8, 4), pos(12, 4), &unit);
        assert_eq!(path.goal(), Some(pos(12, 4)));
        // Entering the ring costs the whole speed; the enemy's own cell does not.
        let cost = path_cost(&grid, &path, &unit, false).unwrap();
        assert_eq!(cost, unit.speed + 1);
    }

    #[test]
    fn test_contiguity_check() {
        let grid = grid();
        assert!(!Path::empty().is_contiguous(&grid));
        assert!(Path::new(vec![pos(2, 2)]).is_contiguous(&grid));
        assert!(!Path::new(vec![pos(2, 2), pos(2, 3)]).is_contiguous(&grid));
        assert!(!Path::new(vec![pos(0, 0), pos(-1, 0)]).is_contiguous(&grid));
    }
}
