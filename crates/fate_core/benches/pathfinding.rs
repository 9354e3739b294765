//! Pathfinding benchmarks for fate_core.
//!
//! Run with: `cargo bench -p fate_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fate_core::hex::{Direction, Position};
use fate_core::pathfinding::find_path;
use fate_core::tile::{Tile, TRAIT_DIFFICULT, TRAIT_IMPASSABLE};
use fate_test_utils::fixtures::{blank_grid, grunt, pos};

/// Corner-to-corner searches on open and cluttered boards.
pub fn pathfinding_benchmark(c: &mut Criterion) {
    let mover = grunt(1, "white");
    let mut group = c.benchmark_group("find_path");

    for &(rows, cols) in &[(26u16, 10u16), (64, 32), (128, 64)] {
        let grid = blank_grid(rows, cols);
        let goal = pos(i32::from(rows) - 1, i32::from(cols) - 1);
        group.bench_with_input(
            BenchmarkId::new("open", format!("{rows}x{cols}")),
            &grid,
            |b, grid| b.iter(|| find_path(black_box(grid), pos(0, 0), goal, &mover)),
        );

        let mut cluttered = grid.clone();
        let difficult = Tile::new("difficult", "", vec![TRAIT_DIFFICULT.to_string()]);
        let rock = Tile::new("rock", "", vec![TRAIT_IMPASSABLE.to_string()]);
        for p in grid.positions() {
            let tile = match (p.row * 7 + p.col * 3) % 11 {
                0 | 1 => Some(&difficult),
                2 => Some(&rock),
                _ => None,
            };
            if let Some(tile) = tile {
                if p != pos(0, 0) && p != goal {
                    let _ = cluttered.set_tile(p, tile.clone());
                }
            }
        }
        group.bench_with_input(
            BenchmarkId::new("cluttered", format!("{rows}x{cols}")),
            &cluttered,
            |b, grid| b.iter(|| find_path(black_box(grid), pos(0, 0), goal, &mover)),
        );
    }
    group.finish();
}

/// Neighbour enumeration across a whole board.
pub fn neighbor_benchmark(c: &mut Criterion) {
    let grid = blank_grid(26, 10);
    c.bench_function("neighbors_26x10", |b| {
        b.iter(|| {
            grid.positions()
                .map(|p: Position| grid.neighbors(p).map_or(0, |n| n.len()))
                .sum::<usize>()
        })
    });
    c.bench_function("step_all_directions", |b| {
        b.iter(|| {
            Direction::ALL
                .iter()
                .map(|&d| black_box(pos(5, 5)).step(d))
                .count()
        })
    });
}

criterion_group!(benches, pathfinding_benchmark, neighbor_benchmark);
criterion_main!(benches);
