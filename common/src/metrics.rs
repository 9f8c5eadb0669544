//! Board complexity metrics computed from a fully known layout.

use crate::board::{Board, Cell, Point};
use std::collections::VecDeque;

/// Summary statistics of a layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BoardMetrics {
    /// Minimum number of clicks needed to clear the board.
    pub bbbv: usize,
    /// Number of 8-connected regions of zero cells.
    pub openings: usize,
    /// Number of 8-connected regions of numbered cells that touch no zero.
    pub islands: usize,
    /// How often each number `0..=8` appears.
    pub numbers: [usize; 9],
}

pub fn metrics(board: &Board) -> BoardMetrics {
    let (openings, covered) = flood_openings(board);
    BoardMetrics {
        bbbv: openings + uncovered_cells(board, &covered),
        openings,
        islands: islands(board),
        numbers: number_histogram(board),
    }
}

/// Computes the 3BV of a board.
///
/// Each maximal 8-connected region of zeros is one click and also opens the
/// numbers bordering it. Every other safe cell costs one click of its own.
/// Only mine positions matter, since the numbers are derived from them.
pub fn compute_3bv(board: &Board) -> usize {
    let (openings, covered) = flood_openings(board);
    openings + uncovered_cells(board, &covered)
}

pub fn openings(board: &Board) -> usize {
    flood_openings(board).0
}

/// Counts openings, marking every zero cell and every number opened for free.
fn flood_openings(board: &Board) -> (usize, Vec<bool>) {
    let dims = board.dims();
    let mut covered = vec![false; dims.area()];
    let mut visited = vec![false; dims.area()];
    let mut openings = 0;

    for seed in dims.points() {
        if visited[dims.index(seed)] || board.get(seed) != Cell::Count(0) {
            continue;
        }
        openings += 1;

        let mut queue = VecDeque::from([seed]);
        visited[dims.index(seed)] = true;
        while let Some(point) = queue.pop_front() {
            covered[dims.index(point)] = true;
            for neighbor in dims.neighbors(point) {
                let index = dims.index(neighbor);
                match board.get(neighbor) {
                    Cell::Count(0) if !visited[index] => {
                        visited[index] = true;
                        queue.push_back(neighbor);
                    }
                    Cell::Count(_) => covered[index] = true,
                    Cell::Mine => {}
                }
            }
        }
    }

    (openings, covered)
}

fn uncovered_cells(board: &Board, covered: &[bool]) -> usize {
    board
        .cells()
        .iter()
        .zip(covered)
        .filter(|(cell, covered)| !cell.is_mine() && !**covered)
        .count()
}

pub fn islands(board: &Board) -> usize {
    let dims = board.dims();
    let borders_zero =
        |point: Point| dims.neighbors(point).any(|n| board.get(n) == Cell::Count(0));
    let is_island_cell = |point: Point| {
        matches!(board.get(point), Cell::Count(n) if n > 0) && !borders_zero(point)
    };

    let mut visited = vec![false; dims.area()];
    let mut islands = 0;
    for seed in dims.points() {
        if visited[dims.index(seed)] || !is_island_cell(seed) {
            continue;
        }
        islands += 1;
        let mut stack = vec![seed];
        visited[dims.index(seed)] = true;
        while let Some(point) = stack.pop() {
            for neighbor in dims.neighbors(point) {
                let index = dims.index(neighbor);
                if !visited[index] && is_island_cell(neighbor) {
                    visited[index] = true;
                    stack.push(neighbor);
                }
            }
        }
    }
    islands
}

pub fn number_histogram(board: &Board) -> [usize; 9] {
    let mut histogram = [0; 9];
    for cell in board.cells() {
        if let Cell::Count(n) = cell {
            histogram[*n as usize] += 1;
        }
    }
    histogram
}
