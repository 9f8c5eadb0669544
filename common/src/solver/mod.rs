//! Guess-free play of a known layout.
//!
//! Starting from one revealed cell, the solver alternates between deducing
//! cells and acting on them: safe cells are revealed (flood-filling openings)
//! and mines are flagged. Local rules run first; the SAT check over the whole
//! board, mine total included, only runs when they find nothing.

mod local;
mod sat;

use crate::board::{Board, Cell, GameBoard, GameCell, Point};
use crate::constraints::Constraints;
use crate::error::Result;
use std::collections::{BTreeSet, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};

/// How far pure deduction got on a layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolveProgress {
    /// Revealed and flagged cells when deduction stopped.
    pub game: GameBoard,
    /// Whether every safe cell was revealed.
    pub solved: bool,
}

#[derive(Debug, Default)]
pub(crate) struct Deductions {
    pub safe: BTreeSet<Point>,
    pub mines: BTreeSet<Point>,
}

impl Deductions {
    pub fn is_empty(&self) -> bool {
        self.safe.is_empty() && self.mines.is_empty()
    }
}

/// Plays `board` from `start` without ever guessing.
pub fn try_solve(board: &Board, start: Point) -> Result<SolveProgress> {
    board.dims().check(start)?;
    solve_until(board, start, &AtomicBool::new(false))
}

/// Whether `board` can be cleared from `start` by deduction alone.
pub fn is_solvable(board: &Board, start: Point) -> Result<bool> {
    Ok(try_solve(board, start)?.solved)
}

/// [`try_solve`] that gives up, unsolved, as soon as `cancel` is set.
pub(crate) fn solve_until(
    board: &Board,
    start: Point,
    cancel: &AtomicBool,
) -> Result<SolveProgress> {
    let mut game = GameBoard::unrevealed(board.dims());
    if board.is_mine(start) {
        return Ok(SolveProgress { game, solved: false });
    }
    reveal(board, &mut game, start);

    let safe_cells = board.dims().area() - board.mine_count();
    let mut rounds = 0;
    loop {
        if game.revealed_count() == safe_cells {
            log::trace!("solved after {rounds} rounds");
            return Ok(SolveProgress { game, solved: true });
        }
        if cancel.load(Ordering::Relaxed) {
            return Ok(SolveProgress { game, solved: false });
        }
        rounds += 1;

        let constraints = Constraints::build(&game)?;
        let mut found = local::deduce(&constraints.local);
        if found.is_empty() {
            let remaining = board.mine_count().saturating_sub(constraints.flagged);
            found = sat::deduce(&constraints, remaining);
        }
        if found.is_empty() {
            log::trace!("stuck after {rounds} rounds");
            return Ok(SolveProgress { game, solved: false });
        }

        for point in found.mines {
            game.set(point, GameCell::Flagged);
        }
        for point in found.safe {
            reveal(board, &mut game, point);
        }
    }
}

/// Reveals `start`, flood-filling through zeros.
pub(crate) fn reveal(board: &Board, game: &mut GameBoard, start: Point) {
    let mut queue = VecDeque::from([start]);
    let mut visited = HashSet::from([start]);

    while let Some(point) = queue.pop_front() {
        if game.get(point) != GameCell::Unknown {
            continue;
        }
        let Cell::Count(count) = board.get(point) else {
            continue;
        };
        game.set(point, GameCell::Revealed(count));

        if count == 0 {
            for neighbor in board.neighbors(point) {
                if game.get(neighbor) == GameCell::Unknown && visited.insert(neighbor) {
                    queue.push_back(neighbor);
                }
            }
        }
    }
}
