//! Search for layouts that can be cleared from the first click without
//! guessing.
//!
//! Workers draw and verify candidates independently, claiming attempts one at
//! a time from a shared budget. The first worker to find a solvable layout
//! raises the stop flag, which also cancels the solves still running on the
//! other workers.

use crate::board::Board;
use crate::error::{Error, Result};
use crate::layout::{LayoutConfig, generate_layout_with};
use crate::metrics::compute_3bv;
use crate::solver;
use crossbeam_channel::unbounded;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;

const MAX_WORKERS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SolvableConfig {
    pub layout: LayoutConfig,
    /// Candidates drawn across all workers before giving up.
    pub max_attempts: usize,
    pub workers: usize,
    /// Base seed; worker `i` draws from `seed + i`. Random when `None`.
    pub seed: Option<u64>,
    /// Accepted 3BV values. Candidates outside are rejected before solving.
    pub bbbv_range: Option<RangeInclusive<usize>>,
}

impl Default for SolvableConfig {
    fn default() -> Self {
        SolvableConfig {
            layout: LayoutConfig::default(),
            max_attempts: 1000,
            workers: default_workers(),
            seed: None,
            bbbv_range: None,
        }
    }
}

impl SolvableConfig {
    pub fn new(layout: LayoutConfig, max_attempts: usize) -> Self {
        SolvableConfig {
            layout,
            max_attempts,
            ..SolvableConfig::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.layout.validate()?;
        if self.max_attempts == 0 {
            return Err(Error::InvalidSearch("max_attempts must be positive"));
        }
        if self.workers == 0 {
            return Err(Error::InvalidSearch("workers must be positive"));
        }
        Ok(())
    }

    fn accepts(&self, board: &Board) -> bool {
        self.bbbv_range
            .as_ref()
            .is_none_or(|range| range.contains(&compute_3bv(board)))
    }
}

/// Available parallelism, at most 10.
pub fn default_workers() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(MAX_WORKERS)
}

/// Result of a solvable-layout search.
///
/// When the budget runs out, `success` is false and `board` is the last
/// candidate drawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolvableLayout {
    pub board: Board,
    pub success: bool,
    /// Attempts actually made across all workers.
    pub attempts: usize,
}

pub fn generate_solvable_layout(
    rows: usize,
    cols: usize,
    mine_count: usize,
    safe_x: usize,
    safe_y: usize,
    max_attempts: usize,
) -> Result<SolvableLayout> {
    let layout = LayoutConfig::new(rows, cols, mine_count, safe_x, safe_y);
    generate_solvable_layout_with(&SolvableConfig::new(layout, max_attempts))
}

pub fn generate_solvable_layout_with(config: &SolvableConfig) -> Result<SolvableLayout> {
    config.validate()?;
    let base_seed = config.seed.unwrap_or_else(|| rand::rng().random());
    let workers = config.workers.min(config.max_attempts);
    let budget = AtomicUsize::new(config.max_attempts);
    let stop = AtomicBool::new(false);

    log::debug!(
        "searching {}x{} with {} mines: {} attempts over {} workers",
        config.layout.rows,
        config.layout.cols,
        config.layout.mines,
        config.max_attempts,
        workers
    );

    let outcomes = if workers == 1 {
        vec![search(config, base_seed, &budget, &stop)]
    } else {
        let (tx, rx) = unbounded();
        thread::scope(|scope| {
            for index in 0..workers {
                let tx = tx.clone();
                let (budget, stop) = (&budget, &stop);
                let seed = base_seed.wrapping_add(index as u64);
                scope.spawn(move || {
                    let outcome = search(config, seed, budget, stop);
                    if outcome.is_err() {
                        stop.store(true, Ordering::SeqCst);
                    }
                    // The receiver outlives the scope.
                    let _ = tx.send(outcome);
                });
            }
            drop(tx);
            rx.iter().collect::<Vec<_>>()
        })
    };

    let mut attempts = 0;
    let mut solved = None;
    let mut last: Option<(usize, Board)> = None;
    for outcome in outcomes {
        let outcome = outcome?;
        attempts += outcome.attempts;
        if let Some(board) = outcome.solved {
            solved = Some(board);
        }
        if let Some((ticket, board)) = outcome.last {
            if last.as_ref().is_none_or(|(best, _)| ticket > *best) {
                last = Some((ticket, board));
            }
        }
    }

    if let Some(board) = solved {
        log::debug!("found a solvable layout after {attempts} attempts");
        return Ok(SolvableLayout {
            board,
            success: true,
            attempts,
        });
    }
    log::debug!("no solvable layout in {attempts} attempts");
    let (_, board) = last.ok_or(Error::InvalidSearch("no attempt was made"))?;
    Ok(SolvableLayout {
        board,
        success: false,
        attempts,
    })
}

struct WorkerOutcome {
    attempts: usize,
    solved: Option<Board>,
    /// Latest rejected candidate, with the position of its attempt in the budget.
    last: Option<(usize, Board)>,
}

fn search(
    config: &SolvableConfig,
    seed: u64,
    budget: &AtomicUsize,
    stop: &AtomicBool,
) -> Result<WorkerOutcome> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut outcome = WorkerOutcome {
        attempts: 0,
        solved: None,
        last: None,
    };

    while !stop.load(Ordering::Relaxed) {
        let Ok(left) = budget.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        else {
            break;
        };
        let ticket = config.max_attempts - left;
        outcome.attempts += 1;

        let board = generate_layout_with(&config.layout, &mut rng)?;
        if config.accepts(&board) {
            let progress = solver::solve_until(&board, config.layout.safe, stop)?;
            // Only the worker that raises the flag commits its layout.
            if progress.solved && !stop.swap(true, Ordering::SeqCst) {
                log::trace!("attempt {ticket} is solvable");
                outcome.solved = Some(board);
                break;
            }
        }
        outcome.last = Some((ticket, board));
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn forced_guess() -> LayoutConfig {
        // The only free cells are two indistinguishable ones.
        LayoutConfig::new(2, 3, 1, 0, 0)
    }

    #[test]
    fn test_single_attempt_on_forced_guess() {
        let result = generate_solvable_layout(2, 3, 1, 0, 0, 1).unwrap();
        assert!(!result.success);
        assert_eq!(result.attempts, 1);
        assert_eq!(result.board.mine_count(), 1);
    }

    #[test]
    fn test_budget_is_shared_between_workers() {
        let config = SolvableConfig {
            layout: forced_guess(),
            max_attempts: 9,
            workers: 4,
            seed: Some(11),
            bbbv_range: None,
        };
        let result = generate_solvable_layout_with(&config).unwrap();
        assert!(!result.success);
        assert_eq!(result.attempts, 9);
    }

    #[test]
    fn test_easy_layout_is_found() {
        let config = SolvableConfig {
            layout: LayoutConfig::new(9, 9, 1, 4, 4),
            max_attempts: 20,
            workers: 3,
            seed: Some(5),
            bbbv_range: None,
        };
        let result = generate_solvable_layout_with(&config).unwrap();
        assert!(result.success);
        assert!(result.attempts >= 1 && result.attempts <= 20);
        assert!(solver::is_solvable(&result.board, config.layout.safe).unwrap());
    }

    #[test]
    fn test_winner_cancels_running_workers() {
        // Boards large enough that other workers are mid-solve when one wins.
        let config = SolvableConfig {
            layout: LayoutConfig::new(16, 16, 40, 8, 8),
            max_attempts: 200,
            workers: 8,
            seed: Some(77),
            bbbv_range: None,
        };
        let result = generate_solvable_layout_with(&config).unwrap();
        assert!(result.success);
        assert!(result.attempts <= config.max_attempts);
        assert_eq!(result.board.mine_count(), 40);
        assert!(solver::is_solvable(&result.board, config.layout.safe).unwrap());
    }

    #[test]
    fn test_single_worker_is_reproducible() {
        let config = SolvableConfig {
            layout: LayoutConfig::new(8, 8, 10, 3, 3),
            max_attempts: 30,
            workers: 1,
            seed: Some(2024),
            bbbv_range: None,
        };
        let a = generate_solvable_layout_with(&config).unwrap();
        let b = generate_solvable_layout_with(&config).unwrap();
        assert_eq!(a, b);
        if a.success {
            assert!(solver::is_solvable(&a.board, config.layout.safe).unwrap());
        }
    }

    #[test]
    fn test_bbbv_filter_rejects_everything() {
        let config = SolvableConfig {
            layout: LayoutConfig::new(9, 9, 1, 4, 4),
            max_attempts: 5,
            workers: 2,
            seed: Some(1),
            bbbv_range: Some(100..=200),
        };
        let result = generate_solvable_layout_with(&config).unwrap();
        assert!(!result.success);
        assert_eq!(result.attempts, 5);
    }

    #[test]
    fn test_invalid_search() {
        let err = generate_solvable_layout(5, 5, 3, 2, 2, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);

        let config = SolvableConfig {
            workers: 0,
            ..SolvableConfig::new(forced_guess(), 3)
        };
        assert!(matches!(
            generate_solvable_layout_with(&config),
            Err(Error::InvalidSearch(_))
        ));

        assert!(matches!(
            generate_solvable_layout(3, 3, 1, 1, 1, 10),
            Err(Error::TooManyMines { .. })
        ));
    }

    #[test]
    fn test_default_workers() {
        let workers = default_workers();
        assert!((1..=MAX_WORKERS).contains(&workers));
    }
}
