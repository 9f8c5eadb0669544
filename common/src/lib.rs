//! Minesweeper analysis engine: layout generation, the 3BV metric and mine
//! probability inference.
//!
//! - [`Board`] is a fully known layout, [`GameBoard`] a partially revealed
//!   snapshot of one. Both import and export flat row-major cell codes or
//!   one array per row.
//! - [`generate_layout`] places mines around a safe first click, and
//!   [`generate_solvable_layout`] keeps drawing until the layout can be cleared
//!   by deduction alone.
//! - [`compute_3bv`] and [`metrics`] measure how much work a layout is.
//! - [`infer_probabilities`] computes the mine probability of every unknown cell,
//!   and [`infer_opening_probabilities`] the chance that a click opens a region.
//!
//! ```
//! use minesweeper_engine::{compute_3bv, generate_layout_seeded, LayoutConfig};
//!
//! let config = LayoutConfig::new(9, 9, 10, 4, 4);
//! let board = generate_layout_seeded(&config, 42).unwrap();
//! assert_eq!(board.mine_count(), 10);
//! assert!(compute_3bv(&board) > 0);
//! ```

pub mod board;
pub mod constraints;
pub mod error;
pub mod inference;
pub mod layout;
pub mod metrics;
pub mod solvable;
pub mod solver;

pub use board::{Board, Cell, Dimensions, GameBoard, GameCell, Point};
pub use error::{Error, ErrorKind, Result};
pub use inference::{
    CellProbability, Inference, InferenceOptions, MineCount, ProbabilityGrid,
    infer_opening_probabilities, infer_opening_probabilities_with, infer_probabilities,
    infer_probabilities_with,
};
pub use layout::{
    LayoutConfig, SafeZone, generate_layout, generate_layout_seeded, generate_layout_with,
};
pub use metrics::{BoardMetrics, compute_3bv, metrics};
pub use solvable::{
    SolvableConfig, SolvableLayout, generate_solvable_layout, generate_solvable_layout_with,
};
pub use solver::{SolveProgress, is_solvable, try_solve};
