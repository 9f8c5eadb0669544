//! Random mine layouts with a mine-free first click.

use crate::board::{Board, Dimensions, Point};
use crate::error::{Error, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Which cells around the first click are kept free of mines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SafeZone {
    /// The clicked cell and its in-bounds neighbours, so the click opens an area.
    #[default]
    Opening,
    /// Only the clicked cell.
    Cell,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LayoutConfig {
    pub rows: usize,
    pub cols: usize,
    pub mines: usize,
    /// The first click; `x` is the column, `y` the row.
    pub safe: Point,
    pub safe_zone: SafeZone,
}

impl Default for LayoutConfig {
    /// Expert difficulty, first click in the middle.
    fn default() -> Self {
        LayoutConfig {
            rows: 16,
            cols: 30,
            mines: 99,
            safe: Point::new(15, 8),
            safe_zone: SafeZone::Opening,
        }
    }
}

impl LayoutConfig {
    pub fn new(rows: usize, cols: usize, mines: usize, safe_x: usize, safe_y: usize) -> Self {
        LayoutConfig {
            rows,
            cols,
            mines,
            safe: Point::new(safe_x, safe_y),
            safe_zone: SafeZone::Opening,
        }
    }

    pub fn with_safe_zone(mut self, safe_zone: SafeZone) -> Self {
        self.safe_zone = safe_zone;
        self
    }

    pub fn dims(&self) -> Result<Dimensions> {
        Dimensions::new(self.rows, self.cols)
    }

    /// The cells kept free of mines, row-major.
    pub fn safe_cells(&self) -> Result<Vec<Point>> {
        let dims = self.dims()?;
        dims.check(self.safe)?;
        let mut cells = vec![self.safe];
        if self.safe_zone == SafeZone::Opening {
            cells.extend(dims.neighbors(self.safe));
        }
        cells.sort();
        Ok(cells)
    }

    /// Checks every parameter without drawing anything.
    pub fn validate(&self) -> Result<()> {
        let dims = self.dims()?;
        let available = dims.area() - self.safe_cells()?.len();
        if self.mines > available {
            return Err(Error::TooManyMines {
                mines: self.mines,
                available,
            });
        }
        Ok(())
    }
}

/// Places the configured mines uniformly over the cells outside the safe zone.
pub fn generate_layout_with<R: Rng + ?Sized>(config: &LayoutConfig, rng: &mut R) -> Result<Board> {
    config.validate()?;
    let dims = config.dims()?;
    let safe = config.safe_cells()?;

    let candidates: Vec<Point> = dims.points().filter(|p| safe.binary_search(p).is_err()).collect();
    let mines = rand::seq::index::sample(rng, candidates.len(), config.mines)
        .into_iter()
        .map(|i| candidates[i]);
    Board::from_mines(dims, mines)
}

pub fn generate_layout_seeded(config: &LayoutConfig, seed: u64) -> Result<Board> {
    generate_layout_with(config, &mut StdRng::seed_from_u64(seed))
}

/// Places `mine_count` mines at random, keeping the cell at column `safe_x`,
/// row `safe_y` and its neighbours free.
pub fn generate_layout(
    rows: usize,
    cols: usize,
    mine_count: usize,
    safe_x: usize,
    safe_y: usize,
) -> Result<Board> {
    let config = LayoutConfig::new(rows, cols, mine_count, safe_x, safe_y);
    generate_layout_with(&config, &mut rand::rng())
}
