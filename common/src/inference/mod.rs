//! Mine probabilities for a partially revealed board.
//!
//! The unknown cells are split into independent components (linked through
//! shared numbers) and a floating region that borders no number. Every
//! component is counted exhaustively, then the components and the floating
//! region are combined under the declared mine total, treating every
//! consistent placement of the mines as equally likely.

mod combine;
mod enumerate;

use crate::board::{Dimensions, GameBoard, GameCell, Point, split_rows};
use crate::constraints::Constraints;
use crate::error::{Error, Result};
use rayon::prelude::*;

/// The declared mine total of a board.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum MineCount {
    /// Exactly this many mines, flagged ones included.
    Exact(usize),
    /// A fraction of the board area, clamped into the feasible range.
    Density(f64),
}

impl MineCount {
    /// Reads a numeric hint: finite values above `1.0` are mine counts,
    /// anything else is a density. NaN, infinite and negative hints become
    /// densities that inference rejects with [`Error::InvalidDensity`].
    pub fn from_hint(value: f64) -> Self {
        if value.is_finite() && value > 1.0 {
            MineCount::Exact(value as usize)
        } else {
            MineCount::Density(value)
        }
    }
}

impl From<usize> for MineCount {
    fn from(mines: usize) -> Self {
        MineCount::Exact(mines)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct InferenceOptions {
    /// Components left with more undecided cell groups than this after
    /// propagation fail with [`Error::ComponentTooLarge`].
    ///
    /// This is a safety net, not a running time bound: the counting search
    /// prunes on every constraint, so real boards stay far below the
    /// `2^groups` worst case, but a component near the limit with loose
    /// constraints can still take a very long time.
    pub max_component_groups: usize,
}

impl Default for InferenceOptions {
    fn default() -> Self {
        InferenceOptions {
            max_component_groups: 55,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellProbability {
    Revealed,
    Flagged,
    Unknown(f64),
}

/// One probability per cell of the board.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityGrid {
    dims: Dimensions,
    cells: Vec<CellProbability>,
}

impl ProbabilityGrid {
    pub fn dims(&self) -> Dimensions {
        self.dims
    }

    pub fn cell(&self, point: Point) -> CellProbability {
        self.cells[self.dims.index(point)]
    }

    /// Mine probability of a cell, `None` for revealed cells. Flags are 1.0.
    pub fn get(&self, point: Point) -> Option<f64> {
        match self.cell(point) {
            CellProbability::Revealed => None,
            CellProbability::Flagged => Some(1.0),
            CellProbability::Unknown(p) => Some(p),
        }
    }

    /// Unflagged unknown cells with their probabilities, row-major.
    pub fn unknown(&self) -> impl Iterator<Item = (Point, f64)> + '_ {
        self.dims.points().filter_map(|point| match self.cell(point) {
            CellProbability::Unknown(p) => Some((point, p)),
            _ => None,
        })
    }

    /// Row-major probabilities; revealed cells are `-1.0`.
    pub fn to_flat(&self) -> Vec<f64> {
        self.dims
            .points()
            .map(|point| self.get(point).unwrap_or(-1.0))
            .collect()
    }

    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        split_rows(self.dims, &self.to_flat())
    }
}

/// Result of [`infer_probabilities`].
#[derive(Debug, Clone, PartialEq)]
pub struct Inference {
    pub probabilities: ProbabilityGrid,
    /// Fewest mines, flags included, any consistent assignment can have.
    pub min_mine_num: usize,
    /// The mine total the probabilities were computed for.
    pub mine_num: usize,
    /// Most mines, flags included, any consistent assignment can have.
    pub max_mine_num: usize,
    /// Whether a density hint had to be clamped into `min..=max`.
    pub clamped: bool,
}

impl Inference {
    /// Unknown cells sharing the lowest mine probability.
    pub fn safest_cells(&self) -> Vec<Point> {
        let lowest = self
            .probabilities
            .unknown()
            .map(|(_, p)| p)
            .fold(f64::INFINITY, f64::min);
        self.probabilities
            .unknown()
            .filter(|&(_, p)| p == lowest)
            .map(|(point, _)| point)
            .collect()
    }

    /// Unknown cells that are safe in every consistent assignment.
    pub fn forced_safe(&self) -> Vec<Point> {
        self.probabilities
            .unknown()
            .filter(|&(_, p)| p == 0.0)
            .map(|(point, _)| point)
            .collect()
    }

    /// Unknown cells that are mines in every consistent assignment.
    pub fn forced_mines(&self) -> Vec<Point> {
        self.probabilities
            .unknown()
            .filter(|&(_, p)| p == 1.0)
            .map(|(point, _)| point)
            .collect()
    }
}

/// Computes the mine probability of every unknown cell of `game` and the
/// feasible range of the total mine count.
///
/// ```
/// use minesweeper_engine::{GameBoard, Point, infer_probabilities};
///
/// let game = GameBoard::from_rows(&[vec![10, 10, 10], vec![0, 1, 10]]).unwrap();
/// let inference = infer_probabilities(&game, 1).unwrap();
/// assert_eq!(inference.min_mine_num, 1);
/// assert_eq!(inference.probabilities.get(Point::new(0, 1)), None);
/// ```
pub fn infer_probabilities(game: &GameBoard, mine_count: impl Into<MineCount>) -> Result<Inference> {
    infer_probabilities_with(game, mine_count, &InferenceOptions::default())
}

pub fn infer_probabilities_with(
    game: &GameBoard,
    mine_count: impl Into<MineCount>,
    options: &InferenceOptions,
) -> Result<Inference> {
    let mine_count = mine_count.into();
    check_density(mine_count)?;
    let constraints = Constraints::build(game)?;
    infer_constrained(game, &constraints, mine_count, options)
}

fn check_density(mine_count: MineCount) -> Result<()> {
    match mine_count {
        MineCount::Density(density) if !(0.0..=1.0).contains(&density) => {
            Err(Error::InvalidDensity(density))
        }
        _ => Ok(()),
    }
}

/// Probability that clicking each of `cells` opens an empty region, that is
/// the cell and every unknown neighbour are all safe.
///
/// Revealed and flagged cells, and cells next to a flag, get `0.0`.
pub fn infer_opening_probabilities(
    game: &GameBoard,
    mine_count: impl Into<MineCount>,
    cells: &[Point],
) -> Result<Vec<f64>> {
    infer_opening_probabilities_with(game, mine_count, cells, &InferenceOptions::default())
}

pub fn infer_opening_probabilities_with(
    game: &GameBoard,
    mine_count: impl Into<MineCount>,
    cells: &[Point],
    options: &InferenceOptions,
) -> Result<Vec<f64>> {
    let dims = game.dims();
    for &cell in cells {
        dims.check(cell)?;
    }

    let base = infer_probabilities_with(game, mine_count, options)?;
    let constraints = Constraints::build(game)?;
    // Conditioning must not re-clamp a density, so the resolved total is reused.
    let declared = MineCount::Exact(base.mine_num);

    cells
        .par_iter()
        .map(|&cell| opening_probability(game, &constraints, &base, declared, cell, options))
        .collect()
}

// Chain rule: each factor is the safe probability of the next cell given
// that all cells before it are safe.
fn opening_probability(
    game: &GameBoard,
    constraints: &Constraints,
    base: &Inference,
    declared: MineCount,
    cell: Point,
    options: &InferenceOptions,
) -> Result<f64> {
    let dims = game.dims();
    if game.get(cell) != GameCell::Unknown
        || dims
            .neighbors(cell)
            .any(|n| game.get(n) == GameCell::Flagged)
    {
        return Ok(0.0);
    }

    let area = std::iter::once(cell)
        .chain(dims.neighbors(cell).filter(|&n| game.get(n) == GameCell::Unknown));
    let mut assumed = Vec::new();
    let mut probability = 1.0;
    for point in area {
        let p = if assumed.is_empty() {
            base.probabilities.get(point)
        } else {
            let conditioned = constraints
                .clone()
                .assume_safe(&assumed)
                .and_then(|given| infer_constrained(game, &given, declared, options));
            match conditioned {
                Ok(inference) => inference.probabilities.get(point),
                Err(Error::InconsistentBoard | Error::MineCountOutOfRange { .. }) => {
                    return Ok(0.0);
                }
                Err(err) => return Err(err),
            }
        };
        probability *= 1.0 - p.unwrap_or(0.0);
        if probability == 0.0 {
            break;
        }
        assumed.push(point);
    }
    Ok(probability)
}

fn infer_constrained(
    game: &GameBoard,
    constraints: &Constraints,
    mine_count: MineCount,
    options: &InferenceOptions,
) -> Result<Inference> {
    let partition = constraints.partition();
    log::debug!(
        "inferring {} unknown cells: {} components, {} floating",
        constraints.unknown.len(),
        partition.components.len(),
        partition.floating.len()
    );

    let tables = partition
        .components
        .par_iter()
        .map(|component| enumerate::enumerate(component, options.max_component_groups))
        .collect::<Result<Vec<_>>>()?;

    let (low, high) = combine::component_bounds(&tables);
    let min_mine_num = constraints.flagged + low;
    let max_mine_num = constraints.flagged + high + partition.floating.len();

    let (mine_num, clamped) = match mine_count {
        MineCount::Exact(declared) => {
            if declared < min_mine_num || declared > max_mine_num {
                return Err(Error::MineCountOutOfRange {
                    declared,
                    min: min_mine_num,
                    max: max_mine_num,
                });
            }
            (declared, false)
        }
        MineCount::Density(density) => {
            let declared = (game.dims().area() as f64 * density).floor() as usize;
            let mine_num = declared.clamp(min_mine_num, max_mine_num);
            if mine_num != declared {
                log::warn!(
                    "density {density} gives {declared} mines, clamped to {mine_num} \
                     (feasible {min_mine_num}..={max_mine_num})"
                );
            }
            (mine_num, mine_num != declared)
        }
    };

    let marginals = combine::marginals(
        &tables,
        partition.floating.len(),
        mine_num - constraints.flagged,
    )?;

    let dims = game.dims();
    let mut cells: Vec<CellProbability> = game
        .cells()
        .iter()
        .map(|cell| match cell {
            GameCell::Revealed(_) => CellProbability::Revealed,
            GameCell::Flagged => CellProbability::Flagged,
            GameCell::Unknown => CellProbability::Unknown(0.0),
        })
        .collect();
    for (table, probabilities) in tables.iter().zip(&marginals.components) {
        for (&point, &p) in table.cells.iter().zip(probabilities) {
            cells[dims.index(point)] = CellProbability::Unknown(p);
        }
    }
    if let Some(p) = marginals.floating {
        for &point in &partition.floating {
            cells[dims.index(point)] = CellProbability::Unknown(p);
        }
    }

    Ok(Inference {
        probabilities: ProbabilityGrid { dims, cells },
        min_mine_num,
        mine_num,
        max_mine_num,
        clamped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn game(rows: &[Vec<i32>]) -> GameBoard {
        GameBoard::from_rows(rows).unwrap()
    }

    fn p(x: usize, y: usize) -> Point {
        Point::new(x, y)
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_symmetric_pair() {
        let inference = infer_probabilities(&game(&[vec![10, 1, 10]]), 1).unwrap();
        assert_eq!(inference.min_mine_num, 1);
        assert_eq!(inference.max_mine_num, 1);
        assert_eq!(inference.mine_num, 1);
        assert!(close(inference.probabilities.get(p(0, 0)).unwrap(), 0.5));
        assert!(close(inference.probabilities.get(p(2, 0)).unwrap(), 0.5));
        assert_eq!(inference.probabilities.get(p(1, 0)), None);
    }

    #[test]
    fn test_component_and_floating_region() {
        let corner = game(&[vec![1, 10, 10, 10], vec![10, 10, 10, 10]]);
        let inference = infer_probabilities(&corner, 2).unwrap();
        assert_eq!(inference.min_mine_num, 1);
        assert_eq!(inference.max_mine_num, 5);

        let grid = &inference.probabilities;
        let component = [p(1, 0), p(0, 1), p(1, 1)];
        for point in component {
            assert!(close(grid.get(point).unwrap(), 1.0 / 3.0));
        }
        let sum: f64 = component.iter().map(|&q| grid.get(q).unwrap()).sum();
        assert!(close(sum, 1.0));
        for point in [p(2, 0), p(3, 0), p(2, 1), p(3, 1)] {
            assert!(close(grid.get(point).unwrap(), 0.25));
        }
    }

    #[test]
    fn test_flagged_cells_count_as_mines() {
        let inference = infer_probabilities(&game(&[vec![11, 10], vec![1, 10]]), 1).unwrap();
        assert_eq!(inference.min_mine_num, 1);
        assert_eq!(inference.max_mine_num, 1);
        assert_eq!(inference.probabilities.get(p(0, 0)), Some(1.0));
        assert_eq!(inference.forced_safe(), vec![p(1, 0), p(1, 1)]);
        assert!(inference.forced_mines().is_empty());
    }

    #[test]
    fn test_forced_mines_and_safest_cells() {
        // The '2' in the corner of a 2x2 board forces its two unknown neighbours.
        let inference = infer_probabilities(&game(&[vec![2, 10], vec![10, 0]]), 2);
        assert!(matches!(inference, Err(Error::InconsistentBoard)));

        let inference = infer_probabilities(&game(&[vec![10, 10, 10], vec![2, 2, 1]]), 2).unwrap();
        assert_eq!(inference.forced_mines(), vec![p(0, 0), p(1, 0)]);
        assert_eq!(inference.forced_safe(), vec![p(2, 0)]);
        assert_eq!(inference.safest_cells(), vec![p(2, 0)]);
    }

    #[test]
    fn test_conflicting_numbers_are_inconsistent() {
        let result = infer_probabilities(&game(&[vec![10, 10], vec![1, 2]]), 2);
        let err = result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InconsistentBoard);
    }

    #[test]
    fn test_exact_count_out_of_range() {
        let corner = game(&[vec![1, 10, 10, 10], vec![10, 10, 10, 10]]);
        let err = infer_probabilities(&corner, 10).unwrap_err();
        assert!(matches!(
            err,
            Error::MineCountOutOfRange {
                declared: 10,
                min: 1,
                max: 5
            }
        ));
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_density_is_clamped_and_signalled() {
        let corner = game(&[vec![1, 10, 10, 10], vec![10, 10, 10, 10]]);
        let inference = infer_probabilities(&corner, MineCount::Density(1.0)).unwrap();
        assert!(inference.clamped);
        assert_eq!(inference.mine_num, 5);

        // 8 cells * 0.25 = 2 mines, inside the feasible range.
        let inference = infer_probabilities(&corner, MineCount::from_hint(0.25)).unwrap();
        assert!(!inference.clamped);
        assert_eq!(inference.mine_num, 2);
    }

    #[test]
    fn test_invalid_density() {
        let board = game(&[vec![10, 10]]);
        assert!(matches!(
            infer_probabilities(&board, MineCount::Density(f64::NAN)),
            Err(Error::InvalidDensity(_))
        ));
        assert!(matches!(
            infer_probabilities(&board, MineCount::Density(-0.5)),
            Err(Error::InvalidDensity(_))
        ));
    }

    #[test]
    fn test_hint_parsing() {
        assert_eq!(MineCount::from_hint(0.2), MineCount::Density(0.2));
        assert_eq!(MineCount::from_hint(1.0), MineCount::Density(1.0));
        assert_eq!(MineCount::from_hint(40.0), MineCount::Exact(40));
    }

    #[test]
    fn test_non_finite_and_negative_hints_are_rejected() {
        let blank = game(&[vec![10, 10, 10], vec![10, 10, 10]]);
        for hint in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, -3.0] {
            assert!(matches!(MineCount::from_hint(hint), MineCount::Density(_)));
            let result = infer_probabilities(&blank, MineCount::from_hint(hint));
            assert!(matches!(result, Err(Error::InvalidDensity(_))), "hint {hint}");
        }
    }

    #[test]
    fn test_opening_probabilities_on_blank_row() {
        // One mine spread evenly over four cells.
        let blank = game(&[vec![10, 10, 10, 10]]);
        let odds = infer_opening_probabilities(&blank, 1, &[p(0, 0), p(1, 0)]).unwrap();
        assert!(close(odds[0], 0.5));
        assert!(close(odds[1], 0.25));
    }

    #[test]
    fn test_opening_probabilities_with_numbers_and_flags() {
        let row = game(&[vec![10, 1, 10, 10]]);
        let cells = [p(0, 0), p(1, 0), p(2, 0), p(3, 0)];

        let odds = infer_opening_probabilities(&row, 1, &cells).unwrap();
        assert!(close(odds[0], 0.5));
        assert_eq!(odds[1], 0.0);
        assert!(close(odds[2], 0.5));
        assert!(close(odds[3], 0.5));

        // With two mines the right end is a forced mine.
        let odds = infer_opening_probabilities(&row, 2, &cells).unwrap();
        assert!(close(odds[0], 0.5));
        assert_eq!(odds[2], 0.0);
        assert_eq!(odds[3], 0.0);

        let flagged = game(&[vec![11, 10, 10, 10]]);
        let odds = infer_opening_probabilities(&flagged, 2, &[p(0, 0), p(1, 0), p(3, 0)]).unwrap();
        assert_eq!(odds[0], 0.0);
        assert_eq!(odds[1], 0.0);
        assert!(close(odds[2], 1.0 / 3.0));
    }

    #[test]
    fn test_opening_probabilities_errors() {
        let row = game(&[vec![10, 1, 10, 10]]);
        assert!(matches!(
            infer_opening_probabilities(&row, 1, &[p(4, 0)]),
            Err(Error::OutOfBounds { .. })
        ));
        assert!(matches!(
            infer_opening_probabilities(&row, 3, &[p(0, 0)]),
            Err(Error::MineCountOutOfRange { .. })
        ));
        assert!(infer_opening_probabilities(&row, 1, &[]).unwrap().is_empty());
    }

    #[test]
    fn test_component_limit() {
        let corner = game(&[vec![10, 10, 10], vec![10, 2, 10], vec![10, 10, 10]]);
        let options = InferenceOptions {
            max_component_groups: 0,
        };
        let err = infer_probabilities_with(&corner, 2, &options).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Enumeration);
    }

    #[test]
    fn test_fully_revealed_board() {
        let inference = infer_probabilities(&game(&[vec![0, 0], vec![0, 0]]), 0).unwrap();
        assert_eq!(inference.min_mine_num, 0);
        assert_eq!(inference.max_mine_num, 0);
        assert_eq!(inference.probabilities.to_flat(), vec![-1.0; 4]);
        assert!(inference.safest_cells().is_empty());
    }

    #[test]
    fn test_grid_shapes_agree() {
        let corner = game(&[vec![1, 10, 10, 10], vec![10, 10, 10, 10]]);
        let inference = infer_probabilities(&corner, 2).unwrap();
        let flat = inference.probabilities.to_flat();
        let rows = inference.probabilities.to_rows();
        assert_eq!(rows.concat(), flat);
        assert_eq!(flat[0], -1.0);
    }
}
