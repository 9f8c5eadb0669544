//! Translation of a [`GameBoard`] into counting constraints over its unknown
//! cells, and the partition of those cells into independent components.

use crate::board::{GameBoard, GameCell, Point};
use crate::error::{Error, Result};
use itertools::Itertools;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

/// A revealed number seen from its unknown neighbours.
/// For example, a revealed '2' next to one flag creates a constraint that
/// exactly 1 mine must be among its remaining unknown neighbours.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Constraint {
    /// The unknown cells this constraint applies to, sorted.
    pub variables: Vec<Point>,
    /// The exact number of mines that must be present among the variables.
    pub required_mines: usize,
}

/// Every constraint of a board snapshot.
#[derive(Debug, Clone)]
pub struct Constraints {
    /// All unknown (unflagged, unrevealed) cells, row-major.
    pub unknown: Vec<Point>,
    /// Constraints from revealed numbers that still border unknown cells.
    pub local: Vec<Constraint>,
    /// Flagged cells, which count as mines.
    pub flagged: usize,
}

/// A maximal set of unknown cells linked through shared constraints.
#[derive(Debug, Clone)]
pub struct Component {
    pub cells: Vec<Point>,
    pub constraints: Vec<Constraint>,
}

/// Unknown cells split into independent components plus the cells that
/// border no revealed number at all.
#[derive(Debug, Clone)]
pub struct Partition {
    pub components: Vec<Component>,
    pub floating: Vec<Point>,
}

impl Constraints {
    /// Builds constraints from every revealed number.
    ///
    /// Fails with [`Error::InconsistentBoard`] when a number is already
    /// impossible on its own: more flags than the number, or more mines
    /// required than unknown neighbours remain.
    pub fn build(game: &GameBoard) -> Result<Self> {
        let dims = game.dims();
        let mut unknown = Vec::new();
        let mut flagged = 0;
        let mut local = Vec::new();

        for point in dims.points() {
            match game.get(point) {
                GameCell::Unknown => unknown.push(point),
                GameCell::Flagged => flagged += 1,
                GameCell::Revealed(number) => {
                    let mut variables = Vec::new();
                    let mut flags = 0;
                    for neighbor in dims.neighbors(point) {
                        match game.get(neighbor) {
                            GameCell::Unknown => variables.push(neighbor),
                            GameCell::Flagged => flags += 1,
                            // A revealed neighbour provides no information for this constraint.
                            GameCell::Revealed(_) => {}
                        }
                    }

                    let required_mines = (number as usize)
                        .checked_sub(flags)
                        .ok_or(Error::InconsistentBoard)?;
                    if required_mines > variables.len() {
                        return Err(Error::InconsistentBoard);
                    }
                    // Only keep a constraint if there are still unknown variables.
                    if !variables.is_empty() {
                        variables.sort();
                        local.push(Constraint {
                            variables,
                            required_mines,
                        });
                    }
                }
            }
        }

        // Neighbouring numbers often see exactly the same unknown cells.
        let local = local.into_iter().unique().collect();

        Ok(Constraints {
            unknown,
            local,
            flagged,
        })
    }

    /// Treats `cells` as known to be safe: they leave the unknown set and
    /// every constraint that sees them.
    pub fn assume_safe(mut self, cells: &[Point]) -> Result<Self> {
        let safe: HashSet<Point> = cells.iter().copied().collect();
        self.unknown.retain(|p| !safe.contains(p));

        let mut local = Vec::with_capacity(self.local.len());
        for mut constraint in std::mem::take(&mut self.local) {
            constraint.variables.retain(|p| !safe.contains(p));
            if constraint.required_mines > constraint.variables.len() {
                return Err(Error::InconsistentBoard);
            }
            if !constraint.variables.is_empty() {
                local.push(constraint);
            }
        }
        self.local = local.into_iter().unique().collect();
        Ok(self)
    }

    /// Unknown cells that border at least one revealed number, row-major.
    pub fn frontier(&self) -> Vec<Point> {
        self.local
            .iter()
            .flat_map(|c| c.variables.iter().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Unknown cells that border no revealed number, row-major.
    pub fn interior(&self) -> Vec<Point> {
        let frontier: HashSet<Point> = self
            .local
            .iter()
            .flat_map(|c| c.variables.iter().copied())
            .collect();
        self.unknown
            .iter()
            .copied()
            .filter(|p| !frontier.contains(p))
            .collect()
    }

    /// Splits the unknown cells into independent components.
    ///
    /// Components are ordered by their first constraint, and cells within a
    /// component are row-major, so the partition is deterministic.
    pub fn partition(&self) -> Partition {
        let mut by_cell: HashMap<Point, Vec<usize>> = HashMap::new();
        for (index, constraint) in self.local.iter().enumerate() {
            for &cell in &constraint.variables {
                by_cell.entry(cell).or_default().push(index);
            }
        }

        let mut assigned = vec![false; self.local.len()];
        let mut components = Vec::new();
        for start in 0..self.local.len() {
            if assigned[start] {
                continue;
            }
            assigned[start] = true;

            let mut members = vec![start];
            let mut cells = BTreeSet::new();
            let mut queue = VecDeque::from([start]);
            while let Some(index) = queue.pop_front() {
                for cell in &self.local[index].variables {
                    if !cells.insert(*cell) {
                        continue;
                    }
                    for &other in &by_cell[cell] {
                        if !assigned[other] {
                            assigned[other] = true;
                            members.push(other);
                            queue.push_back(other);
                        }
                    }
                }
            }

            members.sort_unstable();
            components.push(Component {
                cells: cells.into_iter().collect(),
                constraints: members.into_iter().map(|i| self.local[i].clone()).collect(),
            });
        }

        Partition {
            components,
            floating: self.interior(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(rows: &[Vec<i32>]) -> GameBoard {
        GameBoard::from_rows(rows).unwrap()
    }

    #[test]
    fn test_constraint_building() {
        // One revealed '1' in the middle of a 3x3 board.
        let game = game(&[vec![10, 10, 10], vec![10, 1, 10], vec![10, 10, 10]]);
        let Constraints {
            unknown,
            local,
            flagged,
        } = Constraints::build(&game).unwrap();

        assert_eq!(unknown.len(), 8);
        assert_eq!(local.len(), 1);
        assert_eq!(local[0].required_mines, 1);
        assert_eq!(flagged, 0);
    }

    #[test]
    fn test_flags_reduce_requirement() {
        let game = game(&[vec![11, 10, 10], vec![10, 2, 10]]);
        let constraints = Constraints::build(&game).unwrap();
        assert_eq!(constraints.flagged, 1);
        assert_eq!(constraints.local[0].required_mines, 1);
        assert_eq!(constraints.local[0].variables.len(), 4);
    }

    #[test]
    fn test_assume_safe_shrinks_constraints() {
        let game = game(&[vec![10, 10], vec![1, 10]]);
        let constraints = Constraints::build(&game).unwrap();

        let given = constraints
            .clone()
            .assume_safe(&[Point::new(0, 0), Point::new(1, 0)])
            .unwrap();
        assert_eq!(given.unknown, vec![Point::new(1, 1)]);
        assert_eq!(given.local.len(), 1);
        assert_eq!(given.local[0].variables, vec![Point::new(1, 1)]);
        assert_eq!(given.local[0].required_mines, 1);

        let all = [Point::new(0, 0), Point::new(1, 0), Point::new(1, 1)];
        assert!(matches!(
            constraints.assume_safe(&all),
            Err(Error::InconsistentBoard)
        ));
    }

    #[test]
    fn test_too_many_flags_is_inconsistent() {
        let game = game(&[vec![11, 11], vec![1, 10]]);
        assert!(matches!(
            Constraints::build(&game),
            Err(Error::InconsistentBoard)
        ));
    }

    #[test]
    fn test_number_larger_than_unknowns_is_inconsistent() {
        let game = game(&[vec![3, 10], vec![10, 0]]);
        assert!(matches!(
            Constraints::build(&game),
            Err(Error::InconsistentBoard)
        ));
    }

    #[test]
    fn test_duplicate_constraints_collapse() {
        // Both numbers see exactly the two unknown cells of the top row.
        let game = game(&[vec![10, 10], vec![1, 1]]);
        let constraints = Constraints::build(&game).unwrap();
        assert_eq!(constraints.local.len(), 1);
    }

    #[test]
    fn test_partition_separates_components() {
        let split = game(&[vec![10, 1, 0, 1, 10], vec![10, 1, 0, 1, 10]]);
        let partition = Constraints::build(&split).unwrap().partition();
        assert_eq!(partition.components.len(), 2);
        assert!(partition.floating.is_empty());
        assert_eq!(
            partition.components[0].cells,
            vec![Point::new(0, 0), Point::new(0, 1)]
        );
        assert_eq!(
            partition.components[1].cells,
            vec![Point::new(4, 0), Point::new(4, 1)]
        );
    }

    #[test]
    fn test_partition_floating_region() {
        let corner = game(&[vec![1, 10, 10, 10], vec![10, 10, 10, 10]]);
        let partition = Constraints::build(&corner).unwrap().partition();
        assert_eq!(partition.components.len(), 1);
        assert_eq!(partition.components[0].cells.len(), 3);
        assert_eq!(
            partition.floating,
            vec![
                Point::new(2, 0),
                Point::new(3, 0),
                Point::new(2, 1),
                Point::new(3, 1)
            ]
        );
    }

    #[test]
    fn test_every_unknown_cell_is_placed_once() {
        let game = game(&[
            vec![10, 10, 10, 10],
            vec![10, 2, 10, 10],
            vec![10, 10, 10, 10],
            vec![10, 10, 10, 1],
        ]);
        let constraints = Constraints::build(&game).unwrap();
        let partition = constraints.partition();
        let mut placed: Vec<Point> = partition
            .components
            .iter()
            .flat_map(|c| c.cells.iter().copied())
            .chain(partition.floating.iter().copied())
            .collect();
        placed.sort();
        let total = placed.len();
        placed.dedup();
        assert_eq!(placed.len(), total);
        assert_eq!(placed, constraints.unknown);
    }
}
