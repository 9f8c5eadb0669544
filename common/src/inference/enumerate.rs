//! Exhaustive counting of the mine assignments of a single component.
//!
//! Cells that are seen by exactly the same constraints are interchangeable,
//! so they are merged into groups and a group holding `u` of its `g` cells as
//! mines stands for `C(g, u)` assignments. Unit propagation and subset
//! reduction then fix whatever they can before the remaining groups are
//! enumerated with per-constraint bounds.

use crate::board::Point;
use crate::constraints::Component;
use crate::error::{Error, Result};
use itertools::Itertools;
use num_bigint::BigUint;
use num_traits::{One, Zero};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Assignment counts of one component, bucketed by its total number of mines.
#[derive(Debug, Clone)]
pub(crate) struct ComponentTable {
    pub cells: Vec<Point>,
    /// Smallest feasible mine total; bucket `i` holds total `min_mines + i`.
    pub min_mines: usize,
    /// Number of consistent assignments per bucket.
    pub counts: Vec<BigUint>,
    /// `cell_counts[i][c]` is how many assignments of bucket `i` have `cells[c]` as a mine.
    pub cell_counts: Vec<Vec<BigUint>>,
}

impl ComponentTable {
    pub fn max_mines(&self) -> usize {
        self.min_mines + self.counts.len() - 1
    }
}

/// A constraint over groups: exactly `required` mines among the cells of `groups`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct GroupConstraint {
    groups: Vec<usize>,
    required: usize,
}

pub(crate) fn enumerate(component: &Component, max_groups: usize) -> Result<ComponentTable> {
    let index_of: HashMap<Point, usize> = component
        .cells
        .iter()
        .enumerate()
        .map(|(i, &p)| (p, i))
        .collect();

    // --- 1. Merge interchangeable cells ---
    let mut signatures: Vec<Vec<usize>> = vec![Vec::new(); component.cells.len()];
    for (c, constraint) in component.constraints.iter().enumerate() {
        for cell in &constraint.variables {
            signatures[index_of[cell]].push(c);
        }
    }
    let mut by_signature: BTreeMap<&[usize], Vec<usize>> = BTreeMap::new();
    for (cell, signature) in signatures.iter().enumerate() {
        by_signature.entry(signature.as_slice()).or_default().push(cell);
    }
    let groups: Vec<Vec<usize>> = by_signature.into_values().collect();
    let sizes: Vec<usize> = groups.iter().map(Vec::len).collect();
    let mut group_of = vec![0; component.cells.len()];
    for (g, cells) in groups.iter().enumerate() {
        for &cell in cells {
            group_of[cell] = g;
        }
    }

    let constraints: Vec<GroupConstraint> = component
        .constraints
        .iter()
        .map(|constraint| GroupConstraint {
            groups: constraint
                .variables
                .iter()
                .map(|cell| group_of[index_of[cell]])
                .sorted_unstable()
                .dedup()
                .collect(),
            required: constraint.required_mines,
        })
        .collect();

    // --- 2. Fix what propagation can prove ---
    let mut reducer = Reducer::new(&sizes, constraints);
    reducer.propagate()?;
    let Reducer {
        fixed, constraints, ..
    } = reducer;

    // --- 3. Enumerate the undecided groups ---
    let mut order = Vec::new();
    let mut placed = vec![false; sizes.len()];
    for constraint in &constraints {
        for &g in &constraint.groups {
            if fixed[g].is_none() && !placed[g] {
                placed[g] = true;
                order.push(g);
            }
        }
    }
    log::trace!(
        "component of {} cells: {} groups, {} undecided, {} constraints",
        component.cells.len(),
        sizes.len(),
        order.len(),
        constraints.len()
    );
    if order.len() > max_groups {
        return Err(Error::ComponentTooLarge {
            cells: component.cells.len(),
            groups: order.len(),
            limit: max_groups,
        });
    }

    let mut search = Search::new(&sizes, &fixed, &constraints, order, component.cells.len());
    search.run(0, &BigUint::one());

    // --- 4. Trim empty buckets and expand groups back to cells ---
    let first = search.counts.iter().position(|c| !c.is_zero());
    let last = search.counts.iter().rposition(|c| !c.is_zero());
    let (Some(first), Some(last)) = (first, last) else {
        return Err(Error::InconsistentBoard);
    };

    let counts = search.counts[first..=last].to_vec();
    let cell_counts = search.hits[first..=last]
        .iter()
        .map(|hits| group_of.iter().map(|&g| hits[g].clone()).collect())
        .collect();

    Ok(ComponentTable {
        cells: component.cells.clone(),
        min_mines: first,
        counts,
        cell_counts,
    })
}

struct Reducer<'a> {
    sizes: &'a [usize],
    fixed: Vec<Option<usize>>,
    constraints: Vec<GroupConstraint>,
    seen: HashSet<Vec<usize>>,
}

impl<'a> Reducer<'a> {
    fn new(sizes: &'a [usize], constraints: Vec<GroupConstraint>) -> Self {
        let seen = constraints.iter().map(|c| c.groups.clone()).collect();
        Reducer {
            sizes,
            fixed: vec![None; sizes.len()],
            constraints,
            seen,
        }
    }

    /// Unfixed groups of a constraint and the mines still required among them.
    fn residual(&self, constraint: &GroupConstraint) -> Result<(Vec<usize>, usize)> {
        let mut placed = 0;
        let mut free = Vec::new();
        for &g in &constraint.groups {
            match self.fixed[g] {
                Some(mines) => placed += mines,
                None => free.push(g),
            }
        }
        let remaining = constraint
            .required
            .checked_sub(placed)
            .ok_or(Error::InconsistentBoard)?;
        if remaining > self.capacity(&free) {
            return Err(Error::InconsistentBoard);
        }
        Ok((free, remaining))
    }

    fn capacity(&self, groups: &[usize]) -> usize {
        groups.iter().map(|&g| self.sizes[g]).sum()
    }

    fn propagate(&mut self) -> Result<()> {
        // Derived constraints are implied by the originals, so capping them
        // only costs pruning power.
        let limit = 4 * self.constraints.len() + 64;

        loop {
            // Unit propagation: saturated or empty constraints decide all their groups.
            let mut changed = false;
            for index in 0..self.constraints.len() {
                let (free, remaining) = self.residual(&self.constraints[index])?;
                if free.is_empty() {
                    continue;
                }
                if remaining == 0 {
                    for g in free {
                        self.fixed[g] = Some(0);
                    }
                    changed = true;
                } else if remaining == self.capacity(&free) {
                    for g in free {
                        self.fixed[g] = Some(self.sizes[g]);
                    }
                    changed = true;
                }
            }
            if changed {
                continue;
            }

            // Subset reduction: A within B leaves exactly B - A mines in B \ A.
            let residuals = self
                .constraints
                .iter()
                .map(|c| self.residual(c))
                .collect::<Result<Vec<_>>>()?;
            let mut derived = Vec::new();
            for (a, b) in residuals.iter().tuple_combinations() {
                let (small, large) = if a.0.len() <= b.0.len() { (a, b) } else { (b, a) };
                if small.0.is_empty() || !is_subset(&small.0, &large.0) {
                    continue;
                }
                let remaining = large
                    .1
                    .checked_sub(small.1)
                    .ok_or(Error::InconsistentBoard)?;
                if small.0.len() == large.0.len() {
                    if remaining != 0 {
                        return Err(Error::InconsistentBoard);
                    }
                    continue;
                }
                derived.push(GroupConstraint {
                    groups: large.0.iter().copied().filter(|g| !small.0.contains(g)).collect(),
                    required: remaining,
                });
            }

            for constraint in derived {
                if self.constraints.len() >= limit {
                    break;
                }
                if self.seen.insert(constraint.groups.clone()) {
                    self.constraints.push(constraint);
                    changed = true;
                }
            }
            if !changed {
                return Ok(());
            }
        }
    }
}

// Both slices are sorted.
fn is_subset(small: &[usize], large: &[usize]) -> bool {
    let mut rest = large.iter();
    small.iter().all(|g| rest.any(|h| h == g))
}

struct Search<'a> {
    sizes: &'a [usize],
    order: Vec<usize>,
    /// Mines placed in each group so far, fixed groups included.
    values: Vec<usize>,
    /// Active constraints touching each group.
    touching: Vec<Vec<usize>>,
    /// Mines still required by each active constraint.
    remaining: Vec<i64>,
    /// Cells not yet assigned in each active constraint.
    open: Vec<i64>,
    counts: Vec<BigUint>,
    hits: Vec<Vec<BigUint>>,
}

impl<'a> Search<'a> {
    fn new(
        sizes: &'a [usize],
        fixed: &[Option<usize>],
        constraints: &[GroupConstraint],
        order: Vec<usize>,
        cells: usize,
    ) -> Self {
        let values: Vec<usize> = fixed.iter().map(|v| v.unwrap_or(0)).collect();
        let mut touching = vec![Vec::new(); sizes.len()];
        let mut remaining = Vec::new();
        let mut open = Vec::new();

        for constraint in constraints {
            let free: Vec<usize> = constraint
                .groups
                .iter()
                .copied()
                .filter(|&g| fixed[g].is_none())
                .collect();
            if free.is_empty() {
                continue;
            }
            let placed: usize = constraint
                .groups
                .iter()
                .filter_map(|&g| fixed[g])
                .sum();
            let index = remaining.len();
            remaining.push(constraint.required as i64 - placed as i64);
            open.push(free.iter().map(|&g| sizes[g] as i64).sum());
            for g in free {
                touching[g].push(index);
            }
        }

        Search {
            sizes,
            order,
            values,
            touching,
            remaining,
            open,
            counts: vec![BigUint::zero(); cells + 1],
            hits: vec![vec![BigUint::zero(); sizes.len()]; cells + 1],
        }
    }

    fn run(&mut self, depth: usize, weight: &BigUint) {
        if depth == self.order.len() {
            self.record(weight);
            return;
        }

        let group = self.order[depth];
        let size = self.sizes[group] as i64;
        let mut lower = 0;
        let mut upper = size;
        for &c in &self.touching[group] {
            upper = upper.min(self.remaining[c]);
            lower = lower.max(self.remaining[c] - (self.open[c] - size));
        }

        for mines in lower..=upper {
            for &c in &self.touching[group] {
                self.remaining[c] -= mines;
                self.open[c] -= size;
            }
            self.values[group] = mines as usize;

            let next = weight * BigUint::from(binomial(size as u64, mines as u64));
            self.run(depth + 1, &next);

            for &c in &self.touching[group] {
                self.remaining[c] += mines;
                self.open[c] += size;
            }
        }
        self.values[group] = 0;
    }

    fn record(&mut self, weight: &BigUint) {
        let total: usize = self.values.iter().sum();
        self.counts[total] += weight;
        for (g, &mines) in self.values.iter().enumerate() {
            if mines > 0 {
                // C(g, u) * u / g assignments put a given cell of the group on a mine.
                self.hits[total][g] += weight * BigUint::from(mines) / BigUint::from(self.sizes[g]);
            }
        }
    }
}

/// Small binomial coefficient; groups never exceed the eight neighbours of a number.
fn binomial(n: u64, k: u64) -> u64 {
    let k = k.min(n - k);
    (0..k).fold(1, |c, i| c * (n - i) / (i + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::Constraint;

    fn p(x: usize, y: usize) -> Point {
        Point::new(x, y)
    }

    fn component(constraints: Vec<(Vec<Point>, usize)>) -> Component {
        let mut cells: Vec<Point> = constraints
            .iter()
            .flat_map(|(vars, _)| vars.iter().copied())
            .collect();
        cells.sort();
        cells.dedup();
        Component {
            cells,
            constraints: constraints
                .into_iter()
                .map(|(mut variables, required_mines)| {
                    variables.sort();
                    Constraint {
                        variables,
                        required_mines,
                    }
                })
                .collect(),
        }
    }

    fn as_u64(values: &[BigUint]) -> Vec<u64> {
        values
            .iter()
            .map(|v| u64::try_from(v).unwrap())
            .collect()
    }

    #[test]
    fn test_single_constraint() {
        let table = enumerate(&component(vec![(vec![p(0, 0), p(1, 0), p(2, 0)], 1)]), 55).unwrap();
        assert_eq!(table.min_mines, 1);
        assert_eq!(table.max_mines(), 1);
        assert_eq!(as_u64(&table.counts), vec![3]);
        assert_eq!(as_u64(&table.cell_counts[0]), vec![1, 1, 1]);
    }

    #[test]
    fn test_overlapping_constraints() {
        // a + b = 1, b + c = 1: either b alone, or a and c.
        let table = enumerate(
            &component(vec![
                (vec![p(0, 0), p(1, 0)], 1),
                (vec![p(1, 0), p(2, 0)], 1),
            ]),
            55,
        )
        .unwrap();
        assert_eq!(table.min_mines, 1);
        assert_eq!(as_u64(&table.counts), vec![1, 1]);
        assert_eq!(as_u64(&table.cell_counts[0]), vec![0, 1, 0]);
        assert_eq!(as_u64(&table.cell_counts[1]), vec![1, 0, 1]);
    }

    #[test]
    fn test_subset_reduction_decides_cells() {
        // {a, b} = 1 inside {a, b, c} = 2 forces c.
        let table = enumerate(
            &component(vec![
                (vec![p(0, 0), p(1, 0)], 1),
                (vec![p(0, 0), p(1, 0), p(2, 0)], 2),
            ]),
            0,
        );
        // c is decided without search, a and b remain one undecided group.
        assert!(matches!(table, Err(Error::ComponentTooLarge { groups: 1, .. })));

        let table = enumerate(
            &component(vec![
                (vec![p(0, 0), p(1, 0)], 1),
                (vec![p(0, 0), p(1, 0), p(2, 0)], 2),
            ]),
            1,
        )
        .unwrap();
        assert_eq!(as_u64(&table.counts), vec![2]);
        assert_eq!(as_u64(&table.cell_counts[0]), vec![1, 1, 2]);
    }

    #[test]
    fn test_saturated_constraint_needs_no_search() {
        let table = enumerate(
            &component(vec![
                (vec![p(0, 0), p(1, 0)], 2),
                (vec![p(1, 0), p(2, 0)], 1),
            ]),
            0,
        )
        .unwrap();
        assert_eq!(as_u64(&table.counts), vec![1]);
        assert_eq!(table.min_mines, 2);
        assert_eq!(as_u64(&table.cell_counts[0]), vec![1, 1, 0]);
    }

    #[test]
    fn test_conflicting_constraints() {
        let result = enumerate(
            &component(vec![
                (vec![p(0, 0), p(1, 0)], 1),
                (vec![p(0, 0), p(1, 0)], 2),
            ]),
            55,
        );
        assert!(matches!(result, Err(Error::InconsistentBoard)));
    }

    #[test]
    fn test_grouped_cells_count_combinations() {
        // Four interchangeable cells holding two mines: C(4, 2) = 6 assignments,
        // each cell a mine in C(3, 1) = 3 of them.
        let cells = vec![p(0, 0), p(1, 0), p(2, 0), p(3, 0)];
        let table = enumerate(&component(vec![(cells, 2)]), 55).unwrap();
        assert_eq!(as_u64(&table.counts), vec![6]);
        assert_eq!(as_u64(&table.cell_counts[0]), vec![3, 3, 3, 3]);
    }

    #[test]
    fn test_binomial() {
        assert_eq!(binomial(8, 0), 1);
        assert_eq!(binomial(8, 4), 70);
        assert_eq!(binomial(5, 5), 1);
        assert_eq!(binomial(6, 2), 15);
    }

    #[test]
    fn test_is_subset() {
        assert!(is_subset(&[1, 3], &[0, 1, 2, 3]));
        assert!(!is_subset(&[1, 4], &[0, 1, 2, 3]));
        assert!(is_subset(&[], &[0]));
    }
}
