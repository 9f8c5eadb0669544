//! Cheap deductions from one number, or two overlapping numbers.

use super::Deductions;
use crate::board::Point;
use crate::constraints::Constraint;
use itertools::Itertools;
use std::collections::BTreeSet;

pub(crate) fn deduce(constraints: &[Constraint]) -> Deductions {
    let mut found = Deductions::default();

    for constraint in constraints {
        if constraint.required_mines == 0 {
            found.safe.extend(constraint.variables.iter().copied());
        } else if constraint.required_mines == constraint.variables.len() {
            found.mines.extend(constraint.variables.iter().copied());
        }
    }
    if !found.is_empty() {
        return found;
    }

    for (a, b) in constraints.iter().tuple_combinations() {
        let cells_a: BTreeSet<Point> = a.variables.iter().copied().collect();
        let cells_b: BTreeSet<Point> = b.variables.iter().copied().collect();
        if cells_a.is_disjoint(&cells_b) {
            continue;
        }
        let only_a: Vec<Point> = cells_a.difference(&cells_b).copied().collect();
        let only_b: Vec<Point> = cells_b.difference(&cells_a).copied().collect();

        // If b needs exactly as many more mines than a as it has cells of its
        // own, those cells are all mines and a's own cells are all safe.
        for (lhs, rhs, own_lhs, own_rhs) in [(a, b, &only_a, &only_b), (b, a, &only_b, &only_a)] {
            if rhs.required_mines >= lhs.required_mines
                && rhs.required_mines - lhs.required_mines == own_rhs.len()
            {
                found.mines.extend(own_rhs.iter().copied());
                found.safe.extend(own_lhs.iter().copied());
            }
        }
    }
    found
}
