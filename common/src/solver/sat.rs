//! Whole-board deduction with a SAT solver.
//!
//! One boolean variable per frontier cell (an unknown cell next to a revealed
//! number). Every number becomes an exactly-k cardinality constraint, and the
//! mine total bounds how many mines the frontier can hold, given that the
//! interior cells can absorb at most one mine each. Interior cells are
//! interchangeable, so they are decided together from those bounds.

use super::Deductions;
use crate::board::Point;
use crate::constraints::Constraints;
use itertools::Itertools;
use std::collections::{HashMap, HashSet};
use varisat::{CnfFormula, ExtendFormula, Lit, Solver, Var};

/// Sets up to this size use the naive combination encoding.
const NAIVE_ENCODING_LIMIT: usize = 10;

/// The possible outcomes of the analysis for a single unknown cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeducedState {
    ForcedMine,   // All valid solutions require this cell to be a mine.
    ForcedSafe,   // All valid solutions require this cell to be safe.
    Undetermined, // Valid solutions exist for this cell being either a mine or safe.
}

/// A solver loaded with the number constraints and a bound on the number of
/// mines on the frontier.
struct FrontierSolver<'a> {
    solver: Solver<'a>,
    var_map: HashMap<Point, Var>,
}

impl FrontierSolver<'_> {
    fn new(constraints: &Constraints, frontier: &[Point], low: usize, high: usize) -> Self {
        let mut solver = Solver::new();
        let var_map: HashMap<Point, Var> =
            frontier.iter().map(|&point| (point, solver.new_var())).collect();

        let mut formula = CnfFormula::new();
        for constraint in &constraints.local {
            let lits: Vec<Lit> = constraint
                .variables
                .iter()
                .map(|p| Lit::from_var(var_map[p], true))
                .collect();
            encode_exactly_k_to_formula(&mut formula, &mut solver, &lits, constraint.required_mines);
        }

        let all: Vec<Lit> = frontier
            .iter()
            .map(|p| Lit::from_var(var_map[p], true))
            .collect();
        encode_at_least_k_to_formula(&mut formula, &mut solver, &all, low);
        encode_at_most_k_to_formula(&mut formula, &mut solver, &all, high);

        solver.add_formula(&formula);
        FrontierSolver { solver, var_map }
    }

    fn satisfiable(&mut self) -> bool {
        self.solver.solve().unwrap_or(false)
    }

    /// Classifies every frontier cell, testing only the polarity the first
    /// model does not already witness.
    fn deduce(&mut self) -> HashMap<Point, DeducedState> {
        let mut deductions = HashMap::new();
        if !self.satisfiable() {
            return deductions;
        }
        let Some(model) = self.solver.model() else {
            return deductions;
        };
        let model: HashSet<Lit> = model.into_iter().collect();

        for (&point, &var) in &self.var_map {
            let lit_mine = Lit::from_var(var, true);
            let is_mine = model.contains(&lit_mine);

            self.solver.assume(&[if is_mine { !lit_mine } else { lit_mine }]);
            // A solver failure counts as "possible" so nothing is wrongly forced.
            let opposite_possible = self.solver.solve().unwrap_or(true);
            self.solver.assume(&[]);

            let state = match (opposite_possible, is_mine) {
                (true, _) => DeducedState::Undetermined,
                (false, true) => DeducedState::ForcedMine,
                (false, false) => DeducedState::ForcedSafe,
            };
            deductions.insert(point, state);
        }
        deductions
    }
}

/// Finds every cell whose state follows from all the numbers and the mine
/// total taken together. `remaining` is the number of mines not yet flagged.
pub(crate) fn deduce(constraints: &Constraints, remaining: usize) -> Deductions {
    let frontier = constraints.frontier();
    let interior = constraints.interior();
    let low = remaining.saturating_sub(interior.len());

    let mut found = Deductions::default();
    let states = FrontierSolver::new(constraints, &frontier, low, remaining).deduce();
    for (point, state) in states {
        match state {
            DeducedState::ForcedMine => {
                found.mines.insert(point);
            }
            DeducedState::ForcedSafe => {
                found.safe.insert(point);
            }
            DeducedState::Undetermined => {}
        }
    }
    if !found.is_empty() || interior.is_empty() {
        return found;
    }

    // The interior is mine-free iff the frontier cannot leave a mine over.
    let interior_safe = remaining == 0
        || !FrontierSolver::new(constraints, &frontier, low, remaining - 1).satisfiable();
    // The interior is all mines iff the frontier cannot take one more.
    let interior_mines = remaining >= interior.len()
        && !FrontierSolver::new(constraints, &frontier, low + 1, remaining).satisfiable();

    if interior_safe {
        found.safe.extend(interior);
    } else if interior_mines {
        found.mines.extend(interior);
    }
    found
}

/// Encodes an "exactly k" constraint into the CNF formula.
fn encode_exactly_k_to_formula(
    formula: &mut CnfFormula,
    solver: &mut Solver,
    vars: &[Lit],
    k: usize,
) {
    encode_at_most_k_to_formula(formula, solver, vars, k);
    encode_at_least_k_to_formula(formula, solver, vars, k);
}

/// Encodes an "at most k" constraint into the CNF formula.
fn encode_at_most_k_to_formula(
    formula: &mut CnfFormula,
    solver: &mut Solver,
    vars: &[Lit],
    k: usize,
) {
    if k >= vars.len() {
        return;
    }
    if k == 0 {
        for &lit in vars {
            formula.add_clause(&[!lit]);
        }
        return;
    }

    if vars.len() <= NAIVE_ENCODING_LIMIT {
        // Every k+1 cells hold at least one safe cell.
        for combo in vars.iter().copied().combinations(k + 1) {
            let clause: Vec<Lit> = combo.iter().map(|&lit| !lit).collect();
            formula.add_clause(&clause);
        }
    } else {
        // At most k true is at least n-k false.
        let negated: Vec<Lit> = vars.iter().map(|&lit| !lit).collect();
        encode_sequential_counter_to_formula(formula, solver, &negated, vars.len() - k);
    }
}

/// Encodes an "at least k" constraint into the CNF formula.
fn encode_at_least_k_to_formula(
    formula: &mut CnfFormula,
    solver: &mut Solver,
    vars: &[Lit],
    k: usize,
) {
    if k == 0 {
        return;
    }
    if k > vars.len() {
        formula.add_clause(&[]);
        return;
    }

    if vars.len() <= NAIVE_ENCODING_LIMIT {
        // Every n-k+1 cells hold at least one mine.
        for combo in vars.iter().copied().combinations(vars.len() - k + 1) {
            formula.add_clause(&combo);
        }
    } else {
        encode_sequential_counter_to_formula(formula, solver, vars, k);
    }
}

/// Sequential counter for "at least k" with `1 <= k <= vars.len()`.
///
/// `s[i][j]` holds iff at least `j + 1` of `vars[..=i]` are true.
fn encode_sequential_counter_to_formula(
    formula: &mut CnfFormula,
    solver: &mut Solver,
    vars: &[Lit],
    k: usize,
) {
    let n = vars.len();
    let s: Vec<Vec<Lit>> = (0..n)
        .map(|_| (0..k).map(|_| Lit::from_var(solver.new_var(), true)).collect())
        .collect();

    // s[0][0] = x[0], and one variable cannot reach a higher count.
    formula.add_clause(&[!s[0][0], vars[0]]);
    formula.add_clause(&[!vars[0], s[0][0]]);
    for &count in &s[0][1..] {
        formula.add_clause(&[!count]);
    }

    for i in 1..n {
        let x = vars[i];
        for j in 0..k {
            let (cur, prev) = (s[i][j], s[i - 1][j]);
            formula.add_clause(&[!prev, cur]);
            if j == 0 {
                // s[i][0] = s[i-1][0] OR x[i]
                formula.add_clause(&[!cur, prev, x]);
                formula.add_clause(&[!x, cur]);
            } else {
                // s[i][j] = s[i-1][j] OR (x[i] AND s[i-1][j-1])
                let below = s[i - 1][j - 1];
                formula.add_clause(&[!cur, prev, x]);
                formula.add_clause(&[!cur, prev, below]);
                formula.add_clause(&[!x, !below, cur]);
            }
        }
    }

    formula.add_clause(&[s[n - 1][k - 1]]);
}
