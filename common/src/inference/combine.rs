//! Combination of per-component tables with the floating region under a
//! fixed mine total.

use super::enumerate::ComponentTable;
use crate::error::{Error, Result};
use num_bigint::BigUint;
use num_traits::{One, ToPrimitive, Zero};

/// Assignment counts over a contiguous range of mine totals.
#[derive(Debug, Clone)]
struct Distribution {
    offset: usize,
    weights: Vec<BigUint>,
}

impl Distribution {
    fn unit() -> Self {
        Distribution {
            offset: 0,
            weights: vec![BigUint::one()],
        }
    }

    fn of(table: &ComponentTable) -> Self {
        Distribution {
            offset: table.min_mines,
            weights: table.counts.clone(),
        }
    }

    fn convolve(&self, other: &Distribution) -> Distribution {
        let mut weights = vec![BigUint::zero(); self.weights.len() + other.weights.len() - 1];
        for (i, a) in self.weights.iter().enumerate() {
            if a.is_zero() {
                continue;
            }
            for (j, b) in other.weights.iter().enumerate() {
                weights[i + j] += a * b;
            }
        }
        Distribution {
            offset: self.offset + other.offset,
            weights,
        }
    }

    fn min(&self) -> usize {
        self.offset
    }

    fn max(&self) -> usize {
        self.offset + self.weights.len() - 1
    }

    fn iter(&self) -> impl Iterator<Item = (usize, &BigUint)> {
        self.weights
            .iter()
            .enumerate()
            .map(|(i, w)| (self.offset + i, w))
    }
}

/// `C(n, m)` for every `m` in a window, built incrementally.
struct BinomialRow {
    low: usize,
    values: Vec<BigUint>,
}

impl BinomialRow {
    fn new(n: usize, low: usize, high: usize) -> Self {
        let high = high.min(n);
        if low > high {
            return BinomialRow {
                low,
                values: Vec::new(),
            };
        }
        let mut current = binomial(n, low);
        let mut values = Vec::with_capacity(high - low + 1);
        for m in low..=high {
            values.push(current.clone());
            if m < high {
                current = current * BigUint::from(n - m) / BigUint::from(m + 1);
            }
        }
        BinomialRow { low, values }
    }

    fn get(&self, m: usize) -> Option<&BigUint> {
        self.values.get(m.checked_sub(self.low)?)
    }
}

fn binomial(n: usize, k: usize) -> BigUint {
    let k = k.min(n - k);
    let mut c = BigUint::one();
    for i in 0..k {
        c = c * BigUint::from(n - i) / BigUint::from(i + 1);
    }
    c
}

/// Bounds of the combined mine total of every component.
pub(crate) fn component_bounds(tables: &[ComponentTable]) -> (usize, usize) {
    tables.iter().fold((0, 0), |(low, high), table| {
        (low + table.min_mines, high + table.max_mines())
    })
}

/// Per-cell probabilities, aligned with the tables' `cells`, and the shared
/// probability of the floating cells.
#[derive(Debug, Clone)]
pub(crate) struct Marginals {
    pub components: Vec<Vec<f64>>,
    pub floating: Option<f64>,
}

/// Computes mine probabilities when exactly `remaining` mines are spread
/// over the components and `floating` unconstrained cells.
///
/// Every consistent assignment of the whole board is equally likely. An
/// assignment with `s` mines in the components leaves `C(floating, remaining - s)`
/// ways to place the rest, which is the weight of that component total.
pub(crate) fn marginals(
    tables: &[ComponentTable],
    floating: usize,
    remaining: usize,
) -> Result<Marginals> {
    let distributions: Vec<Distribution> = tables.iter().map(Distribution::of).collect();

    // prefix[i] covers components 0..i, suffix[i] covers i..n.
    let mut prefix = vec![Distribution::unit()];
    for distribution in &distributions {
        let next = prefix[prefix.len() - 1].convolve(distribution);
        prefix.push(next);
    }
    let mut suffix = vec![Distribution::unit(); distributions.len() + 1];
    for (i, distribution) in distributions.iter().enumerate().rev() {
        suffix[i] = distribution.convolve(&suffix[i + 1]);
    }

    let total = &prefix[distributions.len()];
    let row = BinomialRow::new(
        floating,
        remaining.saturating_sub(total.max()),
        remaining.saturating_sub(total.min()),
    );
    let leftover = |mines: usize| remaining.checked_sub(mines).and_then(|m| row.get(m));

    let total_weight: BigUint = total
        .iter()
        .filter_map(|(mines, weight)| Some(weight * leftover(mines)?))
        .sum();
    if total_weight.is_zero() {
        return Err(Error::InconsistentBoard);
    }

    let components = tables
        .iter()
        .enumerate()
        .map(|(i, table)| {
            let others = prefix[i].convolve(&suffix[i + 1]);
            // Weight of the rest of the board for each total of this component.
            let outside: Vec<BigUint> = (0..table.counts.len())
                .map(|bucket| {
                    let own = table.min_mines + bucket;
                    others
                        .iter()
                        .filter_map(|(mines, weight)| Some(weight * leftover(own + mines)?))
                        .sum()
                })
                .collect();

            (0..table.cells.len())
                .map(|cell| {
                    let numerator: BigUint = table
                        .cell_counts
                        .iter()
                        .zip(&outside)
                        .map(|(hits, weight)| &hits[cell] * weight)
                        .sum();
                    ratio(&numerator, &total_weight)
                })
                .collect()
        })
        .collect();

    let floating = (floating > 0).then(|| {
        let numerator: BigUint = total
            .iter()
            .filter_map(|(mines, weight)| {
                let left = remaining.checked_sub(mines)?;
                Some(weight * leftover(mines)? * BigUint::from(left))
            })
            .sum();
        ratio(&numerator, &(&total_weight * BigUint::from(floating)))
    });

    Ok(Marginals {
        components,
        floating,
    })
}

/// `numerator / denominator` as `f64`.
///
/// Both sides are shifted down together until the denominator fits in 1000
/// bits, so only ratios below 2^-1000 lose their last significant digits.
pub(crate) fn ratio(numerator: &BigUint, denominator: &BigUint) -> f64 {
    let shift = denominator.bits().saturating_sub(1000) as usize;
    let numerator = (numerator >> shift).to_f64().unwrap_or(f64::MAX);
    let denominator = (denominator >> shift).to_f64().unwrap_or(f64::MAX);
    numerator / denominator
}
