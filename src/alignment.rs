//! Cluster-to-label alignment.
//!
//! K-means numbers its clusters arbitrarily, so cluster `0` need not correspond to
//! label `0`. [`align`] picks the one-to-one mapping from cluster ids to label values
//! that agrees with the ground truth on the largest number of samples.
//!
//! Label values need not be contiguous: the distinct values are ranked first, so a
//! labelling such as `{3, 70_000}` costs the same as `{0, 1}`. Both sides are then
//! padded to a square `m x m` contingency table with `m = max(k, num_classes)`.
//! Up to [`EXHAUSTIVE_LIMIT`] every permutation is tried; above it the Hungarian
//! algorithm solves the same maximum-weight matching in O(m³).

use serde::{Deserialize, Serialize};

use crate::cluster::KmeansFit;
use crate::error::{Error, Result};

/// Largest table size solved by enumerating permutations.
pub const EXHAUSTIVE_LIMIT: usize = 8;

/// Best mapping of cluster ids onto ground-truth labels.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alignment {
    /// `mapping[cluster] = Some(label)`, or `None` when the cluster matched no
    /// existing label (only possible when `k > num_classes`).
    pub mapping: Vec<Option<usize>>,
    /// Samples whose mapped cluster equals their label.
    pub matches: usize,
    /// Number of samples aligned.
    pub total: usize,
    /// Distinct ground-truth label values, ascending.
    pub classes: Vec<usize>,
    /// `confusion[actual][predicted]` counts over the padded `m x m` table. Index
    /// `i < num_classes` stands for `classes[i]`; higher indices are padding slots
    /// taken by unmatched clusters.
    pub confusion: Vec<Vec<usize>>,
}

impl Alignment {
    /// Number of distinct ground-truth labels.
    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }

    /// Fraction of samples matched.
    pub fn accuracy(&self) -> f64 {
        self.matches as f64 / self.total as f64
    }

    /// Translate cluster ids into label values.
    pub fn relabel(&self, assignments: &[usize]) -> Vec<Option<usize>> {
        assignments.iter().map(|&c| self.mapping[c]).collect()
    }
}

/// Align the clusters of `fit` with `labels` (one label per training sample).
pub fn align(fit: &KmeansFit, labels: &[usize]) -> Result<Alignment> {
    align_assignments(fit.assignments(), fit.k(), labels)
}

/// Align raw cluster `assignments` in `0..k` with `labels`.
pub fn align_assignments(assignments: &[usize], k: usize, labels: &[usize]) -> Result<Alignment> {
    if assignments.is_empty() {
        return Err(Error::EmptyInput);
    }
    if labels.len() != assignments.len() {
        return Err(Error::DimensionMismatch {
            expected: assignments.len(),
            found: labels.len(),
        });
    }
    if k == 0 {
        return Err(Error::InvalidClusterCount {
            requested: k,
            n_items: assignments.len(),
        });
    }
    if assignments.iter().any(|&c| c >= k) {
        return Err(Error::InvalidParameter {
            name: "assignments",
            message: "cluster id out of range 0..k",
        });
    }

    let mut classes = labels.to_vec();
    classes.sort_unstable();
    classes.dedup();
    let num_classes = classes.len();
    let m = k.max(num_classes);

    // Rank of each label among the distinct values.
    let ranks: Vec<usize> = labels
        .iter()
        .map(|l| classes.partition_point(|c| c < l))
        .collect();

    let mut contingency = vec![vec![0usize; m]; m];
    for (&c, &r) in assignments.iter().zip(&ranks) {
        contingency[c][r] += 1;
    }

    let full = if m <= EXHAUSTIVE_LIMIT {
        best_permutation(&contingency)
    } else {
        hungarian(&contingency)
    };
    let slots = &full[..k];
    let matches: usize = (0..k).map(|c| contingency[c][slots[c]]).sum();

    let mut confusion = vec![vec![0usize; m]; m];
    for (&c, &r) in assignments.iter().zip(&ranks) {
        confusion[r][slots[c]] += 1;
    }

    let mapping = slots.iter().map(|&slot| classes.get(slot).copied()).collect();

    Ok(Alignment {
        mapping,
        matches,
        total: assignments.len(),
        classes,
        confusion,
    })
}

fn permutation_weight(weights: &[Vec<usize>], perm: &[usize]) -> usize {
    perm.iter().enumerate().map(|(row, &col)| weights[row][col]).sum()
}

/// Exhaustive search in lexicographic order; the first maximum wins.
fn best_permutation(weights: &[Vec<usize>]) -> Vec<usize> {
    let mut perm: Vec<usize> = (0..weights.len()).collect();
    let mut best = perm.clone();
    let mut best_weight = permutation_weight(weights, &perm);
    while next_permutation(&mut perm) {
        let w = permutation_weight(weights, &perm);
        if w > best_weight {
            best_weight = w;
            best.copy_from_slice(&perm);
        }
    }
    best
}

/// Advance `perm` to the next lexicographic permutation. `false` once exhausted.
fn next_permutation(perm: &mut [usize]) -> bool {
    let Some(i) = perm.windows(2).rposition(|w| w[0] < w[1]) else {
        return false;
    };
    let j = perm
        .iter()
        .rposition(|&x| x > perm[i])
        .unwrap_or(i + 1);
    perm.swap(i, j);
    perm[i + 1..].reverse();
    true
}

/// Maximum-weight perfect matching on a square table (Hungarian algorithm with
/// potentials). Returns `row -> column`.
fn hungarian(weights: &[Vec<usize>]) -> Vec<usize> {
    let m = weights.len();
    let cost = |i: usize, j: usize| -(weights[i - 1][j - 1] as i64);

    // 1-based; column 0 and row 0 are sentinels.
    let mut u = vec![0i64; m + 1];
    let mut v = vec![0i64; m + 1];
    let mut owner = vec![0usize; m + 1];
    let mut way = vec![0usize; m + 1];

    for i in 1..=m {
        owner[0] = i;
        let mut j0 = 0;
        let mut minv = vec![i64::MAX; m + 1];
        let mut used = vec![false; m + 1];
        loop {
            used[j0] = true;
            let i0 = owner[j0];
            let mut delta = i64::MAX;
            let mut j1 = 0;
            for j in 1..=m {
                if used[j] {
                    continue;
                }
                let cur = cost(i0, j) - u[i0] - v[j];
                if cur < minv[j] {
                    minv[j] = cur;
                    way[j] = j0;
                }
                if minv[j] < delta {
                    delta = minv[j];
                    j1 = j;
                }
            }
            for j in 0..=m {
                if used[j] {
                    u[owner[j]] += delta;
                    v[j] -= delta;
                } else {
                    minv[j] -= delta;
                }
            }
            j0 = j1;
            if owner[j0] == 0 {
                break;
            }
        }
        loop {
            let j1 = way[j0];
            owner[j0] = owner[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    let mut assignment = vec![0usize; m];
    for j in 1..=m {
        if owner[j] != 0 {
            assignment[owner[j] - 1] = j - 1;
        }
    }
    assignment
}
