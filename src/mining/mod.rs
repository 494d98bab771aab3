//! Pattern mining algorithms for association rule discovery.
//!
//! This module discovers frequent itemsets in an [`IncidenceMatrix`] and
//! derives association rules from them, as used in market basket analysis.
//!
//! # Algorithms
//!
//! - [`Apriori`]: level-wise frequent itemset mining with anti-monotone pruning
//! - [`rules::generate_rules`]: association rules filtered by support, confidence or lift
//!
//! # Example
//!
//! ```
//! use aprender_basket::basket::{Baskets, Observation};
//! use aprender_basket::matrix::IncidenceMatrix;
//! use aprender_basket::mining::{rules::generate_rules, Apriori, RuleMetric};
//!
//! // b1: {X, Y}, b2: {X, Y}, b3: {X}
//! let observations = vec![
//!     Observation::new("b1", "X", "0", "2017-08-01"),
//!     Observation::new("b1", "Y", "0", "2017-08-01"),
//!     Observation::new("b2", "X", "0", "2017-08-01"),
//!     Observation::new("b2", "Y", "0", "2017-08-01"),
//!     Observation::new("b3", "X", "0", "2017-08-01"),
//! ];
//! let baskets = Baskets::from_observations(&observations).expect("valid");
//! let matrix = IncidenceMatrix::from_baskets(&baskets);
//!
//! let itemsets = Apriori::new().with_min_support(0.5).mine(&matrix).expect("valid support");
//! assert_eq!(itemsets.len(), 3);
//!
//! let rules = generate_rules(&itemsets, RuleMetric::Confidence, 0.0).expect("valid threshold");
//! for rule in &rules {
//!     println!("{:?} => {:?} (conf={:.2}, lift={:.2})",
//!         rule.antecedent, rule.consequent, rule.confidence, rule.lift);
//! }
//! ```

pub mod rules;

pub use rules::{generate_rules, sort_rules_by_lift, AssociationRule, RuleMetric};

use crate::basket::ItemId;
use crate::error::{BasketError, Result};
use crate::matrix::IncidenceMatrix;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

/// A frequent itemset with its support.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Itemset {
    /// Items, sorted by identifier
    pub items: Vec<ItemId>,
    /// Fraction of baskets containing every item
    pub support: f64,
}

/// All frequent itemsets of one mining run.
///
/// Itemsets are stored as sorted column indices into `items` and kept in
/// discovery order: level by level, lexicographic within a level.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrequentItemsets {
    items: Vec<ItemId>,
    entries: Vec<(Vec<usize>, f64)>,
    lookup: HashMap<Vec<usize>, f64>,
}

impl FrequentItemsets {
    fn new(items: Vec<ItemId>, entries: Vec<(Vec<usize>, f64)>) -> Self {
        let lookup = entries.iter().cloned().collect();
        Self {
            items,
            entries,
            lookup,
        }
    }

    /// Build from externally computed (itemset, support) pairs.
    ///
    /// # Errors
    ///
    /// Returns [`BasketError::InvalidParameter`] for an empty itemset, a
    /// duplicated itemset, or a support outside `[0, 1]`.
    pub fn from_supports<I>(itemsets: I) -> Result<Self>
    where
        I: IntoIterator<Item = (Vec<ItemId>, f64)>,
    {
        let itemsets: Vec<(Vec<ItemId>, f64)> = itemsets.into_iter().collect();
        let items: Vec<ItemId> = itemsets
            .iter()
            .flat_map(|(set, _)| set.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let index: HashMap<&ItemId, usize> =
            items.iter().enumerate().map(|(i, item)| (item, i)).collect();

        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(itemsets.len());
        for (set, support) in &itemsets {
            if set.is_empty() {
                return Err(BasketError::invalid_parameter("itemset", "{}", "non-empty"));
            }
            if !(0.0..=1.0).contains(support) {
                return Err(BasketError::invalid_parameter("support", support, "in [0, 1]"));
            }
            let mut cols: Vec<usize> = set.iter().map(|item| index[item]).collect();
            cols.sort_unstable();
            cols.dedup();
            if !seen.insert(cols.clone()) {
                return Err(BasketError::invalid_parameter(
                    "itemset",
                    format!("{set:?}"),
                    "unique",
                ));
            }
            entries.push((cols, *support));
        }

        Ok(Self::new(items, entries))
    }

    /// Number of frequent itemsets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing met the support threshold.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate itemsets in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = Itemset> + '_ {
        self.entries.iter().map(|(cols, support)| Itemset {
            items: self.labels(cols),
            support: *support,
        })
    }

    /// Itemsets sorted by support descending; ties keep discovery order.
    #[must_use]
    pub fn sorted_by_support(&self) -> Vec<Itemset> {
        let mut sorted: Vec<Itemset> = self.iter().collect();
        sorted.sort_by(|a, b| b.support.total_cmp(&a.support));
        sorted
    }

    /// Support of an itemset, if it is frequent.
    #[must_use]
    pub fn support_of(&self, itemset: &[ItemId]) -> Option<f64> {
        let mut cols = Vec::with_capacity(itemset.len());
        for item in itemset {
            cols.push(self.items.iter().position(|i| i == item)?);
        }
        cols.sort_unstable();
        cols.dedup();
        self.lookup.get(&cols).copied()
    }

    /// Size of the largest frequent itemset.
    #[must_use]
    pub fn max_len(&self) -> usize {
        self.entries.iter().map(|(cols, _)| cols.len()).max().unwrap_or(0)
    }

    /// Number of frequent itemsets per size, indexed by size - 1.
    #[must_use]
    pub fn count_by_len(&self) -> Vec<usize> {
        let mut counts = vec![0; self.max_len()];
        for (cols, _) in &self.entries {
            counts[cols.len() - 1] += 1;
        }
        counts
    }

    pub(crate) fn entries(&self) -> &[(Vec<usize>, f64)] {
        &self.entries
    }

    pub(crate) fn support_of_columns(&self, cols: &[usize]) -> Option<f64> {
        self.lookup.get(cols).copied()
    }

    pub(crate) fn labels(&self, cols: &[usize]) -> Vec<ItemId> {
        cols.iter().map(|&c| self.items[c].clone()).collect()
    }
}

/// Apriori algorithm for frequent itemset mining.
///
/// # Algorithm
///
/// 1. Find frequent 1-itemsets from column sums
/// 2. Extend each frequent (k-1)-itemset by one larger item to form k-candidates
/// 3. Drop candidates with any infrequent (k-1)-subset
/// 4. Count support of the survivors by intersecting basket lists
/// 5. Repeat until a level produces nothing
///
/// # Parameters
///
/// - `min_support`: Minimum support threshold, in (0, 1]
/// - `max_len`: Optional cap on itemset size
///
/// # Example
///
/// ```
/// use aprender_basket::basket::{Baskets, Observation};
/// use aprender_basket::matrix::IncidenceMatrix;
/// use aprender_basket::mining::Apriori;
///
/// let observations = vec![
///     Observation::new("1", "9", "4", "2017-08-06"),
///     Observation::new("1", "46", "4", "2017-08-21"),
///     Observation::new("2", "9", "4", "2017-08-02"),
/// ];
/// let baskets = Baskets::from_observations(&observations).expect("valid");
/// let matrix = IncidenceMatrix::from_baskets(&baskets);
///
/// let itemsets = Apriori::new().with_min_support(0.5).mine(&matrix).expect("valid");
/// assert_eq!(itemsets.support_of(&["9_4".parse().unwrap()]), Some(1.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Apriori {
    min_support: f64,
    max_len: Option<usize>,
}

impl Apriori {
    /// Create a new Apriori instance.
    ///
    /// # Default Parameters
    ///
    /// - `min_support`: 0.01 (1%)
    /// - `max_len`: unbounded
    #[must_use]
    pub fn new() -> Self {
        Self {
            min_support: 0.01,
            max_len: None,
        }
    }

    /// Set the minimum support threshold.
    #[must_use]
    pub fn with_min_support(mut self, min_support: f64) -> Self {
        self.min_support = min_support;
        self
    }

    /// Cap the size of mined itemsets.
    #[must_use]
    pub fn with_max_len(mut self, max_len: Option<usize>) -> Self {
        self.max_len = max_len;
        self
    }

    /// Configured minimum support.
    #[must_use]
    pub fn min_support(&self) -> f64 {
        self.min_support
    }

    /// Reject out-of-range parameters.
    ///
    /// # Errors
    ///
    /// Returns [`BasketError::InvalidParameter`] if `min_support` is not in
    /// (0, 1] or `max_len` is zero.
    pub fn validate(&self) -> Result<()> {
        if !(self.min_support > 0.0 && self.min_support <= 1.0) {
            return Err(BasketError::invalid_parameter(
                "min_support",
                self.min_support,
                "in (0, 1]",
            ));
        }
        if self.max_len == Some(0) {
            return Err(BasketError::invalid_parameter("max_len", 0, ">= 1"));
        }
        Ok(())
    }

    /// Mine all itemsets with support >= `min_support`.
    ///
    /// # Errors
    ///
    /// Returns [`BasketError::InvalidParameter`] before touching the matrix if
    /// the parameters are out of range.
    pub fn mine(&self, matrix: &IncidenceMatrix) -> Result<FrequentItemsets> {
        self.validate()?;

        let n_baskets = matrix.n_rows();
        if n_baskets == 0 {
            return Ok(FrequentItemsets::new(matrix.items().to_vec(), Vec::new()));
        }
        let n = n_baskets as f64;

        let mut current: Vec<(Vec<usize>, f64)> = (0..matrix.n_cols())
            .map(|col| (vec![col], matrix.column_sum(col) as f64 / n))
            .filter(|(_, support)| *support >= self.min_support)
            .collect();
        debug!(level = 1, candidates = matrix.n_cols(), frequent = current.len(), "apriori level");

        let mut frequent = Vec::new();
        let mut level = 1;
        while !current.is_empty() {
            frequent.extend(current.iter().cloned());
            if self.max_len.is_some_and(|max| level >= max) {
                break;
            }
            level += 1;

            let candidates = generate_candidates(&current);
            let n_candidates = candidates.len();
            current = count_supports(matrix, candidates)
                .into_iter()
                .map(|(cols, count)| (cols, count as f64 / n))
                .filter(|(_, support)| *support >= self.min_support)
                .collect();
            debug!(level, candidates = n_candidates, frequent = current.len(), "apriori level");
        }

        Ok(FrequentItemsets::new(matrix.items().to_vec(), frequent))
    }
}

impl Default for Apriori {
    fn default() -> Self {
        Self::new()
    }
}

/// Mine frequent itemsets with the default Apriori settings and `min_support`.
///
/// # Errors
///
/// Returns [`BasketError::InvalidParameter`] if `min_support` is not in (0, 1].
pub fn mine(matrix: &IncidenceMatrix, min_support: f64) -> Result<FrequentItemsets> {
    Apriori::new().with_min_support(min_support).mine(matrix)
}

/// Generate candidate k-itemsets from frequent (k-1)-itemsets.
///
/// Each sorted (k-1)-itemset is extended only by frequent items larger than
/// its last item, so every candidate is produced once and in lexicographic
/// order. Candidates with an infrequent (k-1)-subset are dropped.
fn generate_candidates(prev: &[(Vec<usize>, f64)]) -> Vec<Vec<usize>> {
    let prev_sets: HashSet<&[usize]> = prev.iter().map(|(cols, _)| cols.as_slice()).collect();
    let extensions: BTreeSet<usize> = prev.iter().flat_map(|(cols, _)| cols.iter().copied()).collect();

    let mut candidates = Vec::new();
    for (cols, _) in prev {
        let last = *cols.last().unwrap_or(&0);
        for &ext in extensions.range(last + 1..) {
            let mut candidate = cols.clone();
            candidate.push(ext);
            if !has_infrequent_subset(&candidate, &prev_sets) {
                candidates.push(candidate);
            }
        }
    }
    candidates
}

/// Check if an itemset has any infrequent (k-1)-subset.
fn has_infrequent_subset(candidate: &[usize], prev_sets: &HashSet<&[usize]>) -> bool {
    let mut subset = Vec::with_capacity(candidate.len() - 1);
    (0..candidate.len()).any(|skip| {
        subset.clear();
        subset.extend(
            candidate
                .iter()
                .enumerate()
                .filter(|&(i, _)| i != skip)
                .map(|(_, &c)| c),
        );
        !prev_sets.contains(subset.as_slice())
    })
}

/// Candidate count below which a level is counted on the calling thread.
#[cfg(feature = "parallel")]
const PARALLEL_MIN_CANDIDATES: usize = 256;

/// Count baskets containing each candidate, preserving candidate order.
#[cfg(feature = "parallel")]
fn count_supports(matrix: &IncidenceMatrix, candidates: Vec<Vec<usize>>) -> Vec<(Vec<usize>, usize)> {
    if candidates.len() < PARALLEL_MIN_CANDIDATES {
        return count_supports_sequential(matrix, candidates);
    }
    candidates
        .into_par_iter()
        .map(|cols| {
            let count = matrix.support_count(&cols);
            (cols, count)
        })
        .collect()
}

/// Count baskets containing each candidate, preserving candidate order.
#[cfg(not(feature = "parallel"))]
fn count_supports(matrix: &IncidenceMatrix, candidates: Vec<Vec<usize>>) -> Vec<(Vec<usize>, usize)> {
    count_supports_sequential(matrix, candidates)
}

fn count_supports_sequential(
    matrix: &IncidenceMatrix,
    candidates: Vec<Vec<usize>>,
) -> Vec<(Vec<usize>, usize)> {
    candidates
        .into_iter()
        .map(|cols| {
            let count = matrix.support_count(&cols);
            (cols, count)
        })
        .collect()
}
