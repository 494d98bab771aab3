//! Recommendation from association rules.
//!
//! Given a purchased item, rules whose antecedent contains that item are
//! ranked by lift and their consequents become the recommendations.
//!
//! # Quick Start
//!
//! ```
//! use aprender_basket::basket::ItemId;
//! use aprender_basket::mining::AssociationRule;
//! use aprender_basket::recommend::recommend;
//!
//! let item = |s: &str| s.parse::<ItemId>().expect("valid item");
//! let rule = |cons: &str, lift: f64| AssociationRule {
//!     antecedent: vec![item("2_0")],
//!     consequent: vec![item(cons)],
//!     antecedent_support: 0.1,
//!     consequent_support: 0.1,
//!     support: 0.05,
//!     confidence: 0.5,
//!     lift,
//! };
//! let rules = vec![rule("9_4", 2.0), rule("38_4", 3.0)];
//!
//! let recs = recommend(&rules, &item("2_0"), 2).expect("top_n >= 1");
//! assert_eq!(recs, vec![item("38_4"), item("9_4")]);
//! ```

use crate::basket::ItemId;
use crate::error::{BasketError, Result};
use crate::mining::{sort_rules_by_lift, AssociationRule};
use std::collections::HashSet;

/// Recommend up to `top_n` distinct items for `query_item`.
///
/// Rules whose antecedent contains `query_item` are sorted by lift
/// descending (ties keep input order), their consequents are flattened in
/// that order, and the first occurrence of each item is kept. An item no rule
/// mentions yields an empty list.
///
/// # Errors
///
/// Returns [`BasketError::InvalidParameter`] if `top_n` is zero.
pub fn recommend(
    rules: &[AssociationRule],
    query_item: &ItemId,
    top_n: usize,
) -> Result<Vec<ItemId>> {
    validate_top_n(top_n)?;

    let mut matching: Vec<AssociationRule> = rules
        .iter()
        .filter(|rule| rule.antecedent_contains(query_item))
        .cloned()
        .collect();
    sort_rules_by_lift(&mut matching);

    Ok(collect_consequents(matching.iter(), top_n))
}

fn validate_top_n(top_n: usize) -> Result<()> {
    if top_n == 0 {
        return Err(BasketError::invalid_parameter("top_n", top_n, ">= 1"));
    }
    Ok(())
}

fn collect_consequents<'a>(
    rules: impl Iterator<Item = &'a AssociationRule>,
    top_n: usize,
) -> Vec<ItemId> {
    let mut seen = HashSet::new();
    rules
        .flat_map(|rule| rule.consequent.iter())
        .filter(|item| seen.insert(*item))
        .take(top_n)
        .cloned()
        .collect()
}

/// Rule-based recommender over a fixed rule set.
///
/// Rules are sorted by lift once at construction; queries only filter, so
/// they are cheap and can run concurrently from shared references.
///
/// # Examples
///
/// ```
/// use aprender_basket::recommend::RuleRecommender;
///
/// let recommender = RuleRecommender::new(Vec::new());
/// let unknown = "99_99".parse().expect("valid item");
/// assert!(recommender.recommend(&unknown, 3).expect("valid").is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct RuleRecommender {
    rules: Vec<AssociationRule>,
}

impl RuleRecommender {
    /// Create a recommender from generated rules.
    #[must_use]
    pub fn new(mut rules: Vec<AssociationRule>) -> Self {
        sort_rules_by_lift(&mut rules);
        Self { rules }
    }

    /// Rules in lift order.
    #[must_use]
    pub fn rules(&self) -> &[AssociationRule] {
        &self.rules
    }

    /// Number of rules held.
    #[must_use]
    pub fn n_rules(&self) -> usize {
        self.rules.len()
    }

    /// Recommend up to `top_n` distinct items for `query_item`.
    ///
    /// Same result as [`recommend`] on the rules this recommender was built from.
    ///
    /// # Errors
    ///
    /// Returns [`BasketError::InvalidParameter`] if `top_n` is zero.
    pub fn recommend(&self, query_item: &ItemId, top_n: usize) -> Result<Vec<ItemId>> {
        validate_top_n(top_n)?;
        let matching = self
            .rules
            .iter()
            .filter(|rule| rule.antecedent_contains(query_item));
        Ok(collect_consequents(matching, top_n))
    }

    /// Rules whose antecedent contains `query_item`, in lift order.
    pub fn matching_rules<'a>(
        &'a self,
        query_item: &'a ItemId,
    ) -> impl Iterator<Item = &'a AssociationRule> + 'a {
        self.rules
            .iter()
            .filter(move |rule| rule.antecedent_contains(query_item))
    }
}
