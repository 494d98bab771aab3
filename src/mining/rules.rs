//! Association rule generation from frequent itemsets.

use super::FrequentItemsets;
use crate::basket::ItemId;
use crate::error::{BasketError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// Association rule: antecedent => consequent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociationRule {
    /// Items in the antecedent (left side)
    pub antecedent: Vec<ItemId>,
    /// Items in the consequent (right side)
    pub consequent: Vec<ItemId>,
    /// P(antecedent)
    pub antecedent_support: f64,
    /// P(consequent)
    pub consequent_support: f64,
    /// Support: P(antecedent ∪ consequent)
    pub support: f64,
    /// Confidence: P(consequent | antecedent) = support / P(antecedent)
    pub confidence: f64,
    /// Lift: confidence / P(consequent)
    pub lift: f64,
}

impl AssociationRule {
    /// Value of the given metric for this rule.
    #[must_use]
    pub fn metric(&self, metric: RuleMetric) -> f64 {
        match metric {
            RuleMetric::Support => self.support,
            RuleMetric::Confidence => self.confidence,
            RuleMetric::Lift => self.lift,
        }
    }

    /// Whether `item` is one of the antecedent items.
    #[must_use]
    pub fn antecedent_contains(&self, item: &ItemId) -> bool {
        self.antecedent.contains(item)
    }
}

impl fmt::Display for AssociationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |items: &[ItemId]| {
            items
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };
        write!(
            f,
            "{{{}}} => {{{}}} (support={:.5}, confidence={:.5}, lift={:.5})",
            join(&self.antecedent),
            join(&self.consequent),
            self.support,
            self.confidence,
            self.lift
        )
    }
}

/// Metric used to filter generated rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleMetric {
    /// Support of the whole itemset
    Support,
    /// P(consequent | antecedent)
    Confidence,
    /// Confidence relative to the consequent's base rate
    #[default]
    Lift,
}

impl RuleMetric {
    /// Check a threshold against this metric's range.
    ///
    /// Support and confidence are fractions in `[0, 1]`; lift is any finite
    /// non-negative ratio.
    ///
    /// # Errors
    ///
    /// Returns [`BasketError::InvalidParameter`] when out of range.
    pub fn validate_threshold(self, min_threshold: f64) -> Result<()> {
        let ok = match self {
            Self::Support | Self::Confidence => (0.0..=1.0).contains(&min_threshold),
            Self::Lift => min_threshold.is_finite() && min_threshold >= 0.0,
        };
        if ok {
            Ok(())
        } else {
            let constraint = match self {
                Self::Support | Self::Confidence => "in [0, 1]",
                Self::Lift => "finite and >= 0",
            };
            Err(BasketError::invalid_parameter(
                &format!("min_threshold ({self})"),
                min_threshold,
                constraint,
            ))
        }
    }
}

impl fmt::Display for RuleMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Support => "support",
            Self::Confidence => "confidence",
            Self::Lift => "lift",
        };
        f.write_str(name)
    }
}

impl FromStr for RuleMetric {
    type Err = BasketError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "support" => Ok(Self::Support),
            "confidence" => Ok(Self::Confidence),
            "lift" => Ok(Self::Lift),
            other => Err(BasketError::invalid_parameter(
                "metric",
                other,
                "one of support, confidence, lift",
            )),
        }
    }
}

/// Build the rule `antecedent => consequent` from an itemset's support.
///
/// # Errors
///
/// Returns [`BasketError::DegenerateRule`] when the antecedent or consequent
/// support is unknown or zero.
fn build_rule(
    itemsets: &FrequentItemsets,
    antecedent: &[usize],
    consequent: &[usize],
    support: f64,
) -> Result<AssociationRule> {
    let degenerate = || BasketError::DegenerateRule {
        antecedent: itemsets.labels(antecedent).iter().map(ToString::to_string).collect(),
        consequent: itemsets.labels(consequent).iter().map(ToString::to_string).collect(),
    };

    let antecedent_support = itemsets
        .support_of_columns(antecedent)
        .filter(|s| *s > 0.0)
        .ok_or_else(degenerate)?;
    let consequent_support = itemsets
        .support_of_columns(consequent)
        .filter(|s| *s > 0.0)
        .ok_or_else(degenerate)?;

    let confidence = support / antecedent_support;
    let lift = confidence / consequent_support;

    Ok(AssociationRule {
        antecedent: itemsets.labels(antecedent),
        consequent: itemsets.labels(consequent),
        antecedent_support,
        consequent_support,
        support,
        confidence,
        lift,
    })
}

/// Generate association rules from frequent itemsets.
///
/// Every non-empty proper subset of each itemset of size >= 2 is tried as an
/// antecedent, so `A => B` and `B => A` are separate rules. A rule is kept
/// when its `metric` value is at least `min_threshold`. Rules whose lift
/// would divide by zero are dropped.
///
/// Rules come out in itemset discovery order, then antecedent subset order.
///
/// # Errors
///
/// Returns [`BasketError::InvalidParameter`] if `min_threshold` is out of
/// range for `metric`.
pub fn generate_rules(
    itemsets: &FrequentItemsets,
    metric: RuleMetric,
    min_threshold: f64,
) -> Result<Vec<AssociationRule>> {
    metric.validate_threshold(min_threshold)?;

    let mut rules = Vec::new();
    let mut degenerate = 0usize;

    for (itemset, support) in itemsets.entries() {
        let n = itemset.len();
        if n < 2 {
            continue;
        }
        if n >= u64::BITS as usize {
            warn!(len = n, "itemset too large to enumerate rules, skipping");
            continue;
        }

        // Masks 1..2^n - 1 cover every non-empty proper subset
        for mask in 1..(1u64 << n) - 1 {
            let mut antecedent = Vec::with_capacity(n);
            let mut consequent = Vec::with_capacity(n);
            for (i, &col) in itemset.iter().enumerate() {
                if mask & (1 << i) != 0 {
                    antecedent.push(col);
                } else {
                    consequent.push(col);
                }
            }

            match build_rule(itemsets, &antecedent, &consequent, *support) {
                Ok(rule) if rule.metric(metric) >= min_threshold => rules.push(rule),
                Ok(_) => {}
                Err(err @ BasketError::DegenerateRule { .. }) => {
                    debug!(%err, "dropping rule");
                    degenerate += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    debug!(rules = rules.len(), degenerate, %metric, min_threshold, "rules generated");
    Ok(rules)
}

/// Sort rules by lift descending; ties keep their relative order.
pub fn sort_rules_by_lift(rules: &mut [AssociationRule]) {
    rules.sort_by(|a, b| b.lift.total_cmp(&a.lift));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basket::{Baskets, Observation};
    use crate::matrix::IncidenceMatrix;
    use crate::mining::mine;

    fn itemsets_of(baskets: &[&[&str]], min_support: f64) -> FrequentItemsets {
        let observations: Vec<Observation> = baskets
            .iter()
            .enumerate()
            .flat_map(|(b, items)| {
                items
                    .iter()
                    .map(move |item| Observation::new(format!("c{b}"), *item, "0", "2017-08-01"))
            })
            .collect();
        let baskets = Baskets::from_observations(&observations).expect("valid");
        mine(&IncidenceMatrix::from_baskets(&baskets), min_support).expect("valid")
    }

    fn item(name: &str) -> ItemId {
        ItemId::new(name, "0")
    }

    fn find<'a>(rules: &'a [AssociationRule], ante: &str, cons: &str) -> &'a AssociationRule {
        rules
            .iter()
            .find(|r| r.antecedent == vec![item(ante)] && r.consequent == vec![item(cons)])
            .unwrap_or_else(|| panic!("missing rule {ante} => {cons}"))
    }

    #[test]
    fn test_scenario_two_items_confidence() {
        let itemsets = itemsets_of(&[&["X", "Y"], &["X", "Y"], &["X"]], 0.5);
        let rules = generate_rules(&itemsets, RuleMetric::Confidence, 0.0).expect("valid");
        assert_eq!(rules.len(), 2);

        let x_to_y = find(&rules, "X", "Y");
        assert!((x_to_y.confidence - 2.0 / 3.0).abs() < 1e-12);
        let y_to_x = find(&rules, "Y", "X");
        assert!((y_to_x.confidence - 1.0).abs() < 1e-12);
        assert!((y_to_x.lift - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_confidence_and_lift() {
        let itemsets = itemsets_of(&[&["1", "2", "3"], &["1", "2"], &["1", "3"], &["2", "3"]], 0.5);
        let rules = generate_rules(&itemsets, RuleMetric::Confidence, 0.0).expect("valid");

        // Confidence({1} => {2}) = 0.5 / 0.75
        let rule = find(&rules, "1", "2");
        assert!((rule.confidence - 0.6666666).abs() < 1e-5);
        // Lift({1} => {2}) = 0.667 / 0.75
        assert!((rule.lift - 0.8888888).abs() < 1e-5);
        assert!((rule.antecedent_support - 0.75).abs() < 1e-12);
        assert!((rule.consequent_support - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_three_item_itemset_yields_six_rules() {
        let itemsets = itemsets_of(&[&["a", "b", "c"], &["a", "b", "c"], &["a"]], 0.5);
        let rules = generate_rules(&itemsets, RuleMetric::Support, 0.6).expect("valid");

        // Three pairs give 2 rules each, the triple gives 6
        assert_eq!(rules.len(), 12);
        for rule in &rules {
            assert!(!rule.antecedent.is_empty() && !rule.consequent.is_empty());
            assert!(rule.antecedent.iter().all(|i| !rule.consequent.contains(i)));
        }
    }

    #[test]
    fn test_metric_threshold_filter() {
        let itemsets = itemsets_of(&[&["1", "2", "3"], &["1", "2"], &["1", "3"], &["1"]], 0.25);
        let rules = generate_rules(&itemsets, RuleMetric::Confidence, 0.8).expect("valid");
        assert!(!rules.is_empty());
        for rule in &rules {
            assert!(rule.confidence >= 0.8, "{rule}");
        }

        let rules = generate_rules(&itemsets, RuleMetric::Lift, 1.0).expect("valid");
        assert!(rules.iter().all(|r| r.lift >= 1.0));
    }

    #[test]
    fn test_threshold_validation() {
        let itemsets = itemsets_of(&[&["1", "2"]], 0.5);
        assert!(generate_rules(&itemsets, RuleMetric::Confidence, 1.5).is_err());
        assert!(generate_rules(&itemsets, RuleMetric::Support, -0.1).is_err());
        assert!(generate_rules(&itemsets, RuleMetric::Lift, f64::INFINITY).is_err());
        assert!(generate_rules(&itemsets, RuleMetric::Lift, 3.0).is_ok());
    }

    #[test]
    fn test_zero_consequent_support_is_dropped() {
        let itemsets = FrequentItemsets::from_supports(vec![
            (vec![item("a")], 0.5),
            (vec![item("b")], 0.0),
            (vec![item("a"), item("b")], 0.25),
        ])
        .expect("valid");

        let rules = generate_rules(&itemsets, RuleMetric::Lift, 0.0).expect("valid");
        // a => b divides by P(b) = 0; b => a has a zero antecedent
        assert!(rules.is_empty());
    }

    #[test]
    fn test_missing_subset_support_is_dropped() {
        let itemsets = FrequentItemsets::from_supports(vec![
            (vec![item("a")], 0.5),
            (vec![item("a"), item("b")], 0.25),
        ])
        .expect("valid");

        let rules = generate_rules(&itemsets, RuleMetric::Lift, 0.0).expect("valid");
        assert!(rules.is_empty());
    }

    #[test]
    fn test_sort_rules_by_lift_is_stable() {
        let rule = |name: &str, lift: f64| AssociationRule {
            antecedent: vec![item("q")],
            consequent: vec![item(name)],
            antecedent_support: 0.5,
            consequent_support: 0.5,
            support: 0.25,
            confidence: 0.5,
            lift,
        };
        let mut rules = vec![rule("a", 1.0), rule("b", 2.0), rule("c", 1.0), rule("d", 3.0)];
        sort_rules_by_lift(&mut rules);

        let order: Vec<String> = rules.iter().map(|r| r.consequent[0].to_string()).collect();
        assert_eq!(order, vec!["d_0", "b_0", "a_0", "c_0"]);
    }

    #[test]
    fn test_metric_from_str() {
        assert_eq!("lift".parse::<RuleMetric>().expect("valid"), RuleMetric::Lift);
        assert_eq!(" Confidence ".parse::<RuleMetric>().expect("valid"), RuleMetric::Confidence);
        assert_eq!("support".parse::<RuleMetric>().expect("valid"), RuleMetric::Support);
        assert!("leverage".parse::<RuleMetric>().is_err());
        assert_eq!(RuleMetric::default(), RuleMetric::Lift);
    }

    #[test]
    fn test_rule_display() {
        let itemsets = itemsets_of(&[&["X", "Y"], &["X", "Y"]], 0.5);
        let rules = generate_rules(&itemsets, RuleMetric::Lift, 0.0).expect("valid");
        let text = rules[0].to_string();
        assert!(text.starts_with("{X_0} => {Y_0}"), "{text}");
        assert!(text.contains("lift=1.00000"));
    }
}
