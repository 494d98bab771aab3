//! Convenience re-exports for common usage.
//!
//! # Usage
//!
//! ```
//! use aprender_basket::prelude::*;
//! ```

pub use crate::basket::{BasketId, Baskets, ItemId, Observation, YearMonth};
pub use crate::config::MiningConfig;
pub use crate::data::load_observations;
pub use crate::error::BasketError;
pub use crate::matrix::IncidenceMatrix;
pub use crate::mining::{generate_rules, mine, Apriori, AssociationRule, FrequentItemsets, Itemset, RuleMetric};
pub use crate::pipeline::BasketAnalysis;
pub use crate::recommend::{recommend, RuleRecommender};
