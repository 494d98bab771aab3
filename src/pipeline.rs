//! End-to-end basket analysis: observations to recommendations.
//!
//! Runs the stages in order (baskets, incidence matrix, frequent itemsets,
//! rules) and keeps every intermediate result read-only for inspection.
//!
//! # Example
//!
//! ```
//! use aprender_basket::basket::Observation;
//! use aprender_basket::config::MiningConfig;
//! use aprender_basket::pipeline::BasketAnalysis;
//!
//! let observations = vec![
//!     Observation::new("1", "2", "0", "2017-08-01 10:00:00"),
//!     Observation::new("1", "9", "4", "2017-08-03 10:00:00"),
//!     Observation::new("2", "2", "0", "2017-09-01 10:00:00"),
//!     Observation::new("2", "9", "4", "2017-09-09 10:00:00"),
//!     Observation::new("3", "38", "4", "2017-09-09 10:00:00"),
//! ];
//!
//! let config = MiningConfig::default().with_min_support(0.5);
//! let analysis = BasketAnalysis::run(&observations, &config).expect("valid input");
//!
//! let recs = analysis.recommend(&"2_0".parse().unwrap()).expect("valid");
//! assert_eq!(recs[0].to_string(), "9_4");
//! ```

use crate::basket::{Baskets, ItemId, Observation};
use crate::config::MiningConfig;
use crate::error::Result;
use crate::matrix::IncidenceMatrix;
use crate::mining::{generate_rules, AssociationRule, FrequentItemsets};
use crate::recommend::RuleRecommender;
use tracing::{info, info_span, warn};

/// Results of one mining run.
#[derive(Debug, Clone)]
pub struct BasketAnalysis {
    config: MiningConfig,
    baskets: Baskets,
    matrix: IncidenceMatrix,
    itemsets: FrequentItemsets,
    recommender: RuleRecommender,
}

impl BasketAnalysis {
    /// Run the full pipeline.
    ///
    /// The configuration is validated before any observation is read.
    ///
    /// # Errors
    ///
    /// Returns [`crate::BasketError::InvalidParameter`] for a bad configuration
    /// and [`crate::BasketError::MalformedObservation`] for bad input.
    pub fn run<'a, I>(observations: I, config: &MiningConfig) -> Result<Self>
    where
        I: IntoIterator<Item = &'a Observation>,
    {
        config.validate()?;

        let baskets = {
            let _span = info_span!("baskets").entered();
            let baskets = Baskets::from_observations(observations)?;
            info!(
                observations = baskets.n_observations(),
                baskets = baskets.len(),
                "baskets built"
            );
            baskets
        };
        if baskets.is_empty() {
            warn!("no observations, nothing to mine");
        }

        let matrix = {
            let _span = info_span!("matrix").entered();
            let matrix = IncidenceMatrix::from_baskets(&baskets);
            let (rows, cols) = matrix.shape();
            info!(rows, cols, density = matrix.density(), "incidence matrix built");
            matrix
        };

        let itemsets = {
            let _span = info_span!("apriori", min_support = config.min_support).entered();
            let itemsets = config.apriori().mine(&matrix)?;
            info!(
                itemsets = itemsets.len(),
                max_len = itemsets.max_len(),
                "frequent itemsets mined"
            );
            itemsets
        };

        let rules = {
            let _span = info_span!("rules", metric = %config.metric).entered();
            let rules = generate_rules(&itemsets, config.metric, config.min_threshold)?;
            info!(rules = rules.len(), min_threshold = config.min_threshold, "rules generated");
            rules
        };

        Ok(Self {
            config: *config,
            baskets,
            matrix,
            itemsets,
            recommender: RuleRecommender::new(rules),
        })
    }

    /// Configuration the run used.
    #[must_use]
    pub fn config(&self) -> &MiningConfig {
        &self.config
    }

    /// Grouped baskets.
    #[must_use]
    pub fn baskets(&self) -> &Baskets {
        &self.baskets
    }

    /// Basket × item incidence matrix.
    #[must_use]
    pub fn matrix(&self) -> &IncidenceMatrix {
        &self.matrix
    }

    /// Frequent itemsets.
    #[must_use]
    pub fn itemsets(&self) -> &FrequentItemsets {
        &self.itemsets
    }

    /// Rules sorted by lift descending.
    #[must_use]
    pub fn rules(&self) -> &[AssociationRule] {
        self.recommender.rules()
    }

    /// Recommend `config.top_n` items for `query_item`.
    ///
    /// # Errors
    ///
    /// Never fails for a validated configuration; see [`RuleRecommender::recommend`].
    pub fn recommend(&self, query_item: &ItemId) -> Result<Vec<ItemId>> {
        self.recommender.recommend(query_item, self.config.top_n)
    }

    /// Recommend up to `top_n` items for `query_item`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::BasketError::InvalidParameter`] if `top_n` is zero.
    pub fn recommend_n(&self, query_item: &ItemId, top_n: usize) -> Result<Vec<ItemId>> {
        self.recommender.recommend(query_item, top_n)
    }
}
