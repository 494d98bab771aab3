//! Aprender Basket: market basket analysis and association rule
//! recommendations in pure Rust.
//!
//! Turns a purchase log into monthly per-customer baskets, mines frequent
//! itemsets with Apriori, derives association rules scored by support,
//! confidence and lift, and recommends items from those rules.
//!
//! # Quick Start
//!
//! ```
//! use aprender_basket::prelude::*;
//!
//! let observations = vec![
//!     Observation::new("7256", "9", "4", "2017-08-06 16:11:00"),
//!     Observation::new("7256", "46", "4", "2017-08-21 10:00:00"),
//!     Observation::new("10", "9", "4", "2017-08-01 09:00:00"),
//!     Observation::new("10", "46", "4", "2017-08-02 09:00:00"),
//!     Observation::new("11", "38", "4", "2017-10-02 09:00:00"),
//! ];
//!
//! let config = MiningConfig::default().with_min_support(0.3).with_top_n(2);
//! let analysis = BasketAnalysis::run(&observations, &config).unwrap();
//!
//! let recs = analysis.recommend(&"9_4".parse().unwrap()).unwrap();
//! assert_eq!(recs, vec!["46_4".parse::<ItemId>().unwrap()]);
//! ```
//!
//! # Modules
//!
//! - [`basket`]: Observations, item and basket identities, basket grouping
//! - [`matrix`]: Binary basket × item incidence matrix
//! - [`mining`]: Apriori frequent itemsets and association rules
//! - [`recommend`]: Lift-ranked recommendations from rules
//! - [`data`]: CSV purchase log loading
//! - [`config`]: Mining parameters and TOML loading
//! - [`pipeline`]: End-to-end analysis

pub mod basket;
pub mod config;
pub mod data;
pub mod error;
pub mod matrix;
pub mod mining;
pub mod pipeline;
pub mod prelude;
pub mod recommend;

pub use error::{BasketError, Result};
