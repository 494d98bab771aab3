//! Mining configuration.
//!
//! Plain parameters with defaults, optionally read from a TOML file:
//!
//! ```toml
//! min_support = 0.01
//! metric = "lift"
//! min_threshold = 0.01
//! top_n = 3
//! max_len = 4
//! ```
//!
//! Precedence is defaults < file < explicit overrides.

use crate::error::{BasketError, Result};
use crate::mining::{Apriori, RuleMetric};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Parameters for one mining run and the queries against it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MiningConfig {
    /// Minimum itemset support, in (0, 1]
    pub min_support: f64,
    /// Metric used to filter rules
    pub metric: RuleMetric,
    /// Minimum value of `metric` for a rule to be kept
    pub min_threshold: f64,
    /// Number of recommendations per query
    pub top_n: usize,
    /// Optional cap on itemset size
    pub max_len: Option<usize>,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            min_support: 0.01,
            metric: RuleMetric::Lift,
            min_threshold: 0.01,
            top_n: 1,
            max_len: None,
        }
    }
}

/// Values that take precedence over the file, e.g. from command-line flags.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ConfigOverrides {
    /// Overrides `min_support`
    pub min_support: Option<f64>,
    /// Overrides `metric`
    pub metric: Option<RuleMetric>,
    /// Overrides `min_threshold`
    pub min_threshold: Option<f64>,
    /// Overrides `top_n`
    pub top_n: Option<usize>,
    /// Overrides `max_len`
    pub max_len: Option<usize>,
}

impl MiningConfig {
    /// Parse a TOML document; missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`BasketError::Config`] for malformed TOML or unknown keys.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source).map_err(|e| BasketError::Config(e.to_string()))
    }

    /// Read a TOML config file.
    ///
    /// # Errors
    ///
    /// Returns [`BasketError::Io`] if the file cannot be read and
    /// [`BasketError::Config`] if it cannot be parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| BasketError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
            .map_err(|e| BasketError::Config(format!("{}: {e}", path.display())))
    }

    /// Resolve defaults, an optional file, and overrides, then validate.
    ///
    /// # Errors
    ///
    /// Returns any load error, or [`BasketError::InvalidParameter`] from
    /// [`MiningConfig::validate`].
    pub fn load(path: Option<&Path>, overrides: ConfigOverrides) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(min_support) = overrides.min_support {
            self.min_support = min_support;
        }
        if let Some(metric) = overrides.metric {
            self.metric = metric;
        }
        if let Some(min_threshold) = overrides.min_threshold {
            self.min_threshold = min_threshold;
        }
        if let Some(top_n) = overrides.top_n {
            self.top_n = top_n;
        }
        if overrides.max_len.is_some() {
            self.max_len = overrides.max_len;
        }
    }

    /// Set the minimum support.
    #[must_use]
    pub fn with_min_support(mut self, min_support: f64) -> Self {
        self.min_support = min_support;
        self
    }

    /// Set the rule filter metric.
    #[must_use]
    pub fn with_metric(mut self, metric: RuleMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Set the rule filter threshold.
    #[must_use]
    pub fn with_min_threshold(mut self, min_threshold: f64) -> Self {
        self.min_threshold = min_threshold;
        self
    }

    /// Set the number of recommendations per query.
    #[must_use]
    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    /// Cap the itemset size.
    #[must_use]
    pub fn with_max_len(mut self, max_len: Option<usize>) -> Self {
        self.max_len = max_len;
        self
    }

    /// The itemset miner these settings describe.
    #[must_use]
    pub fn apriori(&self) -> Apriori {
        Apriori::new()
            .with_min_support(self.min_support)
            .with_max_len(self.max_len)
    }

    /// Check every parameter range.
    ///
    /// # Errors
    ///
    /// Returns [`BasketError::InvalidParameter`] naming the first bad value.
    pub fn validate(&self) -> Result<()> {
        self.apriori().validate()?;
        self.metric.validate_threshold(self.min_threshold)?;
        if self.top_n == 0 {
            return Err(BasketError::invalid_parameter("top_n", self.top_n, ">= 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = MiningConfig::default();
        assert_eq!(config.min_support, 0.01);
        assert_eq!(config.metric, RuleMetric::Lift);
        assert_eq!(config.min_threshold, 0.01);
        assert_eq!(config.top_n, 1);
        assert_eq!(config.max_len, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = MiningConfig::from_toml_str("metric = \"confidence\"\ntop_n = 3\n")
            .expect("valid TOML");
        assert_eq!(config.metric, RuleMetric::Confidence);
        assert_eq!(config.top_n, 3);
        assert_eq!(config.min_support, 0.01);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = MiningConfig::from_toml_str("min_suport = 0.2\n").expect_err("typo");
        assert!(matches!(err, BasketError::Config(_)));
    }

    #[test]
    fn test_bad_metric_rejected() {
        assert!(MiningConfig::from_toml_str("metric = \"leverage\"\n").is_err());
    }

    #[test]
    fn test_validate_ranges() {
        let base = MiningConfig::default();
        assert!(base.with_min_support(1.5).validate().is_err());
        assert!(base.with_min_support(0.0).validate().is_err());
        assert!(base.with_top_n(0).validate().is_err());
        assert!(base.with_max_len(Some(0)).validate().is_err());
        assert!(base
            .with_metric(RuleMetric::Confidence)
            .with_min_threshold(1.2)
            .validate()
            .is_err());
        assert!(base.with_min_threshold(4.0).validate().is_ok());
    }

    #[test]
    fn test_load_file_with_overrides() {
        let mut file = NamedTempFile::new().expect("temp file");
        writeln!(file, "min_support = 0.05").expect("write");
        writeln!(file, "top_n = 2").expect("write");

        let overrides = ConfigOverrides {
            top_n: Some(5),
            ..ConfigOverrides::default()
        };
        let config = MiningConfig::load(Some(file.path()), overrides).expect("valid");
        assert_eq!(config.min_support, 0.05);
        assert_eq!(config.top_n, 5);
    }

    #[test]
    fn test_load_validates_after_overrides() {
        let overrides = ConfigOverrides {
            min_support: Some(2.0),
            ..ConfigOverrides::default()
        };
        let err = MiningConfig::load(None, overrides).expect_err("invalid");
        assert!(matches!(err, BasketError::InvalidParameter { .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = MiningConfig::from_file("/nonexistent/mining.toml").expect_err("missing");
        assert!(matches!(err, BasketError::Io { .. }));
    }
}
