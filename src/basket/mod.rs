//! Basket construction from raw purchase observations.
//!
//! A purchase log has no invoice concept, so baskets are derived: every
//! service a customer bought within one calendar month forms one basket.
//! Items are (service, category) pairs because the same service id denotes
//! different services under different categories.
//!
//! # Example
//!
//! ```
//! use aprender_basket::basket::{Baskets, Observation};
//!
//! let observations = vec![
//!     Observation::new("7256", "9", "4", "2017-08-06 16:11:00"),
//!     Observation::new("7256", "46", "4", "2017-08-21 10:00:00"),
//!     Observation::new("7256", "9", "4", "2017-10-02 08:30:00"),
//! ];
//!
//! let baskets = Baskets::from_observations(&observations).expect("valid timestamps");
//! assert_eq!(baskets.len(), 2); // 7256_2017-08 and 7256_2017-10
//! ```

use crate::error::{BasketError, Result};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Timestamp layouts accepted for `created_at`, tried in order.
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// A single raw purchase record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    /// Customer identifier
    pub customer_id: String,
    /// Service identifier (only unique within a category)
    pub service_id: String,
    /// Category identifier
    pub category_id: String,
    /// Purchase timestamp, unparsed
    pub created_at: String,
}

impl Observation {
    /// Create an observation from its raw fields.
    pub fn new(
        customer_id: impl Into<String>,
        service_id: impl Into<String>,
        category_id: impl Into<String>,
        created_at: impl Into<String>,
    ) -> Self {
        Self {
            customer_id: customer_id.into(),
            service_id: service_id.into(),
            category_id: category_id.into(),
            created_at: created_at.into(),
        }
    }

    /// The item this observation purchased.
    #[must_use]
    pub fn item(&self) -> ItemId {
        ItemId::new(&self.service_id, &self.category_id)
    }

    /// Resolve the basket this observation belongs to.
    ///
    /// `record` is the 1-based position used in error reports.
    ///
    /// # Errors
    ///
    /// Returns [`BasketError::MalformedObservation`] when a required field is
    /// blank, the service id contains `_`, or the timestamp cannot be parsed.
    pub fn basket(&self, record: usize) -> Result<BasketId> {
        self.check_fields(record)?;
        let month = YearMonth::from_timestamp(&self.created_at).ok_or_else(|| {
            BasketError::malformed(
                record,
                "created_at",
                format!("unparsable timestamp '{}'", self.created_at),
            )
        })?;
        Ok(BasketId::new(self.customer_id.trim(), month))
    }

    fn check_fields(&self, record: usize) -> Result<()> {
        let fields = [
            ("customer_id", &self.customer_id),
            ("service_id", &self.service_id),
            ("category_id", &self.category_id),
            ("created_at", &self.created_at),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(BasketError::malformed(record, name, "missing value"));
            }
        }
        // `service_category` splits at the first underscore
        if self.service_id.contains('_') {
            return Err(BasketError::malformed(
                record,
                "service_id",
                format!("'{}' contains '_'", self.service_id),
            ));
        }
        Ok(())
    }
}

/// Item identity: a (service, category) pair, rendered as `service_category`.
///
/// Baskets only admit service ids without `_`, so the rendered form of every
/// observed item parses back to the same pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId {
    service_id: String,
    category_id: String,
}

impl ItemId {
    /// Create an item from its service and category identifiers.
    pub fn new(service_id: &str, category_id: &str) -> Self {
        Self {
            service_id: service_id.trim().to_string(),
            category_id: category_id.trim().to_string(),
        }
    }

    /// Service identifier.
    #[must_use]
    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    /// Category identifier.
    #[must_use]
    pub fn category_id(&self) -> &str {
        &self.category_id
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.service_id, self.category_id)
    }
}

impl FromStr for ItemId {
    type Err = BasketError;

    /// Parse the `service_category` form, splitting at the first underscore.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().split_once('_') {
            Some((service, category)) if !service.is_empty() && !category.is_empty() => {
                Ok(Self::new(service, category))
            }
            _ => Err(BasketError::invalid_parameter(
                "item",
                format!("'{s}'"),
                "<service_id>_<category_id>",
            )),
        }
    }
}

/// Calendar month used as the basket time bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    /// Create a year-month; `month` is 1-based.
    ///
    /// # Errors
    ///
    /// Returns [`BasketError::InvalidParameter`] if `month` is not in 1..=12.
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(BasketError::invalid_parameter("month", month, "in 1..=12"));
        }
        Ok(Self { year, month })
    }

    /// Truncate a raw timestamp to its month, or `None` if it does not parse.
    #[must_use]
    pub fn from_timestamp(raw: &str) -> Option<Self> {
        let ts = parse_timestamp(raw)?;
        Some(Self {
            year: ts.year(),
            month: ts.month(),
        })
    }

    /// Year component.
    #[must_use]
    pub fn year(&self) -> i32 {
        self.year
    }

    /// Month component (1-based).
    #[must_use]
    pub fn month(&self) -> u32 {
        self.month
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Parse a purchase timestamp.
///
/// Accepts `YYYY-MM-DD HH:MM:SS` (optionally `T`-separated or with fractional
/// seconds), RFC 3339 with offset (wall-clock time is kept), and bare dates.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Some(ts) = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    {
        return Some(ts);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.naive_local());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Basket identity: one customer within one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BasketId {
    customer_id: String,
    month: YearMonth,
}

impl BasketId {
    /// Create a basket identifier.
    pub fn new(customer_id: impl Into<String>, month: YearMonth) -> Self {
        Self {
            customer_id: customer_id.into(),
            month,
        }
    }

    /// Customer identifier.
    #[must_use]
    pub fn customer_id(&self) -> &str {
        &self.customer_id
    }

    /// Time bucket.
    #[must_use]
    pub fn month(&self) -> YearMonth {
        self.month
    }
}

impl fmt::Display for BasketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.customer_id, self.month)
    }
}

/// Baskets keyed by identifier, each holding the set of items it contains.
///
/// Both levels are ordered maps, so iteration order is sorted by identifier
/// and independent of input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Baskets {
    baskets: BTreeMap<BasketId, BTreeSet<ItemId>>,
    n_observations: usize,
}

impl Baskets {
    /// Group observations into baskets, collapsing repeat purchases to presence.
    ///
    /// # Errors
    ///
    /// Returns [`BasketError::MalformedObservation`] for the first record with a
    /// blank field, an underscore in its service id, or an unparsable timestamp.
    /// No partial result is returned.
    pub fn from_observations<'a, I>(observations: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a Observation>,
    {
        let mut baskets: BTreeMap<BasketId, BTreeSet<ItemId>> = BTreeMap::new();
        let mut n_observations = 0;

        for (idx, obs) in observations.into_iter().enumerate() {
            let basket = obs.basket(idx + 1)?;
            baskets.entry(basket).or_default().insert(obs.item());
            n_observations += 1;
        }

        Ok(Self {
            baskets,
            n_observations,
        })
    }

    /// Number of distinct baskets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.baskets.len()
    }

    /// True when no observation was grouped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.baskets.is_empty()
    }

    /// Number of observations consumed, duplicates included.
    #[must_use]
    pub fn n_observations(&self) -> usize {
        self.n_observations
    }

    /// Items of one basket.
    #[must_use]
    pub fn get(&self, basket: &BasketId) -> Option<&BTreeSet<ItemId>> {
        self.baskets.get(basket)
    }

    /// Iterate baskets in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = (&BasketId, &BTreeSet<ItemId>)> {
        self.baskets.iter()
    }

    /// All distinct items across baskets, sorted.
    #[must_use]
    pub fn items(&self) -> BTreeSet<&ItemId> {
        self.baskets.values().flatten().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(customer: &str, service: &str, category: &str, at: &str) -> Observation {
        Observation::new(customer, service, category, at)
    }

    #[test]
    fn test_item_id_display() {
        assert_eq!(ItemId::new("9", "4").to_string(), "9_4");
    }

    #[test]
    fn test_item_id_identity_is_the_pair() {
        // Same service id under different categories is a different item
        assert_ne!(ItemId::new("4", "7"), ItemId::new("4", "2"));
        // No collision from naive concatenation: ("1", "1_2") vs ("1_1", "2")
        assert_ne!(ItemId::new("1", "1_2"), ItemId::new("1_1", "2"));
    }

    #[test]
    fn test_item_id_from_str() {
        let item: ItemId = "2_0".parse().expect("valid item");
        assert_eq!(item.service_id(), "2");
        assert_eq!(item.category_id(), "0");

        assert!("20".parse::<ItemId>().is_err());
        assert!("_0".parse::<ItemId>().is_err());
        assert!("2_".parse::<ItemId>().is_err());
    }

    #[test]
    fn test_year_month_bounds() {
        assert!(YearMonth::new(2017, 0).is_err());
        assert!(YearMonth::new(2017, 13).is_err());
        assert_eq!(YearMonth::new(2017, 8).expect("valid").to_string(), "2017-08");
    }

    #[test]
    fn test_parse_timestamp_formats() {
        for raw in [
            "2017-08-06 16:11:00",
            "2017-08-06 16:11:00.250",
            "2017-08-06T16:11:00",
            "2017-08-06T16:11:00+03:00",
            "2017-08-06",
        ] {
            let month = YearMonth::from_timestamp(raw).expect(raw);
            assert_eq!(month.to_string(), "2017-08", "{raw}");
        }
    }

    #[test]
    fn test_rfc3339_keeps_wall_clock_month() {
        // 00:30 on Sep 1st in +03:00 is still August in UTC, but the wall clock says September
        let month = YearMonth::from_timestamp("2017-09-01T00:30:00+03:00").expect("valid");
        assert_eq!(month.to_string(), "2017-09");
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("2017-13-01").is_none());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn test_basket_id_display() {
        let obs = obs("7256", "9", "4", "2017-08-06 16:11:00");
        assert_eq!(obs.basket(1).expect("valid").to_string(), "7256_2017-08");
    }

    #[test]
    fn test_baskets_group_by_customer_and_month() {
        let observations = vec![
            obs("7256", "9", "4", "2017-08-06 16:11:00"),
            obs("7256", "46", "4", "2017-08-21 10:00:00"),
            obs("7256", "9", "4", "2017-10-02 08:30:00"),
            obs("7256", "38", "4", "2017-10-15 08:30:00"),
            obs("10", "9", "4", "2017-08-01 00:00:00"),
        ];

        let baskets = Baskets::from_observations(&observations).expect("valid");
        assert_eq!(baskets.len(), 3);
        assert_eq!(baskets.n_observations(), 5);

        let aug = BasketId::new("7256", YearMonth::new(2017, 8).expect("valid"));
        let items: Vec<String> = baskets
            .get(&aug)
            .expect("basket exists")
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(items, vec!["46_4", "9_4"]);
    }

    #[test]
    fn test_repeat_purchases_collapse() {
        let observations = vec![
            obs("1", "9", "4", "2017-08-01 09:00:00"),
            obs("1", "9", "4", "2017-08-02 09:00:00"),
            obs("1", "9", "4", "2017-08-03 09:00:00"),
        ];

        let baskets = Baskets::from_observations(&observations).expect("valid");
        assert_eq!(baskets.len(), 1);
        let (_, items) = baskets.iter().next().expect("one basket");
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_iteration_order_is_independent_of_input_order() {
        let mut observations = vec![
            obs("2", "1", "1", "2018-01-01"),
            obs("1", "2", "2", "2017-12-01"),
            obs("1", "1", "1", "2018-01-01"),
        ];
        let forward = Baskets::from_observations(&observations).expect("valid");
        observations.reverse();
        let backward = Baskets::from_observations(&observations).expect("valid");

        let ids = |b: &Baskets| b.iter().map(|(id, _)| id.to_string()).collect::<Vec<_>>();
        assert_eq!(ids(&forward), ids(&backward));
        assert_eq!(ids(&forward), vec!["1_2017-12", "1_2018-01", "2_2018-01"]);
    }

    #[test]
    fn test_unparsable_timestamp_fails_fast() {
        let observations = vec![
            obs("1", "9", "4", "2017-08-01 09:00:00"),
            obs("1", "9", "4", "not a date"),
        ];

        let err = Baskets::from_observations(&observations).expect_err("must fail");
        match err {
            BasketError::MalformedObservation { record, field, .. } => {
                assert_eq!(record, 2);
                assert_eq!(field, "created_at");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_field_fails_fast() {
        let observations = vec![obs("", "9", "4", "2017-08-01 09:00:00")];
        let err = Baskets::from_observations(&observations).expect_err("must fail");
        assert!(matches!(
            err,
            BasketError::MalformedObservation { ref field, .. } if field == "customer_id"
        ));
    }

    #[test]
    fn test_items_are_distinct_and_sorted() {
        let observations = vec![
            obs("1", "b", "1", "2017-08-01"),
            obs("2", "a", "1", "2017-08-01"),
            obs("2", "b", "1", "2017-08-01"),
        ];
        let baskets = Baskets::from_observations(&observations).expect("valid");
        let items: Vec<String> = baskets.items().iter().map(ToString::to_string).collect();
        assert_eq!(items, vec!["a_1", "b_1"]);
    }

    #[test]
    fn test_underscore_in_service_id_rejected() {
        let observations = vec![
            obs("1", "9", "4", "2017-08-01"),
            obs("1", "1_1", "2", "2017-08-01"),
        ];
        let err = Baskets::from_observations(&observations).expect_err("must fail");
        assert!(matches!(
            err,
            BasketError::MalformedObservation { record: 2, ref field, .. } if field == "service_id"
        ));

        // Underscores in the category survive the round trip
        let observations = vec![obs("1", "1", "1_2", "2017-08-01")];
        let baskets = Baskets::from_observations(&observations).expect("valid");
        let (_, items) = baskets.iter().next().expect("one basket");
        let item = items.iter().next().expect("one item");
        assert_eq!(item.to_string().parse::<ItemId>().expect("parses"), *item);
    }

    #[test]
    fn test_every_basket_is_observed_and_records_are_counted() {
        let observations = vec![
            obs("a", "X", "0", "2017-08-01"),
            obs("a", "X", "0", "2017-08-02"),
            obs("b", "Y", "0", "2017-08-01"),
        ];
        let baskets = Baskets::from_observations(&observations).expect("valid");
        assert_eq!(baskets.n_observations(), 3);
        assert_eq!(baskets.len(), 2);
        assert!(baskets.iter().all(|(_, items)| !items.is_empty()));
    }
}
