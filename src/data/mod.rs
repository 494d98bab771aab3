//! Purchase log loading.
//!
//! Reads the service purchase CSV (`UserId,ServiceId,CategoryId,CreateDate`)
//! into [`Observation`]s. Lower-case `customer_id,service_id,category_id,created_at`
//! headers are accepted as well. Timestamps are kept raw; they are parsed
//! when baskets are built.

use crate::basket::Observation;
use crate::error::{BasketError, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct PurchaseRecord {
    #[serde(rename = "UserId", alias = "customer_id", default)]
    customer_id: Option<String>,
    #[serde(rename = "ServiceId", alias = "service_id", default)]
    service_id: Option<String>,
    #[serde(rename = "CategoryId", alias = "category_id", default)]
    category_id: Option<String>,
    #[serde(rename = "CreateDate", alias = "created_at", default)]
    created_at: Option<String>,
}

impl PurchaseRecord {
    fn into_observation(self, record: usize) -> Result<Observation> {
        let require = |value: Option<String>, field: &str| {
            value
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| BasketError::malformed(record, field, "missing value"))
        };
        Ok(Observation::new(
            require(self.customer_id, "UserId")?,
            require(self.service_id, "ServiceId")?,
            require(self.category_id, "CategoryId")?,
            require(self.created_at, "CreateDate")?,
        ))
    }
}

/// Read observations from any CSV source with a header row.
///
/// # Errors
///
/// Returns [`BasketError::MalformedObservation`] for a record with a missing
/// field (record numbers are 1-based, header excluded) and
/// [`BasketError::Csv`] for framing errors.
pub fn read_observations<R: Read>(reader: R) -> Result<Vec<Observation>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut observations = Vec::new();
    for (idx, row) in reader.deserialize::<PurchaseRecord>().enumerate() {
        observations.push(row?.into_observation(idx + 1)?);
    }
    Ok(observations)
}

/// Load observations from a CSV file.
///
/// # Errors
///
/// Returns [`BasketError::Io`] if the file cannot be opened, otherwise as
/// [`read_observations`].
pub fn load_observations<P: AsRef<Path>>(path: P) -> Result<Vec<Observation>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| BasketError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_observations(file)
}
