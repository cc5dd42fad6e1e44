//! Output shaping: series namespacing, CSV encoding, object naming.

use chrono::NaiveDateTime;
use ev_sales_models::{Environment, LongRecord};

use crate::LoadError;

/// Fixed leading columns of the output CSV.
pub const BASE_COLUMNS: [&str; 3] = ["series_id", "date", "value"];

/// Prefixes each record's `series_id` with the environment namespace.
///
/// Spaces in the series id become underscores, giving ids such as
/// `uat\anl\us_vehicle_sales\bev`.
#[must_use]
pub fn namespace_series(records: Vec<LongRecord>, environment: Environment) -> Vec<LongRecord> {
    let prefix = environment.namespace();
    records
        .into_iter()
        .map(|mut record| {
            record.series_id = format!(r"{prefix}\{}", record.series_id.replace(' ', "_"));
            record
        })
        .collect()
}

/// Object key for an upload made at `now`.
#[must_use]
pub fn object_key(now: NaiveDateTime) -> String {
    format!("ev_sales_{}.csv", now.format("%Y%m%d_%H%M%S"))
}

/// Encodes records as CSV with a header row.
///
/// Columns are [`BASE_COLUMNS`] followed by `attribute_columns` in the
/// given order. Missing values and absent attributes are empty cells.
///
/// # Errors
///
/// Returns [`LoadError::Csv`] if encoding fails.
pub fn to_csv(records: &[LongRecord], attribute_columns: &[String]) -> Result<Vec<u8>, LoadError> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let header = BASE_COLUMNS
        .iter()
        .copied()
        .chain(attribute_columns.iter().map(String::as_str));
    writer.write_record(header)?;

    for record in records {
        let date = record.date.format("%Y-%m-%d").to_string();
        let value = record.value.map(|v| v.to_string()).unwrap_or_default();

        let mut row: Vec<&str> = Vec::with_capacity(BASE_COLUMNS.len() + attribute_columns.len());
        row.push(&record.series_id);
        row.push(&date);
        row.push(&value);
        for column in attribute_columns {
            row.push(record.attributes.get(column).map_or("", String::as_str));
        }
        writer.write_record(&row)?;
    }

    writer
        .into_inner()
        .map_err(|e| LoadError::Io(std::io::Error::other(e.to_string())))
}
