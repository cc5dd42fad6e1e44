#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Record types shared across the EV sales ETL stages.
//!
//! Data moves through three shapes:
//!
//! 1. [`RawTableRow`] — text scraped directly from a PDF table.
//! 2. [`WideRecord`] — one row per reporting month with parsed counts.
//! 3. [`LongRecord`] — one row per (month, [`Category`]) pair, joined with
//!    series metadata. This is what gets uploaded.

pub mod progress;

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Column names of every table in the sales report, in order.
pub const COLUMNS: [&str; 5] = ["date", "BEV", "PHEV", "HEV", "TotalLDV"];

/// A vehicle category column in the wide table.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum Category {
    /// Battery electric vehicles.
    #[strum(serialize = "BEV")]
    Bev,
    /// Plug-in hybrid electric vehicles.
    #[strum(serialize = "PHEV")]
    Phev,
    /// Hybrid electric vehicles.
    #[strum(serialize = "HEV")]
    Hev,
    /// Total light-duty vehicle sales.
    #[strum(serialize = "TotalLDV")]
    TotalLdv,
}

impl Category {
    /// All categories in wide-table column order.
    pub const ALL: [Self; 4] = [Self::Bev, Self::Phev, Self::Hev, Self::TotalLdv];

    /// Lowercased column name, used as the series identifier.
    #[must_use]
    pub fn series_id(self) -> String {
        self.as_ref().to_lowercase()
    }

    /// Looks up a category from its series identifier (case-insensitive).
    #[must_use]
    pub fn from_series_id(series_id: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_ref().eq_ignore_ascii_case(series_id))
    }
}

/// Deployment environment. Controls the namespace prefix applied to
/// series identifiers before upload.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Staging.
    #[default]
    #[strum(to_string = "uat", serialize = "staging")]
    Uat,
    /// Production.
    #[strum(to_string = "prod", serialize = "production")]
    Prod,
}

/// Namespace for production series identifiers.
const PROD_NAMESPACE: &str = r"anl\us_vehicle_sales";

/// Namespace for staging series identifiers.
const UAT_NAMESPACE: &str = r"uat\anl\us_vehicle_sales";

impl Environment {
    /// Path-like namespace prepended to every series identifier.
    #[must_use]
    pub const fn namespace(self) -> &'static str {
        match self {
            Self::Uat => UAT_NAMESPACE,
            Self::Prod => PROD_NAMESPACE,
        }
    }
}

/// A single row scraped from a PDF table. All values are unparsed text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTableRow {
    /// Compact month-year token (e.g. `"Dec-10"`).
    pub date: String,
    /// Battery electric count.
    #[serde(rename = "BEV")]
    pub bev: String,
    /// Plug-in hybrid count.
    #[serde(rename = "PHEV")]
    pub phev: String,
    /// Hybrid count.
    #[serde(rename = "HEV")]
    pub hev: String,
    /// Total light-duty vehicle count.
    #[serde(rename = "TotalLDV")]
    pub total_ldv: String,
}

impl RawTableRow {
    /// Builds a row from exactly five cells in [`COLUMNS`] order.
    ///
    /// Returns `None` when the cell count does not match.
    #[must_use]
    pub fn from_cells<S: AsRef<str>>(cells: &[S]) -> Option<Self> {
        let [date, bev, phev, hev, total_ldv] = cells else {
            return None;
        };
        Some(Self {
            date: date.as_ref().to_owned(),
            bev: bev.as_ref().to_owned(),
            phev: phev.as_ref().to_owned(),
            hev: hev.as_ref().to_owned(),
            total_ldv: total_ldv.as_ref().to_owned(),
        })
    }

    /// Returns the text cell for a category.
    #[must_use]
    pub fn category(&self, category: Category) -> &str {
        match category {
            Category::Bev => &self.bev,
            Category::Phev => &self.phev,
            Category::Hev => &self.hev,
            Category::TotalLdv => &self.total_ldv,
        }
    }
}

/// A normalized wide-table row: one per reporting month.
///
/// Counts are `None` when the source cell could not be coerced to an
/// integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WideRecord {
    /// First day of the reporting month.
    pub date: NaiveDate,
    /// Battery electric vehicle sales.
    pub bev: Option<i64>,
    /// Plug-in hybrid electric vehicle sales.
    pub phev: Option<i64>,
    /// Hybrid electric vehicle sales.
    pub hev: Option<i64>,
    /// Total light-duty vehicle sales.
    pub total_ldv: Option<i64>,
}

impl WideRecord {
    /// Creates a record with every count missing.
    #[must_use]
    pub const fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            bev: None,
            phev: None,
            hev: None,
            total_ldv: None,
        }
    }

    /// Returns the count for a category.
    #[must_use]
    pub const fn get(&self, category: Category) -> Option<i64> {
        match category {
            Category::Bev => self.bev,
            Category::Phev => self.phev,
            Category::Hev => self.hev,
            Category::TotalLdv => self.total_ldv,
        }
    }

    /// Sets the count for a category.
    pub const fn set(&mut self, category: Category, value: Option<i64>) {
        match category {
            Category::Bev => self.bev = value,
            Category::Phev => self.phev = value,
            Category::Hev => self.hev = value,
            Category::TotalLdv => self.total_ldv = value,
        }
    }
}

/// One output row: a single (series, month) observation.
///
/// `attributes` holds the descriptive columns attached by the metadata
/// join. It is empty when the series has no metadata entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LongRecord {
    /// Series identifier (lowercased category, possibly namespaced).
    pub series_id: String,
    /// First day of the reporting month.
    pub date: NaiveDate,
    /// Observed count, `None` if the source value was unparseable.
    pub value: Option<i64>,
    /// Metadata attributes keyed by attribute name.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

/// Static descriptive attributes for each series, keyed by series id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeriesMetadata {
    entries: BTreeMap<String, BTreeMap<String, String>>,
}

impl SeriesMetadata {
    /// Creates a metadata table from already-loaded entries.
    #[must_use]
    pub const fn new(entries: BTreeMap<String, BTreeMap<String, String>>) -> Self {
        Self { entries }
    }

    /// Returns the attributes for `series_id`, if any.
    #[must_use]
    pub fn get(&self, series_id: &str) -> Option<&BTreeMap<String, String>> {
        self.entries.get(series_id)
    }

    /// Sorted union of every attribute name across all series.
    ///
    /// This is the set of descriptive columns appended to the output.
    #[must_use]
    pub fn attribute_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .entries
            .values()
            .flat_map(|attrs| attrs.keys().cloned())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Number of series with metadata.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no series has metadata.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn series_ids_are_lowercased_column_names() {
        let ids: Vec<String> = Category::ALL.iter().map(|c| c.series_id()).collect();
        assert_eq!(ids, vec!["bev", "phev", "hev", "totalldv"]);
        assert_eq!(COLUMNS[1..], ["BEV", "PHEV", "HEV", "TotalLDV"]);
    }

    #[test]
    fn category_round_trips_through_series_id() {
        for category in Category::ALL {
            assert_eq!(Category::from_series_id(&category.series_id()), Some(category));
        }
        assert_eq!(Category::from_series_id("fcev"), None);
    }

    #[test]
    fn environment_accepts_aliases() {
        assert_eq!("uat".parse::<Environment>().unwrap(), Environment::Uat);
        assert_eq!("staging".parse::<Environment>().unwrap(), Environment::Uat);
        assert_eq!("PROD".parse::<Environment>().unwrap(), Environment::Prod);
        assert_eq!("production".parse::<Environment>().unwrap(), Environment::Prod);
        assert!("dev".parse::<Environment>().is_err());
        assert_eq!(Environment::Prod.to_string(), "prod");
    }

    #[test]
    fn staging_namespace_wraps_production() {
        assert_eq!(Environment::Prod.namespace(), r"anl\us_vehicle_sales");
        assert_eq!(
            Environment::Uat.namespace(),
            format!(r"uat\{}", Environment::Prod.namespace())
        );
    }

    #[test]
    fn raw_row_requires_five_cells() {
        let row = RawTableRow::from_cells(&["Jan-23", "1", "2", "3", "4"]).unwrap();
        assert_eq!(row.category(Category::TotalLdv), "4");
        assert!(RawTableRow::from_cells(&["Jan-23", "1", "2", "3"]).is_none());
        assert!(RawTableRow::from_cells(&["Jan-23", "1", "2", "3", "4", "5"]).is_none());
    }

    #[test]
    fn attribute_names_are_sorted_union() {
        let mut entries = BTreeMap::new();
        entries.insert(
            "bev".to_owned(),
            BTreeMap::from([("unit".to_owned(), "vehicles".to_owned())]),
        );
        entries.insert(
            "hev".to_owned(),
            BTreeMap::from([
                ("description".to_owned(), "Hybrid".to_owned()),
                ("unit".to_owned(), "vehicles".to_owned()),
            ]),
        );
        let metadata = SeriesMetadata::new(entries);
        assert_eq!(metadata.attribute_names(), vec!["description", "unit"]);
        assert_eq!(metadata.len(), 2);
    }
}
