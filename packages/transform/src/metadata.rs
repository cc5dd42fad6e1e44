//! Series metadata loading.
//!
//! The reference file is a JSON object keyed by series id, each value an
//! object of descriptive attributes:
//!
//! ```json
//! { "bev": { "description": "Battery electric vehicle sales", "unit": "vehicles" } }
//! ```
//!
//! Attribute values are flattened to strings for the CSV output: strings
//! pass through, numbers and booleans use their JSON text, `null` is
//! dropped, and nested values are kept as compact JSON.

use std::collections::BTreeMap;
use std::path::Path;

use ev_sales_models::SeriesMetadata;
use serde_json::Value;

use crate::TransformError;

/// Parses series metadata from JSON text.
///
/// # Errors
///
/// Returns [`TransformError::Metadata`] if `json` is not valid JSON, or
/// [`TransformError::MetadataShape`] if it is not an object of objects.
pub fn parse_metadata(json: &str) -> Result<SeriesMetadata, TransformError> {
    let root: Value = serde_json::from_str(json)?;
    let Value::Object(series) = root else {
        return Err(TransformError::MetadataShape {
            message: "top level must be an object keyed by series id".to_owned(),
        });
    };

    let mut entries = BTreeMap::new();
    for (series_id, attrs) in series {
        let Value::Object(attrs) = attrs else {
            return Err(TransformError::MetadataShape {
                message: format!("entry for '{series_id}' must be an object"),
            });
        };

        let flattened: BTreeMap<String, String> = attrs
            .into_iter()
            .filter_map(|(name, value)| attribute_text(value).map(|text| (name, text)))
            .collect();
        entries.insert(series_id.to_lowercase(), flattened);
    }

    let metadata = SeriesMetadata::new(entries);
    log::debug!(
        "Loaded metadata for {} series ({} attribute column(s))",
        metadata.len(),
        metadata.attribute_names().len()
    );
    Ok(metadata)
}

/// Reads and parses the metadata file at `path`.
///
/// # Errors
///
/// Returns [`TransformError::Io`] if the file cannot be read, otherwise
/// see [`parse_metadata`].
pub fn load_metadata(path: &Path) -> Result<SeriesMetadata, TransformError> {
    log::info!("Loading series metadata from {}", path.display());
    let json = std::fs::read_to_string(path)?;
    parse_metadata(&json)
}

fn attribute_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Bool(_) | Value::Number(_) | Value::Array(_) | Value::Object(_) => {
            Some(value.to_string())
        }
    }
}
