#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Publishing of EV sales series to S3.
//!
//! The output is a single CSV (`series_id, date, value, <metadata...>`)
//! written to `s3://<bucket>/ev_sales_<YYYYmmdd_HHMMSS>.csv`, with series
//! ids namespaced per [`Environment`].
//!
//! # Environment Variables
//!
//! Credentials and region come from the standard AWS chain
//! (`AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`, `AWS_REGION`, profiles,
//! instance roles). Set `AWS_ENDPOINT_URL` or [`S3Config::endpoint_url`]
//! to target an S3-compatible store.

pub mod output;

use std::path::Path;

use aws_sdk_s3::config::StalledStreamProtectionConfig;
use aws_sdk_s3::primitives::ByteStream;
use ev_sales_models::{Environment, LongRecord};

/// Default bucket for the published series.
pub const DEFAULT_BUCKET: &str = "anl-us-ev-sales";

/// Errors that can occur while publishing.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// S3 `PutObject` failed.
    #[error("Failed to upload s3://{bucket}/{key}: {source}")]
    Upload {
        /// Bucket name.
        bucket: String,
        /// Object key.
        key: String,
        /// Underlying SDK error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// CSV encoding failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error writing a local file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Where to upload.
#[derive(Debug, Clone)]
pub struct S3Config {
    /// Target bucket.
    pub bucket: String,
    /// Custom endpoint (S3-compatible stores). Enables path-style
    /// addressing.
    pub endpoint_url: Option<String>,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            bucket: DEFAULT_BUCKET.to_owned(),
            endpoint_url: None,
        }
    }
}

/// Result of a successful publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    /// Where the CSV went (`s3://...` or a local path).
    pub location: String,
    /// Number of data rows written.
    pub rows: usize,
    /// Size of the CSV in bytes.
    pub bytes: usize,
}

/// Uploads the output CSV to S3.
pub struct S3Loader {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3Loader {
    /// Creates a loader using the default AWS credential chain.
    pub async fn from_env(config: &S3Config) -> Self {
        let sdk_config = aws_config::load_from_env().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config)
            .stalled_stream_protection(StalledStreamProtectionConfig::disabled());
        if let Some(endpoint) = &config.endpoint_url {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self {
            client: aws_sdk_s3::Client::from_conf(builder.build()),
            bucket: config.bucket.clone(),
        }
    }

    /// The target bucket.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Namespaces, encodes and uploads `records` under a timestamped key.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Csv`] if encoding fails or
    /// [`LoadError::Upload`] if S3 rejects the object.
    pub async fn publish(
        &self,
        records: Vec<LongRecord>,
        attribute_columns: &[String],
        environment: Environment,
    ) -> Result<Published, LoadError> {
        let rows = records.len();
        let records = output::namespace_series(records, environment);
        let body = output::to_csv(&records, attribute_columns)?;
        let key = output::object_key(chrono::Local::now().naive_local());
        let bytes = body.len();

        self.upload(&key, body).await?;

        Ok(Published {
            location: format!("s3://{}/{key}", self.bucket),
            rows,
            bytes,
        })
    }

    /// Uploads `body` to `key` as `text/csv`.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Upload`] on S3 failures.
    pub async fn upload(&self, key: &str, body: Vec<u8>) -> Result<(), LoadError> {
        #[allow(clippy::cast_precision_loss)] // display-only KB value
        let kb = body.len() as f64 / 1024.0;
        log::info!("Pushing {kb:.1} KB -> s3://{}/{key}", self.bucket);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type("text/csv")
            .send()
            .await
            .map_err(|e| LoadError::Upload {
                bucket: self.bucket.clone(),
                key: key.to_owned(),
                source: Box::new(e),
            })?;

        log::info!("  uploaded {key}");
        Ok(())
    }
}

/// Namespaces and encodes `records`, writing the CSV to `path` instead of
/// uploading.
///
/// # Errors
///
/// Returns [`LoadError::Csv`] if encoding fails or [`LoadError::Io`] if the
/// file cannot be written.
pub async fn write_local(
    path: &Path,
    records: Vec<LongRecord>,
    attribute_columns: &[String],
    environment: Environment,
) -> Result<Published, LoadError> {
    let rows = records.len();
    let records = output::namespace_series(records, environment);
    let body = output::to_csv(&records, attribute_columns)?;
    let bytes = body.len();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, body).await?;
    log::info!("Wrote {rows} row(s) to {}", path.display());

    Ok(Published {
        location: path.display().to_string(),
        rows,
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::NaiveDate;

    use super::*;

    #[tokio::test]
    async fn writes_namespaced_csv_locally() {
        let dir = std::env::temp_dir().join(format!("ev_sales_s3_{}", std::process::id()));
        let path = dir.join("out").join("ev_sales.csv");
        let records = vec![LongRecord {
            series_id: "bev".to_owned(),
            date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            value: Some(1234),
            attributes: BTreeMap::new(),
        }];

        let published = write_local(&path, records, &[], Environment::Prod)
            .await
            .unwrap();

        assert_eq!(published.rows, 1);
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "series_id,date,value\nanl\\us_vehicle_sales\\bev,2023-01-01,1234\n"
        );
        assert_eq!(published.bytes, text.len());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
