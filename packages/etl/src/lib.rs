#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Pipeline runner for the monthly EV sales ETL.
//!
//! A source implements [`EtlSource`] (acquire, normalize, publish) and
//! [`run_pipeline`] drives it through the three stages inside a scoped
//! download directory. Failures come back as [`EtlError::Stage`], tagged
//! with the [`Stage`] that produced them.

pub mod source;
pub mod workdir;

use std::fmt;
use std::future::Future;
use std::path::Path;
use std::time::Instant;

use ev_sales_s3::Published;

pub use workdir::DownloadDir;

/// The series metadata bundled with the binary.
pub const BUNDLED_METADATA: &str = include_str!("../data/anl_ev_sales_metadata.json");

/// Subdirectory of the configured download root that the run owns.
pub const DOWNLOAD_SUBDIR: &str = "ev_sales";

/// Boxed error returned by the individual stages of an [`EtlSource`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The three stages of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Browser navigation and download.
    Extraction,
    /// PDF table extraction, normalization and reshaping.
    Transformation,
    /// Publishing the output CSV.
    Upload,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Extraction => "Extraction",
            Self::Transformation => "Transformation",
            Self::Upload => "Upload",
        })
    }
}

/// Errors that can occur while running the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum EtlError {
    /// A stage failed.
    #[error("Scraper failed at {stage}: {source}")]
    Stage {
        /// The stage that failed.
        stage: Stage,
        /// The underlying error.
        #[source]
        source: BoxError,
    },

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl EtlError {
    /// Wraps `source` as a failure of `stage`.
    pub fn stage(stage: Stage, source: impl Into<BoxError>) -> Self {
        Self::Stage {
            stage,
            source: source.into(),
        }
    }

    /// The stage that failed, if this is a stage error.
    #[must_use]
    pub const fn failed_stage(&self) -> Option<Stage> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            Self::Config(_) => None,
        }
    }
}

/// A data source that can be run through the three ETL stages.
///
/// Each stage hands its artifact to the next; nothing is shared between
/// stages except through the return values.
pub trait EtlSource: Send + Sync {
    /// Artifact produced by [`EtlSource::acquire`], usually a file path.
    type Raw: Send;

    /// Record type produced by [`EtlSource::normalize`].
    type Record: Send;

    /// Human-readable name used in logs.
    fn name(&self) -> &str;

    /// Fetches the raw artifact into `download_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the artifact cannot be obtained.
    fn acquire(
        &self,
        download_dir: &Path,
    ) -> impl Future<Output = Result<Self::Raw, BoxError>> + Send;

    /// Turns the raw artifact into output records.
    ///
    /// # Errors
    ///
    /// Returns an error if the artifact cannot be parsed.
    fn normalize(
        &self,
        raw: Self::Raw,
    ) -> impl Future<Output = Result<Vec<Self::Record>, BoxError>> + Send;

    /// Publishes the records.
    ///
    /// # Errors
    ///
    /// Returns an error if the records cannot be written.
    fn publish(
        &self,
        records: Vec<Self::Record>,
    ) -> impl Future<Output = Result<Published, BoxError>> + Send;
}

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Where the output went.
    pub published: Published,
    /// Number of records produced by the transformation stage.
    pub records: usize,
    /// Wall-clock duration of the run in seconds.
    pub elapsed_secs: u64,
}

/// Runs `source` through extraction, transformation and upload.
///
/// `download_dir` is created (emptied if it already exists) and removed
/// again when the run ends, whether it succeeded or not. Preparing the
/// directory is part of the extraction stage.
///
/// # Errors
///
/// Returns [`EtlError::Stage`] naming the first stage that failed.
pub async fn run_pipeline<S: EtlSource>(
    source: &S,
    download_dir: &Path,
) -> Result<RunSummary, EtlError> {
    let start = Instant::now();
    let workdir = DownloadDir::create(download_dir)
        .map_err(|e| EtlError::stage(Stage::Extraction, e))?;

    log::info!("[{}] Initiating the Data Extraction stage", source.name());
    let raw = source
        .acquire(workdir.path())
        .await
        .map_err(|e| EtlError::stage(Stage::Extraction, e))?;

    log::info!("[{}] Initiating the Data Transformation stage", source.name());
    let records = source
        .normalize(raw)
        .await
        .map_err(|e| EtlError::stage(Stage::Transformation, e))?;
    let count = records.len();

    log::info!("[{}] Initiating the Data Upload stage", source.name());
    let published = source
        .publish(records)
        .await
        .map_err(|e| EtlError::stage(Stage::Upload, e))?;

    drop(workdir);

    let elapsed_secs = start.elapsed().as_secs();
    log::info!(
        "[{}] Published {} row(s) to {} in {elapsed_secs}s",
        source.name(),
        published.rows,
        published.location
    );

    Ok(RunSummary {
        published,
        records: count,
        elapsed_secs,
    })
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    /// Writes a marker file in `acquire` and optionally fails one stage.
    struct FakeSource {
        fail_at: Option<Stage>,
    }

    impl FakeSource {
        fn check(&self, stage: Stage) -> Result<(), BoxError> {
            if self.fail_at == Some(stage) {
                return Err(format!("{stage} exploded").into());
            }
            Ok(())
        }
    }

    impl EtlSource for FakeSource {
        type Raw = PathBuf;
        type Record = u32;

        fn name(&self) -> &str {
            "fake"
        }

        async fn acquire(&self, download_dir: &Path) -> Result<PathBuf, BoxError> {
            let path = download_dir.join("report.pdf");
            std::fs::write(&path, b"%PDF")?;
            self.check(Stage::Extraction)?;
            Ok(path)
        }

        async fn normalize(&self, raw: PathBuf) -> Result<Vec<u32>, BoxError> {
            assert!(raw.exists());
            self.check(Stage::Transformation)?;
            Ok(vec![1, 2, 3])
        }

        async fn publish(&self, records: Vec<u32>) -> Result<Published, BoxError> {
            self.check(Stage::Upload)?;
            Ok(Published {
                location: "memory".to_owned(),
                rows: records.len(),
                bytes: 0,
            })
        }
    }

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("ev_sales_etl_{name}_{}", std::process::id()))
            .join(DOWNLOAD_SUBDIR)
    }

    #[tokio::test]
    async fn successful_run_reports_rows_and_removes_download_dir() {
        let dir = temp_dir("ok");
        let summary = run_pipeline(&FakeSource { fail_at: None }, &dir)
            .await
            .unwrap();

        assert_eq!(summary.records, 3);
        assert_eq!(summary.published.rows, 3);
        assert_eq!(summary.published.location, "memory");
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn failures_are_tagged_with_their_stage() {
        for stage in [Stage::Extraction, Stage::Transformation, Stage::Upload] {
            let dir = temp_dir(&format!("fail_{stage}"));
            let err = run_pipeline(
                &FakeSource {
                    fail_at: Some(stage),
                },
                &dir,
            )
            .await
            .unwrap_err();

            assert_eq!(err.failed_stage(), Some(stage));
            assert_eq!(
                err.to_string(),
                format!("Scraper failed at {stage}: {stage} exploded")
            );
            assert!(!dir.exists(), "download dir left behind after {stage}");
        }
    }

    #[tokio::test]
    async fn unusable_download_dir_fails_extraction() {
        let blocker = std::env::temp_dir().join(format!("ev_sales_etl_blocker_{}", std::process::id()));
        std::fs::write(&blocker, b"not a directory").unwrap();

        let err = run_pipeline(&FakeSource { fail_at: None }, &blocker.join(DOWNLOAD_SUBDIR))
            .await
            .unwrap_err();

        assert_eq!(err.failed_stage(), Some(Stage::Extraction));
        std::fs::remove_file(&blocker).unwrap();
    }

    #[test]
    fn bundled_metadata_is_valid() {
        let metadata = ev_sales_transform::metadata::parse_metadata(BUNDLED_METADATA).unwrap();
        for category in ev_sales_models::Category::ALL {
            assert!(metadata.get(&category.series_id()).is_some());
        }
    }
}
