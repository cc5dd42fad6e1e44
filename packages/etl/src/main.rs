#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the ANL EV sales ETL.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use ev_sales_browser::navigator::{DOWNLOAD_LINK_XPATH, NavigationTarget, REPORT_PAGE_URL};
use ev_sales_browser::wait::WaitPolicy;
use ev_sales_browser::webdriver::DEFAULT_WEBDRIVER_URL;
use ev_sales_cli_utils::IndicatifProgress;
use ev_sales_etl::source::{Destination, EvSalesSource, ProgressFactory};
use ev_sales_etl::{BUNDLED_METADATA, DOWNLOAD_SUBDIR, EtlError, run_pipeline};
use ev_sales_models::Environment;
use ev_sales_s3::{DEFAULT_BUCKET, S3Config, S3Loader};
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(
    name = "run_anl_ev_sales_etl",
    about = "Scrape the ANL monthly EV sales report and publish it to S3"
)]
struct Cli {
    /// Target environment (`uat` or `prod`); selects the series namespace
    #[arg(long, env = "EV_SALES_ENVIRONMENT", default_value = "uat")]
    environment: Environment,

    /// Root for downloads; the run uses (and removes) its `ev_sales` subdirectory
    #[arg(long, env = "DOWNLOAD_DIR")]
    download_dir: Option<PathBuf>,

    /// S3 bucket for the output CSV
    #[arg(long, env = "S3_BUCKET_NAME", default_value = DEFAULT_BUCKET)]
    bucket: String,

    /// Custom S3 endpoint (S3-compatible stores)
    #[arg(long, env = "AWS_ENDPOINT_URL")]
    endpoint_url: Option<String>,

    /// `WebDriver` server URL
    #[arg(long, env = "WEBDRIVER_URL", default_value = DEFAULT_WEBDRIVER_URL)]
    webdriver_url: String,

    /// Run the browser without a window
    #[arg(long, env = "EV_SALES_HEADLESS")]
    headless: bool,

    /// Series metadata JSON (defaults to the bundled file)
    #[arg(long, env = "EV_SALES_METADATA")]
    metadata: Option<PathBuf>,

    /// Landing page that links to the report
    #[arg(long, default_value = REPORT_PAGE_URL)]
    url: String,

    /// `XPath` of the download link on the landing page
    #[arg(long, default_value = DOWNLOAD_LINK_XPATH)]
    link_xpath: String,

    /// Seconds between download directory polls
    #[arg(long, default_value_t = 10)]
    poll_interval_secs: u64,

    /// Give up waiting for the page and the download after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Write the CSV to this path instead of uploading (dry run)
    #[arg(long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = ev_sales_cli_utils::init_logger();
    let cli = Cli::parse();

    if cli.poll_interval_secs == 0 {
        return Err(EtlError::Config("--poll-interval-secs must be at least 1".to_owned()).into());
    }

    let metadata = match &cli.metadata {
        Some(path) => ev_sales_transform::metadata::load_metadata(path)?,
        None => ev_sales_transform::metadata::parse_metadata(BUNDLED_METADATA)?,
    };

    let download_root = match cli.download_dir {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    let download_dir = download_root.join(DOWNLOAD_SUBDIR);

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!("Interrupted; cancelling the run");
                cancel.cancel();
            }
        });
    }

    let mut navigation_policy = WaitPolicy::default().with_cancellation(cancel.clone());
    let mut download_policy = WaitPolicy::default()
        .with_interval(Duration::from_secs(cli.poll_interval_secs))
        .with_cancellation(cancel);
    if let Some(secs) = cli.timeout_secs {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(secs);
        navigation_policy = navigation_policy.with_deadline(deadline);
        download_policy = download_policy.with_deadline(deadline);
    }

    let destination = match cli.output {
        Some(path) => {
            log::info!("Dry run: writing output to {}", path.display());
            Destination::Local(path)
        }
        None => {
            let config = S3Config {
                bucket: cli.bucket,
                endpoint_url: cli.endpoint_url,
            };
            Destination::S3(S3Loader::from_env(&config).await)
        }
    };

    let progress: ProgressFactory =
        Arc::new(move |message: &str| IndicatifProgress::wait_spinner(&multi, message));

    let source = EvSalesSource::new(metadata, cli.environment, destination)
        .with_webdriver_url(&cli.webdriver_url)
        .with_headless(cli.headless)
        .with_target(NavigationTarget {
            url: cli.url,
            link_xpath: cli.link_xpath,
        })
        .with_navigation_policy(navigation_policy)
        .with_download_policy(download_policy)
        .with_progress(progress);

    log::info!(
        "Starting EV sales ETL ({} environment, download dir {})",
        cli.environment,
        download_dir.display()
    );

    let summary = run_pipeline(&source, &download_dir).await?;

    log::info!(
        "Done: {} record(s) -> {} ({} bytes) in {}s",
        summary.records,
        summary.published.location,
        summary.published.bytes,
        summary.elapsed_secs
    );

    Ok(())
}
