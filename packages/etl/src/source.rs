//! The ANL monthly EV sales report as an [`EtlSource`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ev_sales_browser::download::wait_for_download;
use ev_sales_browser::navigator::{NavigationTarget, locate_pdf_url};
use ev_sales_browser::wait::WaitPolicy;
use ev_sales_browser::webdriver::{SessionConfig, WebDriverSession};
use ev_sales_browser::{BrowserError, PageDriver};
use ev_sales_models::progress::{ProgressCallback, null_progress};
use ev_sales_models::{Environment, LongRecord, SeriesMetadata};
use ev_sales_pdf::TableExtractor;
use ev_sales_s3::{Published, S3Loader};

use crate::{BoxError, EtlSource};

/// Creates a progress reporter for a named wait.
pub type ProgressFactory = Arc<dyn Fn(&str) -> Arc<dyn ProgressCallback> + Send + Sync>;

/// Where the output CSV goes.
pub enum Destination {
    /// Upload to S3.
    S3(S3Loader),
    /// Write to a local file instead of uploading.
    Local(PathBuf),
}

/// Scrapes, reshapes and publishes the ANL EV sales report.
pub struct EvSalesSource {
    webdriver_url: String,
    headless: bool,
    target: NavigationTarget,
    navigation_policy: WaitPolicy,
    download_policy: WaitPolicy,
    extractor: TableExtractor,
    metadata: SeriesMetadata,
    environment: Environment,
    destination: Destination,
    progress: ProgressFactory,
}

impl EvSalesSource {
    /// Creates a source publishing to `destination` with default
    /// navigation and polling behaviour.
    #[must_use]
    pub fn new(
        metadata: SeriesMetadata,
        environment: Environment,
        destination: Destination,
    ) -> Self {
        Self {
            webdriver_url: ev_sales_browser::webdriver::DEFAULT_WEBDRIVER_URL.to_owned(),
            headless: false,
            target: NavigationTarget::default(),
            navigation_policy: WaitPolicy::default(),
            download_policy: WaitPolicy::default()
                .with_interval(std::time::Duration::from_secs(10)),
            extractor: TableExtractor::new(),
            metadata,
            environment,
            destination,
            progress: Arc::new(|_: &str| null_progress()),
        }
    }

    /// Sets the `WebDriver` server URL.
    #[must_use]
    pub fn with_webdriver_url(mut self, url: &str) -> Self {
        url.clone_into(&mut self.webdriver_url);
        self
    }

    /// Runs the browser headless.
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Overrides the landing page and download link.
    #[must_use]
    pub fn with_target(mut self, target: NavigationTarget) -> Self {
        self.target = target;
        self
    }

    /// Sets the policy for the page wait/reload loop.
    #[must_use]
    pub fn with_navigation_policy(mut self, policy: WaitPolicy) -> Self {
        self.navigation_policy = policy;
        self
    }

    /// Sets the policy for the download poll.
    #[must_use]
    pub fn with_download_policy(mut self, policy: WaitPolicy) -> Self {
        self.download_policy = policy;
        self
    }

    /// Overrides the PDF table extractor.
    #[must_use]
    pub fn with_extractor(mut self, extractor: TableExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Sets how wait spinners are created.
    #[must_use]
    pub fn with_progress(mut self, progress: ProgressFactory) -> Self {
        self.progress = progress;
        self
    }

    /// Locates the report, navigates to it and waits for the file.
    async fn download<D: PageDriver>(
        &self,
        driver: &D,
        download_dir: &Path,
    ) -> Result<PathBuf, BrowserError> {
        let spinner = (self.progress)("Waiting for the landing page");
        let pdf_url = locate_pdf_url(driver, &self.target, &self.navigation_policy, &spinner).await;
        let pdf_url = settle(&spinner, pdf_url, "Download link found")?;

        if pdf_url == self.target.url {
            log::debug!("Click did not navigate away; download started from the landing page");
        } else {
            log::info!("Navigating to {pdf_url}");
            driver.goto(&pdf_url).await?;
        }

        let spinner = (self.progress)("Waiting for the download");
        let path = wait_for_download(download_dir, &self.download_policy, &spinner).await;
        settle(&spinner, path, "Report downloaded")
    }
}

/// Finishes `spinner` with `done` on success and clears it on failure.
fn settle<T>(
    spinner: &Arc<dyn ProgressCallback>,
    result: Result<T, BrowserError>,
    done: &str,
) -> Result<T, BrowserError> {
    match &result {
        Ok(_) => spinner.finish(done.to_owned()),
        Err(_) => spinner.finish_and_clear(),
    }
    result
}

impl EtlSource for EvSalesSource {
    type Raw = PathBuf;
    type Record = LongRecord;

    fn name(&self) -> &str {
        "anl_ev_sales"
    }

    async fn acquire(&self, download_dir: &Path) -> Result<PathBuf, BoxError> {
        let config = SessionConfig::new(download_dir)
            .with_webdriver_url(&self.webdriver_url)
            .with_headless(self.headless);
        let session = WebDriverSession::connect(&config).await?;

        let result = self.download(&session, download_dir).await;

        if let Err(e) = session.quit().await {
            log::warn!("Failed to close browser session: {e}");
        }

        Ok(result?)
    }

    async fn normalize(&self, raw: PathBuf) -> Result<Vec<LongRecord>, BoxError> {
        let extractor = self.extractor.clone();
        let rows = tokio::task::spawn_blocking(move || extractor.extract_file(&raw)).await??;
        log::info!("Extracted {} table row(s)", rows.len());

        Ok(ev_sales_transform::transform(&rows, &self.metadata)?)
    }

    async fn publish(&self, records: Vec<LongRecord>) -> Result<Published, BoxError> {
        let columns = self.metadata.attribute_names();
        let published = match &self.destination {
            Destination::S3(loader) => {
                loader
                    .publish(records, &columns, self.environment)
                    .await?
            }
            Destination::Local(path) => {
                ev_sales_s3::write_local(path, records, &columns, self.environment).await?
            }
        };
        Ok(published)
    }
}
