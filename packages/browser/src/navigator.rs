//! Landing-page navigation.
//!
//! Loads the report's landing page, reloading until the download anchor is
//! present, then scrolls to the anchor and clicks it with script execution
//! rather than simulated pointer events (overlays on the page intercept
//! real clicks). The resulting location is the PDF link.

use std::sync::Arc;

use ev_sales_models::progress::ProgressCallback;

use crate::wait::WaitPolicy;
use crate::{BrowserError, PageDriver};

/// Landing page for the monthly light-duty electric drive vehicle sales
/// report.
pub const REPORT_PAGE_URL: &str = "https://www.anl.gov/esia/reference/light-duty-electric-drive-vehicles-monthly-sales-updates-historical-data";

/// Location of the "historical data" download anchor on the landing page.
pub const DOWNLOAD_LINK_XPATH: &str =
    "/html/body/div[2]/div/div[2]/div[2]/div[2]/main/div[1]/div/div/div/a";

const SCROLL_INTO_VIEW: &str = "arguments[0].scrollIntoView(true);";
const CLICK: &str = "arguments[0].click();";

/// Where to go and what to click.
#[derive(Debug, Clone)]
pub struct NavigationTarget {
    /// Landing page URL.
    pub url: String,
    /// `XPath` of the anchor that leads to the PDF.
    pub link_xpath: String,
}

impl Default for NavigationTarget {
    fn default() -> Self {
        Self {
            url: REPORT_PAGE_URL.to_owned(),
            link_xpath: DOWNLOAD_LINK_XPATH.to_owned(),
        }
    }
}

/// Loads `target.url`, waits for the anchor (reloading as `policy`
/// allows), clicks it, and returns the resulting document location.
///
/// # Errors
///
/// Returns [`BrowserError::TimedOut`] or [`BrowserError::Cancelled`] if the
/// anchor never appears within the policy, or any driver error.
pub async fn locate_pdf_url<D: PageDriver>(
    driver: &D,
    target: &NavigationTarget,
    policy: &WaitPolicy,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<String, BrowserError> {
    const WHAT: &str = "the download link";

    log::info!("Loading {}", target.url);
    driver.goto(&target.url).await?;

    let mut attempt: u32 = 1;
    loop {
        policy.check(WHAT, attempt)?;

        let present = policy
            .cancellable(
                WHAT,
                driver.wait_for_xpath(&target.link_xpath, policy.attempt_budget()),
            )
            .await?;
        if present {
            break;
        }

        log::info!("Page did not load properly (attempt {attempt}). Reloading...");
        progress.inc(1);
        progress.set_message(format!("Waiting for landing page (attempt {attempt})"));

        policy.pause(WHAT, attempt).await?;
        policy.check(WHAT, attempt + 1)?;
        driver.refresh().await?;
        attempt += 1;
    }

    log::debug!("Download link present after {attempt} attempt(s)");

    driver
        .run_on_xpath(&target.link_xpath, SCROLL_INTO_VIEW, policy.attempt_budget())
        .await?;
    driver
        .run_on_xpath(&target.link_xpath, CLICK, policy.attempt_budget())
        .await?;

    let url = driver.current_url().await?;
    log::info!("Download link resolved to {url}");
    Ok(url)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use ev_sales_models::progress::null_progress;

    use super::*;

    /// Scripted driver: the link appears after `misses` failed waits.
    struct FakeDriver {
        misses: Mutex<u32>,
        log: Mutex<Vec<String>>,
        timeouts: Mutex<Vec<Duration>>,
    }

    impl FakeDriver {
        fn new(misses: u32) -> Self {
            Self {
                misses: Mutex::new(misses),
                log: Mutex::new(Vec::new()),
                timeouts: Mutex::new(Vec::new()),
            }
        }

        fn record(&self, entry: impl Into<String>) {
            self.log.lock().unwrap().push(entry.into());
        }

        fn calls(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    impl PageDriver for FakeDriver {
        async fn goto(&self, url: &str) -> Result<(), BrowserError> {
            self.record(format!("goto {url}"));
            Ok(())
        }

        async fn refresh(&self) -> Result<(), BrowserError> {
            self.record("refresh");
            Ok(())
        }

        async fn wait_for_xpath(&self, _xpath: &str, timeout: Duration) -> Result<bool, BrowserError> {
            self.timeouts.lock().unwrap().push(timeout);
            let mut misses = self.misses.lock().unwrap();
            if *misses == 0 {
                return Ok(true);
            }
            *misses -= 1;
            Ok(false)
        }

        async fn run_on_xpath(
            &self,
            _xpath: &str,
            script: &str,
            _timeout: Duration,
        ) -> Result<(), BrowserError> {
            self.record(format!("script {script}"));
            Ok(())
        }

        async fn current_url(&self) -> Result<String, BrowserError> {
            Ok("https://example.com/report.pdf".to_owned())
        }
    }

    fn target() -> NavigationTarget {
        NavigationTarget {
            url: "https://example.com/landing".to_owned(),
            link_xpath: "//a".to_owned(),
        }
    }

    fn fast_policy() -> WaitPolicy {
        WaitPolicy::default().with_interval(Duration::ZERO)
    }

    #[tokio::test]
    async fn clicks_link_when_present_immediately() {
        let driver = FakeDriver::new(0);
        let url = locate_pdf_url(&driver, &target(), &fast_policy(), &null_progress())
            .await
            .unwrap();

        assert_eq!(url, "https://example.com/report.pdf");
        assert_eq!(
            driver.calls(),
            vec![
                "goto https://example.com/landing".to_owned(),
                format!("script {SCROLL_INTO_VIEW}"),
                format!("script {CLICK}"),
            ]
        );
    }

    #[tokio::test]
    async fn reloads_until_link_appears() {
        let driver = FakeDriver::new(3);
        locate_pdf_url(&driver, &target(), &fast_policy(), &null_progress())
            .await
            .unwrap();

        let refreshes = driver.calls().iter().filter(|c| *c == "refresh").count();
        assert_eq!(refreshes, 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let driver = FakeDriver::new(u32::MAX);
        let policy = fast_policy().with_max_attempts(4);

        let err = locate_pdf_url(&driver, &target(), &policy, &null_progress())
            .await
            .unwrap_err();

        assert!(matches!(err, BrowserError::TimedOut { attempts: 4, .. }));
        let refreshes = driver.calls().iter().filter(|c| *c == "refresh").count();
        assert_eq!(refreshes, 3);
    }

    #[tokio::test]
    async fn stops_when_cancelled() {
        let driver = FakeDriver::new(u32::MAX);
        let policy = fast_policy();
        policy.cancel.cancel();

        let err = locate_pdf_url(&driver, &target(), &policy, &null_progress())
            .await
            .unwrap_err();

        assert!(matches!(err, BrowserError::Cancelled { .. }));
        assert!(!driver.calls().iter().any(|c| c.starts_with("script")));
    }

    #[tokio::test(start_paused = true)]
    async fn element_wait_never_outlives_the_deadline() {
        let driver = FakeDriver::new(0);
        let policy = fast_policy()
            .with_attempt_timeout(Duration::from_secs(10))
            .with_timeout(Duration::from_secs(3));

        locate_pdf_url(&driver, &target(), &policy, &null_progress())
            .await
            .unwrap();

        assert_eq!(
            *driver.timeouts.lock().unwrap(),
            vec![Duration::from_secs(3)]
        );
    }
}
