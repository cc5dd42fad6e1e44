#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Browser automation for acquiring the monthly sales report.
//!
//! The report PDF is only reachable by clicking an anchor on the landing
//! page, so acquisition drives a real browser over `WebDriver`:
//!
//! - [`navigator`] loads the page (reloading until the anchor shows up),
//!   scrolls to the anchor and clicks it.
//! - [`download`] polls the download directory until the browser has
//!   finished writing exactly one file.
//! - [`wait`] holds the shared deadline / backoff / cancellation policy for
//!   both loops.
//! - [`webdriver`] is the [`fantoccini`]-backed [`PageDriver`].
//!
//! Browser operations go through the [`PageDriver`] trait so the navigation
//! logic can be exercised without a browser.

pub mod download;
pub mod navigator;
pub mod wait;
pub mod webdriver;

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

/// Errors that can occur while driving the browser or waiting on a
/// download.
#[derive(Debug, thiserror::Error)]
pub enum BrowserError {
    /// A `WebDriver` command failed.
    #[error("WebDriver command failed: {0}")]
    WebDriver(#[from] fantoccini::error::CmdError),

    /// The `WebDriver` session could not be created.
    #[error("Failed to start WebDriver session: {0}")]
    Session(#[from] fantoccini::error::NewSessionError),

    /// The download directory does not exist.
    #[error("Download path does not exist: {}", path.display())]
    MissingPath {
        /// The directory that was expected to exist.
        path: PathBuf,
    },

    /// More than one completed file appeared in the download directory.
    #[error("Expected exactly one downloaded file in {}, found {}: {files:?}", dir.display(), files.len())]
    AmbiguousDownload {
        /// The download directory.
        dir: PathBuf,
        /// Names of every completed entry found.
        files: Vec<String>,
    },

    /// The wait policy's deadline or attempt limit was exceeded.
    #[error("Gave up waiting for {what} after {attempts} attempt(s)")]
    TimedOut {
        /// What was being waited for.
        what: String,
        /// Number of attempts made.
        attempts: u32,
    },

    /// The operation was cancelled.
    #[error("Cancelled while waiting for {what}")]
    Cancelled {
        /// What was being waited for.
        what: String,
    },

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Building a JSON script argument failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The browser operations needed to reach the report PDF.
///
/// Implemented by [`webdriver::WebDriverSession`] for real runs and by
/// in-memory fakes in tests.
pub trait PageDriver: Send + Sync {
    /// Navigates the current tab to `url`.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError`] if navigation fails.
    fn goto(&self, url: &str) -> impl Future<Output = Result<(), BrowserError>> + Send;

    /// Reloads the current page.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError`] if the reload command fails.
    fn refresh(&self) -> impl Future<Output = Result<(), BrowserError>> + Send;

    /// Waits up to `timeout` for an element matching `xpath` to be present.
    ///
    /// Returns `Ok(false)` on timeout; errors are reserved for driver
    /// failures.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError`] if the driver command fails for a reason
    /// other than the element not appearing in time.
    fn wait_for_xpath(
        &self,
        xpath: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<bool, BrowserError>> + Send;

    /// Runs `script` with the element matching `xpath` bound to
    /// `arguments[0]`, waiting up to `timeout` for the element.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError`] if the element never appears or the script
    /// fails.
    fn run_on_xpath(
        &self,
        xpath: &str,
        script: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<(), BrowserError>> + Send;

    /// Returns the current document location.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError`] if the driver command fails.
    fn current_url(&self) -> impl Future<Output = Result<String, BrowserError>> + Send;
}
