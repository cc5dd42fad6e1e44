//! [`fantoccini`]-backed [`PageDriver`].
//!
//! Connects to a running `WebDriver` server (chromedriver, Selenium Grid)
//! and configures Chrome to save PDFs straight into the download
//! directory instead of opening them in the built-in viewer.

use std::path::{Path, PathBuf};
use std::time::Duration;

use fantoccini::error::CmdError;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::json;

use crate::{BrowserError, PageDriver};

/// Default `WebDriver` endpoint (chromedriver's default port).
pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:4444";

/// Options for starting a browser session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// `WebDriver` server URL.
    pub webdriver_url: String,
    /// Directory where the browser saves downloads.
    pub download_dir: PathBuf,
    /// Whether to run Chrome without a window.
    pub headless: bool,
}

impl SessionConfig {
    /// Creates a config for `download_dir` using the default endpoint.
    #[must_use]
    pub fn new(download_dir: &Path) -> Self {
        Self {
            webdriver_url: DEFAULT_WEBDRIVER_URL.to_owned(),
            download_dir: download_dir.to_path_buf(),
            headless: false,
        }
    }

    /// Sets the `WebDriver` server URL.
    #[must_use]
    pub fn with_webdriver_url(mut self, url: &str) -> Self {
        url.clone_into(&mut self.webdriver_url);
        self
    }

    /// Runs Chrome headless.
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Builds the `goog:chromeOptions` capability for this config.
    #[must_use]
    pub fn capabilities(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut args = vec!["--no-sandbox", "--disable-dev-shm-usage"];
        if self.headless {
            args.push("--headless=new");
        }

        let chrome_options = json!({
            "args": args,
            "prefs": {
                "download.default_directory": self.download_dir.display().to_string(),
                "download.prompt_for_download": false,
                "download.directory_upgrade": true,
                "plugins.always_open_pdf_externally": true,
            },
        });

        let mut caps = serde_json::Map::new();
        caps.insert("browserName".to_owned(), json!("chrome"));
        caps.insert("goog:chromeOptions".to_owned(), chrome_options);
        caps
    }
}

/// A live browser session.
///
/// Call [`quit`](Self::quit) when done; the remote browser is not closed
/// on drop.
pub struct WebDriverSession {
    client: Client,
}

impl WebDriverSession {
    /// Starts a new session against `config.webdriver_url`.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError::Session`] if the server refuses the session.
    pub async fn connect(config: &SessionConfig) -> Result<Self, BrowserError> {
        log::info!(
            "Starting browser session via {} (downloads -> {})",
            config.webdriver_url,
            config.download_dir.display()
        );

        let client = ClientBuilder::native()
            .capabilities(config.capabilities())
            .connect(&config.webdriver_url)
            .await?;

        Ok(Self { client })
    }

    /// Closes the browser.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError::WebDriver`] if the close command fails.
    pub async fn quit(self) -> Result<(), BrowserError> {
        self.client.close().await?;
        log::info!("Browser session closed");
        Ok(())
    }
}

impl PageDriver for WebDriverSession {
    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        self.client.goto(url).await?;
        Ok(())
    }

    async fn refresh(&self) -> Result<(), BrowserError> {
        self.client.refresh().await?;
        Ok(())
    }

    async fn wait_for_xpath(&self, xpath: &str, timeout: Duration) -> Result<bool, BrowserError> {
        match self
            .client
            .wait()
            .at_most(timeout)
            .for_element(Locator::XPath(xpath))
            .await
        {
            Ok(_) => Ok(true),
            Err(CmdError::WaitTimeout) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn run_on_xpath(
        &self,
        xpath: &str,
        script: &str,
        timeout: Duration,
    ) -> Result<(), BrowserError> {
        let element = self
            .client
            .wait()
            .at_most(timeout)
            .for_element(Locator::XPath(xpath))
            .await?;
        let arg = serde_json::to_value(&element)?;
        self.client.execute(script, vec![arg]).await?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, BrowserError> {
        Ok(self.client.current_url().await?.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capabilities_route_pdfs_to_download_dir() {
        let config = SessionConfig::new(Path::new("/tmp/ev_sales"));
        let caps = config.capabilities();
        let prefs = &caps["goog:chromeOptions"]["prefs"];

        assert_eq!(prefs["download.default_directory"], "/tmp/ev_sales");
        assert_eq!(prefs["download.prompt_for_download"], false);
        assert_eq!(prefs["download.directory_upgrade"], true);
        assert_eq!(prefs["plugins.always_open_pdf_externally"], true);
    }

    #[test]
    fn headless_adds_flag() {
        let windowed = SessionConfig::new(Path::new("/tmp/x"));
        let headless = windowed.clone().with_headless(true);

        let has_flag = |c: &SessionConfig| {
            c.capabilities()["goog:chromeOptions"]["args"]
                .as_array()
                .unwrap()
                .iter()
                .any(|a| a == "--headless=new")
        };
        assert!(!has_flag(&windowed));
        assert!(has_flag(&headless));
    }
}
