// Trait seams for everything the pipeline touches outside the process.
//
// BrowserLauncher/BrowserSession wrap the WebDriver client.
// TrendSource yields raw fragments for the collector.
// MetricResolver turns a search link into a result count.
// RecordStore owns the run file.
//
// Each has a mock in `testing` so the stages run without a browser or disk.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use trendscout_common::{Record, SearchResults, TrendScoutError};
use webdriver_client::{ChromeOptions, ElementRef, Locator, Session, WebDriverClient};

// ---------------------------------------------------------------------------
// Browser
// ---------------------------------------------------------------------------

#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Wait until `locator` matches at least one element, or fail after `timeout`.
    async fn wait_for(&self, locator: &Locator, timeout: Duration) -> Result<Vec<ElementRef>>;

    async fn click(&self, element: &ElementRef) -> Result<()>;

    async fn text(&self, element: &ElementRef) -> Result<String>;

    /// Close the browser. Never fails; problems are logged.
    async fn release(&self);
}

#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>>;
}

#[async_trait]
impl BrowserSession for Session {
    async fn navigate(&self, url: &str) -> Result<()> {
        Ok(Session::navigate(self, url).await?)
    }

    async fn wait_for(&self, locator: &Locator, timeout: Duration) -> Result<Vec<ElementRef>> {
        Ok(Session::wait_for(self, locator, timeout).await?)
    }

    async fn click(&self, element: &ElementRef) -> Result<()> {
        Ok(Session::click(self, element).await?)
    }

    async fn text(&self, element: &ElementRef) -> Result<String> {
        Ok(Session::text(self, element).await?)
    }

    async fn release(&self) {
        self.quit().await;
    }
}

/// Starts Chrome sessions through a WebDriver endpoint.
pub struct WebDriverLauncher {
    client: WebDriverClient,
    options: ChromeOptions,
}

impl WebDriverLauncher {
    pub fn new(webdriver_url: &str, options: ChromeOptions) -> Result<Self> {
        info!(webdriver_url, "Using WebDriverLauncher");
        let client = WebDriverClient::new(webdriver_url)
            .map_err(|e| TrendScoutError::Browser(e.to_string()))?;
        Ok(Self { client, options })
    }
}

#[async_trait]
impl BrowserLauncher for WebDriverLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
        let session = self
            .client
            .new_session(&self.options)
            .await
            .map_err(|e| TrendScoutError::Browser(e.to_string()))?;
        info!(session_id = session.id(), "Browser session started");
        Ok(Box::new(session))
    }
}

// ---------------------------------------------------------------------------
// Pipeline collaborators
// ---------------------------------------------------------------------------

/// One poll of the trending page.
#[async_trait]
pub trait TrendSource: Send + Sync {
    async fn poll(&self) -> Result<Vec<String>>;
}

/// Never fails: unresolvable links come back as `SearchResults::NotAvailable`.
#[async_trait]
pub trait MetricResolver: Send + Sync {
    async fn resolve(&self, link: &str) -> SearchResults;
}

/// The persisted table of one run. Row order is preserved across read/write.
pub trait RecordStore: Send + Sync {
    fn read_all(&self) -> Result<Vec<Record>, TrendScoutError>;
    fn write_all(&self, records: &[Record]) -> Result<(), TrendScoutError>;
}
