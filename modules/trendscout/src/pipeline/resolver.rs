//! Result-count lookup for one search link.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use tracing::{info, warn};
use webdriver_client::Locator;

use trendscout_common::{SearchResults, TrendScoutError};

use crate::scheduling::{pause, DelayPolicy, Interrupt};
use crate::traits::{BrowserLauncher, BrowserSession, MetricResolver};

/// The result-refinement control, in English or Arabic UI.
pub const TOOLS_XPATH: &str = "//div[text()='Tools' or text()='الأدوات']";

pub const RESULT_STATS_ID: &str = "result-stats";

const MAX_ERROR_CHARS: usize = 100;

static RESULT_COUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"About ([\d,]+)").expect("valid regex"));

/// First `About 1,234` run in the stats text, commas stripped. No match is 0.
/// Counts too large for `u64` saturate.
pub fn parse_result_count(stats_text: &str) -> u64 {
    let Some(caps) = RESULT_COUNT.captures(stats_text) else {
        return 0;
    };
    let digits: String = caps[1].chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return 0;
    }
    digits.parse().unwrap_or(u64::MAX)
}

/// Cut an error message down to `MAX_ERROR_CHARS` characters for logging.
pub fn truncate_error(message: &str) -> String {
    match message.char_indices().nth(MAX_ERROR_CHARS) {
        Some((idx, _)) => format!("{}...", &message[..idx]),
        None => message.to_string(),
    }
}

/// Opens a fresh browser session per link and reads the result-stats line.
pub struct BrowserMetricResolver {
    launcher: Arc<dyn BrowserLauncher>,
    settle: Arc<dyn DelayPolicy>,
    element_wait: Duration,
    interrupt: Interrupt,
}

impl BrowserMetricResolver {
    pub fn new(
        launcher: Arc<dyn BrowserLauncher>,
        settle: Arc<dyn DelayPolicy>,
        element_wait: Duration,
        interrupt: Interrupt,
    ) -> Self {
        Self {
            launcher,
            settle,
            element_wait,
            interrupt,
        }
    }

    async fn read_count(&self, session: &dyn BrowserSession, link: &str) -> Result<u64> {
        session.navigate(link).await.context("open search link")?;

        let tools = session
            .wait_for(&Locator::xpath(TOOLS_XPATH), self.element_wait)
            .await
            .context("Tools control never appeared")?;
        let first = tools.first().context("Tools control missing")?;
        session.click(first).await.context("click Tools")?;

        if !pause(self.settle.as_ref(), &self.interrupt).await {
            return Err(TrendScoutError::Interrupted.into());
        }

        let stats = session
            .wait_for(&Locator::id(RESULT_STATS_ID), self.element_wait)
            .await
            .context("result stats never appeared")?;
        let first = stats.first().context("result stats missing")?;
        let text = session.text(first).await.context("read result stats")?;
        Ok(parse_result_count(&text))
    }
}

#[async_trait]
impl MetricResolver for BrowserMetricResolver {
    async fn resolve(&self, link: &str) -> SearchResults {
        let session = match self.launcher.launch().await {
            Ok(session) => session,
            Err(e) => {
                warn!(link, error = %truncate_error(&format!("{e:#}")), "Browser launch failed");
                return SearchResults::NotAvailable;
            }
        };

        let outcome = tokio::select! {
            r = self.read_count(session.as_ref(), link) => Some(r),
            _ = self.interrupt.triggered() => None,
        };
        session.release().await;

        match outcome {
            Some(Ok(count)) => {
                info!(link, count, "Result count resolved");
                SearchResults::Count(count)
            }
            Some(Err(e)) => {
                warn!(link, error = %truncate_error(&format!("{e:#}")), "Result count unavailable");
                SearchResults::NotAvailable
            }
            None => SearchResults::NotAvailable,
        }
    }
}
