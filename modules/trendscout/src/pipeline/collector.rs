//! Stage one: sample the trending page until the time budget or name cap runs out.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, warn};
use webdriver_client::Locator;

use crate::classify::normalize;
use crate::scheduling::{pause, DelayPolicy, Interrupt};
use crate::traits::{BrowserSession, TrendSource};

use super::stats::CollectStats;

/// Trending-name links on the Google Trends TV board.
pub const TREND_ITEM_SELECTOR: &str = "div.NJfIwe a.vcW2ic[jsname='thYVgf']";

#[derive(Debug, Clone, Copy)]
pub struct CollectLimits {
    pub max_duration: Duration,
    pub max_count: usize,
}

/// Reads trend items from an already-open page.
pub struct TrendsPage<'a> {
    session: &'a dyn BrowserSession,
    locator: Locator,
    wait: Duration,
}

impl<'a> TrendsPage<'a> {
    pub fn new(session: &'a dyn BrowserSession, wait: Duration) -> Self {
        Self {
            session,
            locator: Locator::css(TREND_ITEM_SELECTOR),
            wait,
        }
    }
}

#[async_trait]
impl TrendSource for TrendsPage<'_> {
    async fn poll(&self) -> Result<Vec<String>> {
        let items = self.session.wait_for(&self.locator, self.wait).await?;
        let mut texts = Vec::with_capacity(items.len());
        for item in &items {
            let text = self.session.text(item).await?;
            if !text.trim().is_empty() {
                texts.push(text);
            }
        }
        Ok(texts)
    }
}

/// Poll `source` until `limits` are reached, a poll fails, or the run is
/// interrupted. Always returns what was gathered so far.
pub async fn collect(
    source: &dyn TrendSource,
    limits: CollectLimits,
    delay: &dyn DelayPolicy,
    interrupt: &Interrupt,
) -> (BTreeSet<String>, CollectStats) {
    let started = Instant::now();
    let mut names = BTreeSet::new();
    let mut stats = CollectStats::default();

    while started.elapsed() < limits.max_duration && names.len() < limits.max_count {
        let polled = tokio::select! {
            r = source.poll() => Some(r),
            _ = interrupt.triggered() => None,
        };
        let Some(polled) = polled else {
            stats.interrupted = true;
            break;
        };

        match polled {
            Ok(batch) => {
                stats.polls += 1;
                stats.fragments_seen += batch.len() as u32;
                for raw in batch {
                    if names.len() >= limits.max_count {
                        break;
                    }
                    let name = normalize(&raw);
                    if !name.is_empty() {
                        names.insert(name);
                    }
                }
                info!(polls = stats.polls, names = names.len(), "Trend poll complete");
            }
            Err(e) => {
                stats.poll_failed = true;
                warn!(error = %e, names = names.len(), "Trend poll failed, stopping collection");
                break;
            }
        }

        if names.len() >= limits.max_count || started.elapsed() >= limits.max_duration {
            break;
        }
        if !pause(delay, interrupt).await {
            stats.interrupted = true;
            break;
        }
    }

    stats.names_collected = names.len() as u32;
    stats.elapsed = started.elapsed();
    (names, stats)
}
