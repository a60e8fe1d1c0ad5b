//! Stage one: sample the trends board, classify each name, write a new run file.

use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;
use tracing::{info, warn};

use trendscout_common::{Record, TrendScoutError};

use crate::pipeline::{collect, CollectLimits, CollectStats, TrendsPage};
use crate::store::{run_file_name, CsvRecordStore};
use crate::traits::{BrowserSession, RecordStore};

use super::TrendScout;

impl TrendScout {
    /// Returns the path of the new run file, or `None` when nothing was collected.
    pub async fn stage_one(&self) -> Result<Option<PathBuf>> {
        let deps = &self.deps;
        info!(url = deps.config.trends_url.as_str(), "Stage 1: collecting trending names");

        let session = deps
            .launcher
            .launch()
            .await
            .context("Failed to start browser for trend collection")?;
        let sampled = tokio::select! {
            r = self.sample_trends(session.as_ref()) => Some(r),
            _ = deps.interrupt.triggered() => None,
        };
        session.release().await;

        let (names, mut stats) = match sampled {
            Some(r) => r?,
            None => return Err(TrendScoutError::Interrupted.into()),
        };
        if stats.interrupted {
            return Err(TrendScoutError::Interrupted.into());
        }
        if names.is_empty() {
            info!("No names collected");
            info!("{stats}");
            return Ok(None);
        }

        let records = self.classify_names(names, &mut stats).await;
        if deps.interrupt.is_triggered() {
            return Err(TrendScoutError::Interrupted.into());
        }

        std::fs::create_dir_all(&deps.config.output_dir).map_err(|source| {
            TrendScoutError::Store {
                path: deps.config.output_dir.clone(),
                source,
            }
        })?;
        let path = deps.config.output_dir.join(run_file_name(&Local::now()));
        CsvRecordStore::new(&path).write_all(&records)?;

        info!("{stats}");
        info!("{}", deps.classifier.stats());
        info!(path = %path.display(), rows = records.len(), "Run file written");
        Ok(Some(path))
    }

    async fn sample_trends(
        &self,
        session: &dyn BrowserSession,
    ) -> Result<(BTreeSet<String>, CollectStats)> {
        let config = &self.deps.config;
        session
            .navigate(&config.trends_url)
            .await
            .context("Failed to open trends page")?;

        let page = TrendsPage::new(session, config.poll_wait);
        let limits = CollectLimits {
            max_duration: config.collect_timeout,
            max_count: config.max_names,
        };
        Ok(collect(&page, limits, self.deps.poll_delay.as_ref(), &self.deps.interrupt).await)
    }

    /// One record per name. A name that cannot be turned into a record is
    /// logged and left out; the rest still make it into the file.
    async fn classify_names(
        &self,
        names: BTreeSet<String>,
        stats: &mut CollectStats,
    ) -> Vec<Record> {
        let mut records = Vec::with_capacity(names.len());
        for name in names {
            if self.deps.interrupt.is_triggered() {
                break;
            }
            let is_person = self.deps.classifier.is_person(&name).await;
            match Record::new(&name, is_person) {
                Ok(record) => {
                    if is_person {
                        stats.people += 1;
                    }
                    records.push(record);
                }
                Err(e) => {
                    stats.rows_skipped += 1;
                    warn!(name = name.as_str(), error = %e, "Skipping name");
                }
            }
        }
        records
    }
}
