//! Stage two: fill in the search-result count for every row of a run file.
//!
//! The store is rewritten after each row so an interrupted or crashed run
//! loses at most the row in flight. Rows that already hold a terminal value
//! are skipped, which makes re-running the stage on the same file a resume.

use tracing::info;

use trendscout_common::{SearchResults, TrendScoutError};

use crate::scheduling::{pause, DelayPolicy, Interrupt};
use crate::traits::{MetricResolver, RecordStore};

use super::stats::EnrichStats;

pub struct Enricher<'a> {
    resolver: &'a dyn MetricResolver,
    delay: &'a dyn DelayPolicy,
    interrupt: Interrupt,
}

impl<'a> Enricher<'a> {
    pub fn new(
        resolver: &'a dyn MetricResolver,
        delay: &'a dyn DelayPolicy,
        interrupt: Interrupt,
    ) -> Self {
        Self {
            resolver,
            delay,
            interrupt,
        }
    }

    /// Visit every row in order. Only a store failure or an interrupt ends
    /// the stage early; per-row lookup trouble is recorded as `N/A`.
    pub async fn enrich(&self, store: &dyn RecordStore) -> Result<EnrichStats, TrendScoutError> {
        let mut records = store.read_all()?;
        let total = records.len();
        let mut stats = EnrichStats {
            rows: total as u32,
            ..Default::default()
        };
        info!(rows = total, "Starting enrichment");

        for idx in 0..total {
            if self.interrupt.is_triggered() {
                return Err(TrendScoutError::Interrupted);
            }
            let progress = format!("{}/{}", idx + 1, total);
            let record = &records[idx];

            if record.is_processed() {
                stats.already_processed += 1;
                info!(
                    progress = %progress,
                    name = record.name.as_str(),
                    "Already processed"
                );
                continue;
            }

            if !record.is_person {
                records[idx].search_results = Some(SearchResults::NotAPerson);
                store.write_all(&records)?;
                stats.not_a_person += 1;
                info!(
                    progress = %progress,
                    name = records[idx].name.as_str(),
                    "Not a person, skipped"
                );
                continue;
            }

            info!(
                progress = %progress,
                name = record.name.as_str(),
                "Resolving result count"
            );
            let link = record.link.clone();
            // The resolver watches the interrupt itself and must finish so its
            // session gets released. The row in flight is left as it was on disk.
            let resolved = self.resolver.resolve(&link).await;
            if self.interrupt.is_triggered() {
                return Err(TrendScoutError::Interrupted);
            }

            match &resolved {
                SearchResults::Count(_) => stats.resolved += 1,
                _ => stats.not_available += 1,
            }
            info!(
                progress = %progress,
                name = records[idx].name.as_str(),
                results = %resolved,
                "Row updated"
            );
            records[idx].search_results = Some(resolved);
            store.write_all(&records)?;

            let more_queries = records[idx + 1..]
                .iter()
                .any(|r| r.is_person && !r.is_processed());
            if more_queries && !pause(self.delay, &self.interrupt).await {
                return Err(TrendScoutError::Interrupted);
            }
        }

        info!(
            resolved = stats.resolved,
            not_available = stats.not_available,
            "All names processed"
        );
        Ok(stats)
    }
}
