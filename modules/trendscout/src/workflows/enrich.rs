use std::path::Path;

use anyhow::Result;
use tracing::info;

use trendscout_common::TrendScoutError;

use crate::pipeline::{BrowserMetricResolver, EnrichStats, Enricher};
use crate::store::CsvRecordStore;

use super::TrendScout;

impl TrendScout {
    /// Stage two over an existing run file. Rows already holding a final
    /// value are left alone, so this also resumes an interrupted run.
    pub async fn stage_two(&self, path: &Path) -> Result<EnrichStats> {
        let deps = &self.deps;
        if !path.is_file() {
            return Err(TrendScoutError::MissingRunFile(path.to_path_buf()).into());
        }
        info!(path = %path.display(), "Stage 2: resolving search result counts");

        let store = CsvRecordStore::new(path);
        let resolver = BrowserMetricResolver::new(
            deps.search_launcher.clone(),
            deps.settle_delay.clone(),
            deps.config.element_wait,
            deps.interrupt.clone(),
        );
        let stats = Enricher::new(&resolver, deps.query_delay.as_ref(), deps.interrupt.clone())
            .enrich(&store)
            .await?;

        info!("{stats}");
        info!(path = %path.display(), "Results saved");
        Ok(stats)
    }
}
