use anyhow::Result;
use tracing::info;

use trendscout_common::TrendScoutError;

use crate::pipeline::EnrichStats;
use crate::scheduling::{pause, FixedDelay};

use super::TrendScout;

impl TrendScout {
    /// Stage one, a short pause, then stage two on the file stage one wrote.
    /// Stage two is skipped when stage one collected nothing.
    pub async fn run(&self) -> Result<Option<EnrichStats>> {
        let Some(path) = self.stage_one().await? else {
            info!("Stage 2 skipped: no run file produced");
            return Ok(None);
        };

        info!(secs = self.deps.stage_pause.as_secs(), "Pausing before stage 2");
        if !pause(&FixedDelay(self.deps.stage_pause), &self.deps.interrupt).await {
            return Err(TrendScoutError::Interrupted.into());
        }

        let stats = self.stage_two(&path).await?;
        Ok(Some(stats))
    }
}
