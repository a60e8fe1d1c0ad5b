//! The two stages of a run and the orchestrator that chains them.
//!
//! `TrendScout` holds a `ScoutDeps` container and builds per-stage resources
//! (trend page, resolver, record store) from it on each invocation.

pub mod collect;
pub mod enrich;
pub mod full_run;

use std::sync::Arc;
use std::time::Duration;

use typed_builder::TypedBuilder;

use trendscout_common::AppConfig;

use crate::classify::PersonClassifier;
use crate::scheduling::{DelayPolicy, Interrupt, RandomDelay};
use crate::traits::BrowserLauncher;

/// Shared dependency container for both stages. Delay policies default to
/// the configured random ranges; tests swap in zero delays.
#[derive(Clone, TypedBuilder)]
pub struct ScoutDeps {
    pub config: AppConfig,
    /// Browser for the trends board.
    pub launcher: Arc<dyn BrowserLauncher>,
    /// Browser for result-count lookups; shares the trends browser unless set.
    #[builder(default = launcher.clone())]
    pub search_launcher: Arc<dyn BrowserLauncher>,
    pub classifier: Arc<PersonClassifier>,
    #[builder(default = Interrupt::never())]
    pub interrupt: Interrupt,
    #[builder(default = Arc::new(RandomDelay::new(config.poll_delay)) as Arc<dyn DelayPolicy>)]
    pub poll_delay: Arc<dyn DelayPolicy>,
    #[builder(default = Arc::new(RandomDelay::new(config.settle_delay)) as Arc<dyn DelayPolicy>)]
    pub settle_delay: Arc<dyn DelayPolicy>,
    #[builder(default = Arc::new(RandomDelay::new(config.query_delay)) as Arc<dyn DelayPolicy>)]
    pub query_delay: Arc<dyn DelayPolicy>,
    #[builder(default = config.stage_pause)]
    pub stage_pause: Duration,
}

pub struct TrendScout {
    deps: ScoutDeps,
}

impl TrendScout {
    pub fn new(deps: ScoutDeps) -> Self {
        Self { deps }
    }
}
