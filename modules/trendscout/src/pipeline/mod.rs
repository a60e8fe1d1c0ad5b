pub mod collector;
pub mod enrichment;
pub mod resolver;
pub mod stats;

pub use collector::{collect, CollectLimits, TrendsPage};
pub use enrichment::Enricher;
pub use resolver::{parse_result_count, BrowserMetricResolver};
pub use stats::{CollectStats, EnrichStats};
