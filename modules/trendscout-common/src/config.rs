use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::TrendScoutError;

const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";
const DEFAULT_TRENDS_URL: &str = "https://trends.google.com/tv/?geo=US&rows=5&cols=5";

/// Application configuration loaded from environment variables.
/// Every value has a default except the optional NER endpoints.
#[derive(Debug, Clone)]
pub struct AppConfig {
    // Browser
    pub webdriver_url: String,
    pub headless: bool,

    // Stage one
    pub trends_url: String,
    pub collect_timeout: Duration,
    pub max_names: usize,
    pub poll_wait: Duration,
    pub poll_delay: DelayRange,

    // Stage two
    pub element_wait: Duration,
    pub settle_delay: DelayRange,
    pub query_delay: DelayRange,
    pub stage_pause: Duration,

    // Output
    pub output_dir: PathBuf,

    // Entity recognition
    pub spacy_ner_url: Option<String>,
    pub transformer_ner_url: Option<String>,
    pub ner_api_token: Option<String>,
}

impl AppConfig {
    /// Load configuration from the process environment (and `.env` if present).
    pub fn from_env() -> Result<Self, TrendScoutError> {
        dotenvy::dotenv().ok();

        let config = Self::from_lookup(|key| env::var(key).ok())?;
        config.log_keys();
        Ok(config)
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, TrendScoutError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            webdriver_url: var("WEBDRIVER_URL")
                .unwrap_or_else(|| DEFAULT_WEBDRIVER_URL.to_string()),
            headless: parsed(&var, "HEADLESS", false)?,
            trends_url: var("TRENDS_URL").unwrap_or_else(|| DEFAULT_TRENDS_URL.to_string()),
            collect_timeout: Duration::from_secs(parsed(&var, "COLLECT_TIMEOUT_SECS", 30)?),
            max_names: parsed(&var, "MAX_NAMES", 25)?,
            poll_wait: Duration::from_secs(parsed(&var, "POLL_WAIT_SECS", 10)?),
            poll_delay: parsed(&var, "POLL_DELAY_SECS", DelayRange::secs(2, 4))?,
            element_wait: Duration::from_secs(parsed(&var, "ELEMENT_WAIT_SECS", 15)?),
            settle_delay: parsed(&var, "SETTLE_DELAY_SECS", DelayRange::secs(2, 4))?,
            query_delay: parsed(&var, "QUERY_DELAY_SECS", DelayRange::secs(5, 15))?,
            stage_pause: Duration::from_secs(parsed(&var, "STAGE_PAUSE_SECS", 10)?),
            output_dir: var("OUTPUT_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from(".")),
            spacy_ner_url: var("SPACY_NER_URL"),
            transformer_ner_url: var("TRANSFORMER_NER_URL"),
            ner_api_token: var("NER_API_TOKEN"),
        })
    }

    fn log_keys(&self) {
        fn show_opt(val: &Option<String>) -> &str {
            val.as_deref().unwrap_or("<not set>")
        }

        tracing::info!("Config loaded:");
        tracing::info!("  WEBDRIVER_URL: {}", self.webdriver_url);
        tracing::info!("  TRENDS_URL: {}", self.trends_url);
        tracing::info!("  OUTPUT_DIR: {}", self.output_dir.display());
        tracing::info!(
            "  Collection: {} names / {}s",
            self.max_names,
            self.collect_timeout.as_secs()
        );
        tracing::info!("  Query delay: {}", self.query_delay);
        tracing::info!("  SPACY_NER_URL: {}", show_opt(&self.spacy_ner_url));
        tracing::info!("  TRANSFORMER_NER_URL: {}", show_opt(&self.transformer_ner_url));
        tracing::info!(
            "  NER_API_TOKEN: {}",
            self.ner_api_token
                .as_deref()
                .map(preview)
                .unwrap_or_else(|| "<not set>".to_string())
        );
    }
}

/// First five characters of a secret plus its length in characters.
fn preview(val: &str) -> String {
    let n = val.char_indices().nth(5).map_or(val.len(), |(i, _)| i);
    format!("{}...({} chars)", &val[..n], val.chars().count())
}

fn parsed<T, F>(var: &F, key: &str, default: T) -> Result<T, TrendScoutError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| TrendScoutError::Config(format!("{key}={raw}: {e}"))),
        None => Ok(default),
    }
}

// --- DelayRange ---

/// Inclusive range for randomized pauses, written `5-15` or `3` in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    pub min: Duration,
    pub max: Duration,
}

impl DelayRange {
    pub const fn secs(min: u64, max: u64) -> Self {
        Self {
            min: Duration::from_secs(min),
            max: Duration::from_secs(max),
        }
    }
}

impl FromStr for DelayRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |part: &str| {
            part.trim()
                .parse::<u64>()
                .map_err(|e| format!("invalid seconds `{part}`: {e}"))
        };
        let (min, max) = match s.split_once('-') {
            Some((lo, hi)) => (parse(lo)?, parse(hi)?),
            None => {
                let n = parse(s)?;
                (n, n)
            }
        };
        if min > max {
            return Err(format!("range start {min} is after end {max}"));
        }
        Ok(Self::secs(min, max))
    }
}

impl std::fmt::Display for DelayRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}s", self.min.as_secs(), self.max.as_secs())
    }
}
