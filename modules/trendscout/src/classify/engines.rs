//! Entity-recognition engines the classifier can consult.
//!
//! Each engine answers with a [`Recognition`] value instead of an error so the
//! classifier can tell "no person found" apart from "engine could not answer".
//! Engines are optional: an empty [`RecognitionEngines`] is a valid setup.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use trendscout_common::AppConfig;

/// One recognized span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub label: String,
    pub start: Option<usize>,
    pub end: Option<usize>,
}

impl Entity {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            start: None,
            end: None,
        }
    }

    /// `PERSON` (spaCy), `PER` (grouped transformer output) or `B-PER`/`I-PER`
    /// (per-token transformer output).
    pub fn is_person(&self) -> bool {
        let label = self.label.as_str();
        label == "PERSON"
            || label == "PER"
            || label.strip_suffix("-PER").is_some_and(|prefix| prefix.len() == 1)
    }
}

/// Outcome of asking one engine about one text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recognition {
    Entities(Vec<Entity>),
    /// Engine not reachable or still loading its model.
    Unavailable,
    /// Engine answered with something unusable.
    Failed(String),
}

#[async_trait]
pub trait EntityRecognizer: Send + Sync {
    fn name(&self) -> &str;
    async fn recognize(&self, text: &str) -> Recognition;
}

/// Engines in the order the classifier consults them. Built once at startup,
/// read-only afterwards.
#[derive(Clone, Default)]
pub struct RecognitionEngines {
    engines: Vec<Arc<dyn EntityRecognizer>>,
}

impl RecognitionEngines {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(engines: Vec<Arc<dyn EntityRecognizer>>) -> Self {
        Self { engines }
    }

    /// Statistical engine first, transformer second; each only if configured.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let mut engines: Vec<Arc<dyn EntityRecognizer>> = Vec::new();
        if let Some(url) = &config.spacy_ner_url {
            engines.push(Arc::new(SpacyEngine::new(url, config.ner_api_token.as_deref())?));
        }
        if let Some(url) = &config.transformer_ner_url {
            engines.push(Arc::new(TransformerEngine::new(
                url,
                config.ner_api_token.as_deref(),
            )?));
        }
        if engines.is_empty() {
            info!("No entity-recognition engines configured; using name patterns only");
        } else {
            let names: Vec<&str> = engines.iter().map(|e| e.name()).collect();
            info!(engines = ?names, "Entity-recognition engines configured");
        }
        Ok(Self { engines })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn EntityRecognizer>> {
        self.engines.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }
}

// --- HTTP plumbing shared by both engines ---

fn http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(20))
        .build()
}

async fn post_json(
    client: &reqwest::Client,
    url: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> Result<String, Recognition> {
    let mut req = client.post(url).json(&body);
    if let Some(token) = token {
        req = req.bearer_auth(token);
    }

    let resp = match req.send().await {
        Ok(resp) => resp,
        Err(e) if e.is_connect() || e.is_timeout() => return Err(Recognition::Unavailable),
        Err(e) => return Err(Recognition::Failed(e.to_string())),
    };

    let status = resp.status();
    // Hosted inference answers 503 while the model is loading.
    if status == reqwest::StatusCode::SERVICE_UNAVAILABLE {
        return Err(Recognition::Unavailable);
    }
    let body = resp
        .text()
        .await
        .map_err(|e| Recognition::Failed(e.to_string()))?;
    if !status.is_success() {
        return Err(Recognition::Failed(format!("status {}: {body}", status.as_u16())));
    }
    Ok(body)
}

// --- Statistical (spaCy-style) engine ---

#[derive(Debug, Deserialize)]
struct SpacyResponse {
    #[serde(default)]
    ents: Vec<SpacyEntity>,
}

#[derive(Debug, Deserialize)]
struct SpacyEntity {
    label: String,
    start: Option<usize>,
    end: Option<usize>,
}

/// Talks to a spaCy REST service: `POST {"text": ...}` → `{"ents": [{label, start, end}]}`.
pub struct SpacyEngine {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl SpacyEngine {
    pub fn new(url: &str, token: Option<&str>) -> anyhow::Result<Self> {
        Ok(Self {
            client: http_client()?,
            url: url.to_string(),
            token: token.map(String::from),
        })
    }
}

#[async_trait]
impl EntityRecognizer for SpacyEngine {
    fn name(&self) -> &str {
        "spacy"
    }

    async fn recognize(&self, text: &str) -> Recognition {
        let body = match post_json(
            &self.client,
            &self.url,
            self.token.as_deref(),
            serde_json::json!({ "text": text }),
        )
        .await
        {
            Ok(body) => body,
            Err(outcome) => return outcome,
        };
        parse_spacy(&body)
    }
}

fn parse_spacy(body: &str) -> Recognition {
    match serde_json::from_str::<SpacyResponse>(body) {
        Ok(resp) => Recognition::Entities(
            resp.ents
                .into_iter()
                .map(|e| Entity {
                    label: e.label,
                    start: e.start,
                    end: e.end,
                })
                .collect(),
        ),
        Err(e) => Recognition::Failed(format!("unparseable spaCy response: {e}")),
    }
}

// --- Transformer (token-classification) engine ---

/// Token-classification output comes in two shapes depending on the
/// aggregation strategy: grouped spans carry `entity_group`, raw tokens carry
/// `entity`. Both are accepted.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TransformerEntity {
    Grouped {
        entity_group: String,
        start: Option<usize>,
        end: Option<usize>,
    },
    Token {
        entity: String,
        start: Option<usize>,
        end: Option<usize>,
    },
}

impl From<TransformerEntity> for Entity {
    fn from(raw: TransformerEntity) -> Self {
        match raw {
            TransformerEntity::Grouped {
                entity_group,
                start,
                end,
            } => Entity {
                label: entity_group,
                start,
                end,
            },
            TransformerEntity::Token { entity, start, end } => Entity {
                label: entity,
                start,
                end,
            },
        }
    }
}

/// Talks to a HuggingFace-style inference endpoint: `POST {"inputs": ...}`.
pub struct TransformerEngine {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl TransformerEngine {
    pub fn new(url: &str, token: Option<&str>) -> anyhow::Result<Self> {
        Ok(Self {
            client: http_client()?,
            url: url.to_string(),
            token: token.map(String::from),
        })
    }
}

#[async_trait]
impl EntityRecognizer for TransformerEngine {
    fn name(&self) -> &str {
        "transformer"
    }

    async fn recognize(&self, text: &str) -> Recognition {
        let body = match post_json(
            &self.client,
            &self.url,
            self.token.as_deref(),
            serde_json::json!({ "inputs": text }),
        )
        .await
        {
            Ok(body) => body,
            Err(outcome) => return outcome,
        };
        parse_transformer(&body)
    }
}

fn parse_transformer(body: &str) -> Recognition {
    // `null` means the pipeline produced nothing.
    match serde_json::from_str::<Option<Vec<TransformerEntity>>>(body) {
        Ok(entities) => Recognition::Entities(
            entities
                .unwrap_or_default()
                .into_iter()
                .map(Entity::from)
                .collect(),
        ),
        Err(e) => Recognition::Failed(format!("unparseable transformer response: {e}")),
    }
}
