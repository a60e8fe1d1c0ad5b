pub mod error;

pub use error::{Result, WebDriverError};

use std::fmt;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

/// Interval between element lookups while waiting.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

// --- Locators ---

/// How to find elements on the current page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Css(String),
    XPath(String),
    Id(String),
}

impl Locator {
    pub fn css(selector: &str) -> Self {
        Locator::Css(selector.to_string())
    }

    pub fn xpath(expr: &str) -> Self {
        Locator::XPath(expr.to_string())
    }

    pub fn id(id: &str) -> Self {
        Locator::Id(id.to_string())
    }

    /// The selector, expression or id without its strategy.
    pub fn value(&self) -> &str {
        match self {
            Locator::Css(v) | Locator::XPath(v) | Locator::Id(v) => v,
        }
    }

    /// Request body for the Find Elements command. WebDriver has no id
    /// strategy, so ids become attribute selectors.
    fn to_json(&self) -> Value {
        match self {
            Locator::Css(selector) => json!({ "using": "css selector", "value": selector }),
            Locator::XPath(expr) => json!({ "using": "xpath", "value": expr }),
            Locator::Id(id) => json!({
                "using": "css selector",
                "value": format!("[id=\"{}\"]", id.replace('"', "\\\"")),
            }),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(selector) => write!(f, "css `{selector}`"),
            Locator::XPath(expr) => write!(f, "xpath `{expr}`"),
            Locator::Id(id) => write!(f, "id `{id}`"),
        }
    }
}

/// Opaque reference to an element in a live session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementRef(pub String);

/// Element entry keyed by the W3C web element identifier.
#[derive(Deserialize)]
struct ElementValue {
    #[serde(rename = "element-6066-11e4-a52e-4f735466cecf")]
    id: String,
}

// --- Capabilities ---

/// Chrome launch options sent as `goog:chromeOptions`.
#[derive(Debug, Clone, Default)]
pub struct ChromeOptions {
    pub args: Vec<String>,
    pub exclude_switches: Vec<String>,
    pub use_automation_extension: Option<bool>,
}

impl ChromeOptions {
    /// Options that hide the usual automation markers from the page.
    pub fn stealth(window_size: (u32, u32), headless: bool) -> Self {
        let mut args = vec![
            format!("--window-size={},{}", window_size.0, window_size.1),
            "--disable-blink-features=AutomationControlled".to_string(),
        ];
        if headless {
            args.push("--headless=new".to_string());
        }
        Self {
            args,
            exclude_switches: vec!["enable-automation".to_string()],
            use_automation_extension: Some(false),
        }
    }

    fn to_capabilities(&self) -> Value {
        let mut chrome = json!({ "args": self.args });
        if !self.exclude_switches.is_empty() {
            chrome["excludeSwitches"] = json!(self.exclude_switches);
        }
        if let Some(enabled) = self.use_automation_extension {
            chrome["useAutomationExtension"] = json!(enabled);
        }
        json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": chrome,
                }
            }
        })
    }
}

// --- Client ---

#[derive(Deserialize)]
struct Envelope<T> {
    value: T,
}

#[derive(Deserialize)]
struct ErrorValue {
    #[serde(default)]
    error: String,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct NewSessionValue {
    #[serde(rename = "sessionId")]
    session_id: String,
}

pub struct WebDriverClient {
    client: reqwest::Client,
    base_url: String,
}

impl WebDriverClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Start a browser. The returned session must be closed with [`Session::quit`].
    pub async fn new_session(&self, options: &ChromeOptions) -> Result<Session> {
        let endpoint = format!("{}/session", self.base_url);
        let resp = self
            .client
            .post(&endpoint)
            .json(&options.to_capabilities())
            .send()
            .await?;

        let created: NewSessionValue = read_value(resp).await?;
        debug!(session_id = created.session_id.as_str(), "WebDriver session created");

        Ok(Session {
            client: self.client.clone(),
            url: format!("{}/session/{}", self.base_url, created.session_id),
            id: created.session_id,
        })
    }
}

async fn read_value<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    let body = resp.text().await?;

    if !status.is_success() {
        let (error, message) = match serde_json::from_str::<Envelope<ErrorValue>>(&body) {
            Ok(env) => (env.value.error, env.value.message),
            Err(_) => (String::from("unknown error"), body),
        };
        return Err(WebDriverError::Api {
            status: status.as_u16(),
            error,
            message,
        });
    }

    let envelope: Envelope<T> = serde_json::from_str(&body)?;
    Ok(envelope.value)
}

// --- Session ---

pub struct Session {
    client: reqwest::Client,
    url: String,
    id: String,
}

impl Session {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn navigate(&self, url: &str) -> Result<()> {
        let resp = self
            .client
            .post(format!("{}/url", self.url))
            .json(&json!({ "url": url }))
            .send()
            .await?;
        read_value::<Value>(resp).await?;
        Ok(())
    }

    /// All elements currently matching `locator`. Empty when nothing matches.
    pub async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementRef>> {
        let resp = self
            .client
            .post(format!("{}/elements", self.url))
            .json(&locator.to_json())
            .send()
            .await?;
        let found: Vec<ElementValue> = read_value(resp).await?;
        Ok(found.into_iter().map(|e| ElementRef(e.id)).collect())
    }

    /// Poll until at least one element matches `locator` or `timeout` elapses.
    pub async fn wait_for(&self, locator: &Locator, timeout: Duration) -> Result<Vec<ElementRef>> {
        let started = Instant::now();
        loop {
            match self.find_elements(locator).await {
                Ok(found) if !found.is_empty() => return Ok(found),
                Ok(_) => {}
                Err(e) if e.is_no_such_element() => {}
                Err(e) => return Err(e),
            }

            if started.elapsed() >= timeout {
                return Err(WebDriverError::Timeout {
                    locator: locator.to_string(),
                    waited_ms: started.elapsed().as_millis(),
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    pub async fn click(&self, element: &ElementRef) -> Result<()> {
        let resp = self
            .client
            .post(format!("{}/element/{}/click", self.url, element.0))
            .json(&json!({}))
            .send()
            .await?;
        read_value::<Value>(resp).await?;
        Ok(())
    }

    /// Rendered text of an element.
    pub async fn text(&self, element: &ElementRef) -> Result<String> {
        let resp = self
            .client
            .get(format!("{}/element/{}/text", self.url, element.0))
            .send()
            .await?;
        read_value(resp).await
    }

    /// Close the browser. Failures are logged, the session is unusable either way.
    pub async fn quit(&self) {
        let result = match self.client.delete(&self.url).send().await {
            Ok(resp) => read_value::<Value>(resp).await.map(|_| ()),
            Err(e) => Err(e.into()),
        };
        match result {
            Ok(()) => debug!(session_id = self.id.as_str(), "WebDriver session closed"),
            Err(e) => warn!(
                session_id = self.id.as_str(),
                error = %e,
                "Failed to close WebDriver session"
            ),
        }
    }
}
