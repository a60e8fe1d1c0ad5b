use thiserror::Error;

pub type Result<T> = std::result::Result<T, WebDriverError>;

#[derive(Debug, Error)]
pub enum WebDriverError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("WebDriver error (status {status}) {error}: {message}")]
    Api {
        status: u16,
        error: String,
        message: String,
    },

    #[error("Unexpected WebDriver response: {0}")]
    Protocol(String),

    #[error("Timed out after {waited_ms}ms waiting for {locator}")]
    Timeout { locator: String, waited_ms: u128 },
}

impl WebDriverError {
    /// True when the remote end reported that a locator matched nothing.
    pub fn is_no_such_element(&self) -> bool {
        matches!(self, WebDriverError::Api { error, .. } if error == "no such element")
    }
}

impl From<reqwest::Error> for WebDriverError {
    fn from(err: reqwest::Error) -> Self {
        WebDriverError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for WebDriverError {
    fn from(err: serde_json::Error) -> Self {
        WebDriverError::Protocol(err.to_string())
    }
}
