use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrendScoutError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Run file not found: {}", .0.display())]
    MissingRunFile(PathBuf),

    #[error("Record store error ({}): {source}", .path.display())]
    Store {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unreadable run file ({}): {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Malformed run file ({}): {reason}", .path.display())]
    MalformedRunFile { path: PathBuf, reason: String },

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Interrupted")]
    Interrupted,
}

impl TrendScoutError {
    /// True when `err` (or anything it wraps) is a user interruption.
    pub fn is_interrupted(err: &anyhow::Error) -> bool {
        err.chain().any(|cause| {
            matches!(
                cause.downcast_ref::<TrendScoutError>(),
                Some(TrendScoutError::Interrupted)
            )
        })
    }
}
