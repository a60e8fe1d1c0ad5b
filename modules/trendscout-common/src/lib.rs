pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, DelayRange};
pub use error::TrendScoutError;
pub use types::*;
