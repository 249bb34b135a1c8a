use crate::model::WeatherSnapshot;
use async_trait::async_trait;
use std::fmt::Debug;
use thiserror::Error;

pub mod visualcrossing;

/// Failure of a single remote lookup attempt.
///
/// Variants keep the real cause for logging; callers surface
/// [`FetchError::user_message`] instead.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to reach the weather service: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("weather service returned {status}: {detail}")]
    Status {
        status: reqwest::StatusCode,
        detail: String,
    },

    #[error("unreadable weather service response: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl FetchError {
    /// The one message shown to users. Every failure collapses to the same
    /// copy, whatever the underlying cause.
    pub fn user_message(&self) -> &'static str {
        "City not found. Please check the spelling and try again."
    }
}

/// A remote source of weather snapshots.
///
/// One outbound request per call, no retries.
#[async_trait]
pub trait WeatherSource: Send + Sync + Debug {
    async fn fetch(&self, location: &str) -> Result<WeatherSnapshot, FetchError>;
}
