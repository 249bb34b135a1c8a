use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::model::WeatherSnapshot;

use super::{FetchError, WeatherSource};

const DEFAULT_BASE_URL: &str =
    "https://weather.visualcrossing.com/VisualCrossingWebServices/rest/services/timeline";

/// Client for the Visual Crossing timeline API.
#[derive(Debug, Clone)]
pub struct VisualCrossingClient {
    api_key: String,
    base_url: String,
    http: Client,
}

impl VisualCrossingClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string())
    }

    /// Point the client at a different endpoint, e.g. a local test server.
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            api_key,
            base_url,
            http: Client::new(),
        }
    }
}

/// Error payload sometimes returned alongside non-2xx statuses.
#[derive(Debug, Deserialize)]
struct TimelineErrorBody {
    message: Option<String>,
}

#[async_trait]
impl WeatherSource for VisualCrossingClient {
    async fn fetch(&self, location: &str) -> Result<WeatherSnapshot, FetchError> {
        let url = format!("{}/{}", self.base_url, urlencoding::encode(location));

        tracing::debug!(location, "requesting timeline weather");

        let res = self
            .http
            .get(&url)
            .query(&[
                ("unitGroup", "us"),
                ("key", self.api_key.as_str()),
                ("contentType", "json"),
            ])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            let detail = serde_json::from_str::<TimelineErrorBody>(&body)
                .ok()
                .and_then(|err| err.message)
                .unwrap_or_else(|| truncate_body(&body));
            return Err(FetchError::Status { status, detail });
        }

        let snapshot = serde_json::from_str(&body)?;
        Ok(snapshot)
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        format!("{}...", &body[..MAX])
    } else {
        body.to_string()
    }
}
