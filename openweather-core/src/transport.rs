use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;
use std::{error::Error as _, fmt::Debug, time::Duration};
use tracing::{debug, warn};

use crate::{Query, Result, WeatherConfig, WeatherError};

/// Fixed per-request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Issues one GET per call against the provider. No retries.
#[async_trait]
pub trait Transport: Send + Sync + Debug {
    async fn fetch(&self, endpoint: &str, query: &Query) -> Result<Value>;
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: Url,
    http: Client,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = parse_base_url(base_url)?;
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| WeatherError::provider(base_url.as_str(), describe(e)))?;

        Ok(Self { base_url, http })
    }

    pub fn from_config(config: &WeatherConfig) -> Result<Self> {
        Self::new(&config.base_url)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url_for(&self, endpoint: &str, query: &Query) -> Result<Url> {
        let mut url = self
            .base_url
            .join(endpoint)
            .map_err(|e| WeatherError::provider(endpoint, format!("invalid endpoint path: {e}")))?;
        url.set_query(Some(&query.encode()));
        Ok(url)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, endpoint: &str, query: &Query) -> Result<Value> {
        let url = self.url_for(endpoint, query)?;
        debug!(endpoint, query = %query.redacted(), "sending OpenWeather request");

        let res = self.http.get(url).send().await.map_err(|e| {
            let err = WeatherError::provider(endpoint, describe(e));
            warn!(endpoint, error = %err, "OpenWeather request failed");
            err
        })?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| WeatherError::provider(endpoint, describe(e)))?;

        if !status.is_success() {
            warn!(endpoint, %status, "OpenWeather returned an error status");
            return Err(WeatherError::status(endpoint, status, body));
        }

        serde_json::from_str(&body).map_err(|e| WeatherError::Provider {
            endpoint: endpoint.to_string(),
            status: Some(status),
            message: format!("Failed to parse OpenWeather JSON: {e}"),
            body: Some(body),
        })
    }
}

fn parse_base_url(base_url: &str) -> Result<Url> {
    // `Url::join` replaces the last segment unless the base ends with a slash.
    let normalized = if base_url.ends_with('/') {
        base_url.to_string()
    } else {
        format!("{base_url}/")
    };

    Url::parse(&normalized).map_err(|e| {
        WeatherError::InvalidConfiguration(format!("invalid base url '{base_url}': {e}"))
    })
}

/// Human-readable failure without the request URL, which carries the API key.
fn describe(err: reqwest::Error) -> String {
    let kind = if err.is_timeout() {
        format!("request timed out after {}s", REQUEST_TIMEOUT.as_secs())
    } else if err.is_redirect() {
        "too many redirects".to_string()
    } else if err.is_connect() {
        "connection failed".to_string()
    } else if err.is_body() || err.is_decode() {
        "failed to read response body".to_string()
    } else {
        "request failed".to_string()
    };

    let err = err.without_url();
    match err.source() {
        Some(source) => format!("{kind}: {source}"),
        None => format!("{kind}: {err}"),
    }
}
