use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T, E = WeatherError> = std::result::Result<T, E>;

/// Errors surfaced by the OpenWeather client.
#[derive(Debug, Error)]
pub enum WeatherError {
    /// The client was built from an unusable configuration (no API key, bad format pattern).
    #[error(
        "Invalid configuration: {0}.\n\
         Hint: get a free OpenWeather API key at https://openweathermap.org/price"
    )]
    InvalidConfiguration(String),

    /// The request to the provider failed: connection, timeout, redirect loop,
    /// a non-success status or an undecodable body.
    #[error("OpenWeather request to '{endpoint}' failed{}: {message}", status_suffix(.status))]
    Provider {
        endpoint: String,
        status: Option<StatusCode>,
        message: String,
        body: Option<String>,
    },
}

impl WeatherError {
    pub(crate) fn provider(endpoint: &str, message: impl Into<String>) -> Self {
        WeatherError::Provider {
            endpoint: endpoint.to_string(),
            status: None,
            message: message.into(),
            body: None,
        }
    }

    pub(crate) fn status(endpoint: &str, status: StatusCode, body: String) -> Self {
        WeatherError::Provider {
            endpoint: endpoint.to_string(),
            status: Some(status),
            message: truncate_body(&body),
            body: Some(body),
        }
    }

    /// Raw upstream body for provider errors, when the server sent one.
    pub fn body(&self) -> Option<&str> {
        match self {
            WeatherError::Provider { body, .. } => body.as_deref(),
            WeatherError::InvalidConfiguration(_) => None,
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, WeatherError::InvalidConfiguration(_))
    }
}

fn status_suffix(status: &Option<StatusCode>) -> String {
    match status {
        Some(status) => format!(" with status {status}"),
        None => String::new(),
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else if body.is_empty() {
        "Nothing found".to_string()
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_truncates_long_bodies_but_keeps_raw_body() {
        let body = "x".repeat(500);
        let err = WeatherError::status("data/2.5/weather", StatusCode::BAD_GATEWAY, body.clone());

        let msg = err.to_string();
        assert!(msg.contains("with status 502 Bad Gateway"));
        assert!(msg.ends_with("..."));
        assert!(msg.len() < 300);
        assert_eq!(err.body(), Some(body.as_str()));
    }

    #[test]
    fn empty_status_body_reads_nothing_found() {
        let err = WeatherError::status("geo/1.0/direct", StatusCode::NOT_FOUND, String::new());
        assert!(err.to_string().contains("Nothing found"));
    }

    #[test]
    fn configuration_error_has_hint() {
        let err = WeatherError::InvalidConfiguration("API key is empty".into());
        assert!(err.is_configuration());
        assert!(err.to_string().contains("openweathermap.org/price"));
        assert!(err.body().is_none());
    }
}
