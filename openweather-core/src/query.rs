use url::form_urlencoded;

use crate::{Location, WeatherConfig};

/// Ordered query parameters for one provider request.
///
/// Location fields come first, then call extras, then `appid`, `units` and `lang`.
/// Mutual exclusivity of location fields is the caller's job; `Location` gives
/// that for free.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    params: Vec<(String, String)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_location(location: &Location) -> Self {
        let mut query = Self::new();
        for (name, value) in location.query_pairs() {
            query = query.param(name, value);
        }
        query
    }

    pub fn param(mut self, name: &str, value: impl ToString) -> Self {
        self.params.push((name.to_string(), value.to_string()));
        self
    }

    /// Adds the parameter only when a value is present.
    pub fn opt_param<T: ToString>(self, name: &str, value: Option<T>) -> Self {
        match value {
            Some(value) => self.param(name, value),
            None => self,
        }
    }

    /// Appends credentials, unit system and language from the configuration.
    pub fn authorized(self, config: &WeatherConfig) -> Self {
        self.param("appid", &config.api_key)
            .param("units", config.request_unit_system())
            .param("lang", &config.lang)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.params.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.params
    }

    /// URL-encoded form of the parameters, in insertion order.
    pub fn encode(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.params.iter())
            .finish()
    }

    /// Encoded form with the API key masked, for logging.
    pub fn redacted(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.params.iter().map(|(name, value)| {
                if name == "appid" { (name.as_str(), "***") } else { (name.as_str(), value.as_str()) }
            }))
            .finish()
    }
}
