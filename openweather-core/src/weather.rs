use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use crate::{
    DEFAULT_ZIP_COUNTRY, Endpoint, HttpTransport, Location, Normalizer, PayloadKind, Query,
    Result, Transport, WeatherConfig,
};

/// Entry point: one method per data kind and location selector.
///
/// Every call makes at most one request; failures come back as
/// [`WeatherError`](crate::WeatherError) and are never retried.
#[derive(Debug)]
pub struct Weather {
    config: WeatherConfig,
    normalizer: Normalizer,
    transport: Box<dyn Transport>,
}

impl Weather {
    /// Build a client talking HTTP to `config.base_url`.
    pub fn new(config: WeatherConfig) -> Result<Self> {
        let transport = HttpTransport::from_config(&config)?;
        Self::with_transport(config, Box::new(transport))
    }

    pub fn with_transport(config: WeatherConfig, transport: Box<dyn Transport>) -> Result<Self> {
        config.validate()?;
        let normalizer = Normalizer::from_config(&config);
        Ok(Self { config, normalizer, transport })
    }

    pub fn config(&self) -> &WeatherConfig {
        &self.config
    }

    pub async fn current_by_city(&self, city: &str) -> Result<Value> {
        self.current(&Location::from_city(city)).await
    }

    pub async fn current_by_coord(&self, lat: f64, lon: f64) -> Result<Value> {
        self.current(&Location::coord(lat, lon)).await
    }

    pub async fn current_by_zip(&self, zip: &str, country: Option<&str>) -> Result<Value> {
        self.current(&Location::zip(zip, country)).await
    }

    /// Just the `main` block (temperature, pressure, humidity) of the current weather.
    pub async fn current_temp_by_city(&self, city: &str) -> Result<Value> {
        let mut current = self.current_by_city(city).await?;
        Ok(current.get_mut("main").map(Value::take).unwrap_or(Value::Null))
    }

    pub async fn current(&self, location: &Location) -> Result<Value> {
        let query = Query::for_location(location);
        self.request(Endpoint::Current, query, Some(PayloadKind::Current)).await
    }

    /// Current, minutely, hourly and daily data in one document.
    pub async fn one_call_by_coord(&self, lat: f64, lon: f64) -> Result<Value> {
        let query = Query::for_location(&Location::coord(lat, lon));
        self.request(Endpoint::OneCall, query, Some(PayloadKind::OneCall)).await
    }

    /// 5 day forecast in 3-hour steps.
    pub async fn three_hourly_by_city(&self, city: &str) -> Result<Value> {
        self.three_hourly(&Location::from_city(city)).await
    }

    pub async fn three_hourly_by_coord(&self, lat: f64, lon: f64) -> Result<Value> {
        self.three_hourly(&Location::coord(lat, lon)).await
    }

    pub async fn three_hourly_by_zip(&self, zip: &str, country: Option<&str>) -> Result<Value> {
        self.three_hourly(&Location::zip(zip, country)).await
    }

    pub async fn three_hourly(&self, location: &Location) -> Result<Value> {
        let query = Query::for_location(location);
        self.request(Endpoint::Forecast, query, Some(PayloadKind::Forecast)).await
    }

    /// Historical weather at `when`. The response shape follows the configured
    /// historical API version.
    pub async fn history_by_coord(&self, lat: f64, lon: f64, when: DateTime<Utc>) -> Result<Value> {
        let query = Query::for_location(&Location::coord(lat, lon)).param("dt", when.timestamp());
        let kind = PayloadKind::historical(&self.config.api_versions.historical);
        self.request(Endpoint::Historical, query, Some(kind)).await
    }

    /// Air pollution for a coordinate. With both `start` and `end` the
    /// historical range is fetched, otherwise current data.
    pub async fn air_pollution_by_coord(
        &self,
        lat: f64,
        lon: f64,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Value> {
        let endpoint = if start.is_some() && end.is_some() {
            Endpoint::AirPollutionHistory
        } else {
            Endpoint::AirPollution
        };

        let query = Query::for_location(&Location::coord(lat, lon))
            .opt_param("start", start.map(|t| t.timestamp()))
            .opt_param("end", end.map(|t| t.timestamp()));

        self.request(endpoint, query, Some(PayloadKind::AirPollution)).await
    }

    /// Hourly air pollution forecast for the next days.
    pub async fn air_pollution_forecast_by_coord(&self, lat: f64, lon: f64) -> Result<Value> {
        let query = Query::for_location(&Location::coord(lat, lon));
        self.request(Endpoint::AirPollutionForecast, query, Some(PayloadKind::AirPollution)).await
    }

    /// Direct geocoding: places matching a name like "London" or "London,GB".
    pub async fn geo_by_city(&self, city: &str, limit: Option<u32>) -> Result<Value> {
        let query = Query::new().param("q", city.trim()).opt_param("limit", nonzero(limit));
        self.request(Endpoint::GeoDirect, query, None).await
    }

    /// Reverse geocoding: place names near a coordinate.
    pub async fn geo_by_coord(&self, lat: f64, lon: f64, limit: Option<u32>) -> Result<Value> {
        let query =
            Query::for_location(&Location::coord(lat, lon)).opt_param("limit", nonzero(limit));
        self.request(Endpoint::GeoReverse, query, None).await
    }

    pub async fn geo_by_zip(&self, zip: &str, country: Option<&str>) -> Result<Value> {
        let country = country.unwrap_or(DEFAULT_ZIP_COUNTRY);
        let query = Query::new().param("zip", format!("{},{}", zip.trim(), country.trim()));
        self.request(Endpoint::GeoZip, query, None).await
    }

    async fn request(
        &self,
        endpoint: Endpoint,
        query: Query,
        kind: Option<PayloadKind>,
    ) -> Result<Value> {
        let path = endpoint.path(&self.config.api_versions);
        let query = query.authorized(&self.config);

        let payload = self.transport.fetch(&path, &query).await?;

        Ok(match kind {
            Some(kind) => {
                debug!(?kind, endpoint = %path, "normalizing response");
                self.normalizer.normalize(kind, &payload)
            }
            None => payload,
        })
    }
}

/// A zero limit means "provider default", like leaving it out.
fn nonzero(limit: Option<u32>) -> Option<u32> {
    limit.filter(|&n| n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TempUnit, WeatherError};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    /// Records requests and replays one canned outcome.
    #[derive(Debug, Clone)]
    struct FakeTransport {
        calls: Arc<Mutex<Vec<(String, Query)>>>,
        response: std::result::Result<Value, String>,
    }

    impl FakeTransport {
        fn ok(response: Value) -> Self {
            Self { calls: Arc::default(), response: Ok(response) }
        }

        fn failing(message: &str) -> Self {
            Self { calls: Arc::default(), response: Err(message.to_string()) }
        }

        fn calls(&self) -> Vec<(String, Query)> {
            self.calls.lock().expect("lock").clone()
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn fetch(&self, endpoint: &str, query: &Query) -> Result<Value> {
            self.calls.lock().expect("lock").push((endpoint.to_string(), query.clone()));
            self.response.clone().map_err(|message| WeatherError::provider(endpoint, message))
        }
    }

    const NOON: i64 = 1_610_193_600;

    fn config() -> WeatherConfig {
        let mut cfg = WeatherConfig::with_api_key("KEY");
        cfg.date_format = "%Y-%m-%d".into();
        cfg.time_format = "%H:%M".into();
        cfg
    }

    fn client(transport: &FakeTransport) -> Weather {
        Weather::with_transport(config(), Box::new(transport.clone())).expect("client")
    }

    #[test]
    fn empty_api_key_fails_before_any_request() {
        let transport = FakeTransport::ok(json!({}));
        let err = Weather::with_transport(WeatherConfig::default(), Box::new(transport.clone()))
            .unwrap_err();

        assert!(err.is_configuration());
        assert!(transport.calls().is_empty());

        assert!(Weather::new(WeatherConfig::default()).unwrap_err().is_configuration());
    }

    #[tokio::test]
    async fn numeric_city_routes_to_id() {
        let transport = FakeTransport::ok(json!({ "timezone": 0, "dt": NOON }));
        let weather = client(&transport);

        weather.current_by_city("12345").await.expect("current");
        weather.current_by_city("London").await.expect("current");

        let calls = transport.calls();
        assert_eq!(calls[0].0, "data/2.5/weather");
        assert_eq!(calls[0].1.get("id"), Some("12345"));
        assert_eq!(calls[0].1.get("q"), None);
        assert_eq!(calls[1].1.get("q"), Some("London"));
        assert_eq!(calls[1].1.get("id"), None);
    }

    #[tokio::test]
    async fn every_request_carries_credentials_units_and_lang() {
        let transport = FakeTransport::ok(json!({}));
        let weather = client(&transport);

        weather.geo_by_city("Dhaka", Some(3)).await.expect("geo");

        let (path, query) = &transport.calls()[0];
        assert_eq!(path, "geo/1.0/direct");
        assert_eq!(query.encode(), "q=Dhaka&limit=3&appid=KEY&units=metric&lang=en");
    }

    #[tokio::test]
    async fn current_is_normalized_with_payload_offset() {
        let transport = FakeTransport::ok(json!({
            "timezone": 3600,
            "dt": NOON,
            "sys": { "sunrise": NOON, "sunset": NOON },
            "main": { "temp": 4.2 },
        }));
        let weather = client(&transport);

        let out = weather.current_by_zip("94040", None).await.expect("current");

        assert_eq!(out["dt"], "2021-01-09 13:00");
        assert_eq!(out["sys"]["sunset"], "2021-01-09 13:00");
        assert_eq!(transport.calls()[0].1.get("country"), Some("us"));
    }

    #[tokio::test]
    async fn current_temp_returns_main_block() {
        let transport = FakeTransport::ok(json!({ "dt": NOON, "main": { "temp": 4.2 } }));
        let main = client(&transport).current_temp_by_city("Oslo").await.expect("temp");
        assert_eq!(main, json!({ "temp": 4.2 }));
    }

    #[tokio::test]
    async fn history_sends_epoch_and_picks_shape_by_version() {
        let when = Utc.with_ymd_and_hms(2021, 1, 9, 12, 0, 0).unwrap();
        let payload = json!({
            "timezone_offset": 0,
            "current": { "dt": NOON, "sunrise": NOON, "sunset": NOON },
            "hourly": [{ "dt": NOON }],
            "data": [{ "dt": NOON, "sunrise": NOON, "sunset": NOON }],
        });

        let transport = FakeTransport::ok(payload.clone());
        let out = client(&transport).history_by_coord(23.7, 90.4, when).await.expect("history");
        assert_eq!(transport.calls()[0].0, "data/2.5/onecall/timemachine");
        assert_eq!(transport.calls()[0].1.get("dt"), Some("1610193600"));
        assert_eq!(out["current"]["dt"], "2021-01-09 12:00");
        assert_eq!(out["data"][0]["dt"], NOON);

        let mut cfg = config();
        cfg.api_versions.historical = "3.0".into();
        let transport = FakeTransport::ok(payload);
        let weather = Weather::with_transport(cfg, Box::new(transport.clone())).expect("client");
        let out = weather.history_by_coord(23.7, 90.4, when).await.expect("history");
        assert_eq!(transport.calls()[0].0, "data/3.0/onecall/timemachine");
        assert_eq!(out["data"][0]["dt"], "2021-01-09 12:00");
        assert_eq!(out["current"]["dt"], NOON);
    }

    #[tokio::test]
    async fn air_pollution_range_uses_history_endpoint() {
        let start = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2021, 1, 2, 0, 0, 0).unwrap();
        let transport = FakeTransport::ok(json!({ "list": [{ "dt": NOON }] }));
        let weather = client(&transport);

        let out = weather.air_pollution_by_coord(1.0, 2.0, Some(start), Some(end)).await.expect("aqi");
        weather.air_pollution_by_coord(1.0, 2.0, None, None).await.expect("aqi");
        weather.air_pollution_forecast_by_coord(1.0, 2.0).await.expect("aqi");

        let calls = transport.calls();
        assert_eq!(calls[0].0, "data/2.5/air_pollution/history");
        assert_eq!(calls[0].1.get("start"), Some("1609459200"));
        assert_eq!(calls[0].1.get("end"), Some("1609545600"));
        assert_eq!(calls[1].0, "data/2.5/air_pollution");
        assert_eq!(calls[1].1.get("start"), None);
        assert_eq!(calls[2].0, "data/2.5/air_pollution/forecast");
        assert_eq!(out["list"][0]["dt"], "2021-01-09 12:00");
    }

    #[tokio::test]
    async fn geocoding_is_returned_as_is() {
        let payload = json!([{ "name": "London", "lat": 51.5, "lon": -0.12, "dt": NOON }]);
        let transport = FakeTransport::ok(payload.clone());
        let weather = client(&transport);

        assert_eq!(weather.geo_by_coord(51.5, -0.12, None).await.expect("geo"), payload);
        weather.geo_by_zip("E14", Some("GB")).await.expect("geo");

        weather.geo_by_city("Dhaka", Some(0)).await.expect("geo");
        weather.geo_by_coord(51.5, -0.12, Some(0)).await.expect("geo");

        let calls = transport.calls();
        assert_eq!(calls[2].1.get("limit"), None);
        assert_eq!(calls[3].1.get("limit"), None);
        assert_eq!(calls[0].0, "geo/1.0/reverse");
        assert_eq!(calls[0].1.get("limit"), None);
        assert_eq!(calls[1].0, "geo/1.0/zip");
        assert_eq!(calls[1].1.get("zip"), Some("E14,GB"));
    }

    #[tokio::test]
    async fn transport_failure_is_a_single_provider_error() {
        let transport = FakeTransport::failing("connection failed");
        let weather = client(&transport);

        let err = weather.three_hourly_by_coord(1.0, 2.0).await.unwrap_err();

        assert!(matches!(err, WeatherError::Provider { .. }));
        assert!(err.to_string().contains("connection failed"));
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn local_conversion_requests_kelvin_and_converts() {
        let mut cfg = config();
        cfg.temp_format = TempUnit::Fahrenheit;
        cfg.local_temperature_conversion = true;

        let transport = FakeTransport::ok(json!({
            "city": { "timezone": 0, "sunrise": NOON, "sunset": NOON },
            "list": [{ "dt": NOON, "main": { "temp": 300.0 } }],
        }));
        let weather = Weather::with_transport(cfg, Box::new(transport.clone())).expect("client");

        let out = weather.three_hourly_by_city("Paris").await.expect("forecast");

        assert_eq!(transport.calls()[0].1.get("units"), Some("standard"));
        assert_eq!(out["list"][0]["main"]["temp"], 80.33);
        assert_eq!(out["list"][0]["dt"], "2021-01-09 12:00");
    }

    #[tokio::test]
    async fn one_call_path_follows_version() {
        let mut cfg = config();
        cfg.api_versions.onecall = "3.0".into();
        let transport = FakeTransport::ok(json!({ "timezone_offset": 0, "current": { "dt": NOON } }));
        let weather = Weather::with_transport(cfg, Box::new(transport.clone())).expect("client");

        let out = weather.one_call_by_coord(1.0, 2.0).await.expect("onecall");

        assert_eq!(transport.calls()[0].0, "data/3.0/onecall");
        assert_eq!(out["current"]["dt"], "2021-01-09 12:00");
    }
}
