use crate::config::ApiVersions;

/// Provider endpoints, relative to the base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// https://openweathermap.org/current
    Current,
    /// https://openweathermap.org/api/one-call-api
    OneCall,
    /// https://openweathermap.org/forecast5
    Forecast,
    /// https://openweathermap.org/api/one-call-api#history
    Historical,
    /// https://openweathermap.org/api/air-pollution
    AirPollution,
    AirPollutionForecast,
    AirPollutionHistory,
    /// https://openweathermap.org/api/geocoding-api
    GeoDirect,
    GeoReverse,
    GeoZip,
}

impl Endpoint {
    pub fn path(&self, versions: &ApiVersions) -> String {
        match self {
            Endpoint::Current => format!("data/{}/weather", versions.weather),
            Endpoint::OneCall => format!("data/{}/onecall", versions.onecall),
            Endpoint::Forecast => format!("data/{}/forecast", versions.forecast),
            Endpoint::Historical => format!("data/{}/onecall/timemachine", versions.historical),
            Endpoint::AirPollution => format!("data/{}/air_pollution", versions.pollution),
            Endpoint::AirPollutionForecast => {
                format!("data/{}/air_pollution/forecast", versions.pollution)
            }
            Endpoint::AirPollutionHistory => {
                format!("data/{}/air_pollution/history", versions.pollution)
            }
            Endpoint::GeoDirect => format!("geo/{}/direct", versions.geo),
            Endpoint::GeoReverse => format!("geo/{}/reverse", versions.geo),
            Endpoint::GeoZip => format!("geo/{}/zip", versions.geo),
        }
    }
}
