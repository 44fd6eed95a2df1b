use serde::{Deserialize, Serialize};
use std::convert::TryFrom;

use crate::WeatherError;

const KELVIN_OFFSET: f64 = 273.15;

/// Temperature unit preference, stored in configuration as `c`, `f` or `k`.
///
/// For temperature in Fahrenheit and wind speed in miles/hour the provider
/// expects `units=imperial`, for Celsius and meter/sec `units=metric`.
/// Kelvin is the provider default (`units=standard`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TempUnit {
    #[default]
    #[serde(rename = "c")]
    Celsius,
    #[serde(rename = "f")]
    Fahrenheit,
    #[serde(rename = "k")]
    Kelvin,
}

impl TempUnit {
    pub fn code(&self) -> &'static str {
        match self {
            TempUnit::Celsius => "c",
            TempUnit::Fahrenheit => "f",
            TempUnit::Kelvin => "k",
        }
    }

    /// Unit system name understood by the provider's `units` parameter.
    pub fn unit_system(&self) -> &'static str {
        match self {
            TempUnit::Celsius => "metric",
            TempUnit::Fahrenheit => "imperial",
            TempUnit::Kelvin => "standard",
        }
    }

    pub const fn all() -> &'static [TempUnit] {
        &[TempUnit::Celsius, TempUnit::Fahrenheit, TempUnit::Kelvin]
    }

    /// Convert a Kelvin reading into this unit, rounded to 2 decimals.
    pub fn from_kelvin(&self, kelvin: f64) -> f64 {
        let value = match self {
            TempUnit::Celsius => kelvin - KELVIN_OFFSET,
            TempUnit::Fahrenheit => (kelvin - KELVIN_OFFSET) * 9.0 / 5.0 + 32.0,
            TempUnit::Kelvin => kelvin,
        };
        round2(value)
    }
}

impl std::fmt::Display for TempUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl TryFrom<&str> for TempUnit {
    type Error = WeatherError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_lowercase().as_str() {
            "c" | "metric" => Ok(TempUnit::Celsius),
            "f" | "imperial" => Ok(TempUnit::Fahrenheit),
            "k" | "standard" => Ok(TempUnit::Kelvin),
            _ => Err(WeatherError::InvalidConfiguration(format!(
                "unknown temperature unit '{value}', expected one of c, f, k"
            ))),
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kelvin_conversion_rounds_to_two_decimals() {
        assert_eq!(TempUnit::Celsius.from_kelvin(300.0), 26.85);
        assert_eq!(TempUnit::Fahrenheit.from_kelvin(300.0), 80.33);
        assert_eq!(TempUnit::Kelvin.from_kelvin(300.0), 300.0);
        assert_eq!(TempUnit::Celsius.from_kelvin(273.15), 0.0);
    }

    #[test]
    fn unit_codes_map_to_provider_systems() {
        assert_eq!(TempUnit::Celsius.unit_system(), "metric");
        assert_eq!(TempUnit::Fahrenheit.unit_system(), "imperial");
        assert_eq!(TempUnit::Kelvin.unit_system(), "standard");
    }

    #[test]
    fn code_roundtrip() {
        for unit in TempUnit::all() {
            let parsed = TempUnit::try_from(unit.code()).expect("roundtrip should succeed");
            assert_eq!(*unit, parsed);
        }
    }

    #[test]
    fn unknown_unit_is_configuration_error() {
        let err = TempUnit::try_from("x").unwrap_err();
        assert!(err.is_configuration());
    }
}
