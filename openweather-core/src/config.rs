use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf};

use crate::{Normalizer, TempUnit, WeatherError};

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/";

pub const ENV_API_KEY: &str = "OPENWEATHER_API_KEY";
pub const ENV_LANG: &str = "OPENWEATHER_LANG";
pub const ENV_UNITS: &str = "OPENWEATHER_UNITS";

/// Provider API version per endpoint family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiVersions {
    pub weather: String,
    pub onecall: String,
    pub forecast: String,
    pub historical: String,
    pub pollution: String,
    pub geo: String,
}

impl Default for ApiVersions {
    fn default() -> Self {
        Self {
            weather: "2.5".into(),
            onecall: "2.5".into(),
            forecast: "2.5".into(),
            historical: "2.5".into(),
            pollution: "2.5".into(),
            geo: "1.0".into(),
        }
    }
}

/// Client configuration, stored on disk as TOML.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// lang = "en"
/// temp_format = "c"
/// date_format = "%m/%d/%Y"
/// time_format = "%I:%M %p"
///
/// [api_versions]
/// historical = "3.0"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub api_key: String,

    /// Language code passed as `lang`, e.g. "en", "de", "bn".
    pub lang: String,

    /// chrono strftime pattern for the date part of formatted timestamps.
    pub date_format: String,

    /// chrono strftime pattern for the time part of formatted timestamps.
    pub time_format: String,

    pub temp_format: TempUnit,

    /// When set, temperatures are requested in Kelvin and converted locally
    /// into `temp_format`.
    pub local_temperature_conversion: bool,

    pub base_url: String,

    pub api_versions: ApiVersions,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            lang: "en".into(),
            date_format: "%m/%d/%Y".into(),
            time_format: "%I:%M %p".into(),
            temp_format: TempUnit::default(),
            local_temperature_conversion: false,
            base_url: DEFAULT_BASE_URL.into(),
            api_versions: ApiVersions::default(),
        }
    }
}

impl WeatherConfig {
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self { api_key: api_key.into(), ..Self::default() }
    }

    /// Combined display pattern: date format, a space, time format.
    pub fn datetime_format(&self) -> String {
        format!("{} {}", self.date_format, self.time_format)
    }

    /// Unit system actually sent to the provider.
    pub fn request_unit_system(&self) -> &'static str {
        if self.local_temperature_conversion {
            TempUnit::Kelvin.unit_system()
        } else {
            self.temp_format.unit_system()
        }
    }

    /// Checks everything the client needs before any request is made.
    pub fn validate(&self) -> Result<(), WeatherError> {
        if self.api_key.trim().is_empty() {
            return Err(WeatherError::InvalidConfiguration("API key is empty".into()));
        }

        let pattern = self.datetime_format();
        if !Normalizer::new(pattern.as_str()).can_render() {
            return Err(WeatherError::InvalidConfiguration(format!(
                "invalid date/time format '{pattern}'"
            )));
        }

        if url::Url::parse(&self.base_url).is_err() {
            return Err(WeatherError::InvalidConfiguration(format!(
                "invalid base url '{}'",
                self.base_url
            )));
        }

        Ok(())
    }

    /// Apply `OPENWEATHER_*` overrides from the given lookup.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(ENV_API_KEY).filter(|v| !v.trim().is_empty()) {
            self.api_key = key;
        }
        if let Some(lang) = lookup(ENV_LANG).filter(|v| !v.trim().is_empty()) {
            self.lang = lang;
        }
        if let Some(units) = lookup(ENV_UNITS) {
            self.temp_format = TempUnit::try_from(units.as_str())
                .with_context(|| format!("Invalid {ENV_UNITS} value"))?;
        }
        Ok(self)
    }

    /// Load config from the platform config dir (or defaults if it doesn't exist yet),
    /// then apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        Self::load_from(&path)?.with_env_overrides(|name| std::env::var(name).ok())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: WeatherConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;
        self.save_to(&path)
    }

    /// Save config to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "openweather", "openweather-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_fails_validation_without_api_key() {
        let err = WeatherConfig::default().validate().unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("API key is empty"));

        let blank = WeatherConfig::with_api_key("   ");
        assert!(blank.validate().is_err());
    }

    #[test]
    fn invalid_format_pattern_is_rejected() {
        let mut cfg = WeatherConfig::with_api_key("KEY");
        cfg.time_format = "%Q".into();

        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("invalid date/time format"));
    }

    #[test]
    fn offset_pattern_passes_validation() {
        let mut cfg = WeatherConfig::with_api_key("KEY");
        cfg.time_format = "%H:%M %z".into();
        assert!(cfg.validate().is_ok());

        let payload = serde_json::json!({ "timezone": 3600, "dt": 1_610_193_600 });
        let out = Normalizer::from_config(&cfg).normalize(crate::PayloadKind::Current, &payload);
        assert_eq!(out["dt"], "01/09/2021 13:00 +0100");
    }

    #[test]
    fn datetime_format_joins_date_and_time() {
        let cfg = WeatherConfig::with_api_key("KEY");
        assert_eq!(cfg.datetime_format(), "%m/%d/%Y %I:%M %p");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn local_conversion_requests_kelvin() {
        let mut cfg = WeatherConfig::with_api_key("KEY");
        cfg.temp_format = TempUnit::Fahrenheit;
        assert_eq!(cfg.request_unit_system(), "imperial");

        cfg.local_temperature_conversion = true;
        assert_eq!(cfg.request_unit_system(), "standard");
    }

    #[test]
    fn env_overrides_replace_values() {
        let env: HashMap<&str, &str> =
            HashMap::from([(ENV_API_KEY, "ENV_KEY"), (ENV_UNITS, "f"), (ENV_LANG, "")]);

        let cfg = WeatherConfig::with_api_key("FILE_KEY")
            .with_env_overrides(|name| env.get(name).map(|v| v.to_string()))
            .expect("overrides should apply");

        assert_eq!(cfg.api_key, "ENV_KEY");
        assert_eq!(cfg.temp_format, TempUnit::Fahrenheit);
        assert_eq!(cfg.lang, "en");
    }

    #[test]
    fn env_override_with_bad_units_errors() {
        let err = WeatherConfig::default()
            .with_env_overrides(|name| (name == ENV_UNITS).then(|| "kelvinish".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_UNITS));
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = WeatherConfig::load_from(&dir.path().join("nope.toml")).expect("defaults");
        assert_eq!(cfg, WeatherConfig::default());
    }

    #[test]
    fn save_then_load_preserves_values() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = WeatherConfig::with_api_key("KEY");
        cfg.lang = "de".into();
        cfg.temp_format = TempUnit::Kelvin;
        cfg.api_versions.historical = "3.0".into();
        cfg.save_to(&path).expect("save");

        let loaded = WeatherConfig::load_from(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg: WeatherConfig = toml::from_str(
            r#"
            api_key = "KEY"
            temp_format = "f"

            [api_versions]
            historical = "3.0"
            "#,
        )
        .expect("parse");

        assert_eq!(cfg.temp_format, TempUnit::Fahrenheit);
        assert_eq!(cfg.api_versions.historical, "3.0");
        assert_eq!(cfg.api_versions.geo, "1.0");
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
    }
}
