use anyhow::{Context, Result, bail};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use clap::{Args, Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode, Select, Text};
use openweather_core::{Location, TempUnit, Weather, WeatherConfig};
use serde_json::Value;
use tracing::debug;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "openweather", version, about = "OpenWeather CLI")]
pub struct Cli {
    /// Log at debug level. `RUST_LOG` takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the API key, units and language in the config file.
    Configure,

    /// Current weather.
    Current {
        #[command(flatten)]
        location: LocationArgs,

        /// Print only the temperature block.
        #[arg(long)]
        temp_only: bool,
    },

    /// Current, minutely, hourly and daily data in one call.
    Onecall {
        #[command(flatten)]
        coord: CoordArgs,
    },

    /// 5 day forecast in 3-hour steps.
    Forecast {
        #[command(flatten)]
        location: LocationArgs,
    },

    /// Historical weather for a past date.
    History {
        #[command(flatten)]
        coord: CoordArgs,

        /// e.g. "2024-05-01", "2024-05-01 14:00" or RFC 3339 (UTC unless an offset is given).
        #[arg(long, value_parser = parse_datetime)]
        date: DateTime<Utc>,
    },

    /// Air pollution: current, a historical range, or the forecast.
    Pollution {
        #[command(flatten)]
        coord: CoordArgs,

        #[arg(long, value_parser = parse_datetime)]
        start: Option<DateTime<Utc>>,

        #[arg(long, value_parser = parse_datetime)]
        end: Option<DateTime<Utc>>,

        #[arg(long, conflicts_with_all = ["start", "end"])]
        forecast: bool,
    },

    /// Geocoding: look up places by name, coordinates or zip code.
    Geo {
        #[command(flatten)]
        location: LocationArgs,

        /// Maximum number of results.
        #[arg(long)]
        limit: Option<u32>,
    },
}

/// Exactly one location selector.
#[derive(Debug, Args)]
#[group(required = true, multiple = true)]
pub struct LocationArgs {
    /// City name, or a numeric OpenWeather city id.
    #[arg(long, conflicts_with_all = ["lat", "zip"])]
    pub city: Option<String>,

    #[arg(long, requires = "lon", allow_negative_numbers = true, conflicts_with = "zip")]
    pub lat: Option<f64>,

    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lon: Option<f64>,

    #[arg(long)]
    pub zip: Option<String>,

    /// Country code for --zip (defaults to "us").
    #[arg(long, requires = "zip")]
    pub country: Option<String>,
}

impl LocationArgs {
    pub fn location(&self) -> Result<Location> {
        match (&self.city, self.lat.zip(self.lon), &self.zip) {
            (Some(city), None, None) => Ok(Location::from_city(city)),
            (None, Some((lat, lon)), None) => Ok(Location::coord(lat, lon)),
            (None, None, Some(zip)) => Ok(Location::zip(zip, self.country.as_deref())),
            _ => bail!("Specify exactly one of --city, --lat/--lon or --zip"),
        }
    }
}

#[derive(Debug, Args)]
pub struct CoordArgs {
    #[arg(long, allow_negative_numbers = true)]
    pub lat: f64,

    #[arg(long, allow_negative_numbers = true)]
    pub lon: f64,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Configure => configure(),
            command => {
                debug!(?command, "dispatching command");
                let config = WeatherConfig::load()?;
                let weather = Weather::new(config).context(
                    "Hint: run `openweather configure` or set OPENWEATHER_API_KEY first.",
                )?;
                let value = fetch(&weather, command).await?;
                println!("{}", serde_json::to_string_pretty(&value)?);
                Ok(())
            }
        }
    }
}

async fn fetch(weather: &Weather, command: Command) -> Result<Value> {
    let value = match command {
        Command::Configure => bail!("`configure` does not fetch weather data"),
        Command::Current { location, temp_only } => {
            let current = weather.current(&location.location()?).await?;
            if temp_only { current.get("main").cloned().unwrap_or(Value::Null) } else { current }
        }
        Command::Onecall { coord } => weather.one_call_by_coord(coord.lat, coord.lon).await?,
        Command::Forecast { location } => weather.three_hourly(&location.location()?).await?,
        Command::History { coord, date } => {
            weather.history_by_coord(coord.lat, coord.lon, date).await?
        }
        Command::Pollution { coord, forecast: true, .. } => {
            weather.air_pollution_forecast_by_coord(coord.lat, coord.lon).await?
        }
        Command::Pollution { coord, start, end, .. } => {
            weather.air_pollution_by_coord(coord.lat, coord.lon, start, end).await?
        }
        Command::Geo { location, limit } => match location.location()? {
            Location::CityName(name) | Location::CityId(name) => {
                weather.geo_by_city(&name, limit).await?
            }
            Location::Coord { lat, lon } => weather.geo_by_coord(lat, lon, limit).await?,
            Location::Zip { zip, country } => weather.geo_by_zip(&zip, Some(&country)).await?,
        },
    };

    Ok(value)
}

fn configure() -> Result<()> {
    let path = WeatherConfig::config_file_path()?;
    let mut config = WeatherConfig::load_from(&path)?;

    let api_key = Password::new("OpenWeather API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .with_help_message("Get a free key at https://openweathermap.org/price")
        .prompt()
        .context("Failed to read API key")?;
    if !api_key.trim().is_empty() {
        config.api_key = api_key.trim().to_string();
    }

    let units = TempUnit::all().to_vec();
    let start = units.iter().position(|u| *u == config.temp_format).unwrap_or(0);
    config.temp_format = Select::new("Temperature unit:", units)
        .with_starting_cursor(start)
        .prompt()
        .context("Failed to read temperature unit")?;

    let current_lang = config.lang.clone();
    config.lang = Text::new("Language code:")
        .with_default(&current_lang)
        .prompt()
        .context("Failed to read language")?;

    config.validate()?;
    config.save_to(&path)?;
    println!("Saved configuration to {}", path.display());

    Ok(())
}

/// Parses a CLI date into UTC.
pub fn parse_datetime(input: &str) -> Result<DateTime<Utc>, String> {
    let input = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }
    for pattern in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, pattern) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }
    if let Ok(epoch) = input.trim_start_matches('@').parse::<i64>() {
        return DateTime::from_timestamp(epoch, 0)
            .ok_or_else(|| format!("epoch out of range: {input}"));
    }

    Err(format!("Unrecognized date '{input}', expected e.g. 2024-05-01 or 2024-05-01 14:00"))
}
