//! Rewrites provider epoch timestamps into local, human-readable strings.
//!
//! Every payload kind is described by a [`Descriptor`]: where its UTC offset
//! lives and which fields carry timestamps (and, for the Kelvin conversion
//! path, temperatures). A single traversal walks those paths. Paths use dots
//! for object keys, `[]` for "every element" and `[n]` for one element, e.g.
//! `daily[].sunrise` or `data[0].dt`.

use chrono::{DateTime, FixedOffset};
use serde_json::Value;
use std::fmt::Write as _;
use tracing::debug;

use crate::{TempUnit, WeatherConfig};

/// Response shapes the normalizer knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    Current,
    OneCall,
    Forecast,
    Historical,
    /// Historical response of One Call API 3.0, which nests results under `data`.
    HistoricalV3,
    AirPollution,
}

/// Field list for one payload kind.
#[derive(Debug)]
pub struct Descriptor {
    /// JSON pointer to the offset in seconds; `None` means UTC.
    pub offset: Option<&'static str>,
    pub timestamps: &'static [&'static str],
    pub temperatures: &'static [&'static str],
}

static CURRENT: Descriptor = Descriptor {
    offset: Some("/timezone"),
    timestamps: &["sys.sunrise", "sys.sunset", "dt"],
    temperatures: &["main.temp", "main.feels_like", "main.temp_min", "main.temp_max"],
};

static ONE_CALL: Descriptor = Descriptor {
    offset: Some("/timezone_offset"),
    timestamps: &[
        "current.sunrise",
        "current.sunset",
        "current.dt",
        "minutely[].dt",
        "hourly[].dt",
        "daily[].dt",
        "daily[].sunrise",
        "daily[].sunset",
    ],
    temperatures: &[
        "current.temp",
        "current.feels_like",
        "current.dew_point",
        "hourly[].temp",
        "hourly[].feels_like",
        "hourly[].dew_point",
        "daily[].temp.day",
        "daily[].temp.min",
        "daily[].temp.max",
        "daily[].temp.night",
        "daily[].temp.eve",
        "daily[].temp.morn",
        "daily[].feels_like.day",
        "daily[].feels_like.night",
        "daily[].feels_like.eve",
        "daily[].feels_like.morn",
        "daily[].dew_point",
    ],
};

static FORECAST: Descriptor = Descriptor {
    offset: Some("/city/timezone"),
    timestamps: &["city.sunrise", "city.sunset", "list[].dt"],
    temperatures: &[
        "list[].main.temp",
        "list[].main.feels_like",
        "list[].main.temp_min",
        "list[].main.temp_max",
    ],
};

static HISTORICAL: Descriptor = Descriptor {
    offset: Some("/timezone_offset"),
    timestamps: &["current.sunrise", "current.sunset", "current.dt", "hourly[].dt"],
    temperatures: &[
        "current.temp",
        "current.feels_like",
        "current.dew_point",
        "hourly[].temp",
        "hourly[].feels_like",
        "hourly[].dew_point",
    ],
};

static HISTORICAL_V3: Descriptor = Descriptor {
    offset: Some("/timezone_offset"),
    timestamps: &["data[0].dt", "data[0].sunrise", "data[0].sunset"],
    temperatures: &["data[].temp", "data[].feels_like", "data[].dew_point"],
};

static AIR_POLLUTION: Descriptor = Descriptor {
    offset: None,
    timestamps: &["list[].dt"],
    temperatures: &[],
};

impl PayloadKind {
    /// Historical shape depends on the configured One Call API version.
    pub fn historical(api_version: &str) -> Self {
        if api_version.trim() == "3.0" {
            PayloadKind::HistoricalV3
        } else {
            PayloadKind::Historical
        }
    }

    pub fn descriptor(&self) -> &'static Descriptor {
        match self {
            PayloadKind::Current => &CURRENT,
            PayloadKind::OneCall => &ONE_CALL,
            PayloadKind::Forecast => &FORECAST,
            PayloadKind::Historical => &HISTORICAL,
            PayloadKind::HistoricalV3 => &HISTORICAL_V3,
            PayloadKind::AirPollution => &AIR_POLLUTION,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Normalizer {
    pattern: String,
    convert_to: Option<TempUnit>,
}

impl Normalizer {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self { pattern: pattern.into(), convert_to: None }
    }

    /// Also rewrite Kelvin temperatures into `unit`.
    pub fn with_kelvin_conversion(mut self, unit: TempUnit) -> Self {
        self.convert_to = Some(unit);
        self
    }

    pub fn from_config(config: &WeatherConfig) -> Self {
        let normalizer = Self::new(config.datetime_format());
        if config.local_temperature_conversion {
            normalizer.with_kelvin_conversion(config.temp_format)
        } else {
            normalizer
        }
    }

    /// `epoch` shifted by `offset` seconds and rendered with the configured
    /// pattern, so `%z`/`%:z` show the location's offset.
    /// `None` when out of range or the pattern can't be rendered.
    pub fn format_timestamp(&self, epoch: i64, offset: i64) -> Option<String> {
        let zone = FixedOffset::east_opt(i32::try_from(offset).ok()?)?;
        let local = DateTime::from_timestamp(epoch, 0)?.with_timezone(&zone);
        let mut out = String::new();
        write!(out, "{}", local.format(&self.pattern)).ok()?;
        Some(out)
    }

    /// Whether the pattern renders at all; used to reject bad configuration.
    pub fn can_render(&self) -> bool {
        self.format_timestamp(0, 0).is_some()
    }

    /// Returns a normalized copy of `payload`; the input is left untouched.
    ///
    /// Fields that are missing or not integers are skipped, so normalizing an
    /// already normalized payload changes nothing.
    pub fn normalize(&self, kind: PayloadKind, payload: &Value) -> Value {
        let descriptor = kind.descriptor();
        let mut out = payload.clone();

        let offset = descriptor
            .offset
            .and_then(|pointer| payload.pointer(pointer))
            .and_then(Value::as_i64)
            .unwrap_or(0);

        for path in descriptor.timestamps {
            visit(&mut out, &parse_path(path), &mut |field| {
                match field.as_i64().and_then(|epoch| self.format_timestamp(epoch, offset)) {
                    Some(formatted) => *field = Value::String(formatted),
                    None => debug!(?kind, path, "skipping non-epoch timestamp field"),
                }
            });
        }

        if let Some(unit) = self.convert_to {
            for path in descriptor.temperatures {
                visit(&mut out, &parse_path(path), &mut |field| {
                    if let Some(kelvin) = field.as_f64() {
                        *field = Value::from(unit.from_kelvin(kelvin));
                    }
                });
            }
        }

        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment<'a> {
    Key(&'a str),
    Index(usize),
    Each,
}

fn parse_path(path: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    for part in path.split('.') {
        match part.split_once('[') {
            Some((key, rest)) => {
                if !key.is_empty() {
                    segments.push(Segment::Key(key));
                }
                let index = rest.trim_end_matches(']');
                match index.parse() {
                    Ok(i) => segments.push(Segment::Index(i)),
                    Err(_) => segments.push(Segment::Each),
                }
            }
            None => segments.push(Segment::Key(part)),
        }
    }
    segments
}

fn visit(value: &mut Value, path: &[Segment<'_>], f: &mut dyn FnMut(&mut Value)) {
    let Some((head, rest)) = path.split_first() else {
        f(value);
        return;
    };

    match head {
        Segment::Key(key) => {
            if let Some(child) = value.get_mut(*key) {
                visit(child, rest, f);
            }
        }
        Segment::Index(i) => {
            if let Some(child) = value.get_mut(*i) {
                visit(child, rest, f);
            }
        }
        Segment::Each => {
            if let Some(items) = value.as_array_mut() {
                for item in items {
                    visit(item, rest, f);
                }
            }
        }
    }
}
