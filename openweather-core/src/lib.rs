//! Client for the OpenWeather HTTP API.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - Query building and a single-attempt HTTP transport
//! - Normalization of provider timestamps (and optionally Kelvin temperatures)
//! - The [`Weather`] facade with one method per data kind and location selector
//!
//! It is used by `openweather-cli`, but can also be embedded by other binaries or services.

pub mod config;
pub mod endpoint;
pub mod error;
pub mod location;
pub mod normalize;
pub mod query;
pub mod transport;
pub mod units;
pub mod weather;

pub use config::{ApiVersions, WeatherConfig};
pub use endpoint::Endpoint;
pub use error::{Result, WeatherError};
pub use location::{DEFAULT_ZIP_COUNTRY, Location};
pub use normalize::{Normalizer, PayloadKind};
pub use query::Query;
pub use transport::{HttpTransport, REQUEST_TIMEOUT, Transport};
pub use units::TempUnit;
pub use weather::Weather;
