/// Where weather data is requested for. Exactly one selector ends up in a query.
#[derive(Debug, Clone, PartialEq)]
pub enum Location {
    CityName(String),
    /// Provider city id, kept as the caller's digit string.
    CityId(String),
    Coord { lat: f64, lon: f64 },
    Zip { zip: String, country: String },
}

pub const DEFAULT_ZIP_COUNTRY: &str = "us";

impl Location {
    /// A fully numeric token is a provider city id, anything else a free-text name.
    pub fn from_city(token: &str) -> Self {
        let token = token.trim();
        if !token.is_empty() && token.chars().all(|c| c.is_ascii_digit()) {
            Location::CityId(token.to_string())
        } else {
            Location::CityName(token.to_string())
        }
    }

    pub fn coord(lat: f64, lon: f64) -> Self {
        Location::Coord { lat, lon }
    }

    pub fn zip(zip: &str, country: Option<&str>) -> Self {
        Location::Zip {
            zip: zip.trim().to_string(),
            country: country.unwrap_or(DEFAULT_ZIP_COUNTRY).trim().to_string(),
        }
    }

    /// Query fields for this selector.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        match self {
            Location::CityName(name) => vec![("q", name.clone())],
            Location::CityId(id) => vec![("id", id.clone())],
            Location::Coord { lat, lon } => vec![("lat", lat.to_string()), ("lon", lon.to_string())],
            Location::Zip { zip, country } => {
                vec![("zip", zip.clone()), ("country", country.clone())]
            }
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Location::CityName(name) => write!(f, "{name}"),
            Location::CityId(id) => write!(f, "city #{id}"),
            Location::Coord { lat, lon } => write!(f, "{lat},{lon}"),
            Location::Zip { zip, country } => write!(f, "{zip}, {country}"),
        }
    }
}
