use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const BUILTIN_LOCATIONS: &str = include_str!("../../data/locations.json");

/// Words too common in checkpoint names to identify one on their own.
const GENERIC_WORDS: &[&str] = &[
    "بوابة", "البوابة", "مدخل", "المدخل", "جسر", "الجسر", "نفق", "النفق", "حاجز", "شارع", "تحت",
    "الشرقي", "الشرقية", "الغربي", "الغربية", "الشمالي", "الجنوبي",
];

const EARTH_RADIUS_KM: f64 = 6371.0;

/// A point in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Result<Self, String> {
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return Err(format!("coordinates {lat},{lng} are out of range"));
        }
        Ok(Self { lat, lng })
    }

    /// Great-circle distance in kilometres (haversine).
    pub fn distance_km(&self, other: &Coordinates) -> f64 {
        let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
        let dlat = lat2 - lat1;
        let dlng = (other.lng - self.lng).to_radians();
        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().min(1.0).asin()
    }
}

/// Parses `LAT,LNG`.
impl FromStr for Coordinates {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lat, lng) = s
            .split_once(',')
            .ok_or_else(|| format!("expected LAT,LNG, got '{s}'"))?;
        let number = |part: &str| {
            part.trim()
                .parse::<f64>()
                .map_err(|_| format!("'{}' is not a number", part.trim()))
        };
        Self::new(number(lat)?, number(lng)?)
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lng)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub checkpoint: String,
    pub city: String,
    pub coordinates: Option<Coordinates>,
}

/// Catalog value: a bare city name, or a city with a position.
#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogValue {
    City(String),
    Placed {
        city: String,
        #[serde(alias = "latitude")]
        lat: f64,
        #[serde(alias = "longitude")]
        lng: f64,
    },
}

/// Ordered checkpoint → city table used to place free-text messages.
#[derive(Debug, Clone)]
pub struct LocationCatalog {
    entries: Vec<Location>,
}

impl LocationCatalog {
    /// The table shipped with the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_LOCATIONS).context("embedded location table is invalid")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read catalog {}", path.display()))?;
        Self::from_json(&content).with_context(|| format!("{}: invalid catalog", path.display()))
    }

    /// Parse a JSON object keyed by checkpoint. Values are either the city
    /// name or `{"city", "lat", "lng"}`. Key order is kept.
    pub fn from_json(content: &str) -> Result<Self> {
        let map: Map<String, Value> = serde_json::from_str(content)?;
        let mut entries = Vec::with_capacity(map.len());
        for (checkpoint, value) in map {
            let Ok(value) = serde_json::from_value::<CatalogValue>(value) else {
                bail!("entry for '{checkpoint}' must be a city name or a {{city, lat, lng}} object");
            };
            let (city, coordinates) = match value {
                CatalogValue::City(city) => (city, None),
                CatalogValue::Placed { city, lat, lng } => {
                    let at = Coordinates::new(lat, lng)
                        .map_err(|e| anyhow::anyhow!("'{checkpoint}': {e}"))?;
                    (city, Some(at))
                }
            };
            if checkpoint.trim().is_empty() || city.trim().is_empty() {
                bail!("empty checkpoint or city name in catalog");
            }
            entries.push(Location {
                checkpoint: checkpoint.trim().to_string(),
                city: city.trim().to_string(),
                coordinates,
            });
        }
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Location> {
        self.entries.iter()
    }

    /// Positioned checkpoints within `radius_km` of `origin`, nearest first.
    ///
    /// Equal distances keep catalog order.
    pub fn nearby(&self, origin: Coordinates, radius_km: f64) -> Vec<(&Location, f64)> {
        let mut hits: Vec<(&Location, f64)> = self
            .distances(origin)
            .filter(|(_, d)| *d <= radius_km)
            .collect();
        hits.sort_by(|a, b| a.1.total_cmp(&b.1));
        hits
    }

    /// The positioned checkpoint nearest to `origin`.
    pub fn closest(&self, origin: Coordinates) -> Option<(&Location, f64)> {
        self.distances(origin)
            .reduce(|best, next| if next.1 < best.1 { next } else { best })
    }

    fn distances(&self, origin: Coordinates) -> impl Iterator<Item = (&Location, f64)> {
        self.entries
            .iter()
            .filter_map(move |loc| loc.coordinates.map(|at| (loc, origin.distance_km(&at))))
    }

    /// Locate a checkpoint mentioned in `text`.
    ///
    /// Full-name containment is tried first, in catalog order; then any
    /// distinctive word (longer than two characters) of a name.
    pub fn find(&self, text: &str) -> Option<&Location> {
        let text = text.to_lowercase();
        if let Some(hit) = self
            .entries
            .iter()
            .find(|loc| text.contains(&loc.checkpoint.to_lowercase()))
        {
            return Some(hit);
        }
        self.entries.iter().find(|loc| {
            loc.checkpoint
                .to_lowercase()
                .split_whitespace()
                .filter(|w| w.chars().count() > 2 && !GENERIC_WORDS.contains(w))
                .any(|w| text.contains(w))
        })
    }
}
