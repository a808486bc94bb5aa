//! Data models.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::errors::RiasViewerError;
use serde_helpers::*;

/// Name shown for vessels that report none
pub const UNKNOWN_SHIP_NAME: &str = "Desconocido";

/// One tile of the fixed-zoom map grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoordinate {
    pub x: i64,
    pub y: i64,
    pub zoom: u8,
}

impl TileCoordinate {
    pub fn new(x: i64, y: i64, zoom: u8) -> Self {
        Self { x, y, zoom }
    }
}

/// Rectangular tile grid, inclusive on both ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridBounds {
    x_min: i64,
    x_max: i64,
    y_min: i64,
    y_max: i64,
}

impl GridBounds {
    pub fn new(x_min: i64, x_max: i64, y_min: i64, y_max: i64) -> Result<Self, RiasViewerError> {
        if x_min > x_max || y_min > y_max {
            return Err(RiasViewerError::ConfigurationError {
                message: format!(
                    "Invalid grid bounds: x [{}, {}], y [{}, {}]",
                    x_min, x_max, y_min, y_max
                ),
            });
        }
        let tile_count = span(x_min, x_max)
            .zip(span(y_min, y_max))
            .and_then(|(width, height)| width.checked_mul(height));
        if tile_count.is_none() {
            return Err(RiasViewerError::ConfigurationError {
                message: format!(
                    "Grid too large: x [{}, {}], y [{}, {}]",
                    x_min, x_max, y_min, y_max
                ),
            });
        }
        Ok(Self {
            x_min,
            x_max,
            y_min,
            y_max,
        })
    }

    // Spans and their product were checked in `new`.
    pub fn width(&self) -> usize {
        span(self.x_min, self.x_max).unwrap_or(usize::MAX)
    }

    pub fn height(&self) -> usize {
        span(self.y_min, self.y_max).unwrap_or(usize::MAX)
    }

    pub fn tile_count(&self) -> usize {
        self.width().saturating_mul(self.height())
    }

    /// Whether every tile lies inside the `2^zoom` by `2^zoom` world grid
    pub fn fits_zoom(&self, zoom: u8) -> bool {
        if self.x_min < 0 || self.y_min < 0 {
            return false;
        }
        match 1i64.checked_shl(u32::from(zoom)).filter(|side| *side > 0) {
            Some(side) => self.x_max < side && self.y_max < side,
            None => true,
        }
    }

    /// Tiles in enumeration order: `y` varies fastest within each `x`
    pub fn tiles(&self, zoom: u8) -> impl Iterator<Item = TileCoordinate> {
        let (y_min, y_max) = (self.y_min, self.y_max);
        (self.x_min..=self.x_max)
            .flat_map(move |x| (y_min..=y_max).map(move |y| TileCoordinate::new(x, y, zoom)))
    }
}

/// Number of tiles in `[min, max]`, `None` if it does not fit a `usize`
fn span(min: i64, max: i64) -> Option<usize> {
    max.abs_diff(min)
        .checked_add(1)
        .and_then(|n| usize::try_from(n).ok())
}

/// One vessel position after cleaning
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VesselRecord {
    /// Upstream vessel identifier, if reported
    pub ship_id: Option<String>,
    pub ship_name: String,
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Speed over ground in knots
    pub speed: f64,
    /// Course over ground in degrees
    pub course: Option<f64>,
    pub ship_type: Option<String>,
    pub destination: Option<String>,
    pub flag: Option<String>,
}

/// Vessel row as found in the upstream JSON, before cleaning.
///
/// Every field is optional and leniently typed: numbers may arrive as
/// strings, labels as numbers. Deserializing an object into this type
/// never fails; unusable values become `None`.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct RawVesselRow {
    #[serde(rename = "SHIP_ID", default, deserialize_with = "deserialize_text")]
    pub ship_id: Option<String>,
    #[serde(rename = "SHIPNAME", default, deserialize_with = "deserialize_text")]
    pub ship_name: Option<String>,
    #[serde(rename = "LAT", default, deserialize_with = "deserialize_numeric")]
    pub lat: Option<f64>,
    #[serde(rename = "LON", default, deserialize_with = "deserialize_numeric")]
    pub lon: Option<f64>,
    /// Speed in tenths of a knot
    #[serde(rename = "SPEED", default, deserialize_with = "deserialize_numeric")]
    pub speed: Option<f64>,
    #[serde(rename = "COURSE", default, deserialize_with = "deserialize_numeric")]
    pub course: Option<f64>,
    #[serde(rename = "SHIPTYPE", default, deserialize_with = "deserialize_text")]
    pub ship_type: Option<String>,
    #[serde(rename = "DESTINATION", default, deserialize_with = "deserialize_text")]
    pub destination: Option<String>,
    #[serde(rename = "FLAG", default, deserialize_with = "deserialize_text")]
    pub flag: Option<String>,
}

impl RawVesselRow {
    /// Clean the row into a record.
    ///
    /// Returns `None` when latitude, longitude or speed is missing. Speed is
    /// converted from tenths of a knot to knots.
    pub fn into_record(self) -> Option<VesselRecord> {
        let (latitude, longitude, speed) = match (self.lat, self.lon, self.speed) {
            (Some(lat), Some(lon), Some(speed)) => (lat, lon, speed / 10.0),
            _ => return None,
        };

        Some(VesselRecord {
            ship_id: self.ship_id,
            ship_name: self
                .ship_name
                .unwrap_or_else(|| UNKNOWN_SHIP_NAME.to_string()),
            latitude,
            longitude,
            speed,
            course: self.course,
            ship_type: self.ship_type,
            destination: self.destination,
            flag: self.flag,
        })
    }
}

/// Ordered collection of vessel records from one refresh
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    records: Vec<VesselRecord>,
}

impl Dataset {
    pub fn new(records: Vec<VesselRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[VesselRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &VesselRecord> {
        self.records.iter()
    }

    pub fn speeds(&self) -> impl Iterator<Item = f64> + '_ {
        self.records.iter().map(|r| r.speed)
    }

    /// Keep the first row per `ship_id`.
    ///
    /// Vessels seen in overlapping tiles appear once per tile; this is the
    /// opt-in way to collapse them. Rows without an id are all kept.
    pub fn dedup_by_ship_id(self) -> Self {
        let mut seen = HashSet::new();
        let records = self
            .records
            .into_iter()
            .filter(|r| match &r.ship_id {
                Some(id) => seen.insert(id.clone()),
                None => true,
            })
            .collect();
        Self { records }
    }
}

impl FromIterator<VesselRecord> for Dataset {
    fn from_iter<T: IntoIterator<Item = VesselRecord>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Lenient deserializers for upstream vessel rows
mod serde_helpers {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// Numbers, or strings holding a number. Anything else, and non-finite
    /// values, become `None`.
    pub fn deserialize_numeric<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(coerce_numeric(&value))
    }

    /// Strings (trimmed, empty is `None`) or numbers rendered as text
    pub fn deserialize_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(match value {
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }

    pub fn coerce_numeric(value: &Value) -> Option<f64> {
        let number = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        number.filter(|n| n.is_finite())
    }
}
