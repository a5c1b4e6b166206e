//! Typed records for the dashboard datasets.
//!
//! Site records mirror the layout of `site_statistics.json`: a nested site
//! descriptor plus eight top-level `ClassN` counts. Station records mirror the
//! columns of the hydrogen refuelling station CSV.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, de};

use crate::error::DashboardError;

/// A WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    #[serde(rename = "long", alias = "lng", alias = "lon")]
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Returns `true` when both components are finite and in range.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lon)
    }
}

/// Austroads vehicle classes counted at each site (Class 3 and above).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum VehicleClass {
    Class3,
    Class4,
    Class5,
    Class6,
    Class7,
    Class8,
    Class9,
    Class10,
}

impl VehicleClass {
    pub const ALL: [VehicleClass; 8] = [
        VehicleClass::Class3,
        VehicleClass::Class4,
        VehicleClass::Class5,
        VehicleClass::Class6,
        VehicleClass::Class7,
        VehicleClass::Class8,
        VehicleClass::Class9,
        VehicleClass::Class10,
    ];

    pub fn number(self) -> u8 {
        match self {
            VehicleClass::Class3 => 3,
            VehicleClass::Class4 => 4,
            VehicleClass::Class5 => 5,
            VehicleClass::Class6 => 6,
            VehicleClass::Class7 => 7,
            VehicleClass::Class8 => 8,
            VehicleClass::Class9 => 9,
            VehicleClass::Class10 => 10,
        }
    }

    pub fn from_number(n: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.number() == n)
    }

    /// Display label, e.g. `"Class 8"`.
    pub fn label(self) -> String {
        format!("Class {}", self.number())
    }

    /// Medium rigid trucks (classes 3 to 5).
    pub fn is_medium(self) -> bool {
        self.number() <= 5
    }
}

impl fmt::Display for VehicleClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Class {}", self.number())
    }
}

/// Accepts `"8"`, `"Class8"` and `"Class 8"` (case-insensitive).
impl FromStr for VehicleClass {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let lower = trimmed.to_ascii_lowercase();
        let digits = lower.strip_prefix("class").unwrap_or(&lower).trim();
        digits
            .parse::<u8>()
            .ok()
            .and_then(VehicleClass::from_number)
            .ok_or_else(|| DashboardError::UnknownVehicleClass(trimmed.to_string()))
    }
}

/// Counts per vehicle class recorded at one site.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassCounts {
    #[serde(rename = "Class3", deserialize_with = "whole_count")]
    pub class3: u64,
    #[serde(rename = "Class4", deserialize_with = "whole_count")]
    pub class4: u64,
    #[serde(rename = "Class5", deserialize_with = "whole_count")]
    pub class5: u64,
    #[serde(rename = "Class6", deserialize_with = "whole_count")]
    pub class6: u64,
    #[serde(rename = "Class7", deserialize_with = "whole_count")]
    pub class7: u64,
    #[serde(rename = "Class8", deserialize_with = "whole_count")]
    pub class8: u64,
    #[serde(rename = "Class9", deserialize_with = "whole_count")]
    pub class9: u64,
    #[serde(rename = "Class10", deserialize_with = "whole_count")]
    pub class10: u64,
}

impl ClassCounts {
    pub fn get(&self, class: VehicleClass) -> u64 {
        match class {
            VehicleClass::Class3 => self.class3,
            VehicleClass::Class4 => self.class4,
            VehicleClass::Class5 => self.class5,
            VehicleClass::Class6 => self.class6,
            VehicleClass::Class7 => self.class7,
            VehicleClass::Class8 => self.class8,
            VehicleClass::Class9 => self.class9,
            VehicleClass::Class10 => self.class10,
        }
    }

    /// Sum of all eight classes ("Class 3+").
    pub fn total(&self) -> u64 {
        VehicleClass::ALL.iter().map(|c| self.get(*c)).sum()
    }

    pub fn medium(&self) -> u64 {
        VehicleClass::ALL
            .iter()
            .filter(|c| c.is_medium())
            .map(|c| self.get(*c))
            .sum()
    }

    pub fn heavy(&self) -> u64 {
        VehicleClass::ALL
            .iter()
            .filter(|c| !c.is_medium())
            .map(|c| self.get(*c))
            .sum()
    }
}

/// Descriptor block nested under `site` in the statistics file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SiteDescriptor {
    #[serde(rename = "siteNumber", deserialize_with = "string_or_number")]
    pub site_number: String,
    #[serde(rename = "roadname")]
    pub road_name: String,
    #[serde(rename = "locationDesc")]
    pub location_desc: String,
    #[serde(rename = "roadDir", default)]
    pub road_dir: String,
    pub location: Coordinate,
}

/// One monitored traffic site with its vehicle counts.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TrafficSite {
    pub site: SiteDescriptor,
    #[serde(flatten)]
    pub counts: ClassCounts,
}

impl TrafficSite {
    pub fn coordinate(&self) -> Coordinate {
        self.site.location
    }

    /// Label used by the starting-point selector.
    pub fn display_name(&self) -> String {
        format!("{} - {}", self.site.road_name, self.site.location_desc)
    }
}

/// A hydrogen refuelling station row.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HydrogenStation {
    #[serde(rename = "Lat")]
    pub lat: f64,
    #[serde(rename = "Long")]
    pub lon: f64,
    pub name: String,
    pub city_state: String,
    pub operator: String,
    #[serde(rename = "Start")]
    pub start: String,
    /// Shown as written; the source mixes numbers with notes like "TBC".
    #[serde(default)]
    pub storage_capacity_kg: Option<String>,
    #[serde(default)]
    pub dispensing_daily_capacity: Option<String>,
    #[serde(default)]
    pub usage_case: Option<String>,
}

impl HydrogenStation {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lon)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteKind {
    Railway,
    FreightRoad,
    SecondaryRoad,
}

impl RouteKind {
    pub const ALL: [RouteKind; 3] = [
        RouteKind::Railway,
        RouteKind::FreightRoad,
        RouteKind::SecondaryRoad,
    ];

    pub fn title(self) -> &'static str {
        match self {
            RouteKind::Railway => "Railway Routes",
            RouteKind::FreightRoad => "Key Freight Roads",
            RouteKind::SecondaryRoad => "Secondary Routes",
        }
    }
}

/// A route overlay loaded from GeoJSON. The geometry is handed to the map
/// renderer unmodified.
#[derive(Debug, Clone)]
pub struct RouteLayer {
    pub kind: RouteKind,
    pub geojson: geojson::GeoJson,
}

impl RouteLayer {
    pub fn feature_count(&self) -> usize {
        match &self.geojson {
            geojson::GeoJson::FeatureCollection(fc) => fc.features.len(),
            geojson::GeoJson::Feature(_) | geojson::GeoJson::Geometry(_) => 1,
        }
    }
}

/// Set of vehicle classes the user is analysing. Empty means all classes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassSelection(BTreeSet<VehicleClass>);

impl ClassSelection {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn is_all(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, class: VehicleClass) -> bool {
        self.0.contains(&class)
    }

    pub fn classes(&self) -> impl Iterator<Item = VehicleClass> + '_ {
        self.0.iter().copied()
    }

    /// Aggregate count of a site for this selection.
    pub fn aggregate(&self, counts: &ClassCounts) -> u64 {
        if self.is_all() {
            counts.total()
        } else {
            self.classes().map(|c| counts.get(c)).sum()
        }
    }

    /// `"Class 3, Class 8"` in class order.
    pub fn labels(&self) -> String {
        self.classes()
            .map(VehicleClass::label)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Parses a comma-separated list such as `"3,Class 8"`.
    pub fn parse_list(s: &str) -> Result<Self, DashboardError> {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(VehicleClass::from_str)
            .collect()
    }
}

impl FromIterator<VehicleClass> for ClassSelection {
    fn from_iter<I: IntoIterator<Item = VehicleClass>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Int(n) => n.to_string(),
        Raw::Float(f) => f.to_string(),
    })
}

/// Accepts a count written as an integer, an integral float such as `120.0`,
/// or a numeric string.
fn whole_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(u64),
        Float(f64),
        Text(String),
    }

    let value = match Raw::deserialize(deserializer)? {
        Raw::Int(n) => return Ok(n),
        Raw::Float(f) => f,
        Raw::Text(s) => s.trim().parse::<f64>().map_err(de::Error::custom)?,
    };
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= u64::MAX as f64 {
        Ok(value as u64)
    } else {
        Err(de::Error::custom(format!("invalid vehicle count {value}")))
    }
}
