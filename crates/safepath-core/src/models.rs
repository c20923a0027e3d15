//! Core data models for the route search engine.

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Category of a reported incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentCategory {
    Homicide,
    Rape,
    Robbery,
    Assault,
    Burglary,
    Theft,
    VehicleTheft,
    Vandalism,
    Fraud,
    Other,
}

impl IncidentCategory {
    /// Parse a free-form category string from an incident feed.
    ///
    /// Matching is case-insensitive and tolerant of dataset variants
    /// ("Larceny Theft", "Motor Vehicle Theft"); anything unrecognized
    /// falls through to `Other`.
    pub fn parse(raw: &str) -> Self {
        let lower = raw.to_ascii_lowercase();
        if lower.contains("homicide") {
            Self::Homicide
        } else if lower.contains("rape") {
            Self::Rape
        } else if lower.contains("robbery") {
            Self::Robbery
        } else if lower.contains("assault") {
            Self::Assault
        } else if lower.contains("burglary") {
            Self::Burglary
        } else if lower.contains("vehicle") && lower.contains("theft") {
            Self::VehicleTheft
        } else if lower.contains("theft") || lower.contains("larceny") {
            Self::Theft
        } else if lower.contains("vandalism") || lower.contains("malicious mischief") {
            Self::Vandalism
        } else if lower.contains("fraud") {
            Self::Fraud
        } else {
            Self::Other
        }
    }

    /// Severity weight on a 1..=10 scale.
    pub fn severity(self) -> u8 {
        match self {
            Self::Homicide => 10,
            Self::Rape => 9,
            Self::Robbery => 8,
            Self::Assault => 7,
            Self::Burglary => 6,
            Self::Theft => 5,
            Self::VehicleTheft => 4,
            Self::Vandalism => 3,
            Self::Fraud => 2,
            Self::Other => 1,
        }
    }
}

/// A single point incident from the historical dataset.
///
/// Immutable once loaded. Every stored record has valid, non-zero
/// coordinates; records failing that invariant are dropped at load time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentRecord {
    pub lat: f64,
    pub lng: f64,
    pub category: IncidentCategory,
    pub severity: u8,
    pub timestamp: DateTime<Utc>,
    pub is_night: bool,
}

impl IncidentRecord {
    /// Build a record, deriving severity and the night flag.
    pub fn new(lat: f64, lng: f64, category: IncidentCategory, timestamp: DateTime<Utc>) -> Self {
        let hour = timestamp.hour();
        Self {
            lat,
            lng,
            category,
            severity: category.severity(),
            timestamp,
            is_night: hour >= 22 || hour <= 6,
        }
    }
}

/// A geographic bounding box (degrees).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub lat_min: f64,
    pub lng_min: f64,
    pub lat_max: f64,
    pub lng_max: f64,
}

impl BoundingBox {
    /// Smallest box containing both points.
    pub fn around(a: (f64, f64), b: (f64, f64)) -> Self {
        Self {
            lat_min: a.0.min(b.0),
            lng_min: a.1.min(b.1),
            lat_max: a.0.max(b.0),
            lng_max: a.1.max(b.1),
        }
    }

    /// Box grown by `margin` degrees on every side.
    pub fn expanded(&self, margin: f64) -> Self {
        Self {
            lat_min: self.lat_min - margin,
            lng_min: self.lng_min - margin,
            lat_max: self.lat_max + margin,
            lng_max: self.lng_max + margin,
        }
    }

    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        lat >= self.lat_min && lat < self.lat_max && lng >= self.lng_min && lng < self.lng_max
    }

    pub fn mean_lat(&self) -> f64 {
        (self.lat_min + self.lat_max) / 2.0
    }
}

/// Letter grade derived from an average safety score.
///
/// One canonical scale for the whole engine: A+ >= 90, A >= 80, B >= 70,
/// C >= 60, D >= 50, else F.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "A+")]
    APlus,
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            Self::APlus
        } else if score >= 80.0 {
            Self::A
        } else if score >= 70.0 {
            Self::B
        } else if score >= 60.0 {
            Self::C
        } else if score >= 50.0 {
            Self::D
        } else {
            Self::F
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::APlus => "A+",
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::F => "F",
        };
        f.write_str(s)
    }
}

/// Named route-generation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Straight to the destination, minimal detours
    Direct,
    /// Even trade-off between distance and safety
    Balanced,
    /// Prefers safer cells at moderate extra distance
    Safe,
    /// Maximum safety, distance secondary
    Safest,
    /// Skirts around the midpoint area instead of crossing it
    Perimeter,
    /// Blend of safety-seeking and perimeter waypoints
    Multipath,
}

impl StrategyKind {
    /// Safety weight this strategy optimizes for, independent of the
    /// caller's preference (the caller's weight picks the winner).
    pub fn preset_weight(self) -> f64 {
        match self {
            Self::Direct => 0.1,
            Self::Balanced => 0.5,
            Self::Safe => 0.8,
            Self::Safest => 0.95,
            Self::Perimeter => 0.7,
            Self::Multipath => 0.6,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Balanced => "balanced",
            Self::Safe => "safe",
            Self::Safest => "safest",
            Self::Perimeter => "perimeter",
            Self::Multipath => "multipath",
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// How the returned route was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingMethod {
    /// Search over the real street network
    StreetGraph,
    /// Dijkstra over a synthetic waypoint graph
    WaypointGraph,
    /// Straight-line interpolation, safety still scored
    Fallback,
}

/// A point on a finished route with its safety annotations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutePoint {
    pub lat: f64,
    pub lng: f64,
    /// Grid-derived safety score, 0-100
    pub safety_score: f64,
    /// Incidents within the report radius of this point
    pub incident_count: u32,
    pub distance_from_start: f64,
}

/// A scored candidate route. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub points: Vec<RoutePoint>,
    pub total_distance_m: f64,
    pub avg_safety_score: f64,
    pub total_incidents: u32,
    pub safety_grade: Grade,
    pub strategy: StrategyKind,
    /// Waypoints the generator proposed (not necessarily on streets)
    pub waypoints: Vec<(f64, f64)>,
    /// Set when the route exceeds the caller's soft distance cap
    #[serde(default)]
    pub exceeds_distance_cap: bool,
}

/// Request for the top-level route search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindRouteRequest {
    pub start_lat: f64,
    pub start_lng: f64,
    pub end_lat: f64,
    pub end_lng: f64,
    /// 0.0 = fastest, 1.0 = safest
    #[serde(default = "default_safety_weight")]
    pub safety_weight: f64,
    /// Soft cap: candidates may exceed direct distance times this factor,
    /// but get flagged
    #[serde(default = "default_max_distance_factor")]
    pub max_distance_factor: f64,
}

fn default_safety_weight() -> f64 {
    0.7
}

fn default_max_distance_factor() -> f64 {
    2.0
}

impl FindRouteRequest {
    pub fn new(start: (f64, f64), end: (f64, f64)) -> Self {
        Self {
            start_lat: start.0,
            start_lng: start.1,
            end_lat: end.0,
            end_lng: end.1,
            safety_weight: default_safety_weight(),
            max_distance_factor: default_max_distance_factor(),
        }
    }

    pub fn with_safety_weight(mut self, weight: f64) -> Self {
        self.safety_weight = weight;
        self
    }

    pub fn with_max_distance_factor(mut self, factor: f64) -> Self {
        self.max_distance_factor = factor;
        self
    }
}

/// Result of the top-level route search.
///
/// `success` is true whenever the arguments were valid: degraded modes
/// still produce a best-effort route and signal themselves through
/// `routing_method` instead of failing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteResult {
    pub success: bool,
    pub best_route: Option<Route>,
    pub all_options: Vec<Route>,
    pub routing_method: RoutingMethod,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parsing_handles_dataset_variants() {
        assert_eq!(
            IncidentCategory::parse("Larceny Theft"),
            IncidentCategory::Theft
        );
        assert_eq!(
            IncidentCategory::parse("Motor Vehicle Theft"),
            IncidentCategory::VehicleTheft
        );
        assert_eq!(
            IncidentCategory::parse("Malicious Mischief"),
            IncidentCategory::Vandalism
        );
        assert_eq!(
            IncidentCategory::parse("Suspicious Occ"),
            IncidentCategory::Other
        );
    }

    #[test]
    fn severity_ordering() {
        assert!(IncidentCategory::Homicide.severity() > IncidentCategory::Robbery.severity());
        assert_eq!(IncidentCategory::Other.severity(), 1);
    }

    #[test]
    fn night_flag_from_timestamp() {
        let late = "2025-03-01T23:30:00Z".parse().unwrap();
        let noon = "2025-03-01T12:00:00Z".parse().unwrap();
        let r1 = IncidentRecord::new(37.0, -122.0, IncidentCategory::Theft, late);
        let r2 = IncidentRecord::new(37.0, -122.0, IncidentCategory::Theft, noon);
        assert!(r1.is_night);
        assert!(!r2.is_night);
    }

    #[test]
    fn grade_thresholds() {
        assert_eq!(Grade::from_score(95.0), Grade::APlus);
        assert_eq!(Grade::from_score(90.0), Grade::APlus);
        assert_eq!(Grade::from_score(89.9), Grade::A);
        assert_eq!(Grade::from_score(70.0), Grade::B);
        assert_eq!(Grade::from_score(60.0), Grade::C);
        assert_eq!(Grade::from_score(50.0), Grade::D);
        assert_eq!(Grade::from_score(49.9), Grade::F);
    }

    #[test]
    fn bounding_box_around_is_normalized() {
        let b = BoundingBox::around((37.8, -122.41), (37.7, -122.5));
        assert_eq!(b.lat_min, 37.7);
        assert_eq!(b.lng_min, -122.5);
        assert!(b.contains(37.75, -122.45));
        assert!(!b.contains(37.95, -122.45));
    }
}
