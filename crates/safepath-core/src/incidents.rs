//! Loading, cleaning and indexing of historical incident records.

use std::path::Path;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;

use crate::config::RouterConfig;
use crate::error::RouteError;
use crate::models::{BoundingBox, IncidentCategory, IncidentRecord};
use crate::spatial::haversine_distance;

/// Raw CSV row as exported by police incident feeds. Every field is
/// optional; cleaning happens in [`IncidentStore::load_from_csv`].
#[derive(Debug, Deserialize)]
struct RawIncidentRow {
    #[serde(rename = "Latitude")]
    latitude: Option<String>,
    #[serde(rename = "Longitude")]
    longitude: Option<String>,
    #[serde(rename = "Incident Category")]
    category: Option<String>,
    #[serde(rename = "Incident Date")]
    date: Option<String>,
    #[serde(rename = "Incident Time")]
    time: Option<String>,
}

/// Owns the cleaned incident dataset for the process lifetime.
///
/// Construction filters out records with missing, non-finite, zero or
/// out-of-range coordinates, so every stored record can be trusted by
/// the spatial queries downstream.
#[derive(Debug, Clone, Default)]
pub struct IncidentStore {
    records: Vec<IncidentRecord>,
}

impl IncidentStore {
    /// Build a store from pre-parsed records, dropping invalid ones.
    pub fn from_records(records: impl IntoIterator<Item = IncidentRecord>) -> Self {
        let records = records
            .into_iter()
            .filter(|r| coordinates_valid(r.lat, r.lng))
            .collect();
        Self { records }
    }

    /// Load and clean a CSV incident feed.
    ///
    /// `reference` anchors the recency filter (typically "now", but an
    /// explicit parameter so loads are reproducible in tests). Rows with
    /// unparseable dates are kept with the reference time as timestamp
    /// rather than dropped, matching how sparse real feeds are.
    pub fn load_from_csv(
        path: impl AsRef<Path>,
        reference: DateTime<Utc>,
        config: &RouterConfig,
    ) -> Result<Self, RouteError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path.as_ref())?;

        let cutoff = reference - Duration::days(config.incident_recency_days);
        let mut records = Vec::new();
        let mut skipped = 0usize;

        for row in reader.deserialize::<RawIncidentRow>() {
            let row = match row {
                Ok(row) => row,
                Err(_) => {
                    skipped += 1;
                    continue;
                }
            };

            let lat = row.latitude.as_deref().and_then(parse_coord);
            let lng = row.longitude.as_deref().and_then(parse_coord);
            let (Some(lat), Some(lng)) = (lat, lng) else {
                skipped += 1;
                continue;
            };
            if !coordinates_valid(lat, lng) {
                skipped += 1;
                continue;
            }

            let category = row
                .category
                .as_deref()
                .map(IncidentCategory::parse)
                .unwrap_or(IncidentCategory::Other);

            let timestamp =
                parse_timestamp(row.date.as_deref(), row.time.as_deref()).unwrap_or(reference);
            if timestamp < cutoff {
                skipped += 1;
                continue;
            }

            records.push(IncidentRecord::new(lat, lng, category, timestamp));
        }

        tracing::info!(
            loaded = records.len(),
            skipped,
            "incident dataset loaded"
        );

        Ok(Self { records })
    }

    pub fn records(&self) -> &[IncidentRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Bounding box of the whole dataset, or `None` when empty.
    pub fn bounds(&self) -> Option<BoundingBox> {
        let first = self.records.first()?;
        let mut b = BoundingBox {
            lat_min: first.lat,
            lng_min: first.lng,
            lat_max: first.lat,
            lng_max: first.lng,
        };
        for r in &self.records[1..] {
            b.lat_min = b.lat_min.min(r.lat);
            b.lng_min = b.lng_min.min(r.lng);
            b.lat_max = b.lat_max.max(r.lat);
            b.lng_max = b.lng_max.max(r.lng);
        }
        Some(b)
    }

    /// Number of incidents within `radius_m` of a point.
    ///
    /// Cheap bounding-degree prefilter, then an exact haversine check.
    pub fn nearby_count(&self, lat: f64, lng: f64, radius_m: f64) -> u32 {
        let lat_margin = radius_m / 111_000.0;
        let lng_margin = radius_m / (111_000.0 * lat.to_radians().cos().abs().max(0.01));

        self.records
            .iter()
            .filter(|r| {
                (r.lat - lat).abs() <= lat_margin && (r.lng - lng).abs() <= lng_margin
            })
            .filter(|r| haversine_distance(lat, lng, r.lat, r.lng) <= radius_m)
            .count() as u32
    }
}

fn coordinates_valid(lat: f64, lng: f64) -> bool {
    lat.is_finite()
        && lng.is_finite()
        && lat != 0.0
        && lng != 0.0
        && (-90.0..=90.0).contains(&lat)
        && (-180.0..=180.0).contains(&lng)
}

fn parse_coord(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok()
}

fn parse_timestamp(date: Option<&str>, time: Option<&str>) -> Option<DateTime<Utc>> {
    let date = date?.trim();
    let date = NaiveDate::parse_from_str(date, "%Y/%m/%d")
        .or_else(|_| NaiveDate::parse_from_str(date, "%Y-%m-%d"))
        .ok()?;
    // Rows without a parseable time land at midday so the night flag
    // stays false.
    let datetime = match time.and_then(|t| NaiveTime::parse_from_str(t.trim(), "%H:%M").ok()) {
        Some(t) => date.and_time(t),
        None => date.and_hms_opt(12, 0, 0)?,
    };
    Some(datetime.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(lat: f64, lng: f64) -> IncidentRecord {
        IncidentRecord::new(
            lat,
            lng,
            IncidentCategory::Theft,
            "2025-06-01T13:00:00Z".parse().unwrap(),
        )
    }

    #[test]
    fn invalid_coordinates_are_dropped() {
        let store = IncidentStore::from_records(vec![
            record(37.78, -122.41),
            record(0.0, 0.0),
            record(f64::NAN, -122.41),
            record(91.0, -122.41),
        ]);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn nearby_count_respects_radius() {
        let base = (37.78, -122.41);
        let store = IncidentStore::from_records(vec![
            record(base.0, base.1),
            record(base.0 + 0.0004, base.1), // ~44m north
            record(base.0 + 0.01, base.1),   // ~1.1km north
        ]);

        assert_eq!(store.nearby_count(base.0, base.1, 100.0), 2);
        assert_eq!(store.nearby_count(base.0, base.1, 10.0), 1);
    }

    #[test]
    fn bounds_cover_all_records() {
        let store = IncidentStore::from_records(vec![
            record(37.70, -122.50),
            record(37.80, -122.40),
        ]);
        let b = store.bounds().unwrap();
        assert_eq!(b.lat_min, 37.70);
        assert_eq!(b.lat_max, 37.80);
        assert_eq!(b.lng_min, -122.50);
        assert_eq!(b.lng_max, -122.40);
    }

    #[test]
    fn csv_load_filters_and_parses() {
        let csv_data = "\
Incident Date,Incident Time,Incident Category,Latitude,Longitude
2025/06/01,23:15,Robbery,37.7800,-122.4100
2025/06/02,12:00,Larceny Theft,37.7810,-122.4110
2025/06/03,08:00,Assault,,
2010/01/01,09:00,Burglary,37.7820,-122.4120
";
        let dir = std::env::temp_dir().join("safepath-incidents-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("sample.csv");
        std::fs::write(&path, csv_data).unwrap();

        let reference = "2025-07-01T00:00:00Z".parse().unwrap();
        let store =
            IncidentStore::load_from_csv(&path, reference, &RouterConfig::default()).unwrap();

        // The empty-coordinate row and the decade-old row are gone.
        assert_eq!(store.len(), 2);
        assert!(store.records()[0].is_night);
        assert_eq!(store.records()[1].category, IncidentCategory::Theft);
    }
}
