//! Uniform spatial grid mapping coordinates to incident-derived safety
//! scores.

use crate::error::RouteError;
use crate::incidents::IncidentStore;
use crate::models::BoundingBox;

/// Score assigned to a cell with no recorded incidents. "No known
/// incidents" is treated as safe-ish, not as maximum safety: the data
/// only covers reported events.
pub const NO_INCIDENT_SCORE: f64 = 85.0;

/// Floor for incident-derived scores.
pub const MIN_INCIDENT_SCORE: f64 = 20.0;

/// Piecewise-linear incident-count curve: monotonically decreasing with
/// diminishing marginal penalty. Counts above the last breakpoint lose
/// 2 points each down to [`MIN_INCIDENT_SCORE`].
const DENSITY_CURVE: [(f64, f64); 6] = [
    (0.0, 85.0),
    (1.0, 80.0),
    (2.0, 75.0),
    (3.0, 70.0),
    (5.0, 61.0),
    (10.0, 45.0),
];

#[derive(Debug, Clone, Copy, Default)]
struct CellStats {
    count: u32,
    night_count: u32,
    severity_sum: u32,
}

/// Read-only safety grid over a bounding box.
///
/// Built once per query region and never mutated afterwards; concurrent
/// strategy searches share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct SafetyGrid {
    bounds: BoundingBox,
    lat_step: f64,
    lng_step: f64,
    rows: usize,
    cols: usize,
    cells: Vec<CellStats>,
    total_incidents: u32,
}

impl SafetyGrid {
    /// Bucket every in-bounds incident into a uniform grid.
    ///
    /// Cell `(i, j)` covers `[lat_min + i*step, lat_min + (i+1)*step)`.
    /// Fails with `EmptyDataset` only if zero valid incidents fall in
    /// bounds; callers degrade to a neutral uniform score in that case.
    pub fn build(
        store: &IncidentStore,
        bounds: BoundingBox,
        cell_size_m: f64,
    ) -> Result<Self, RouteError> {
        let cell_size_m = cell_size_m.max(10.0);
        let lat_step = cell_size_m / 111_000.0;
        let lng_step =
            cell_size_m / (111_000.0 * bounds.mean_lat().to_radians().cos().abs().max(0.01));

        let rows = (((bounds.lat_max - bounds.lat_min) / lat_step).ceil() as usize).max(1);
        let cols = (((bounds.lng_max - bounds.lng_min) / lng_step).ceil() as usize).max(1);

        let mut cells = vec![CellStats::default(); rows * cols];
        let mut total = 0u32;

        for record in store.records() {
            if !bounds.contains(record.lat, record.lng) {
                continue;
            }
            let i = ((record.lat - bounds.lat_min) / lat_step) as usize;
            let j = ((record.lng - bounds.lng_min) / lng_step) as usize;
            // Floating edge effects can push an in-bounds point one cell
            // past the last row or column; such points are dropped.
            if i >= rows || j >= cols {
                continue;
            }
            let cell = &mut cells[i * cols + j];
            cell.count += 1;
            cell.severity_sum += u32::from(record.severity);
            if record.is_night {
                cell.night_count += 1;
            }
            total += 1;
        }

        if total == 0 {
            return Err(RouteError::EmptyDataset);
        }

        tracing::debug!(rows, cols, incidents = total, "safety grid built");

        Ok(Self {
            bounds,
            lat_step,
            lng_step,
            rows,
            cols,
            cells,
            total_incidents: total,
        })
    }

    /// Safety score for a coordinate, always in [0, 100].
    ///
    /// Coordinates outside the bounds map to the clamped edge cell. The
    /// base curve depends only on incident count; night-heavy and
    /// high-severity cells lose a few extra points inside the same
    /// [20, 85] envelope.
    pub fn score(&self, lat: f64, lng: f64) -> f64 {
        let cell = self.cell_at(lat, lng);
        if cell.count == 0 {
            return NO_INCIDENT_SCORE;
        }

        let mut score = density_score(cell.count);

        let night_frac = f64::from(cell.night_count) / f64::from(cell.count);
        score -= 5.0 * night_frac;

        let mean_severity = f64::from(cell.severity_sum) / f64::from(cell.count);
        score -= 3.0 * ((mean_severity - 1.0) / 9.0).clamp(0.0, 1.0);

        score.clamp(MIN_INCIDENT_SCORE, NO_INCIDENT_SCORE)
    }

    /// Incident count of the owning cell.
    pub fn cell_count(&self, lat: f64, lng: f64) -> u32 {
        self.cell_at(lat, lng).count
    }

    pub fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }

    pub fn total_incidents(&self) -> u32 {
        self.total_incidents
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    fn cell_at(&self, lat: f64, lng: f64) -> &CellStats {
        let i = ((lat - self.bounds.lat_min) / self.lat_step)
            .floor()
            .clamp(0.0, (self.rows - 1) as f64) as usize;
        let j = ((lng - self.bounds.lng_min) / self.lng_step)
            .floor()
            .clamp(0.0, (self.cols - 1) as f64) as usize;
        &self.cells[i * self.cols + j]
    }
}

fn density_score(count: u32) -> f64 {
    let c = f64::from(count);
    let (last_count, last_score) = DENSITY_CURVE[DENSITY_CURVE.len() - 1];
    if c >= last_count {
        return (last_score - 2.0 * (c - last_count)).max(MIN_INCIDENT_SCORE);
    }
    for pair in DENSITY_CURVE.windows(2) {
        let (c0, s0) = pair[0];
        let (c1, s1) = pair[1];
        if c <= c1 {
            return s0 + (s1 - s0) * (c - c0) / (c1 - c0);
        }
    }
    last_score
}

/// Cache key for built grids: the bounding box quantized to millidegrees.
///
/// Two requests whose expanded boxes round to the same key share one
/// grid; invalidation happens by clearing the cache on dataset reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridKey {
    lat_min_milli: i32,
    lng_min_milli: i32,
    lat_max_milli: i32,
    lng_max_milli: i32,
}

impl GridKey {
    pub fn from_bounds(bounds: &BoundingBox) -> Self {
        Self {
            lat_min_milli: (bounds.lat_min * 1000.0).round() as i32,
            lng_min_milli: (bounds.lng_min * 1000.0).round() as i32,
            lat_max_milli: (bounds.lat_max * 1000.0).round() as i32,
            lng_max_milli: (bounds.lng_max * 1000.0).round() as i32,
        }
    }
}
