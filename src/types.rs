//! Data model shared by the generator, orchestrator and report.
//!
//! Everything here is created fresh per run. Only the rendered report
//! outlives the process.
use crate::approach::Approach;
use crate::error::{BenchError, Result};
use geo::Point;
use serde::{Deserialize, Serialize};

/// Rectangular geographic area in degrees.
///
/// No antimeridian wraparound: `east` must be greater than `west`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl BoundingBox {
    /// Create a validated bounding box.
    ///
    /// # Examples
    ///
    /// ```
    /// use spatio_bench::BoundingBox;
    ///
    /// let bbox = BoundingBox::new(30.42, 26.35, 88.20, 80.06).unwrap();
    /// assert!(BoundingBox::new(10.0, 20.0, 5.0, 0.0).is_err());
    /// ```
    pub fn new(north: f64, south: f64, east: f64, west: f64) -> Result<Self> {
        let bbox = Self {
            north,
            south,
            east,
            west,
        };
        bbox.validate()?;
        Ok(bbox)
    }

    /// Bounds used for query coordinates by default (Nepal).
    pub const fn nepal() -> Self {
        Self {
            north: 30.42271698660863,
            south: 26.347,
            east: 88.20152567091282,
            west: 80.05858693736828,
        }
    }

    /// Bounds used for synthetic dataset records by default (Bihar).
    pub const fn bihar() -> Self {
        Self {
            north: 27.52,
            south: 24.28,
            east: 88.29,
            west: 83.32,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let values = [self.north, self.south, self.east, self.west];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(BenchError::invalid(format!(
                "bounding box has non-finite bounds: {:?}",
                self
            )));
        }
        if !(-90.0..=90.0).contains(&self.south) || !(-90.0..=90.0).contains(&self.north) {
            return Err(BenchError::invalid(format!(
                "latitude bounds must lie within [-90, 90]: south={}, north={}",
                self.south, self.north
            )));
        }
        if !(-180.0..=180.0).contains(&self.west) || !(-180.0..=180.0).contains(&self.east) {
            return Err(BenchError::invalid(format!(
                "longitude bounds must lie within [-180, 180]: west={}, east={}",
                self.west, self.east
            )));
        }
        if self.north <= self.south {
            return Err(BenchError::invalid(format!(
                "north ({}) must be greater than south ({})",
                self.north, self.south
            )));
        }
        if self.east <= self.west {
            return Err(BenchError::invalid(format!(
                "east ({}) must be greater than west ({})",
                self.east, self.west
            )));
        }
        Ok(())
    }

    pub fn height(&self) -> f64 {
        self.north - self.south
    }

    pub fn width(&self) -> f64 {
        self.east - self.west
    }

    /// Inclusive containment check on both axes.
    pub fn contains(&self, coordinate: &Coordinate) -> bool {
        coordinate.latitude >= self.south
            && coordinate.latitude <= self.north
            && coordinate.longitude >= self.west
            && coordinate.longitude <= self.east
    }
}

/// A `(latitude, longitude)` pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Convert to a `geo::Point` (x = longitude, y = latitude).
    pub fn to_point(self) -> Point {
        Point::new(self.longitude, self.latitude)
    }
}

impl From<Coordinate> for Point {
    fn from(c: Coordinate) -> Self {
        c.to_point()
    }
}

/// Parameters of a single trial.
///
/// A trial is identified by `(volume, point_set_size, radius)`; `k` and
/// `min_points` stay fixed for a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrialParameters {
    pub volume: usize,
    pub point_set_size: usize,
    /// Search radius in meters
    pub radius: f64,
    pub k: usize,
    pub min_points: usize,
}

/// Outcome of one approach within one trial.
///
/// Exactly one of `records_found` and `error` is set. The elapsed time is
/// always present because the timer starts before the store is called.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApproachResult {
    pub approach: Approach,
    pub time_taken_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records_found: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApproachResult {
    pub fn found(approach: Approach, time_taken_ms: u64, records_found: u64) -> Self {
        Self {
            approach,
            time_taken_ms,
            records_found: Some(records_found),
            error: None,
        }
    }

    pub fn failed(approach: Approach, time_taken_ms: u64, error: impl Into<String>) -> Self {
        Self {
            approach,
            time_taken_ms,
            records_found: None,
            error: Some(error.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Results of every enabled approach for one trial, in run order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrialResult {
    results: Vec<ApproachResult>,
}

impl TrialResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: ApproachResult) {
        self.results.push(result);
    }

    pub fn get(&self, approach: Approach) -> Option<&ApproachResult> {
        self.results.iter().find(|r| r.approach == approach)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ApproachResult> {
        self.results.iter()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Whether a trial reached its approaches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialOutcome {
    Completed(TrialResult),
    /// Dataset preparation failed; no approach ran.
    FixtureFailed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialEntry {
    pub params: TrialParameters,
    pub outcome: TrialOutcome,
}

impl TrialEntry {
    pub fn results(&self) -> Option<&TrialResult> {
        match &self.outcome {
            TrialOutcome::Completed(results) => Some(results),
            TrialOutcome::FixtureFailed(_) => None,
        }
    }
}

/// How trial headers identify a trial in the rendered report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HeaderStyle {
    /// Point size, volume and radius
    #[default]
    Full,
    /// Volume only
    VolumeOnly,
}

/// Ordered trial results, exactly as the orchestrator produced them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub header_style: HeaderStyle,
    pub trials: Vec<TrialEntry>,
}

impl BenchmarkReport {
    pub fn new(header_style: HeaderStyle) -> Self {
        Self {
            header_style,
            trials: Vec::new(),
        }
    }

    pub fn push(&mut self, entry: TrialEntry) {
        self.trials.push(entry);
    }

    pub fn len(&self) -> usize {
        self.trials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
