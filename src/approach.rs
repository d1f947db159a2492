//! Named retrieval strategies and the runner that times them.
//!
//! An approach is stateless: it is a name plus the parameters it reads from
//! [`ApproachQuery`]. The store decides how to execute it; the runner only
//! measures one call and turns the outcome into an [`ApproachResult`].

use crate::clock::Clock;
use crate::error::BenchError;
use crate::store::SpatialStore;
use crate::types::{ApproachResult, Coordinate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Every retrieval strategy the harness knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Approach {
    /// Geohash prefix match
    Geohash,
    /// Planar distance in degree space
    Euclidean,
    /// Great-circle distance
    Haversine,
    /// Density clustering of points near the query set
    Dbscan,
    /// k nearest neighbors per query point
    Knn,
    /// R-tree bounding box probe
    RTree,
    /// k-d tree radius probe
    KdTree,
    /// Indexed ellipsoidal distance
    PostgisNative,
}

impl Approach {
    pub const ALL: [Approach; 8] = [
        Approach::Geohash,
        Approach::Euclidean,
        Approach::Haversine,
        Approach::Dbscan,
        Approach::Knn,
        Approach::RTree,
        Approach::KdTree,
        Approach::PostgisNative,
    ];

    /// The approaches enabled when no selection is configured.
    pub const DEFAULT: [Approach; 5] = [
        Approach::Geohash,
        Approach::Euclidean,
        Approach::Haversine,
        Approach::Dbscan,
        Approach::Knn,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Approach::Geohash => "geohash",
            Approach::Euclidean => "euclidean",
            Approach::Haversine => "haversine",
            Approach::Dbscan => "dbscan",
            Approach::Knn => "knn",
            Approach::RTree => "r-tree",
            Approach::KdTree => "kd-tree",
            Approach::PostgisNative => "postgis-native",
        }
    }
}

impl fmt::Display for Approach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Approach {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Approach::ALL
            .into_iter()
            .find(|a| a.name() == normalized)
            .ok_or_else(|| {
                BenchError::config(format!(
                    "unknown approach '{}' (expected one of: {})",
                    s,
                    Approach::ALL.map(Approach::name).join(", ")
                ))
            })
    }
}

/// Inputs shared by every approach in a trial.
#[derive(Debug, Clone, Copy)]
pub struct ApproachQuery<'a> {
    pub coordinates: &'a [Coordinate],
    /// Radius in meters
    pub radius: f64,
    pub k: usize,
    pub min_points: usize,
}

/// Times a single approach against the currently prepared dataset.
#[derive(Debug, Clone, Copy)]
pub struct ApproachRunner {
    approach: Approach,
}

impl ApproachRunner {
    pub fn new(approach: Approach) -> Self {
        Self { approach }
    }

    pub fn approach(&self) -> Approach {
        self.approach
    }

    /// Run the approach once.
    ///
    /// The timer brackets exactly the store call, so failures still carry
    /// the time spent before the store gave up.
    pub fn run<S, C>(&self, store: &S, query: &ApproachQuery<'_>, clock: &C) -> ApproachResult
    where
        S: SpatialStore + ?Sized,
        C: Clock + ?Sized,
    {
        let start = clock.now();
        let outcome = store.execute(self.approach, query);
        let elapsed = clock.now().saturating_sub(start);
        let time_taken_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);

        match outcome {
            Ok(rows) => ApproachResult::found(self.approach, time_taken_ms, rows as u64),
            Err(source) => {
                log::warn!(
                    "{}",
                    BenchError::Approach {
                        approach: self.approach,
                        source: source.clone(),
                    }
                );
                ApproachResult::failed(self.approach, time_taken_ms, source.to_string())
            }
        }
    }
}
