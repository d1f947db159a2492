//! Retrieval algorithms executed by [`MemoryStore`](super::MemoryStore).
//!
//! Each function returns a row count with join semantics: a record that
//! matches several query coordinates is counted once per coordinate.

use super::index::{IndexedPoint, SpatialIndexes};
use super::{StoreError, StoreResult};
use crate::types::Coordinate;
use geo::{Distance, Geodesic, Haversine, HaversineMeasure, Point};
use rstar::{AABB, RTree};
use rustc_hash::FxHashMap;

/// Meters per degree used by the planar approaches.
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// Geohash length stored with every record.
pub const STORED_GEOHASH_PRECISION: usize = 8;

/// Slack applied to envelopes before an exact distance refinement, so the
/// box never clips points the ellipsoidal metric still accepts.
const ENVELOPE_SLACK: f64 = 1.01;

/// Degree-space AABB around `center` that contains every point within
/// `radius` meters on the sphere.
pub(crate) fn degree_envelope(center: &Coordinate, radius: f64) -> AABB<IndexedPoint> {
    let earth_radius = HaversineMeasure::GRS80_MEAN_RADIUS.radius();
    let lat_degrees = (radius / earth_radius).to_degrees();
    let cos_lat = center.latitude.to_radians().cos();

    let lon_degrees = if cos_lat > f64::EPSILON {
        (radius / (earth_radius * cos_lat)).to_degrees()
    } else {
        180.0
    };

    let min_corner = IndexedPoint::new(
        center.longitude - lon_degrees,
        center.latitude - lat_degrees,
        0,
    );
    let max_corner = IndexedPoint::new(
        center.longitude + lon_degrees,
        center.latitude + lat_degrees,
        0,
    );
    AABB::from_corners(min_corner, max_corner)
}

#[inline]
fn planar_threshold(radius: f64) -> f64 {
    radius / METERS_PER_DEGREE
}

#[inline]
fn haversine(a: &Coordinate, b: &IndexedPoint) -> f64 {
    Haversine.distance(a.to_point(), Point::new(b.x, b.y))
}

/// Geohash prefix match: encode every query coordinate at `precision` and
/// count records whose stored geohash starts with that prefix.
pub(crate) fn geohash_prefix(
    indexes: &SpatialIndexes,
    coordinates: &[Coordinate],
    precision: usize,
) -> StoreResult<usize> {
    let mut rows = 0;
    for c in coordinates {
        let coord = geohash::Coord {
            x: c.longitude,
            y: c.latitude,
        };
        let prefix = geohash::encode(coord, precision)
            .map_err(|e| StoreError::InvalidQuery(format!("cannot geohash {c:?}: {e}")))?;
        rows += indexes.geohash_prefix_count(&prefix);
    }
    Ok(rows)
}

/// Full scan with `(Δlat)² + (Δlon)² <= (radius / 111320)²`.
pub(crate) fn euclidean_scan(
    indexes: &SpatialIndexes,
    coordinates: &[Coordinate],
    radius: f64,
) -> usize {
    let threshold = planar_threshold(radius);
    let threshold_sq = threshold * threshold;

    coordinates
        .iter()
        .map(|c| {
            indexes
                .points()
                .iter()
                .filter(|p| {
                    let d_lat = p.y - c.latitude;
                    let d_lon = p.x - c.longitude;
                    d_lat * d_lat + d_lon * d_lon <= threshold_sq
                })
                .count()
        })
        .sum()
}

/// Full scan with great-circle distance.
pub(crate) fn haversine_scan(
    indexes: &SpatialIndexes,
    coordinates: &[Coordinate],
    radius: f64,
) -> usize {
    coordinates
        .iter()
        .map(|c| {
            indexes
                .points()
                .iter()
                .filter(|p| haversine(c, p) <= radius)
                .count()
        })
        .sum()
}

/// Records within `radius` of each query coordinate, found through the
/// R-tree and refined by great-circle distance. Duplicates are kept.
fn haversine_candidates(
    indexes: &SpatialIndexes,
    coordinates: &[Coordinate],
    radius: f64,
) -> Vec<IndexedPoint> {
    coordinates
        .iter()
        .flat_map(|c| {
            indexes
                .envelope_candidates(c, radius * ENVELOPE_SLACK)
                .filter(move |p| haversine(c, p) <= radius)
                .copied()
        })
        .collect()
}

/// Density clustering over the records near the query set.
///
/// Returns the number of rows that received a cluster id; noise is dropped.
pub(crate) fn dbscan(
    indexes: &SpatialIndexes,
    coordinates: &[Coordinate],
    radius: f64,
    min_points: usize,
) -> usize {
    let candidates = haversine_candidates(indexes, coordinates, radius);
    cluster_labels(&candidates, radius, min_points)
        .iter()
        .filter(|label| label.is_some())
        .count()
}

/// DBSCAN labels for `points` with `eps` in meters. A point is core when
/// its eps-neighborhood, itself included, holds at least `min_points`
/// points. Border points join the first cluster that reaches them.
pub(crate) fn cluster_labels(
    points: &[IndexedPoint],
    eps: f64,
    min_points: usize,
) -> Vec<Option<usize>> {
    // Re-key by position so duplicates stay distinct.
    let local: Vec<IndexedPoint> = points
        .iter()
        .enumerate()
        .map(|(i, p)| IndexedPoint::new(p.x, p.y, i as u64))
        .collect();
    let tree = RTree::bulk_load(local.clone());

    let neighbors = |p: &IndexedPoint| -> Vec<usize> {
        let center = p.coordinate();
        let envelope = degree_envelope(&center, eps * ENVELOPE_SLACK);
        tree.locate_in_envelope_intersecting(&envelope)
            .filter(|q| haversine(&center, q) <= eps)
            .map(|q| q.id as usize)
            .collect()
    };

    let mut labels: Vec<Option<usize>> = vec![None; local.len()];
    let mut visited = vec![false; local.len()];
    let mut next_cluster = 0;

    for start in 0..local.len() {
        if visited[start] {
            continue;
        }
        visited[start] = true;

        let seeds = neighbors(&local[start]);
        if seeds.len() < min_points {
            continue;
        }

        let cluster = next_cluster;
        next_cluster += 1;
        labels[start] = Some(cluster);

        let mut queue = seeds;
        while let Some(idx) = queue.pop() {
            if labels[idx].is_none() {
                labels[idx] = Some(cluster);
            }
            if visited[idx] {
                continue;
            }
            visited[idx] = true;

            let expansion = neighbors(&local[idx]);
            if expansion.len() >= min_points {
                queue.extend(expansion);
            }
        }
    }

    labels
}

/// The `k` nearest records per distinct query coordinate, ordered by planar
/// degree distance.
///
/// Identical query coordinates share one partition that holds every
/// record once per copy, so a coordinate given `m` times yields
/// `min(k, m * volume)` rows.
pub(crate) fn knn(indexes: &SpatialIndexes, coordinates: &[Coordinate], k: usize) -> usize {
    let mut partitions: FxHashMap<(u64, u64), (Coordinate, usize)> = FxHashMap::default();
    for c in coordinates {
        partitions
            .entry((c.latitude.to_bits(), c.longitude.to_bits()))
            .or_insert((*c, 0))
            .1 += 1;
    }

    partitions
        .values()
        .map(|(c, copies)| (indexes.nearest(c).take(k).count() * copies).min(k))
        .sum()
}

/// R-tree envelope probe without refinement: the bounding box that covers
/// `radius` around each coordinate.
pub(crate) fn rtree_probe(
    indexes: &SpatialIndexes,
    coordinates: &[Coordinate],
    radius: f64,
) -> usize {
    coordinates
        .iter()
        .map(|c| indexes.envelope_candidates(c, radius).count())
        .sum()
}

/// k-d tree radius probe in planar degree space.
pub(crate) fn kdtree_probe(
    indexes: &SpatialIndexes,
    coordinates: &[Coordinate],
    radius: f64,
) -> usize {
    let threshold = planar_threshold(radius);
    coordinates
        .iter()
        .map(|c| indexes.kdtree_within(c, threshold))
        .sum()
}

/// Indexed ellipsoidal distance: R-tree prefilter, geodesic refinement.
pub(crate) fn geodesic_within(
    indexes: &SpatialIndexes,
    coordinates: &[Coordinate],
    radius: f64,
) -> usize {
    coordinates
        .iter()
        .map(|c| {
            let center = c.to_point();
            indexes
                .envelope_candidates(c, radius * ENVELOPE_SLACK)
                .filter(|p| Geodesic.distance(center, Point::new(p.x, p.y)) <= radius)
                .count()
        })
        .sum()
}
