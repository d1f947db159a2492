//! Index structures held by [`MemoryStore`](super::MemoryStore).
//!
//! Every record lives in four places at once so each approach can use the
//! access path it is named after:
//!
//! ```text
//! SpatialIndexes
//! ├─ points:         Vec<IndexedPoint>          full scans
//! ├─ rtree:          RTree<IndexedPoint>        envelope probes, knn
//! ├─ kdtree:         KdTree<f64, 2>             radius probes (keys unique per axis)
//! └─ geohash_counts: BTreeMap<String, usize>    prefix range scans
//! ```

use super::queries::{STORED_GEOHASH_PRECISION, degree_envelope};
use super::{StoreError, StoreResult};
use crate::types::Coordinate;
use kiddo::{KdTree, SquaredEuclidean};
use rstar::{AABB, Point as RstarPoint, RTree};
use rustc_hash::FxHashSet;
use std::collections::BTreeMap;

/// A stored record: longitude as `x`, latitude as `y`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexedPoint {
    pub x: f64,
    pub y: f64,
    pub id: u64,
}

impl IndexedPoint {
    pub fn new(x: f64, y: f64, id: u64) -> Self {
        Self { x, y, id }
    }

    /// Query-side point with no record id.
    pub fn probe(coordinate: &Coordinate) -> Self {
        Self::new(coordinate.longitude, coordinate.latitude, 0)
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.y, self.x)
    }
}

impl RstarPoint for IndexedPoint {
    type Scalar = f64;
    const DIMENSIONS: usize = 2;

    fn generate(mut generator: impl FnMut(usize) -> Self::Scalar) -> Self {
        Self {
            x: generator(0),
            y: generator(1),
            id: 0,
        }
    }

    fn nth(&self, index: usize) -> Self::Scalar {
        match index {
            0 => self.x,
            1 => self.y,
            _ => unreachable!(),
        }
    }

    fn nth_mut(&mut self, index: usize) -> &mut Self::Scalar {
        match index {
            0 => &mut self.x,
            1 => &mut self.y,
            _ => unreachable!(),
        }
    }
}

pub struct SpatialIndexes {
    points: Vec<IndexedPoint>,
    rtree: RTree<IndexedPoint>,
    kdtree: KdTree<f64, 2>,
    /// Bit patterns already used as k-d keys, per axis.
    kd_axis_keys: [FxHashSet<u64>; 2],
    geohash_counts: BTreeMap<String, usize>,
}

impl SpatialIndexes {
    pub fn new() -> Self {
        Self {
            points: Vec::new(),
            rtree: RTree::new(),
            kdtree: KdTree::new(),
            kd_axis_keys: [FxHashSet::default(), FxHashSet::default()],
            geohash_counts: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Add a batch of records to every index.
    ///
    /// Geohashes are validated before anything is written, so a failing
    /// batch leaves the indexes untouched.
    pub fn insert_batch(&mut self, coordinates: &[Coordinate]) -> StoreResult<()> {
        let hashes = coordinates
            .iter()
            .map(|c| {
                let coord = geohash::Coord {
                    x: c.longitude,
                    y: c.latitude,
                };
                geohash::encode(coord, STORED_GEOHASH_PRECISION)
                    .map_err(|e| StoreError::Backend(format!("geohash encode failed: {e}")))
            })
            .collect::<StoreResult<Vec<_>>>()?;

        let first_id = self.points.len() as u64;
        let batch: Vec<IndexedPoint> = coordinates
            .iter()
            .enumerate()
            .map(|(i, c)| IndexedPoint::new(c.longitude, c.latitude, first_id + i as u64))
            .collect();

        for point in &batch {
            let key = self.kd_key(point);
            self.kdtree.add(&key, point.id);
        }

        if self.rtree.size() == 0 {
            self.rtree = RTree::bulk_load(batch.clone());
        } else {
            for point in &batch {
                self.rtree.insert(*point);
            }
        }

        for hash in hashes {
            *self.geohash_counts.entry(hash).or_insert(0) += 1;
        }

        self.points.extend(batch);
        Ok(())
    }

    /// k-d tree key for `point`.
    ///
    /// kiddo cannot split a bucket whose items all share the split-axis
    /// value, so a value already taken on an axis moves to the next
    /// representable float. The shift is a few ulps at most for realistic
    /// duplicate counts.
    fn kd_key(&mut self, point: &IndexedPoint) -> [f64; 2] {
        let mut key = [point.x, point.y];
        for (axis, value) in key.iter_mut().enumerate() {
            // -0.0 and 0.0 compare equal but differ in bits.
            *value += 0.0;
            while !self.kd_axis_keys[axis].insert(value.to_bits()) {
                *value = value.next_up();
            }
        }
        key
    }

    pub fn points(&self) -> &[IndexedPoint] {
        &self.points
    }

    /// Number of records whose geohash starts with `prefix`.
    pub fn geohash_prefix_count(&self, prefix: &str) -> usize {
        self.geohash_counts
            .range(prefix.to_string()..)
            .take_while(|(hash, _)| hash.starts_with(prefix))
            .map(|(_, count)| count)
            .sum()
    }

    /// Records inside the degree envelope around `center` for `radius` meters.
    pub fn envelope_candidates<'a>(
        &'a self,
        center: &Coordinate,
        radius: f64,
    ) -> impl Iterator<Item = &'a IndexedPoint> + 'a {
        let envelope: AABB<IndexedPoint> = degree_envelope(center, radius);
        self.rtree.locate_in_envelope_intersecting(&envelope)
    }

    /// Records nearest to `center` in planar degree space, closest first.
    pub fn nearest<'a>(
        &'a self,
        center: &Coordinate,
    ) -> impl Iterator<Item = &'a IndexedPoint> + 'a {
        self.rtree.nearest_neighbor_iter(&IndexedPoint::probe(center))
    }

    /// Number of records within `threshold` degrees of `center` (planar).
    pub fn kdtree_within(&self, center: &Coordinate, threshold: f64) -> usize {
        self.kdtree
            .within_unsorted::<SquaredEuclidean>(
                &[center.longitude, center.latitude],
                threshold * threshold,
            )
            .len()
    }
}

impl Default for SpatialIndexes {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coords() -> Vec<Coordinate> {
        vec![
            Coordinate::new(25.0, 85.0),
            Coordinate::new(25.001, 85.001),
            Coordinate::new(26.0, 86.0),
        ]
    }

    #[test]
    fn test_insert_batch_populates_all_indexes() {
        let mut indexes = SpatialIndexes::new();
        indexes.insert_batch(&coords()).unwrap();
        indexes.insert_batch(&coords()).unwrap();

        assert_eq!(indexes.len(), 6);
        assert_eq!(indexes.rtree.size(), 6);
        assert_eq!(indexes.geohash_counts.values().sum::<usize>(), 6);
        let ids: Vec<u64> = indexes.points().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_invalid_coordinate_leaves_indexes_untouched() {
        let mut indexes = SpatialIndexes::new();
        let bad = vec![Coordinate::new(25.0, 85.0), Coordinate::new(95.0, 85.0)];
        assert!(indexes.insert_batch(&bad).is_err());
        assert!(indexes.is_empty());
    }

    #[test]
    fn test_geohash_prefix_count() {
        let mut indexes = SpatialIndexes::new();
        indexes.insert_batch(&coords()).unwrap();

        let hash = geohash::encode(geohash::Coord { x: 85.0, y: 25.0 }, 4).unwrap();
        assert_eq!(indexes.geohash_prefix_count(&hash), 2);
        assert_eq!(indexes.geohash_prefix_count(""), 3);
        assert_eq!(indexes.geohash_prefix_count("zzzz"), 0);
    }

    #[test]
    fn test_clear() {
        let mut indexes = SpatialIndexes::new();
        indexes.insert_batch(&coords()).unwrap();
        indexes.clear();
        assert!(indexes.is_empty());
        assert_eq!(indexes.kdtree_within(&Coordinate::new(25.0, 85.0), 10.0), 0);
    }

    #[test]
    fn test_kdtree_accepts_identical_coordinates() {
        let mut indexes = SpatialIndexes::new();
        let same = vec![Coordinate::new(25.0, 85.0); 200];
        indexes.insert_batch(&same).unwrap();
        indexes.insert_batch(&same[..50]).unwrap();

        assert_eq!(indexes.len(), 250);
        assert_eq!(indexes.kdtree_within(&Coordinate::new(25.0, 85.0), 1e-9), 250);
        assert_eq!(indexes.kdtree_within(&Coordinate::new(25.1, 85.0), 1e-9), 0);
    }

    #[test]
    fn test_kdtree_accepts_shared_latitude() {
        let mut indexes = SpatialIndexes::new();
        let row: Vec<Coordinate> = (0..500)
            .map(|i| Coordinate::new(25.0, 85.0 + i as f64 * 1e-4))
            .collect();
        indexes.insert_batch(&row).unwrap();

        assert_eq!(indexes.kdtree_within(&Coordinate::new(25.0, 85.0), 0.00995), 100);
    }

    #[test]
    fn test_nearest_order() {
        let mut indexes = SpatialIndexes::new();
        indexes.insert_batch(&coords()).unwrap();
        let order: Vec<u64> = indexes
            .nearest(&Coordinate::new(25.0, 85.0))
            .map(|p| p.id)
            .collect();
        assert_eq!(order, vec![0, 1, 2]);
    }
}
