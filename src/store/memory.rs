//! In-process spatial store.
use super::index::SpatialIndexes;
use super::queries;
use super::{SpatialStore, StoreError, StoreResult};
use crate::approach::{Approach, ApproachQuery};
use crate::generator::CoordinateGenerator;
use crate::types::BoundingBox;

/// Default prefix length for the geohash approach.
pub const DEFAULT_GEOHASH_PRECISION: usize = 4;

/// A spatial table held in memory, indexed for every [`Approach`].
///
/// ```
/// use spatio_bench::{Approach, ApproachQuery, BoundingBox, Coordinate, MemoryStore, SpatialStore};
///
/// let mut store = MemoryStore::seeded(1);
/// store.insert_random(1_000, &BoundingBox::bihar())?;
///
/// let coords = [Coordinate::new(25.6, 85.1)];
/// let query = ApproachQuery { coordinates: &coords, radius: 5_000.0, k: 10, min_points: 3 };
/// assert_eq!(store.execute(Approach::Knn, &query)?, 10);
/// # Ok::<(), spatio_bench::StoreError>(())
/// ```
pub struct MemoryStore {
    indexes: SpatialIndexes,
    generator: CoordinateGenerator,
    geohash_precision: usize,
    disabled: Vec<Approach>,
}

impl MemoryStore {
    /// Store whose random records come from OS entropy.
    pub fn new() -> Self {
        Self::with_generator(CoordinateGenerator::from_entropy())
    }

    /// Store whose random records are reproducible.
    pub fn seeded(seed: u64) -> Self {
        Self::with_generator(CoordinateGenerator::seeded(seed))
    }

    pub fn with_generator(generator: CoordinateGenerator) -> Self {
        Self {
            indexes: SpatialIndexes::new(),
            generator,
            geohash_precision: DEFAULT_GEOHASH_PRECISION,
            disabled: Vec::new(),
        }
    }

    /// Set the geohash prefix length used by [`Approach::Geohash`].
    ///
    /// # Panics
    ///
    /// Panics if precision is not in range 1-12.
    pub fn with_geohash_precision(mut self, precision: usize) -> Self {
        assert!(
            (1..=12).contains(&precision),
            "Geohash precision must be between 1 and 12"
        );
        self.geohash_precision = precision;
        self
    }

    /// Refuse to execute `approach`, as an engine without that capability would.
    pub fn without(mut self, approach: Approach) -> Self {
        if !self.disabled.contains(&approach) {
            self.disabled.push(approach);
        }
        self
    }

    pub fn geohash_precision(&self) -> usize {
        self.geohash_precision
    }

    pub fn indexes(&self) -> &SpatialIndexes {
        &self.indexes
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_query(query: &ApproachQuery<'_>) -> StoreResult<()> {
    if !query.radius.is_finite() || query.radius < 0.0 {
        return Err(StoreError::InvalidQuery(format!(
            "radius must be a non-negative number of meters, got {}",
            query.radius
        )));
    }
    if let Some(c) = query
        .coordinates
        .iter()
        .find(|c| !c.latitude.is_finite() || !c.longitude.is_finite())
    {
        return Err(StoreError::InvalidQuery(format!(
            "non-finite query coordinate {c:?}"
        )));
    }
    Ok(())
}

impl SpatialStore for MemoryStore {
    fn clear_all(&mut self) -> StoreResult<()> {
        log::debug!("Clearing {} records", self.indexes.len());
        self.indexes.clear();
        Ok(())
    }

    fn insert_random(&mut self, count: usize, bbox: &BoundingBox) -> StoreResult<()> {
        bbox.validate().map_err(|e| StoreError::Backend(e.to_string()))?;
        let coordinates = self.generator.generate(count, bbox);
        self.indexes.insert_batch(&coordinates)?;
        log::debug!(
            "Inserted {} random records (total {})",
            count,
            self.indexes.len()
        );
        Ok(())
    }

    fn count(&self) -> StoreResult<usize> {
        Ok(self.indexes.len())
    }

    fn execute(&self, approach: Approach, query: &ApproachQuery<'_>) -> StoreResult<usize> {
        if self.disabled.contains(&approach) {
            return Err(StoreError::Unsupported(approach));
        }
        validate_query(query)?;

        let indexes = &self.indexes;
        let coords = query.coordinates;
        let rows = match approach {
            Approach::Geohash => queries::geohash_prefix(indexes, coords, self.geohash_precision)?,
            Approach::Euclidean => queries::euclidean_scan(indexes, coords, query.radius),
            Approach::Haversine => queries::haversine_scan(indexes, coords, query.radius),
            Approach::Dbscan => queries::dbscan(indexes, coords, query.radius, query.min_points),
            Approach::Knn => queries::knn(indexes, coords, query.k),
            Approach::RTree => queries::rtree_probe(indexes, coords, query.radius),
            Approach::KdTree => queries::kdtree_probe(indexes, coords, query.radius),
            Approach::PostgisNative => queries::geodesic_within(indexes, coords, query.radius),
        };

        log::debug!("{} returned {} rows", approach, rows);
        Ok(rows)
    }
}
