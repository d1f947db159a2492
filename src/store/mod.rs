//! Backing store abstraction.
//!
//! The harness never computes geometry itself. It talks to a
//! [`SpatialStore`], which owns the dataset and executes each named
//! approach. [`MemoryStore`] is the in-process implementation; tests and
//! other engines plug in through the same trait.

mod index;
mod memory;
mod queries;

pub use index::{IndexedPoint, SpatialIndexes};
pub use memory::MemoryStore;
pub use queries::{METERS_PER_DEGREE, STORED_GEOHASH_PRECISION};

use crate::approach::{Approach, ApproachQuery};
use crate::types::BoundingBox;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Approach '{0}' is not supported by this store")]
    Unsupported(Approach),
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    #[error("Backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// A spatial dataset that can be reset, filled with random records and
/// queried by approach name.
///
/// Mutating calls take `&mut self`; queries take `&self`, so every approach
/// in a trial observes the same committed dataset.
pub trait SpatialStore {
    /// Remove every record.
    fn clear_all(&mut self) -> StoreResult<()>;

    /// Insert `count` records drawn uniformly from `bbox`.
    fn insert_random(&mut self, count: usize, bbox: &BoundingBox) -> StoreResult<()>;

    /// Number of records currently stored.
    fn count(&self) -> StoreResult<usize>;

    /// Run one retrieval and return the number of rows it produced.
    fn execute(&self, approach: Approach, query: &ApproachQuery<'_>) -> StoreResult<usize>;
}

impl<S: SpatialStore + ?Sized> SpatialStore for Box<S> {
    fn clear_all(&mut self) -> StoreResult<()> {
        (**self).clear_all()
    }

    fn insert_random(&mut self, count: usize, bbox: &BoundingBox) -> StoreResult<()> {
        (**self).insert_random(count, bbox)
    }

    fn count(&self) -> StoreResult<usize> {
        (**self).count()
    }

    fn execute(&self, approach: Approach, query: &ApproachQuery<'_>) -> StoreResult<usize> {
        (**self).execute(approach, query)
    }
}
