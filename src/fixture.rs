//! Dataset preparation for a trial.
use crate::error::{BenchError, Result};
use crate::store::{SpatialStore, StoreError};
use crate::types::BoundingBox;

/// Resets the store to exactly `volume` fresh random records.
#[derive(Debug, Clone, Copy)]
pub struct DatasetFixture {
    dataset_box: BoundingBox,
}

impl DatasetFixture {
    pub fn new(dataset_box: BoundingBox) -> Self {
        Self { dataset_box }
    }

    pub fn dataset_box(&self) -> &BoundingBox {
        &self.dataset_box
    }

    /// Clear, insert and verify. Returns only once the dataset is fully
    /// committed; any failure is scoped to the trial being prepared.
    pub fn prepare<S>(&self, store: &mut S, volume: usize) -> Result<()>
    where
        S: SpatialStore + ?Sized,
    {
        let fixture_err = |source: StoreError| BenchError::Fixture { volume, source };

        store.clear_all().map_err(fixture_err)?;
        store
            .insert_random(volume, &self.dataset_box)
            .map_err(fixture_err)?;

        let stored = store.count().map_err(fixture_err)?;
        if stored != volume {
            return Err(fixture_err(StoreError::Backend(format!(
                "expected {volume} records after insert, found {stored}"
            ))));
        }

        log::debug!("Prepared dataset with {} records", stored);
        Ok(())
    }
}
