//! Uniform random coordinates inside a bounding box.
use crate::error::{BenchError, Result};
use crate::types::{BoundingBox, Coordinate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Draws coordinates independently and uniformly from a [`BoundingBox`].
///
/// ```
/// use spatio_bench::{BoundingBox, CoordinateGenerator};
///
/// let mut generator = CoordinateGenerator::seeded(7);
/// let coords = generator.generate(3, &BoundingBox::nepal());
/// assert_eq!(coords.len(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct CoordinateGenerator {
    rng: StdRng,
}

impl CoordinateGenerator {
    /// Reproducible generator: the same seed yields the same sequence.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Seeded when `seed` is set, entropy-backed otherwise.
    pub fn with_seed(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::from_entropy, Self::seeded)
    }

    /// Generate exactly `count` coordinates. Duplicates are allowed.
    ///
    /// `latitude = south + u * (north - south)` and
    /// `longitude = west + u * (east - west)` with a fresh `u` in `[0, 1)`
    /// per axis.
    pub fn generate(&mut self, count: usize, bbox: &BoundingBox) -> Vec<Coordinate> {
        (0..count).map(|_| self.next_coordinate(bbox)).collect()
    }

    /// Like [`generate`](Self::generate) but for counts coming from signed
    /// input; negative counts are rejected.
    pub fn generate_signed(&mut self, count: i64, bbox: &BoundingBox) -> Result<Vec<Coordinate>> {
        let count = usize::try_from(count).map_err(|_| {
            BenchError::invalid(format!("coordinate count must be non-negative, got {count}"))
        })?;
        Ok(self.generate(count, bbox))
    }

    pub fn next_coordinate(&mut self, bbox: &BoundingBox) -> Coordinate {
        let u_lat: f64 = self.rng.random();
        let u_lon: f64 = self.rng.random();
        Coordinate::new(
            bbox.south + u_lat * bbox.height(),
            bbox.west + u_lon * bbox.width(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_box() -> BoundingBox {
        BoundingBox::new(1.0, -1.0, 2.0, 0.5).unwrap()
    }

    #[test]
    fn test_generate_exact_count_within_bounds() {
        let bbox = small_box();
        let mut generator = CoordinateGenerator::seeded(42);

        for count in [1, 10, 1_000] {
            let coords = generator.generate(count, &bbox);
            assert_eq!(coords.len(), count);
            for c in &coords {
                assert!(c.latitude >= bbox.south && c.latitude < bbox.north);
                assert!(c.longitude >= bbox.west && c.longitude < bbox.east);
            }
        }
    }

    #[test]
    fn test_generate_zero_is_empty() {
        let mut generator = CoordinateGenerator::seeded(1);
        assert!(generator.generate(0, &small_box()).is_empty());
        assert!(generator.generate_signed(0, &small_box()).unwrap().is_empty());
    }

    #[test]
    fn test_generate_negative_count_rejected() {
        let mut generator = CoordinateGenerator::seeded(1);
        let err = generator.generate_signed(-1, &small_box()).unwrap_err();
        assert!(matches!(err, BenchError::InvalidArgument(_)));
    }

    #[test]
    fn test_seeded_generators_agree() {
        let bbox = BoundingBox::nepal();
        let a = CoordinateGenerator::seeded(99).generate(20, &bbox);
        let b = CoordinateGenerator::seeded(99).generate(20, &bbox);
        assert_eq!(a, b);
    }

    #[test]
    fn test_coordinates_spread_over_box() {
        let bbox = small_box();
        let coords = CoordinateGenerator::seeded(5).generate(2_000, &bbox);
        let mid_lat = bbox.south + bbox.height() / 2.0;
        let north_half = coords.iter().filter(|c| c.latitude >= mid_lat).count();
        assert!((700..=1_300).contains(&north_half));
    }
}
