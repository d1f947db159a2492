//! Trial scheduling.
//!
//! The orchestrator owns the store handle for the duration of a run and
//! walks the trial grid strictly sequentially: prepare the dataset, then
//! time every enabled approach against it. Nothing runs concurrently, so
//! no approach ever observes another approach's load.
use crate::approach::{ApproachQuery, ApproachRunner};
use crate::clock::{Clock, MonotonicClock};
use crate::config::{BenchConfig, FixturePolicy, IterationOrder};
use crate::error::{BenchError, Result};
use crate::fixture::DatasetFixture;
use crate::generator::CoordinateGenerator;
use crate::store::SpatialStore;
use crate::types::{
    BenchmarkReport, Coordinate, HeaderStyle, TrialEntry, TrialOutcome, TrialParameters,
    TrialResult,
};

pub struct BenchmarkOrchestrator<S, C = MonotonicClock> {
    store: S,
    clock: C,
    config: BenchConfig,
    fixture: DatasetFixture,
    runners: Vec<ApproachRunner>,
    generator: CoordinateGenerator,
    /// Volume the store currently holds, if the last preparation succeeded.
    prepared: Option<usize>,
}

impl<S: SpatialStore> BenchmarkOrchestrator<S, MonotonicClock> {
    /// Create an orchestrator timing with [`MonotonicClock`].
    pub fn new(store: S, config: BenchConfig) -> Result<Self> {
        Self::with_clock(store, MonotonicClock::new(), config)
    }
}

impl<S: SpatialStore, C: Clock> BenchmarkOrchestrator<S, C> {
    pub fn with_clock(store: S, clock: C, config: BenchConfig) -> Result<Self> {
        config.validate()?;

        let runners = config
            .approaches
            .iter()
            .copied()
            .map(ApproachRunner::new)
            .collect();

        Ok(Self {
            store,
            clock,
            fixture: DatasetFixture::new(config.dataset_box),
            runners,
            generator: CoordinateGenerator::with_seed(config.seed),
            config,
            prepared: None,
        })
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        self.prepared = None;
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Run one trial per volume against a fixed set of query coordinates.
    ///
    /// A failed preparation is recorded and the next volume proceeds;
    /// approach failures are recorded inline next to their siblings.
    pub fn run_comparison(
        &mut self,
        coordinates: &[Coordinate],
        radius: f64,
        k: usize,
        min_points: usize,
        volumes: &[usize],
    ) -> Vec<TrialEntry> {
        volumes
            .iter()
            .map(|&volume| {
                let params = TrialParameters {
                    volume,
                    point_set_size: coordinates.len(),
                    radius,
                    k,
                    min_points,
                };
                self.run_trial(params, coordinates)
            })
            .collect()
    }

    /// [`run_comparison`](Self::run_comparison) packaged as a report whose
    /// headers name only the volume.
    pub fn compare_volumes(
        &mut self,
        coordinates: &[Coordinate],
        radius: f64,
        volumes: &[usize],
    ) -> BenchmarkReport {
        let (k, min_points) = (self.config.k, self.config.min_points);
        BenchmarkReport {
            header_style: HeaderStyle::VolumeOnly,
            trials: self.run_comparison(coordinates, radius, k, min_points, volumes),
        }
    }

    /// Walk the full configured grid.
    pub fn run(&mut self) -> BenchmarkReport {
        let mut report = BenchmarkReport::new(HeaderStyle::Full);
        let volumes = self.config.volumes.clone();
        let sizes = self.config.point_set_sizes.clone();
        let radii = self.config.radii.clone();
        let (k, min_points) = (self.config.k, self.config.min_points);
        let query_box = self.config.query_box;

        log::info!(
            "Running {} trials x {} approaches",
            volumes.len() * sizes.len() * radii.len(),
            self.runners.len()
        );

        match self.config.iteration_order {
            IterationOrder::SizeRadiusVolume => {
                for &size in &sizes {
                    let coordinates = self.generator.generate(size, &query_box);
                    for &radius in &radii {
                        let trials =
                            self.run_comparison(&coordinates, radius, k, min_points, &volumes);
                        report.trials.extend(trials);
                    }
                }
            }
            IterationOrder::VolumeFirst => {
                for &volume in &volumes {
                    for &size in &sizes {
                        let coordinates = self.generator.generate(size, &query_box);
                        for &radius in &radii {
                            let trials =
                                self.run_comparison(&coordinates, radius, k, min_points, &[volume]);
                            report.trials.extend(trials);
                        }
                    }
                }
            }
        }

        report
    }

    fn run_trial(&mut self, params: TrialParameters, coordinates: &[Coordinate]) -> TrialEntry {
        log::info!(
            "Trial: point size {}, volume {}, radius {}m",
            params.point_set_size,
            params.volume,
            params.radius
        );

        if let Err(err) = self.ensure_dataset(params.volume) {
            log::warn!("{err}");
            let message = match err {
                BenchError::Fixture { source, .. } => source.to_string(),
                other => other.to_string(),
            };
            return TrialEntry {
                params,
                outcome: TrialOutcome::FixtureFailed(message),
            };
        }

        let query = ApproachQuery {
            coordinates,
            radius: params.radius,
            k: params.k,
            min_points: params.min_points,
        };

        let mut results = TrialResult::new();
        for runner in &self.runners {
            let result = runner.run(&self.store, &query, &self.clock);
            log::debug!("{:?}", result);
            results.push(result);
        }

        TrialEntry {
            params,
            outcome: TrialOutcome::Completed(results),
        }
    }

    fn ensure_dataset(&mut self, volume: usize) -> Result<()> {
        if self.config.fixture_policy == FixturePolicy::ReuseVolume && self.prepared == Some(volume)
        {
            log::debug!("Reusing dataset of {} records", volume);
            return Ok(());
        }

        self.prepared = None;
        self.fixture.prepare(&mut self.store, volume)?;
        self.prepared = Some(volume);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approach::Approach;
    use crate::clock::ManualClock;
    use crate::store::{MemoryStore, StoreError, StoreResult};
    use crate::types::BoundingBox;

    /// Store that fails the configured approaches and volumes.
    #[derive(Default)]
    struct FlakyStore {
        rows: usize,
        failing_approach: Option<Approach>,
        failing_volume: Option<usize>,
        prepares: usize,
    }

    impl SpatialStore for FlakyStore {
        fn clear_all(&mut self) -> StoreResult<()> {
            self.prepares += 1;
            self.rows = 0;
            Ok(())
        }

        fn insert_random(&mut self, count: usize, _bbox: &BoundingBox) -> StoreResult<()> {
            if self.failing_volume == Some(count) {
                return Err(StoreError::Backend("disk full".into()));
            }
            self.rows += count;
            Ok(())
        }

        fn count(&self) -> StoreResult<usize> {
            Ok(self.rows)
        }

        fn execute(&self, approach: Approach, _query: &ApproachQuery<'_>) -> StoreResult<usize> {
            if self.failing_approach == Some(approach) {
                return Err(StoreError::Backend("query canceled".into()));
            }
            Ok(self.rows / 10)
        }
    }

    fn config() -> BenchConfig {
        BenchConfig::default()
            .with_volumes(vec![10, 20])
            .with_point_set_sizes(vec![2])
            .with_radii(vec![500.0])
            .with_seed(5)
    }

    #[test]
    fn test_sibling_isolation() {
        let store = FlakyStore {
            failing_approach: Some(Approach::Dbscan),
            ..Default::default()
        };
        let mut orchestrator =
            BenchmarkOrchestrator::with_clock(store, ManualClock::new(), config()).unwrap();
        let report = orchestrator.run();

        assert_eq!(report.len(), 2);
        for trial in &report.trials {
            let results = trial.results().unwrap();
            assert_eq!(results.len(), Approach::DEFAULT.len());
            let dbscan = results.get(Approach::Dbscan).unwrap();
            assert!(dbscan.error.as_deref().unwrap().contains("query canceled"));
            for result in results.iter().filter(|r| r.approach != Approach::Dbscan) {
                assert_eq!(result.records_found, Some(trial.params.volume as u64 / 10));
            }
        }
    }

    #[test]
    fn test_fixture_failure_skips_only_its_trial() {
        let store = FlakyStore {
            failing_volume: Some(10),
            ..Default::default()
        };
        let mut orchestrator =
            BenchmarkOrchestrator::with_clock(store, ManualClock::new(), config()).unwrap();
        let report = orchestrator.run();

        assert_eq!(
            report.trials[0].outcome,
            TrialOutcome::FixtureFailed("Backend error: disk full".into())
        );
        assert_eq!(report.trials[1].results().unwrap().len(), 5);
    }

    #[test]
    fn test_default_order_is_size_radius_volume() {
        let config = config()
            .with_point_set_sizes(vec![1, 3])
            .with_radii(vec![100.0, 200.0]);
        let mut orchestrator =
            BenchmarkOrchestrator::with_clock(FlakyStore::default(), ManualClock::new(), config)
                .unwrap();
        let order: Vec<(usize, f64, usize)> = orchestrator
            .run()
            .trials
            .iter()
            .map(|t| (t.params.point_set_size, t.params.radius, t.params.volume))
            .collect();

        assert_eq!(
            order,
            vec![
                (1, 100.0, 10),
                (1, 100.0, 20),
                (1, 200.0, 10),
                (1, 200.0, 20),
                (3, 100.0, 10),
                (3, 100.0, 20),
                (3, 200.0, 10),
                (3, 200.0, 20),
            ]
        );
    }

    #[test]
    fn test_volume_first_order() {
        let config = config()
            .with_point_set_sizes(vec![1, 3])
            .with_iteration_order(IterationOrder::VolumeFirst);
        let mut orchestrator =
            BenchmarkOrchestrator::with_clock(FlakyStore::default(), ManualClock::new(), config)
                .unwrap();
        let order: Vec<(usize, usize)> = orchestrator
            .run()
            .trials
            .iter()
            .map(|t| (t.params.volume, t.params.point_set_size))
            .collect();

        assert_eq!(order, vec![(10, 1), (10, 3), (20, 1), (20, 3)]);
    }

    #[test]
    fn test_every_trial_policy_prepares_each_trial() {
        let config = config().with_volumes(vec![10, 10, 20]);
        let mut orchestrator =
            BenchmarkOrchestrator::with_clock(FlakyStore::default(), ManualClock::new(), config)
                .unwrap();
        orchestrator.run();
        assert_eq!(orchestrator.store().prepares, 3);
    }

    #[test]
    fn test_reuse_volume_policy() {
        let config = config()
            .with_volumes(vec![10, 10, 20, 10])
            .with_fixture_policy(FixturePolicy::ReuseVolume);
        let mut orchestrator =
            BenchmarkOrchestrator::with_clock(FlakyStore::default(), ManualClock::new(), config)
                .unwrap();
        let report = orchestrator.run();

        assert_eq!(report.len(), 4);
        assert_eq!(orchestrator.store().prepares, 3);
    }

    #[test]
    fn test_zero_volume_finds_nothing() {
        let config = config()
            .with_volumes(vec![0])
            .with_approaches(Approach::ALL.to_vec());
        let mut orchestrator =
            BenchmarkOrchestrator::with_clock(MemoryStore::seeded(9), ManualClock::new(), config)
                .unwrap();
        let report = orchestrator.run();

        let results = report.trials[0].results().unwrap();
        assert_eq!(results.len(), Approach::ALL.len());
        for result in results.iter() {
            assert_eq!(result.records_found, Some(0), "{}", result.approach);
            assert!(result.error.is_none());
        }
    }

    #[test]
    fn test_compare_volumes_uses_volume_headers() {
        let mut orchestrator =
            BenchmarkOrchestrator::with_clock(MemoryStore::seeded(4), ManualClock::new(), config())
                .unwrap();
        let coords = [Coordinate::new(25.6, 85.1)];
        let report = orchestrator.compare_volumes(&coords, 5_000.0, &[50, 100]);

        assert_eq!(report.header_style, HeaderStyle::VolumeOnly);
        assert_eq!(report.len(), 2);
        assert_eq!(report.trials[1].params.point_set_size, 1);
        assert_eq!(orchestrator.store().count().unwrap(), 100);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = BenchmarkOrchestrator::new(
            FlakyStore::default(),
            BenchConfig::default().with_volumes(vec![]),
        );
        assert!(matches!(result, Err(BenchError::Configuration(_))));
    }
}
