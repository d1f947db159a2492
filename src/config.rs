//! Benchmark configuration.
//!
//! Configuration is plain serde data loadable from JSON or TOML (with the
//! `toml` feature). Unknown fields are rejected; every list and bound is
//! checked by [`BenchConfig::validate`] before any trial runs.
use crate::approach::Approach;
use crate::error::{BenchError, Result};
use crate::types::BoundingBox;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Order in which the trial grid is walked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IterationOrder {
    /// point set size, then radius, then volume (innermost)
    #[default]
    SizeRadiusVolume,
    /// volume, then point set size, then radius (innermost)
    VolumeFirst,
}

/// When the dataset is rebuilt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FixturePolicy {
    /// Clear and repopulate before every trial.
    #[default]
    EveryTrial,
    /// Skip preparation when the previous trial already prepared the same volume.
    ReuseVolume,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BenchConfig {
    /// Area query coordinates are drawn from
    #[serde(default = "BenchConfig::default_query_box")]
    pub query_box: BoundingBox,

    /// Area synthetic records are drawn from
    #[serde(default = "BenchConfig::default_dataset_box")]
    pub dataset_box: BoundingBox,

    /// Record counts to populate, in run order
    pub volumes: Vec<usize>,

    #[serde(default = "BenchConfig::default_point_set_sizes")]
    pub point_set_sizes: Vec<usize>,

    /// Search radii in meters
    #[serde(default = "BenchConfig::default_radii")]
    pub radii: Vec<f64>,

    #[serde(default = "BenchConfig::default_k")]
    pub k: usize,

    #[serde(default = "BenchConfig::default_min_points")]
    pub min_points: usize,

    #[serde(default = "BenchConfig::default_approaches")]
    pub approaches: Vec<Approach>,

    /// Report file, overwritten on each run
    #[serde(default = "BenchConfig::default_output")]
    pub output: PathBuf,

    /// Seed for query coordinates and dataset records
    #[serde(default)]
    pub seed: Option<u64>,

    #[serde(default = "BenchConfig::default_geohash_precision")]
    pub geohash_precision: usize,

    #[serde(default)]
    pub iteration_order: IterationOrder,

    #[serde(default)]
    pub fixture_policy: FixturePolicy,
}

impl BenchConfig {
    const fn default_query_box() -> BoundingBox {
        BoundingBox::nepal()
    }

    const fn default_dataset_box() -> BoundingBox {
        BoundingBox::bihar()
    }

    fn default_volumes() -> Vec<usize> {
        vec![100_000]
    }

    fn default_point_set_sizes() -> Vec<usize> {
        vec![5]
    }

    fn default_radii() -> Vec<f64> {
        vec![5_000.0]
    }

    const fn default_k() -> usize {
        10
    }

    const fn default_min_points() -> usize {
        3
    }

    fn default_approaches() -> Vec<Approach> {
        Approach::DEFAULT.to_vec()
    }

    fn default_output() -> PathBuf {
        PathBuf::from("output.txt")
    }

    const fn default_geohash_precision() -> usize {
        4
    }

    pub fn with_volumes(mut self, volumes: Vec<usize>) -> Self {
        self.volumes = volumes;
        self
    }

    pub fn with_point_set_sizes(mut self, sizes: Vec<usize>) -> Self {
        self.point_set_sizes = sizes;
        self
    }

    pub fn with_radii(mut self, radii: Vec<f64>) -> Self {
        self.radii = radii;
        self
    }

    pub fn with_approaches(mut self, approaches: Vec<Approach>) -> Self {
        self.approaches = approaches;
        self
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn with_min_points(mut self, min_points: usize) -> Self {
        self.min_points = min_points;
        self
    }

    pub fn with_output<P: Into<PathBuf>>(mut self, output: P) -> Self {
        self.output = output.into();
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_iteration_order(mut self, order: IterationOrder) -> Self {
        self.iteration_order = order;
        self
    }

    pub fn with_fixture_policy(mut self, policy: FixturePolicy) -> Self {
        self.fixture_policy = policy;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.query_box
            .validate()
            .map_err(|e| BenchError::config(format!("query_box: {e}")))?;
        self.dataset_box
            .validate()
            .map_err(|e| BenchError::config(format!("dataset_box: {e}")))?;

        if self.volumes.is_empty() {
            return Err(BenchError::config("volumes must not be empty"));
        }
        if self.point_set_sizes.is_empty() {
            return Err(BenchError::config("point_set_sizes must not be empty"));
        }
        if self.radii.is_empty() {
            return Err(BenchError::config("radii must not be empty"));
        }
        if let Some(radius) = self.radii.iter().find(|r| !r.is_finite() || **r <= 0.0) {
            return Err(BenchError::config(format!(
                "radii must be positive meters, got {radius}"
            )));
        }
        if self.k == 0 {
            return Err(BenchError::config("k must be greater than zero"));
        }
        if self.min_points == 0 {
            return Err(BenchError::config("min_points must be greater than zero"));
        }
        if self.approaches.is_empty() {
            return Err(BenchError::config("at least one approach must be enabled"));
        }
        if let Some(dup) = self
            .approaches
            .iter()
            .enumerate()
            .find_map(|(i, a)| self.approaches[..i].contains(a).then_some(a))
        {
            return Err(BenchError::config(format!(
                "approach '{dup}' is enabled more than once"
            )));
        }
        if !(1..=12).contains(&self.geohash_precision) {
            return Err(BenchError::config(format!(
                "geohash_precision must be between 1 and 12, got {}",
                self.geohash_precision
            )));
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: BenchConfig = serde_json::from_str(json)
            .map_err(|e| BenchError::config(format!("invalid JSON config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    #[cfg(feature = "toml")]
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: BenchConfig = toml::from_str(toml_str)
            .map_err(|e| BenchError::config(format!("invalid TOML config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    #[cfg(feature = "toml")]
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| BenchError::config(format!("cannot serialize config: {e}")))
    }

    /// Load from a `.json` or `.toml` file, chosen by extension.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            BenchError::config(format!("cannot read config {}: {e}", path.display()))
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json(&content),
            #[cfg(feature = "toml")]
            Some("toml") => Self::from_toml(&content),
            other => Err(BenchError::config(format!(
                "unsupported config format {:?} for {}",
                other.unwrap_or(""),
                path.display()
            ))),
        }
    }
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            query_box: Self::default_query_box(),
            dataset_box: Self::default_dataset_box(),
            volumes: Self::default_volumes(),
            point_set_sizes: Self::default_point_set_sizes(),
            radii: Self::default_radii(),
            k: Self::default_k(),
            min_points: Self::default_min_points(),
            approaches: Self::default_approaches(),
            output: Self::default_output(),
            seed: None,
            geohash_precision: Self::default_geohash_precision(),
            iteration_order: IterationOrder::default(),
            fixture_policy: FixturePolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = BenchConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.volumes, vec![100_000]);
        assert_eq!(config.radii, vec![5_000.0]);
        assert_eq!(config.k, 10);
        assert_eq!(config.min_points, 3);
        assert_eq!(config.approaches, Approach::DEFAULT.to_vec());
        assert_eq!(config.iteration_order, IterationOrder::SizeRadiusVolume);
        assert_eq!(config.fixture_policy, FixturePolicy::EveryTrial);
    }

    #[test]
    fn test_config_json_minimal() {
        let config = BenchConfig::from_json(r#"{ "volumes": [1000, 2000] }"#).unwrap();
        assert_eq!(config.volumes, vec![1000, 2000]);
        assert_eq!(config.point_set_sizes, vec![5]);
        assert_eq!(config.query_box, BoundingBox::nepal());
    }

    #[test]
    fn test_config_json_full() {
        let json = r#"{
            "query_box": { "north": 10.0, "south": 0.0, "east": 10.0, "west": 0.0 },
            "volumes": [10],
            "point_set_sizes": [1, 5],
            "radii": [500.0, 1000.0],
            "k": 4,
            "min_points": 2,
            "approaches": ["knn", "r-tree", "postgis-native"],
            "output": "out/report.txt",
            "seed": 7,
            "iteration_order": "volume_first",
            "fixture_policy": "reuse_volume"
        }"#;
        let config = BenchConfig::from_json(json).unwrap();
        assert_eq!(
            config.approaches,
            vec![Approach::Knn, Approach::RTree, Approach::PostgisNative]
        );
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.iteration_order, IterationOrder::VolumeFirst);
        assert_eq!(config.fixture_policy, FixturePolicy::ReuseVolume);
        assert_eq!(config.output, PathBuf::from("out/report.txt"));
    }

    #[test]
    fn test_config_rejects_unknown_fields() {
        assert!(BenchConfig::from_json(r#"{ "volumes": [1], "colour": "red" }"#).is_err());
    }

    #[test]
    fn test_config_requires_volumes() {
        let err = BenchConfig::from_json("{}").unwrap_err();
        assert!(matches!(err, BenchError::Configuration(_)));
    }

    #[test]
    fn test_config_validation() {
        let base = BenchConfig::default();
        assert!(base.clone().with_volumes(vec![]).validate().is_err());
        assert!(base.clone().with_point_set_sizes(vec![]).validate().is_err());
        assert!(base.clone().with_radii(vec![0.0]).validate().is_err());
        assert!(base.clone().with_radii(vec![f64::INFINITY]).validate().is_err());
        assert!(base.clone().with_k(0).validate().is_err());
        assert!(base.clone().with_min_points(0).validate().is_err());
        assert!(base.clone().with_approaches(vec![]).validate().is_err());
        assert!(
            base.clone()
                .with_approaches(vec![Approach::Knn, Approach::Knn])
                .validate()
                .is_err()
        );
        assert!(base.clone().with_point_set_sizes(vec![0]).validate().is_ok());
        assert!(base.with_volumes(vec![0]).validate().is_ok());
    }

    #[test]
    fn test_config_rejects_bad_box() {
        let json = r#"{
            "volumes": [1],
            "dataset_box": { "north": 0.0, "south": 5.0, "east": 10.0, "west": 0.0 }
        }"#;
        let err = BenchConfig::from_json(json).unwrap_err();
        assert!(err.to_string().contains("dataset_box"));
    }

    #[test]
    fn test_config_json_round_trip() {
        let config = BenchConfig::default()
            .with_volumes(vec![5, 10])
            .with_seed(3)
            .with_fixture_policy(FixturePolicy::ReuseVolume);
        let json = config.to_json().unwrap();
        assert_eq!(BenchConfig::from_json(&json).unwrap(), config);
    }

    #[cfg(feature = "toml")]
    #[test]
    fn test_config_toml() {
        let toml_str = r#"
            volumes = [100]
            radii = [500.0]
            point_set_sizes = [3]
            approaches = ["geohash", "haversine"]

            [query_box]
            north = 30.0
            south = 26.0
            east = 88.0
            west = 80.0
        "#;
        let config = BenchConfig::from_toml(toml_str).unwrap();
        assert_eq!(config.approaches, vec![Approach::Geohash, Approach::Haversine]);
        assert_eq!(config.query_box.north, 30.0);

        let round_trip = BenchConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(round_trip, config);
    }

    #[test]
    fn test_load_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bench.json");
        std::fs::write(&path, r#"{ "volumes": [42] }"#).unwrap();
        assert_eq!(BenchConfig::load(&path).unwrap().volumes, vec![42]);

        let yaml = dir.path().join("bench.yaml");
        std::fs::write(&yaml, "volumes: [1]").unwrap();
        assert!(BenchConfig::load(&yaml).is_err());

        assert!(BenchConfig::load(&dir.path().join("missing.json")).is_err());
    }
}
