//! Benchmark harness comparing spatial proximity retrieval strategies.
//!
//! ```rust
//! use spatio_bench::prelude::*;
//!
//! let config = BenchConfig::default()
//!     .with_volumes(vec![500, 1_000])
//!     .with_radii(vec![2_000.0])
//!     .with_seed(42);
//!
//! let store = MemoryStore::seeded(7);
//! let mut orchestrator = BenchmarkOrchestrator::new(store, config)?;
//! let report = orchestrator.run();
//!
//! let text = ReportFormatter::new().format(&report);
//! assert!(text.starts_with("Comparison Results:"));
//! # Ok::<(), spatio_bench::BenchError>(())
//! ```

pub mod approach;
pub mod clock;
pub mod config;
pub mod error;
pub mod fixture;
pub mod generator;
pub mod orchestrator;
pub mod report;
pub mod store;
pub mod types;

pub use approach::{Approach, ApproachQuery, ApproachRunner};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{BenchConfig, FixturePolicy, IterationOrder};
pub use error::{BenchError, Result};
pub use fixture::DatasetFixture;
pub use generator::CoordinateGenerator;
pub use orchestrator::BenchmarkOrchestrator;
pub use report::{ReportFormatter, json_report_path, write_report};
pub use store::{MemoryStore, SpatialStore, StoreError, StoreResult};

pub use types::{
    ApproachResult, BenchmarkReport, BoundingBox, Coordinate, HeaderStyle, TrialEntry,
    TrialOutcome, TrialParameters, TrialResult,
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {

    pub use crate::{BenchConfig, BenchError, BenchmarkOrchestrator, Result};

    pub use crate::{Approach, BoundingBox, Coordinate};

    pub use crate::{MemoryStore, SpatialStore};

    pub use crate::{BenchmarkReport, ReportFormatter, write_report};

    pub use crate::{FixturePolicy, IterationOrder};
}
