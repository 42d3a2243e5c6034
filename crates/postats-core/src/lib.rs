//! Predicted/observed statistics tracking for pull requests.
//!
//! Collectors upload the PO statistics of a pull request's test runs; this
//! crate stores them, compares them against the most recently accepted run
//! and decides the status reported back to the pull request.

pub mod comparison;
pub mod config;
pub mod domain;
pub mod model;
pub mod report;
pub mod reporter;
pub mod repository;
pub mod service;
pub mod stats;

pub use comparison::{ComparisonStatus, RunComparison, RunStatus};
pub use domain::{PoStatsError, PoStatsErrorCategory, PoStatsResult};
pub use model::{DataPoint, Run, RunId, SimulationFile, Statistic, Table};
pub use service::RunService;
