//! Baseline comparison of a run's statistics.
//!
//! The tree mirrors the run hierarchy: a [`RunComparison`] holds one
//! [`FileComparison`] per file name found on either side, each of those holds
//! [`TableComparison`]s, and each table holds [`VariableComparison`]s. Every
//! level is built with [`reconcile`], so ordering and new/missing detection
//! are identical throughout.

pub mod reconcile;
pub mod run;
pub mod table;
pub mod variable;

pub use reconcile::{Pairing, PresenceStatus, reconcile};
pub use run::{RunComparison, RunStatus};
pub use table::{FileComparison, TableComparison};
pub use variable::{
    ComparisonStatus, Indicator, REGRESSION_TOLERANCE_PERCENT, VariableComparison, classify,
    percent_difference,
};
