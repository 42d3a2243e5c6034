pub mod errors;

pub use errors::{PoStatsError, PoStatsErrorCategory, PoStatsResult, ServiceResult};
