pub mod amortization;
pub mod config;
pub mod error;
pub mod types;

#[cfg(feature = "debt")]
pub mod debt;

#[cfg(feature = "fire")]
pub mod fire;

#[cfg(feature = "baseline")]
pub mod baseline;

#[cfg(feature = "scenarios")]
pub mod scenarios;

pub use config::CoachConfig;
pub use error::CoachError;
pub use types::*;

/// Standard result type for all finance-coach operations
pub type CoachResult<T> = Result<T, CoachError>;
