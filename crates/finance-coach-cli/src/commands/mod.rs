pub mod baseline;
pub mod debt;
pub mod fire;
pub mod scenarios;
