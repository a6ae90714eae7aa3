// Library root: re-exports all modules so integration tests and the CLI can
// reach the crate's public API.

pub mod aggregate;
pub mod config;
pub mod dataset;
pub mod error;
pub mod features;
pub mod forest;
pub mod matchup;
pub mod predictor;
pub mod roster;
pub mod scoring;
pub mod selection;
pub mod trainer;

pub use error::PredictorError;
pub use predictor::LineupPredictor;
