// Error type shared by the loader, trainer and scorer.

use std::path::PathBuf;
use thiserror::Error;

use crate::features::Feature;

#[derive(Debug, Error)]
pub enum PredictorError {
    /// A source table is missing or unreadable. Fatal; never retried.
    #[error("data unavailable at {path}: {reason}")]
    DataUnavailable { path: PathBuf, reason: String },

    #[error("insufficient training data: {rows} team-season rows, need at least {minimum}")]
    InsufficientData { rows: usize, minimum: usize },

    /// Every in-sample prediction collapsed to the same value although the
    /// targets vary.
    #[error("degenerate model: all {rows} in-sample predictions equal {value:.6}")]
    DegenerateModel { rows: usize, value: f64 },

    /// The scorer was handed a lineup it cannot average.
    #[error("incomplete lineup: {gap}")]
    IncompleteLineup { gap: LineupGap },

    #[error("no player named '{name}' in the dataset")]
    UnknownPlayer { name: String },

    #[error("no team '{team}' in the dataset")]
    UnknownTeam { team: String },
}

/// What is wrong with an incomplete lineup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineupGap {
    #[error("a lineup needs exactly 5 players, got {players}")]
    Size { players: usize },

    #[error("player '{player}' has no value for feature `{feature}`")]
    Feature { player: String, feature: Feature },
}

impl PredictorError {
    pub(crate) fn lineup_size(players: usize) -> Self {
        Self::IncompleteLineup {
            gap: LineupGap::Size { players },
        }
    }

    pub(crate) fn unavailable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::DataUnavailable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
