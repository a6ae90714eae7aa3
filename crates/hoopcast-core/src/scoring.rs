// Lineup scoring: model prediction on the lineup's mean feature vector,
// adjusted by a positional coherence multiplier.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::dataset::{CombineRecord, PlayerSeasonRecord};
use crate::error::{LineupGap, PredictorError};
use crate::features::{Feature, Position};
use crate::forest::RandomForest;
use crate::selection::FeatureSet;

/// Players on the court per side.
pub const LINEUP_SIZE: usize = 5;

// ---------------------------------------------------------------------------
// Lineup types
// ---------------------------------------------------------------------------

/// One player as entered into a lineup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineupPlayer {
    pub name: String,
    pub team: String,
    pub season: String,
    pub position: Option<Position>,
    pub features: BTreeMap<Feature, f64>,
    /// Draft-combine measurements, display only.
    #[serde(skip)]
    pub combine: Option<CombineRecord>,
}

impl LineupPlayer {
    pub fn new(name: &str, team: &str, position: Option<Position>) -> Self {
        Self {
            name: name.to_string(),
            team: team.to_string(),
            season: String::new(),
            position,
            features: BTreeMap::new(),
            combine: None,
        }
    }

    /// Snapshot of an engineered record: every feature with a value.
    pub fn from_record(record: &PlayerSeasonRecord) -> Self {
        Self {
            name: record.name.clone(),
            team: record.team.clone(),
            season: record.season.clone(),
            position: record.position(),
            features: Feature::CANDIDATES
                .into_iter()
                .filter_map(|f| Some((f, record.feature(f)?)))
                .collect(),
            combine: None,
        }
    }

    pub fn with_feature(mut self, feature: Feature, value: f64) -> Self {
        self.features.insert(feature, value);
        self
    }

    pub fn feature(&self, feature: Feature) -> Option<f64> {
        self.features.get(&feature).copied()
    }
}

/// Five players fielded together.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Lineup {
    pub players: Vec<LineupPlayer>,
}

impl Lineup {
    pub fn new(players: Vec<LineupPlayer>) -> Self {
        Self { players }
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn positions(&self) -> Vec<Option<Position>> {
        self.players.iter().map(|p| p.position).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.players.iter().map(|p| p.name.as_str()).collect()
    }

    /// Mean of each selected feature across the players, in FeatureSet
    /// order. Every player must carry every feature.
    pub fn mean_features(&self, features: &FeatureSet) -> Result<Vec<f64>, PredictorError> {
        if self.players.len() != LINEUP_SIZE {
            return Err(PredictorError::lineup_size(self.players.len()));
        }
        features
            .iter()
            .map(|feature| {
                let mut sum = 0.0;
                for player in &self.players {
                    sum += player
                        .feature(feature)
                        .ok_or_else(|| PredictorError::IncompleteLineup {
                            gap: LineupGap::Feature {
                                player: player.name.clone(),
                                feature,
                            },
                        })?;
                }
                Ok(sum / LINEUP_SIZE as f64)
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Coherence
// ---------------------------------------------------------------------------

/// Positional adjustment applied to a raw prediction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Coherence {
    pub multiplier: f64,
    pub description: String,
}

impl Coherence {
    fn new(multiplier: f64, description: impl Into<String>) -> Self {
        Self {
            multiplier,
            description: description.into(),
        }
    }
}

fn pair_name(a: Position, b: Position) -> &'static str {
    match (a.min(b), a.max(b)) {
        (Position::Guard, Position::Forward) => "guards and forwards",
        (Position::Guard, Position::Center) => "guards and center",
        _ => "forwards and center",
    }
}

/// Coherence multiplier from the known positions; unknown ones are ignored.
pub fn lineup_coherence(positions: &[Option<Position>]) -> Coherence {
    let mut counts: BTreeMap<Position, usize> = BTreeMap::new();
    for position in positions.iter().flatten() {
        *counts.entry(*position).or_default() += 1;
    }

    let count = |p: Position| counts.get(&p).copied().unwrap_or(0);
    let present: Vec<Position> = counts.keys().copied().collect();

    match present.as_slice() {
        [] => Coherence::new(1.0, "positions unknown"),
        [_, _, _]
            if count(Position::Guard) == 2
                && count(Position::Forward) == 2
                && count(Position::Center) == 1 =>
        {
            Coherence::new(1.15, "ideal lineup (2G,2F,1C)")
        }
        [_, _, _] => Coherence::new(1.10, "all three positions present"),
        [a, b] => Coherence::new(
            1.05,
            format!("two position categories present ({})", pair_name(*a, *b)),
        ),
        [_] => Coherence::new(0.95, "single position category"),
        _ => Coherence::new(1.0, "standard lineup"),
    }
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Predicted win rate for a lineup, already adjusted and clamped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineupScore {
    pub win_rate: f64,
    /// Model output before the coherence multiplier.
    pub raw_win_rate: f64,
    pub coherence: Coherence,
}

impl LineupScore {
    pub fn description(&self) -> &str {
        &self.coherence.description
    }
}

/// Score a lineup against a trained model. Pure: the same model and lineup
/// always give the same score.
pub fn score_lineup(
    model: &RandomForest,
    features: &FeatureSet,
    lineup: &Lineup,
) -> Result<LineupScore, PredictorError> {
    let mean = lineup.mean_features(features)?;
    let raw_win_rate = model.predict(&mean);
    let coherence = lineup_coherence(&lineup.positions());
    let win_rate = (raw_win_rate * coherence.multiplier).clamp(0.0, 1.0);
    Ok(LineupScore {
        win_rate,
        raw_win_rate,
        coherence,
    })
}
