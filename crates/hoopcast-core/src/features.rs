// Feature engineering: per-game rates, composite efficiency metrics, coarse
// position categories and mean imputation of missing values.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

use crate::dataset::PlayerSeasonRecord;

/// Added to usage before dividing by it.
pub const USAGE_EPSILON: f64 = 1e-6;

// ---------------------------------------------------------------------------
// Feature names
// ---------------------------------------------------------------------------

/// A numeric column the model may be trained on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    PtsPerGame,
    RebPerGame,
    AstPerGame,
    OrebPct,
    DrebPct,
    UsgPct,
    TsPct,
    AstPct,
    NetRating,
    AstUsgRatio,
    RebPctSum,
    Efficiency,
    ScoringEfficiency,
    Playmaking,
}

impl Feature {
    /// Candidate features in selection order. Ties in correlation keep this
    /// order.
    pub const CANDIDATES: [Feature; 14] = [
        Feature::PtsPerGame,
        Feature::RebPerGame,
        Feature::AstPerGame,
        Feature::OrebPct,
        Feature::DrebPct,
        Feature::UsgPct,
        Feature::TsPct,
        Feature::AstPct,
        Feature::NetRating,
        Feature::AstUsgRatio,
        Feature::RebPctSum,
        Feature::Efficiency,
        Feature::ScoringEfficiency,
        Feature::Playmaking,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Feature::PtsPerGame => "pts_per_game",
            Feature::RebPerGame => "reb_per_game",
            Feature::AstPerGame => "ast_per_game",
            Feature::OrebPct => "oreb_pct",
            Feature::DrebPct => "dreb_pct",
            Feature::UsgPct => "usg_pct",
            Feature::TsPct => "ts_pct",
            Feature::AstPct => "ast_pct",
            Feature::NetRating => "net_rating",
            Feature::AstUsgRatio => "ast_usg_ratio",
            Feature::RebPctSum => "reb_pct_sum",
            Feature::Efficiency => "efficiency",
            Feature::ScoringEfficiency => "scoring_efficiency",
            Feature::Playmaking => "playmaking",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown feature name '{0}'")]
pub struct UnknownFeature(pub String);

impl FromStr for Feature {
    type Err = UnknownFeature;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Feature::CANDIDATES
            .into_iter()
            .find(|f| f.name() == s)
            .ok_or_else(|| UnknownFeature(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Positions
// ---------------------------------------------------------------------------

/// Coarse position category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Position {
    #[serde(rename = "G")]
    Guard,
    #[serde(rename = "F")]
    Forward,
    #[serde(rename = "C")]
    Center,
}

impl Position {
    /// Classify a free-text position. First match wins:
    /// guard without center, then center, then forward.
    ///
    /// So "Forward-Center" is a center and "Guard-Forward" is a guard.
    pub fn from_text(text: &str) -> Option<Position> {
        let upper = text.to_uppercase();
        if upper.contains("GUARD") && !upper.contains("CENTER") {
            Some(Position::Guard)
        } else if upper.contains("CENTER") {
            Some(Position::Center)
        } else if upper.contains("FORWARD") {
            Some(Position::Forward)
        } else {
            None
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Position::Guard => "G",
            Position::Forward => "F",
            Position::Center => "C",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ---------------------------------------------------------------------------
// Derived stats
// ---------------------------------------------------------------------------

/// Values computed from a record's raw stats.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedStats {
    pub pts_per_game: Option<f64>,
    pub reb_per_game: Option<f64>,
    pub ast_per_game: Option<f64>,
    pub ast_usg_ratio: Option<f64>,
    pub reb_pct_sum: Option<f64>,
    pub efficiency: Option<f64>,
    pub scoring_efficiency: Option<f64>,
    pub playmaking: Option<f64>,
    pub position: Option<Position>,
}

impl PlayerSeasonRecord {
    /// Current value of a feature column.
    pub fn feature(&self, feature: Feature) -> Option<f64> {
        match feature {
            Feature::PtsPerGame => self.derived.pts_per_game,
            Feature::RebPerGame => self.derived.reb_per_game,
            Feature::AstPerGame => self.derived.ast_per_game,
            Feature::OrebPct => self.oreb_pct,
            Feature::DrebPct => self.dreb_pct,
            Feature::UsgPct => self.usg_pct,
            Feature::TsPct => self.ts_pct,
            Feature::AstPct => self.ast_pct,
            Feature::NetRating => self.net_rating,
            Feature::AstUsgRatio => self.derived.ast_usg_ratio,
            Feature::RebPctSum => self.derived.reb_pct_sum,
            Feature::Efficiency => self.derived.efficiency,
            Feature::ScoringEfficiency => self.derived.scoring_efficiency,
            Feature::Playmaking => self.derived.playmaking,
        }
    }

    fn feature_mut(&mut self, feature: Feature) -> &mut Option<f64> {
        match feature {
            Feature::PtsPerGame => &mut self.derived.pts_per_game,
            Feature::RebPerGame => &mut self.derived.reb_per_game,
            Feature::AstPerGame => &mut self.derived.ast_per_game,
            Feature::OrebPct => &mut self.oreb_pct,
            Feature::DrebPct => &mut self.dreb_pct,
            Feature::UsgPct => &mut self.usg_pct,
            Feature::TsPct => &mut self.ts_pct,
            Feature::AstPct => &mut self.ast_pct,
            Feature::NetRating => &mut self.net_rating,
            Feature::AstUsgRatio => &mut self.derived.ast_usg_ratio,
            Feature::RebPctSum => &mut self.derived.reb_pct_sum,
            Feature::Efficiency => &mut self.derived.efficiency,
            Feature::ScoringEfficiency => &mut self.derived.scoring_efficiency,
            Feature::Playmaking => &mut self.derived.playmaking,
        }
    }
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

/// `value / gp`, defined only for gp > 0.
fn per_game(value: Option<f64>, gp: Option<f64>) -> Option<f64> {
    let gp = gp.filter(|g| *g > 0.0)?;
    finite(value? / gp)
}

/// Fill every derived slot that is still empty. Slots that already hold a
/// value (from an earlier pass or imputation) are left alone.
pub fn derive(record: &mut PlayerSeasonRecord) {
    let gp = record.gp;
    let d = &mut record.derived;

    d.pts_per_game = d.pts_per_game.or_else(|| per_game(record.pts, gp));
    d.reb_per_game = d.reb_per_game.or_else(|| per_game(record.reb, gp));
    d.ast_per_game = d.ast_per_game.or_else(|| per_game(record.ast, gp));

    d.ast_usg_ratio = d.ast_usg_ratio.or_else(|| {
        finite(record.ast_pct? / (record.usg_pct? + USAGE_EPSILON))
    });
    d.reb_pct_sum = d
        .reb_pct_sum
        .or_else(|| finite(record.oreb_pct? + record.dreb_pct?));
    d.efficiency = d.efficiency.or_else(|| {
        let total = record.pts? + record.reb? + record.ast?;
        per_game(Some(total), gp)
    });

    let pts_per_game = d.pts_per_game;
    d.scoring_efficiency = d.scoring_efficiency.or_else(|| {
        finite(pts_per_game? / (record.usg_pct? + USAGE_EPSILON))
    });
    let ast_per_game = d.ast_per_game;
    d.playmaking = d
        .playmaking
        .or_else(|| finite(ast_per_game? * record.ast_pct?));

    d.position = record.position_text.as_deref().and_then(Position::from_text);
}

// ---------------------------------------------------------------------------
// Imputation
// ---------------------------------------------------------------------------

/// A numeric column that can be averaged. Only feature columns are ever
/// imputed; the win-rate label is read as observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Feature(Feature),
    WinRate,
}

impl Column {
    fn get(self, record: &PlayerSeasonRecord) -> Option<f64> {
        match self {
            Column::Feature(f) => record.feature(f),
            Column::WinRate => record.win_rate,
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Column::Feature(feature) => feature.fmt(f),
            Column::WinRate => f.write_str("win_rate"),
        }
    }
}

/// Mean of the present values. The values are summed in sorted order so the
/// result does not depend on row order.
pub fn column_mean(records: &[PlayerSeasonRecord], column: Column) -> Option<f64> {
    let mut values: Vec<f64> = records.iter().filter_map(|r| column.get(r)).collect();
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Replace missing values in every imputed column with that column's mean.
/// A column with no values at all stays missing. Returns the number of cells
/// filled.
pub fn impute_column_means(records: &mut [PlayerSeasonRecord]) -> usize {
    let mut filled = 0;
    for feature in Feature::CANDIDATES {
        let column = Column::Feature(feature);
        let Some(mean) = column_mean(records, column) else {
            debug!("column {} has no values; left missing", column);
            continue;
        };
        let mut column_filled = 0;
        for record in records.iter_mut() {
            let slot = record.feature_mut(feature);
            if slot.is_none() {
                *slot = Some(mean);
                column_filled += 1;
            }
        }
        if column_filled > 0 {
            debug!("imputed {} missing {} values with {:.4}", column_filled, column, mean);
        }
        filled += column_filled;
    }
    filled
}

/// Derive features and positions for every record, then mean-impute.
/// Row count never changes. Running it again on its own output changes
/// nothing.
pub fn engineer(records: &mut [PlayerSeasonRecord]) -> usize {
    records.iter_mut().for_each(derive);
    let filled = impute_column_means(records);
    info!(
        "Engineered {} player seasons ({} missing values imputed)",
        records.len(),
        filled
    );
    filled
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
