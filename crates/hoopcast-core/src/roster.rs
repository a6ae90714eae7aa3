// Building lineups from the engineered table: by player name, by team, or at
// random, plus the display totals shown next to a lineup.

use rand::Rng;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

use crate::dataset::{Dataset, PlayerSeasonRecord};
use crate::error::PredictorError;
use crate::features::{Feature, USAGE_EPSILON};
use crate::scoring::{Lineup, LineupPlayer, LINEUP_SIZE};

// ---------------------------------------------------------------------------
// Player index
// ---------------------------------------------------------------------------

/// Most recent season row per player name.
#[derive(Debug, Clone)]
pub struct PlayerIndex<'a> {
    latest: HashMap<&'a str, &'a PlayerSeasonRecord>,
}

impl<'a> PlayerIndex<'a> {
    /// Later seasons replace earlier ones; within a season the first row in
    /// table order is kept.
    pub fn new(records: &'a [PlayerSeasonRecord]) -> Self {
        let mut latest: HashMap<&str, &PlayerSeasonRecord> = HashMap::new();
        for r in records {
            latest
                .entry(r.name.as_str())
                .and_modify(|cur| {
                    if r.season_year > cur.season_year {
                        *cur = r;
                    }
                })
                .or_insert(r);
        }
        Self { latest }
    }

    pub fn get(&self, name: &str) -> Option<&'a PlayerSeasonRecord> {
        self.latest.get(name.trim()).copied()
    }

    pub fn len(&self) -> usize {
        self.latest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.latest.is_empty()
    }

    /// Player names, sorted.
    #[cfg(test)]
    fn names(&self) -> Vec<&'a str> {
        let mut names: Vec<&str> = self.latest.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Latest rows ranked by efficiency, best first. Ties and missing values
    /// fall back to name order so the ranking is stable across runs.
    fn by_efficiency(&self) -> Vec<&'a PlayerSeasonRecord> {
        let mut rows: Vec<&PlayerSeasonRecord> = self.latest.values().copied().collect();
        rows.sort_by(|a, b| {
            let ea = a.feature(Feature::Efficiency).unwrap_or(f64::NEG_INFINITY);
            let eb = b.feature(Feature::Efficiency).unwrap_or(f64::NEG_INFINITY);
            eb.total_cmp(&ea).then_with(|| a.name.cmp(&b.name))
        });
        rows
    }
}

fn lineup_player(dataset: &Dataset, record: &PlayerSeasonRecord) -> LineupPlayer {
    let mut player = LineupPlayer::from_record(record);
    player.combine = dataset.combine_for(&record.name).cloned();
    player
}

/// Lineup from five player names, each at their most recent season.
/// Name count is checked by the scorer, not here.
pub fn lineup_from_names(
    dataset: &Dataset,
    index: &PlayerIndex<'_>,
    names: &[&str],
) -> Result<Lineup, PredictorError> {
    let players = names
        .iter()
        .map(|name| {
            index
                .get(name)
                .map(|r| lineup_player(dataset, r))
                .ok_or_else(|| PredictorError::UnknownPlayer {
                    name: name.trim().to_string(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Lineup::new(players))
}

/// Five distinct players drawn from the `pool_size` most efficient.
pub fn random_lineup<R: Rng + ?Sized>(
    dataset: &Dataset,
    index: &PlayerIndex<'_>,
    pool_size: usize,
    rng: &mut R,
) -> Result<Lineup, PredictorError> {
    let mut pool = index.by_efficiency();
    pool.truncate(pool_size);
    if pool.len() < LINEUP_SIZE {
        return Err(PredictorError::lineup_size(pool.len()));
    }
    let picks = rand::seq::index::sample(rng, pool.len(), LINEUP_SIZE);
    debug!("random lineup drawn from a pool of {}", pool.len());
    Ok(Lineup::new(
        picks
            .into_iter()
            .map(|i| lineup_player(dataset, pool[i]))
            .collect(),
    ))
}

/// A team's five leading scorers by points per game in its latest season.
pub fn team_lineup(dataset: &Dataset, team: &str) -> Result<Lineup, PredictorError> {
    let team = team.trim();
    let Some(season) = dataset
        .players
        .iter()
        .filter(|r| r.team == team)
        .map(|r| r.season_year)
        .max()
    else {
        return Err(PredictorError::UnknownTeam {
            team: team.to_string(),
        });
    };

    let mut rows: Vec<&PlayerSeasonRecord> = dataset
        .players
        .iter()
        .filter(|r| r.team == team && r.season_year == season)
        .collect();
    rows.sort_by(|a, b| {
        let pa = a.feature(Feature::PtsPerGame).unwrap_or(f64::NEG_INFINITY);
        let pb = b.feature(Feature::PtsPerGame).unwrap_or(f64::NEG_INFINITY);
        pb.total_cmp(&pa)
    });
    rows.truncate(LINEUP_SIZE);
    Ok(Lineup::new(
        rows.into_iter().map(|r| lineup_player(dataset, r)).collect(),
    ))
}

// ---------------------------------------------------------------------------
// Lineup summary
// ---------------------------------------------------------------------------

/// Display totals for a lineup. Counting stats are summed; percentages and
/// ratings are averaged. Missing values are skipped.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LineupSummary {
    pub total_points: f64,
    pub total_assists: f64,
    pub total_rebounds: f64,
    pub reb_pct_sum: f64,
    pub oreb_pct: Option<f64>,
    pub dreb_pct: Option<f64>,
    pub ts_pct: Option<f64>,
    pub usg_pct: Option<f64>,
    pub ast_pct: Option<f64>,
    pub ast_usg_ratio: Option<f64>,
    pub net_rating: Option<f64>,
    /// Mean AST% over mean USG%; 0 when usage is 0.
    pub team_ast_usg: f64,
}

fn total(lineup: &Lineup, feature: Feature) -> f64 {
    lineup.players.iter().filter_map(|p| p.feature(feature)).sum()
}

fn mean(lineup: &Lineup, feature: Feature) -> Option<f64> {
    let values: Vec<f64> = lineup.players.iter().filter_map(|p| p.feature(feature)).collect();
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

impl LineupSummary {
    pub fn of(lineup: &Lineup) -> Self {
        let usg_pct = mean(lineup, Feature::UsgPct);
        let ast_pct = mean(lineup, Feature::AstPct);
        let team_ast_usg = match (ast_pct, usg_pct) {
            (Some(ast), Some(usg)) if usg.abs() > USAGE_EPSILON => ast / usg,
            _ => 0.0,
        };
        Self {
            total_points: total(lineup, Feature::PtsPerGame),
            total_assists: total(lineup, Feature::AstPerGame),
            total_rebounds: total(lineup, Feature::RebPerGame),
            reb_pct_sum: total(lineup, Feature::RebPctSum),
            oreb_pct: mean(lineup, Feature::OrebPct),
            dreb_pct: mean(lineup, Feature::DrebPct),
            ts_pct: mean(lineup, Feature::TsPct),
            usg_pct,
            ast_pct,
            ast_usg_ratio: mean(lineup, Feature::AstUsgRatio),
            net_rating: mean(lineup, Feature::NetRating),
            team_ast_usg,
        }
    }
}
