// The assembled predictor: load, engineer, select, aggregate and train once,
// then answer read-only scoring queries.

use rand::Rng;
use std::path::Path;
use tracing::info;

use crate::aggregate::{team_averages, team_season_aggregates, TeamAverages};
use crate::config::{Config, LineupConfig, ModelConfig};
use crate::dataset::{load_dataset, Dataset, PlayerSeasonRecord};
use crate::error::PredictorError;
use crate::features::engineer;
use crate::forest::RandomForest;
use crate::matchup::{resolve, MatchupOutcome};
use crate::roster::{lineup_from_names, random_lineup, team_lineup, PlayerIndex};
use crate::scoring::{score_lineup, Lineup, LineupScore};
use crate::selection::{select_features, FeatureSet};
use crate::trainer::{train, TrainingReport};

/// A trained lineup predictor.
///
/// Construction runs the whole pipeline; afterwards every method takes
/// `&self`, so one instance can be shared across threads behind an `Arc`.
#[derive(Debug, Clone)]
pub struct LineupPredictor {
    dataset: Dataset,
    features: FeatureSet,
    model: RandomForest,
    report: TrainingReport,
    lineup: LineupConfig,
}

impl LineupPredictor {
    /// Load the configured tables and train.
    pub fn load(config: &Config, base_dir: &Path) -> Result<Self, PredictorError> {
        let dataset = load_dataset(&config.data, base_dir)?;
        let mut predictor = Self::from_dataset(dataset, &config.model)?;
        predictor.lineup = config.lineup.clone();
        Ok(predictor)
    }

    /// Train on an already-loaded dataset. The player table is engineered in
    /// place first.
    pub fn from_dataset(mut dataset: Dataset, model: &ModelConfig) -> Result<Self, PredictorError> {
        engineer(&mut dataset.players);
        let features = select_features(&dataset.players, model.top_k_features);
        let aggregates = team_season_aggregates(&dataset.players, &features, model.top_n_scorers);
        info!(
            "Aggregated {} player seasons into {} team seasons",
            dataset.players.len(),
            aggregates.len()
        );
        let (model, report) = train(&aggregates, model)?;
        Ok(Self {
            dataset,
            features,
            model,
            report,
            lineup: LineupConfig::default(),
        })
    }

    pub fn feature_set(&self) -> &FeatureSet {
        &self.features
    }

    pub fn report(&self) -> &TrainingReport {
        &self.report
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Engineered player seasons.
    pub fn players(&self) -> &[PlayerSeasonRecord] {
        &self.dataset.players
    }

    pub fn player_index(&self) -> PlayerIndex<'_> {
        PlayerIndex::new(&self.dataset.players)
    }

    pub fn score(&self, lineup: &Lineup) -> Result<LineupScore, PredictorError> {
        score_lineup(&self.model, &self.features, lineup)
    }

    /// Score both lineups and pick the winner. On an exact tie the second
    /// lineup wins.
    pub fn predict_winner<'a>(
        &self,
        a: &'a Lineup,
        b: &'a Lineup,
    ) -> Result<MatchupOutcome<'a>, PredictorError> {
        let score_a = self.score(a)?;
        let score_b = self.score(b)?;
        Ok(resolve((a, &score_a), (b, &score_b)))
    }

    pub fn lineup_from_names(&self, names: &[&str]) -> Result<Lineup, PredictorError> {
        lineup_from_names(&self.dataset, &self.player_index(), names)
    }

    pub fn random_lineup<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Lineup, PredictorError> {
        random_lineup(
            &self.dataset,
            &self.player_index(),
            self.lineup.random_pool_size,
            rng,
        )
    }

    pub fn team_lineup(&self, team: &str) -> Result<Lineup, PredictorError> {
        team_lineup(&self.dataset, team)
    }

    pub fn team_averages(&self) -> Vec<TeamAverages> {
        team_averages(&self.dataset.players)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn predictor_is_shareable() {
        assert_send_sync::<LineupPredictor>();
    }

    fn team_season(team: &str, win_rate: Option<f64>, strength: f64) -> Vec<PlayerSeasonRecord> {
        (0..5)
            .map(|i| {
                let mut r = PlayerSeasonRecord::new(&format!("{team} {i}"), team, "2015-16");
                r.gp = Some(80.0);
                r.pts = Some(800.0 + 400.0 * strength + 10.0 * i as f64);
                r.reb = Some(300.0 + 100.0 * strength);
                r.ast = Some(150.0 + 80.0 * strength);
                r.oreb_pct = Some(0.05);
                r.dreb_pct = Some(0.15 + 0.05 * strength);
                r.usg_pct = Some(0.20);
                r.ts_pct = Some(0.50 + 0.1 * strength);
                r.ast_pct = Some(0.15 + 0.1 * strength);
                r.net_rating = Some(-5.0 + 10.0 * strength);
                r.win_rate = win_rate;
                r
            })
            .collect()
    }

    #[test]
    fn unlabelled_team_season_is_left_out_of_training() {
        let mut players = Vec::new();
        for (t, team) in ["ATL", "BOS", "CHI", "DAL", "DEN", "LAL"].iter().enumerate() {
            let strength = t as f64 / 5.0;
            players.extend(team_season(team, Some(0.3 + 0.4 * strength), strength));
        }
        players.extend(team_season("XXX", None, 0.5));

        let model = ModelConfig {
            n_trees: 20,
            ..ModelConfig::default()
        };
        let predictor = LineupPredictor::from_dataset(Dataset::from_players(players), &model).unwrap();
        assert_eq!(predictor.report().rows, 6);
        assert_eq!(predictor.players().len(), 35);
        assert!(predictor
            .players()
            .iter()
            .filter(|r| r.team == "XXX")
            .all(|r| r.win_rate.is_none()));
    }
}
