// Model training: fits the forest on team-season aggregates and sanity-checks
// the fit.

use serde::Serialize;
use tracing::info;

use crate::aggregate::TeamSeasonAggregate;
use crate::config::ModelConfig;
use crate::error::PredictorError;
use crate::forest::{ForestParams, RandomForest};

/// In-sample predictions closer together than this count as collapsed.
const DEGENERATE_SPREAD: f64 = 1e-9;

/// Summary of a completed fit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingReport {
    pub rows: usize,
    pub n_features: usize,
    pub n_trees: usize,
    pub max_tree_depth: usize,
    /// Mean absolute error of the forest on its own training rows.
    pub in_sample_mae: f64,
    /// Impurity-based importance per feature, in FeatureSet order.
    pub feature_importances: Vec<f64>,
}

impl From<&ModelConfig> for ForestParams {
    fn from(model: &ModelConfig) -> Self {
        Self {
            n_trees: model.n_trees,
            max_depth: model.max_depth,
            min_samples_split: 2,
            seed: model.seed,
        }
    }
}

fn spread(values: &[f64]) -> f64 {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    max - min
}

/// Fit the win-rate forest. No train/test split: every aggregate row is used.
///
/// Fails with `InsufficientData` below `model.min_training_rows` rows and with
/// `DegenerateModel` when every in-sample prediction is the same although the
/// targets are not.
pub fn train(
    aggregates: &[TeamSeasonAggregate],
    model: &ModelConfig,
) -> Result<(RandomForest, TrainingReport), PredictorError> {
    let minimum = model.min_training_rows.max(1);
    if aggregates.len() < minimum {
        return Err(PredictorError::InsufficientData {
            rows: aggregates.len(),
            minimum,
        });
    }

    let x: Vec<Vec<f64>> = aggregates.iter().map(|a| a.features.clone()).collect();
    let y: Vec<f64> = aggregates.iter().map(|a| a.win_rate).collect();

    let params = ForestParams::from(model);
    let forest = RandomForest::fit(&x, &y, &params);

    let predictions: Vec<f64> = x.iter().map(|row| forest.predict(row)).collect();
    if spread(&y) > DEGENERATE_SPREAD && spread(&predictions) <= DEGENERATE_SPREAD {
        return Err(PredictorError::DegenerateModel {
            rows: predictions.len(),
            value: predictions[0],
        });
    }

    let in_sample_mae = predictions
        .iter()
        .zip(&y)
        .map(|(p, t)| (p - t).abs())
        .sum::<f64>()
        / y.len() as f64;

    let report = TrainingReport {
        rows: aggregates.len(),
        n_features: forest.n_features(),
        n_trees: forest.n_trees(),
        max_tree_depth: forest.max_tree_depth(),
        in_sample_mae,
        feature_importances: forest.feature_importances(),
    };
    info!(
        "Trained {} trees on {} team seasons ({} features), in-sample MAE {:.4}",
        report.n_trees, report.rows, report.n_features, report.in_sample_mae
    );
    Ok((forest, report))
}
