// Feature selection by absolute Pearson correlation against win rate.

use serde::Serialize;
use tracing::info;

use crate::dataset::PlayerSeasonRecord;
use crate::features::Feature;

/// Number of features the model is trained on by default.
pub const DEFAULT_TOP_K: usize = 8;

/// Ordered list of selected features, most correlated first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FeatureSet(Vec<Feature>);

impl FeatureSet {
    pub fn new(features: Vec<Feature>) -> Self {
        Self(features)
    }

    pub fn features(&self) -> &[Feature] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Feature> + '_ {
        self.0.iter().copied()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.iter().map(Feature::name).collect()
    }
}

/// One candidate's correlation with win rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureCorrelation {
    pub feature: Feature,
    /// Signed Pearson r, `None` when undefined.
    pub r: Option<f64>,
}

impl FeatureCorrelation {
    /// Ranking key: |r|, with an undefined correlation ranked as 0.
    pub fn strength(&self) -> f64 {
        self.r.map_or(0.0, f64::abs)
    }
}

/// Pearson correlation over the pairs. `None` with fewer than two pairs or
/// when either side has zero variance.
pub fn pearson(pairs: &[(f64, f64)]) -> Option<f64> {
    if pairs.len() < 2 {
        return None;
    }
    let (x0, y0) = pairs[0];
    if pairs.iter().all(|(x, _)| *x == x0) || pairs.iter().all(|(_, y)| *y == y0) {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (x, y) in pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx <= 0.0 || syy <= 0.0 {
        return None;
    }
    let r = sxy / (sxx.sqrt() * syy.sqrt());
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}

/// Correlation of every candidate with win rate, over rows where both are
/// present, in candidate order.
pub fn correlations(records: &[PlayerSeasonRecord]) -> Vec<FeatureCorrelation> {
    Feature::CANDIDATES
        .into_iter()
        .map(|feature| {
            let pairs: Vec<(f64, f64)> = records
                .iter()
                .filter_map(|r| Some((r.feature(feature)?, r.win_rate?)))
                .collect();
            FeatureCorrelation {
                feature,
                r: pearson(&pairs),
            }
        })
        .collect()
}

/// Keep the `top_k` candidates with the largest |r|. The sort is stable, so
/// equal strengths keep candidate order.
pub fn select_features(records: &[PlayerSeasonRecord], top_k: usize) -> FeatureSet {
    let mut ranked = correlations(records);
    ranked.sort_by(|a, b| b.strength().total_cmp(&a.strength()));
    ranked.truncate(top_k);

    let selected = FeatureSet::new(ranked.iter().map(|c| c.feature).collect());
    info!("Selected features: {}", selected.names().join(", "));
    selected
}
