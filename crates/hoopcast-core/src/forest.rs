//! Random-forest regression.
//!
//! A forest of CART regression trees, each fit on a bootstrap sample of the
//! training rows. Every split considers every feature and picks the threshold
//! with the largest reduction in squared error; leaves predict the mean target
//! of their rows. The forest prediction is the mean over trees.
//!
//! # Determinism
//!
//! Tree `t` draws its bootstrap sample from its own [`Pcg64`] stream seeded
//! from `(seed, t)`. Trees are fit in parallel with rayon but collected in
//! index order, so a fixed seed always yields the same forest regardless of
//! thread count or scheduling.
//!
//! # Example
//!
//! ```
//! use hoopcast_core::forest::{ForestParams, RandomForest};
//!
//! let x: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64]).collect();
//! let y: Vec<f64> = (0..20).map(|i| if i < 10 { 0.2 } else { 0.8 }).collect();
//!
//! let forest = RandomForest::fit(&x, &y, &ForestParams::default());
//! assert!(forest.predict(&[2.0]) < 0.5);
//! assert!(forest.predict(&[17.0]) > 0.5);
//! ```

use rand::{Rng, SeedableRng as _};
use rand_pcg::Pcg64;
use rayon::prelude::*;

/// Nodes whose target variance is at or below this are leaves.
const PURITY_EPSILON: f64 = 1e-12;

/// Hyper-parameters for [`RandomForest::fit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: usize,
    /// Nodes with fewer rows than this are not split.
    pub min_samples_split: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 200,
            max_depth: 10,
            min_samples_split: 2,
            seed: 42,
        }
    }
}

// ---------------------------------------------------------------------------
// Regression tree
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A single CART regression tree stored as a flat node array; node 0 is the
/// root.
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionTree {
    nodes: Vec<Node>,
    /// Total squared-error reduction contributed by each feature.
    importances: Vec<f64>,
}

/// Best split found for a node.
#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

struct TreeBuilder<'a> {
    x: &'a [Vec<f64>],
    y: &'a [f64],
    max_depth: usize,
    min_samples_split: usize,
    nodes: Vec<Node>,
    importances: Vec<f64>,
}

impl TreeBuilder<'_> {
    fn mean(&self, rows: &[usize]) -> f64 {
        rows.iter().map(|&i| self.y[i]).sum::<f64>() / rows.len() as f64
    }

    fn variance(&self, rows: &[usize], mean: f64) -> f64 {
        rows.iter().map(|&i| (self.y[i] - mean).powi(2)).sum::<f64>() / rows.len() as f64
    }

    /// Scan every feature for the threshold maximising
    /// `sum_l² / n_l + sum_r² / n_r`, which is equivalent to minimising the
    /// children's squared error.
    fn best_split(&self, rows: &[usize]) -> Option<SplitCandidate> {
        let n = rows.len();
        let total: f64 = rows.iter().map(|&i| self.y[i]).sum();
        let parent_score = total * total / n as f64;
        let n_features = self.x[rows[0]].len();

        let mut best: Option<SplitCandidate> = None;
        let mut sorted = rows.to_vec();
        for feature in 0..n_features {
            sorted.sort_by(|&a, &b| self.x[a][feature].total_cmp(&self.x[b][feature]));

            let mut left_sum = 0.0;
            for k in 1..n {
                left_sum += self.y[sorted[k - 1]];
                let lo = self.x[sorted[k - 1]][feature];
                let hi = self.x[sorted[k]][feature];
                if lo >= hi {
                    continue;
                }
                let right_sum = total - left_sum;
                let score = left_sum * left_sum / k as f64
                    + right_sum * right_sum / (n - k) as f64;
                let gain = score - parent_score;
                if gain <= PURITY_EPSILON {
                    continue;
                }
                if best.map_or(true, |b| gain > b.gain) {
                    let mut threshold = lo + (hi - lo) / 2.0;
                    if threshold >= hi {
                        threshold = lo;
                    }
                    best = Some(SplitCandidate {
                        feature,
                        threshold,
                        gain,
                    });
                }
            }
        }
        best
    }

    fn build(&mut self, rows: &[usize], depth: usize) -> usize {
        let id = self.nodes.len();
        let mean = self.mean(rows);
        self.nodes.push(Node::Leaf { value: mean });

        if depth >= self.max_depth
            || rows.len() < self.min_samples_split
            || self.variance(rows, mean) <= PURITY_EPSILON
        {
            return id;
        }
        let Some(split) = self.best_split(rows) else {
            return id;
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .iter()
            .partition(|&&i| self.x[i][split.feature] <= split.threshold);
        self.importances[split.feature] += split.gain;

        let left = self.build(&left_rows, depth + 1);
        let right = self.build(&right_rows, depth + 1);
        self.nodes[id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        id
    }
}

impl RegressionTree {
    /// Fit a tree on the rows listed in `sample` (indices into `x`/`y`,
    /// repeats allowed). `sample` must not be empty.
    pub fn fit(
        x: &[Vec<f64>],
        y: &[f64],
        sample: &[usize],
        max_depth: usize,
        min_samples_split: usize,
    ) -> Self {
        let n_features = x.first().map_or(0, Vec::len);
        let mut builder = TreeBuilder {
            x,
            y,
            max_depth,
            min_samples_split: min_samples_split.max(2),
            nodes: Vec::new(),
            importances: vec![0.0; n_features],
        };
        builder.build(sample, 0);
        Self {
            nodes: builder.nodes,
            importances: builder.importances,
        }
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        let mut id = 0;
        loop {
            match self.nodes[id] {
                Node::Leaf { value } => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    id = if row[feature] <= threshold { left } else { right };
                }
            }
        }
    }

    /// Number of edges on the longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], id: usize) -> usize {
            match nodes[id] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, left).max(walk(nodes, right)),
            }
        }
        walk(&self.nodes, 0)
    }

    #[cfg(test)]
    fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }
}

// ---------------------------------------------------------------------------
// Forest
// ---------------------------------------------------------------------------

/// Bagged ensemble of [`RegressionTree`]s.
#[derive(Debug, Clone, PartialEq)]
pub struct RandomForest {
    trees: Vec<RegressionTree>,
    n_features: usize,
}

fn tree_rng(seed: u64, tree: usize) -> Pcg64 {
    Pcg64::seed_from_u64(seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ tree as u64)
}

impl RandomForest {
    /// Fit `params.n_trees` trees on bootstrap samples of `(x, y)`.
    ///
    /// `x` must be non-empty, rectangular, and as long as `y`.
    pub fn fit(x: &[Vec<f64>], y: &[f64], params: &ForestParams) -> Self {
        assert_eq!(x.len(), y.len(), "feature and target rows differ");
        assert!(!x.is_empty(), "cannot fit a forest on zero rows");
        let n = x.len();

        let trees = (0..params.n_trees.max(1))
            .into_par_iter()
            .map(|t| {
                let mut rng = tree_rng(params.seed, t);
                let sample: Vec<usize> = (0..n).map(|_| rng.random_range(0..n)).collect();
                RegressionTree::fit(x, y, &sample, params.max_depth, params.min_samples_split)
            })
            .collect();

        Self {
            trees,
            n_features: x[0].len(),
        }
    }

    /// Mean prediction over all trees. `row` must have `n_features` values.
    pub fn predict(&self, row: &[f64]) -> f64 {
        debug_assert_eq!(row.len(), self.n_features);
        self.trees.iter().map(|t| t.predict(row)).sum::<f64>() / self.trees.len() as f64
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Depth of the deepest tree.
    pub fn max_tree_depth(&self) -> usize {
        self.trees.iter().map(RegressionTree::depth).max().unwrap_or(0)
    }

    /// Impurity-based importances, normalised to sum to 1 (all zero when no
    /// tree ever split).
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut totals = vec![0.0; self.n_features];
        for tree in &self.trees {
            for (acc, v) in totals.iter_mut().zip(&tree.importances) {
                *acc += v;
            }
        }
        let sum: f64 = totals.iter().sum();
        if sum > 0.0 {
            totals.iter_mut().for_each(|v| *v /= sum);
        }
        totals
    }
}
