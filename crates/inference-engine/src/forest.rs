//! Bagged ensemble of regression trees

use ndarray::{Array2, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::tree::{RegressionTree, TreeParams};
use crate::InferenceError;

/// Forest hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    /// Number of trees
    pub n_trees: usize,
    /// Maximum tree depth (unbounded when absent)
    pub max_depth: Option<usize>,
    /// Minimum samples required to split a node
    pub min_samples_split: usize,
    /// Minimum samples in each leaf
    pub min_samples_leaf: usize,
    /// Draw a bootstrap sample per tree
    pub bootstrap: bool,
    /// Base seed; tree `t` uses `seed + t`
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            bootstrap: true,
            seed: 42,
        }
    }
}

impl ForestConfig {
    fn tree_params(&self) -> TreeParams {
        TreeParams {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
        }
    }
}

/// Multi-output random forest regressor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<RegressionTree>,
    n_features: usize,
    n_targets: usize,
}

impl RandomForest {
    /// Fit on `x` (samples x features) and `y` (samples x targets).
    ///
    /// Trees are grown in parallel. Each tree seeds its own generator from
    /// the config, so the result does not depend on thread scheduling.
    pub fn fit(
        x: ArrayView2<f64>,
        y: ArrayView2<f64>,
        config: &ForestConfig,
    ) -> Result<Self, InferenceError> {
        let n_samples = x.nrows();
        if n_samples == 0 {
            return Err(InferenceError::InvalidInput("no training samples".to_string()));
        }
        if y.nrows() != n_samples {
            return Err(InferenceError::InvalidInput(format!(
                "feature rows ({}) and target rows ({}) differ",
                n_samples,
                y.nrows()
            )));
        }
        if x.ncols() == 0 || y.ncols() == 0 {
            return Err(InferenceError::InvalidInput(
                "features and targets must have at least one column".to_string(),
            ));
        }
        if config.n_trees == 0 {
            return Err(InferenceError::InvalidInput("n_trees must be positive".to_string()));
        }
        if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
            return Err(InferenceError::InvalidInput(
                "training data contains non-finite values".to_string(),
            ));
        }

        info!(
            "Fitting random forest: {} trees on {} samples ({} features, {} targets)",
            config.n_trees,
            n_samples,
            x.ncols(),
            y.ncols()
        );

        let params = config.tree_params();
        let trees: Vec<RegressionTree> = (0..config.n_trees)
            .into_par_iter()
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(t as u64));
                let samples: Vec<usize> = if config.bootstrap {
                    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
                } else {
                    (0..n_samples).collect()
                };
                RegressionTree::fit(x, y, &samples, &params, &mut rng)
            })
            .collect();

        debug!(
            "Forest fitted, mean leaves per tree: {:.1}",
            trees.iter().map(|t| t.leaf_count()).sum::<usize>() as f64 / trees.len() as f64
        );

        Ok(Self {
            trees,
            n_features: x.ncols(),
            n_targets: y.ncols(),
        })
    }

    /// Average of all tree predictions for one row
    pub fn predict(&self, row: &[f64]) -> Result<Vec<f64>, InferenceError> {
        if self.trees.is_empty() {
            return Err(InferenceError::NotFitted);
        }
        if row.len() != self.n_features {
            return Err(InferenceError::InvalidInput(format!(
                "expected {} features, got {}",
                self.n_features,
                row.len()
            )));
        }

        let mut sum = vec![0.0; self.n_targets];
        for tree in &self.trees {
            for (s, v) in sum.iter_mut().zip(tree.predict(row)?) {
                *s += v;
            }
        }
        let n = self.trees.len() as f64;
        Ok(sum.into_iter().map(|s| s / n).collect())
    }

    /// Predict every row of `x`
    pub fn predict_batch(&self, x: ArrayView2<f64>) -> Result<Array2<f64>, InferenceError> {
        let mut out = Array2::zeros((x.nrows(), self.n_targets));
        for (i, row) in x.rows().into_iter().enumerate() {
            let row: Vec<f64> = row.iter().copied().collect();
            let prediction = self.predict(&row)?;
            for (t, v) in prediction.into_iter().enumerate() {
                out[[i, t]] = v;
            }
        }
        Ok(out)
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_targets(&self) -> usize {
        self.n_targets
    }
}
