//! Multi-output CART regression tree

use ndarray::ArrayView2;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::InferenceError;

/// Feature values closer than this are treated as equal when placing splits
const FEATURE_THRESHOLD: f64 = 1e-7;

/// Node impurity at or below this is treated as pure
const IMPURITY_EPSILON: f64 = 1e-12;

/// Tree node, stored in a flat arena
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    /// Mean target vector of the training samples that reached the leaf
    Leaf { value: Vec<f64> },
    /// Samples with `x[feature] <= threshold` go left
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Tree growth limits
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    proxy: f64,
}

/// Regression tree predicting all targets jointly.
///
/// Splits minimize the summed squared error over every target column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
    n_features: usize,
    n_targets: usize,
}

impl RegressionTree {
    /// Grow a tree on the rows of `x`/`y` listed in `samples`.
    ///
    /// `samples` may repeat rows (bootstrap draws); a repeated row counts once
    /// per occurrence. `rng` shuffles the order in which features are tried.
    pub fn fit<R: Rng + ?Sized>(
        x: ArrayView2<f64>,
        y: ArrayView2<f64>,
        samples: &[usize],
        params: &TreeParams,
        rng: &mut R,
    ) -> Self {
        let n_features = x.ncols();
        let n_targets = y.ncols();
        let min_leaf = params.min_samples_leaf.max(1);

        let mut nodes = vec![Node::Leaf { value: Vec::new() }];
        let mut features: Vec<usize> = (0..n_features).collect();
        let mut stack = vec![(0usize, samples.to_vec(), 0usize)];

        while let Some((id, indices, depth)) = stack.pop() {
            let value = mean_target(y, &indices);

            let splittable = indices.len() >= params.min_samples_split.max(2)
                && indices.len() >= 2 * min_leaf
                && params.max_depth.map_or(true, |max| depth < max)
                && impurity(y, &indices, &value) > IMPURITY_EPSILON;

            let split = if splittable {
                features.shuffle(rng);
                best_split(x, y, &indices, &features, min_leaf)
            } else {
                None
            };

            match split {
                Some(split) => {
                    let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = indices
                        .iter()
                        .partition(|&&row| x[[row, split.feature]] <= split.threshold);

                    let left = nodes.len();
                    let right = left + 1;
                    nodes.push(Node::Leaf { value: Vec::new() });
                    nodes.push(Node::Leaf { value: Vec::new() });
                    nodes[id] = Node::Split {
                        feature: split.feature,
                        threshold: split.threshold,
                        left,
                        right,
                    };

                    stack.push((right, right_rows, depth + 1));
                    stack.push((left, left_rows, depth + 1));
                }
                None => nodes[id] = Node::Leaf { value },
            }
        }

        Self {
            nodes,
            n_features,
            n_targets,
        }
    }

    /// Predicted target vector for one feature row
    pub fn predict(&self, row: &[f64]) -> Result<&[f64], InferenceError> {
        if row.len() != self.n_features {
            return Err(InferenceError::InvalidInput(format!(
                "expected {} features, got {}",
                self.n_features,
                row.len()
            )));
        }

        let mut id = 0;
        loop {
            match &self.nodes[id] {
                Node::Leaf { value } => return Ok(value),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    id = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_targets(&self) -> usize {
        self.n_targets
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    /// Longest root-to-leaf path, in edges
    pub fn depth(&self) -> usize {
        let mut max_depth = 0;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            if let Node::Split { left, right, .. } = &self.nodes[id] {
                stack.push((*left, depth + 1));
                stack.push((*right, depth + 1));
            }
        }
        max_depth
    }
}

fn mean_target(y: ArrayView2<f64>, indices: &[usize]) -> Vec<f64> {
    let mut sum = vec![0.0; y.ncols()];
    for &row in indices {
        for (t, s) in sum.iter_mut().enumerate() {
            *s += y[[row, t]];
        }
    }
    let n = indices.len().max(1) as f64;
    sum.iter().map(|s| s / n).collect()
}

/// Summed per-target variance
fn impurity(y: ArrayView2<f64>, indices: &[usize], mean: &[f64]) -> f64 {
    if indices.is_empty() {
        return 0.0;
    }
    let mut total = 0.0;
    for &row in indices {
        for (t, m) in mean.iter().enumerate() {
            let d = y[[row, t]] - m;
            total += d * d;
        }
    }
    total / indices.len() as f64
}

/// Best split over `features`, maximizing the impurity proxy
/// `sum_t left_sum_t^2 / n_left + right_sum_t^2 / n_right`
fn best_split(
    x: ArrayView2<f64>,
    y: ArrayView2<f64>,
    indices: &[usize],
    features: &[usize],
    min_leaf: usize,
) -> Option<SplitCandidate> {
    let n = indices.len();
    let n_targets = y.ncols();

    let mut total = vec![0.0; n_targets];
    for &row in indices {
        for (t, s) in total.iter_mut().enumerate() {
            *s += y[[row, t]];
        }
    }

    let mut best: Option<SplitCandidate> = None;
    let mut sorted = indices.to_vec();
    let mut left = vec![0.0; n_targets];

    for &feature in features {
        sorted.sort_by(|&a, &b| x[[a, feature]].total_cmp(&x[[b, feature]]));
        left.iter_mut().for_each(|v| *v = 0.0);

        for i in 0..n - 1 {
            let row = sorted[i];
            for (t, s) in left.iter_mut().enumerate() {
                *s += y[[row, t]];
            }

            let n_left = i + 1;
            let n_right = n - n_left;
            if n_left < min_leaf {
                continue;
            }
            if n_right < min_leaf {
                break;
            }

            let current = x[[row, feature]];
            let next = x[[sorted[i + 1], feature]];
            if next <= current + FEATURE_THRESHOLD {
                continue;
            }

            let proxy: f64 = (0..n_targets)
                .map(|t| {
                    let right = total[t] - left[t];
                    left[t] * left[t] / n_left as f64 + right * right / n_right as f64
                })
                .sum();

            if best.map_or(true, |b| proxy > b.proxy) {
                let mut threshold = current / 2.0 + next / 2.0;
                if threshold >= next || !threshold.is_finite() {
                    threshold = current;
                }
                best = Some(SplitCandidate {
                    feature,
                    threshold,
                    proxy,
                });
            }
        }
    }

    best
}
