//! Held-out evaluation

use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

/// Mean absolute error per target, never aggregated
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetErrors {
    pub systolic: f64,
    pub diastolic: f64,
    pub heart_rate: f64,
}

/// Per-column MAE of `predicted` against `actual`. `None` for empty input.
pub fn mean_absolute_error(predicted: ArrayView2<f64>, actual: ArrayView2<f64>) -> Option<TargetErrors> {
    if predicted.nrows() == 0 || predicted.dim() != actual.dim() || predicted.ncols() != 3 {
        return None;
    }

    let n = predicted.nrows() as f64;
    let mut sums = [0.0; 3];
    for (p, a) in predicted.rows().into_iter().zip(actual.rows()) {
        for (t, sum) in sums.iter_mut().enumerate() {
            *sum += (p[t] - a[t]).abs();
        }
    }

    Some(TargetErrors {
        systolic: sums[0] / n,
        diastolic: sums[1] / n,
        heart_rate: sums[2] / n,
    })
}
