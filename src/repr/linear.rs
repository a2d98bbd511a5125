//! Linear booster (gblinear).

use ndarray::{Array2, ArrayView1};

/// Linear model with weights shaped `[n_features + 1, n_groups]`.
///
/// The last row holds the per-group bias, with the base score already folded in.
#[derive(Debug, Clone)]
pub struct LinearModel {
    weights: Array2<f32>,
}

impl LinearModel {
    pub fn new(weights: Array2<f32>) -> Self {
        debug_assert!(weights.nrows() >= 1);
        Self { weights }
    }

    pub fn n_features(&self) -> usize {
        self.weights.nrows() - 1
    }

    pub fn n_groups(&self) -> usize {
        self.weights.ncols()
    }

    pub fn bias(&self, group: usize) -> f32 {
        self.weights[[self.n_features(), group]]
    }

    /// Margin per group. Missing features contribute nothing.
    pub fn predict_row(&self, sample: ArrayView1<'_, f32>) -> Vec<f32> {
        let n_features = self.n_features();
        (0..self.n_groups())
            .map(|group| {
                let column = self.weights.column(group);
                sample
                    .iter()
                    .take(n_features)
                    .zip(column.iter())
                    .filter(|(x, _)| !x.is_nan())
                    .fold(self.bias(group), |acc, (x, w)| acc + x * w)
            })
            .collect()
    }
}
