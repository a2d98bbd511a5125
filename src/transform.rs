//! Margin to class-probability transformation.
//!
//! [`OutputTransform`] turns the raw margins of one sample into the class
//! probability row a classifier's `predict_proba` returns.

/// Inference-time output transformation of a classification objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputTransform {
    /// Logistic sigmoid over a single log-odds margin.
    /// Yields the two-column row `[1 - p, p]`.
    Sigmoid,

    /// Softmax over one margin per class.
    Softmax,
}

impl OutputTransform {
    /// Transform for an XGBoost objective name, or `None` if the objective
    /// does not produce class probabilities.
    pub fn from_objective(objective: &str) -> Option<Self> {
        match objective {
            "binary:logistic" | "binary:logitraw" | "reg:logistic" => Some(OutputTransform::Sigmoid),
            "multi:softprob" | "multi:softmax" => Some(OutputTransform::Softmax),
            _ => None,
        }
    }

    /// Class probabilities for one sample's margins.
    pub fn to_proba(&self, margins: &[f32]) -> Vec<f32> {
        match self {
            OutputTransform::Sigmoid => {
                let p = margins.first().copied().map_or(f32::NAN, sigmoid);
                vec![1.0 - p, p]
            }
            OutputTransform::Softmax => {
                let mut row = margins.to_vec();
                softmax_inplace(&mut row);
                row
            }
        }
    }
}

/// Numerically stable sigmoid.
/// Clamps input to [-500, 500] to prevent overflow.
#[inline]
fn sigmoid(x: f32) -> f32 {
    let clamped = x.clamp(-500.0, 500.0);
    if clamped >= 0.0 {
        1.0 / (1.0 + (-clamped).exp())
    } else {
        let e = clamped.exp();
        e / (1.0 + e)
    }
}

/// Softmax in place, shifted by the row max.
#[inline]
fn softmax_inplace(row: &mut [f32]) {
    if row.is_empty() {
        return;
    }

    let max = row.iter().cloned().fold(f32::NEG_INFINITY, f32::max);

    let mut sum = 0.0f32;
    for x in row.iter_mut() {
        *x = (*x - max).exp();
        sum += *x;
    }

    if sum > 0.0 {
        for x in row.iter_mut() {
            *x /= sum;
        }
    }
}
