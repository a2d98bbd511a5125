//! aircraft-risk: score an aircraft incident record with a pretrained
//! gradient-boosted classifier.
//!
//! The model is an XGBoost JSON artifact evaluated natively. A JSON record is
//! laid out in the fixed 37-column [`schema`], coerced like a pandas row, and
//! turned into a risk percentage by [`infer::infer`].

pub mod cli;
pub mod compat;
pub mod error;
pub mod features;
pub mod frame;
pub mod infer;
pub mod model;
pub mod repr;
pub mod report;
pub mod schema;
pub mod transform;

pub use error::{CoercionError, InferError, ModelError, PredictionError};
pub use infer::{infer, InferOptions, Prediction};
pub use model::RiskModel;
pub use report::{Outcome, RiskLevel};
