//! XGBoost JSON model loading and conversion.

mod convert;
mod json;

pub use convert::ConversionError;
pub use json::*;
