//! External format compatibility loaders.
//!
//! Models trained elsewhere are read in their native serialization and
//! converted to the types in [`crate::repr`].

pub mod xgboost;

pub use xgboost::{ConversionError, XgbModel};
