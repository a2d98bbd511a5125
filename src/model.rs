//! High-level model wrapper for inference.
//!
//! [`RiskModel`] owns a converted booster together with what is needed to
//! turn a [`FeatureFrame`] into model input: the feature names and types the
//! artifact was trained with and the string levels of its categorical
//! features.
//!
//! ```ignore
//! let model = RiskModel::load("final_model.json")?;
//! let proba = model.predict_proba(&frame)?;
//! let risk = proba[1] * 100.0;
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use ndarray::Array1;

use crate::compat::xgboost::{FeatureType, XgbModel};
use crate::error::{ModelError, PredictionError};
use crate::frame::{Cell, FeatureFrame};
use crate::repr::{is_valid_category, Booster};
use crate::schema::{self, N_FEATURES};
use crate::transform::OutputTransform;

/// Feature information recorded in the artifact.
#[derive(Debug, Clone, Default)]
pub struct FeatureInfo {
    /// Feature names, empty if the artifact was trained without names.
    pub names: Vec<String>,
    /// Whether each feature is categorical, by feature index.
    pub categorical: Vec<bool>,
    /// String levels of categorical features, keyed by feature name.
    pub levels: BTreeMap<String, Vec<String>>,
}

impl FeatureInfo {
    #[inline]
    fn is_categorical(&self, index: usize) -> bool {
        self.categorical.get(index).copied().unwrap_or(false)
    }
}

/// An inference-ready classifier.
#[derive(Debug, Clone)]
pub struct RiskModel {
    booster: Booster,
    n_features: usize,
    objective: String,
    features: FeatureInfo,
}

impl RiskModel {
    /// Load and convert an XGBoost JSON model.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let model = Self::from_xgb(XgbModel::from_file(path)?)?;
        tracing::debug!(
            path = %path.display(),
            n_features = model.n_features,
            n_groups = model.n_groups(),
            objective = %model.objective,
            "loaded model"
        );
        Ok(model)
    }

    pub fn from_xgb(xgb: XgbModel) -> Result<Self, ModelError> {
        let booster = xgb.to_booster()?;
        let learner = xgb.learner;
        let features = FeatureInfo {
            categorical: learner
                .feature_types
                .iter()
                .map(|t| *t == FeatureType::Categorical)
                .collect(),
            names: learner.feature_names,
            levels: xgb.category_levels,
        };

        Ok(Self {
            booster,
            n_features: learner.learner_model_param.n_features.max(0) as usize,
            objective: learner.objective.name,
            features,
        })
    }

    #[inline]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    #[inline]
    pub fn n_groups(&self) -> usize {
        self.booster.n_groups()
    }

    pub fn objective(&self) -> &str {
        &self.objective
    }

    pub fn features(&self) -> &FeatureInfo {
        &self.features
    }

    /// Check the artifact's features against the fixed schema.
    ///
    /// Named models must list exactly the schema columns in order; unnamed
    /// models must at least have the same width.
    pub fn check_schema(&self) -> Result<(), PredictionError> {
        if self.features.names.is_empty() {
            if self.n_features != N_FEATURES {
                return Err(PredictionError::FeatureCountMismatch {
                    expected: self.n_features,
                    got: N_FEATURES,
                });
            }
            return Ok(());
        }

        let names = &self.features.names;
        let width = names.len().max(N_FEATURES);
        for index in 0..width {
            let expected = names.get(index).map(String::as_str);
            let got = schema::FEATURE_SCHEMA.get(index).map(|c| c.name);
            if expected != got {
                return Err(PredictionError::FeatureNamesMismatch {
                    index,
                    expected: expected.unwrap_or("<none>").to_string(),
                    got: got.unwrap_or("<none>").to_string(),
                });
            }
        }
        Ok(())
    }

    /// Encode a frame as one dense `f32` feature row.
    ///
    /// Missing cells become NaN. Strings are only accepted in categorical
    /// features, where they are mapped to their level index.
    pub fn encode(&self, frame: &FeatureFrame) -> Result<Array1<f32>, PredictionError> {
        let mut row = Array1::from_elem(frame.n_columns(), f32::NAN);
        let mut invalid = Vec::new();

        for (index, (name, cell)) in frame.iter().enumerate() {
            let value = if self.features.is_categorical(index) {
                self.encode_category(name, cell)?
            } else {
                match cell {
                    Cell::Missing => f64::NAN,
                    Cell::Bool(b) => f64::from(u8::from(*b)),
                    Cell::Int(i) => *i as f64,
                    Cell::Float(f) => *f,
                    Cell::Str(_) | Cell::Other(_) => {
                        invalid.push((name.to_string(), cell.dtype()));
                        continue;
                    }
                }
            };
            row[index] = value as f32;
        }

        if !invalid.is_empty() {
            return Err(PredictionError::InvalidDtype(invalid));
        }
        Ok(row)
    }

    fn encode_category(&self, name: &str, cell: &Cell) -> Result<f64, PredictionError> {
        let invalid = || PredictionError::InvalidCategory {
            column: name.to_string(),
            value: cell.to_string(),
        };

        match cell {
            Cell::Missing => Ok(f64::NAN),
            Cell::Str(s) => {
                let levels = self
                    .features
                    .levels
                    .get(name)
                    .ok_or_else(|| PredictionError::MissingCategoryLevels(name.to_string()))?;
                match levels.iter().position(|level| level == s) {
                    Some(code) => Ok(code as f64),
                    None => {
                        tracing::warn!(column = name, value = %s, "unseen category level, treating as missing");
                        Ok(f64::NAN)
                    }
                }
            }
            Cell::Bool(b) => Ok(f64::from(u8::from(*b))),
            Cell::Int(_) | Cell::Float(_) => {
                let value = cell.to_float().map_err(|_| invalid())?;
                if value.is_nan() || is_valid_category(value) {
                    Ok(value)
                } else {
                    Err(invalid())
                }
            }
            Cell::Other(_) => Err(invalid()),
        }
    }

    /// Class probabilities for the single row in `frame`.
    pub fn predict_proba(&self, frame: &FeatureFrame) -> Result<Vec<f32>, PredictionError> {
        self.check_schema()?;
        let transform = OutputTransform::from_objective(&self.objective)
            .ok_or_else(|| PredictionError::UnsupportedObjective(self.objective.clone()))?;

        let row = self.encode(frame)?;
        let margins = self.booster.predict_margins(row.view());
        tracing::debug!(?margins, "raw margins");

        Ok(transform.to_proba(&margins))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use serde_json::{json, Value};

    const ENGINE_TYPE: usize = 9;
    const ALTITUDE: usize = 15;

    /// Two-tree binary model:
    /// tree 0 splits Altitude < 1000 (missing left), tree 1 sends
    /// EngineType in {Piston} right (missing left).
    fn model_json(with_names: bool) -> Value {
        let names: Vec<&str> = schema::column_names().collect();
        let types: Vec<&str> = (0..N_FEATURES)
            .map(|i| if i == ENGINE_TYPE { "c" } else { "float" })
            .collect();
        let mut learner = json!({
            "feature_types": types,
            "gradient_booster": {"name": "gbtree", "model": {
                "trees": [
                    {
                        "tree_param": {"num_nodes": "3"},
                        "base_weights": [0.0, -1.0, 1.0],
                        "left_children": [1, -1, -1],
                        "right_children": [2, -1, -1],
                        "split_indices": [ALTITUDE, 0, 0],
                        "split_conditions": [1000.0, -1.0, 1.0],
                        "default_left": [1, 0, 0],
                    },
                    {
                        "tree_param": {"num_nodes": "3"},
                        "base_weights": [0.0, -0.5, 0.5],
                        "left_children": [1, -1, -1],
                        "right_children": [2, -1, -1],
                        "split_indices": [ENGINE_TYPE, 0, 0],
                        "split_conditions": [0.0, -0.5, 0.5],
                        "split_type": [1, 0, 0],
                        "default_left": [1, 0, 0],
                        "categories": [1],
                        "categories_nodes": [0],
                        "categories_segments": [0],
                        "categories_sizes": [1],
                    },
                ],
                "tree_info": [0, 0],
            }},
            "objective": {"name": "binary:logistic"},
            "learner_model_param": {"base_score": "5E-1", "num_class": "0", "num_feature": "37"},
        });
        if with_names {
            learner["feature_names"] = json!(names);
        }
        json!({
            "version": [2, 1, 0],
            "learner": learner,
            "category_levels": {"EngineType": ["Jet", "Piston", "Turboprop"]},
        })
    }

    fn model() -> RiskModel {
        RiskModel::from_xgb(XgbModel::from_value(model_json(true)).unwrap()).unwrap()
    }

    fn frame(record: Value) -> FeatureFrame {
        let mut frame = FeatureFrame::from_record(&record).unwrap();
        frame.coerce().unwrap();
        frame
    }

    fn sigmoid(x: f32) -> f32 {
        1.0 / (1.0 + (-x).exp())
    }

    #[test]
    fn predicts_probability_pair() {
        let proba = model()
            .predict_proba(&frame(json!({"Altitude": 1500, "EngineType": "Piston"})))
            .unwrap();
        assert_eq!(proba.len(), 2);
        assert_abs_diff_eq!(proba[1], sigmoid(1.5), epsilon = 1e-6);
        assert_abs_diff_eq!(proba[0] + proba[1], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn missing_values_take_default_direction() {
        let proba = model().predict_proba(&frame(json!({}))).unwrap();
        assert_abs_diff_eq!(proba[1], sigmoid(-1.5), epsilon = 1e-6);
    }

    #[test]
    fn unseen_level_is_missing() {
        let proba = model()
            .predict_proba(&frame(json!({"Altitude": 500, "EngineType": "Rocket"})))
            .unwrap();
        assert_abs_diff_eq!(proba[1], sigmoid(-1.5), epsilon = 1e-6);
    }

    #[test]
    fn numeric_category_code_is_accepted() {
        let model = model();
        let row = model.encode(&frame(json!({"EngineType": 2}))).unwrap();
        assert_eq!(row[ENGINE_TYPE], 2.0);
        assert!(row[ALTITUDE].is_nan());
    }

    #[test]
    fn fractional_category_is_rejected() {
        let err = model().encode(&frame(json!({"EngineType": 1.5}))).unwrap_err();
        assert!(matches!(err, PredictionError::InvalidCategory { .. }));
    }

    #[test]
    fn strings_in_numeric_features_are_invalid_dtype() {
        let err = model()
            .encode(&frame(json!({"Location": "SFO", "Season": "Summer", "Month": 8})))
            .unwrap_err();
        assert_eq!(
            err,
            PredictionError::InvalidDtype(vec![
                ("Location".into(), "object"),
                ("Season".into(), "object"),
            ])
        );
    }

    #[test]
    fn categorical_string_without_levels_fails() {
        let mut raw = model_json(true);
        raw["category_levels"] = json!({});
        let model = RiskModel::from_xgb(XgbModel::from_value(raw).unwrap()).unwrap();
        let err = model.encode(&frame(json!({"EngineType": "Jet"}))).unwrap_err();
        assert_eq!(err, PredictionError::MissingCategoryLevels("EngineType".into()));
    }

    #[test]
    fn feature_names_are_checked() {
        let mut raw = model_json(true);
        raw["learner"]["feature_names"][1] = json!("Place");
        let model = RiskModel::from_xgb(XgbModel::from_value(raw).unwrap()).unwrap();
        let err = model.predict_proba(&frame(json!({}))).unwrap_err();
        assert_eq!(
            err,
            PredictionError::FeatureNamesMismatch {
                index: 1,
                expected: "Place".into(),
                got: "Location".into(),
            }
        );
    }

    #[test]
    fn unnamed_model_must_match_width() {
        let mut raw = model_json(false);
        raw["learner"]["learner_model_param"]["num_feature"] = json!("36");
        let model = RiskModel::from_xgb(XgbModel::from_value(raw).unwrap()).unwrap();
        assert!(matches!(
            model.check_schema(),
            Err(PredictionError::FeatureCountMismatch { expected: 36, got: 37 })
        ));

        let model = RiskModel::from_xgb(XgbModel::from_value(model_json(false)).unwrap()).unwrap();
        assert_eq!(model.check_schema(), Ok(()));
    }

    #[test]
    fn regression_objective_is_unsupported() {
        let mut raw = model_json(true);
        raw["learner"]["objective"]["name"] = json!("reg:squarederror");
        let model = RiskModel::from_xgb(XgbModel::from_value(raw).unwrap()).unwrap();
        let err = model.predict_proba(&frame(json!({}))).unwrap_err();
        assert_eq!(err, PredictionError::UnsupportedObjective("reg:squarederror".into()));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = RiskModel::load("/nonexistent/final_model.json").unwrap_err();
        assert!(matches!(err, ModelError::Io { .. }));
    }
}
