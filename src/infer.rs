//! The inference operation.
//!
//! One JSON record in, one risk percentage out. Two steps are guarded:
//! building and coercing the row, and running the model. Their failures come
//! back as [`InferError`], whose message is what callers report.

use serde_json::Value;

use crate::error::{InferError, PredictionError};
use crate::features::derive_features;
use crate::frame::FeatureFrame;
use crate::model::RiskModel;

/// Knobs of a single inference run.
#[derive(Debug, Clone, Copy, Default)]
pub struct InferOptions {
    /// Recompute engineered fields from raw fields before building the row.
    pub derive_features: bool,
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct Prediction {
    /// Positive-class probability scaled to 0-100.
    pub risk_percentage: f64,
    /// The row as the model received it.
    pub frame: FeatureFrame,
}

/// Score one input record.
pub fn infer(model: &RiskModel, record: &Value, options: &InferOptions) -> Result<Prediction, InferError> {
    let mut frame = match (options.derive_features, record) {
        (true, Value::Object(map)) => {
            let mut map = map.clone();
            derive_features(&mut map);
            FeatureFrame::from_map(&map)
        }
        _ => FeatureFrame::from_record(record)?,
    };
    frame.coerce()?;

    let proba = model.predict_proba(&frame)?;
    let positive = proba
        .get(1)
        .copied()
        .ok_or(PredictionError::MissingPositiveClass(proba.len()))?;

    // f32 arithmetic, as the classifier returns float32 probabilities
    let risk_percentage = f64::from(positive * 100.0_f32);
    tracing::debug!(risk_percentage, "prediction");

    Ok(Prediction {
        risk_percentage,
        frame,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compat::xgboost::XgbModel;
    use crate::error::CoercionError;
    use crate::schema;
    use serde_json::json;

    /// Single stump on Engines: < 2 gives margin -1, otherwise +1.
    fn engines_model() -> RiskModel {
        let raw = json!({
            "version": [2, 1, 0],
            "learner": {
                "feature_names": schema::column_names().collect::<Vec<_>>(),
                "gradient_booster": {"name": "gbtree", "model": {
                    "trees": [{
                        "tree_param": {"num_nodes": "3"},
                        "base_weights": [0.0, -1.0, 1.0],
                        "left_children": [1, -1, -1],
                        "right_children": [2, -1, -1],
                        "split_indices": [8, 0, 0],
                        "split_conditions": [2.0, -1.0, 1.0],
                        "default_left": [1, 0, 0],
                    }],
                    "tree_info": [0],
                }},
                "objective": {"name": "binary:logistic"},
                "learner_model_param": {"base_score": "5E-1", "num_class": "0", "num_feature": "37"},
            },
        });
        RiskModel::from_xgb(XgbModel::from_value(raw).unwrap()).unwrap()
    }

    fn expected_risk(margin: f32) -> f64 {
        let p = 1.0 / (1.0 + (-margin).exp());
        f64::from(p * 100.0_f32)
    }

    #[test]
    fn scores_numeric_string_input() {
        let prediction = infer(&engines_model(), &json!({"Engines": "3"}), &InferOptions::default()).unwrap();
        assert!((prediction.risk_percentage - expected_risk(1.0)).abs() < 1e-4);
        assert!((0.0..=100.0).contains(&prediction.risk_percentage));
    }

    #[test]
    fn non_numeric_string_is_invalid_input() {
        let err = infer(&engines_model(), &json!({"Engines": "two"}), &InferOptions::default()).unwrap_err();
        assert_eq!(
            err,
            InferError::InvalidInput(CoercionError::StringToFloat("two".into()))
        );
        assert!(err.to_string().starts_with("Invalid input format: "));
    }

    #[test]
    fn string_passthrough_column_is_prediction_fault() {
        let err = infer(&engines_model(), &json!({"Location": "SFO"}), &InferOptions::default()).unwrap_err();
        assert!(matches!(err, InferError::Prediction(PredictionError::InvalidDtype(_))));
        assert!(err.to_string().starts_with("Prediction failed: "));
    }

    #[test]
    fn non_object_record_is_invalid_input() {
        let err = infer(&engines_model(), &json!(42), &InferOptions::default()).unwrap_err();
        assert!(matches!(err, InferError::InvalidInput(CoercionError::NotAnObject("number"))));
    }

    #[test]
    fn derivation_runs_before_row_is_built() {
        let options = InferOptions { derive_features: true };
        let record = json!({"temp_max": 30, "temp_min": 21});
        let prediction = infer(&engines_model(), &record, &options).unwrap();
        assert_eq!(prediction.frame.get("TempRange"), Some(&crate::frame::Cell::Float(9.0)));
    }

    #[test]
    fn identical_inputs_give_identical_results() {
        let model = engines_model();
        let record = json!({"Engines": 1, "Altitude": 1200.5});
        let a = infer(&model, &record, &InferOptions::default()).unwrap();
        let b = infer(&model, &record, &InferOptions::default()).unwrap();
        assert_eq!(a.risk_percentage.to_bits(), b.risk_percentage.to_bits());
    }
}
