//! End-to-end inference against the hand-built XGBoost fixture.

mod common;

use aircraft_risk::{infer, InferError, InferOptions, PredictionError, RiskModel};
use approx::assert_abs_diff_eq;
use common::{risk_case, risk_cases, risk_model_path, RISK_TOLERANCE};
use rstest::rstest;
use serde_json::json;

fn model() -> RiskModel {
    RiskModel::load(risk_model_path()).expect("fixture model loads")
}

#[test]
fn fixture_model_shape() {
    let model = model();
    assert_eq!(model.n_features(), 37);
    assert_eq!(model.n_groups(), 1);
    assert_eq!(model.objective(), "binary:logistic");
    assert_eq!(model.features().names.len(), 37);
    assert_eq!(model.features().levels["EngineType"], ["Jet", "Piston", "Turboprop"]);
}

#[rstest]
#[case("complete_record")]
#[case("high_altitude_piston")]
#[case("all_missing")]
#[case("string_numbers")]
#[case("unseen_level")]
fn matches_reference_risk(#[case] name: &str) {
    let case = risk_case(name);
    let prediction = infer(&model(), &case.record, &InferOptions::default()).unwrap();
    assert_abs_diff_eq!(prediction.risk_percentage, case.risk_percentage, epsilon = RISK_TOLERANCE);
}

#[test]
fn every_case_is_a_percentage() {
    let model = model();
    for case in risk_cases() {
        let risk = infer(&model, &case.record, &InferOptions::default())
            .unwrap()
            .risk_percentage;
        assert!((0.0..=100.0).contains(&risk), "{}: {risk}", case.name);
        // margin sign decides which side of 50% the risk falls on
        assert_eq!(risk > 50.0, case.margin > 0.0, "{}", case.name);
    }
}

#[test]
fn engines_as_word_is_input_format_error() {
    let err = infer(&model(), &json!({"Engines": "two"}), &InferOptions::default()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid input format: could not convert string to float: 'two'"
    );
}

#[test]
fn numeric_column_with_string_is_prediction_error() {
    let err = infer(&model(), &json!({"Month": "August"}), &InferOptions::default()).unwrap_err();
    match err {
        InferError::Prediction(PredictionError::InvalidDtype(columns)) => {
            assert_eq!(columns, vec![("Month".to_string(), "object")]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn derived_features_feed_the_model() {
    // Helicopter "No" overrides the record's IsHelicopter = 1
    let record = json!({
        "Helicopter": "No",
        "IsHelicopter": 1,
        "precip": 0.5,
        "Altitude": 5000,
    });
    let options = InferOptions {
        derive_features: true,
    };
    let prediction = infer(&model(), &record, &options).unwrap();
    let frame = &prediction.frame;

    assert_eq!(frame.get("IsHelicopter").map(ToString::to_string).as_deref(), Some("0.0"));
    assert_eq!(frame.get("Precip_Helicopter").map(ToString::to_string).as_deref(), Some("0.0"));
    assert_eq!(frame.get("Precip_Altitude").map(ToString::to_string).as_deref(), Some("2500.0"));
}
