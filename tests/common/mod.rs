//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::fs::File;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

/// Base directory for test cases.
pub fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/test-cases")
}

/// Directory for XGBoost test cases.
pub fn xgboost_test_cases_dir() -> PathBuf {
    test_cases_dir().join("xgboost")
}

pub fn risk_model_path() -> PathBuf {
    xgboost_test_cases_dir().join("risk_binary.model.json")
}

/// Load a JSON file and deserialize it.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> T {
    let file =
        File::open(path).unwrap_or_else(|e| panic!("Failed to open {}: {e}", path.display()));
    serde_json::from_reader(file)
        .unwrap_or_else(|e| panic!("Failed to parse {}: {e}", path.display()))
}

/// One scored record with its hand-computed expectation.
#[derive(Debug, Deserialize)]
pub struct RiskCase {
    pub name: String,
    pub record: Value,
    /// Sum of leaf values reached by `record`.
    pub margin: f64,
    pub risk_percentage: f64,
}

pub fn risk_cases() -> Vec<RiskCase> {
    load_json(&xgboost_test_cases_dir().join("risk_binary.cases.json"))
}

pub fn risk_case(name: &str) -> RiskCase {
    risk_cases()
        .into_iter()
        .find(|c| c.name == name)
        .unwrap_or_else(|| panic!("no test case named {name}"))
}

/// Tolerance for risk percentages computed in f32 and compared with f64
/// reference values.
pub const RISK_TOLERANCE: f64 = 1e-3;
