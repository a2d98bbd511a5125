//! XGBoost JSON model format.
//!
//! Foreign types for the subset of XGBoost >= 2.0 JSON needed for inference.
//! Fields the predictor never reads are left out and ignored by serde.
//! XGBoost writes most scalar parameters as strings, hence `DisplayFromStr`.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use serde_with::{serde_as, DisplayFromStr, PickFirst};

use crate::error::ModelError;

/// Deserialize `base_score`, which XGBoost writes as a number, a stringified
/// number (`"0.5"`), an array (`[0.5]`) or a bracketed string (`"[5E-1]"`).
fn deserialize_base_score<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as SerdeError;

    let mut cur = Value::deserialize(deserializer)?;
    loop {
        match cur {
            Value::Number(n) => {
                return n
                    .as_f64()
                    .map(|f| f as f32)
                    .ok_or_else(|| SerdeError::custom("invalid number"));
            }
            Value::String(s) => {
                let t = s.trim();
                if let Ok(f) = t.parse::<f32>() {
                    return Ok(f);
                }
                if let Some(inner) = t.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
                    if let Ok(f) = inner.trim().parse::<f32>() {
                        return Ok(f);
                    }
                }
                match serde_json::from_str::<Vec<Value>>(t) {
                    Ok(arr) => {
                        cur = arr
                            .into_iter()
                            .next()
                            .ok_or_else(|| SerdeError::custom("empty base_score array"))?;
                    }
                    Err(_) => {
                        return Err(SerdeError::custom(format!(
                            "cannot parse base_score from string: {s}"
                        )))
                    }
                }
            }
            Value::Array(arr) => {
                cur = arr
                    .into_iter()
                    .next()
                    .ok_or_else(|| SerdeError::custom("empty base_score array"))?;
            }
            _ => {
                return Err(SerdeError::custom(
                    "base_score must be number, string, or array",
                ))
            }
        }
    }
}

fn default_base_score() -> f32 {
    0.5
}

// =============================================================================
// Trees
// =============================================================================

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeParam {
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    pub num_nodes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree {
    pub tree_param: TreeParam,
    #[serde(default)]
    pub id: i32,
    pub left_children: Vec<i32>,
    pub right_children: Vec<i32>,
    pub split_indices: Vec<i32>,
    /// Threshold of split nodes, leaf value of leaves.
    pub split_conditions: Vec<f32>,
    /// 0 = numeric, 1 = categorical. Absent in models without categorical splits.
    #[serde(default)]
    pub split_type: Vec<i32>,
    pub default_left: Vec<i32>,
    /// Flat category values of all categorical nodes.
    #[serde(default)]
    pub categories: Vec<i32>,
    #[serde(default)]
    pub categories_nodes: Vec<i32>,
    #[serde(default)]
    pub categories_segments: Vec<i32>,
    #[serde(default)]
    pub categories_sizes: Vec<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelTrees {
    pub trees: Vec<Tree>,
    /// Output group of each tree.
    #[serde(default)]
    pub tree_info: Vec<i32>,
}

// =============================================================================
// Boosters
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GbLinearModel {
    pub weights: Vec<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GBTreeDefinition {
    pub model: ModelTrees,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "lowercase")]
pub enum GradientBooster {
    Gbtree { model: ModelTrees },
    Gblinear { model: GbLinearModel },
    Dart {
        gbtree: GBTreeDefinition,
        weight_drop: Vec<f32>,
    },
}

// =============================================================================
// Learner
// =============================================================================

/// Training objective. Only the name matters for inference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Objective {
    pub name: String,
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnerModelParam {
    #[serde(default = "default_base_score", deserialize_with = "deserialize_base_score")]
    pub base_score: f32,
    #[serde(rename = "num_class", default)]
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    pub n_class: i64,
    #[serde(rename = "num_feature")]
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    pub n_features: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureType {
    #[serde(rename = "float", alias = "float32", alias = "f")]
    Float,
    #[serde(rename = "int", alias = "i")]
    Int,
    #[serde(rename = "indicator")]
    Indicator,
    #[serde(rename = "q", alias = "quantitative")]
    Quantitative,
    #[serde(rename = "c", alias = "categorical")]
    Categorical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Learner {
    #[serde(default)]
    pub feature_names: Vec<String>,
    #[serde(default)]
    pub feature_types: Vec<FeatureType>,
    pub gradient_booster: GradientBooster,
    pub objective: Objective,
    pub learner_model_param: LearnerModelParam,
}

// =============================================================================
// Top-level artifact
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XgbModel {
    pub version: [u32; 3],
    pub learner: Learner,
    /// String levels of categorical features; level `i` is category code `i`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub category_levels: BTreeMap<String, Vec<String>>,
}

impl XgbModel {
    /// Load a model from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }

    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn objective_name(&self) -> &str {
        &self.learner.objective.name
    }
}
