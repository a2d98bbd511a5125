//! Conversion from XGBoost JSON types to native types.

use std::collections::HashMap;

use ndarray::Array2;

use crate::repr::{Booster, Forest, LinearModel, NodeId, Tree, TreeBuilder, TreeValidationError};

use super::json::{GradientBooster, Tree as XgbTree, XgbModel};

/// Error type for XGBoost model conversion.
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("tree {0} has no nodes")]
    EmptyTree(usize),
    #[error("tree {tree} declares {declared} nodes but its `{field}` array has {actual} entries")]
    TruncatedArray {
        tree: usize,
        field: &'static str,
        declared: usize,
        actual: usize,
    },
    #[error(
        "invalid node index in tree {tree}: node {node} references child {child} but tree has {n_nodes} nodes"
    )]
    InvalidNodeIndex {
        tree: usize,
        node: usize,
        child: i32,
        n_nodes: usize,
    },
    #[error("tree {tree} has malformed categorical segments")]
    InvalidCategories { tree: usize },
    #[error("tree {tree} is malformed: {source}")]
    InvalidTree {
        tree: usize,
        #[source]
        source: TreeValidationError,
    },
    #[error("tree {tree} belongs to group {group} but the model has {n_groups} groups")]
    InvalidTreeGroup { tree: usize, group: i32, n_groups: u32 },
    #[error("dart model has {weights} weights for {trees} trees")]
    DartWeightsMismatch { weights: usize, trees: usize },
    #[error(
        "gblinear weights length {actual} doesn't match (num_features + 1) * num_groups = {expected}"
    )]
    InvalidLinearWeights { actual: usize, expected: usize },
}

/// Convert `base_score` from probability space to margin space.
///
/// XGBoost stores `base_score` in the output space of the objective; the
/// forest adds it to raw margins, so logistic objectives need the logit.
pub(crate) fn prob_to_margin(base_score: f32, objective: &str) -> f32 {
    match objective {
        "binary:logistic" | "reg:logistic" => {
            let p = base_score.clamp(1e-7, 1.0 - 1e-7);
            (p / (1.0 - p)).ln()
        }
        "reg:gamma" | "reg:tweedie" | "count:poisson" => base_score.max(1e-7).ln(),
        _ => base_score,
    }
}

impl XgbModel {
    /// Number of output groups: 1 for binary/regression, `num_class` otherwise.
    pub fn n_groups(&self) -> u32 {
        let n_class = self.learner.learner_model_param.n_class;
        if n_class <= 1 {
            1
        } else {
            n_class as u32
        }
    }

    fn margin_base_score(&self) -> f32 {
        prob_to_margin(
            self.learner.learner_model_param.base_score,
            self.objective_name(),
        )
    }

    /// Convert to a native [`Booster`].
    pub fn to_booster(&self) -> Result<Booster, ConversionError> {
        match &self.learner.gradient_booster {
            GradientBooster::Gbtree { model } => {
                Ok(Booster::Tree(self.convert_forest(&model.trees, &model.tree_info)?))
            }
            GradientBooster::Dart {
                gbtree,
                weight_drop,
            } => {
                let trees = &gbtree.model.trees;
                if weight_drop.len() != trees.len() {
                    return Err(ConversionError::DartWeightsMismatch {
                        weights: weight_drop.len(),
                        trees: trees.len(),
                    });
                }
                let forest = self
                    .convert_forest(trees, &gbtree.model.tree_info)?
                    .with_tree_weights(weight_drop.clone());
                Ok(Booster::Tree(forest))
            }
            GradientBooster::Gblinear { model } => {
                Ok(Booster::Linear(self.convert_linear(&model.weights)?))
            }
        }
    }

    fn convert_forest(&self, trees: &[XgbTree], tree_info: &[i32]) -> Result<Forest, ConversionError> {
        let n_groups = self.n_groups();
        let mut forest =
            Forest::new(n_groups).with_base_score(vec![self.margin_base_score(); n_groups as usize]);

        for (tree_idx, xgb_tree) in trees.iter().enumerate() {
            let group = tree_info.get(tree_idx).copied().unwrap_or(0);
            if group < 0 || group as u32 >= n_groups {
                return Err(ConversionError::InvalidTreeGroup {
                    tree: tree_idx,
                    group,
                    n_groups,
                });
            }
            forest.push_tree(convert_tree(xgb_tree, tree_idx)?, group as u32);
        }
        Ok(forest)
    }

    /// XGBoost stores gblinear weights row-major as `[n_features + 1, n_groups]`
    /// with the bias in the last row. The base score is folded into the bias.
    fn convert_linear(&self, weights: &[f32]) -> Result<LinearModel, ConversionError> {
        let n_features = self.learner.learner_model_param.n_features.max(0) as usize;
        let n_groups = self.n_groups() as usize;

        let expected = (n_features + 1) * n_groups;
        let mut arr = Array2::from_shape_vec((n_features + 1, n_groups), weights.to_vec()).map_err(
            |_| ConversionError::InvalidLinearWeights {
                actual: weights.len(),
                expected,
            },
        )?;

        let base = self.margin_base_score();
        arr.row_mut(n_features).mapv_inplace(|b| b + base);
        Ok(LinearModel::new(arr))
    }
}

fn convert_tree(xgb_tree: &XgbTree, tree_idx: usize) -> Result<Tree, ConversionError> {
    let n_nodes = xgb_tree.tree_param.num_nodes.max(0) as usize;
    if n_nodes == 0 {
        return Err(ConversionError::EmptyTree(tree_idx));
    }

    let check_len = |field: &'static str, actual: usize| {
        if actual < n_nodes {
            Err(ConversionError::TruncatedArray {
                tree: tree_idx,
                field,
                declared: n_nodes,
                actual,
            })
        } else {
            Ok(())
        }
    };
    check_len("left_children", xgb_tree.left_children.len())?;
    check_len("right_children", xgb_tree.right_children.len())?;
    check_len("split_indices", xgb_tree.split_indices.len())?;
    check_len("split_conditions", xgb_tree.split_conditions.len())?;
    check_len("default_left", xgb_tree.default_left.len())?;

    let categorical = categorical_sets(xgb_tree, tree_idx)?;
    let mut builder = TreeBuilder::with_nodes(n_nodes);

    for node_idx in 0..n_nodes {
        let node = node_idx as NodeId;
        let left = xgb_tree.left_children[node_idx];
        let right = xgb_tree.right_children[node_idx];

        // XGBoost marks leaves with left child -1 and stores the
        // eta-scaled leaf value in the split condition slot
        if left == -1 {
            builder.make_leaf(node, xgb_tree.split_conditions[node_idx]);
            continue;
        }

        for child in [left, right] {
            if child < 0 || child as usize >= n_nodes {
                return Err(ConversionError::InvalidNodeIndex {
                    tree: tree_idx,
                    node: node_idx,
                    child,
                    n_nodes,
                });
            }
        }

        let feature = xgb_tree.split_indices[node_idx].max(0) as u32;
        let default_left = xgb_tree.default_left[node_idx] != 0;
        let is_categorical = xgb_tree.split_type.get(node_idx).copied().unwrap_or(0) == 1;

        if is_categorical {
            let set = categorical.get(&node_idx).map(Vec::as_slice).unwrap_or(&[]);
            builder.set_categorical_split(node, feature, set, default_left, left as NodeId, right as NodeId);
        } else {
            let threshold = xgb_tree.split_conditions[node_idx];
            builder.set_numeric_split(node, feature, threshold, default_left, left as NodeId, right as NodeId);
        }
    }

    let tree = builder.build();
    tree.validate()
        .map_err(|source| ConversionError::InvalidTree { tree: tree_idx, source })?;
    Ok(tree)
}

/// Map node index to the category values that go right.
///
/// XGBoost keeps them in parallel arrays: `categories_nodes[i]` owns
/// `categories[categories_segments[i]..][..categories_sizes[i]]`.
fn categorical_sets(xgb_tree: &XgbTree, tree_idx: usize) -> Result<HashMap<usize, Vec<u32>>, ConversionError> {
    let invalid = || ConversionError::InvalidCategories { tree: tree_idx };
    let n = xgb_tree.categories_nodes.len();
    if xgb_tree.categories_segments.len() != n || xgb_tree.categories_sizes.len() != n {
        return Err(invalid());
    }

    let mut sets = HashMap::with_capacity(n);
    for i in 0..n {
        let node = usize::try_from(xgb_tree.categories_nodes[i]).map_err(|_| invalid())?;
        let start = usize::try_from(xgb_tree.categories_segments[i]).map_err(|_| invalid())?;
        let size = usize::try_from(xgb_tree.categories_sizes[i]).map_err(|_| invalid())?;
        let values = xgb_tree
            .categories
            .get(start..start + size)
            .ok_or_else(invalid)?
            .iter()
            .map(|&c| u32::try_from(c).map_err(|_| invalid()))
            .collect::<Result<Vec<_>, _>>()?;
        sets.insert(node, values);
    }
    Ok(sets)
}
