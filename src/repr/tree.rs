//! Structure-of-Arrays decision tree.

use ndarray::ArrayView1;

use super::categories::{categories_to_bitset, float_to_category, is_valid_category, CategoriesStorage};
use super::NodeId;

/// Type of split in a decision tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum SplitType {
    /// Go left if value < threshold.
    #[default]
    Numeric = 0,
    /// Go right if value is in the node's category set.
    Categorical = 1,
}

/// Structural problems found by [`Tree::validate`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeValidationError {
    #[error("tree has no nodes")]
    EmptyTree,
    #[error("node {node} has {side} child {child} but the tree has {n_nodes} nodes")]
    ChildOutOfBounds {
        node: NodeId,
        side: &'static str,
        child: NodeId,
        n_nodes: usize,
    },
    #[error("node {node} is reachable through more than one path")]
    DuplicateVisit { node: NodeId },
}

/// Immutable tree with one array per node attribute.
///
/// Child indices are local to the tree; node 0 is the root.
#[derive(Debug, Clone)]
pub struct Tree {
    split_indices: Box<[u32]>,
    split_thresholds: Box<[f32]>,
    left_children: Box<[NodeId]>,
    right_children: Box<[NodeId]>,
    default_left: Box<[bool]>,
    is_leaf: Box<[bool]>,
    leaf_values: Box<[f32]>,
    split_types: Box<[SplitType]>,
    categories: CategoriesStorage,
}

impl Tree {
    #[inline]
    pub fn n_nodes(&self) -> usize {
        self.is_leaf.len()
    }

    #[inline]
    pub fn is_leaf(&self, node: NodeId) -> bool {
        self.is_leaf[node as usize]
    }

    #[inline]
    pub fn split_index(&self, node: NodeId) -> u32 {
        self.split_indices[node as usize]
    }

    #[inline]
    pub fn split_threshold(&self, node: NodeId) -> f32 {
        self.split_thresholds[node as usize]
    }

    #[inline]
    pub fn split_type(&self, node: NodeId) -> SplitType {
        self.split_types[node as usize]
    }

    #[inline]
    pub fn left_child(&self, node: NodeId) -> NodeId {
        self.left_children[node as usize]
    }

    #[inline]
    pub fn right_child(&self, node: NodeId) -> NodeId {
        self.right_children[node as usize]
    }

    #[inline]
    pub fn default_left(&self, node: NodeId) -> bool {
        self.default_left[node as usize]
    }

    #[inline]
    pub fn leaf_value(&self, node: NodeId) -> f32 {
        self.leaf_values[node as usize]
    }

    pub fn categories(&self) -> &CategoriesStorage {
        &self.categories
    }

    pub fn has_categorical(&self) -> bool {
        !self.categories.is_empty()
    }

    /// Walk from the root to a leaf and return the leaf node.
    ///
    /// NaN (and features past the end of the sample) take the node's default
    /// direction.
    pub fn traverse_to_leaf(&self, sample: ArrayView1<'_, f32>) -> NodeId {
        let mut node = 0;
        while !self.is_leaf(node) {
            let fvalue = sample
                .get(self.split_index(node) as usize)
                .copied()
                .unwrap_or(f32::NAN);

            let go_left = if fvalue.is_nan() {
                self.default_left(node)
            } else {
                match self.split_type(node) {
                    SplitType::Numeric => fvalue < self.split_threshold(node),
                    // values that are not category codes never match the set
                    SplitType::Categorical => !(is_valid_category(f64::from(fvalue))
                        && self
                            .categories
                            .category_goes_right(node, float_to_category(fvalue))),
                }
            };

            node = if go_left {
                self.left_child(node)
            } else {
                self.right_child(node)
            };
        }
        node
    }

    /// Leaf value reached by `sample`.
    #[inline]
    pub fn predict_row(&self, sample: ArrayView1<'_, f32>) -> f32 {
        self.leaf_value(self.traverse_to_leaf(sample))
    }

    /// Check that every split points inside the tree and that no node is
    /// reachable twice, so traversal always terminates.
    pub fn validate(&self) -> Result<(), TreeValidationError> {
        let n_nodes = self.n_nodes();
        if n_nodes == 0 {
            return Err(TreeValidationError::EmptyTree);
        }

        let mut visited = vec![false; n_nodes];
        let mut stack: Vec<NodeId> = vec![0];
        while let Some(node) = stack.pop() {
            if std::mem::replace(&mut visited[node as usize], true) {
                return Err(TreeValidationError::DuplicateVisit { node });
            }
            if self.is_leaf(node) {
                continue;
            }
            for (side, child) in [("left", self.left_child(node)), ("right", self.right_child(node))] {
                if child as usize >= n_nodes {
                    return Err(TreeValidationError::ChildOutOfBounds {
                        node,
                        side,
                        child,
                        n_nodes,
                    });
                }
                stack.push(child);
            }
        }
        Ok(())
    }
}

/// Builds a [`Tree`] from nodes addressed by index.
///
/// Every node starts as a zero-valued leaf; splits overwrite them in any order.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    split_indices: Vec<u32>,
    split_thresholds: Vec<f32>,
    left_children: Vec<NodeId>,
    right_children: Vec<NodeId>,
    default_left: Vec<bool>,
    is_leaf: Vec<bool>,
    leaf_values: Vec<f32>,
    split_types: Vec<SplitType>,
    category_sets: Vec<Vec<u32>>,
}

impl TreeBuilder {
    pub fn with_nodes(n_nodes: usize) -> Self {
        Self {
            split_indices: vec![0; n_nodes],
            split_thresholds: vec![0.0; n_nodes],
            left_children: vec![0; n_nodes],
            right_children: vec![0; n_nodes],
            default_left: vec![false; n_nodes],
            is_leaf: vec![true; n_nodes],
            leaf_values: vec![0.0; n_nodes],
            split_types: vec![SplitType::Numeric; n_nodes],
            category_sets: vec![Vec::new(); n_nodes],
        }
    }

    pub fn make_leaf(&mut self, node: NodeId, value: f32) -> &mut Self {
        let i = node as usize;
        self.is_leaf[i] = true;
        self.leaf_values[i] = value;
        self.split_types[i] = SplitType::Numeric;
        self.category_sets[i].clear();
        self
    }

    pub fn set_numeric_split(
        &mut self,
        node: NodeId,
        feature: u32,
        threshold: f32,
        default_left: bool,
        left: NodeId,
        right: NodeId,
    ) -> &mut Self {
        self.set_split(node, feature, default_left, left, right);
        let i = node as usize;
        self.split_thresholds[i] = threshold;
        self.split_types[i] = SplitType::Numeric;
        self
    }

    /// `categories` are the category codes that go right.
    pub fn set_categorical_split(
        &mut self,
        node: NodeId,
        feature: u32,
        categories: &[u32],
        default_left: bool,
        left: NodeId,
        right: NodeId,
    ) -> &mut Self {
        self.set_split(node, feature, default_left, left, right);
        let i = node as usize;
        self.split_types[i] = SplitType::Categorical;
        self.category_sets[i] = categories_to_bitset(categories);
        self
    }

    fn set_split(&mut self, node: NodeId, feature: u32, default_left: bool, left: NodeId, right: NodeId) {
        let i = node as usize;
        self.is_leaf[i] = false;
        self.split_indices[i] = feature;
        self.default_left[i] = default_left;
        self.left_children[i] = left;
        self.right_children[i] = right;
    }

    pub fn build(self) -> Tree {
        let categories = if self.category_sets.iter().all(Vec::is_empty) {
            CategoriesStorage::default()
        } else {
            let mut bitsets = Vec::new();
            let segments = self
                .category_sets
                .into_iter()
                .map(|set| {
                    let start = bitsets.len() as u32;
                    let n_words = set.len() as u32;
                    bitsets.extend(set);
                    (start, n_words)
                })
                .collect();
            CategoriesStorage::new(bitsets, segments)
        };

        Tree {
            split_indices: self.split_indices.into_boxed_slice(),
            split_thresholds: self.split_thresholds.into_boxed_slice(),
            left_children: self.left_children.into_boxed_slice(),
            right_children: self.right_children.into_boxed_slice(),
            default_left: self.default_left.into_boxed_slice(),
            is_leaf: self.is_leaf.into_boxed_slice(),
            leaf_values: self.leaf_values.into_boxed_slice(),
            split_types: self.split_types.into_boxed_slice(),
            categories,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    /// ```text
    ///        [0] feat0 < 0.5
    ///        /          \
    ///    [1] 1.0     [2] feat1 in {1, 3}
    ///                 /          \
    ///             [3] 2.0      [4] 3.0
    /// ```
    fn mixed_tree() -> Tree {
        let mut builder = TreeBuilder::with_nodes(5);
        builder
            .set_numeric_split(0, 0, 0.5, true, 1, 2)
            .make_leaf(1, 1.0)
            .set_categorical_split(2, 1, &[1, 3], false, 3, 4)
            .make_leaf(3, 2.0)
            .make_leaf(4, 3.0);
        builder.build()
    }

    #[test]
    fn numeric_split_goes_left_below_threshold() {
        let tree = mixed_tree();
        assert_eq!(tree.predict_row(array![0.3, 1.0].view()), 1.0);
        // equal to threshold goes right
        assert_eq!(tree.predict_row(array![0.5, 0.0].view()), 2.0);
    }

    #[test]
    fn categorical_split_sends_chosen_categories_right() {
        let tree = mixed_tree();
        assert!(tree.has_categorical());
        assert_eq!(tree.predict_row(array![0.7, 1.0].view()), 3.0);
        assert_eq!(tree.predict_row(array![0.7, 3.0].view()), 3.0);
        assert_eq!(tree.predict_row(array![0.7, 2.0].view()), 2.0);
        assert_eq!(tree.predict_row(array![0.7, 99.0].view()), 2.0);
        assert_eq!(tree.predict_row(array![0.7, -1.0].view()), 2.0);
        assert_eq!(tree.predict_row(array![0.7, 1.5].view()), 2.0);
    }

    #[test]
    fn missing_values_follow_default_direction() {
        let tree = mixed_tree();
        assert_eq!(tree.predict_row(array![f32::NAN, 1.0].view()), 1.0);
        assert_eq!(tree.predict_row(array![0.7, f32::NAN].view()), 3.0);
        // feature 1 past the end of the sample counts as missing
        assert_eq!(tree.predict_row(array![0.7].view()), 3.0);
    }

    #[test]
    fn validate_accepts_well_formed_tree() {
        assert_eq!(mixed_tree().validate(), Ok(()));
    }

    #[test]
    fn validate_rejects_out_of_bounds_child() {
        let mut builder = TreeBuilder::with_nodes(2);
        builder.set_numeric_split(0, 0, 0.5, true, 1, 7);
        assert_eq!(
            builder.build().validate(),
            Err(TreeValidationError::ChildOutOfBounds {
                node: 0,
                side: "right",
                child: 7,
                n_nodes: 2
            })
        );
    }

    #[test]
    fn validate_rejects_cycles() {
        let mut builder = TreeBuilder::with_nodes(3);
        builder
            .set_numeric_split(0, 0, 0.5, true, 1, 2)
            .set_numeric_split(1, 0, 0.2, true, 0, 2);
        assert!(matches!(
            builder.build().validate(),
            Err(TreeValidationError::DuplicateVisit { .. })
        ));
    }
}
