//! Tree ensemble with per-group outputs.

use ndarray::ArrayView1;

use super::tree::Tree;

/// A forest of trees, each contributing to one output group.
///
/// Binary classification uses a single group holding the log-odds margin;
/// K-class classification uses K groups.
#[derive(Debug, Clone)]
pub struct Forest {
    trees: Vec<Tree>,
    tree_groups: Vec<u32>,
    n_groups: u32,
    base_score: Vec<f32>,
    /// DART per-tree output scaling.
    tree_weights: Option<Box<[f32]>>,
}

impl Forest {
    pub fn new(n_groups: u32) -> Self {
        Self {
            trees: Vec::new(),
            tree_groups: Vec::new(),
            n_groups,
            base_score: vec![0.0; n_groups as usize],
            tree_weights: None,
        }
    }

    /// Set the margin-space base score of every group.
    pub fn with_base_score(mut self, base_score: Vec<f32>) -> Self {
        debug_assert_eq!(base_score.len(), self.n_groups as usize);
        self.base_score = base_score;
        self
    }

    /// Scale each tree's output by a weight (DART).
    pub fn with_tree_weights(mut self, weights: Vec<f32>) -> Self {
        debug_assert_eq!(weights.len(), self.trees.len());
        self.tree_weights = Some(weights.into_boxed_slice());
        self
    }

    pub fn push_tree(&mut self, tree: Tree, group: u32) {
        debug_assert!(group < self.n_groups, "group out of range");
        self.trees.push(tree);
        self.tree_groups.push(group);
    }

    #[inline]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    #[inline]
    pub fn n_groups(&self) -> u32 {
        self.n_groups
    }

    pub fn base_score(&self) -> &[f32] {
        &self.base_score
    }

    pub fn tree_weights(&self) -> Option<&[f32]> {
        self.tree_weights.as_deref()
    }

    pub fn trees(&self) -> impl Iterator<Item = &Tree> {
        self.trees.iter()
    }

    /// Sum tree outputs for one sample, one margin per group.
    pub fn predict_row(&self, sample: ArrayView1<'_, f32>) -> Vec<f32> {
        let mut output = self.base_score.clone();
        for (idx, (tree, &group)) in self.trees.iter().zip(&self.tree_groups).enumerate() {
            let weight = self.tree_weights.as_ref().map_or(1.0, |w| w[idx]);
            output[group as usize] += weight * tree.predict_row(sample);
        }
        output
    }
}
