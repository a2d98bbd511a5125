//! Native model representations used for inference.

/// Node identifier: an index into a tree's arrays.
pub type NodeId = u32;

pub mod categories;
pub mod forest;
pub mod linear;
pub mod tree;

pub use categories::{categories_to_bitset, is_valid_category, CategoriesStorage};
pub use forest::Forest;
pub use linear::LinearModel;
pub use tree::{SplitType, Tree, TreeBuilder, TreeValidationError};

use ndarray::ArrayView1;

/// A converted gradient booster.
#[derive(Debug, Clone)]
pub enum Booster {
    /// Tree ensemble (gbtree, or dart with per-tree weights).
    Tree(Forest),
    /// Linear booster.
    Linear(LinearModel),
}

impl Booster {
    pub fn n_groups(&self) -> usize {
        match self {
            Booster::Tree(forest) => forest.n_groups() as usize,
            Booster::Linear(linear) => linear.n_groups(),
        }
    }

    /// Raw margins for one sample, one per output group.
    pub fn predict_margins(&self, sample: ArrayView1<'_, f32>) -> Vec<f32> {
        match self {
            Booster::Tree(forest) => forest.predict_row(sample),
            Booster::Linear(linear) => linear.predict_row(sample),
        }
    }
}
