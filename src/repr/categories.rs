//! Categorical split storage.
//!
//! XGBoost partitions a categorical split by a set of "chosen" categories:
//! categories in the set go RIGHT, everything else goes LEFT. Sets are kept
//! as packed `u32` bitsets, 32 categories per word, bit `c % 32` of word
//! `c / 32` standing for category `c`.

/// Per-tree storage for categorical split bitsets.
#[derive(Debug, Clone, Default)]
pub struct CategoriesStorage {
    /// Flat bitset words for every categorical node of the tree.
    bitsets: Box<[u32]>,
    /// Per-node `(start, n_words)` into `bitsets`, indexed by node.
    /// Nodes without a categorical split hold `(0, 0)`.
    segments: Box<[(u32, u32)]>,
}

impl CategoriesStorage {
    pub fn new(bitsets: Vec<u32>, segments: Vec<(u32, u32)>) -> Self {
        Self {
            bitsets: bitsets.into_boxed_slice(),
            segments: segments.into_boxed_slice(),
        }
    }

    /// Whether `category` is in the right-going set of `node`.
    ///
    /// Categories past the end of the stored bitset are not in the set.
    #[inline]
    pub fn category_goes_right(&self, node: u32, category: u32) -> bool {
        let Some(&(start, n_words)) = self.segments.get(node as usize) else {
            return false;
        };
        let word_idx = category >> 5;
        if word_idx >= n_words {
            return false;
        }
        let word = self.bitsets[(start + word_idx) as usize];
        (word >> (category & 31)) & 1 != 0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bitsets.is_empty()
    }

    /// Bitset words of a single node.
    pub fn bitset_for_node(&self, node: u32) -> &[u32] {
        let (start, n_words) = self.segments[node as usize];
        &self.bitsets[start as usize..(start + n_words) as usize]
    }
}

/// Pack category values into a bitset with bit `c` set for each `c`.
pub fn categories_to_bitset(categories: &[u32]) -> Vec<u32> {
    let Some(&max_cat) = categories.iter().max() else {
        return Vec::new();
    };
    let mut bitset = vec![0u32; (max_cat >> 5) as usize + 1];
    for &cat in categories {
        bitset[(cat >> 5) as usize] |= 1 << (cat & 31);
    }
    bitset
}

/// Interpret a feature value as a category code.
///
/// Callers must have rejected NaN, negative and fractional values already.
#[inline]
pub fn float_to_category(value: f32) -> u32 {
    debug_assert!(
        value >= 0.0 && value == value.trunc(),
        "category must be a non-negative integer, got {value}"
    );
    value as u32
}

/// Whether a value can be used as a category code.
#[inline]
pub fn is_valid_category(value: f64) -> bool {
    value >= 0.0 && value.fract() == 0.0 && value <= u32::MAX as f64
}
