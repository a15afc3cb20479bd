/// Tree arena, counting/visibility passes and traversal
pub mod tree;
/// Node entity and node kinds
pub mod node;
/// NHX tag dictionary and string helpers
pub mod meta;
/// Name-to-residue-sequence side table
pub mod sequences;

pub use node::{NodeId, NodeKind, TreeNode};
pub use sequences::SequenceStore;
pub use tree::Tree;

/// Rounds a float to the given number of decimal places.
/// NaN collapses to 0.
pub(crate) fn round_float(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    let rounded = (value * factor).round() / factor;
    if rounded.is_nan() { 0.0 } else { rounded }
}
