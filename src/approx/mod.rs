//! Function approximators for fitted value iteration

pub mod extra_trees;

pub use extra_trees::{ExtraTrees, ExtraTreesConfig};
