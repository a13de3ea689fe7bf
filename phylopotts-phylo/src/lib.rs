//! Phylogenetic trees for phylopotts.
//!
//! - **Tree data structure**: arena-backed [`PhyloTree`]
//! - **Newick**: parse and write the standard text format
//! - **Name mapping**: [`NameIndexMap`] relabels leaves to dense indices
//!   matching a reference alignment
//! - **Rooting**: [`midpoint_root`] re-roots at the tree's midpoint

pub mod mapping;
pub mod newick;
pub mod rooting;
pub mod tree;

pub use mapping::NameIndexMap;
pub use rooting::midpoint_root;
pub use tree::{Node, NodeId, PhyloTree};
