//! Rooted trees with branch lengths.
//!
//! Nodes are kept in one `Vec` and addressed by [`NodeId`]. Editing
//! operations elsewhere in this crate (relabeling, midpoint rooting) return
//! a fresh tree rather than touching one a caller may still hold.

use std::path::Path;

use phylopotts_core::{PottsError, Result, Summarizable};

/// Position of a node in [`PhyloTree::nodes`].
pub type NodeId = usize;

/// One vertex of a [`PhyloTree`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Node {
    pub id: NodeId,
    /// `None` only at the root.
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Length of the edge above this node.
    pub branch_length: Option<f64>,
    pub name: Option<String>,
}

impl Node {
    /// A detached node with no label, length or children.
    pub fn bare(id: NodeId, parent: Option<NodeId>) -> Self {
        Node {
            id,
            parent,
            children: vec![],
            branch_length: None,
            name: None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Rooted tree stored as a node arena.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PhyloTree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl PhyloTree {
    /// A tree holding only an unlabelled root.
    pub fn new() -> Self {
        PhyloTree {
            nodes: vec![Node::bare(0, None)],
            root: 0,
        }
    }

    /// Wrap an arena built elsewhere (Newick parser, rerooting).
    ///
    /// Each node's `id` must equal its position, and `root` must have no
    /// parent.
    pub fn from_nodes(nodes: Vec<Node>, root: NodeId) -> Result<Self> {
        let Some(root_node) = nodes.get(root) else {
            return Err(PottsError::InvalidInput(format!(
                "cannot root a tree of {} nodes at node {root}",
                nodes.len()
            )));
        };
        if root_node.parent.is_some() {
            return Err(PottsError::InvalidInput(format!(
                "root node {root} has a parent"
            )));
        }
        if let Some((pos, node)) = nodes.iter().enumerate().find(|(pos, n)| n.id != *pos) {
            return Err(PottsError::InvalidInput(format!(
                "node at position {pos} carries id {}",
                node.id
            )));
        }
        Ok(PhyloTree { nodes, root })
    }

    fn check_id(&self, id: NodeId) -> Result<()> {
        if id < self.nodes.len() {
            Ok(())
        } else {
            Err(PottsError::InvalidInput(format!(
                "no node {id} in a tree of {} nodes",
                self.nodes.len()
            )))
        }
    }

    /// Attach a new node under `parent`.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        name: Option<String>,
        branch_length: Option<f64>,
    ) -> Result<NodeId> {
        self.check_id(parent)?;
        let id = self.nodes.len();
        self.nodes.push(Node {
            name,
            branch_length,
            ..Node::bare(id, Some(parent))
        });
        self.nodes[parent].children.push(id);
        Ok(id)
    }

    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn get_node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves().len()
    }

    /// Ids of childless nodes, ascending.
    pub fn leaves(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        for node in &self.nodes {
            if node.is_leaf() {
                out.push(node.id);
            }
        }
        out
    }

    /// Depth-first walk from the root, each node before its subtree and
    /// siblings left to right.
    pub fn iter_preorder(&self) -> PreorderIter<'_> {
        PreorderIter {
            nodes: &self.nodes,
            pending: vec![self.root],
        }
    }

    /// Labels of named leaves in lexical order.
    pub fn leaf_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(self.nodes.len());
        for id in self.leaves() {
            if let Some(name) = &self.nodes[id].name {
                names.push(name.clone());
            }
        }
        names.sort_unstable();
        names
    }

    /// Sum over every edge; unset lengths add nothing.
    pub fn total_length(&self) -> f64 {
        let mut total = 0.0;
        for node in &self.nodes {
            total += node.branch_length.unwrap_or_default();
        }
        total
    }

    /// Summed edge lengths on the path from the root to `id`. The root's own
    /// length, if any, is not part of the path.
    pub fn distance_from_root(&self, id: NodeId) -> Result<f64> {
        self.check_id(id)?;
        let mut node = &self.nodes[id];
        let mut depth = 0.0;
        while let Some(up) = node.parent {
            depth += node.branch_length.unwrap_or_default();
            node = &self.nodes[up];
        }
        Ok(depth)
    }

    /// Depth of the deepest leaf.
    pub fn max_root_to_tip(&self) -> f64 {
        let mut depths = vec![0.0; self.nodes.len()];
        let mut deepest: f64 = 0.0;
        for id in self.iter_preorder() {
            let node = &self.nodes[id];
            if let Some(up) = node.parent {
                depths[id] = depths[up] + node.branch_length.unwrap_or_default();
            }
            if node.is_leaf() {
                deepest = deepest.max(depths[id]);
            }
        }
        deepest
    }

    pub fn from_newick(input: &str) -> Result<Self> {
        crate::newick::parse(input)
    }

    pub fn to_newick(&self) -> String {
        crate::newick::write(self)
    }

    /// Load the first tree in a Newick file.
    pub fn read_newick(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| PottsError::file(path, e))?;
        Self::from_newick(&text).map_err(|e| match e {
            PottsError::Parse(msg) => PottsError::Parse(format!("{}: {msg}", path.display())),
            other => other,
        })
    }

    /// Save as one newline-terminated Newick line.
    pub fn write_newick(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, format!("{}\n", self.to_newick()))
            .map_err(|e| PottsError::file(path, e))
    }
}

impl Default for PhyloTree {
    fn default() -> Self {
        PhyloTree::new()
    }
}

impl Summarizable for PhyloTree {
    fn summary(&self) -> String {
        let tips = self.leaf_count();
        format!(
            "tree with {tips} tips, {} internal nodes, total length {:.4}",
            self.node_count() - tips,
            self.total_length()
        )
    }
}

/// Iterator returned by [`PhyloTree::iter_preorder`].
pub struct PreorderIter<'a> {
    nodes: &'a [Node],
    pending: Vec<NodeId>,
}

impl Iterator for PreorderIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.pending.pop()?;
        self.pending.extend(self.nodes[id].children.iter().rev());
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // (x:1,(z:0.5,y:2)yz:1.5)top;
    fn three_taxa() -> PhyloTree {
        let mut tree = PhyloTree::new();
        tree.get_node_mut(0).unwrap().name = Some("top".to_string());
        tree.add_child(0, Some("x".to_string()), Some(1.0)).unwrap();
        let yz = tree.add_child(0, Some("yz".to_string()), Some(1.5)).unwrap();
        tree.add_child(yz, Some("z".to_string()), Some(0.5)).unwrap();
        tree.add_child(yz, Some("y".to_string()), Some(2.0)).unwrap();
        tree
    }

    #[test]
    fn fresh_tree_is_a_lone_root() {
        let tree = PhyloTree::default();
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.leaves(), vec![0]);
        assert!(tree.get_node(tree.root()).unwrap().is_root());
    }

    #[test]
    fn add_child_checks_parent() {
        let mut tree = PhyloTree::new();
        let err = tree.add_child(3, None, None).unwrap_err();
        assert!(matches!(err, PottsError::InvalidInput(_)));
    }

    #[test]
    fn from_nodes_checks_ids_and_root() {
        let nodes = vec![Node::bare(0, None), Node::bare(5, Some(0))];
        assert!(PhyloTree::from_nodes(nodes, 0).is_err());
        assert!(PhyloTree::from_nodes(vec![Node::bare(0, None)], 1).is_err());
        let nodes = vec![Node::bare(0, Some(1)), Node::bare(1, None)];
        assert!(PhyloTree::from_nodes(nodes, 0).is_err());
    }

    #[test]
    fn counts_and_leaves() {
        let tree = three_taxa();
        assert_eq!(tree.node_count(), 5);
        assert_eq!(tree.leaf_count(), 3);
        assert_eq!(tree.leaves(), vec![1, 3, 4]);
        assert_eq!(tree.leaf_names(), vec!["x", "y", "z"]);
    }

    #[test]
    fn preorder_visits_left_subtree_first() {
        let order: Vec<NodeId> = three_taxa().iter_preorder().collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn path_lengths() {
        let tree = three_taxa();
        assert_eq!(tree.distance_from_root(4).unwrap(), 3.5);
        assert_eq!(tree.distance_from_root(0).unwrap(), 0.0);
        assert_eq!(tree.max_root_to_tip(), 3.5);
        assert_eq!(tree.total_length(), 5.0);
        assert!(tree.distance_from_root(9).is_err());
    }

    #[test]
    fn newick_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("three.nwk");
        let tree = three_taxa();
        tree.write_newick(&path).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().ends_with(";\n"));
        assert_eq!(PhyloTree::read_newick(&path).unwrap(), tree);
    }

    #[test]
    fn missing_file_is_a_file_error() {
        let err = PhyloTree::read_newick("/no/such/dir/t.nwk").unwrap_err();
        assert!(matches!(err, PottsError::File { .. }));
    }

    #[test]
    fn parse_errors_name_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.nwk");
        std::fs::write(&path, "(a,b").unwrap();
        let err = PhyloTree::read_newick(&path).unwrap_err();
        assert!(err.to_string().contains("broken.nwk"));
    }

    #[test]
    fn summary_line() {
        assert_eq!(
            three_taxa().summary(),
            "tree with 3 tips, 2 internal nodes, total length 5.0000"
        );
    }
}
