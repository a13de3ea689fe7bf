//! Midpoint rooting.
//!
//! The longest leaf-to-leaf path (the diameter) is found with a double sweep:
//! the farthest leaf `a` from the first leaf, then the farthest leaf `b` from
//! `a`. Ties go to the leaf with the lowest node id. The new root sits at
//! distance `D / 2` from `a` on the `a`–`b` path, which minimizes the largest
//! root-to-tip distance.
//!
//! When the midpoint falls inside an edge, that edge is split by a new
//! unnamed root. When it lands on a node, the node becomes the root. A former
//! root left with a single child is suppressed and its two edges merged.

use phylopotts_core::{PottsError, Result};

use crate::tree::{Node, NodeId, PhyloTree};

/// Undirected neighbour lists: children first (in order), then the parent.
type Adjacency = Vec<Vec<(NodeId, Option<f64>)>>;

enum NewRoot {
    Node(NodeId),
    Edge {
        near: NodeId,
        far: NodeId,
        near_len: f64,
        far_len: f64,
    },
}

/// Return a copy of `tree` re-rooted at its midpoint.
///
/// Missing branch lengths count as zero. Trees with fewer than two leaves or
/// a zero diameter are returned unchanged.
///
/// # Errors
///
/// Returns [`PottsError::InvalidInput`] for negative or non-finite branch
/// lengths.
pub fn midpoint_root(tree: &PhyloTree) -> Result<PhyloTree> {
    for node in tree.nodes() {
        if let Some(len) = node.branch_length {
            if !len.is_finite() || len < 0.0 {
                return Err(PottsError::InvalidInput(format!(
                    "branch length {len} on node {} cannot be used for midpoint rooting",
                    node.id
                )));
            }
        }
    }

    let leaves = tree.leaves();
    if leaves.len() < 2 {
        return Ok(tree.clone());
    }

    let adj = adjacency(tree);
    let (from_first, _) = distances_from(&adj, leaves[0]);
    let a = farthest_leaf(&from_first, &leaves);
    let (dist, toward_a) = distances_from(&adj, a);
    let b = farthest_leaf(&dist, &leaves);
    let diameter = dist[b];
    if diameter <= 0.0 {
        return Ok(tree.clone());
    }
    let half = diameter / 2.0;

    let mut cur = b;
    let new_root = loop {
        let next = toward_a[cur].ok_or_else(|| {
            PottsError::Other(format!("node {cur} is disconnected from leaf {a}"))
        })?;
        if dist[next] == half {
            break NewRoot::Node(next);
        }
        if dist[next] < half {
            break NewRoot::Edge {
                near: next,
                far: cur,
                near_len: half - dist[next],
                far_len: dist[cur] - half,
            };
        }
        cur = next;
    };

    let rooted = rebuild(tree, &adj, new_root)?;
    tracing::debug!(
        diameter,
        max_root_to_tip = rooted.max_root_to_tip(),
        "midpoint rooted tree"
    );
    Ok(rooted)
}

fn adjacency(tree: &PhyloTree) -> Adjacency {
    let nodes = tree.nodes();
    let mut adj: Adjacency = nodes
        .iter()
        .map(|n| {
            n.children
                .iter()
                .map(|&c| (c, nodes[c].branch_length))
                .collect()
        })
        .collect();
    for node in nodes {
        if let Some(p) = node.parent {
            adj[node.id].push((p, node.branch_length));
        }
    }
    adj
}

/// Path lengths from `start` to every node, plus each node's neighbour on
/// the way back to `start`.
fn distances_from(adj: &Adjacency, start: NodeId) -> (Vec<f64>, Vec<Option<NodeId>>) {
    let mut dist = vec![f64::INFINITY; adj.len()];
    let mut prev = vec![None; adj.len()];
    dist[start] = 0.0;
    let mut stack = vec![start];
    while let Some(u) = stack.pop() {
        for &(v, len) in &adj[u] {
            if dist[v].is_infinite() {
                dist[v] = dist[u] + len.unwrap_or(0.0);
                prev[v] = Some(u);
                stack.push(v);
            }
        }
    }
    (dist, prev)
}

fn farthest_leaf(dist: &[f64], leaves: &[NodeId]) -> NodeId {
    let mut best = leaves[0];
    for &leaf in &leaves[1..] {
        if dist[leaf] > dist[best] {
            best = leaf;
        }
    }
    best
}

fn rebuild(tree: &PhyloTree, adj: &Adjacency, new_root: NewRoot) -> Result<PhyloTree> {
    let mut nodes: Vec<Node> = Vec::with_capacity(tree.node_count() + 1);
    let branches: Vec<Branch> = match new_root {
        NewRoot::Node(r) => {
            nodes.push(Node {
                name: tree.nodes()[r].name.clone(),
                ..Node::bare(0, None)
            });
            adj[r]
                .iter()
                .map(|&(nb, len)| Branch { old: nb, from: r, parent: 0, len })
                .collect()
        }
        NewRoot::Edge {
            near,
            far,
            near_len,
            far_len,
        } => {
            nodes.push(Node::bare(0, None));
            vec![
                Branch { old: near, from: far, parent: 0, len: Some(near_len) },
                Branch { old: far, from: near, parent: 0, len: Some(far_len) },
            ]
        }
    };
    attach(tree, adj, branches, &mut nodes);
    PhyloTree::from_nodes(nodes, 0)
}

/// An edge still to be copied: walk from `from` into `old` and hang the
/// copy of `old` under the new node `parent`.
#[derive(Debug, Clone, Copy)]
struct Branch {
    old: NodeId,
    from: NodeId,
    parent: NodeId,
    len: Option<f64>,
}

/// Copy every subtree reached through `branches`, in order, assigning new
/// ids in preorder. Uses a work stack so tree depth is not bounded by the
/// call stack.
fn attach(tree: &PhyloTree, adj: &Adjacency, branches: Vec<Branch>, nodes: &mut Vec<Node>) {
    let mut todo: Vec<Branch> = branches.into_iter().rev().collect();
    while let Some(Branch { old, from, parent, len }) = todo.pop() {
        let onward: Vec<(NodeId, Option<f64>)> =
            adj[old].iter().copied().filter(|&(nb, _)| nb != from).collect();

        // A former root left with one neighbour is dissolved and its two
        // edges merged.
        if let [(next, next_len)] = onward[..] {
            if old == tree.root() {
                let merged = match (len, next_len) {
                    (None, None) => None,
                    (a, b) => Some(a.unwrap_or(0.0) + b.unwrap_or(0.0)),
                };
                todo.push(Branch { old: next, from: old, parent, len: merged });
                continue;
            }
        }

        let id = nodes.len();
        nodes.push(Node {
            branch_length: len,
            name: tree.nodes()[old].name.clone(),
            ..Node::bare(id, Some(parent))
        });
        nodes[parent].children.push(id);
        let children: Vec<Branch> = onward
            .into_iter()
            .map(|(nb, nb_len)| Branch { old: nb, from: old, parent: id, len: nb_len })
            .collect();
        todo.extend(children.into_iter().rev());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn roots_relabeled_example_on_an_edge() {
        let tree = PhyloTree::from_newick("((0:0.3,2:0.3):0.4,1:0.5);").unwrap();
        let rooted = midpoint_root(&tree).unwrap();
        assert_eq!(rooted.to_newick(), "(1:0.6,(0:0.3,2:0.3):0.3);");
        assert!(approx(rooted.max_root_to_tip(), 0.6));
        assert!(approx(rooted.total_length(), tree.total_length()));
    }

    #[test]
    fn balanced_tree_keeps_its_root() {
        let input = "((A:1,B:1):1,(C:1,D:1):1);";
        let tree = PhyloTree::from_newick(input).unwrap();
        let rooted = midpoint_root(&tree).unwrap();
        assert_eq!(rooted.to_newick(), input);
    }

    #[test]
    fn long_branch_pulls_root() {
        // Diameter is A..C = 1 + 1 + 10 = 12, so the root sits 6 from C's tip.
        let tree = PhyloTree::from_newick("(A:1,(B:1,C:10):1);").unwrap();
        let rooted = midpoint_root(&tree).unwrap();
        assert!(approx(rooted.max_root_to_tip(), 6.0));
        assert_eq!(rooted.leaf_names(), tree.leaf_names());
        assert!(approx(rooted.total_length(), tree.total_length()));
        let root = rooted.get_node(rooted.root()).unwrap();
        assert_eq!(root.children.len(), 2);
        assert!(root.name.is_none());
    }

    #[test]
    fn midpoint_on_internal_node() {
        // Path A..D = 2 + 1 + 1 = 4 with the inner node X at distance 2.
        let tree = PhyloTree::from_newick("((A:2,(B:1,D:1)X:1):0,C:0.5);").unwrap();
        let rooted = midpoint_root(&tree).unwrap();
        assert!(approx(rooted.max_root_to_tip(), 2.0));
        assert_eq!(rooted.leaf_count(), tree.leaf_count());
    }

    #[test]
    fn single_leaf_unchanged() {
        let tree = PhyloTree::from_newick("A:1.5;").unwrap();
        assert_eq!(midpoint_root(&tree).unwrap(), tree);
    }

    #[test]
    fn zero_lengths_unchanged() {
        let tree = PhyloTree::from_newick("((A,B),C);").unwrap();
        assert_eq!(midpoint_root(&tree).unwrap(), tree);
    }

    #[test]
    fn negative_length_rejected() {
        let tree = PhyloTree::from_newick("(A:-1,B:2);").unwrap();
        assert!(matches!(
            midpoint_root(&tree),
            Err(PottsError::InvalidInput(_))
        ));
    }

    #[test]
    fn input_tree_untouched() {
        let tree = PhyloTree::from_newick("(A:1,(B:1,C:10):1);").unwrap();
        let before = tree.clone();
        let _ = midpoint_root(&tree).unwrap();
        assert_eq!(tree, before);
    }

    #[test]
    fn very_deep_ladder_is_rooted() {
        // ((...((t0:1,t1:1):1,t2:1):1,...):1,t{n-1}:1);
        let n = 100_000;
        let mut newick = "(".repeat(n - 1);
        newick.push_str("t0:1,t1:1)");
        for k in 2..n {
            newick.push_str(&format!(":1,t{k}:1)"));
        }
        newick.push(';');
        let tree = PhyloTree::from_newick(&newick).unwrap();
        let rooted = midpoint_root(&tree).unwrap();
        assert_eq!(rooted.leaf_count(), n);
        assert!(approx(rooted.max_root_to_tip(), n as f64 / 2.0));
        assert!(approx(rooted.total_length(), tree.total_length()));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    /// Naive diameter: every leaf pair via root distances and their MRCA.
    fn diameter(tree: &PhyloTree) -> f64 {
        let ancestors = |mut id: NodeId| {
            let mut out = vec![id];
            while let Some(p) = tree.nodes()[id].parent {
                out.push(p);
                id = p;
            }
            out
        };
        let leaves = tree.leaves();
        let mut best: f64 = 0.0;
        for (i, &x) in leaves.iter().enumerate() {
            let ax = ancestors(x);
            for &y in &leaves[i + 1..] {
                let mrca = ancestors(y).into_iter().find(|n| ax.contains(n)).unwrap();
                let d = tree.distance_from_root(x).unwrap() + tree.distance_from_root(y).unwrap()
                    - 2.0 * tree.distance_from_root(mrca).unwrap();
                best = best.max(d);
            }
        }
        best
    }

    fn caterpillar() -> impl Strategy<Value = String> {
        proptest::collection::vec(1u32..500, 3..=8).prop_map(|lens| {
            let mut s = format!("(L0:{},L1:{})", lens[0] as f64 / 100.0, lens[1] as f64 / 100.0);
            for (i, l) in lens[2..].iter().enumerate() {
                s = format!("({}:0.25,L{}:{})", s, i + 2, *l as f64 / 100.0);
            }
            s.push(';');
            s
        })
    }

    proptest! {
        #[test]
        fn root_halves_the_diameter(newick in caterpillar()) {
            let tree = PhyloTree::from_newick(&newick).unwrap();
            let rooted = midpoint_root(&tree).unwrap();
            let d = diameter(&tree);
            prop_assert!((rooted.max_root_to_tip() - d / 2.0).abs() < 1e-9);
            prop_assert!((diameter(&rooted) - d).abs() < 1e-9);
            prop_assert!((rooted.total_length() - tree.total_length()).abs() < 1e-9);
            prop_assert_eq!(rooted.leaf_names(), tree.leaf_names());
        }
    }
}
