//! Bijection between sequence names and dense integer indices.
//!
//! The map is built once from the reference alignment order and handed by
//! reference to every stage that needs it: leaf relabeling, the persisted
//! TSV artifact, and the converter that restores original names.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use phylopotts_core::{PottsError, Result, Summarizable};

use crate::tree::PhyloTree;

/// Name <-> index bijection over `[0, N)`, in first-appearance order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NameIndexMap {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl NameIndexMap {
    /// Assign indices `0..N` to `names` in order.
    ///
    /// # Errors
    ///
    /// Returns [`PottsError::Integrity`] if a name occurs twice.
    pub fn from_names<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut map = Self::default();
        for name in names {
            let name = name.into();
            if map.index.contains_key(&name) {
                return Err(PottsError::Integrity(format!(
                    "duplicate sequence name '{name}' in reference alignment"
                )));
            }
            map.index.insert(name.clone(), map.names.len());
            map.names.push(name);
        }
        Ok(map)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Index assigned to `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Name assigned to `index`.
    pub fn name_of(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// `(name, index)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> + '_ {
        self.names.iter().enumerate().map(|(i, n)| (n.as_str(), i))
    }

    /// Names in index order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Persist as `name<TAB>index` lines in insertion order.
    pub fn write_tsv(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| PottsError::file(path, e))?;
        let mut w = BufWriter::new(file);
        for (name, idx) in self.iter() {
            writeln!(w, "{name}\t{idx}").map_err(|e| PottsError::file(path, e))?;
        }
        w.flush().map_err(|e| PottsError::file(path, e))
    }

    /// Load a mapping written by [`write_tsv`](Self::write_tsv).
    ///
    /// Rows may appear in any order, but the indices must cover `[0, N)`
    /// exactly once.
    pub fn read_tsv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| PottsError::file(path, e))?;
        let mut slots: Vec<Option<String>> = Vec::new();
        for (lineno, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| PottsError::file(path, e))?;
            if line.trim().is_empty() {
                continue;
            }
            let parse_err = || {
                PottsError::Parse(format!(
                    "{}:{}: expected 'name<TAB>index', got '{line}'",
                    path.display(),
                    lineno + 1
                ))
            };
            let (name, idx) = line.rsplit_once('\t').ok_or_else(parse_err)?;
            let idx: usize = idx.trim().parse().map_err(|_| parse_err())?;
            if idx >= slots.len() {
                slots.resize(idx + 1, None);
            }
            if slots[idx].replace(name.to_string()).is_some() {
                return Err(PottsError::Integrity(format!(
                    "{}: index {idx} assigned twice",
                    path.display()
                )));
            }
        }
        let names = slots
            .into_iter()
            .enumerate()
            .map(|(i, slot)| {
                slot.ok_or_else(|| {
                    PottsError::Integrity(format!("{}: index {i} is missing", path.display()))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::from_names(names)
    }

    /// Return a copy of `tree` whose leaves are labelled with their indices.
    ///
    /// Topology, branch lengths and internal node labels are unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`PottsError::Integrity`] if a leaf is unnamed, a leaf name is
    /// not in the map, two leaves share a name, or a mapped name has no leaf.
    pub fn relabel_tree(&self, tree: &PhyloTree) -> Result<PhyloTree> {
        let mut relabeled = tree.clone();
        let mut seen = vec![false; self.len()];
        for id in tree.leaves() {
            let node = relabeled
                .get_node_mut(id)
                .ok_or_else(|| PottsError::Other(format!("leaf {id} vanished from arena")))?;
            let name = node.name.as_deref().ok_or_else(|| {
                PottsError::Integrity(format!("tree leaf (node {id}) has no name"))
            })?;
            let idx = self.index_of(name).ok_or_else(|| {
                PottsError::Integrity(format!("tree tip '{name}' not found in MSA"))
            })?;
            if std::mem::replace(&mut seen[idx], true) {
                return Err(PottsError::Integrity(format!(
                    "tree tip '{name}' appears more than once"
                )));
            }
            node.name = Some(idx.to_string());
        }
        if let Some(missing) = seen.iter().position(|&s| !s) {
            return Err(PottsError::Integrity(format!(
                "sequence '{}' has no leaf in the tree",
                self.names[missing]
            )));
        }
        Ok(relabeled)
    }
}

impl Summarizable for NameIndexMap {
    fn summary(&self) -> String {
        format!("NameIndexMap: {} names", self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example_map() -> NameIndexMap {
        NameIndexMap::from_names(["homo", "fish", "mouse"]).unwrap()
    }

    #[test]
    fn assigns_first_appearance_order() {
        let map = example_map();
        assert_eq!(map.index_of("homo"), Some(0));
        assert_eq!(map.index_of("fish"), Some(1));
        assert_eq!(map.index_of("mouse"), Some(2));
        assert_eq!(map.name_of(2), Some("mouse"));
        assert_eq!(map.index_of("cat"), None);
    }

    #[test]
    fn indices_cover_range_exactly() {
        let map = NameIndexMap::from_names((0..50).map(|i| format!("s{i}"))).unwrap();
        let mut idx: Vec<usize> = map.iter().map(|(_, i)| i).collect();
        idx.sort_unstable();
        assert_eq!(idx, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn duplicate_names_rejected() {
        let err = NameIndexMap::from_names(["a", "b", "a"]).unwrap_err();
        assert!(matches!(err, PottsError::Integrity(_)));
    }

    #[test]
    fn relabels_example_tree() {
        let tree = PhyloTree::from_newick("((homo:0.3,mouse:0.3):0.4,fish:0.5);").unwrap();
        let relabeled = example_map().relabel_tree(&tree).unwrap();
        assert_eq!(relabeled.to_newick(), "((0:0.3,2:0.3):0.4,1:0.5);");
        // Input is untouched.
        assert_eq!(tree.to_newick(), "((homo:0.3,mouse:0.3):0.4,fish:0.5);");
    }

    #[test]
    fn relabel_preserves_topology() {
        let tree = PhyloTree::from_newick("((homo:0.3,mouse:0.3)inner:0.4,fish:0.5);").unwrap();
        let relabeled = example_map().relabel_tree(&tree).unwrap();
        assert_eq!(relabeled.node_count(), tree.node_count());
        for (a, b) in tree.nodes().iter().zip(relabeled.nodes()) {
            assert_eq!(a.parent, b.parent);
            assert_eq!(a.children, b.children);
            assert_eq!(a.branch_length, b.branch_length);
            if !a.is_leaf() {
                assert_eq!(a.name, b.name);
            }
        }
    }

    #[test]
    fn unknown_leaf_is_fatal() {
        let tree = PhyloTree::from_newick("((homo,mouse),(fish,cat));").unwrap();
        let err = example_map().relabel_tree(&tree).unwrap_err();
        assert!(matches!(err, PottsError::Integrity(_)));
        assert!(err.to_string().contains("'cat'"));
    }

    #[test]
    fn missing_leaf_is_fatal() {
        let tree = PhyloTree::from_newick("(homo,mouse);").unwrap();
        let err = example_map().relabel_tree(&tree).unwrap_err();
        assert!(err.to_string().contains("'fish'"));
    }

    #[test]
    fn duplicate_leaf_is_fatal() {
        let tree = PhyloTree::from_newick("((homo,mouse),(fish,homo));").unwrap();
        assert!(example_map().relabel_tree(&tree).is_err());
    }

    #[test]
    fn unnamed_leaf_is_fatal() {
        let tree = PhyloTree::from_newick("((homo,mouse),(fish,:0.1));").unwrap();
        assert!(example_map().relabel_tree(&tree).is_err());
    }

    #[test]
    fn tsv_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.tsv");
        let map = example_map();
        map.write_tsv(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "homo\t0\nfish\t1\nmouse\t2\n");
        assert_eq!(NameIndexMap::read_tsv(&path).unwrap(), map);
    }

    #[test]
    fn tsv_with_gap_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.tsv");
        std::fs::write(&path, "a\t0\nb\t2\n").unwrap();
        assert!(NameIndexMap::read_tsv(&path).is_err());
    }

    #[test]
    fn tsv_malformed_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.tsv");
        std::fs::write(&path, "a 0\n").unwrap();
        let err = NameIndexMap::read_tsv(&path).unwrap_err();
        assert!(matches!(err, PottsError::Parse(_)));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn unique_names_get_dense_indices(names in proptest::collection::hash_set("[a-z]{1,8}", 1..40)) {
            let names: Vec<String> = names.into_iter().collect();
            let map = NameIndexMap::from_names(names.clone()).unwrap();
            prop_assert_eq!(map.len(), names.len());
            for (i, name) in names.iter().enumerate() {
                prop_assert_eq!(map.index_of(name), Some(i));
                prop_assert_eq!(map.name_of(i), Some(name.as_str()));
            }
        }
    }
}
