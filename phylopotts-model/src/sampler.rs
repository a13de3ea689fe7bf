//! Sequence sampling along a phylogeny.
//!
//! [`TreeSampler`] is the seam between the generation pipeline and the
//! Monte Carlo engine. [`MetropolisTreeSampler`] draws a random root
//! sequence, equilibrates it under the Potts model with Metropolis flips,
//! then copies it down the tree, applying a number of accepted flips on
//! each branch proportional to the branch length.

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use phylopotts_core::{PottsError, Result};
use phylopotts_phylo::{NodeId, PhyloTree};
use phylopotts_seq::CodeMatrix;

use crate::tensor::{delta_energy, CouplingTensor, FieldTensor, STATES};

/// Proposals allowed per requested flip before [`MetropolisTreeSampler::flip`]
/// gives up. Steep models can make every move's acceptance underflow to 0.
pub const MAX_PROPOSALS_PER_FLIP: usize = 10_000;

/// Largest flip count one branch may ask for.
const MAX_BRANCH_FLIPS: f64 = u32::MAX as f64;

/// Produces one aligned sequence per tree leaf.
pub trait TreeSampler {
    /// Sample an `N x L` alignment for a tree whose `N` leaves are labelled
    /// `0..N`. Row `k` belongs to the leaf labelled `k`.
    fn sample(
        &mut self,
        field: &FieldTensor,
        coupling: &CouplingTensor,
        tree: &PhyloTree,
        equilibration_steps: usize,
    ) -> Result<CodeMatrix>;
}

/// Metropolis sampler with a seedable xoshiro256++ generator.
#[derive(Debug, Clone)]
pub struct MetropolisTreeSampler {
    rng: Xoshiro256PlusPlus,
    mutations_per_unit: Option<f64>,
}

impl MetropolisTreeSampler {
    /// Sampler with a fixed seed; equal seeds give equal alignments.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
            mutations_per_unit: None,
        }
    }

    /// Sampler seeded from the thread-local generator.
    pub fn from_random_seed() -> Self {
        Self::new(rand::random())
    }

    /// Accepted flips per unit of branch length. Defaults to the model
    /// length `L`.
    pub fn with_mutations_per_unit(mut self, rate: f64) -> Self {
        self.mutations_per_unit = Some(rate);
        self
    }

    /// Apply `n_flips` accepted Metropolis flips to `seq` in place.
    ///
    /// Fails with [`PottsError::InvalidInput`] once
    /// `n_flips * MAX_PROPOSALS_PER_FLIP` proposals have been drawn without
    /// reaching `n_flips` acceptances.
    pub fn flip(
        &mut self,
        field: &FieldTensor,
        coupling: &CouplingTensor,
        seq: &mut [u8],
        n_flips: usize,
    ) -> Result<()> {
        let length = seq.len();
        if length == 0 {
            return Ok(());
        }
        let budget = n_flips.saturating_mul(MAX_PROPOSALS_PER_FLIP);
        let mut accepted = 0;
        let mut proposed = 0;
        while accepted < n_flips {
            if proposed == budget {
                return Err(PottsError::InvalidInput(format!(
                    "only {accepted} of {n_flips} flips accepted after {proposed} proposals; \
                     the model is too steep to sample"
                )));
            }
            proposed += 1;
            let site = self.rng.random_range(0..length);
            let current = seq[site] as usize;
            // Uniform over the other STATES - 1 symbols.
            let mut proposal = self.rng.random_range(0..STATES - 1);
            if proposal >= current {
                proposal += 1;
            }
            let delta = delta_energy(field, coupling, seq, site, proposal);
            if delta <= 0.0 || self.rng.random::<f64>() < (-delta).exp() {
                seq[site] = proposal as u8;
                accepted += 1;
            }
        }
        Ok(())
    }

    fn random_sequence(&mut self, length: usize) -> Vec<u8> {
        (0..length)
            .map(|_| self.rng.random_range(0..STATES) as u8)
            .collect()
    }
}

impl TreeSampler for MetropolisTreeSampler {
    fn sample(
        &mut self,
        field: &FieldTensor,
        coupling: &CouplingTensor,
        tree: &PhyloTree,
        equilibration_steps: usize,
    ) -> Result<CodeMatrix> {
        let length = field.length();
        if length == 0 {
            return Err(PottsError::InvalidInput("model has zero length".into()));
        }
        if coupling.length() != length {
            return Err(PottsError::Shape(format!(
                "field has {length} sites but coupling has {}",
                coupling.length()
            )));
        }
        if equilibration_steps == 0 {
            return Err(PottsError::InvalidInput(
                "equilibration steps must be positive".into(),
            ));
        }
        let rows = leaf_rows(tree)?;
        let rate = self.mutations_per_unit.unwrap_or(length as f64);
        if !rate.is_finite() || rate < 0.0 {
            return Err(PottsError::InvalidInput(format!(
                "mutations per unit branch length must be non-negative, got {rate}"
            )));
        }

        let mut root = self.random_sequence(length);
        self.flip(field, coupling, &mut root, equilibration_steps)?;
        tracing::debug!(equilibration_steps, "equilibrated root sequence");

        let mut sequences: Vec<Option<Vec<u8>>> = vec![None; tree.node_count()];
        sequences[tree.root()] = Some(root);
        let n_leaves = tree.leaf_count();
        let mut codes = vec![0u8; n_leaves * length];

        for id in tree.iter_preorder() {
            let node = &tree.nodes()[id];
            if let Some(parent) = node.parent {
                let mut seq = sequences[parent].clone().ok_or_else(|| {
                    PottsError::Other(format!("node {parent} visited after its child {id}"))
                })?;
                let flips = branch_flips(id, node.branch_length.unwrap_or(0.0), rate)?;
                self.flip(field, coupling, &mut seq, flips)?;
                sequences[id] = Some(seq);
            }
            if node.is_leaf() {
                let row = rows[id].ok_or_else(|| {
                    PottsError::Other(format!("leaf {id} has no assigned row"))
                })?;
                if let Some(seq) = sequences[id].take() {
                    codes[row * length..(row + 1) * length].copy_from_slice(&seq);
                }
            }
        }

        CodeMatrix::new(n_leaves, length, codes)
    }
}

/// `round(branch_length * rate)` as a flip count, refusing negative,
/// non-finite or unreasonably large results.
fn branch_flips(node: NodeId, branch_length: f64, rate: f64) -> Result<usize> {
    let flips = (branch_length * rate).round();
    if !(0.0..=MAX_BRANCH_FLIPS).contains(&flips) {
        return Err(PottsError::InvalidInput(format!(
            "branch above node {node} (length {branch_length}) needs {flips} flips"
        )));
    }
    Ok(flips as usize)
}

/// Row index of every leaf node, parsed from its label; `None` for
/// internal nodes.
///
/// The labels must be exactly `0..N` for `N` leaves.
fn leaf_rows(tree: &PhyloTree) -> Result<Vec<Option<usize>>> {
    let leaves: Vec<NodeId> = tree.leaves();
    let n = leaves.len();
    let mut rows = vec![None; tree.node_count()];
    let mut seen = vec![false; n];
    for id in leaves {
        let label = tree.nodes()[id].name.as_deref().unwrap_or("");
        let row: usize = label.parse().map_err(|_| {
            PottsError::Integrity(format!(
                "leaf label '{label}' is not a row index; relabel the tree first"
            ))
        })?;
        if row >= n {
            return Err(PottsError::Integrity(format!(
                "leaf label {row} is out of range for {n} leaves"
            )));
        }
        if std::mem::replace(&mut seen[row], true) {
            return Err(PottsError::Integrity(format!(
                "leaf label {row} appears more than once"
            )));
        }
        rows[id] = Some(row);
    }
    Ok(rows)
}
