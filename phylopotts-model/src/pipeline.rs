//! End-to-end generation of an alignment along a reference tree.
//!
//! Stages run strictly in order and each one writes its artifact before the
//! next starts, so a failure leaves everything produced so far on disk:
//!
//! 1. `{prefix}_name_to_index.tsv`: reference sequence names and indices
//! 2. `{prefix}_input_tree_numerical_names.newick`: tree with leaves relabelled
//! 3. `{prefix}_rooted_tree_numerical_names.newick`: the same, midpoint rooted
//! 4. `{prefix}_sim_eq_msa_along_tree.npy`: the sampled `N x L` alignment

use std::path::{Path, PathBuf};

use phylopotts_core::{PottsError, Result, Summarizable};
use phylopotts_io::write_npy;
use phylopotts_phylo::{midpoint_root, NameIndexMap, PhyloTree};
use phylopotts_seq::{CodeMatrix, Msa};

use crate::params::{load_parameter_set, ParameterStats};
use crate::sampler::TreeSampler;

/// Artifact file name prefix used when none is configured.
pub const DEFAULT_PREFIX: &str = "potts_gen";

const MAPPING_SUFFIX: &str = "name_to_index.tsv";
const INPUT_TREE_SUFFIX: &str = "input_tree_numerical_names.newick";
const ROOTED_TREE_SUFFIX: &str = "rooted_tree_numerical_names.newick";
const ALIGNMENT_SUFFIX: &str = "sim_eq_msa_along_tree.npy";

/// Accepted flips applied to the root sequence before descending the tree.
pub const DEFAULT_EQUILIBRATION_STEPS: usize = 10_000;

/// Inputs and options for one generation run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GenerationConfig {
    /// Reference alignment the parameters were inferred from.
    pub msa_path: PathBuf,
    /// Newick tree whose leaves are the reference sequence names.
    pub tree_path: PathBuf,
    /// bmDCA parameter file.
    pub params_path: PathBuf,
    pub output_dir: PathBuf,
    pub equilibration_steps: usize,
    /// Model length; inferred from the field records when `None`.
    pub length: Option<usize>,
    pub prefix: String,
}

impl GenerationConfig {
    pub fn new(
        msa_path: impl Into<PathBuf>,
        tree_path: impl Into<PathBuf>,
        params_path: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            msa_path: msa_path.into(),
            tree_path: tree_path.into(),
            params_path: params_path.into(),
            output_dir: output_dir.into(),
            equilibration_steps: DEFAULT_EQUILIBRATION_STEPS,
            length: None,
            prefix: DEFAULT_PREFIX.to_string(),
        }
    }

    pub fn with_equilibration_steps(mut self, steps: usize) -> Self {
        self.equilibration_steps = steps;
        self
    }

    pub fn with_length(mut self, length: usize) -> Self {
        self.length = Some(length);
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    fn artifact(&self, suffix: &str) -> PathBuf {
        self.output_dir.join(format!("{}_{suffix}", self.prefix))
    }
}

/// Everything a successful run produced.
#[derive(Debug, Clone)]
pub struct GenerationOutputs {
    pub mapping_path: PathBuf,
    pub input_tree_path: PathBuf,
    pub rooted_tree_path: PathBuf,
    pub alignment_path: PathBuf,
    pub names: NameIndexMap,
    pub rooted_tree: PhyloTree,
    pub alignment: CodeMatrix,
    pub parameter_stats: ParameterStats,
}

/// Runs the generation stages for one [`GenerationConfig`].
#[derive(Debug, Clone)]
pub struct GenerationPipeline {
    config: GenerationConfig,
}

impl GenerationPipeline {
    pub fn new(config: GenerationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Run every stage, handing the loaded model and rooted tree to `sampler`.
    ///
    /// # Errors
    ///
    /// The first failing stage aborts the run with its error. Artifacts of
    /// earlier stages stay on disk.
    pub fn run<S: TreeSampler + ?Sized>(&self, sampler: &mut S) -> Result<GenerationOutputs> {
        let cfg = &self.config;
        std::fs::create_dir_all(&cfg.output_dir)
            .map_err(|e| PottsError::file(&cfg.output_dir, e))?;

        tracing::info!(msa = %cfg.msa_path.display(), "reading reference alignment");
        let reference = Msa::from_fasta(&cfg.msa_path)?;
        let names = NameIndexMap::from_names(reference.ids())?;
        let mapping_path = cfg.artifact(MAPPING_SUFFIX);
        names.write_tsv(&mapping_path)?;
        tracing::info!(path = %mapping_path.display(), sequences = names.len(), "saved name-to-index mapping");

        tracing::info!(tree = %cfg.tree_path.display(), "relabelling tree leaves");
        let tree = PhyloTree::read_newick(&cfg.tree_path)?;
        let relabeled = names.relabel_tree(&tree)?;
        let input_tree_path = cfg.artifact(INPUT_TREE_SUFFIX);
        relabeled.write_newick(&input_tree_path)?;
        tracing::info!(path = %input_tree_path.display(), "saved relabelled tree");

        let rooted = midpoint_root(&relabeled)?;
        let rooted_tree_path = cfg.artifact(ROOTED_TREE_SUFFIX);
        rooted.write_newick(&rooted_tree_path)?;
        tracing::info!(path = %rooted_tree_path.display(), "saved midpoint-rooted {}", rooted.summary());

        tracing::info!(params = %cfg.params_path.display(), "loading field and coupling parameters");
        let params = load_parameter_set(&cfg.params_path, cfg.length)?;
        tracing::info!("{}", params.stats.summary());
        if reference.width() != params.stats.length {
            return Err(PottsError::Shape(format!(
                "reference alignment has {} columns but the model has length {}",
                reference.width(),
                params.stats.length
            )));
        }

        tracing::info!(
            equilibration_steps = cfg.equilibration_steps,
            leaves = rooted.leaf_count(),
            "sampling alignment along the tree"
        );
        let alignment = sampler.sample(
            &params.field,
            &params.coupling,
            &rooted,
            cfg.equilibration_steps,
        )?;
        check_alignment_shape(&alignment, names.len(), params.stats.length)?;

        let alignment_path = cfg.artifact(ALIGNMENT_SUFFIX);
        write_npy(&alignment_path, &alignment)?;
        tracing::info!(path = %alignment_path.display(), "{}", alignment.summary());

        Ok(GenerationOutputs {
            mapping_path,
            input_tree_path,
            rooted_tree_path,
            alignment_path,
            names,
            rooted_tree: rooted,
            alignment,
            parameter_stats: params.stats,
        })
    }
}

fn check_alignment_shape(alignment: &CodeMatrix, rows: usize, cols: usize) -> Result<()> {
    if alignment.n_rows() != rows || alignment.n_cols() != cols {
        return Err(PottsError::Shape(format!(
            "sampler returned {} x {}, expected {rows} x {cols}",
            alignment.n_rows(),
            alignment.n_cols()
        )));
    }
    Ok(())
}

/// Artifact paths a run with `prefix` would write into `output_dir`, in
/// stage order.
pub fn artifact_paths(output_dir: &Path, prefix: &str) -> [PathBuf; 4] {
    [
        MAPPING_SUFFIX,
        INPUT_TREE_SUFFIX,
        ROOTED_TREE_SUFFIX,
        ALIGNMENT_SUFFIX,
    ]
    .map(|suffix| output_dir.join(format!("{prefix}_{suffix}")))
}
