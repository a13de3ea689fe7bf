use std::path::PathBuf;

use clap::Args;
use phylopotts_seq::SymbolAlphabet;

use crate::defaults;

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Reference alignment (FASTA) the parameters were inferred from
    #[arg(long)]
    pub msa: PathBuf,

    /// Newick tree whose leaves are the reference sequence names
    #[arg(long)]
    pub tree: PathBuf,

    /// bmDCA parameter file with `J` and `h` records
    #[arg(long)]
    pub params: PathBuf,

    /// Directory for all generated files (created if missing)
    #[arg(long)]
    pub output_dir: PathBuf,

    /// Accepted flips applied to the root sequence before descending the tree
    #[arg(
        long,
        default_value_t = defaults::EQ_FLIPS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub eq_flips: u64,

    /// Model length; inferred from the field records if omitted
    #[arg(long)]
    pub length: Option<usize>,

    /// Random seed (default: drawn at random)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Accepted flips per unit of branch length (default: model length)
    #[arg(long)]
    pub mutations_per_unit: Option<f64>,

    /// File name prefix for generated artifacts
    #[arg(long, default_value = defaults::PREFIX)]
    pub prefix: String,
}

#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Input file: `.npy` codes, or FASTA with `--reverse`
    pub input: PathBuf,

    /// Output file: FASTA, or `.npy` with `--reverse`
    pub output: PathBuf,

    /// Symbol alphabet (aa or dna)
    #[arg(long, default_value = defaults::ALPHABET)]
    pub alphabet: SymbolAlphabet,

    /// Convert FASTA to `.npy` instead of `.npy` to FASTA
    #[arg(long)]
    pub reverse: bool,

    /// Name-to-index TSV used to restore sequence names
    #[arg(long, conflicts_with = "reverse")]
    pub names: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct SummarizeArgs {
    /// Aligned FASTA to summarize
    pub input: PathBuf,

    /// Existing directory for `unaligned.fasta` and `msa_statistics.txt`
    pub output_dir: PathBuf,

    /// Print the statistics as JSON and also write `msa_statistics.json`
    #[arg(long)]
    pub json: bool,

    /// Substitution matrix in NCBI text format (default: built-in BLOSUM62)
    #[arg(long)]
    pub matrix: Option<PathBuf>,
}
