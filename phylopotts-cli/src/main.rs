mod args;
mod commands;
pub mod defaults;
mod logging;

use anyhow::Result;
use clap::{Parser, Subcommand};

use args::{ConvertArgs, GenerateArgs, SummarizeArgs};
use commands::{convert, generate, summarize};

/// phylopotts: Potts-model sequence generation along phylogenies
///
/// Generates alignments from bmDCA parameters along a reference tree,
/// converts between integer-coded and FASTA alignments, and summarizes
/// alignments.
#[derive(Parser, Debug)]
#[command(name = "phylopotts")]
#[command(author, version, about = "Simulates protein alignments along a tree with a Potts model", long_about = None)]
struct Cli {
    /// Log debug messages (RUST_LOG takes precedence)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate an alignment along a tree.
    ///
    /// Maps reference names to indices, relabels and midpoint-roots the tree,
    /// loads the parameters and samples one sequence per leaf.
    Generate(GenerateArgs),

    /// Convert between `.npy` integer codes and FASTA.
    Convert(ConvertArgs),

    /// Summarize an aligned FASTA file.
    ///
    /// Writes the gap-stripped sequences and a statistics report.
    Summarize(SummarizeArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Generate(args) => generate::run_generate(&args)?,
        Commands::Convert(args) => convert::run_convert(&args)?,
        Commands::Summarize(args) => summarize::run_summarize(&args)?,
    }

    Ok(())
}
