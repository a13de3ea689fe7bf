use anyhow::{Context, Result};
use phylopotts_io::{fasta_to_npy, npy_to_fasta};
use phylopotts_phylo::NameIndexMap;

use crate::args::ConvertArgs;

pub fn run_convert(args: &ConvertArgs) -> Result<()> {
    if args.reverse {
        let codes = fasta_to_npy(&args.input, &args.output, args.alphabet).with_context(|| {
            format!("Failed to convert {} to NPY", args.input.display())
        })?;
        println!(
            "Wrote {} sequences x {} columns to {}",
            codes.n_rows(),
            codes.n_cols(),
            args.output.display()
        );
        return Ok(());
    }

    let names = args
        .names
        .as_ref()
        .map(|path| {
            NameIndexMap::read_tsv(path)
                .with_context(|| format!("Failed to read name mapping {}", path.display()))
        })
        .transpose()?;
    let msa = npy_to_fasta(&args.input, &args.output, args.alphabet, names.as_ref())
        .with_context(|| format!("Failed to convert {} to FASTA", args.input.display()))?;
    println!(
        "Wrote {} sequences x {} columns to {}",
        msa.n_sequences(),
        msa.width(),
        args.output.display()
    );
    Ok(())
}
