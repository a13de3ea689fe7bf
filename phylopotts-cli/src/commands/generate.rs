use anyhow::{Context, Result};
use phylopotts_model::{GenerationConfig, GenerationPipeline, MetropolisTreeSampler};

use crate::args::GenerateArgs;

pub fn run_generate(args: &GenerateArgs) -> Result<()> {
    let eq_flips = usize::try_from(args.eq_flips)
        .with_context(|| format!("--eq-flips {} is too large", args.eq_flips))?;
    let mut config = GenerationConfig::new(&args.msa, &args.tree, &args.params, &args.output_dir)
        .with_equilibration_steps(eq_flips)
        .with_prefix(&args.prefix);
    if let Some(length) = args.length {
        config = config.with_length(length);
    }

    let mut sampler = match args.seed {
        Some(seed) => MetropolisTreeSampler::new(seed),
        None => MetropolisTreeSampler::from_random_seed(),
    };
    if let Some(rate) = args.mutations_per_unit {
        sampler = sampler.with_mutations_per_unit(rate);
    }

    let outputs = GenerationPipeline::new(config)
        .run(&mut sampler)
        .with_context(|| {
            format!(
                "Failed to generate an alignment into {}",
                args.output_dir.display()
            )
        })?;

    println!("Name-to-index mapping: {}", outputs.mapping_path.display());
    println!("Relabelled tree:       {}", outputs.input_tree_path.display());
    println!("Rooted tree:           {}", outputs.rooted_tree_path.display());
    println!(
        "Simulated alignment:   {} ({} x {})",
        outputs.alignment_path.display(),
        outputs.alignment.n_rows(),
        outputs.alignment.n_cols()
    );
    Ok(())
}
