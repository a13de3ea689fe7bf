use anyhow::{Context, Result};
use phylopotts_align::summary::REPORT_FILE;
use phylopotts_align::{summarize_to_dir, SubstitutionMatrix};

use crate::args::SummarizeArgs;

const JSON_FILE: &str = "msa_statistics.json";

pub fn run_summarize(args: &SummarizeArgs) -> Result<()> {
    let matrix = match &args.matrix {
        Some(path) => SubstitutionMatrix::from_file(path)
            .with_context(|| format!("Failed to load substitution matrix {}", path.display()))?,
        None => SubstitutionMatrix::blosum62(),
    };

    let stats = summarize_to_dir(&args.input, &args.output_dir, &matrix)
        .with_context(|| format!("Failed to summarize {}", args.input.display()))?;

    if args.json {
        let json = stats.to_json()?;
        let path = args.output_dir.join(JSON_FILE);
        std::fs::write(&path, format!("{json}\n"))
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("{json}");
    } else {
        let report = args.output_dir.join(REPORT_FILE);
        let text = std::fs::read_to_string(&report)
            .with_context(|| format!("Failed to read back {}", report.display()))?;
        print!("{text}");
    }
    Ok(())
}
