//! Alignment summary statistics.
//!
//! Two column-wise statistics are computed from a character alignment:
//!
//! - the **gap-fraction profile**, the share of columns whose gap rate is at
//!   least each threshold in [`GAP_THRESHOLDS`];
//! - the **weighted pairwise score** of each column,
//!   `sum_{a,b} s(a, b) * f(a) * f(b)` over the non-gap symbols observed in
//!   it, reduced to the percentiles in [`SCORE_PERCENTILES`].
//!
//! Inputs are never modified.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use phylopotts_core::{PottsError, Result};
use phylopotts_seq::{write_fasta_file, FastaRecord, Msa, GAP};
use phylopotts_stats::percentiles;

use crate::scoring::SubstitutionMatrix;

/// Gap-rate thresholds of the gap-fraction profile.
pub const GAP_THRESHOLDS: [f64; 5] = [0.10, 0.25, 0.50, 0.75, 1.00];

/// Percentiles reported for the per-column pairwise scores.
pub const SCORE_PERCENTILES: [f64; 5] = [25.0, 50.0, 75.0, 90.0, 100.0];

/// File name of the gap-stripped sequences written by [`summarize_to_dir`].
pub const UNALIGNED_FILE: &str = "unaligned.fasta";

/// File name of the text report written by [`summarize_to_dir`].
pub const REPORT_FILE: &str = "msa_statistics.txt";

/// For each threshold `t`, the fraction of columns with gap rate `>= t`.
pub fn gap_fraction_profile(msa: &Msa) -> Result<[f64; 5]> {
    require_columns(msa)?;
    let n_seqs = msa.n_sequences() as f64;
    let rates: Vec<f64> = (0..msa.width())
        .map(|col| msa.column(col).filter(|&b| b == GAP).count() as f64 / n_seqs)
        .collect();
    let n_cols = rates.len() as f64;
    Ok(GAP_THRESHOLDS.map(|t| rates.iter().filter(|&&r| r >= t).count() as f64 / n_cols))
}

/// Frequency-weighted sum of pairwise substitution scores for every column.
///
/// Gaps are excluded. Columns with fewer than two non-gap symbols score 0.
/// Symbols are uppercased before counting.
pub fn column_pairwise_scores(msa: &Msa, matrix: &SubstitutionMatrix) -> Vec<f64> {
    (0..msa.width())
        .map(|col| {
            let mut counts: BTreeMap<u8, usize> = BTreeMap::new();
            for b in msa.column(col).filter(|&b| b != GAP) {
                *counts.entry(b.to_ascii_uppercase()).or_insert(0) += 1;
            }
            let total: usize = counts.values().sum();
            if total < 2 {
                return 0.0;
            }
            let freqs: Vec<(u8, f64)> = counts
                .into_iter()
                .map(|(sym, c)| (sym, c as f64 / total as f64))
                .collect();
            let mut score = 0.0;
            for &(a, fa) in &freqs {
                for &(b, fb) in &freqs {
                    score += f64::from(matrix.lookup(a, b)) * fa * fb;
                }
            }
            score
        })
        .collect()
}

/// The 25th, 50th, 75th, 90th and 100th percentiles of `scores`.
pub fn score_percentiles(scores: &[f64]) -> Result<[f64; 5]> {
    let values = percentiles(scores, &SCORE_PERCENTILES)?;
    Ok([values[0], values[1], values[2], values[3], values[4]])
}

/// Write every sequence with gaps removed, keeping ids and order.
pub fn write_unaligned(msa: &Msa, path: impl AsRef<Path>) -> Result<()> {
    let stripped: Vec<FastaRecord> = msa
        .records()
        .iter()
        .map(|r| FastaRecord {
            id: r.id.clone(),
            seq: r.seq.iter().copied().filter(|&b| b != GAP).collect(),
        })
        .collect();
    write_fasta_file(path, &stripped)
}

/// Summary of one alignment.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MsaStatistics {
    pub n_sequences: usize,
    pub length: usize,
    /// Aligned with [`GAP_THRESHOLDS`].
    pub gap_fractions: [f64; 5],
    /// Name of the substitution matrix used for the column scores.
    pub matrix: String,
    /// Aligned with [`SCORE_PERCENTILES`].
    pub score_percentiles: [f64; 5],
}

impl MsaStatistics {
    pub fn compute(msa: &Msa, matrix: &SubstitutionMatrix) -> Result<Self> {
        let gap_fractions = gap_fraction_profile(msa)?;
        let scores = column_pairwise_scores(msa, matrix);
        Ok(Self {
            n_sequences: msa.n_sequences(),
            length: msa.width(),
            gap_fractions,
            matrix: matrix.name().to_string(),
            score_percentiles: score_percentiles(&scores)?,
        })
    }

    /// Human-readable report, two decimals per value.
    pub fn to_report(&self, source_name: &str) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "MSA statistics for {source_name}:");
        let _ = writeln!(out, "Num. seqs: {}", self.n_sequences);
        let _ = writeln!(out, "MSA length: {}", self.length);
        for (t, frac) in GAP_THRESHOLDS.iter().zip(&self.gap_fractions) {
            let _ = writeln!(
                out,
                "Frac. columns with at least {}% gaps: {frac:.2}",
                (t * 100.0).round() as u32
            );
        }
        let _ = writeln!(
            out,
            "Columns' sum of pairwise scores by {} weighted by AA freqs.",
            self.matrix
        );
        for (p, v) in SCORE_PERCENTILES.iter().zip(&self.score_percentiles) {
            let suffix = if *p >= 100.0 { " (highest)" } else { "" };
            let _ = writeln!(
                out,
                "Column sum weighted pw scores at {}%{suffix}: {v:.2}",
                *p as u32
            );
        }
        out
    }

    /// Pretty-printed JSON.
    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| PottsError::Other(e.to_string()))
    }
}

/// Read an aligned FASTA, write its gap-stripped copy and the text report
/// into `out_dir`, and return the statistics.
///
/// `out_dir` must already exist.
pub fn summarize_to_dir(
    input_fasta: impl AsRef<Path>,
    out_dir: impl AsRef<Path>,
    matrix: &SubstitutionMatrix,
) -> Result<MsaStatistics> {
    let input_fasta = input_fasta.as_ref();
    let out_dir = out_dir.as_ref();
    if !out_dir.is_dir() {
        return Err(PottsError::file(
            out_dir,
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "output directory does not exist",
            ),
        ));
    }

    let msa = Msa::from_fasta(input_fasta)?;
    write_unaligned(&msa, out_dir.join(UNALIGNED_FILE))?;

    let stats = MsaStatistics::compute(&msa, matrix)?;
    let source = input_fasta
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let report_path = out_dir.join(REPORT_FILE);
    std::fs::write(&report_path, stats.to_report(&source))
        .map_err(|e| PottsError::file(&report_path, e))?;
    tracing::info!(
        sequences = stats.n_sequences,
        length = stats.length,
        report = %report_path.display(),
        "wrote alignment statistics"
    );
    Ok(stats)
}

fn require_columns(msa: &Msa) -> Result<()> {
    if msa.width() == 0 {
        return Err(PottsError::Shape("alignment has no columns".into()));
    }
    Ok(())
}
