//! Alignment scoring and summary statistics for phylopotts.
//!
//! # Quick start
//!
//! ```
//! use phylopotts_align::{MsaStatistics, SubstitutionMatrix};
//! use phylopotts_seq::{FastaRecord, Msa};
//!
//! let msa = Msa::new(vec![
//!     FastaRecord::new("homo", "MG-"),
//!     FastaRecord::new("fish", "MKK"),
//!     FastaRecord::new("mouse", "MGK"),
//! ])
//! .unwrap();
//! let stats = MsaStatistics::compute(&msa, &SubstitutionMatrix::blosum62()).unwrap();
//! assert_eq!(stats.n_sequences, 3);
//! assert!((stats.gap_fractions[0] - 1.0 / 3.0).abs() < 1e-12);
//! ```

pub mod scoring;
pub mod summary;

pub use scoring::SubstitutionMatrix;
pub use summary::{
    column_pairwise_scores, gap_fraction_profile, score_percentiles, summarize_to_dir,
    write_unaligned, MsaStatistics, GAP_THRESHOLDS, SCORE_PERCENTILES,
};
