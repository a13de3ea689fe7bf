//! Sequence containers and I/O for phylopotts.
//!
//! - **Alphabets**: [`SymbolAlphabet`] with the fixed, ordered gap-first
//!   amino-acid and nucleotide symbol sets
//! - **FASTA**: [`read_fasta`] (via needletail) and [`write_fasta_file`]
//! - **Alignments**: [`Msa`] for named character rows, [`CodeMatrix`] for
//!   integer-coded rows

pub mod alphabet;
pub mod fasta;
pub mod msa;

pub use alphabet::{SymbolAlphabet, AMINO_ACID_STATES, GAP};
pub use fasta::{read_fasta, write_fasta, write_fasta_file, FastaRecord};
pub use msa::{CodeMatrix, Msa};
