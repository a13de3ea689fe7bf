//! File formats for phylopotts.
//!
//! - [`npy`]: NumPy `.npy` reader and writer for 2-D integer arrays
//! - [`convert`]: integer-coded alignments to and from FASTA

pub mod convert;
pub mod npy;

pub use convert::{codes_to_msa, fasta_to_npy, msa_to_codes, npy_to_fasta};
pub use npy::{read_npy, write_npy, NpyArray};
