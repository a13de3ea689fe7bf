//! Conversion between integer-coded alignments and FASTA.
//!
//! The alphabet is always chosen by the caller. Decoding rejects codes that
//! the alphabet cannot represent, and encoding rejects characters it does not
//! contain, so a successful conversion in one direction is always reversible.

use std::path::Path;

use phylopotts_core::{PottsError, Result};
use phylopotts_phylo::NameIndexMap;
use phylopotts_seq::{write_fasta_file, CodeMatrix, FastaRecord, Msa, SymbolAlphabet};

use crate::npy::{read_npy, write_npy};

/// Decode an integer alignment into named character rows.
///
/// Row `i` is named `names[i]` when `names` is given, `seq_{i}` otherwise.
///
/// # Errors
///
/// - [`PottsError::Integrity`] if a code is not below the alphabet size.
/// - [`PottsError::Shape`] if `names` does not have one entry per row.
pub fn codes_to_msa(
    codes: &CodeMatrix,
    alphabet: SymbolAlphabet,
    names: Option<&[String]>,
) -> Result<Msa> {
    if let Some(names) = names {
        if names.len() != codes.n_rows() {
            return Err(PottsError::Shape(format!(
                "{} names supplied for {} rows",
                names.len(),
                codes.n_rows()
            )));
        }
    }
    let records = codes
        .rows()
        .enumerate()
        .map(|(i, row)| {
            let seq = row
                .iter()
                .enumerate()
                .map(|(col, &code)| {
                    alphabet.symbol(code).ok_or_else(|| {
                        PottsError::Integrity(format!(
                            "code {code} at row {i}, column {col} is outside the {alphabet} alphabet of {} symbols",
                            alphabet.size()
                        ))
                    })
                })
                .collect::<Result<Vec<u8>>>()?;
            let id = match names {
                Some(names) => names[i].clone(),
                None => format!("seq_{i}"),
            };
            Ok(FastaRecord { id, seq })
        })
        .collect::<Result<Vec<_>>>()?;
    Msa::new(records)
}

/// Encode character rows as integer codes. Lowercase input is accepted.
///
/// # Errors
///
/// Returns [`PottsError::Integrity`] naming the first character that is not
/// in the alphabet, with its sequence and column.
pub fn msa_to_codes(msa: &Msa, alphabet: SymbolAlphabet) -> Result<CodeMatrix> {
    let mut codes = Vec::with_capacity(msa.n_sequences() * msa.width());
    for record in msa.records() {
        for (col, &ch) in record.seq.iter().enumerate() {
            let code = alphabet.code(ch).ok_or_else(|| {
                PottsError::Integrity(format!(
                    "character '{}' in sequence '{}' at column {col} is not in the {alphabet} alphabet",
                    ch as char, record.id
                ))
            })?;
            codes.push(code);
        }
    }
    CodeMatrix::new(msa.n_sequences(), msa.width(), codes)
}

/// Convert an `.npy` integer alignment into a FASTA file.
///
/// With a name map, row `i` takes the name mapped to index `i`.
pub fn npy_to_fasta(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    alphabet: SymbolAlphabet,
    names: Option<&NameIndexMap>,
) -> Result<Msa> {
    let input = input.as_ref();
    let output = output.as_ref();
    let codes = read_npy(input)?.into_code_matrix()?;
    let msa = codes_to_msa(&codes, alphabet, names.map(NameIndexMap::names))?;
    write_fasta_file(output, msa.records())?;
    tracing::info!(
        input = %input.display(),
        output = %output.display(),
        sequences = msa.n_sequences(),
        alphabet = %alphabet,
        "converted NPY to FASTA"
    );
    Ok(msa)
}

/// Convert an aligned FASTA file into an `.npy` integer alignment.
pub fn fasta_to_npy(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    alphabet: SymbolAlphabet,
) -> Result<CodeMatrix> {
    let input = input.as_ref();
    let output = output.as_ref();
    let msa = Msa::from_fasta(input)?;
    let codes = msa_to_codes(&msa, alphabet)?;
    write_npy(output, &codes)?;
    tracing::info!(
        input = %input.display(),
        output = %output.display(),
        sequences = codes.n_rows(),
        alphabet = %alphabet,
        "converted FASTA to NPY"
    );
    Ok(codes)
}
