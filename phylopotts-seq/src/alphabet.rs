//! Ordered symbol alphabets for integer-coded alignments.
//!
//! Code `0` is always the gap. The remaining codes follow the alphabetical
//! order of the one-letter residue symbols, so an alignment encoded with one
//! alphabet decodes back to exactly the same characters.

use std::fmt;
use std::str::FromStr;

use phylopotts_core::PottsError;

/// The gap character.
pub const GAP: u8 = b'-';

/// Number of Potts states for protein models: gap + 20 amino acids.
pub const AMINO_ACID_STATES: usize = 21;

const AMINO_ACID_SYMBOLS: &[u8; AMINO_ACID_STATES] = b"-ACDEFGHIKLMNPQRSTVWY";
const NUCLEOTIDE_SYMBOLS: &[u8; 5] = b"-ACGT";

/// Alphabet used to map between integer codes and characters.
///
/// The choice is always explicit; nothing in the workspace guesses the
/// alphabet from the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SymbolAlphabet {
    /// `-ACDEFGHIKLMNPQRSTVWY` (21 symbols).
    #[default]
    AminoAcid,
    /// `-ACGT` (5 symbols).
    Nucleotide,
}

impl SymbolAlphabet {
    /// The ordered symbol table.
    pub fn symbols(self) -> &'static [u8] {
        match self {
            SymbolAlphabet::AminoAcid => AMINO_ACID_SYMBOLS,
            SymbolAlphabet::Nucleotide => NUCLEOTIDE_SYMBOLS,
        }
    }

    /// Number of symbols, gap included.
    pub fn size(self) -> usize {
        self.symbols().len()
    }

    /// Short name used on the command line and in messages.
    pub fn name(self) -> &'static str {
        match self {
            SymbolAlphabet::AminoAcid => "AA",
            SymbolAlphabet::Nucleotide => "DNA",
        }
    }

    /// Character for an integer code, or `None` when out of range.
    pub fn symbol(self, code: u8) -> Option<u8> {
        self.symbols().get(code as usize).copied()
    }

    /// Integer code for a character. Case-insensitive.
    pub fn code(self, symbol: u8) -> Option<u8> {
        let upper = symbol.to_ascii_uppercase();
        self.symbols()
            .iter()
            .position(|&s| s == upper)
            .map(|p| p as u8)
    }
}

impl fmt::Display for SymbolAlphabet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SymbolAlphabet {
    type Err = PottsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "aa" | "protein" | "amino-acid" => Ok(SymbolAlphabet::AminoAcid),
            "dna" | "nt" | "nucleotide" => Ok(SymbolAlphabet::Nucleotide),
            other => Err(PottsError::InvalidInput(format!(
                "unknown alphabet '{other}', expected 'AA' or 'DNA'"
            ))),
        }
    }
}
