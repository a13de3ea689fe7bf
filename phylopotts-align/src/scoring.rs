//! Residue substitution scores.
//!
//! [`SubstitutionMatrix`] holds a square or rectangular score table keyed by
//! single-byte symbols. BLOSUM62 is built in; other tables can be read from
//! the whitespace-separated layout NCBI distributes. [`SubstitutionMatrix::lookup`]
//! tries `(a, b)`, then `(b, a)`, and scores a pair missing both ways as 0.

use std::path::Path;

use phylopotts_core::{PottsError, Result};

const NCBI_ORDER: &[u8; AA_DIM] = b"ARNDCQEGHILKMFPSTWYVBZX*";

/// Twenty amino acids, the ambiguity codes B, Z and X, and the stop `*`.
const AA_DIM: usize = 24;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SubstitutionMatrix {
    name: String,
    row_symbols: Vec<u8>,
    col_symbols: Vec<u8>,
    /// Row-major, `row_symbols.len() * col_symbols.len()` entries.
    table: Vec<i32>,
}

impl SubstitutionMatrix {
    /// The NCBI BLOSUM62 table.
    pub fn blosum62() -> Self {
        let mut table = vec![0; AA_DIM * AA_DIM];
        let mut k = 0;
        for i in 0..AA_DIM {
            for j in 0..=i {
                let score = i32::from(BLOSUM62_LOWER[k]);
                table[i * AA_DIM + j] = score;
                table[j * AA_DIM + i] = score;
                k += 1;
            }
        }
        SubstitutionMatrix {
            name: "BLOSUM62".to_owned(),
            row_symbols: NCBI_ORDER.to_vec(),
            col_symbols: NCBI_ORDER.to_vec(),
            table,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Score of row `a` against column `b`, ignoring case. `None` if either
    /// symbol is missing from its axis.
    pub fn get(&self, a: u8, b: u8) -> Option<i32> {
        let row = axis_index(&self.row_symbols, a)?;
        let col = axis_index(&self.col_symbols, b)?;
        self.table.get(row * self.col_symbols.len() + col).copied()
    }

    pub fn lookup(&self, a: u8, b: u8) -> i32 {
        match self.get(a, b) {
            Some(score) => score,
            None => self.get(b, a).unwrap_or(0),
        }
    }

    /// Read the NCBI text layout: optional `#` comments, a header naming
    /// the columns, then one line per row starting with the row symbol.
    pub fn parse_ncbi(name: impl Into<String>, text: &str) -> Result<Self> {
        let mut content = text.lines().enumerate().filter(|(_, line)| {
            let t = line.trim_start();
            !t.is_empty() && !t.starts_with('#')
        });

        let Some((_, header)) = content.next() else {
            return Err(PottsError::Parse("substitution matrix is empty".into()));
        };
        let col_symbols: Vec<u8> = header
            .split_whitespace()
            .map(symbol_byte)
            .collect::<Result<_>>()?;

        let mut row_symbols = Vec::new();
        let mut table = Vec::with_capacity(col_symbols.len() * col_symbols.len());
        for (idx, line) in content {
            let lineno = idx + 1;
            let mut fields = line.split_whitespace();
            // filtered lines are never blank
            let row = symbol_byte(fields.next().unwrap_or_default())?;
            let before = table.len();
            for field in fields {
                let score: i32 = field.parse().map_err(|_| {
                    PottsError::Parse(format!("line {lineno}: score '{field}' is not an integer"))
                })?;
                table.push(score);
            }
            let found = table.len() - before;
            if found != col_symbols.len() {
                return Err(PottsError::Parse(format!(
                    "line {lineno}: row '{}' has {found} scores for {} columns",
                    row as char,
                    col_symbols.len()
                )));
            }
            row_symbols.push(row);
        }
        if row_symbols.is_empty() {
            return Err(PottsError::Parse(
                "substitution matrix header is not followed by any rows".into(),
            ));
        }
        Ok(SubstitutionMatrix {
            name: name.into(),
            row_symbols,
            col_symbols,
            table,
        })
    }

    /// Load a matrix file, naming it after the file stem.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| PottsError::file(path, e))?;
        let stem = path
            .file_stem()
            .map_or_else(|| "custom".to_owned(), |s| s.to_string_lossy().into_owned());
        Self::parse_ncbi(stem, &text)
    }
}

fn axis_index(axis: &[u8], symbol: u8) -> Option<usize> {
    let symbol = symbol.to_ascii_uppercase();
    axis.iter().position(|&s| s == symbol)
}

fn symbol_byte(token: &str) -> Result<u8> {
    if let [b] = token.as_bytes() {
        Ok(b.to_ascii_uppercase())
    } else {
        Err(PottsError::Parse(format!(
            "matrix symbol '{token}' is not a single character"
        )))
    }
}

/// Lower triangle of BLOSUM62 (NCBI), row by row in [`NCBI_ORDER`]: row `i`
/// holds the scores against symbols `0..=i`.
#[rustfmt::skip]
const BLOSUM62_LOWER: [i8; AA_DIM * (AA_DIM + 1) / 2] = [
    /* A */  4,
    /* R */ -1,  5,
    /* N */ -2,  0,  6,
    /* D */ -2, -2,  1,  6,
    /* C */  0, -3, -3, -3,  9,
    /* Q */ -1,  1,  0,  0, -3,  5,
    /* E */ -1,  0,  0,  2, -4,  2,  5,
    /* G */  0, -2,  0, -1, -3, -2, -2,  6,
    /* H */ -2,  0,  1, -1, -3,  0,  0, -2,  8,
    /* I */ -1, -3, -3, -3, -1, -3, -3, -4, -3,  4,
    /* L */ -1, -2, -3, -4, -1, -2, -3, -4, -3,  2,  4,
    /* K */ -1,  2,  0, -1, -3,  1,  1, -2, -1, -3, -2,  5,
    /* M */ -1, -1, -2, -3, -1,  0, -2, -3, -2,  1,  2, -1,  5,
    /* F */ -2, -3, -3, -3, -2, -3, -3, -3, -1,  0,  0, -3,  0,  6,
    /* P */ -1, -2, -2, -1, -3, -1, -1, -2, -2, -3, -3, -1, -2, -4,  7,
    /* S */  1, -1,  1,  0, -1,  0,  0,  0, -1, -2, -2,  0, -1, -2, -1,  4,
    /* T */  0, -1,  0, -1, -1, -1, -1, -2, -2, -1, -1, -1, -1, -2, -1,  1,  5,
    /* W */ -3, -3, -4, -4, -2, -2, -3, -2, -2, -3, -2, -3, -1,  1, -4, -3, -2, 11,
    /* Y */ -2, -2, -2, -3, -2, -1, -2, -3,  2, -1, -1, -2, -1,  3, -3, -2, -2,  2,  7,
    /* V */  0, -3, -3, -3, -1, -2, -2, -3, -3,  3,  1, -2,  1, -1, -2, -2,  0, -3, -1,  4,
    /* B */ -2, -1,  3,  4, -3,  0,  1, -1,  0, -3, -4,  0, -3, -3, -2,  0, -1, -4, -3, -3,  4,
    /* Z */ -1,  0,  0,  1, -3,  3,  4, -2,  0, -3, -3,  1, -1, -3, -1,  0, -1, -3, -2, -2,  1,  4,
    /* X */  0, -1, -1, -1, -2, -1, -1, -1, -1, -1, -1, -1, -1, -1, -2,  0,  0, -2, -1, -1, -1, -1, -1,
    /* * */ -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4,  1,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_diagonal_matches_ncbi() {
        let m = SubstitutionMatrix::blosum62();
        assert_eq!(m.get(b'A', b'A'), Some(4));
        assert_eq!(m.get(b'W', b'W'), Some(11));
        assert_eq!(m.get(b'C', b'C'), Some(9));
        assert_eq!(m.get(b'*', b'*'), Some(1));
        assert_eq!(m.get(b'a', b'a'), Some(4));
    }

    #[test]
    fn builtin_off_diagonal_matches_ncbi() {
        let m = SubstitutionMatrix::blosum62();
        assert_eq!(m.get(b'M', b'K'), Some(-1));
        assert_eq!(m.get(b'G', b'K'), Some(-2));
        assert_eq!(m.get(b'Y', b'V'), Some(-1));
        assert_eq!(m.get(b'W', b'C'), Some(-2));
    }

    #[test]
    fn builtin_table_is_symmetric() {
        let m = SubstitutionMatrix::blosum62();
        for &a in NCBI_ORDER {
            for &b in NCBI_ORDER {
                assert_eq!(m.get(a, b), m.get(b, a), "{} {}", a as char, b as char);
            }
        }
    }

    #[test]
    fn absent_pair_scores_zero() {
        let m = SubstitutionMatrix::blosum62();
        assert_eq!(m.get(b'-', b'A'), None);
        assert_eq!(m.lookup(b'-', b'A'), 0);
        assert_eq!(m.lookup(b'J', b'J'), 0);
    }

    #[test]
    fn parse_ncbi_layout() {
        let text = "# toy matrix\n   A  C\nA  2 -1\nC -3  5\n";
        let m = SubstitutionMatrix::parse_ncbi("toy", text).unwrap();
        assert_eq!(m.name(), "toy");
        assert_eq!(m.get(b'A', b'C'), Some(-1));
        assert_eq!(m.get(b'C', b'A'), Some(-3));
        assert_eq!(m.lookup(b'C', b'C'), 5);
    }

    #[test]
    fn lookup_falls_back_to_transposed_pair() {
        // Row G exists only for column A; (A, G) is found through (G, A).
        let text = "   A\nA  1\nG  7\n";
        let m = SubstitutionMatrix::parse_ncbi("partial", text).unwrap();
        assert_eq!(m.get(b'A', b'G'), None);
        assert_eq!(m.lookup(b'A', b'G'), 7);
    }

    #[test]
    fn parse_ncbi_errors() {
        assert!(SubstitutionMatrix::parse_ncbi("x", "").is_err());
        assert!(SubstitutionMatrix::parse_ncbi("x", "   A  C\nA  1\n").is_err());
        assert!(SubstitutionMatrix::parse_ncbi("x", "   A\nA  q\n").is_err());
        assert!(SubstitutionMatrix::parse_ncbi("x", "   AB\nA  1\n").is_err());
    }
}
