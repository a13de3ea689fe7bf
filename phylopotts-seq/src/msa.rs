//! Alignment containers.
//!
//! [`Msa`] holds named character rows of equal width, [`CodeMatrix`] holds a
//! dense row-major matrix of integer symbol codes. Neither is mutated by the
//! statistics or conversion code that consumes them.

use std::path::Path;

use phylopotts_core::{PottsError, Result, Summarizable};

use crate::fasta::{read_fasta, FastaRecord};

/// A multiple sequence alignment: named rows of identical width.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Msa {
    records: Vec<FastaRecord>,
    width: usize,
}

impl Msa {
    /// Build an alignment, checking that every row has the same width.
    ///
    /// # Errors
    ///
    /// Returns [`PottsError::Shape`] for an empty record list or ragged rows.
    pub fn new(records: Vec<FastaRecord>) -> Result<Self> {
        let width = match records.first() {
            Some(r) => r.seq.len(),
            None => return Err(PottsError::Shape("alignment has no sequences".into())),
        };
        if let Some(bad) = records.iter().find(|r| r.seq.len() != width) {
            return Err(PottsError::Shape(format!(
                "sequence '{}' has length {}, expected {}",
                bad.id,
                bad.seq.len(),
                width
            )));
        }
        Ok(Self { records, width })
    }

    /// Read and validate an aligned FASTA file.
    pub fn from_fasta(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(read_fasta(path)?)
    }

    pub fn n_sequences(&self) -> usize {
        self.records.len()
    }

    /// Number of alignment columns.
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn records(&self) -> &[FastaRecord] {
        &self.records
    }

    /// Sequence identifiers in alignment order.
    pub fn ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.records.iter().map(|r| r.id.as_str())
    }

    /// Bytes of one alignment column, top to bottom.
    pub fn column(&self, col: usize) -> impl Iterator<Item = u8> + '_ {
        self.records.iter().map(move |r| r.seq[col])
    }
}

impl Summarizable for Msa {
    fn summary(&self) -> String {
        format!("Msa: {} sequences x {} columns", self.n_sequences(), self.width)
    }
}

/// A dense N x L matrix of integer symbol codes, stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CodeMatrix {
    n_rows: usize,
    n_cols: usize,
    codes: Vec<u8>,
}

impl CodeMatrix {
    /// Wrap a flat row-major buffer.
    pub fn new(n_rows: usize, n_cols: usize, codes: Vec<u8>) -> Result<Self> {
        if codes.len() != n_rows * n_cols {
            return Err(PottsError::Shape(format!(
                "code buffer has {} cells, expected {} x {} = {}",
                codes.len(),
                n_rows,
                n_cols,
                n_rows * n_cols
            )));
        }
        Ok(Self {
            n_rows,
            n_cols,
            codes,
        })
    }

    /// Build from owned rows, rejecting ragged input.
    pub fn from_rows(rows: Vec<Vec<u8>>) -> Result<Self> {
        let n_rows = rows.len();
        let n_cols = rows.first().map_or(0, Vec::len);
        let mut codes = Vec::with_capacity(n_rows * n_cols);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != n_cols {
                return Err(PottsError::Shape(format!(
                    "row {i} has {} columns, expected {n_cols}",
                    row.len()
                )));
            }
            codes.extend_from_slice(&row);
        }
        Ok(Self {
            n_rows,
            n_cols,
            codes,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// Code at `(row, col)`.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of range.
    pub fn get(&self, row: usize, col: usize) -> u8 {
        assert!(row < self.n_rows && col < self.n_cols, "index out of range");
        self.codes[row * self.n_cols + col]
    }

    pub fn row(&self, row: usize) -> &[u8] {
        &self.codes[row * self.n_cols..(row + 1) * self.n_cols]
    }

    /// Iterate over rows in order.
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> + '_ {
        (0..self.n_rows).map(move |r| self.row(r))
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.codes
    }

    /// Largest code present, `None` for an empty matrix.
    pub fn max_code(&self) -> Option<u8> {
        self.codes.iter().copied().max()
    }
}

impl Summarizable for CodeMatrix {
    fn summary(&self) -> String {
        format!("CodeMatrix: {} rows x {} columns", self.n_rows, self.n_cols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example() -> Msa {
        Msa::new(vec![
            FastaRecord::new("homo", "MG-"),
            FastaRecord::new("fish", "MKK"),
            FastaRecord::new("mouse", "MGK"),
        ])
        .unwrap()
    }

    #[test]
    fn msa_dimensions() {
        let msa = example();
        assert_eq!(msa.n_sequences(), 3);
        assert_eq!(msa.width(), 3);
        assert_eq!(msa.ids().collect::<Vec<_>>(), vec!["homo", "fish", "mouse"]);
        assert_eq!(msa.column(2).collect::<Vec<_>>(), b"-KK".to_vec());
        assert_eq!(msa.summary(), "Msa: 3 sequences x 3 columns");
    }

    #[test]
    fn msa_rejects_ragged_rows() {
        let err = Msa::new(vec![
            FastaRecord::new("a", "ACD"),
            FastaRecord::new("b", "AC"),
        ])
        .unwrap_err();
        assert!(matches!(err, PottsError::Shape(_)));
        assert!(err.to_string().contains("'b'"));
    }

    #[test]
    fn msa_rejects_empty() {
        assert!(Msa::new(Vec::new()).is_err());
    }

    #[test]
    fn code_matrix_rows() {
        let m = CodeMatrix::from_rows(vec![vec![0, 1, 2], vec![3, 4, 5]]).unwrap();
        assert_eq!(m.n_rows(), 2);
        assert_eq!(m.n_cols(), 3);
        assert_eq!(m.get(1, 2), 5);
        assert_eq!(m.row(0), &[0, 1, 2]);
        assert_eq!(m.rows().count(), 2);
        assert_eq!(m.max_code(), Some(5));
    }

    #[test]
    fn code_matrix_rejects_bad_shapes() {
        assert!(CodeMatrix::new(2, 2, vec![0; 3]).is_err());
        assert!(CodeMatrix::from_rows(vec![vec![0, 1], vec![2]]).is_err());
    }
}
