//! Dense Potts parameter tensors.
//!
//! Both tensors are flat row-major `Vec<f64>` buffers: the field over
//! `(L, q)` and the coupling over `(L, L, q, q)` with `q = 21`. Values are
//! fixed once constructed.

use phylopotts_core::{PottsError, Result, Summarizable};
use phylopotts_seq::AMINO_ACID_STATES;

/// Number of Potts states per site.
pub const STATES: usize = AMINO_ACID_STATES;

const BLOCK: usize = STATES * STATES;

/// Single-site fields `h_i(a)`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldTensor {
    length: usize,
    values: Vec<f64>,
}

impl FieldTensor {
    /// All-zero field for `length` sites.
    pub fn zeros(length: usize) -> Self {
        Self {
            length,
            values: vec![0.0; length * STATES],
        }
    }

    /// Wrap a row-major `(length, 21)` buffer.
    pub fn from_values(length: usize, values: Vec<f64>) -> Result<Self> {
        if values.len() != length * STATES {
            return Err(PottsError::Shape(format!(
                "field buffer has {} values, expected {length} x {STATES}",
                values.len()
            )));
        }
        Ok(Self { length, values })
    }

    /// Number of sites `L`.
    pub fn length(&self) -> usize {
        self.length
    }

    pub fn get(&self, site: usize, state: usize) -> f64 {
        self.values[site * STATES + state]
    }

    /// The 21 field values of one site.
    pub fn site(&self, site: usize) -> &[f64] {
        &self.values[site * STATES..(site + 1) * STATES]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }
}

impl Summarizable for FieldTensor {
    fn summary(&self) -> String {
        format!("FieldTensor: {} sites x {STATES} states", self.length)
    }
}

/// Pairwise couplings `J_ij(a, b)`.
///
/// Always satisfies `J_ij(a, b) == J_ji(b, a)`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CouplingTensor {
    length: usize,
    values: Vec<f64>,
}

impl CouplingTensor {
    pub fn zeros(length: usize) -> Self {
        Self {
            length,
            values: vec![0.0; length * length * BLOCK],
        }
    }

    /// Wrap a row-major `(length, length, 21, 21)` buffer.
    ///
    /// # Errors
    ///
    /// - [`PottsError::Shape`] if the buffer size does not match `length`.
    /// - [`PottsError::InvalidInput`] if any `J_ij(a, b) != J_ji(b, a)`.
    pub fn from_values(length: usize, values: Vec<f64>) -> Result<Self> {
        if values.len() != length * length * BLOCK {
            return Err(PottsError::Shape(format!(
                "coupling buffer has {} values, expected {length} x {length} x {STATES} x {STATES}",
                values.len()
            )));
        }
        let tensor = Self { length, values };
        for i in 0..length {
            for j in i + 1..length {
                for a in 0..STATES {
                    for b in 0..STATES {
                        if tensor.get(i, j, a, b).to_bits() != tensor.get(j, i, b, a).to_bits() {
                            return Err(PottsError::InvalidInput(format!(
                                "coupling J[{i},{j},{a},{b}] differs from J[{j},{i},{b},{a}]"
                            )));
                        }
                    }
                }
            }
        }
        Ok(tensor)
    }

    /// Build from a raw buffer whose mirrored halves are already consistent.
    pub(crate) fn from_symmetric(length: usize, values: Vec<f64>) -> Self {
        debug_assert_eq!(values.len(), length * length * BLOCK);
        Self { length, values }
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn get(&self, i: usize, j: usize, a: usize, b: usize) -> f64 {
        self.values[block_offset(self.length, i, j) + a * STATES + b]
    }

    /// The 21 x 21 block for the site pair `(i, j)`, row-major over `(a, b)`.
    pub fn block(&self, i: usize, j: usize) -> &[f64] {
        let start = block_offset(self.length, i, j);
        &self.values[start..start + BLOCK]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }
}

impl Summarizable for CouplingTensor {
    fn summary(&self) -> String {
        format!(
            "CouplingTensor: {} x {} site pairs x {STATES} x {STATES} states",
            self.length, self.length
        )
    }
}

/// Start of the `(i, j)` block in a flat `(L, L, q, q)` buffer.
pub(crate) fn block_offset(length: usize, i: usize, j: usize) -> usize {
    (i * length + j) * BLOCK
}

/// Potts energy `E(s) = -sum_i h_i(s_i) - sum_{i<j} J_ij(s_i, s_j)`.
pub fn energy(field: &FieldTensor, coupling: &CouplingTensor, seq: &[u8]) -> f64 {
    let mut e = 0.0;
    for (i, &a) in seq.iter().enumerate() {
        e -= field.get(i, a as usize);
        for (j, &b) in seq.iter().enumerate().skip(i + 1) {
            e -= coupling.get(i, j, a as usize, b as usize);
        }
    }
    e
}

/// Energy change when `seq[site]` is replaced by `new_state`.
pub fn delta_energy(
    field: &FieldTensor,
    coupling: &CouplingTensor,
    seq: &[u8],
    site: usize,
    new_state: usize,
) -> f64 {
    let old_state = seq[site] as usize;
    let mut delta = field.get(site, old_state) - field.get(site, new_state);
    for (j, &b) in seq.iter().enumerate() {
        if j != site {
            let block = coupling.block(site, j);
            delta += block[old_state * STATES + b as usize] - block[new_state * STATES + b as usize];
        }
    }
    delta
}
