//! bmDCA-style parameter files.
//!
//! One record per line, tokens separated by ASCII whitespace:
//!
//! ```text
//! J i j a b value    coupling between site i in state a and site j in state b
//! h i a value        field of site i in state a
//! ```
//!
//! Lines starting with any other token are skipped. When `L` is inferred,
//! couplings that reach past the last field site are dropped and counted.
//! Records are written into
//! zeroed tensors one cell at a time, so a later duplicate replaces an
//! earlier one. Couplings are then symmetrized pair by pair: whichever half
//! of `(i, j)` / `(j, i)` the file populated is mirrored onto the other, and
//! the `i < j` half wins when both were given.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use phylopotts_core::{PottsError, Result, Summarizable};

use crate::tensor::{block_offset, CouplingTensor, FieldTensor, STATES};

/// Counts gathered while loading a parameter file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParameterStats {
    /// Model length `L`.
    pub length: usize,
    pub field_records: usize,
    pub coupling_records: usize,
    /// Non-blank lines that were neither `h` nor `J` records.
    pub ignored_lines: usize,
    /// `J` records dropped because a site lay beyond an inferred `L`.
    pub dropped_couplings: usize,
}

impl Summarizable for ParameterStats {
    fn summary(&self) -> String {
        format!(
            "L={} with {} field and {} coupling records ({} lines ignored, {} couplings dropped)",
            self.length,
            self.field_records,
            self.coupling_records,
            self.ignored_lines,
            self.dropped_couplings
        )
    }
}

/// Field and coupling tensors together with load statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSet {
    pub field: FieldTensor,
    pub coupling: CouplingTensor,
    pub stats: ParameterStats,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Record {
    Field {
        site: usize,
        state: usize,
        value: f64,
    },
    Coupling {
        i: usize,
        j: usize,
        a: usize,
        b: usize,
        value: f64,
    },
}

/// A parsed record and the 1-based line it came from.
type Located = (usize, Record);

/// Load fields and couplings from `path`.
///
/// With `length = Some(L)` every site index must be below `L`. With `None`,
/// `L` is one more than the largest field site index in the file, and `J`
/// records touching a site at or past `L` are skipped (see
/// [`ParameterStats::dropped_couplings`]).
///
/// # Errors
///
/// - [`PottsError::File`] if the file cannot be opened or read.
/// - [`PottsError::Parse`] for a wrong token count, a non-numeric token or
///   a non-finite value, naming the file and line.
/// - [`PottsError::Shape`] for a state index of 21 or more, a site index
///   outside a caller-supplied length, a self coupling `J i i ...`, or an
///   inferred length with no field records to infer it from.
pub fn load_parameters(
    path: impl AsRef<Path>,
    length: Option<usize>,
) -> Result<(FieldTensor, CouplingTensor)> {
    let set = load_parameter_set(path, length)?;
    Ok((set.field, set.coupling))
}

/// Like [`load_parameters`], also returning [`ParameterStats`].
pub fn load_parameter_set(path: impl AsRef<Path>, length: Option<usize>) -> Result<ParameterSet> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| PottsError::file(path, e))?;
    let reader = BufReader::new(file);

    let set = match length {
        Some(length) => {
            let mut builder = Builder::new(length, false);
            for (idx, text) in reader.lines().enumerate() {
                let text = text.map_err(|e| PottsError::file(path, e))?;
                match parse_line(path, idx + 1, &text)? {
                    Some(record) => builder.insert(path, (idx + 1, record))?,
                    None => builder.note_skipped(&text),
                }
            }
            builder.finish()?
        }
        None => {
            let mut records: Vec<Located> = Vec::new();
            let mut skipped = 0;
            let mut max_site: Option<usize> = None;
            for (idx, text) in reader.lines().enumerate() {
                let text = text.map_err(|e| PottsError::file(path, e))?;
                match parse_line(path, idx + 1, &text)? {
                    Some(record) => {
                        if let Record::Field { site, .. } = record {
                            max_site = Some(max_site.map_or(site, |m| m.max(site)));
                        }
                        records.push((idx + 1, record));
                    }
                    None if !text.trim().is_empty() => skipped += 1,
                    None => {}
                }
            }
            let length = max_site.map(|m| m + 1).ok_or_else(|| {
                PottsError::Shape(format!(
                    "{}: no field records, cannot infer the model length",
                    path.display()
                ))
            })?;
            let mut builder = Builder::new(length, true);
            builder.ignored = skipped;
            for record in records {
                builder.insert(path, record)?;
            }
            builder.finish()?
        }
    };

    if set.stats.dropped_couplings > 0 {
        tracing::warn!(
            path = %path.display(),
            dropped = set.stats.dropped_couplings,
            length = set.stats.length,
            "skipped coupling records beyond the inferred model length"
        );
    }
    tracing::debug!(path = %path.display(), "{}", set.stats.summary());
    Ok(set)
}

fn parse_line(path: &Path, line: usize, text: &str) -> Result<Option<Record>> {
    let tokens: Vec<&str> = text.split_ascii_whitespace().collect();
    let expected = match tokens.first() {
        Some(&"h") => 4,
        Some(&"J") => 6,
        _ => return Ok(None),
    };
    let err = |msg: String| PottsError::Parse(format!("{}:{line}: {msg}", path.display()));
    if tokens.len() != expected {
        return Err(err(format!(
            "'{}' record needs {expected} tokens, found {}",
            tokens[0],
            tokens.len()
        )));
    }
    let index = |tok: &str| {
        tok.parse::<usize>()
            .map_err(|_| err(format!("'{tok}' is not a valid index")))
    };
    let value_tok = tokens[expected - 1];
    let value: f64 = value_tok
        .parse()
        .map_err(|_| err(format!("'{value_tok}' is not a number")))?;
    if !value.is_finite() {
        return Err(err(format!("value '{value_tok}' is not finite")));
    }

    let record = if tokens[0] == "h" {
        Record::Field {
            site: index(tokens[1])?,
            state: index(tokens[2])?,
            value,
        }
    } else {
        Record::Coupling {
            i: index(tokens[1])?,
            j: index(tokens[2])?,
            a: index(tokens[3])?,
            b: index(tokens[4])?,
            value,
        }
    };
    Ok(Some(record))
}

/// Zeroed buffers plus bookkeeping for which coupling blocks the file set.
struct Builder {
    length: usize,
    /// Skip couplings past `length` instead of failing.
    inferred: bool,
    field: Vec<f64>,
    coupling: Vec<f64>,
    populated: Vec<bool>,
    n_field: usize,
    n_coupling: usize,
    ignored: usize,
    dropped: usize,
}

impl Builder {
    fn new(length: usize, inferred: bool) -> Self {
        Self {
            length,
            inferred,
            field: vec![0.0; length * STATES],
            coupling: vec![0.0; length * length * STATES * STATES],
            populated: vec![false; length * length],
            n_field: 0,
            n_coupling: 0,
            ignored: 0,
            dropped: 0,
        }
    }

    fn note_skipped(&mut self, text: &str) {
        if !text.trim().is_empty() {
            self.ignored += 1;
        }
    }

    fn insert(&mut self, path: &Path, (line, record): Located) -> Result<()> {
        let length = self.length;
        let shape_err =
            |msg: String| PottsError::Shape(format!("{}:{line}: {msg}", path.display()));
        let check_site = |site: usize| {
            if site >= length {
                Err(shape_err(format!(
                    "site index {site} out of range for model length {length}"
                )))
            } else {
                Ok(())
            }
        };
        let check_state = |state: usize| {
            if state >= STATES {
                Err(shape_err(format!(
                    "state index {state} out of range ({STATES} states)"
                )))
            } else {
                Ok(())
            }
        };

        match record {
            Record::Field { site, state, value } => {
                check_site(site)?;
                check_state(state)?;
                self.field[site * STATES + state] = value;
                self.n_field += 1;
            }
            Record::Coupling { i, j, a, b, value } => {
                check_state(a)?;
                check_state(b)?;
                if self.inferred && (i >= length || j >= length) {
                    self.dropped += 1;
                    return Ok(());
                }
                check_site(i)?;
                check_site(j)?;
                if i == j {
                    return Err(shape_err(format!("self coupling J {i} {i} is not allowed")));
                }
                self.coupling[block_offset(length, i, j) + a * STATES + b] = value;
                self.populated[i * length + j] = true;
                self.n_coupling += 1;
            }
        }
        Ok(())
    }

    fn finish(mut self) -> Result<ParameterSet> {
        let l = self.length;
        for i in 0..l {
            for j in i + 1..l {
                if self.populated[i * l + j] {
                    mirror_block(&mut self.coupling, l, i, j);
                } else if self.populated[j * l + i] {
                    mirror_block(&mut self.coupling, l, j, i);
                }
            }
        }
        Ok(ParameterSet {
            field: FieldTensor::from_values(l, self.field)?,
            coupling: CouplingTensor::from_symmetric(l, self.coupling),
            stats: ParameterStats {
                length: l,
                field_records: self.n_field,
                coupling_records: self.n_coupling,
                ignored_lines: self.ignored,
                dropped_couplings: self.dropped,
            },
        })
    }
}

/// Overwrite block `(j, i)` with the transpose of block `(i, j)`.
fn mirror_block(values: &mut [f64], length: usize, i: usize, j: usize) {
    let src = block_offset(length, i, j);
    let dst = block_offset(length, j, i);
    for a in 0..STATES {
        for b in 0..STATES {
            values[dst + b * STATES + a] = values[src + a * STATES + b];
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Write;

    fn coupling_line() -> impl Strategy<Value = String> {
        (0usize..4, 0usize..4, 0usize..STATES, 0usize..STATES, -5.0f64..5.0)
            .prop_filter("distinct sites", |(i, j, ..)| i != j)
            .prop_map(|(i, j, a, b, v)| format!("J {i} {j} {a} {b} {v}"))
    }

    proptest! {
        #[test]
        fn couplings_are_always_symmetric(lines in proptest::collection::vec(coupling_line(), 0..30)) {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            writeln!(file, "h 3 0 0.0").unwrap();
            for line in &lines {
                writeln!(file, "{line}").unwrap();
            }
            file.flush().unwrap();
            let (_, j) = load_parameters(file.path(), None).unwrap();
            for i in 0..4 {
                for k in 0..4 {
                    for a in 0..STATES {
                        for b in 0..STATES {
                            prop_assert_eq!(j.get(i, k, a, b).to_bits(), j.get(k, i, b, a).to_bits());
                        }
                    }
                }
            }
        }
    }
}
