//! NumPy `.npy` codec for 2-D integer arrays.
//!
//! Layout: the magic `\x93NUMPY`, a major and minor version byte, a
//! little-endian header length (`u16` for 1.x, `u32` for 2.x and 3.x), an
//! ASCII Python dict literal describing `descr`, `fortran_order` and `shape`,
//! then the raw array data.
//!
//! Arrays are always written as version 1.0, C order, dtype `|u1`. Reading
//! accepts any fixed-width integer dtype in either byte order and either
//! memory order; values are widened to `i64` so that out-of-range codes can
//! be reported by the caller instead of silently wrapping.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use phylopotts_core::{PottsError, Result, Summarizable};
use phylopotts_seq::CodeMatrix;

/// NPY magic bytes.
const NPY_MAGIC: &[u8; 6] = b"\x93NUMPY";

/// Data starts on a multiple of this many bytes.
const HEADER_ALIGN: usize = 64;

/// A 2-D integer array in row-major order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NpyArray {
    pub n_rows: usize,
    pub n_cols: usize,
    /// Row-major values, widened to `i64`.
    pub values: Vec<i64>,
}

impl NpyArray {
    /// Narrow to a [`CodeMatrix`].
    ///
    /// # Errors
    ///
    /// Returns [`PottsError::Integrity`] for the first value outside `0..=255`.
    pub fn into_code_matrix(self) -> Result<CodeMatrix> {
        let n_cols = self.n_cols.max(1);
        let codes = self
            .values
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                u8::try_from(v).map_err(|_| {
                    PottsError::Integrity(format!(
                        "value {v} at row {}, column {} is not a valid symbol code",
                        i / n_cols,
                        i % n_cols
                    ))
                })
            })
            .collect::<Result<Vec<u8>>>()?;
        CodeMatrix::new(self.n_rows, self.n_cols, codes)
    }
}

impl Summarizable for NpyArray {
    fn summary(&self) -> String {
        format!("NpyArray: {} x {}", self.n_rows, self.n_cols)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ByteOrder {
    Little,
    Big,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct IntDtype {
    signed: bool,
    width: usize,
    order: ByteOrder,
}

impl IntDtype {
    fn parse(descr: &str) -> Result<Self> {
        let bytes = descr.as_bytes();
        if bytes.len() < 3 {
            return Err(unsupported_dtype(descr));
        }
        let order = match bytes[0] {
            b'<' | b'|' | b'=' => ByteOrder::Little,
            b'>' => ByteOrder::Big,
            _ => return Err(unsupported_dtype(descr)),
        };
        let signed = match bytes[1] {
            b'i' => true,
            b'u' => false,
            _ => return Err(unsupported_dtype(descr)),
        };
        let width: usize = descr[2..].parse().map_err(|_| unsupported_dtype(descr))?;
        if !matches!(width, 1 | 2 | 4 | 8) {
            return Err(unsupported_dtype(descr));
        }
        Ok(Self {
            signed,
            width,
            order,
        })
    }

    fn decode(&self, chunk: &[u8]) -> Result<i64> {
        let mut buf = [0u8; 8];
        match self.order {
            ByteOrder::Little => buf[..self.width].copy_from_slice(chunk),
            ByteOrder::Big => {
                for (dst, src) in buf[..self.width].iter_mut().zip(chunk.iter().rev()) {
                    *dst = *src;
                }
            }
        }
        // Sign-extend from the top bit of the stored width.
        if self.signed && self.width < 8 && buf[self.width - 1] & 0x80 != 0 {
            for b in &mut buf[self.width..] {
                *b = 0xff;
            }
        }
        if self.signed {
            Ok(i64::from_le_bytes(buf))
        } else {
            let v = u64::from_le_bytes(buf);
            i64::try_from(v).map_err(|_| {
                PottsError::Integrity(format!("value {v} does not fit a symbol code"))
            })
        }
    }
}

fn unsupported_dtype(descr: &str) -> PottsError {
    PottsError::Parse(format!("NPY: unsupported dtype '{descr}'"))
}

#[derive(Debug, PartialEq, Eq)]
struct Header {
    dtype: IntDtype,
    fortran_order: bool,
    shape: Vec<usize>,
}

/// Value text following `'key':` in the header dict.
fn dict_value<'a>(header: &'a str, key: &str) -> Result<&'a str> {
    let needle = format!("'{key}'");
    let start = header
        .find(&needle)
        .or_else(|| header.find(&format!("\"{key}\"")))
        .ok_or_else(|| PottsError::Parse(format!("NPY: header has no '{key}' entry")))?;
    let rest = &header[start + needle.len()..];
    let rest = rest
        .trim_start()
        .strip_prefix(':')
        .ok_or_else(|| PottsError::Parse(format!("NPY: malformed '{key}' entry")))?;
    Ok(rest.trim_start())
}

fn parse_header(text: &str) -> Result<Header> {
    let descr = dict_value(text, "descr")?;
    let quote = descr
        .chars()
        .next()
        .filter(|c| *c == '\'' || *c == '"')
        .ok_or_else(|| PottsError::Parse("NPY: 'descr' is not a string".into()))?;
    let descr = descr[1..]
        .split(quote)
        .next()
        .ok_or_else(|| PottsError::Parse("NPY: unterminated 'descr'".into()))?;
    let dtype = IntDtype::parse(descr)?;

    let fortran = dict_value(text, "fortran_order")?;
    let fortran_order = if fortran.starts_with("True") {
        true
    } else if fortran.starts_with("False") {
        false
    } else {
        return Err(PottsError::Parse("NPY: 'fortran_order' is not a bool".into()));
    };

    let shape_text = dict_value(text, "shape")?;
    let inner = shape_text
        .strip_prefix('(')
        .and_then(|s| s.split(')').next())
        .ok_or_else(|| PottsError::Parse("NPY: 'shape' is not a tuple".into()))?;
    let shape = inner
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.trim_end_matches('L')
                .parse::<usize>()
                .map_err(|_| PottsError::Parse(format!("NPY: bad shape dimension '{s}'")))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Header {
        dtype,
        fortran_order,
        shape,
    })
}

/// Parse a complete `.npy` image held in memory.
pub fn parse_npy(data: &[u8]) -> Result<NpyArray> {
    if data.len() < 10 || &data[..6] != NPY_MAGIC {
        return Err(PottsError::Parse("NPY: missing magic bytes".into()));
    }
    let major = data[6];
    let (header_len, header_start) = match major {
        1 => (u16::from_le_bytes([data[8], data[9]]) as usize, 10),
        2 | 3 => {
            if data.len() < 12 {
                return Err(PottsError::Parse("NPY: truncated preamble".into()));
            }
            (
                u32::from_le_bytes([data[8], data[9], data[10], data[11]]) as usize,
                12,
            )
        }
        v => {
            return Err(PottsError::Parse(format!("NPY: unsupported version {v}.x")));
        }
    };
    let data_start = header_start + header_len;
    if data_start > data.len() {
        return Err(PottsError::Parse("NPY: header exceeds file size".into()));
    }
    let text = std::str::from_utf8(&data[header_start..data_start])
        .map_err(|_| PottsError::Parse("NPY: header is not valid text".into()))?;
    let header = parse_header(text)?;

    let (n_rows, n_cols) = match header.shape[..] {
        [r, c] => (r, c),
        _ => {
            return Err(PottsError::Shape(format!(
                "NPY: expected a 2-D array, found shape {:?}",
                header.shape
            )));
        }
    };
    let width = header.dtype.width;
    let expected = n_rows
        .checked_mul(n_cols)
        .and_then(|cells| cells.checked_mul(width))
        .ok_or_else(|| {
            PottsError::Parse(format!(
                "NPY: shape ({n_rows}, {n_cols}) of {width}-byte values overflows"
            ))
        })?;
    let body = &data[data_start..];
    if body.len() < expected {
        return Err(PottsError::Parse(format!(
            "NPY: expected {expected} data bytes, found {}",
            body.len()
        )));
    }

    let flat = body[..expected]
        .chunks_exact(width)
        .map(|chunk| header.dtype.decode(chunk))
        .collect::<Result<Vec<i64>>>()?;
    let values = if header.fortran_order {
        let mut row_major = vec![0i64; flat.len()];
        for c in 0..n_cols {
            for r in 0..n_rows {
                row_major[r * n_cols + c] = flat[c * n_rows + r];
            }
        }
        row_major
    } else {
        flat
    };

    Ok(NpyArray {
        n_rows,
        n_cols,
        values,
    })
}

/// Read a 2-D integer `.npy` file.
pub fn read_npy(path: impl AsRef<Path>) -> Result<NpyArray> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|e| PottsError::file(path, e))?;
    let array = parse_npy(&data).map_err(|e| match e {
        PottsError::Parse(msg) => PottsError::Parse(format!("{}: {msg}", path.display())),
        other => other,
    })?;
    tracing::debug!(path = %path.display(), rows = array.n_rows, cols = array.n_cols, "read NPY");
    Ok(array)
}

/// Encode a code matrix as a version 1.0 `|u1` C-order `.npy` image.
pub fn encode_npy(codes: &CodeMatrix) -> Vec<u8> {
    let mut dict = format!(
        "{{'descr': '|u1', 'fortran_order': False, 'shape': ({}, {}), }}",
        codes.n_rows(),
        codes.n_cols()
    );
    // Preamble is 10 bytes; the header ends with a newline.
    let unpadded = 10 + dict.len() + 1;
    let padding = (HEADER_ALIGN - unpadded % HEADER_ALIGN) % HEADER_ALIGN;
    dict.push_str(&" ".repeat(padding));
    dict.push('\n');

    let mut out = Vec::with_capacity(10 + dict.len() + codes.as_slice().len());
    out.extend_from_slice(NPY_MAGIC);
    out.extend_from_slice(&[1, 0]);
    out.extend_from_slice(&(dict.len() as u16).to_le_bytes());
    out.extend_from_slice(dict.as_bytes());
    out.extend_from_slice(codes.as_slice());
    out
}

/// Write a code matrix to `path` as `.npy`.
pub fn write_npy(path: impl AsRef<Path>, codes: &CodeMatrix) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| PottsError::file(path, e))?;
    let mut w = BufWriter::new(file);
    w.write_all(&encode_npy(codes))
        .and_then(|_| w.flush())
        .map_err(|e| PottsError::file(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_header(major: u8, dict: &str, body: &[u8]) -> Vec<u8> {
        let mut out = NPY_MAGIC.to_vec();
        out.extend_from_slice(&[major, 0]);
        if major == 1 {
            out.extend_from_slice(&(dict.len() as u16).to_le_bytes());
        } else {
            out.extend_from_slice(&(dict.len() as u32).to_le_bytes());
        }
        out.extend_from_slice(dict.as_bytes());
        out.extend_from_slice(body);
        out
    }

    #[test]
    fn header_is_padded_to_64() {
        let codes = CodeMatrix::from_rows(vec![vec![0, 1, 2], vec![3, 4, 5]]).unwrap();
        let bytes = encode_npy(&codes);
        let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
        assert_eq!((10 + header_len) % 64, 0);
        assert_eq!(bytes[10 + header_len - 1], b'\n');
        assert_eq!(&bytes[10 + header_len..], &[0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("msa.npy");
        let codes = CodeMatrix::from_rows(vec![vec![11, 6, 0], vec![11, 9, 9]]).unwrap();
        write_npy(&path, &codes).unwrap();
        let back = read_npy(&path).unwrap().into_code_matrix().unwrap();
        assert_eq!(back, codes);
    }

    #[test]
    fn reads_little_endian_int64() {
        let dict = "{'descr': '<i8', 'fortran_order': False, 'shape': (2, 2), }\n";
        let body: Vec<u8> = [1i64, 2, 3, 20].iter().flat_map(|v| v.to_le_bytes()).collect();
        let array = parse_npy(&with_header(1, dict, &body)).unwrap();
        assert_eq!(array.n_rows, 2);
        assert_eq!(array.values, vec![1, 2, 3, 20]);
    }

    #[test]
    fn reads_big_endian_int16() {
        let dict = "{'descr': '>i2', 'fortran_order': False, 'shape': (1, 3), }\n";
        let body: Vec<u8> = [5i16, -1, 300].iter().flat_map(|v| v.to_be_bytes()).collect();
        let array = parse_npy(&with_header(1, dict, &body)).unwrap();
        assert_eq!(array.values, vec![5, -1, 300]);
    }

    #[test]
    fn reads_fortran_order() {
        // Column-major storage of [[1, 2, 3], [4, 5, 6]].
        let dict = "{'descr': '|u1', 'fortran_order': True, 'shape': (2, 3), }\n";
        let array = parse_npy(&with_header(1, dict, &[1, 4, 2, 5, 3, 6])).unwrap();
        assert_eq!(array.values, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn reads_version_two() {
        let dict = "{'descr': '<u4', 'fortran_order': False, 'shape': (1, 2), }\n";
        let body: Vec<u8> = [7u32, 8].iter().flat_map(|v| v.to_le_bytes()).collect();
        let array = parse_npy(&with_header(2, dict, &body)).unwrap();
        assert_eq!(array.values, vec![7, 8]);
    }

    #[test]
    fn negative_values_fail_narrowing() {
        let dict = "{'descr': '<i4', 'fortran_order': False, 'shape': (1, 2), }\n";
        let body: Vec<u8> = [0i32, -3].iter().flat_map(|v| v.to_le_bytes()).collect();
        let array = parse_npy(&with_header(1, dict, &body)).unwrap();
        let err = array.into_code_matrix().unwrap_err();
        assert!(matches!(err, PottsError::Integrity(_)));
        assert!(err.to_string().contains("-3"));
    }

    #[test]
    fn rejects_one_dimensional() {
        let dict = "{'descr': '|u1', 'fortran_order': False, 'shape': (3,), }\n";
        let err = parse_npy(&with_header(1, dict, &[0, 1, 2])).unwrap_err();
        assert!(matches!(err, PottsError::Shape(_)));
    }

    #[test]
    fn rejects_float_dtype() {
        let dict = "{'descr': '<f8', 'fortran_order': False, 'shape': (1, 1), }\n";
        let err = parse_npy(&with_header(1, dict, &[0; 8])).unwrap_err();
        assert!(matches!(err, PottsError::Parse(_)));
    }

    #[test]
    fn rejects_truncated_body() {
        let dict = "{'descr': '|u1', 'fortran_order': False, 'shape': (2, 2), }\n";
        assert!(parse_npy(&with_header(1, dict, &[0, 1, 2])).is_err());
    }

    #[test]
    fn rejects_overflowing_shape() {
        let huge = usize::MAX / 2 + 1;
        let dict = format!("{{'descr': '<i8', 'fortran_order': True, 'shape': ({huge}, 4), }}\n");
        let err = parse_npy(&with_header(1, &dict, &[0; 16])).unwrap_err();
        assert!(matches!(err, PottsError::Parse(_)));
        assert!(err.to_string().contains("overflows"));
    }

    #[test]
    fn rejects_bad_magic() {
        assert!(parse_npy(b"NOTNUMPY\x01\x00").is_err());
    }

    #[test]
    fn missing_file_names_path() {
        let err = read_npy("/nonexistent/msa.npy").unwrap_err();
        assert!(matches!(err, PottsError::File { .. }));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn encoded_matrices_decode_unchanged(
            (rows, cols, codes) in (1usize..20, 1usize..40).prop_flat_map(|(r, c)| {
                (Just(r), Just(c), proptest::collection::vec(0u8..21, r * c))
            })
        ) {
            let matrix = CodeMatrix::new(rows, cols, codes).unwrap();
            let bytes = encode_npy(&matrix);
            let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
            prop_assert_eq!((10 + header_len) % 64, 0);
            let back = parse_npy(&bytes).unwrap().into_code_matrix().unwrap();
            prop_assert_eq!(back, matrix);
        }
    }
}
