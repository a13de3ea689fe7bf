//! FASTA reading and writing.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use needletail::parse_fastx_file;
use phylopotts_core::{PottsError, Result};

/// A single FASTA record: identifier and raw sequence bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FastaRecord {
    /// First whitespace-delimited token of the header line.
    pub id: String,
    /// Sequence bytes with line breaks removed.
    pub seq: Vec<u8>,
}

impl FastaRecord {
    pub fn new(id: impl Into<String>, seq: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            seq: seq.into(),
        }
    }
}

/// Read every record of a FASTA file, in file order.
///
/// The record id is the first whitespace-delimited token of the header, so
/// `>homo sapiens` yields the id `homo`.
pub fn read_fasta(path: impl AsRef<Path>) -> Result<Vec<FastaRecord>> {
    let path = path.as_ref();
    std::fs::metadata(path).map_err(|e| PottsError::file(path, e))?;
    let mut reader = parse_fastx_file(path)
        .map_err(|e| PottsError::Parse(format!("{}: {e}", path.display())))?;

    let mut records = Vec::new();
    while let Some(record) = reader.next() {
        let record =
            record.map_err(|e| PottsError::Parse(format!("{}: {e}", path.display())))?;
        let header = String::from_utf8_lossy(record.id());
        let id = header.split_whitespace().next().unwrap_or_default().to_string();
        records.push(FastaRecord {
            id,
            seq: record.seq().into_owned(),
        });
    }
    tracing::debug!(path = %path.display(), records = records.len(), "read FASTA");
    Ok(records)
}

/// Write records as single-line FASTA.
pub fn write_fasta<'a, W, I>(writer: &mut W, records: I) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a FastaRecord>,
{
    records.into_iter().try_for_each(|record| -> Result<()> {
        writeln!(writer, ">{}", record.id)?;
        writer.write_all(&record.seq)?;
        writeln!(writer)?;
        Ok(())
    })
}

/// Write records to a file, creating or truncating it.
pub fn write_fasta_file(path: impl AsRef<Path>, records: &[FastaRecord]) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| PottsError::file(path, e))?;
    let mut writer = BufWriter::new(file);
    write_fasta(&mut writer, records)?;
    writer.flush().map_err(|e| PottsError::file(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn reads_records_in_order() {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(b">homo sapiens\nMG-\n>fish\nMK\nK\n").unwrap();

        let records = read_fasta(tmp.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], FastaRecord::new("homo", "MG-"));
        assert_eq!(records[1], FastaRecord::new("fish", "MKK"));
    }

    #[test]
    fn missing_file_names_path() {
        let err = read_fasta("/nonexistent/ref.fasta").unwrap_err();
        assert!(matches!(err, PottsError::File { .. }));
        assert!(err.to_string().contains("/nonexistent/ref.fasta"));
    }

    #[test]
    fn empty_file_is_an_error() {
        let tmp = NamedTempFile::new().unwrap();
        assert!(read_fasta(tmp.path()).is_err());
    }

    #[test]
    fn write_then_read() {
        let records = vec![
            FastaRecord::new("seq_0", "ACD-"),
            FastaRecord::new("seq_1", "W-YA"),
        ];
        let tmp = NamedTempFile::new().unwrap();
        write_fasta_file(tmp.path(), &records).unwrap();
        let text = std::fs::read_to_string(tmp.path()).unwrap();
        assert_eq!(text, ">seq_0\nACD-\n>seq_1\nW-YA\n");
        assert_eq!(read_fasta(tmp.path()).unwrap(), records);
    }
}
