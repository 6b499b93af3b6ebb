//! Reference FASTA reader using noodles.
//!
//! Reads every record with its full sequence. Compression is detected from
//! the gzip magic bytes rather than the file extension, so `.fa`, `.fa.gz`,
//! `.fna.bgz` and misnamed files all load the same way. bgzip files are
//! multi-member gzip streams and are decoded with `MultiGzDecoder`.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use noodles::fasta;
use tracing::debug;

use crate::core::reference::Scaffold;
use crate::parsing::ParseError;

/// First two bytes of every gzip member
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Check if a buffered stream starts with the gzip magic bytes
fn is_gzip_stream<R: BufRead>(reader: &mut R) -> std::io::Result<bool> {
    let buf = reader.fill_buf()?;
    Ok(buf.starts_with(&GZIP_MAGIC))
}

/// Read all scaffolds from a FASTA file.
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read, `ParseError::Noodles` if
/// parsing fails, or `ParseError::InvalidFormat` if no records are found.
pub fn read_scaffolds(path: &Path) -> Result<Vec<Scaffold>, ParseError> {
    let mut reader = BufReader::new(File::open(path)?);

    if is_gzip_stream(&mut reader)? {
        debug!(path = %path.display(), "Reading gzip compressed FASTA");
        let decoder = BufReader::new(MultiGzDecoder::new(reader));
        read_scaffolds_from(&mut fasta::io::Reader::new(decoder))
    } else {
        read_scaffolds_from(&mut fasta::io::Reader::new(reader))
    }
}

/// Read all scaffolds from a noodles FASTA reader
fn read_scaffolds_from<R: BufRead>(
    reader: &mut fasta::io::Reader<R>,
) -> Result<Vec<Scaffold>, ParseError> {
    let mut scaffolds = Vec::new();

    for result in reader.records() {
        let record = result
            .map_err(|e| ParseError::Noodles(format!("Failed to parse FASTA record: {e}")))?;

        let name = String::from_utf8_lossy(record.name()).to_string();
        let sequence: &[u8] = record.sequence().as_ref();

        debug!(scaffold = %name, length = sequence.len(), "Read scaffold");
        scaffolds.push(Scaffold::new(name, sequence.to_vec()));
    }

    if scaffolds.is_empty() {
        return Err(ParseError::InvalidFormat(
            "No sequences found in FASTA file".to_string(),
        ));
    }

    Ok(scaffolds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_scaffolds() {
        let fasta_content = b">chr1 description\nACGTACGT\nACGT\n>chr2\nGGGG\n";

        let mut temp = NamedTempFile::with_suffix(".fa").unwrap();
        temp.write_all(fasta_content).unwrap();
        temp.flush().unwrap();

        let scaffolds = read_scaffolds(temp.path()).unwrap();
        assert_eq!(scaffolds.len(), 2);
        assert_eq!(scaffolds[0].name, "chr1");
        assert_eq!(scaffolds[0].sequence, b"ACGTACGTACGT".to_vec());
        assert_eq!(scaffolds[1].name, "chr2");
        assert_eq!(scaffolds[1].len(), 4);
    }

    #[test]
    fn test_read_gzipped_scaffolds_regardless_of_extension() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b">contig_1\nACGTN\n").unwrap();
        let compressed = encoder.finish().unwrap();

        // Misnamed on purpose: detection is by content
        let mut temp = NamedTempFile::with_suffix(".fa").unwrap();
        temp.write_all(&compressed).unwrap();
        temp.flush().unwrap();

        let scaffolds = read_scaffolds(temp.path()).unwrap();
        assert_eq!(scaffolds.len(), 1);
        assert_eq!(scaffolds[0].name, "contig_1");
        assert_eq!(scaffolds[0].sequence, b"ACGTN".to_vec());
    }

    #[test]
    fn test_read_multi_member_gzip() {
        // bgzip output is a concatenation of gzip members
        let mut compressed = Vec::new();
        for chunk in [&b">a\nAC\n"[..], &b">b\nGT\n"[..]] {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(chunk).unwrap();
            compressed.extend(encoder.finish().unwrap());
        }

        let mut temp = NamedTempFile::with_suffix(".fa.bgz").unwrap();
        temp.write_all(&compressed).unwrap();
        temp.flush().unwrap();

        let scaffolds = read_scaffolds(temp.path()).unwrap();
        assert_eq!(scaffolds.len(), 2);
        assert_eq!(scaffolds[1].name, "b");
    }

    #[test]
    fn test_read_empty_fasta() {
        let mut temp = NamedTempFile::with_suffix(".fa").unwrap();
        temp.write_all(b"").unwrap();
        temp.flush().unwrap();

        let result = read_scaffolds(temp.path());
        assert!(matches!(result, Err(ParseError::InvalidFormat(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = read_scaffolds(Path::new("/nonexistent/reference.fa"));
        assert!(matches!(result, Err(ParseError::Io(_))));
    }
}
