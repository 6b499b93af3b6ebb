use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use noodles::bam;
use noodles::sam;
use noodles::sam::alignment::record::data::field::Tag;
use noodles::sam::alignment::record_buf::data::field::Value;
use noodles::sam::alignment::RecordBuf;
use tracing::debug;

use crate::alignment::read::{AlignedRead, MISSING_MAPPING_QUALITY};
use crate::alignment::source::{AlignmentSource, ReadResult, SourceError};

fn nm_tag() -> Tag {
    Tag::from([b'N', b'M'])
}

fn xa_tag() -> Tag {
    Tag::from([b'X', b'A'])
}

/// A coordinate-sorted BAM file.
///
/// Every pass reopens the file, so the source can be read any number of
/// times without an index.
#[derive(Debug)]
pub struct BamSource {
    path: PathBuf,
    scaffold_names: Vec<String>,
}

impl BamSource {
    /// Open a BAM file and read its header.
    ///
    /// # Errors
    ///
    /// Returns `SourceError::Io` if the file cannot be read or
    /// `SourceError::Noodles` if the header is malformed.
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let mut reader = File::open(path).map(bam::io::Reader::new)?;

        let header = reader
            .read_header()
            .map_err(|e| SourceError::Noodles(e.to_string()))?;

        let scaffold_names = scaffold_names(&header);
        debug!(
            path = %path.display(),
            scaffolds = scaffold_names.len(),
            "Opened BAM file"
        );

        Ok(Self {
            path: path.to_path_buf(),
            scaffold_names,
        })
    }
}

impl AlignmentSource for BamSource {
    fn scaffold_names(&self) -> &[String] {
        &self.scaffold_names
    }

    fn reads(&mut self) -> Result<Box<dyn Iterator<Item = ReadResult> + '_>, SourceError> {
        let mut reader = File::open(&self.path).map(bam::io::Reader::new)?;

        let header = reader
            .read_header()
            .map_err(|e| SourceError::Noodles(e.to_string()))?;

        Ok(Box::new(BamReads {
            reader,
            scaffold_names: scaffold_names(&header),
            header,
            record: RecordBuf::default(),
            done: false,
        }))
    }
}

/// Reference sequence names from a SAM header, in header order
fn scaffold_names(header: &sam::Header) -> Vec<String> {
    header
        .reference_sequences()
        .keys()
        .map(ToString::to_string)
        .collect()
}

/// One pass over the records of a BAM file
struct BamReads<R> {
    reader: bam::io::Reader<R>,
    header: sam::Header,
    scaffold_names: Vec<String>,
    record: RecordBuf,
    done: bool,
}

impl<R: Read> Iterator for BamReads<R> {
    type Item = ReadResult;

    fn next(&mut self) -> Option<ReadResult> {
        if self.done {
            return None;
        }

        match self.reader.read_record_buf(&self.header, &mut self.record) {
            Ok(0) => {
                self.done = true;
                None
            }
            Ok(_) => Some(Ok(to_aligned_read(&self.record, &self.scaffold_names))),
            Err(e) => {
                self.done = true;
                Some(Err(SourceError::Io(e)))
            }
        }
    }
}

/// Integer value of an optional tag
fn int_value(value: &Value) -> Option<i64> {
    match value {
        Value::Int8(n) => Some(i64::from(*n)),
        Value::UInt8(n) => Some(i64::from(*n)),
        Value::Int16(n) => Some(i64::from(*n)),
        Value::UInt16(n) => Some(i64::from(*n)),
        Value::Int32(n) => Some(i64::from(*n)),
        Value::UInt32(n) => Some(i64::from(*n)),
        _ => None,
    }
}

/// Convert a noodles record into an [`AlignedRead`]
fn to_aligned_read(record: &RecordBuf, scaffold_names: &[String]) -> AlignedRead {
    let scaffold = record
        .reference_sequence_id()
        .and_then(|id| scaffold_names.get(id))
        .cloned();

    let mismatches = record
        .data()
        .get(&nm_tag())
        .and_then(int_value)
        .and_then(|n| u32::try_from(n).ok());

    let alternative_hits = match record.data().get(&xa_tag()) {
        Some(Value::String(hits)) => Some(hits.to_string()),
        _ => None,
    };

    AlignedRead {
        name: record.name().map(|name| name.to_vec()).unwrap_or_default(),
        scaffold,
        flags: record.flags(),
        mapping_quality: record
            .mapping_quality()
            .map_or(MISSING_MAPPING_QUALITY, u8::from),
        // noodles positions are 1-based
        alignment_start: record
            .alignment_start()
            .map_or(0, |pos| usize::from(pos) - 1),
        cigar: record.cigar().as_ref().to_vec(),
        sequence: record.sequence().as_ref().to_vec(),
        quality_scores: record.quality_scores().as_ref().to_vec(),
        template_length: record.template_length(),
        mismatches,
        alternative_hits,
    }
}
