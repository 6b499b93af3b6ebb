use thiserror::Error;

use crate::alignment::read::AlignedRead;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("noodles error: {0}")]
    Noodles(String),

    #[error("Alignments are not coordinate sorted: {scaffold}:{position} follows {previous}")]
    Unsorted {
        scaffold: String,
        position: usize,
        previous: String,
    },
}

/// Result of reading one alignment record
pub type ReadResult = Result<AlignedRead, SourceError>;

/// A coordinate-sorted collection of alignments that can be read more than once.
///
/// The variant caller makes two passes over a sample (abundance estimation
/// and pileup processing); each call to [`AlignmentSource::reads`] starts a
/// fresh pass from the first record.
pub trait AlignmentSource {
    /// Names of the reference sequences the alignments refer to
    fn scaffold_names(&self) -> &[String];

    /// Start a new pass over all records.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying input cannot be (re)opened.
    fn reads(&mut self) -> Result<Box<dyn Iterator<Item = ReadResult> + '_>, SourceError>;
}

/// Alignments held in memory, mostly useful for tests and small inputs.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    scaffold_names: Vec<String>,
    reads: Vec<AlignedRead>,
}

impl InMemorySource {
    /// Create a source from reads that are already coordinate sorted.
    pub fn new(scaffold_names: Vec<String>, reads: Vec<AlignedRead>) -> Self {
        Self {
            scaffold_names,
            reads,
        }
    }

    /// Create a source from reads in any order; they are sorted by scaffold
    /// (in `scaffold_names` order) and then by alignment start.
    pub fn sorted(scaffold_names: Vec<String>, mut reads: Vec<AlignedRead>) -> Self {
        reads.sort_by_key(|read| {
            let rank = read
                .scaffold
                .as_ref()
                .and_then(|s| scaffold_names.iter().position(|n| n == s))
                .unwrap_or(usize::MAX);
            (rank, read.alignment_start)
        });
        Self::new(scaffold_names, reads)
    }
}

impl AlignmentSource for InMemorySource {
    fn scaffold_names(&self) -> &[String] {
        &self.scaffold_names
    }

    fn reads(&mut self) -> Result<Box<dyn Iterator<Item = ReadResult> + '_>, SourceError> {
        Ok(Box::new(self.reads.iter().cloned().map(Ok)))
    }
}
