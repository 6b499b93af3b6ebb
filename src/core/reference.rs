use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::parsing::fasta::read_scaffolds;
use crate::parsing::ParseError;

/// A single named sequence (contig) of the reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scaffold {
    pub name: String,
    pub sequence: Vec<u8>,
}

impl Scaffold {
    pub fn new(name: impl Into<String>, sequence: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            sequence: sequence.into(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }
}

/// The reference genome the reads were aligned against.
///
/// Scaffolds keep the order in which they appear in the FASTA file. That
/// order defines the concatenated (genome-wide) coordinate space: the
/// genome coordinate of a base is the summed length of all preceding
/// scaffolds plus its offset within its own scaffold.
#[derive(Debug, Clone)]
pub struct Reference {
    /// Source file, if loaded from disk
    pub path: Option<PathBuf>,

    scaffolds: Vec<Scaffold>,

    /// Index: scaffold name -> index in scaffolds vec
    name_to_index: HashMap<String, usize>,
}

impl Reference {
    /// Build a reference from in-memory scaffolds.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::InvalidFormat` if no scaffolds are given or
    /// `ParseError::DuplicateScaffold` if a name occurs twice.
    pub fn from_scaffolds(scaffolds: Vec<Scaffold>) -> Result<Self, ParseError> {
        if scaffolds.is_empty() {
            return Err(ParseError::InvalidFormat(
                "Reference contains no sequences".to_string(),
            ));
        }

        let mut name_to_index = HashMap::with_capacity(scaffolds.len());
        for (index, scaffold) in scaffolds.iter().enumerate() {
            if name_to_index.insert(scaffold.name.clone(), index).is_some() {
                return Err(ParseError::DuplicateScaffold(scaffold.name.clone()));
            }
        }

        Ok(Self {
            path: None,
            scaffolds,
            name_to_index,
        })
    }

    /// Load a reference from a (optionally gzip/bgzip compressed) FASTA file.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::Io` if the file cannot be read, `ParseError::Noodles`
    /// if a record is malformed, `ParseError::InvalidFormat` if the file has no
    /// records or `ParseError::DuplicateScaffold` for repeated names.
    pub fn load(path: &Path) -> Result<Self, ParseError> {
        let scaffolds = read_scaffolds(path)?;
        let mut reference = Self::from_scaffolds(scaffolds)?;
        reference.path = Some(path.to_path_buf());

        info!(
            path = %path.display(),
            scaffolds = reference.scaffolds.len(),
            bases = reference.length(),
            "Loaded reference"
        );

        Ok(reference)
    }

    /// Scaffolds in file order
    #[must_use]
    pub fn scaffolds(&self) -> &[Scaffold] {
        &self.scaffolds
    }

    /// Get a scaffold by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Scaffold> {
        self.name_to_index.get(name).map(|&idx| &self.scaffolds[idx])
    }

    /// `(name, length)` pairs in file order
    #[must_use]
    pub fn lengths(&self) -> Vec<(String, usize)> {
        self.scaffolds
            .iter()
            .map(|s| (s.name.clone(), s.len()))
            .collect()
    }

    /// Total number of bases over all scaffolds
    #[must_use]
    pub fn length(&self) -> usize {
        self.scaffolds.iter().map(Scaffold::len).sum()
    }

    /// Translate a zero-based genome-wide coordinate into a scaffold name
    /// and a 1-based coordinate within that scaffold.
    ///
    /// Returns `None` when the offset lies beyond the end of the genome.
    #[must_use]
    pub fn scaffold_coordinate(&self, genome_offset: usize) -> Option<(&str, usize)> {
        let mut offset = 0;
        for scaffold in &self.scaffolds {
            if genome_offset < offset + scaffold.len() {
                return Some((scaffold.name.as_str(), genome_offset + 1 - offset));
            }
            offset += scaffold.len();
        }

        None
    }

    /// Translate a 1-based scaffold coordinate into a zero-based genome-wide
    /// coordinate.
    #[must_use]
    pub fn genome_coordinate(&self, name: &str, coord: usize) -> Option<usize> {
        if coord == 0 {
            return None;
        }

        let mut offset = 0;
        for scaffold in &self.scaffolds {
            if scaffold.name == name {
                return (coord <= scaffold.len()).then(|| offset + coord - 1);
            }
            offset += scaffold.len();
        }

        None
    }

    /// Bases `start..start + length` (1-based `start`) of a scaffold.
    ///
    /// Returns `None` for unknown scaffolds or slices reaching past the end.
    #[must_use]
    pub fn sequence_slice(&self, name: &str, start: usize, length: usize) -> Option<&[u8]> {
        let scaffold = self.get(name)?;
        let begin = start.checked_sub(1)?;
        let end = begin.checked_add(length)?;
        scaffold.sequence.get(begin..end)
    }
}
