//! Pileup construction from a coordinate-sorted stream of reads.
//!
//! A pileup column lists every read overlapping one reference position,
//! together with what that read shows there: an aligned base (and whether an
//! insertion follows it) or a deletion.
//!
//! Reads are buffered per reference position until the input has moved past
//! that position; sorted input guarantees no later read can still start
//! there. Columns are emitted in increasing position order within a scaffold
//! and scaffolds in the order they appear in the input.
//!
//! Like the default read filter of common pileup engines, unmapped,
//! secondary, QC-failed and duplicate records are skipped. Reference skips
//! (`N` operations) produce no entries. Each column holds at most
//! `max_depth` entries; reads beyond that are dropped from the column.
//!
//! Overlapping mates of a pair are counted once: when both mates of a
//! template reach the same column, only the one with the higher base quality
//! there is kept (the first one on a tie).

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Arc;

use noodles::sam::alignment::record::cigar::op::Kind;

use crate::alignment::read::AlignedRead;
use crate::alignment::source::{ReadResult, SourceError};

/// Default maximum number of reads per pileup column
pub const DEFAULT_MAX_DEPTH: usize = 8000;

/// One read at one reference position
#[derive(Debug, Clone)]
pub struct PileupEntry {
    pub read: Arc<AlignedRead>,

    /// Query position of the aligned base, `None` within a deletion
    pub query_position: Option<usize>,

    /// Query position of the aligned base, or of the next aligned base
    /// within a deletion
    pub query_position_or_next: usize,

    pub is_deletion: bool,

    /// An insertion follows the aligned base at this position
    pub insertion_follows: bool,
}

impl PileupEntry {
    /// The aligned base, `None` within a deletion
    #[must_use]
    pub fn base(&self) -> Option<u8> {
        self.query_position
            .and_then(|pos| self.read.sequence.get(pos).copied())
    }
}

/// All reads overlapping a single reference position
#[derive(Debug, Clone)]
pub struct PileupColumn {
    pub scaffold: Arc<str>,

    /// Zero-based reference position
    pub position: usize,

    pub entries: Vec<PileupEntry>,
}

/// A column still collecting reads
#[derive(Debug, Default)]
struct PendingColumn {
    entries: Vec<PileupEntry>,

    /// Template name -> entry index, for paired reads only
    mates: HashMap<Vec<u8>, usize>,
}

impl PendingColumn {
    fn push(&mut self, entry: PileupEntry, max_depth: usize) {
        if !entry.read.is_paired() {
            if self.entries.len() < max_depth {
                self.entries.push(entry);
            }
            return;
        }

        if let Some(&index) = self.mates.get(&entry.read.name) {
            let kept = &self.entries[index];
            if entry_quality(&entry) > entry_quality(kept) {
                self.entries[index] = entry;
            }
            return;
        }

        if self.entries.len() < max_depth {
            self.mates.insert(entry.read.name.clone(), self.entries.len());
            self.entries.push(entry);
        }
    }
}

fn entry_quality(entry: &PileupEntry) -> u8 {
    entry.read.base_quality(entry.query_position_or_next)
}

/// Iterator adapter turning sorted reads into pileup columns.
pub struct Pileup<I> {
    reads: I,
    max_depth: usize,
    current: Option<Arc<str>>,
    last_start: usize,
    finished_scaffolds: HashSet<Arc<str>>,
    pending: BTreeMap<usize, PendingColumn>,
    ready: VecDeque<PileupColumn>,
    done: bool,
}

impl<I> Pileup<I>
where
    I: Iterator<Item = ReadResult>,
{
    pub fn new(reads: I, max_depth: usize) -> Self {
        Self {
            reads,
            max_depth,
            current: None,
            last_start: 0,
            finished_scaffolds: HashSet::new(),
            pending: BTreeMap::new(),
            ready: VecDeque::new(),
            done: false,
        }
    }

    /// Records skipped by the pileup read filter
    fn is_filtered(read: &AlignedRead) -> bool {
        read.is_unmapped()
            || read.flags.is_secondary()
            || read.flags.is_qc_fail()
            || read.flags.is_duplicate()
    }

    /// Move every pending column before `position` to the ready queue
    fn flush_before(&mut self, position: usize) {
        let rest = self.pending.split_off(&position);
        let complete = std::mem::replace(&mut self.pending, rest);
        self.queue(complete);
    }

    fn flush_all(&mut self) {
        let complete = std::mem::take(&mut self.pending);
        self.queue(complete);
    }

    fn queue(&mut self, columns: BTreeMap<usize, PendingColumn>) {
        let Some(scaffold) = &self.current else {
            return;
        };

        for (position, column) in columns {
            self.ready.push_back(PileupColumn {
                scaffold: Arc::clone(scaffold),
                position,
                entries: column.entries,
            });
        }
    }

    /// Switch to a new scaffold or check sort order within the current one.
    fn advance_to(&mut self, scaffold: &str, start: usize) -> Result<(), SourceError> {
        let same = self.current.as_deref() == Some(scaffold);

        if same {
            if start < self.last_start {
                return Err(SourceError::Unsorted {
                    scaffold: scaffold.to_string(),
                    position: start,
                    previous: format!("{scaffold}:{}", self.last_start),
                });
            }
            self.flush_before(start);
        } else {
            if self.finished_scaffolds.contains(scaffold) {
                return Err(SourceError::Unsorted {
                    scaffold: scaffold.to_string(),
                    position: start,
                    previous: self.current.as_deref().unwrap_or_default().to_string(),
                });
            }

            self.flush_all();
            if let Some(previous) = self.current.take() {
                self.finished_scaffolds.insert(previous);
            }
            self.current = Some(Arc::from(scaffold));
        }

        self.last_start = start;
        Ok(())
    }

    fn push(&mut self, position: usize, entry: PileupEntry) {
        self.pending
            .entry(position)
            .or_default()
            .push(entry, self.max_depth);
    }

    /// Walk the CIGAR of a read and add an entry to every column it covers.
    fn add(&mut self, read: AlignedRead) {
        let read = Arc::new(read);
        let mut ref_pos = read.alignment_start;
        let mut query_pos = 0;

        for (i, op) in read.cigar.iter().enumerate() {
            let len = op.len();

            match op.kind() {
                Kind::Match | Kind::SequenceMatch | Kind::SequenceMismatch => {
                    let insertion_next = read
                        .cigar
                        .get(i + 1)
                        .is_some_and(|next| next.kind() == Kind::Insertion);

                    for k in 0..len {
                        self.push(
                            ref_pos + k,
                            PileupEntry {
                                read: Arc::clone(&read),
                                query_position: Some(query_pos + k),
                                query_position_or_next: query_pos + k,
                                is_deletion: false,
                                insertion_follows: insertion_next && k + 1 == len,
                            },
                        );
                    }

                    ref_pos += len;
                    query_pos += len;
                }
                Kind::Insertion | Kind::SoftClip => query_pos += len,
                Kind::Deletion => {
                    for k in 0..len {
                        self.push(
                            ref_pos + k,
                            PileupEntry {
                                read: Arc::clone(&read),
                                query_position: None,
                                query_position_or_next: query_pos,
                                is_deletion: true,
                                insertion_follows: false,
                            },
                        );
                    }

                    ref_pos += len;
                }
                Kind::Skip => ref_pos += len,
                Kind::HardClip | Kind::Pad => {}
            }
        }
    }
}

impl<I> Iterator for Pileup<I>
where
    I: Iterator<Item = ReadResult>,
{
    type Item = Result<PileupColumn, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(column) = self.ready.pop_front() {
                return Some(Ok(column));
            }

            if self.done {
                return None;
            }

            match self.reads.next() {
                None => {
                    self.done = true;
                    self.flush_all();
                }
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                Some(Ok(read)) => {
                    if Self::is_filtered(&read) {
                        continue;
                    }

                    let Some(scaffold) = read.scaffold.clone() else {
                        continue;
                    };

                    if let Err(e) = self.advance_to(&scaffold, read.alignment_start) {
                        self.done = true;
                        return Some(Err(e));
                    }

                    self.add(read);
                }
            }
        }
    }
}
