//! K-mer inverted index over a reference sequence set.
//!
//! Two complementary compressed-sparse-row structures are built in one
//! two-pass initialization and are immutable afterwards:
//!
//! - forward: k-mer value to the distinct sequence ids containing it;
//! - reverse: sequence id to the k-mer at every window position, sentinels
//!   included, so window offsets stay recoverable.
//!
//! After `initialize` the database is read-only and safe to share across
//! search threads without locking.

pub mod kmers;

pub use kmers::{Kmer, Kmers, AMBIGUOUS_KMER};

use std::marker::PhantomData;

use crate::alphabet::Alphabet;
use crate::error::Error;
use crate::sequence::Sequence;

/// Dense 0-based index into the reference collection, stable for the
/// lifetime of a `Database`.
pub type SequenceId = u32;

/// Index build stage reported through the progress callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStage {
    StatsCollection,
    Indexing,
}

pub type ProgressCallback = Box<dyn Fn(ProgressStage, usize, usize) + Send + Sync>;

/// How often (in sequences) the progress callback fires during a build
/// pass, plus once at completion.
const PROGRESS_INTERVAL: usize = 512;

pub struct Database<A: Alphabet> {
    sequences: Vec<Sequence>,
    kmer_length: usize,
    max_unique_kmers: usize,
    progress: Option<ProgressCallback>,

    // forward index: per k-mer bucket of distinct sequence ids
    sequence_ids: Vec<SequenceId>,
    id_offset_by_kmer: Vec<usize>,
    id_count_by_kmer: Vec<usize>,

    // reverse index: per sequence, one k-mer per window position
    kmers: Vec<Kmer>,
    kmer_offset_by_id: Vec<usize>,
    kmer_count_by_id: Vec<usize>,

    _alphabet: PhantomData<A>,
}

impl<A: Alphabet> Database<A> {
    /// `kmer_length` residues must fit a k-mer word.
    pub fn new(kmer_length: usize) -> Result<Self, Error> {
        if kmer_length == 0 {
            return Err(Error::KmerLengthZero);
        }
        let max = Kmer::BITS as usize / A::BITS_PER_RESIDUE;
        if kmer_length > max {
            return Err(Error::KmerLengthTooLarge {
                length: kmer_length,
                max,
            });
        }
        Ok(Self {
            sequences: Vec::new(),
            kmer_length,
            max_unique_kmers: 1 << (A::BITS_PER_RESIDUE * kmer_length),
            progress: None,
            sequence_ids: Vec::new(),
            id_offset_by_kmer: Vec::new(),
            id_count_by_kmer: Vec::new(),
            kmers: Vec::new(),
            kmer_offset_by_id: Vec::new(),
            kmer_count_by_id: Vec::new(),
            _alphabet: PhantomData,
        })
    }

    /// Observational progress reporting; defaults to none.
    pub fn set_progress_callback(&mut self, callback: ProgressCallback) {
        self.progress = Some(callback);
    }

    fn report(&self, stage: ProgressStage, seq_id: usize, total: usize) {
        if seq_id % PROGRESS_INTERVAL == 0 || seq_id + 1 == total {
            if let Some(progress) = &self.progress {
                progress(stage, seq_id + 1, total);
            }
        }
    }

    /// Two-pass build. Pass 1 counts windows and distinct
    /// (k-mer, sequence) pairs to size the CSR arrays exactly; pass 2
    /// re-enumerates and fills them. Ambiguous windows are stored in the
    /// per-sequence array (positions stay aligned) but never enter a
    /// forward bucket.
    pub fn initialize(&mut self, sequences: Vec<Sequence>) {
        self.sequences = sequences;
        let num_sequences = self.sequences.len();

        let mut total_entries = 0usize;
        let mut total_unique_entries = 0usize;
        let mut unique_count = vec![0usize; self.max_unique_kmers];
        // last sequence id seen per k-mer, for the distinct-pair dedup
        let mut unique_index = vec![SequenceId::MAX; self.max_unique_kmers];

        for (seq_id, sequence) in self.sequences.iter().enumerate() {
            for kmer in Kmers::<A>::new(sequence, self.kmer_length) {
                total_entries += 1;
                if kmer == AMBIGUOUS_KMER || unique_index[kmer as usize] == seq_id as SequenceId {
                    continue;
                }
                unique_index[kmer as usize] = seq_id as SequenceId;
                unique_count[kmer as usize] += 1;
                total_unique_entries += 1;
            }
            self.report(ProgressStage::StatsCollection, seq_id, num_sequences);
        }

        // Prefix sum over per-k-mer distinct counts.
        self.id_offset_by_kmer = vec![0; self.max_unique_kmers];
        for kmer in 1..self.max_unique_kmers {
            self.id_offset_by_kmer[kmer] =
                self.id_offset_by_kmer[kmer - 1] + unique_count[kmer - 1];
        }

        self.sequence_ids = vec![0; total_unique_entries];
        self.id_count_by_kmer = vec![0; self.max_unique_kmers];
        self.kmers = vec![0; total_entries];
        self.kmer_offset_by_id = vec![0; num_sequences];
        self.kmer_count_by_id = vec![0; num_sequences];
        unique_index.fill(SequenceId::MAX);

        let mut kmer_count = 0usize;
        for (seq_id, sequence) in self.sequences.iter().enumerate() {
            self.kmer_offset_by_id[seq_id] = kmer_count;

            for kmer in Kmers::<A>::new(sequence, self.kmer_length) {
                // every window is recorded, so the position is implicit
                self.kmers[kmer_count] = kmer;
                kmer_count += 1;

                if kmer == AMBIGUOUS_KMER || unique_index[kmer as usize] == seq_id as SequenceId {
                    continue;
                }
                unique_index[kmer as usize] = seq_id as SequenceId;
                let slot =
                    self.id_offset_by_kmer[kmer as usize] + self.id_count_by_kmer[kmer as usize];
                self.sequence_ids[slot] = seq_id as SequenceId;
                self.id_count_by_kmer[kmer as usize] += 1;
            }

            self.kmer_count_by_id[seq_id] = kmer_count - self.kmer_offset_by_id[seq_id];
            self.report(ProgressStage::Indexing, seq_id, num_sequences);
        }
    }

    pub fn num_sequences(&self) -> usize {
        self.sequences.len()
    }

    pub fn kmer_length(&self) -> usize {
        self.kmer_length
    }

    pub fn max_unique_kmers(&self) -> usize {
        self.max_unique_kmers
    }

    pub fn sequence(&self, seq_id: SequenceId) -> Option<&Sequence> {
        self.sequences.get(seq_id as usize)
    }

    /// The k-mer at every window position of a sequence, sentinels
    /// included. `None` for an unknown id.
    pub fn kmers_for(&self, seq_id: SequenceId) -> Option<&[Kmer]> {
        let id = seq_id as usize;
        if id >= self.sequences.len() {
            return None;
        }
        let offset = self.kmer_offset_by_id[id];
        Some(&self.kmers[offset..offset + self.kmer_count_by_id[id]])
    }

    /// The distinct sequence ids whose sequence contains the k-mer.
    /// `None` for the ambiguity sentinel or an out-of-range value.
    pub fn sequence_ids_for(&self, kmer: Kmer) -> Option<&[SequenceId]> {
        if kmer == AMBIGUOUS_KMER || kmer as usize >= self.max_unique_kmers {
            return None;
        }
        let offset = self.id_offset_by_kmer[kmer as usize];
        Some(&self.sequence_ids[offset..offset + self.id_count_by_kmer[kmer as usize]])
    }
}
