//! Seed, extend and chain: the per-query search pipeline.
//!
//! For one query against the whole database: count shared k-mers per
//! candidate and rank candidates, then per candidate find maximal exact
//! diagonal runs, extend them into HSPs with X-drop extension, chain
//! compatible HSPs greedily, stitch the chain into one end-to-end
//! alignment with banded fills, and accept or reject on identity.

use std::sync::Arc;

use rustc_hash::FxHashSet;

use super::highscore::Highscore;
use super::hsp::Hsp;
use super::{Hit, SearchParams};
use crate::align::{
    AlignmentDirection, BandedAlign, BandedAlignParams, Cigar, CigarOp, ExtendAlign,
    ExtendAlignParams,
};
use crate::alphabet::{Alphabet, Strand};
use crate::error::Error;
use crate::index::{Database, Kmer, Kmers, SequenceId, AMBIGUOUS_KMER};
use crate::sequence::Sequence;

/// Per-candidate k-mer hit counter.
type Counter = u16;

/// Tuning knobs for HSP discovery and chaining.
#[derive(Debug, Clone, Copy)]
pub struct SearchTuning {
    pub extend: ExtendAlignParams,
    pub banded: BandedAlignParams,
    /// HSPs shorter than `min(min_hsp_length, query_len / 2)` are dropped.
    pub min_hsp_length: usize,
    /// Chain HSPs whose corner distance is within this bound.
    pub max_join_distance: usize,
}

impl Default for SearchTuning {
    fn default() -> Self {
        Self {
            extend: ExtendAlignParams::default(),
            banded: BandedAlignParams::default(),
            min_hsp_length: 16,
            max_join_distance: 16,
        }
    }
}

/// An exact diagonal run of equal k-mers, in window coordinates.
#[derive(Debug, Clone, Copy)]
struct SegmentPair {
    a1: usize,
    a2: usize,
    b1: usize,
    b2: usize,
}

/// One worker's search state. Owns mutable scratch (hit counters, aligner
/// buffers) reused across queries; the database is shared read-only.
pub struct GlobalSearch<A: Alphabet> {
    db: Arc<Database<A>>,
    params: SearchParams,
    tuning: SearchTuning,
    extend_align: ExtendAlign<A>,
    banded_align: BandedAlign<A>,
    hit_counts: Vec<Counter>,
}

impl<A: Alphabet> GlobalSearch<A> {
    pub fn new(db: Arc<Database<A>>, params: SearchParams) -> Self {
        Self::with_tuning(db, params, SearchTuning::default())
    }

    pub fn with_tuning(db: Arc<Database<A>>, params: SearchParams, tuning: SearchTuning) -> Self {
        Self {
            db,
            params,
            tuning,
            extend_align: ExtendAlign::new(tuning.extend),
            banded_align: BandedAlign::new(tuning.banded),
            hit_counts: Vec::new(),
        }
    }

    pub fn params(&self) -> &SearchParams {
        &self.params
    }

    /// Run the full search for one query, collecting accepted hits. For
    /// double-stranded alphabets the reverse-complemented query is
    /// searched as well when the configured strand asks for it.
    pub fn query(&mut self, query: &Sequence) -> Result<Vec<Hit>, Error> {
        let mut hits = Vec::new();
        let strand = self.params.strand;

        if !A::DOUBLE_STRANDED || matches!(strand, Strand::Plus | Strand::Both) {
            self.search_for_hits(query, |target, cigar| {
                hits.push(Hit {
                    target: target.clone(),
                    cigar,
                    strand: Strand::Plus,
                });
            })?;
        }

        if A::DOUBLE_STRANDED && matches!(strand, Strand::Minus | Strand::Both) {
            let reverse = query.reverse_complemented::<A>();
            self.search_for_hits(&reverse, |target, cigar| {
                hits.push(Hit {
                    target: target.clone(),
                    cigar,
                    strand: Strand::Minus,
                });
            })?;
        }

        Ok(hits)
    }

    /// One strand of the pipeline. `on_hit` is invoked for every accepted
    /// candidate with the stitched alignment.
    fn search_for_hits(
        &mut self,
        query: &Sequence,
        mut on_hit: impl FnMut(&Sequence, Cigar),
    ) -> Result<(), Error> {
        let db = Arc::clone(&self.db);
        let min_hsp_length = self.tuning.min_hsp_length.min(query.len() / 2);

        if self.hit_counts.len() < db.num_sequences() {
            self.hit_counts.resize(db.num_sequences(), 0);
        }
        self.hit_counts.fill(0);

        let mut highscore = Highscore::new(self.params.max_accepts + self.params.max_rejects);

        // Seed collection: one count per candidate per distinct query
        // k-mer.
        let kmers: Vec<Kmer> = Kmers::<A>::new(query, db.kmer_length()).collect();
        let mut counted: FxHashSet<Kmer> = FxHashSet::default();
        for &kmer in &kmers {
            if kmer == AMBIGUOUS_KMER || !counted.insert(kmer) {
                continue;
            }
            let Some(seq_ids) = db.sequence_ids_for(kmer) else {
                continue;
            };
            for &seq_id in seq_ids {
                let counter = &mut self.hit_counts[seq_id as usize];
                *counter = counter.saturating_add(1);
                highscore.set(seq_id as usize, *counter as usize);
            }
        }

        // Candidate walk, best k-mer count first, stopping at whichever
        // of the accept/reject limits is hit first.
        let mut num_accepts = 0;
        let mut num_rejects = 0;

        for entry in highscore.entries_from_top_to_bottom() {
            let seq_id = entry.id as SequenceId;
            let Some(candidate) = db.sequence(seq_id) else {
                continue;
            };
            let Some(candidate_kmers) = db.kmers_for(seq_id) else {
                continue;
            };

            let segments = collect_segment_pairs(&kmers, candidate_kmers);

            // Extend every run into an HSP.
            let mut hsps: Vec<Hsp> = Vec::new();
            for segment in segments {
                let (mut a1, mut b1) = (segment.a1, segment.b1);
                let (mut a2, mut b2) = (segment.a2, segment.b2);

                let left = self.extend_align.extend(
                    query,
                    candidate,
                    AlignmentDirection::Reverse,
                    segment.a1,
                    segment.b1,
                );
                if !left.cigar.is_empty() {
                    a1 = left.a_pos;
                    b1 = left.b_pos;
                }

                let right = self.extend_align.extend(
                    query,
                    candidate,
                    AlignmentDirection::Forward,
                    segment.a2 + 1,
                    segment.b2 + 1,
                );
                if !right.cigar.is_empty() {
                    a2 = right.a_pos;
                    b2 = right.b_pos;
                }

                let mut hsp = Hsp::new(a1, a2, b1, b2)?;
                if hsp.length() < min_hsp_length {
                    continue;
                }

                // Fill the anchor interior explicitly: the run came from
                // exact k-mer equality, so score it residue by residue.
                let mut middle = Cigar::new();
                let mut middle_score = 0;
                for (a, b) in (segment.a1..=segment.a2).zip(segment.b1..=segment.b2) {
                    let (ch_a, ch_b) = (query[a], candidate[b]);
                    middle.push_op(if A::matches(ch_a, ch_b) {
                        CigarOp::Match
                    } else {
                        CigarOp::Mismatch
                    });
                    middle_score += A::score(ch_a, ch_b);
                }

                hsp.score = left.score + middle_score + right.score;
                hsp.cigar = left.cigar + middle + right.cigar;
                hsps.push(hsp);
            }

            // Greedy chain: best score first, no overlaps, joinable within
            // the distance bound.
            hsps.sort_by(|left, right| right.score.cmp(&left.score));
            let mut chain: Vec<Hsp> = Vec::new();
            for hsp in hsps {
                let overlaps = chain.iter().any(|member| hsp.is_overlapping(member));
                if overlaps {
                    continue;
                }
                let joinable = chain
                    .iter()
                    .any(|member| hsp.distance_to(member) <= self.tuning.max_join_distance);
                if chain.is_empty() || joinable {
                    chain.push(hsp);
                }
            }
            chain.sort_by_key(|hsp| (hsp.a1, hsp.b1));

            // Stitch: banded fill before, between and after the chained
            // HSPs, splicing the HSP alignments in verbatim.
            let mut accept = false;
            if !chain.is_empty() {
                let mut alignment = Cigar::new();

                let first = &chain[0];
                let (_, prefix) = self.banded_align.align(
                    query,
                    candidate,
                    AlignmentDirection::Reverse,
                    first.a1,
                    first.b1,
                    None,
                    None,
                );
                alignment += prefix;

                for i in 0..chain.len() {
                    alignment += chain[i].cigar.clone();
                    if let Some(next) = chain.get(i + 1) {
                        let current = &chain[i];
                        let (_, fill) = self.banded_align.align(
                            query,
                            candidate,
                            AlignmentDirection::Forward,
                            current.a2 + 1,
                            current.b2 + 1,
                            Some(next.a1),
                            Some(next.b1),
                        );
                        alignment += fill;
                    }
                }

                let last = &chain[chain.len() - 1];
                let (_, suffix) = self.banded_align.align(
                    query,
                    candidate,
                    AlignmentDirection::Forward,
                    last.a2 + 1,
                    last.b2 + 1,
                    None,
                    None,
                );
                alignment += suffix;

                if alignment.identity() >= self.params.min_identity {
                    accept = true;
                    on_hit(candidate, alignment);
                }
            }

            if accept {
                num_accepts += 1;
                if num_accepts >= self.params.max_accepts {
                    break;
                }
            } else {
                num_rejects += 1;
                if num_rejects >= self.params.max_rejects {
                    break;
                }
            }
        }

        Ok(())
    }
}

/// Find every maximal exact diagonal run of equal non-ambiguous k-mers.
/// A position pair starts a run only if the previous pair was not already
/// part of the same run, so runs are maximal and enumerated once.
fn collect_segment_pairs(query_kmers: &[Kmer], candidate_kmers: &[Kmer]) -> Vec<SegmentPair> {
    let mut segments = Vec::new();
    for pos in 0..query_kmers.len() {
        let kmer = query_kmers[pos];
        if kmer == AMBIGUOUS_KMER {
            continue;
        }
        for pos2 in 0..candidate_kmers.len() {
            if candidate_kmers[pos2] != kmer {
                continue;
            }
            let run_start = pos == 0
                || pos2 == 0
                || query_kmers[pos - 1] == AMBIGUOUS_KMER
                || candidate_kmers[pos2 - 1] == AMBIGUOUS_KMER
                || query_kmers[pos - 1] != candidate_kmers[pos2 - 1];
            if !run_start {
                continue;
            }

            let mut cur = pos + 1;
            let mut cur2 = pos2 + 1;
            while cur < query_kmers.len()
                && cur2 < candidate_kmers.len()
                && query_kmers[cur] != AMBIGUOUS_KMER
                && query_kmers[cur] == candidate_kmers[cur2]
            {
                cur += 1;
                cur2 += 1;
            }

            segments.push(SegmentPair {
                a1: pos,
                a2: cur - 1,
                b1: pos2,
                b2: cur2 - 1,
            });
        }
    }
    segments
}
