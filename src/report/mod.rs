//! Hit sinks: writers consuming `(query, hits)` pairs.
//!
//! Both writers treat the Cigar as canonical and recompute columns,
//! identity and gap counts from it.

pub mod alnout;
pub mod tabular;

pub use alnout::AlnoutWriter;
pub use tabular::TabularWriter;

use std::io;

use crate::align::{Cigar, CigarOp};
use crate::search::Hit;
use crate::sequence::Sequence;

/// Destination for per-query search results.
pub trait HitSink: Send {
    fn write_hits(&mut self, query: &Sequence, hits: &[Hit]) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()>;
}

/// Column counts recomputed from a canonical Cigar.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlignmentStats {
    pub columns: usize,
    pub matches: usize,
    pub mismatches: usize,
    pub gaps: usize,
}

impl AlignmentStats {
    pub fn from_cigar(cigar: &Cigar) -> Self {
        let mut stats = AlignmentStats::default();
        for entry in cigar.entries() {
            stats.columns += entry.count;
            match entry.op {
                CigarOp::Match => stats.matches += entry.count,
                CigarOp::Mismatch => stats.mismatches += entry.count,
                CigarOp::Insertion | CigarOp::Deletion => stats.gaps += entry.count,
            }
        }
        stats
    }
}
