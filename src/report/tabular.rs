//! One row per hit, tab-separated.

use std::io::{self, Write};

use super::{AlignmentStats, HitSink};
use crate::alphabet::Strand;
use crate::search::Hit;
use crate::sequence::Sequence;

/// Columns: query id, target id, identity%, alignment columns, matches,
/// mismatches, gap columns, strand, cigar.
pub struct TabularWriter<W: Write> {
    out: W,
}

impl<W: Write> TabularWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write + Send> HitSink for TabularWriter<W> {
    fn write_hits(&mut self, query: &Sequence, hits: &[Hit]) -> io::Result<()> {
        for hit in hits {
            let stats = AlignmentStats::from_cigar(&hit.cigar);
            writeln!(
                self.out,
                "{}\t{}\t{:.1}\t{}\t{}\t{}\t{}\t{}\t{}",
                query.id(),
                hit.target.id(),
                hit.cigar.identity() * 100.0,
                stats.columns,
                stats.matches,
                stats.mismatches,
                stats.gaps,
                if hit.strand == Strand::Minus { '-' } else { '+' },
                hit.cigar
            )?;
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}
