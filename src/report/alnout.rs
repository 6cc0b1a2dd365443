//! Human-readable pairwise alignment report.
//!
//! Per query: a summary table of hit identities, then each alignment
//! rendered in 60-column blocks with a match-symbol row and 1-based
//! coordinates, closed by a column/identity/gap summary line.

use std::io::{self, Write};
use std::marker::PhantomData;

use super::{AlignmentStats, HitSink};
use crate::align::CigarOp;
use crate::alphabet::{Alphabet, Strand};
use crate::search::Hit;
use crate::sequence::Sequence;

const BLOCK_WIDTH: usize = 60;

pub struct AlnoutWriter<A: Alphabet, W: Write> {
    out: W,
    _alphabet: PhantomData<A>,
}

/// One rendered alignment block plus its coordinate bookkeeping.
struct Block {
    query_row: String,
    symbol_row: String,
    target_row: String,
    query_start: usize,
    query_end: usize,
    target_start: usize,
    target_end: usize,
}

impl<A: Alphabet, W: Write> AlnoutWriter<A, W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            _alphabet: PhantomData,
        }
    }

    fn blocks(aligned_query: &Sequence, hit: &Hit) -> Vec<Block> {
        let mut blocks = Vec::new();
        let mut query_row = String::new();
        let mut symbol_row = String::new();
        let mut target_row = String::new();

        let mut q_pos = 0usize;
        let mut t_pos = 0usize;
        let mut block_q_start = 0usize;
        let mut block_t_start = 0usize;

        let mut flush = |query_row: &mut String,
                         symbol_row: &mut String,
                         target_row: &mut String,
                         q_pos: usize,
                         t_pos: usize,
                         block_q_start: &mut usize,
                         block_t_start: &mut usize,
                         blocks: &mut Vec<Block>| {
            if query_row.is_empty() {
                return;
            }
            blocks.push(Block {
                query_row: std::mem::take(query_row),
                symbol_row: std::mem::take(symbol_row),
                target_row: std::mem::take(target_row),
                query_start: *block_q_start + 1,
                query_end: q_pos,
                target_start: *block_t_start + 1,
                target_end: t_pos,
            });
            *block_q_start = q_pos;
            *block_t_start = t_pos;
        };

        for entry in hit.cigar.entries() {
            for _ in 0..entry.count {
                match entry.op {
                    CigarOp::Match | CigarOp::Mismatch => {
                        let (q, t) = (aligned_query[q_pos], hit.target[t_pos]);
                        query_row.push(q as char);
                        symbol_row.push(if A::matches(q, t) { '|' } else { ' ' });
                        target_row.push(t as char);
                        q_pos += 1;
                        t_pos += 1;
                    }
                    CigarOp::Insertion => {
                        query_row.push(aligned_query[q_pos] as char);
                        symbol_row.push(' ');
                        target_row.push('-');
                        q_pos += 1;
                    }
                    CigarOp::Deletion => {
                        query_row.push('-');
                        symbol_row.push(' ');
                        target_row.push(hit.target[t_pos] as char);
                        t_pos += 1;
                    }
                }
                if query_row.len() == BLOCK_WIDTH {
                    flush(
                        &mut query_row,
                        &mut symbol_row,
                        &mut target_row,
                        q_pos,
                        t_pos,
                        &mut block_q_start,
                        &mut block_t_start,
                        &mut blocks,
                    );
                }
            }
        }
        flush(
            &mut query_row,
            &mut symbol_row,
            &mut target_row,
            q_pos,
            t_pos,
            &mut block_q_start,
            &mut block_t_start,
            &mut blocks,
        );
        blocks
    }

    fn write_alignment(&mut self, query: &Sequence, hit: &Hit) -> io::Result<()> {
        let aligned_query = if hit.strand == Strand::Minus {
            query.reverse_complemented::<A>()
        } else {
            query.clone()
        };

        let unit = A::LENGTH_UNIT;
        let width = query.len().max(hit.target.len()).to_string().len();
        writeln!(
            self.out,
            " Query {:>width$}{} >{}",
            query.len(),
            unit,
            query.id()
        )?;
        writeln!(
            self.out,
            "Target {:>width$}{} >{}",
            hit.target.len(),
            unit,
            hit.target.id()
        )?;
        writeln!(self.out)?;

        // minus-strand query positions count down in the original
        // orientation
        let query_pos = |pos: usize| -> usize {
            if hit.strand == Strand::Minus {
                query.len() + 1 - pos
            } else {
                pos
            }
        };
        let (query_sign, target_sign) = if A::DOUBLE_STRANDED {
            (if hit.strand == Strand::Minus { "- " } else { "+ " }, "+ ")
        } else {
            ("", "")
        };

        let blocks = Self::blocks(&aligned_query, hit);
        let pad = blocks
            .last()
            .map(|block| {
                let q = query_pos(block.query_start)
                    .max(query_pos(block.query_end.max(1)))
                    .to_string()
                    .len();
                let t = block.target_end.to_string().len();
                q.max(t)
            })
            .unwrap_or(1);

        for block in &blocks {
            writeln!(
                self.out,
                "Qry {:>pad$} {}{} {}",
                query_pos(block.query_start),
                query_sign,
                block.query_row,
                query_pos(block.query_end.max(1))
            )?;
            writeln!(
                self.out,
                "{:pad$}     {}{}",
                "",
                " ".repeat(query_sign.len()),
                block.symbol_row
            )?;
            writeln!(
                self.out,
                "Tgt {:>pad$} {}{} {}",
                block.target_start,
                target_sign,
                block.target_row,
                block.target_end.max(1)
            )?;
            writeln!(self.out)?;
        }

        let stats = AlignmentStats::from_cigar(&hit.cigar);
        let identity = 100.0 * stats.matches as f64 / stats.columns.max(1) as f64;
        let gap_ratio = 100.0 * stats.gaps as f64 / stats.columns.max(1) as f64;
        writeln!(
            self.out,
            "{} cols, {} ids ({:.1}%), {} gaps ({:.1}%)",
            stats.columns, stats.matches, identity, stats.gaps, gap_ratio
        )?;
        writeln!(self.out)
    }
}

impl<A: Alphabet, W: Write + Send> HitSink for AlnoutWriter<A, W> {
    fn write_hits(&mut self, query: &Sequence, hits: &[Hit]) -> io::Result<()> {
        writeln!(self.out, "Query >{}", query.id())?;
        writeln!(self.out, " %Id   TLen  Target")?;
        for hit in hits {
            writeln!(
                self.out,
                "{:3.0}%{:7}  {}",
                hit.cigar.identity() * 100.0,
                hit.target.len(),
                hit.target.id()
            )?;
        }
        writeln!(self.out)?;

        for hit in hits {
            self.write_alignment(query, hit)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}
