//! X-drop greedy extension from a seed point.
//!
//! Semi-gapped extension in the style of BLAST: from a fixed start the
//! alignment grows in one direction without a fixed endpoint, and a row is
//! abandoned once every cell falls more than `x_drop` below the best score
//! seen so far. The explored region is bounded by a shrinking/growing
//! active column window rather than the full rectangle.

use std::cmp::max;
use std::marker::PhantomData;

use super::cigar::{Cigar, CigarOp};
use super::{AlignmentDirection, MIN_SCORE};
use crate::alphabet::Alphabet;
use crate::sequence::Sequence;

#[derive(Debug, Clone, Copy)]
pub struct ExtendAlignParams {
    pub x_drop: i32,
    pub gap_open: i32,
    pub gap_extend: i32,
}

impl Default for ExtendAlignParams {
    fn default() -> Self {
        Self {
            x_drop: 32,
            gap_open: -20,
            gap_extend: -2,
        }
    }
}

/// Outcome of one extension: the best score, the coordinates of the best
/// cell, and the operations from the seed to that cell.
///
/// When no cell beats the seed the cigar is empty and `a_pos`/`b_pos` echo
/// the start coordinates.
#[derive(Debug, Clone)]
pub struct Extension {
    pub score: i32,
    pub a_pos: usize,
    pub b_pos: usize,
    pub cigar: Cigar,
}

#[derive(Debug, Clone, Copy)]
struct Cell {
    score: i32,
    score_gap: i32,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            score: MIN_SCORE,
            score_gap: MIN_SCORE,
        }
    }
}

/// X-drop extender with scratch buffers reused across calls.
pub struct ExtendAlign<A: Alphabet> {
    params: ExtendAlignParams,
    row: Vec<Cell>,
    ops: Vec<CigarOp>,
    _alphabet: PhantomData<A>,
}

impl<A: Alphabet> Default for ExtendAlign<A> {
    fn default() -> Self {
        Self::new(ExtendAlignParams::default())
    }
}

impl<A: Alphabet> ExtendAlign<A> {
    pub fn new(params: ExtendAlignParams) -> Self {
        Self {
            params,
            row: Vec::new(),
            ops: Vec::new(),
            _alphabet: PhantomData,
        }
    }

    pub fn params(&self) -> &ExtendAlignParams {
        &self.params
    }

    /// Extend from `(start_a, start_b)` in the given direction. Forward
    /// explores cells at `start + offset`, Reverse at `start - offset`, so
    /// one recurrence serves both ends of a seed.
    pub fn extend(
        &mut self,
        a: &Sequence,
        b: &Sequence,
        dir: AlignmentDirection,
        start_a: usize,
        start_b: usize,
    ) -> Extension {
        let (width, height) = match dir {
            AlignmentDirection::Forward => (a.len() - start_a + 1, b.len() - start_b + 1),
            AlignmentDirection::Reverse => (start_a + 1, start_b + 1),
        };

        if self.row.len() < width {
            self.row.resize(width, Cell::default());
        }
        if self.ops.len() < width * height {
            self.ops.resize(width * height, CigarOp::Match);
        }

        let gap_score = self.params.gap_open + self.params.gap_extend;

        let mut best_score = 0;
        let mut best_x = 0usize;
        let mut best_y = 0usize;
        let mut a_best = start_a;
        let mut b_best = start_b;

        self.row[0] = Cell {
            score: 0,
            score_gap: gap_score,
        };

        // First row: pure insertions until the X-drop bound cuts them off.
        let mut x = 1;
        while x < width {
            let score = self.params.gap_open + x as i32 * self.params.gap_extend;
            if score < -self.params.x_drop {
                break;
            }
            self.ops[x] = CigarOp::Insertion;
            self.row[x] = Cell {
                score,
                score_gap: MIN_SCORE,
            };
            x += 1;
        }
        let mut row_size = x;
        let mut first_x = 0usize;

        let mut y = 1;
        while y < height {
            let mut row_gap = MIN_SCORE;
            let mut diag_score = MIN_SCORE;
            let mut last_x = first_x;

            for x in first_x..row_size {
                let col_gap = self.row[x].score_gap;

                let mut a_idx = 0;
                let mut b_idx = 0;
                let mut matched = false;
                let mut score = MIN_SCORE;
                if x > 0 {
                    // diag_score holds the score at (x-1, y-1)
                    match dir {
                        AlignmentDirection::Forward => {
                            a_idx = start_a + x - 1;
                            b_idx = start_b + y - 1;
                        }
                        AlignmentDirection::Reverse => {
                            a_idx = start_a - x;
                            b_idx = start_b - y;
                        }
                    }
                    matched = A::matches(a[a_idx], b[b_idx]);
                    score = diag_score + A::score(a[a_idx], b[b_idx]);
                }

                // Best of coming from the diagonal, the left, or above.
                if score < row_gap {
                    score = row_gap;
                }
                if score < col_gap {
                    score = col_gap;
                }

                // row[x] still holds the previous row; stash it for the
                // diagonal computation at (x+1, y).
                diag_score = self.row[x].score;

                if best_score - score > self.params.x_drop {
                    self.row[x].score = MIN_SCORE;
                    if x == first_x {
                        first_x += 1;
                    }
                } else {
                    last_x = x;

                    if score > best_score {
                        best_score = score;
                        a_best = a_idx;
                        b_best = b_idx;
                        best_x = x;
                        best_y = y;
                    }

                    let op = if score == row_gap {
                        CigarOp::Insertion
                    } else if score == col_gap {
                        CigarOp::Deletion
                    } else if matched {
                        CigarOp::Match
                    } else {
                        CigarOp::Mismatch
                    };
                    self.ops[y * width + x] = op;

                    self.row[x].score = score;
                    self.row[x].score_gap = max(score + gap_score, col_gap + self.params.gap_extend);
                    row_gap = max(score + gap_score, row_gap + self.params.gap_extend);
                }
            }

            if first_x == row_size {
                // Every cell failed the X-drop test.
                break;
            }

            if last_x < row_size - 1 {
                // Tighten the right bound.
                row_size = last_x + 1;
            } else {
                // The rightmost cell survived: extend the row while the
                // open row gap stays within the X-drop bound.
                while row_gap >= best_score - self.params.x_drop && row_size < width {
                    self.row[row_size] = Cell {
                        score: row_gap,
                        score_gap: row_gap + gap_score,
                    };
                    self.ops[y * width + row_size] = CigarOp::Insertion;
                    row_gap += self.params.gap_extend;
                    row_size += 1;
                }
            }

            if row_size < width {
                self.row[row_size] = Cell::default();
                row_size += 1;
            }

            y += 1;
        }

        let mut cigar = Cigar::new();
        let mut bx = best_x;
        let mut by = best_y;
        while bx != 0 || by != 0 {
            let op = self.ops[by * width + bx];
            cigar.push_op(op);
            match op {
                CigarOp::Insertion => bx -= 1,
                CigarOp::Deletion => by -= 1,
                CigarOp::Match | CigarOp::Mismatch => {
                    bx -= 1;
                    by -= 1;
                }
            }
        }
        if dir == AlignmentDirection::Forward {
            cigar.reverse();
        }

        Extension {
            score: best_score,
            a_pos: a_best,
            b_pos: b_best,
            cigar,
        }
    }
}
