//! Banded global alignment with distinct interior and terminal gap costs.
//!
//! Produces a complete end-to-end alignment between two (sub)sequence
//! spans, computing only the cells within a diagonal band around the
//! advancing center. Gaps that touch a true sequence boundary are scored
//! with the cheaper terminal costs, so overhangs are tolerated. Used to
//! connect chained seed alignments and to cap alignments at sequence ends.

use std::cmp::min;
use std::marker::PhantomData;

use super::cigar::{Cigar, CigarOp};
use super::{AlignmentDirection, MIN_SCORE};
use crate::alphabet::Alphabet;
use crate::sequence::Sequence;

#[derive(Debug, Clone, Copy)]
pub struct BandedAlignParams {
    /// Half-width of the computed diagonal band.
    pub bandwidth: usize,
    pub interior_gap_open: i32,
    pub interior_gap_extend: i32,
    pub terminal_gap_open: i32,
    pub terminal_gap_extend: i32,
}

impl Default for BandedAlignParams {
    fn default() -> Self {
        Self {
            bandwidth: 16,
            interior_gap_open: -20,
            interior_gap_extend: -2,
            terminal_gap_open: -2,
            terminal_gap_extend: -1,
        }
    }
}

/// An open gap: its running score and whether it is priced as terminal.
#[derive(Debug, Clone, Copy)]
struct Gap {
    score: i32,
    is_terminal: bool,
}

impl Gap {
    fn new() -> Self {
        Self {
            score: MIN_SCORE,
            is_terminal: false,
        }
    }

    fn reset(&mut self) {
        *self = Gap::new();
    }

    /// Either open a fresh gap of `length` columns from `score`, or extend
    /// the already-open gap by `length`, keeping whichever scores higher.
    fn open_or_extend(
        &mut self,
        score: i32,
        terminal: bool,
        length: usize,
        params: &BandedAlignParams,
    ) {
        let mut opened = score;
        if length > 0 {
            let (open, extend) = if terminal {
                (params.terminal_gap_open, params.terminal_gap_extend)
            } else {
                (params.interior_gap_open, params.interior_gap_extend)
            };
            opened += open + length as i32 * extend;
        }

        let extend = if self.is_terminal {
            params.terminal_gap_extend
        } else {
            params.interior_gap_extend
        };
        self.score += length as i32 * extend;

        if opened > self.score {
            self.score = opened;
            self.is_terminal = terminal;
        }
    }
}

/// Banded global aligner with scratch buffers reused across calls.
pub struct BandedAlign<A: Alphabet> {
    params: BandedAlignParams,
    scores: Vec<i32>,
    vertical_gaps: Vec<Gap>,
    ops: Vec<CigarOp>,
    _alphabet: PhantomData<A>,
}

impl<A: Alphabet> Default for BandedAlign<A> {
    fn default() -> Self {
        Self::new(BandedAlignParams::default())
    }
}

impl<A: Alphabet> BandedAlign<A> {
    pub fn new(params: BandedAlignParams) -> Self {
        Self {
            params,
            scores: Vec::new(),
            vertical_gaps: Vec::new(),
            ops: Vec::new(),
            _alphabet: PhantomData,
        }
    }

    pub fn params(&self) -> &BandedAlignParams {
        &self.params
    }

    /// Align `a[start_a..end_a]` against `b[start_b..end_b]` end to end.
    /// `None` ends default to the far end of each sequence in the given
    /// direction. A is the X axis of the matrix, B the Y axis.
    pub fn align(
        &mut self,
        a: &Sequence,
        b: &Sequence,
        dir: AlignmentDirection,
        start_a: usize,
        start_b: usize,
        end_a: Option<usize>,
        end_b: Option<usize>,
    ) -> (i32, Cigar) {
        let len_a = a.len();
        let len_b = b.len();

        let far_end = |len: usize| match dir {
            AlignmentDirection::Forward => len,
            AlignmentDirection::Reverse => 0,
        };
        let start_a = min(start_a, len_a);
        let start_b = min(start_b, len_b);
        let end_a = min(end_a.unwrap_or_else(|| far_end(len_a)), len_a);
        let end_b = min(end_b.unwrap_or_else(|| far_end(len_b)), len_b);

        let width = start_a.abs_diff(end_a) + 1;
        let height = start_b.abs_diff(end_b) + 1;

        if self.scores.len() < width {
            self.scores.resize(width, MIN_SCORE);
        }
        if self.vertical_gaps.len() < width {
            self.vertical_gaps.resize(width, Gap::new());
        }
        if self.ops.len() < width * height {
            self.ops.resize(width * height, CigarOp::Match);
        }

        let params = self.params;
        let bw = params.bandwidth;

        // Terminal gap pricing applies where a span edge coincides with a
        // true sequence boundary.
        let from_beginning_a = start_a == 0 || start_a == len_a;
        let from_beginning_b = start_b == 0 || start_b == len_b;
        let from_end_a = end_a == 0 || end_a == len_a;
        let from_end_b = end_b == 0 || end_b == len_b;

        self.scores[0] = 0;
        self.vertical_gaps[0].reset();
        self.vertical_gaps[0].open_or_extend(0, from_beginning_b, 1, &params);

        let mut horizontal_gap = Gap::new();

        // First row: horizontal gap along A.
        let mut x = 1;
        while x < width {
            if x > bw && height > 1 {
                break;
            }
            horizontal_gap.open_or_extend(self.scores[x - 1], from_beginning_a, 1, &params);
            self.scores[x] = horizontal_gap.score;
            self.ops[x] = CigarOp::Insertion;
            self.vertical_gaps[x].reset();
            x += 1;
        }
        if x < width {
            self.scores[x] = MIN_SCORE;
            self.vertical_gaps[x].reset();
        }

        // Row by row, the band center advancing one column per row.
        let mut center = 1usize;
        let mut hit_end = false;
        let mut y = 1;
        while y < height && !hit_end {
            let left_bound = min(center.saturating_sub(bw), width - 1);
            let right_bound = min(center + bw, width - 1);

            // Score of (left_bound - 1, y - 1) seeds the first diagonal;
            // the cell itself leaves the band and becomes unreachable.
            let mut diag_score = MIN_SCORE;
            if left_bound > 0 {
                diag_score = self.scores[left_bound - 1];
                self.scores[left_bound - 1] = MIN_SCORE;
                self.vertical_gaps[left_bound - 1].reset();
            }

            horizontal_gap.reset();
            for x in left_bound..=right_bound {
                let mut matched = false;
                let mut score = MIN_SCORE;
                if x > 0 {
                    let (a_idx, b_idx) = match dir {
                        AlignmentDirection::Forward => (start_a + x - 1, start_b + y - 1),
                        AlignmentDirection::Reverse => (start_a - x, start_b - y),
                    };
                    matched = A::matches(a[a_idx], b[b_idx]);
                    score = diag_score + A::score(a[a_idx], b[b_idx]);
                }

                if score < horizontal_gap.score {
                    score = horizontal_gap.score;
                }
                let vertical_gap_score = self.vertical_gaps[x].score;
                if score < vertical_gap_score {
                    score = vertical_gap_score;
                }

                diag_score = self.scores[x];
                self.scores[x] = score;

                let op = if score == horizontal_gap.score {
                    CigarOp::Insertion
                } else if score == vertical_gap_score {
                    CigarOp::Deletion
                } else if matched {
                    CigarOp::Match
                } else {
                    CigarOp::Mismatch
                };
                self.ops[y * width + x] = op;

                let is_terminal_a = (x == 0 || x == width - 1) && from_end_a;
                let is_terminal_b = (y == 0 || y == height - 1) && from_end_b;
                horizontal_gap.open_or_extend(score, is_terminal_b, 1, &params);
                self.vertical_gaps[x].open_or_extend(score, is_terminal_a, 1, &params);
            }
            x = right_bound + 1;

            if x < width {
                self.scores[x] = MIN_SCORE;
                self.vertical_gaps[x].reset();
            }

            hit_end = right_bound == left_bound;
            center += 1;
            y += 1;
        }

        // Backtrack from the last computed cell.
        let mut cigar = Cigar::new();
        let mut bx = x - 1;
        let mut by = y - 1;
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
        cigar.reverse();

        // If one axis ran out first, the remainder is a single gap run
        // priced over its whole length.
        let mut score = self.scores[x - 1];
        if x == width {
            let remaining_b = height - y;
            let vertical_gap = &mut self.vertical_gaps[x - 1];
            let terminal = vertical_gap.is_terminal;
            vertical_gap.open_or_extend(score, terminal, remaining_b, &params);
            score = vertical_gap.score;
            cigar.push(remaining_b, CigarOp::Deletion);
        } else if y == height {
            let remaining_a = width - x;
            let terminal = horizontal_gap.is_terminal;
            horizontal_gap.open_or_extend(score, terminal, remaining_a, &params);
            score = horizontal_gap.score;
            cigar.push(remaining_a, CigarOp::Insertion);
        }

        if dir == AlignmentDirection::Reverse {
            cigar.reverse();
        }

        (score, cigar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::Dna;

    fn align_forward(a: &str, b: &str) -> (i32, Cigar) {
        let mut aligner = BandedAlign::<Dna>::default();
        aligner.align(
            &Sequence::from(a),
            &Sequence::from(b),
            AlignmentDirection::Forward,
            0,
            0,
            None,
            None,
        )
    }

    #[test]
    fn identical_sequences_align_without_gaps() {
        let (score, cigar) = align_forward("ACGTACGT", "ACGTACGT");
        assert_eq!(score, 16);
        assert_eq!(cigar.to_string(), "8=");
    }

    #[test]
    fn single_substitution() {
        let (score, cigar) = align_forward("ACGTACGT", "ACGAACGT");
        assert_eq!(cigar.to_string(), "3=1X4=");
        assert_eq!(score, 7 * 2 - 4);
    }

    #[test]
    fn empty_against_empty() {
        let (score, cigar) = align_forward("", "");
        assert_eq!(score, 0);
        assert!(cigar.is_empty());
    }

    #[test]
    fn empty_b_emits_one_terminal_insertion_run() {
        let (score, cigar) = align_forward("ACGT", "");
        assert_eq!(cigar.to_string(), "4I");
        // terminal pricing: open -2, extend -1 per column
        assert_eq!(score, -2 - 4);
    }

    #[test]
    fn trailing_overhang_is_priced_terminally() {
        let (score, cigar) = align_forward("ACGTACGTCCCC", "ACGTACGT");
        assert_eq!(cigar.to_string(), "8=4I");
        assert_eq!(score, 16 - 2 - 4);
    }

    #[test]
    fn interior_gap_uses_interior_costs() {
        let (score, cigar) = align_forward("ACGTACGTAATTTTGGGGCCCC", "ACGTACGTTTTTGGGGCCCC");
        assert_eq!(cigar.to_string(), "8=2I12=");
        assert_eq!(score, 20 * 2 - 20 - 2 * 2);
    }

    #[test]
    fn banded_score_matches_unrestricted_alignment_inside_the_band() {
        // One substitution, on the main diagonal: banding cannot cut the
        // optimal path.
        let a = "ACGTACGTAAGGTTTTGGAACCTTGGAACC";
        let b = "ACGTACGTAAGGTTGTGGAACCTTGGAACC";
        let (score, cigar) = align_forward(a, b);
        assert_eq!(cigar.to_string(), "14=1X15=");
        assert_eq!(score, 29 * 2 - 4);

        let wide = BandedAlignParams {
            bandwidth: 64,
            ..BandedAlignParams::default()
        };
        let mut unrestricted = BandedAlign::<Dna>::new(wide);
        let (wide_score, wide_cigar) = unrestricted.align(
            &Sequence::from(a),
            &Sequence::from(b),
            AlignmentDirection::Forward,
            0,
            0,
            None,
            None,
        );
        assert_eq!(wide_score, score);
        assert_eq!(wide_cigar, cigar);
    }

    #[test]
    fn reverse_direction_mirrors_forward() {
        // Walking backwards from the ends must produce the same alignment
        // as walking forward from the starts.
        let a = Sequence::from("ACGTACGT");
        let b = Sequence::from("ACGAACGT");
        let mut aligner = BandedAlign::<Dna>::default();
        let (score, cigar) = aligner.align(
            &a,
            &b,
            AlignmentDirection::Reverse,
            a.len(),
            b.len(),
            None,
            None,
        );
        assert_eq!(score, 7 * 2 - 4);
        assert_eq!(cigar.to_string(), "3=1X4=");
    }

    #[test]
    fn subspan_alignment_between_anchors() {
        // Fill the region between two chained seeds: interior on both
        // sides, so no terminal discounting applies.
        let a = Sequence::from("AAAACGCGTTTT");
        let b = Sequence::from("AAAACGCGTTTT");
        let mut aligner = BandedAlign::<Dna>::default();
        let (score, cigar) = aligner.align(
            &a,
            &b,
            AlignmentDirection::Forward,
            4,
            4,
            Some(8),
            Some(8),
        );
        assert_eq!(cigar.to_string(), "4=");
        assert_eq!(score, 8);
    }
}
