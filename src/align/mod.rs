//! Alignment primitives: run-length alignment encoding, X-drop greedy
//! extension and banded global alignment.

pub mod banded;
pub mod cigar;
pub mod extend;

pub use banded::{BandedAlign, BandedAlignParams};
pub use cigar::{Cigar, CigarEntry, CigarOp};
pub use extend::{ExtendAlign, ExtendAlignParams, Extension};

/// Sentinel for unreachable cells. Half of `i32::MIN` so that adding gap
/// penalties cannot wrap around.
pub const MIN_SCORE: i32 = i32::MIN / 2;

/// Whether an alignment walks coordinates upward or downward from its
/// start point. One aligner implementation serves both directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignmentDirection {
    Forward,
    Reverse,
}
