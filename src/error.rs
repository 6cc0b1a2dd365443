use thiserror::Error;

/// Validation and lookup errors raised by the search core.
///
/// All invariant violations surface here at construction time; the core
/// itself performs no I/O and has no other failure modes.
#[derive(Debug, Error, PartialEq)]
pub enum Error {
    #[error("k-mer length {length} exceeds the {max} residues representable in a k-mer word")]
    KmerLengthTooLarge { length: usize, max: usize },

    #[error("k-mer length must be nonzero")]
    KmerLengthZero,

    #[error("invalid HSP bounds: query [{a1}, {a2}], target [{b1}, {b2}]")]
    InvalidHsp {
        a1: usize,
        a2: usize,
        b1: usize,
        b2: usize,
    },

    #[error("quality length {quality} does not match sequence length {sequence}")]
    QualityLengthMismatch { sequence: usize, quality: usize },

    #[error("identity threshold {0} is outside [0, 1]")]
    InvalidIdentityThreshold(f64),

    #[error("malformed cigar string: {0}")]
    MalformedCigar(String),
}
