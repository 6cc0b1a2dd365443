//! Per-query search against a k-mer database.

pub mod global;
pub mod highscore;
pub mod hsp;

pub use global::{GlobalSearch, SearchTuning};
pub use highscore::Highscore;
pub use hsp::Hsp;

use crate::align::Cigar;
use crate::alphabet::Strand;
use crate::error::Error;
use crate::sequence::Sequence;

/// Per-run search parameters, shared read-only across worker threads.
#[derive(Debug, Clone, Copy)]
pub struct SearchParams {
    /// Stop after this many accepted candidates per query.
    pub max_accepts: usize,
    /// Stop after this many rejected candidates per query.
    pub max_rejects: usize,
    /// Minimum identity (0..=1) of the stitched alignment.
    pub min_identity: f64,
    /// Strand selection; ignored for single-stranded alphabets.
    pub strand: Strand,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            max_accepts: 1,
            max_rejects: 16,
            min_identity: 0.75,
            strand: Strand::Plus,
        }
    }
}

impl SearchParams {
    pub fn validated(self) -> Result<Self, Error> {
        if !(0.0..=1.0).contains(&self.min_identity) {
            return Err(Error::InvalidIdentityThreshold(self.min_identity));
        }
        Ok(self)
    }
}

/// One accepted alignment of a query against a database sequence.
#[derive(Debug, Clone)]
pub struct Hit {
    pub target: Sequence,
    pub cigar: Cigar,
    /// Which strand of the query matched; always `Plus` for
    /// single-stranded alphabets.
    pub strand: Strand,
}

/// A query paired with everything it hit, ready for a hit sink.
#[derive(Debug, Clone)]
pub struct QueryHits {
    pub query: Sequence,
    pub hits: Vec<Hit>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_threshold_is_validated() {
        let params = SearchParams::default();
        assert!(params.validated().is_ok());
        let bad = SearchParams {
            min_identity: 1.5,
            ..params
        };
        assert!(matches!(
            bad.validated(),
            Err(Error::InvalidIdentityThreshold(_))
        ));
    }
}
