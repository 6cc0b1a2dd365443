//! Owned sequence records.

use crate::alphabet::Alphabet;
use crate::error::Error;

/// A named residue string with an optional per-residue quality string.
///
/// Immutable once constructed; the quality string, when present, is
/// validated to be exactly as long as the residue string.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Sequence {
    id: String,
    residues: Vec<u8>,
    quality: Option<Vec<u8>>,
}

impl Sequence {
    pub fn new(
        id: impl Into<String>,
        residues: Vec<u8>,
        quality: Option<Vec<u8>>,
    ) -> Result<Self, Error> {
        if let Some(q) = &quality {
            if q.len() != residues.len() {
                return Err(Error::QualityLengthMismatch {
                    sequence: residues.len(),
                    quality: q.len(),
                });
            }
        }
        Ok(Self {
            id: id.into(),
            residues,
            quality,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn residues(&self) -> &[u8] {
        &self.residues
    }

    pub fn quality(&self) -> Option<&[u8]> {
        self.quality.as_deref()
    }

    pub fn len(&self) -> usize {
        self.residues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.residues.is_empty()
    }

    /// Residues (and quality) in reverse order.
    pub fn reversed(&self) -> Sequence {
        let mut rev = self.clone();
        rev.residues.reverse();
        if let Some(q) = &mut rev.quality {
            q.reverse();
        }
        rev
    }

    /// Per-residue complement under the given alphabet.
    pub fn complemented<A: Alphabet>(&self) -> Sequence {
        let mut comp = self.clone();
        for r in &mut comp.residues {
            *r = A::complement(*r);
        }
        comp
    }

    pub fn reverse_complemented<A: Alphabet>(&self) -> Sequence {
        self.reversed().complemented::<A>()
    }
}

impl std::ops::Index<usize> for Sequence {
    type Output = u8;

    fn index(&self, index: usize) -> &u8 {
        &self.residues[index]
    }
}

impl From<&str> for Sequence {
    fn from(residues: &str) -> Self {
        Sequence {
            id: String::new(),
            residues: residues.as_bytes().to_vec(),
            quality: None,
        }
    }
}
