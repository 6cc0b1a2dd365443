//! Run-length alignment encoding.

use std::fmt;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

use crate::error::Error;

/// One alignment column class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CigarOp {
    Match,
    Mismatch,
    Insertion,
    Deletion,
}

impl CigarOp {
    pub fn symbol(self) -> char {
        match self {
            CigarOp::Match => '=',
            CigarOp::Mismatch => 'X',
            CigarOp::Insertion => 'I',
            CigarOp::Deletion => 'D',
        }
    }

    pub fn from_symbol(symbol: char) -> Option<CigarOp> {
        match symbol {
            '=' => Some(CigarOp::Match),
            'X' => Some(CigarOp::Mismatch),
            'I' => Some(CigarOp::Insertion),
            'D' => Some(CigarOp::Deletion),
            _ => None,
        }
    }

    fn is_indel(self) -> bool {
        matches!(self, CigarOp::Insertion | CigarOp::Deletion)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CigarEntry {
    pub count: usize,
    pub op: CigarOp,
}

/// Run-length list of alignment operations.
///
/// Canonical form is maintained on every push: no zero-count entries, no
/// two consecutive entries with the same operation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Cigar {
    entries: Vec<CigarEntry>,
}

impl Cigar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[CigarEntry] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Append a run, merging with the trailing entry when the operation
    /// matches. Zero-count runs are dropped.
    pub fn push(&mut self, count: usize, op: CigarOp) {
        if count == 0 {
            return;
        }
        match self.entries.last_mut() {
            Some(last) if last.op == op => last.count += count,
            _ => self.entries.push(CigarEntry { count, op }),
        }
    }

    pub fn push_op(&mut self, op: CigarOp) {
        self.push(1, op);
    }

    pub fn reverse(&mut self) {
        self.entries.reverse();
    }

    /// Matches over columns, with a leading or trailing insertion/deletion
    /// run excluded: terminal gaps do not count against identity.
    pub fn identity(&self) -> f64 {
        let last = self.entries.len().wrapping_sub(1);
        let mut columns = 0usize;
        let mut matches = 0usize;
        for (i, entry) in self.entries.iter().enumerate() {
            if (i == 0 || i == last) && entry.op.is_indel() {
                continue;
            }
            columns += entry.count;
            if entry.op == CigarOp::Match {
                matches += entry.count;
            }
        }
        if columns > 0 {
            matches as f64 / columns as f64
        } else {
            0.0
        }
    }
}

impl AddAssign for Cigar {
    fn add_assign(&mut self, other: Cigar) {
        for entry in other.entries {
            self.push(entry.count, entry.op);
        }
    }
}

impl Add for Cigar {
    type Output = Cigar;

    fn add(mut self, other: Cigar) -> Cigar {
        self += other;
        self
    }
}

impl fmt::Display for Cigar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            write!(f, "{}{}", entry.count, entry.op.symbol())?;
        }
        Ok(())
    }
}

impl FromStr for Cigar {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        let mut cigar = Cigar::new();
        let mut chars = s.chars().peekable();
        while chars.peek().is_some() {
            let mut count = 0usize;
            let mut saw_digit = false;
            while let Some(ch) = chars.peek().copied() {
                let Some(digit) = ch.to_digit(10) else { break };
                count = count * 10 + digit as usize;
                saw_digit = true;
                chars.next();
            }
            let op = chars
                .next()
                .and_then(CigarOp::from_symbol)
                .filter(|_| saw_digit)
                .ok_or_else(|| Error::MalformedCigar(s.to_string()))?;
            cigar.push(count, op);
        }
        Ok(cigar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_merges_adjacent_runs() {
        let mut cigar = Cigar::new();
        cigar.push(3, CigarOp::Match);
        cigar.push(2, CigarOp::Match);
        cigar.push_op(CigarOp::Mismatch);
        cigar.push(0, CigarOp::Deletion);
        cigar.push_op(CigarOp::Mismatch);
        assert_eq!(cigar.to_string(), "5=2X");
        // canonical: no two consecutive entries share an op
        for pair in cigar.entries().windows(2) {
            assert_ne!(pair[0].op, pair[1].op);
        }
    }

    #[test]
    fn concatenation_merges_at_the_boundary() {
        let left: Cigar = "4=2I".parse().unwrap();
        let right: Cigar = "3I5=".parse().unwrap();
        assert_eq!((left + right).to_string(), "4=5I5=");
    }

    #[test]
    fn terminal_gaps_do_not_penalize_identity() {
        let cigar: Cigar = "3I5=2D".parse().unwrap();
        assert!((cigar.identity() - 1.0).abs() < f64::EPSILON);

        let interior: Cigar = "2=2D2=".parse().unwrap();
        assert!((interior.identity() - 4.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn single_indel_cigar_has_zero_identity() {
        let cigar: Cigar = "7D".parse().unwrap();
        assert_eq!(cigar.identity(), 0.0);
        assert_eq!(Cigar::new().identity(), 0.0);
    }

    #[test]
    fn to_string_round_trips() {
        let text = "12=3X5D1I2=";
        let cigar: Cigar = text.parse().unwrap();
        assert_eq!(cigar.to_string(), text);
        let reparsed: Cigar = cigar.to_string().parse().unwrap();
        assert_eq!(reparsed, cigar);
    }

    #[test]
    fn malformed_strings_are_rejected() {
        assert!("3=4".parse::<Cigar>().is_err());
        assert!("=3".parse::<Cigar>().is_err());
        assert!("3Q".parse::<Cigar>().is_err());
    }

    #[test]
    fn reverse_keeps_canonical_form() {
        let mut cigar: Cigar = "2=1X3D".parse().unwrap();
        cigar.reverse();
        assert_eq!(cigar.to_string(), "3D1X2=");
    }
}
