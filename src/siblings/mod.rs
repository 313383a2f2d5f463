//! # Siblings
//!
//! A **sibling** is the record of the complementary band (g ↔ r) that comes from the same
//! astrophysical source. Siblings are associated by offset only; a [`SiblingPair`] never owns
//! records, and either side is resolved on demand through the
//! [record accessor](crate::records::accessor).
//!
//! * [`locator`] – finds the sibling of a record through a [`NeighborSearch`](crate::spatial::NeighborSearch).
//! * [`cache`] – persists discovered pairs, one file per raw lightcurve file.
pub mod cache;
pub mod locator;

use serde::{Deserialize, Serialize};

use crate::constants::{ArcSec, ByteOffset};

/// Unordered association of two records, stored with `offset_a < offset_b`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SiblingPair {
    pub offset_a: ByteOffset,
    pub offset_b: ByteOffset,
    pub separation_arcsec: ArcSec,
}

impl SiblingPair {
    pub fn new(first: ByteOffset, second: ByteOffset, separation_arcsec: ArcSec) -> Self {
        SiblingPair {
            offset_a: first.min(second),
            offset_b: first.max(second),
            separation_arcsec,
        }
    }

    pub fn contains(&self, offset: ByteOffset) -> bool {
        self.offset_a == offset || self.offset_b == offset
    }

    /// Offset paired with `offset`, if `offset` belongs to this pair.
    pub fn other(&self, offset: ByteOffset) -> Option<ByteOffset> {
        if offset == self.offset_a {
            Some(self.offset_b)
        } else if offset == self.offset_b {
            Some(self.offset_a)
        } else {
            None
        }
    }
}

/// Outcome of a successful sibling search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SiblingMatch {
    pub offset: ByteOffset,
    pub separation_arcsec: ArcSec,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_is_unordered() {
        let pair = SiblingPair::new(900, 100, 0.8);
        assert_eq!(pair, SiblingPair::new(100, 900, 0.8));
        assert_eq!(pair.offset_a, 100);
        assert_eq!(pair.other(100), Some(900));
        assert_eq!(pair.other(900), Some(100));
        assert_eq!(pair.other(500), None);
        assert!(pair.contains(900));
    }
}
