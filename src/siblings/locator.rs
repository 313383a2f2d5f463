//! # Sibling Locator
//!
//! Pairs a record with the closest record of the complementary band in the same sensor channel.
//!
//! ## Overview
//! -----------------
//! [`SiblingLocator::locate_sibling`]:
//! 1. returns the cached pair if the [`SiblingCache`] already knows the record,
//! 2. otherwise queries the [`NeighborSearch`] in the partition
//!    `(record.sensor_channel, complement(record.measurement_channel))` around the record's own
//!    coordinates,
//! 3. on a match, stores the pair in the cache and returns what the cache kept.
//!
//! A record without a sibling is a normal outcome (`Ok(None)`); nothing is cached for it.
//! Every offset belongs to at most one pair, and the first pair stored wins.
//!
//! ## See also
//! ------------
//! * [`crate::spatial::SpatialIndex`] – the production [`NeighborSearch`].
//! * [`crate::records::complementary_channel`] – band pairing.
use tracing::{debug, info};

use crate::constants::ArcSec;
use crate::lcindex_errors::LcIndexError;
use crate::records::Record;
use crate::spatial::NeighborSearch;

use super::cache::SiblingCache;
use super::{SiblingMatch, SiblingPair};

pub struct SiblingLocator<'a, S: NeighborSearch> {
    search: &'a S,
    cache: &'a SiblingCache,
    tolerance_arcsec: ArcSec,
}

impl<'a, S: NeighborSearch> SiblingLocator<'a, S> {
    pub fn new(search: &'a S, cache: &'a SiblingCache, tolerance_arcsec: ArcSec) -> Self {
        SiblingLocator {
            search,
            cache,
            tolerance_arcsec,
        }
    }

    pub fn tolerance_arcsec(&self) -> ArcSec {
        self.tolerance_arcsec
    }

    /// Find (or recall) the sibling of `record`.
    ///
    /// Arguments
    /// -----------------
    /// * `record` – Record whose sibling is searched.
    ///
    /// Return
    /// ----------
    /// * `Ok(Some(SiblingMatch))` with the sibling offset and separation, as stored in the cache,
    /// * `Ok(None)` when no record of the complementary band lies within tolerance, the record's
    ///   band has no complement, or the closest candidate is already paired with another record,
    /// * `Err` if the cache cannot be read or written.
    ///
    /// Notes
    /// ----------
    /// * A cached pair is only returned if its separation is within this locator's tolerance; a
    ///   pair found with a wider tolerance stays in the cache but yields `Ok(None)` here.
    /// * The first pair stored for an offset is final. When the closest candidate already belongs
    ///   to another pair, that pair is kept and `record` gets no sibling.
    pub fn locate_sibling(&self, record: &Record) -> Result<Option<SiblingMatch>, LcIndexError> {
        if let Some(pair) = self.cache.lookup(record.offset)? {
            debug!(offset = record.offset, "sibling cache hit");
            return Ok(self.within_tolerance(&pair, record));
        }

        let Some(partition) = record.sibling_partition_key() else {
            debug!(
                offset = record.offset,
                band = record.measurement_channel,
                "band has no complementary channel"
            );
            return Ok(None);
        };

        let Some(neighbor) =
            self.search
                .find_within(partition, record.ra, record.dec, self.tolerance_arcsec)
        else {
            debug!(offset = record.offset, %partition, "no sibling found");
            return Ok(None);
        };

        let stored = self.cache.store(SiblingPair::new(
            record.offset,
            neighbor.offset,
            neighbor.separation_arcsec,
        ))?;
        if !stored.contains(record.offset) {
            debug!(
                offset = record.offset,
                candidate = neighbor.offset,
                "closest candidate already paired"
            );
            return Ok(None);
        }
        info!(
            object_id = record.object_id,
            offset = record.offset,
            sibling = neighbor.offset,
            ra = neighbor.ra,
            dec = neighbor.dec,
            "sibling found"
        );

        Ok(self.within_tolerance(&stored, record))
    }

    fn within_tolerance(&self, pair: &SiblingPair, record: &Record) -> Option<SiblingMatch> {
        let offset = pair.other(record.offset)?;
        (pair.separation_arcsec <= self.tolerance_arcsec).then_some(SiblingMatch {
            offset,
            separation_arcsec: pair.separation_arcsec,
        })
    }
}
