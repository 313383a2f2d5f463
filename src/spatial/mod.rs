//! # Spatial Index
//!
//! One right-ascension search tree per [`PartitionKey`] (sensor channel × measurement channel),
//! answering “closest record within a tolerance” queries without scanning a partition.
//!
//! ## Query outline
//! -----------------
//! 1. Missing or empty partition → not found.
//! 2. The tolerance is turned into a right-ascension window around the target (wider near the
//!    poles, see [`sky::ra_half_window`]); windows crossing 0°/360° are split in two.
//! 3. Each window is answered by a pruned descent of the partition tree.
//! 4. Candidates outside `|Δdec| ≤ tolerance` are dropped, the rest are measured with the
//!    great-circle separation and kept if within tolerance.
//! 5. The closest candidate wins; equal separations resolve to the lowest offset.
//!
//! ## Submodules
//! -----------------
//! * [`tree`] – arena search tree and its median construction.
//! * [`sky`] – angular separation and window helpers.
//! * [`store`] – binary persistence of the whole index.
pub mod sky;
pub mod store;
pub mod tree;

use std::collections::BTreeMap;

use ordered_float::OrderedFloat;
use tracing::debug;

use crate::constants::{ArcSec, ByteOffset, Degree, ARCSEC_PER_DEG};
use crate::records::object_index::ObjectIndex;
use crate::records::PartitionKey;
use sky::{angular_separation_arcsec, ra_half_window, ra_intervals};
use tree::RaTree;

/// A record found by a spatial query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub offset: ByteOffset,
    pub ra: Degree,
    pub dec: Degree,
    pub separation_arcsec: ArcSec,
}

/// Nearest-neighbor-within-tolerance search over partitioned sky positions.
///
/// Implemented by [`SpatialIndex`]; the sibling locator only depends on this trait.
pub trait NeighborSearch {
    /// Closest point of `partition` within `tolerance_arcsec` of `(ra, dec)`.
    fn find_within(
        &self,
        partition: PartitionKey,
        ra: Degree,
        dec: Degree,
        tolerance_arcsec: ArcSec,
    ) -> Option<Neighbor>;
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpatialIndex {
    partitions: BTreeMap<PartitionKey, RaTree>,
}

impl SpatialIndex {
    /// Build one tree per partition of `index`.
    pub fn build(index: &ObjectIndex) -> SpatialIndex {
        let partitions: BTreeMap<PartitionKey, RaTree> = index
            .partitions()
            .into_iter()
            .map(|(key, records)| {
                let points = records.iter().map(|r| (r.offset, r.ra, r.dec)).collect();
                (key, RaTree::build(points))
            })
            .collect();
        debug!(
            partitions = partitions.len(),
            records = index.len(),
            "spatial index built"
        );
        SpatialIndex { partitions }
    }

    /// Index made of already built trees, one per partition.
    pub fn from_partitions(partitions: BTreeMap<PartitionKey, RaTree>) -> SpatialIndex {
        SpatialIndex { partitions }
    }

    pub fn partitions(&self) -> &BTreeMap<PartitionKey, RaTree> {
        &self.partitions
    }

    pub fn partition(&self, key: PartitionKey) -> Option<&RaTree> {
        self.partitions.get(&key)
    }

    /// Check that the index describes exactly the records of `objects`.
    ///
    /// Every node must be a record of `objects`, filed under that record's partition at the same
    /// position, and every record must be indexed once. A mismatch means the two artifacts come
    /// from different builds.
    pub fn verify_against(&self, objects: &ObjectIndex) -> Result<(), String> {
        let indexed: usize = self.partitions.values().map(RaTree::len).sum();
        if indexed != objects.len() {
            return Err(format!(
                "{indexed} indexed points for {} records",
                objects.len()
            ));
        }
        for (key, tree) in &self.partitions {
            for node in tree.nodes() {
                match objects.get(node.offset) {
                    Some(r) if r.partition_key() == *key && r.ra == node.ra && r.dec == node.dec => {}
                    _ => {
                        return Err(format!(
                            "offset {} of {key} matches no record of the object index",
                            node.offset
                        ))
                    }
                }
            }
        }
        Ok(())
    }

    /// Every point of `partition` within `tolerance_arcsec` of `(ra, dec)`, closest first,
    /// equal separations ordered by offset.
    pub fn within(
        &self,
        partition: PartitionKey,
        ra: Degree,
        dec: Degree,
        tolerance_arcsec: ArcSec,
    ) -> Vec<Neighbor> {
        let Some(tree) = self.partitions.get(&partition).filter(|t| !t.is_empty()) else {
            return Vec::new();
        };

        let dec_tolerance = tolerance_arcsec / ARCSEC_PER_DEG;
        let mut found: Vec<Neighbor> = Vec::new();
        for (lo, hi) in ra_intervals(ra, ra_half_window(dec, tolerance_arcsec)) {
            tree.range(lo, hi, |node| {
                if (node.dec - dec).abs() > dec_tolerance {
                    return;
                }
                let separation_arcsec = angular_separation_arcsec(ra, dec, node.ra, node.dec);
                if separation_arcsec <= tolerance_arcsec {
                    found.push(Neighbor {
                        offset: node.offset,
                        ra: node.ra,
                        dec: node.dec,
                        separation_arcsec,
                    });
                }
            });
        }

        found.sort_by_key(|n| (OrderedFloat(n.separation_arcsec), n.offset));
        found.dedup_by_key(|n| n.offset);
        found
    }
}

impl NeighborSearch for SpatialIndex {
    fn find_within(
        &self,
        partition: PartitionKey,
        ra: Degree,
        dec: Degree,
        tolerance_arcsec: ArcSec,
    ) -> Option<Neighbor> {
        self.within(partition, ra, dec, tolerance_arcsec)
            .into_iter()
            .next()
    }
}
