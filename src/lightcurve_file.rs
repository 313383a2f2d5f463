//! # Lightcurve file: indexes, iteration and matching
//!
//! [`LightcurveFile`] is the read side of the crate: it loads the Object Index and Spatial Index of
//! one raw file (built beforehand with [`crate::indexing::build`]) and offers
//!
//! 1. **Iteration** over records in file order, optionally restricted to sensor channels or
//!    strided by `(rank, size)` so that cooperating processes split the work,
//! 2. **Lazy lightcurves** read from the raw file only for records that pass a caller filter,
//! 3. **Sibling location** backed by the on-disk Sibling Cache,
//! 4. **Positional lookup** of every record (any band) around a sky position, and assembly of a
//!    [`Source`] holding the closest record per band.
//!
//! Nothing here writes an index; only the Sibling Cache is updated, under its lock.
//!
//! ## Example
//! -----------------
//! ```no_run
//! use camino::Utf8Path;
//! use lcindex::config::IndexConfig;
//! use lcindex::indexing::build;
//! use lcindex::lightcurve_file::LightcurveFile;
//!
//! # fn demo() -> Result<(), lcindex::lcindex_errors::LcIndexError> {
//! let raw = Utf8Path::new("field000245_ra357to5_dec-30to-22.txt");
//! let config = IndexConfig::default();
//! build(raw, &config)?;
//!
//! let file = LightcurveFile::open(raw, config)?;
//! for item in file.lightcurves(|r| r.epoch_count >= 20) {
//!     let (record, lightcurve) = item?;
//!     if lightcurve.magnitude_std().unwrap_or(0.0) > 0.5 {
//!         if let Some(sibling) = file.locate_sibling(record)? {
//!             println!("{} ↔ {}", record.offset, sibling.offset);
//!         }
//!     }
//! }
//! # Ok(()) }
//! ```
use std::collections::BTreeMap;

use camino::{Utf8Path, Utf8PathBuf};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::IndexConfig;
use crate::constants::{ArcSec, ByteOffset, Degree};
use crate::lcindex_errors::LcIndexError;
use crate::records::accessor::read_record;
use crate::records::lightcurve::Lightcurve;
use crate::records::object_index::ObjectIndex;
use crate::records::{PartitionKey, Record};
use crate::siblings::cache::SiblingCache;
use crate::siblings::locator::SiblingLocator;
use crate::siblings::SiblingMatch;
use crate::spatial::SpatialIndex;

static FIELD_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^field(\d+)").unwrap_or_else(|e| panic!("invalid field id pattern: {e}"))
});

/// Field identifier encoded in a `field<NNNNNN>_...` file name.
pub fn field_id_from_filename(raw_file: &Utf8Path) -> Option<u32> {
    let name = raw_file.file_name()?;
    FIELD_ID_RE
        .captures(name)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Closest record per band around a sky position.
#[derive(Debug, Clone, PartialEq)]
pub struct Source<'a> {
    pub records: BTreeMap<u8, &'a Record>,
}

impl<'a> Source<'a> {
    pub fn band(&self, measurement_channel: u8) -> Option<&'a Record> {
        self.records.get(&measurement_channel).copied()
    }
}

#[derive(Debug)]
pub struct LightcurveFile {
    raw_file: Utf8PathBuf,
    config: IndexConfig,
    objects: ObjectIndex,
    spatial: SpatialIndex,
    siblings: SiblingCache,
}

impl LightcurveFile {
    /// Load the indexes of `raw_file`.
    ///
    /// Return
    /// ----------
    /// * [`LcIndexError::IndexMissing`] / [`LcIndexError::IndexCorrupt`] if either index is absent
    ///   or unreadable, or if the two indexes do not describe the same records; the caller must
    ///   rebuild them.
    pub fn open(raw_file: &Utf8Path, config: IndexConfig) -> Result<LightcurveFile, LcIndexError> {
        config.validate()?;
        let objects_path = config.objects_path(raw_file);
        let radec_map_path = config.radec_map_path(raw_file);
        let objects = ObjectIndex::load(&objects_path, raw_file)?;
        let spatial = SpatialIndex::load(&radec_map_path)?;
        spatial
            .verify_against(&objects)
            .map_err(|reason| LcIndexError::corrupt(radec_map_path.clone(), reason))?;
        let siblings = SiblingCache::for_raw_file(&config, raw_file);
        Ok(LightcurveFile {
            raw_file: raw_file.to_path_buf(),
            config,
            objects,
            spatial,
            siblings,
        })
    }

    pub fn raw_file(&self) -> &Utf8Path {
        &self.raw_file
    }

    pub fn field_id(&self) -> Option<u32> {
        field_id_from_filename(&self.raw_file)
    }

    pub fn objects(&self) -> &ObjectIndex {
        &self.objects
    }

    pub fn spatial(&self) -> &SpatialIndex {
        &self.spatial
    }

    pub fn sibling_cache(&self) -> &SiblingCache {
        &self.siblings
    }

    pub fn records(&self) -> &[Record] {
        self.objects.records()
    }

    pub fn record_at(&self, offset: ByteOffset) -> Option<&Record> {
        self.objects.get(offset)
    }

    /// Every `size`-th record starting at `rank`, in file order.
    pub fn records_for_rank(
        &self,
        rank: usize,
        size: usize,
    ) -> Result<impl Iterator<Item = &Record>, LcIndexError> {
        if size == 0 || rank >= size {
            return Err(LcIndexError::InvalidConfig(format!(
                "rank {rank} is not within a process group of size {size}"
            )));
        }
        Ok(self.records().iter().skip(rank).step_by(size))
    }

    /// Records observed through one of `sensor_channels`, in file order.
    pub fn records_in_sensor_channels<'a>(
        &'a self,
        sensor_channels: &'a [u8],
    ) -> impl Iterator<Item = &'a Record> + 'a {
        self.records()
            .iter()
            .filter(move |r| sensor_channels.contains(&r.sensor_channel))
    }

    /// Time series of `record`, quality-masked when the configuration asks for it.
    ///
    /// The header found at `record.offset` must still be `record`; otherwise the raw file changed
    /// after the build and [`LcIndexError::IndexCorrupt`] is returned.
    pub fn read_lightcurve(&self, record: &Record) -> Result<Lightcurve, LcIndexError> {
        let (header, lightcurve) = read_record(&self.raw_file, record.offset, record.epoch_count)?;
        if header != *record {
            return Err(LcIndexError::corrupt(
                self.config.objects_path(&self.raw_file),
                format!(
                    "record {} at offset {} no longer matches the raw file",
                    record.object_id, record.offset
                ),
            ));
        }
        if self.config.apply_quality_mask {
            Ok(lightcurve.quality_masked())
        } else {
            Ok(lightcurve)
        }
    }

    /// Lightcurves of the records accepted by `filter`, read lazily in file order.
    pub fn lightcurves<'a, F>(
        &'a self,
        mut filter: F,
    ) -> impl Iterator<Item = Result<(&'a Record, Lightcurve), LcIndexError>> + 'a
    where
        F: FnMut(&Record) -> bool + 'a,
    {
        self.records()
            .iter()
            .filter(move |r| filter(r))
            .map(move |r| self.read_lightcurve(r).map(|lc| (r, lc)))
    }

    /// Sibling of `record` with the configured tolerance.
    pub fn locate_sibling(&self, record: &Record) -> Result<Option<SiblingMatch>, LcIndexError> {
        self.locate_sibling_with_tolerance(record, self.config.tolerance_arcsec)
    }

    pub fn locate_sibling_with_tolerance(
        &self,
        record: &Record,
        tolerance_arcsec: ArcSec,
    ) -> Result<Option<SiblingMatch>, LcIndexError> {
        SiblingLocator::new(&self.spatial, &self.siblings, tolerance_arcsec).locate_sibling(record)
    }

    /// Sibling of `record` resolved to its [`Record`].
    pub fn sibling_record(&self, record: &Record) -> Result<Option<&Record>, LcIndexError> {
        Ok(self
            .locate_sibling(record)?
            .and_then(|m| self.objects.get(m.offset)))
    }

    /// Every record of `sensor_channel`, in any band, within `radius_arcsec` of `(ra, dec)`.
    ///
    /// Results are grouped by band, closest first within a band.
    pub fn locate_objects_by_radec(
        &self,
        ra: Degree,
        dec: Degree,
        sensor_channel: u8,
        radius_arcsec: ArcSec,
    ) -> Vec<&Record> {
        self.bands_of(sensor_channel)
            .flat_map(|key| self.spatial.within(key, ra, dec, radius_arcsec))
            .filter_map(|n| self.objects.get(n.offset))
            .collect()
    }

    /// Closest record per band within `radius_arcsec`, or `None` if no band has one.
    pub fn locate_source_by_radec(
        &self,
        ra: Degree,
        dec: Degree,
        sensor_channel: u8,
        radius_arcsec: ArcSec,
    ) -> Option<Source<'_>> {
        let records: BTreeMap<u8, &Record> = self
            .bands_of(sensor_channel)
            .filter_map(|key| {
                self.spatial
                    .within(key, ra, dec, radius_arcsec)
                    .first()
                    .and_then(|n| self.objects.get(n.offset))
                    .map(|r| (key.measurement_channel, r))
            })
            .collect();
        (!records.is_empty()).then_some(Source { records })
    }

    fn bands_of(&self, sensor_channel: u8) -> impl Iterator<Item = PartitionKey> + '_ {
        self.spatial
            .partitions()
            .keys()
            .copied()
            .filter(move |k| k.sensor_channel == sensor_channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_id_from_filename() {
        assert_eq!(
            field_id_from_filename(Utf8Path::new("/data/field000245_ra357to5_dec-30to-22.txt")),
            Some(245)
        );
        assert_eq!(field_id_from_filename(Utf8Path::new("lightcurves.txt")), None);
    }
}
