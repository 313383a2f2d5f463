//! Index build entry point.
//!
//! [`build`] turns one raw lightcurve file into its Object Index and Spatial Index. Builds of
//! different raw files share nothing, so a batch driver may run them in as many processes as it
//! likes; how files are distributed is its own business.
use camino::{Utf8Path, Utf8PathBuf};
use tracing::{info, info_span};

use crate::config::IndexConfig;
use crate::lcindex_errors::LcIndexError;
use crate::records::object_index::ObjectIndex;
use crate::siblings::cache::SiblingCache;
use crate::spatial::SpatialIndex;

/// What a successful [`build`] produced.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildSummary {
    pub records: usize,
    pub partitions: usize,
    pub objects_path: Utf8PathBuf,
    pub radec_map_path: Utf8PathBuf,
}

/// Build (or rebuild) every index of `raw_file`.
///
/// Arguments
/// -----------------
/// * `raw_file` – Raw lightcurve file.
/// * `config` – Artifact location and defaults.
///
/// Return
/// ----------
/// * A [`BuildSummary`] once both indexes are committed.
/// * [`LcIndexError::Format`] if the raw file is malformed; nothing is written in that case.
/// * I/O errors while staging either index; the previous indexes are then left in place.
///
/// Notes
/// ----------
/// * The Sibling Cache of a previous build is dropped first, since its offsets may no longer be
///   valid, and again once the new indexes are visible so that pairs stored meanwhile against
///   the old indexes do not survive.
/// * Both indexes are written in full to temporary files before either is renamed into place,
///   the Spatial Index first. [`LightcurveFile::open`](crate::lightcurve_file::LightcurveFile::open)
///   refuses a pair of artifacts that do not describe the same records.
pub fn build(raw_file: &Utf8Path, config: &IndexConfig) -> Result<BuildSummary, LcIndexError> {
    let _span = info_span!("build_index", raw_file = %raw_file).entered();
    config.validate()?;

    let objects = ObjectIndex::build(raw_file)?;
    let spatial = SpatialIndex::build(&objects);

    if let Some(dir) = &config.index_dir {
        std::fs::create_dir_all(dir)?;
    }

    let siblings = SiblingCache::for_raw_file(config, raw_file);
    siblings.invalidate()?;

    let objects_path = config.objects_path(raw_file);
    let radec_map_path = config.radec_map_path(raw_file);
    let staged_objects = objects.stage(&objects_path)?;
    let staged_radec = spatial.stage(&radec_map_path)?;

    staged_radec.commit()?;
    staged_objects.commit()?;
    siblings.invalidate()?;

    info!(
        records = objects.len(),
        partitions = spatial.partitions().len(),
        "index build complete"
    );

    Ok(BuildSummary {
        records: objects.len(),
        partitions: spatial.partitions().len(),
        objects_path,
        radec_map_path,
    })
}
