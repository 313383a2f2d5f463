//! # Index configuration
//!
//! This module defines [`IndexConfig`](crate::config::IndexConfig), the **explicit configuration
//! value** passed to every build and query entry point of the crate. It replaces any notion of a
//! process-wide data directory: two configurations can coexist in the same process and point at
//! different artifact locations.
//!
//! ## Overview
//!
//! An [`IndexConfig`] decides:
//!
//! 1. **Where artifacts live.** By default the Object Index, Spatial Index and Sibling Cache are
//!    written next to the raw lightcurve file, replacing its extension. With
//!    [`IndexConfig::with_index_dir`] they are written into a dedicated directory instead.
//! 2. **The sibling matching tolerance**, in arcseconds (default
//!    [`DEFAULT_TOLERANCE_ARCSEC`](crate::constants::DEFAULT_TOLERANCE_ARCSEC)).
//! 3. **Whether lightcurves are quality-masked** when read (epochs with non-zero catalog flags dropped).
//!
//! ## Structure
//!
//! ```text
//! IndexConfig
//! ├── index_dir           (Option<Utf8PathBuf>)
//! ├── tolerance_arcsec    (ArcSec)
//! └── apply_quality_mask  (bool)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use lcindex::config::IndexConfig;
//! use camino::Utf8Path;
//!
//! let config = IndexConfig::default().with_tolerance_arcsec(1.5);
//! let objects = config.objects_path(Utf8Path::new("data/field000245_ra1to2_dec3to4.txt"));
//! assert_eq!(objects.as_str(), "data/field000245_ra1to2_dec3to4.objects");
//! ```
use camino::{Utf8Path, Utf8PathBuf};

use crate::constants::{
    ArcSec, DEFAULT_TOLERANCE_ARCSEC, OBJECTS_EXTENSION, RADEC_MAP_EXTENSION,
    SIBLINGS_EXTENSION, SIBLINGS_LOCK_EXTENSION,
};
use crate::lcindex_errors::LcIndexError;

/// Explicit configuration shared by the build and query entry points.
///
/// # Fields
///
/// * `index_dir` - Directory receiving the derived artifacts, or `None` to write them beside the raw file
/// * `tolerance_arcsec` - Default angular tolerance used by sibling matching
/// * `apply_quality_mask` - Drop epochs with non-zero catalog flags when reading lightcurves
#[derive(Debug, Clone, PartialEq)]
pub struct IndexConfig {
    pub index_dir: Option<Utf8PathBuf>,
    pub tolerance_arcsec: ArcSec,
    pub apply_quality_mask: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        IndexConfig {
            index_dir: None,
            tolerance_arcsec: DEFAULT_TOLERANCE_ARCSEC,
            apply_quality_mask: true,
        }
    }
}

impl IndexConfig {
    /// Configuration writing every artifact into `dir`.
    pub fn from_data_dir(dir: impl Into<Utf8PathBuf>) -> Self {
        IndexConfig::default().with_index_dir(dir)
    }

    pub fn with_index_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.index_dir = Some(dir.into());
        self
    }

    pub fn with_tolerance_arcsec(mut self, tolerance: ArcSec) -> Self {
        self.tolerance_arcsec = tolerance;
        self
    }

    pub fn with_quality_mask(mut self, apply: bool) -> Self {
        self.apply_quality_mask = apply;
        self
    }

    /// Reject tolerances that cannot bound a search window.
    pub fn validate(&self) -> Result<(), LcIndexError> {
        if !self.tolerance_arcsec.is_finite() || self.tolerance_arcsec <= 0.0 {
            return Err(LcIndexError::InvalidConfig(format!(
                "tolerance must be a positive number of arcseconds, got {}",
                self.tolerance_arcsec
            )));
        }
        Ok(())
    }

    /// Path of the Object Index derived from `raw_file`.
    pub fn objects_path(&self, raw_file: &Utf8Path) -> Utf8PathBuf {
        self.artifact_path(raw_file, OBJECTS_EXTENSION)
    }

    /// Path of the Spatial Index derived from `raw_file`.
    pub fn radec_map_path(&self, raw_file: &Utf8Path) -> Utf8PathBuf {
        self.artifact_path(raw_file, RADEC_MAP_EXTENSION)
    }

    /// Path of the Sibling Cache derived from `raw_file`.
    pub fn siblings_path(&self, raw_file: &Utf8Path) -> Utf8PathBuf {
        self.artifact_path(raw_file, SIBLINGS_EXTENSION)
    }

    /// Path of the advisory lock file guarding the Sibling Cache.
    pub fn siblings_lock_path(&self, raw_file: &Utf8Path) -> Utf8PathBuf {
        self.artifact_path(raw_file, SIBLINGS_LOCK_EXTENSION)
    }

    fn artifact_path(&self, raw_file: &Utf8Path, extension: &str) -> Utf8PathBuf {
        let stem = raw_file.file_stem().unwrap_or(raw_file.as_str());
        let file_name = format!("{stem}.{extension}");
        match &self.index_dir {
            Some(dir) => dir.join(file_name),
            None => raw_file.with_file_name(file_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_paths_beside_raw_file() {
        let config = IndexConfig::default();
        let raw = Utf8Path::new("/data/field000245_ra357to5_dec-30to-22.txt");

        assert_eq!(
            config.objects_path(raw),
            "/data/field000245_ra357to5_dec-30to-22.objects"
        );
        assert_eq!(
            config.radec_map_path(raw),
            "/data/field000245_ra357to5_dec-30to-22.radec_map"
        );
        assert_eq!(
            config.siblings_lock_path(raw),
            "/data/field000245_ra357to5_dec-30to-22.siblings.lock"
        );
    }

    #[test]
    fn test_artifact_paths_in_index_dir() {
        let config = IndexConfig::from_data_dir("/scratch/index");
        let raw = Utf8Path::new("/data/field000245.txt");
        assert_eq!(config.siblings_path(raw), "/scratch/index/field000245.siblings");
    }

    #[test]
    fn test_validate_tolerance() {
        assert!(IndexConfig::default().validate().is_ok());
        assert!(matches!(
            IndexConfig::default().with_tolerance_arcsec(0.0).validate(),
            Err(LcIndexError::InvalidConfig(_))
        ));
        assert!(IndexConfig::default()
            .with_tolerance_arcsec(f64::NAN)
            .validate()
            .is_err());
    }
}
