//! # Constants and type definitions for lcindex
//!
//! This module centralizes the **unit conversions**, **default tolerances**, **artifact naming**
//! and **common type aliases** used throughout the crate.
//!
//! ## Overview
//!
//! - Angle conversions (degrees ↔ radians ↔ arcseconds)
//! - Default sibling matching tolerance
//! - Photometric zero point used for magnitude ↔ flux conversions
//! - File extensions of the persisted artifacts derived from a raw lightcurve file
//! - Measurement channel (band) identifiers

// -------------------------------------------------------------------------------------------------
// Unit conversions
// -------------------------------------------------------------------------------------------------

/// Arcseconds per degree
pub const ARCSEC_PER_DEG: f64 = 3600.0;

/// Degrees → radians
pub const RADEG: f64 = std::f64::consts::PI / 180.0;

/// Arcseconds → radians
pub const RADSEC: f64 = std::f64::consts::PI / 648000.0;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in degrees
pub type Degree = f64;
/// Angle in arcseconds
pub type ArcSec = f64;
/// Angle in radians
pub type Radian = f64;
/// Heliocentric Modified Julian Date (days)
pub type HMJD = f64;
/// Byte position of a record header inside its raw lightcurve file
pub type ByteOffset = u64;

// -------------------------------------------------------------------------------------------------
// Matching and photometry defaults
// -------------------------------------------------------------------------------------------------

/// Default angular tolerance for sibling matching, in arcseconds.
pub const DEFAULT_TOLERANCE_ARCSEC: ArcSec = 2.0;

/// Photometric zero point used by the magnitude ↔ flux conversions.
pub const DEFAULT_ZERO_POINT: f64 = 22.0;

// -------------------------------------------------------------------------------------------------
// Measurement channels
// -------------------------------------------------------------------------------------------------

/// Band identifier of the g filter.
pub const BAND_G: u8 = 1;
/// Band identifier of the r filter.
pub const BAND_R: u8 = 2;
/// Band identifier of the i filter.
pub const BAND_I: u8 = 3;

// -------------------------------------------------------------------------------------------------
// Artifact naming
// -------------------------------------------------------------------------------------------------

/// Extension of the Object Index file.
pub const OBJECTS_EXTENSION: &str = "objects";
/// Extension of the Spatial Index file.
pub const RADEC_MAP_EXTENSION: &str = "radec_map";
/// Extension of the Sibling Cache file.
pub const SIBLINGS_EXTENSION: &str = "siblings";
/// Extension of the advisory lock file guarding the Sibling Cache.
pub const SIBLINGS_LOCK_EXTENSION: &str = "siblings.lock";
