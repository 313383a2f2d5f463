//! # lcindex
//!
//! Indexing and sibling matching for photometric lightcurve files.
//!
//! A raw lightcurve file is a plain-text concatenation of records, each made of a `#` header line
//! (object id, epoch count, band, field, sensor channel, RA, Dec) followed by its time series.
//! This crate derives two persistent indexes from such a file and uses them to pair every record
//! with its **sibling**, the record of the complementary band (g ↔ r) observed at the same sky
//! position by the same sensor channel.
//!
//! ## Overview
//! -----------------
//! * [`indexing::build`] scans a raw file once and commits the Object Index
//!   ([`records::object_index`]) and the Spatial Index ([`spatial`]).
//! * [`lightcurve_file::LightcurveFile`] loads both indexes and offers iteration, lazy
//!   lightcurve reads, positional lookups and [`locate_sibling`](lightcurve_file::LightcurveFile::locate_sibling).
//! * Discovered pairs are persisted in a per-file [`siblings::cache::SiblingCache`] that many
//!   processes may update concurrently.
//!
//! Every entry point takes an explicit [`config::IndexConfig`]; there is no global state.
pub mod artifact;
pub mod config;
pub mod constants;
pub mod indexing;
pub mod lcindex_errors;
pub mod lightcurve_file;
pub mod photometry;
pub mod records;
pub mod siblings;
pub mod spatial;

pub use config::IndexConfig;
pub use indexing::{build, BuildSummary};
pub use lcindex_errors::LcIndexError;
pub use lightcurve_file::LightcurveFile;
pub use records::Record;
