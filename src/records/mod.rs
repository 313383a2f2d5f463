//! # Records of a lightcurve file
//!
//! A raw lightcurve file is a sequence of **records** (one per object): a `#`-prefixed header line
//! followed by `epoch_count` data lines. This module defines the typed [`Record`] extracted from a
//! header, the [`PartitionKey`] used to split records into spatial partitions, and the submodules
//! that read and persist records.
//!
//! ## Header layout
//! -----------------
//! Whitespace-separated fields after the leading `#`:
//!
//! ```text
//! # object_id epoch_count measurement_channel field_id sensor_channel ra dec
//! # 245101100000001 22 1 245 0 4.74852 -26.23583
//! ```
//!
//! ## Submodules
//! -----------------
//! * [`scanner`] – single forward pass over a raw file, yielding records with their byte offsets.
//! * [`object_index`] – persisted table of records (build, write, load).
//! * [`accessor`] – seek-and-parse of one record and its time series.
//! * [`lightcurve`] – the time series itself.
//!
//! Filtering is done with ordinary closures over these typed values:
//!
//! ```rust,ignore
//! let bright_g: Vec<&Record> = index
//!     .records()
//!     .iter()
//!     .filter(|r| r.measurement_channel == BAND_G && r.epoch_count >= 20)
//!     .collect();
//! ```
pub mod accessor;
pub mod lightcurve;
pub mod object_index;
pub mod scanner;

use serde::{Deserialize, Serialize};

use crate::constants::{ByteOffset, Degree, BAND_G, BAND_I, BAND_R};
use crate::lcindex_errors::ParseHeaderError;

/// One object of a lightcurve file: header metadata plus the byte offset of its header line.
///
/// The serialized field order is the column order of the Object Index table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub object_id: u64,
    pub epoch_count: u32,
    pub measurement_channel: u8,
    pub field_id: u32,
    pub sensor_channel: u8,
    pub ra: Degree,
    pub dec: Degree,
    pub offset: ByteOffset,
}

/// Spatial partition a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartitionKey {
    pub sensor_channel: u8,
    pub measurement_channel: u8,
}

impl PartitionKey {
    pub fn new(sensor_channel: u8, measurement_channel: u8) -> Self {
        PartitionKey {
            sensor_channel,
            measurement_channel,
        }
    }
}

impl std::fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "sensor {} / band {}",
            self.sensor_channel, self.measurement_channel
        )
    }
}

/// Band holding the sibling of a record observed in `measurement_channel`.
///
/// Only g and r are paired; any other band has no sibling.
pub fn complementary_channel(measurement_channel: u8) -> Option<u8> {
    match measurement_channel {
        BAND_G => Some(BAND_R),
        BAND_R => Some(BAND_G),
        _ => None,
    }
}

/// Single-letter filter name of a band, if known.
pub fn band_name(measurement_channel: u8) -> Option<char> {
    match measurement_channel {
        BAND_G => Some('g'),
        BAND_R => Some('r'),
        BAND_I => Some('i'),
        _ => None,
    }
}

impl Record {
    pub fn partition_key(&self) -> PartitionKey {
        PartitionKey::new(self.sensor_channel, self.measurement_channel)
    }

    /// Partition in which this record's sibling would be indexed.
    pub fn sibling_partition_key(&self) -> Option<PartitionKey> {
        complementary_channel(self.measurement_channel)
            .map(|band| PartitionKey::new(self.sensor_channel, band))
    }

    pub fn band_name(&self) -> Option<char> {
        band_name(self.measurement_channel)
    }

    /// Parse a header line located at `offset`.
    ///
    /// Arguments
    /// -----------------
    /// * `line` – The header line, with or without its trailing newline.
    /// * `offset` – Byte position of the first byte of `line` in the raw file.
    ///
    /// Return
    /// ----------
    /// * The parsed [`Record`], or a [`ParseHeaderError`] describing the first offending field.
    pub fn from_header_line(line: &str, offset: ByteOffset) -> Result<Record, ParseHeaderError> {
        let body = line
            .trim_start()
            .strip_prefix('#')
            .ok_or(ParseHeaderError::NotAHeader)?;

        let fields: Vec<&str> = body.split_whitespace().collect();
        if fields.len() != 7 {
            return Err(ParseHeaderError::WrongFieldCount(fields.len()));
        }

        Ok(Record {
            object_id: parse_integer("object_id", fields[0])?,
            epoch_count: parse_integer("epoch_count", fields[1])?,
            measurement_channel: parse_integer("measurement_channel", fields[2])?,
            field_id: parse_integer("field_id", fields[3])?,
            sensor_channel: parse_integer("sensor_channel", fields[4])?,
            ra: parse_coordinate("ra", fields[5])?,
            dec: parse_coordinate("dec", fields[6])?,
            offset,
        })
    }
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Offset: {}", self.offset)?;
        writeln!(f, "Object ID: {}", self.object_id)?;
        match self.band_name() {
            Some(name) => writeln!(f, "Color: {name}")?,
            None => writeln!(f, "Band: {}", self.measurement_channel)?,
        }
        writeln!(f, "Ra/Dec: ({:.5}, {:.5})", self.ra, self.dec)?;
        write!(f, "{} Epochs", self.epoch_count)
    }
}

fn parse_integer<T: std::str::FromStr>(
    field: &'static str,
    value: &str,
) -> Result<T, ParseHeaderError> {
    value
        .parse::<T>()
        .map_err(|_| ParseHeaderError::InvalidInteger {
            field,
            value: value.to_string(),
        })
}

fn parse_coordinate(field: &'static str, value: &str) -> Result<Degree, ParseHeaderError> {
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(ParseHeaderError::InvalidCoordinate {
            field,
            value: value.to_string(),
        }),
    }
}
