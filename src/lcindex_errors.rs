use camino::Utf8PathBuf;
use thiserror::Error;

use crate::constants::ByteOffset;

/// Line-level parsing errors for raw lightcurve files.
///
/// Variants
/// -----------------
/// * `NotAHeader` – A record header was expected but the line does not start with `#`.
/// * `InvalidUtf8` – The line is not valid UTF-8.
/// * `WrongFieldCount` – The header does not carry exactly seven fields; payload is the count found.
/// * `InvalidInteger` – An identifier field could not be parsed as an integer.
/// * `InvalidCoordinate` – RA or Dec could not be parsed as a finite number.
/// * `UnexpectedHeader` – A header line appeared where a data line was expected.
/// * `TruncatedBody` – The file ended before the declared number of data lines.
#[derive(Error, Debug, PartialEq)]
pub enum ParseHeaderError {
    #[error("The line is not a record header")]
    NotAHeader,
    #[error("The line is not valid UTF-8")]
    InvalidUtf8,
    #[error("Expected 7 header fields, found {0}")]
    WrongFieldCount(usize),
    #[error("Invalid integer for {field}: {value}")]
    InvalidInteger { field: &'static str, value: String },
    #[error("Invalid coordinate for {field}: {value}")]
    InvalidCoordinate { field: &'static str, value: String },
    #[error("A record header appeared inside a time-series body")]
    UnexpectedHeader,
    #[error("Time-series body ended early: expected {expected} lines, found {found}")]
    TruncatedBody { expected: u32, found: u32 },
}

#[derive(Error, Debug)]
pub enum LcIndexError {
    #[error("Malformed lightcurve content at byte offset {offset}: {source}")]
    Format {
        offset: ByteOffset,
        #[source]
        source: ParseHeaderError,
    },

    #[error("Index file not found: {0}")]
    IndexMissing(Utf8PathBuf),

    #[error("Index file {path} is corrupt: {reason}")]
    IndexCorrupt { path: Utf8PathBuf, reason: String },

    #[error("Record at byte offset {offset} declares {expected} epochs but only {found} follow")]
    TruncatedRecord {
        offset: ByteOffset,
        expected: u32,
        found: u32,
    },

    #[error("Unable to lock {path}: {source}")]
    Lock {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

impl LcIndexError {
    pub(crate) fn corrupt(path: impl Into<Utf8PathBuf>, reason: impl Into<String>) -> Self {
        LcIndexError::IndexCorrupt {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl PartialEq for LcIndexError {
    fn eq(&self, other: &Self) -> bool {
        use LcIndexError::*;
        match (self, other) {
            (
                Format {
                    offset: a,
                    source: sa,
                },
                Format {
                    offset: b,
                    source: sb,
                },
            ) => a == b && sa == sb,
            (IndexMissing(a), IndexMissing(b)) => a == b,
            (IndexCorrupt { path: a, .. }, IndexCorrupt { path: b, .. }) => a == b,
            (
                TruncatedRecord {
                    offset: oa,
                    expected: ea,
                    found: fa,
                },
                TruncatedRecord {
                    offset: ob,
                    expected: eb,
                    found: fb,
                },
            ) => oa == ob && ea == eb && fa == fb,
            (Lock { path: a, .. }, Lock { path: b, .. }) => a == b,
            (InvalidConfig(a), InvalidConfig(b)) => a == b,

            // I/O and CSV errors are not comparable: same variant means equal
            (IoError(_), IoError(_)) => true,
            (CsvError(_), CsvError(_)) => true,

            _ => false,
        }
    }
}
