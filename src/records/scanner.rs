//! # Record Scanner
//!
//! Single forward pass over a raw lightcurve file that yields every [`Record`] together with the
//! exact byte offset of its header line.
//!
//! ## Overview
//! -----------------
//! For each header line the scanner:
//! 1. captures the current byte position **before** reading the line,
//! 2. parses the header fields into a [`Record`],
//! 3. skips exactly `epoch_count` data lines without parsing them.
//!
//! Bytes are counted as read from the underlying reader (line terminators included, `\r\n`
//! counted as two bytes), so offsets stay exact whatever the line endings.
//!
//! ## Error Handling
//! -----------------
//! Any malformed content is fatal: the iterator yields one
//! [`LcIndexError::Format`] carrying the offending offset and then stops. Blank lines between
//! records are tolerated. A header line found inside a time-series body, or a body cut short by
//! end-of-file, is malformed content as well.
//!
//! ## See also
//! ------------
//! * [`Record::from_header_line`] – Header field parsing.
//! * [`crate::records::object_index::ObjectIndex::build`] – Consumer of the scanner.
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};

use camino::Utf8Path;

use crate::constants::ByteOffset;
use crate::lcindex_errors::{LcIndexError, ParseHeaderError};
use crate::records::Record;

/// Lazy, finite sequence of the records of one raw file, in file order.
pub struct RecordScanner<R> {
    reader: R,
    position: ByteOffset,
    line: Vec<u8>,
    finished: bool,
}

impl RecordScanner<BufReader<File>> {
    /// Open a raw lightcurve file for scanning.
    pub fn open(raw_file: &Utf8Path) -> Result<Self, LcIndexError> {
        let file = File::open(raw_file)?;
        Ok(RecordScanner::new(BufReader::new(file)))
    }
}

impl<R: BufRead> RecordScanner<R> {
    /// Wrap a reader positioned at the start of a raw lightcurve file.
    pub fn new(reader: R) -> Self {
        RecordScanner {
            reader,
            position: 0,
            line: Vec::new(),
            finished: false,
        }
    }

    /// Byte position of the next unread line.
    pub fn position(&self) -> ByteOffset {
        self.position
    }

    /// Read the next line into `self.line`, returning its starting offset, or `None` at EOF.
    fn read_line(&mut self) -> Result<Option<ByteOffset>, LcIndexError> {
        self.line.clear();
        let start = self.position;
        let n = self.reader.read_until(b'\n', &mut self.line)?;
        if n == 0 {
            return Ok(None);
        }
        self.position += n as u64;
        Ok(Some(start))
    }

    fn scan_next(&mut self) -> Result<Option<Record>, LcIndexError> {
        let (header_offset, record) = loop {
            let Some(offset) = self.read_line()? else {
                return Ok(None);
            };
            let line = std::str::from_utf8(&self.line).map_err(|_| LcIndexError::Format {
                offset,
                source: ParseHeaderError::InvalidUtf8,
            })?;
            if line.trim().is_empty() {
                continue;
            }
            let record = Record::from_header_line(line, offset)
                .map_err(|source| LcIndexError::Format { offset, source })?;
            break (offset, record);
        };

        for found in 0..record.epoch_count {
            let Some(offset) = self.read_line()? else {
                return Err(LcIndexError::Format {
                    offset: header_offset,
                    source: ParseHeaderError::TruncatedBody {
                        expected: record.epoch_count,
                        found,
                    },
                });
            };
            if self.line.trim_ascii_start().first() == Some(&b'#') {
                return Err(LcIndexError::Format {
                    offset,
                    source: ParseHeaderError::UnexpectedHeader,
                });
            }
        }

        Ok(Some(record))
    }
}

impl<R: BufRead + Seek> RecordScanner<R> {
    /// Rewind to the beginning of the file so the sequence can be consumed again.
    pub fn restart(&mut self) -> Result<(), LcIndexError> {
        self.reader.seek(SeekFrom::Start(0))?;
        self.position = 0;
        self.finished = false;
        Ok(())
    }
}

impl<R: BufRead> Iterator for RecordScanner<R> {
    type Item = Result<Record, LcIndexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.scan_next() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}
