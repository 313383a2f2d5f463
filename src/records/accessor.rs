//! # Record Accessor
//!
//! Direct retrieval of one record from its raw lightcurve file: seek to the header offset, parse
//! the header, then parse exactly `epoch_count` data lines. Nothing is cached; every call opens
//! its own file handle, so concurrent readers on the same file never interfere.
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};

use camino::Utf8Path;

use crate::constants::ByteOffset;
use crate::lcindex_errors::{LcIndexError, ParseHeaderError};
use crate::records::lightcurve::{Epoch, Lightcurve};
use crate::records::Record;

const MAX_PREALLOCATED_EPOCHS: u32 = 4096;

/// Read the record whose header starts at `offset`, with its full time series.
///
/// Arguments
/// -----------------
/// * `raw_file` – Raw lightcurve file.
/// * `offset` – Byte position of the record header (from the Object Index).
/// * `epoch_count` – Number of data lines to parse after the header.
///
/// Return
/// ----------
/// * `(record, lightcurve)` with the lightcurve sorted by date and unmasked.
/// * [`LcIndexError::Format`] if no valid header starts at `offset`.
/// * [`LcIndexError::TruncatedRecord`] if fewer than `epoch_count` valid data lines follow
///   (end of file, next header, or an unparsable line).
///
/// See also
/// ------------
/// * [`read_record_at`] – Same, taking the epoch count from the header itself.
pub fn read_record(
    raw_file: &Utf8Path,
    offset: ByteOffset,
    epoch_count: u32,
) -> Result<(Record, Lightcurve), LcIndexError> {
    let mut reader = open_at(raw_file, offset)?;
    let record = read_header(&mut reader, offset)?;
    let lightcurve = read_epochs(&mut reader, offset, epoch_count)?;
    Ok((record, lightcurve))
}

/// [`read_record`] using the epoch count declared by the header at `offset`.
pub fn read_record_at(
    raw_file: &Utf8Path,
    offset: ByteOffset,
) -> Result<(Record, Lightcurve), LcIndexError> {
    let mut reader = open_at(raw_file, offset)?;
    let record = read_header(&mut reader, offset)?;
    let lightcurve = read_epochs(&mut reader, offset, record.epoch_count)?;
    Ok((record, lightcurve))
}

/// Parse only the header at `offset`.
pub fn read_header_at(raw_file: &Utf8Path, offset: ByteOffset) -> Result<Record, LcIndexError> {
    let mut reader = open_at(raw_file, offset)?;
    read_header(&mut reader, offset)
}

fn open_at(raw_file: &Utf8Path, offset: ByteOffset) -> Result<BufReader<File>, LcIndexError> {
    let mut file = File::open(raw_file)?;
    file.seek(SeekFrom::Start(offset))?;
    Ok(BufReader::new(file))
}

fn read_header(reader: &mut impl BufRead, offset: ByteOffset) -> Result<Record, LcIndexError> {
    let mut line = Vec::new();
    reader.read_until(b'\n', &mut line)?;
    let line = std::str::from_utf8(&line).map_err(|_| LcIndexError::Format {
        offset,
        source: ParseHeaderError::InvalidUtf8,
    })?;
    Record::from_header_line(line, offset).map_err(|source| LcIndexError::Format { offset, source })
}

fn read_epochs(
    reader: &mut impl BufRead,
    offset: ByteOffset,
    epoch_count: u32,
) -> Result<Lightcurve, LcIndexError> {
    // the declared count is untrusted until the lines are actually read
    let mut epochs = Vec::with_capacity(epoch_count.min(MAX_PREALLOCATED_EPOCHS) as usize);
    let mut line = String::new();
    for found in 0..epoch_count {
        line.clear();
        let n = reader.read_line(&mut line)?;
        let epoch = if n == 0 {
            None
        } else {
            Epoch::from_data_line(&line)
        };
        match epoch {
            Some(epoch) => epochs.push(epoch),
            None => {
                return Err(LcIndexError::TruncatedRecord {
                    offset,
                    expected: epoch_count,
                    found,
                })
            }
        }
    }
    Ok(Lightcurve::new(epochs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use std::io::Write;

    fn raw_file(dir: &tempfile::TempDir, content: &str) -> Utf8PathBuf {
        let path = Utf8PathBuf::from_path_buf(dir.path().join("field000245.txt")).unwrap();
        let mut f = File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    const RAW: &str = "\
# 1 2 1 245 0 10.0 -20.0
58001.1 18.30 0.05 0.1 0
58000.1 18.20 0.05 0.1 4
# 2 1 2 245 0 10.0001 -20.0001
58000.2 17.90 0.04 0.1 0
";

    #[test]
    fn test_read_second_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = raw_file(&dir, RAW);
        let offset = RAW.find("# 2").unwrap() as u64;

        let (record, lc) = read_record(&path, offset, 1).unwrap();
        assert_eq!(record.object_id, 2);
        assert_eq!(record.offset, offset);
        assert_eq!(lc.len(), 1);
        assert_eq!(lc.epochs()[0].mag, 17.90);
    }

    #[test]
    fn test_read_record_at_sorts_by_date() {
        let dir = tempfile::tempdir().unwrap();
        let path = raw_file(&dir, RAW);

        let (_, lc) = read_record_at(&path, 0).unwrap();
        assert_eq!(lc.hmjd(), vec![58000.1, 58001.1]);
        assert_eq!(lc.quality_masked().len(), 1);
    }

    #[test]
    fn test_next_header_counts_as_truncation() {
        let dir = tempfile::tempdir().unwrap();
        let path = raw_file(&dir, RAW);

        assert_eq!(
            read_record(&path, 0, 3).unwrap_err(),
            LcIndexError::TruncatedRecord {
                offset: 0,
                expected: 3,
                found: 2
            }
        );
    }

    #[test]
    fn test_offset_not_on_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = raw_file(&dir, RAW);
        let offset = RAW.find("58001.1").unwrap() as u64;

        assert!(matches!(
            read_header_at(&path, offset),
            Err(LcIndexError::Format {
                source: ParseHeaderError::NotAHeader,
                ..
            })
        ));
    }

    #[test]
    fn test_huge_declared_count_is_truncation() {
        let dir = tempfile::tempdir().unwrap();
        let path = raw_file(
            &dir,
            "# 1 4294967295 1 245 0 10.0 -20.0\n58000.1 18.20 0.05 0.1 0\n",
        );

        assert_eq!(
            read_record_at(&path, 0).unwrap_err(),
            LcIndexError::TruncatedRecord {
                offset: 0,
                expected: u32::MAX,
                found: 1
            }
        );
    }
}
