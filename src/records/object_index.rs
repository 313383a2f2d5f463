//! # Object Index
//!
//! Persisted table of every [`Record`] of a raw lightcurve file, in file order. Building it costs
//! one scan of the raw file; loading it afterwards is the fast path used by the Spatial Index
//! builder and by [`LightcurveFile`](crate::lightcurve_file::LightcurveFile).
//!
//! ## File format
//! -----------------
//! ```text
//! # lcindex objects v1 count=2
//! object_id,epoch_count,measurement_channel,field_id,sensor_channel,ra,dec,offset
//! 1,2,1,245,0,10.0,-20.0,0
//! 2,1,2,245,0,10.0001,-20.0001,75
//! ```
//!
//! The preamble carries the row count so that a file cut at a row boundary is still detected as
//! truncated. Rows are written with [`csv`] + [`serde`] in scan order; the output is a pure
//! function of the input bytes.
//!
//! ## Commit
//! -----------------
//! The table is written to a temporary file in the destination directory and renamed over the
//! target only once the scan completed, so a failed build never leaves a half-written index.
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};

use camino::{Utf8Path, Utf8PathBuf};
use itertools::Itertools;
use tracing::{debug, info};

use crate::artifact::StagedArtifact;
use crate::constants::ByteOffset;
use crate::lcindex_errors::LcIndexError;
use crate::records::scanner::RecordScanner;
use crate::records::{PartitionKey, Record};

const PREAMBLE_PREFIX: &str = "# lcindex objects v1 count=";
const MAX_PREALLOCATED_ROWS: usize = 1 << 16;

/// In-memory Object Index: the records of one raw file sorted by offset.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectIndex {
    raw_file: Utf8PathBuf,
    records: Vec<Record>,
}

impl ObjectIndex {
    /// Scan `raw_file` once and collect its records.
    ///
    /// Arguments
    /// -----------------
    /// * `raw_file` – Path to the raw lightcurve file.
    ///
    /// Return
    /// ----------
    /// * The index, or the first [`LcIndexError::Format`] raised by the scanner.
    pub fn build(raw_file: &Utf8Path) -> Result<ObjectIndex, LcIndexError> {
        let records = RecordScanner::open(raw_file)?.collect::<Result<Vec<_>, _>>()?;
        debug!(raw_file = %raw_file, records = records.len(), "scanned raw lightcurve file");
        Ok(ObjectIndex {
            raw_file: raw_file.to_path_buf(),
            records,
        })
    }

    pub(crate) fn from_records(raw_file: &Utf8Path, records: Vec<Record>) -> ObjectIndex {
        ObjectIndex {
            raw_file: raw_file.to_path_buf(),
            records,
        }
    }

    pub fn raw_file(&self) -> &Utf8Path {
        &self.raw_file
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record whose header starts at `offset`.
    pub fn get(&self, offset: ByteOffset) -> Option<&Record> {
        self.records
            .binary_search_by_key(&offset, |r| r.offset)
            .ok()
            .map(|i| &self.records[i])
    }

    /// Records grouped by partition, each group kept in file order.
    pub fn partitions(&self) -> Vec<(PartitionKey, Vec<&Record>)> {
        self.records
            .iter()
            .sorted_by_key(|r| (r.partition_key(), r.offset))
            .chunk_by(|r| r.partition_key())
            .into_iter()
            .map(|(key, group)| (key, group.collect()))
            .collect()
    }

    /// Write the index to `path`, committing atomically.
    pub fn write(&self, path: &Utf8Path) -> Result<(), LcIndexError> {
        self.stage(path)?.commit()?;
        info!(path = %path, records = self.records.len(), "object index committed");
        Ok(())
    }

    /// Write the index to a temporary file beside `path` without replacing `path` yet.
    pub fn stage(&self, path: &Utf8Path) -> Result<StagedArtifact, LcIndexError> {
        let mut staged = StagedArtifact::create(path)?;
        {
            let mut w = BufWriter::new(staged.file_mut());
            writeln!(w, "{PREAMBLE_PREFIX}{}", self.records.len())?;
            let mut csv_writer = csv::Writer::from_writer(&mut w);
            for record in &self.records {
                csv_writer.serialize(record)?;
            }
            csv_writer.flush()?;
            drop(csv_writer);
            w.flush()?;
        }
        staged.sync()?;
        Ok(staged)
    }

    /// Load a previously written index without touching the raw file.
    ///
    /// Arguments
    /// -----------------
    /// * `path` – Object Index file.
    /// * `raw_file` – Raw lightcurve file the index describes.
    ///
    /// Return
    /// ----------
    /// * [`LcIndexError::IndexMissing`] if `path` does not exist,
    /// * [`LcIndexError::IndexCorrupt`] on a bad preamble, malformed rows, a row count that
    ///   disagrees with the preamble, or offsets that are not strictly increasing.
    pub fn load(path: &Utf8Path, raw_file: &Utf8Path) -> Result<ObjectIndex, LcIndexError> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(LcIndexError::IndexMissing(path.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };
        let mut reader = BufReader::new(file);

        let mut preamble = String::new();
        reader.read_line(&mut preamble)?;
        let expected: usize = preamble
            .trim_end()
            .strip_prefix(PREAMBLE_PREFIX)
            .and_then(|count| count.parse().ok())
            .ok_or_else(|| LcIndexError::corrupt(path, "missing or invalid preamble"))?;

        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut records: Vec<Record> = Vec::with_capacity(expected.min(MAX_PREALLOCATED_ROWS));
        for row in csv_reader.deserialize() {
            let record: Record =
                row.map_err(|e| LcIndexError::corrupt(path, format!("unreadable row: {e}")))?;
            if let Some(previous) = records.last() {
                if record.offset <= previous.offset {
                    return Err(LcIndexError::corrupt(
                        path,
                        format!(
                            "offset {} does not follow offset {}",
                            record.offset, previous.offset
                        ),
                    ));
                }
            }
            records.push(record);
        }

        if records.len() != expected {
            return Err(LcIndexError::corrupt(
                path,
                format!("expected {expected} records, found {}", records.len()),
            ));
        }

        Ok(ObjectIndex {
            raw_file: raw_file.to_path_buf(),
            records,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(object_id: u64, offset: u64, sensor: u8, band: u8) -> Record {
        Record {
            object_id,
            epoch_count: 0,
            measurement_channel: band,
            field_id: 245,
            sensor_channel: sensor,
            ra: 10.0 + object_id as f64 * 1e-3,
            dec: -20.0,
            offset,
        }
    }

    fn sample_index() -> ObjectIndex {
        ObjectIndex::from_records(
            Utf8Path::new("field000245.txt"),
            vec![
                record(1, 0, 0, 1),
                record(2, 40, 1, 2),
                record(3, 80, 0, 2),
                record(4, 120, 0, 1),
            ],
        )
    }

    fn temp_path(dir: &tempfile::TempDir, name: &str) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().join(name)).unwrap()
    }

    #[test]
    fn test_write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_path(&dir, "field000245.objects");
        let index = sample_index();

        index.write(&path).unwrap();
        let loaded = ObjectIndex::load(&path, index.raw_file()).unwrap();
        assert_eq!(loaded, index);
    }

    #[test]
    fn test_write_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let a = temp_path(&dir, "a.objects");
        let b = temp_path(&dir, "b.objects");
        sample_index().write(&a).unwrap();
        sample_index().write(&b).unwrap();
        assert_eq!(std::fs::read(&a).unwrap(), std::fs::read(&b).unwrap());
    }

    #[test]
    fn test_load_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_path(&dir, "nothing.objects");
        assert_eq!(
            ObjectIndex::load(&path, Utf8Path::new("nothing.txt")),
            Err(LcIndexError::IndexMissing(path.clone()))
        );
    }

    #[test]
    fn test_load_truncated_at_row_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_path(&dir, "field000245.objects");
        sample_index().write(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let kept: Vec<&str> = content.lines().take(3).collect();
        std::fs::write(&path, kept.join("\n") + "\n").unwrap();

        assert!(matches!(
            ObjectIndex::load(&path, Utf8Path::new("field000245.txt")),
            Err(LcIndexError::IndexCorrupt { .. })
        ));
    }

    #[test]
    fn test_load_truncated_mid_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_path(&dir, "field000245.objects");
        sample_index().write(&path).unwrap();

        let content = std::fs::read(&path).unwrap();
        std::fs::write(&path, &content[..content.len() - 6]).unwrap();

        assert!(matches!(
            ObjectIndex::load(&path, Utf8Path::new("field000245.txt")),
            Err(LcIndexError::IndexCorrupt { .. })
        ));
    }

    #[test]
    fn test_partitions() {
        let index = sample_index();
        let partitions = index.partitions();

        let keys: Vec<PartitionKey> = partitions.iter().map(|(k, _)| *k).collect();
        assert_eq!(
            keys,
            vec![
                PartitionKey::new(0, 1),
                PartitionKey::new(0, 2),
                PartitionKey::new(1, 2)
            ]
        );
        let offsets: Vec<u64> = partitions[0].1.iter().map(|r| r.offset).collect();
        assert_eq!(offsets, vec![0, 120]);
    }

    #[test]
    fn test_get_by_offset() {
        let index = sample_index();
        assert_eq!(index.get(80).map(|r| r.object_id), Some(3));
        assert!(index.get(81).is_none());
    }

    #[test]
    fn test_load_huge_preamble_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_path(&dir, "field000245.objects");
        sample_index().write(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let forged = content.replacen("count=4", &format!("count={}", u64::MAX), 1);
        std::fs::write(&path, forged).unwrap();

        assert!(matches!(
            ObjectIndex::load(&path, Utf8Path::new("field000245.txt")),
            Err(LcIndexError::IndexCorrupt { .. })
        ));
    }
}
