use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};

use camino::Utf8Path;
use tracing::info;

use crate::lcindex_errors::LcIndexError;
use crate::artifact::StagedArtifact;
use crate::records::PartitionKey;

use super::tree::{NodeId, RaNode, RaTree};
use super::SpatialIndex;

const MAGIC: &[u8; 4] = b"LCRD";
const VERSION: u32 = 1;
const NO_CHILD: u32 = u32::MAX;
/// offset + ra + dec + left + right
const NODE_SIZE: u64 = 8 + 8 + 8 + 4 + 4;

fn write_u8(w: &mut impl Write, v: u8) -> io::Result<()> {
    w.write_all(&[v])
}

fn write_u32(w: &mut impl Write, v: u32) -> io::Result<()> {
    w.write_all(&v.to_le_bytes())
}

fn write_u64(w: &mut impl Write, v: u64) -> io::Result<()> {
    w.write_all(&v.to_le_bytes())
}

fn write_f64(w: &mut impl Write, v: f64) -> io::Result<()> {
    w.write_all(&v.to_le_bytes())
}

fn read_u8(r: &mut impl Read) -> io::Result<u8> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

fn read_u32(r: &mut impl Read) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64(r: &mut impl Read) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

fn read_f64(r: &mut impl Read) -> io::Result<f64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(f64::from_le_bytes(buf))
}

fn encode_child(child: Option<NodeId>) -> u32 {
    child.unwrap_or(NO_CHILD)
}

fn decode_child(raw: u32) -> Option<NodeId> {
    (raw != NO_CHILD).then_some(raw)
}

impl SpatialIndex {
    /// Write every partition tree to `path`, committing atomically.
    pub fn save(&self, path: &Utf8Path) -> Result<(), LcIndexError> {
        self.stage(path)?.commit()?;
        info!(path = %path, partitions = self.partitions().len(), "spatial index committed");
        Ok(())
    }

    /// Encode the index into a temporary file beside `path` without replacing `path` yet.
    pub fn stage(&self, path: &Utf8Path) -> Result<StagedArtifact, LcIndexError> {
        let mut staged = StagedArtifact::create(path)?;
        {
            let mut w = BufWriter::new(staged.file_mut());

            w.write_all(MAGIC)?;
            write_u32(&mut w, VERSION)?;
            write_u32(&mut w, self.partitions().len() as u32)?;

            for (key, tree) in self.partitions() {
                write_u8(&mut w, key.sensor_channel)?;
                write_u8(&mut w, key.measurement_channel)?;
                write_u32(&mut w, encode_child(tree.root()))?;
                write_u64(&mut w, tree.len() as u64)?;
                for node in tree.nodes() {
                    write_u64(&mut w, node.offset)?;
                    write_f64(&mut w, node.ra)?;
                    write_f64(&mut w, node.dec)?;
                    write_u32(&mut w, encode_child(node.left))?;
                    write_u32(&mut w, encode_child(node.right))?;
                }
            }

            w.flush()?;
        }
        staged.sync()?;
        Ok(staged)
    }

    /// Load a Spatial Index written by [`SpatialIndex::save`].
    ///
    /// Truncated files, unknown magic or version, out-of-range children and trees that violate
    /// the search order are all reported as [`LcIndexError::IndexCorrupt`].
    pub fn load(path: &Utf8Path) -> Result<SpatialIndex, LcIndexError> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(LcIndexError::IndexMissing(path.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };
        let file_len = file.metadata()?.len();
        let mut r = BufReader::new(file);

        let corrupt = |e: io::Error| -> LcIndexError {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                LcIndexError::corrupt(path, "unexpected end of file")
            } else {
                LcIndexError::IoError(e)
            }
        };

        let mut magic = [0u8; 4];
        r.read_exact(&mut magic).map_err(corrupt)?;
        if &magic != MAGIC {
            return Err(LcIndexError::corrupt(path, "invalid magic bytes"));
        }

        let version = read_u32(&mut r).map_err(corrupt)?;
        if version != VERSION {
            return Err(LcIndexError::corrupt(
                path,
                format!("unsupported version: {version}"),
            ));
        }

        let num_partitions = read_u32(&mut r).map_err(corrupt)?;
        let mut partitions = BTreeMap::new();
        for _ in 0..num_partitions {
            let sensor_channel = read_u8(&mut r).map_err(corrupt)?;
            let measurement_channel = read_u8(&mut r).map_err(corrupt)?;
            let root = decode_child(read_u32(&mut r).map_err(corrupt)?);
            let num_nodes = read_u64(&mut r).map_err(corrupt)?;
            if num_nodes.saturating_mul(NODE_SIZE) > file_len {
                return Err(LcIndexError::corrupt(
                    path,
                    format!("node count {num_nodes} exceeds file size"),
                ));
            }

            let mut nodes = Vec::with_capacity(num_nodes as usize);
            for _ in 0..num_nodes {
                let offset = read_u64(&mut r).map_err(corrupt)?;
                let ra = read_f64(&mut r).map_err(corrupt)?;
                let dec = read_f64(&mut r).map_err(corrupt)?;
                let left = decode_child(read_u32(&mut r).map_err(corrupt)?);
                let right = decode_child(read_u32(&mut r).map_err(corrupt)?);
                nodes.push(RaNode {
                    offset,
                    ra,
                    dec,
                    left,
                    right,
                });
            }

            let key = PartitionKey::new(sensor_channel, measurement_channel);
            let tree = RaTree::from_parts(nodes, root)
                .map_err(|reason| LcIndexError::corrupt(path, format!("{key}: {reason}")))?;
            if partitions.insert(key, tree).is_some() {
                return Err(LcIndexError::corrupt(
                    path,
                    format!("duplicate partition {key}"),
                ));
            }
        }

        let mut trailing = [0u8; 1];
        if r.read(&mut trailing)? != 0 {
            return Err(LcIndexError::corrupt(path, "trailing bytes after last partition"));
        }

        Ok(SpatialIndex::from_partitions(partitions))
    }
}
