//! Octant file storage
//!
//! One file per octant at `<data_dir>/Octants/<guid>.node`, the GUID written
//! as 32 hex digits without dashes:
//!
//! ```text
//! i32 LE   point_count
//! i32 LE   record_length
//! u8[point_count * record_length]   point records
//! ```

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use bytemuck::Pod;

use crate::core::error::Error;
use crate::core::types::{Result, Uuid};
use crate::points::PointAccessor;

/// Subdirectory of the data folder holding octant files
pub const OCTANTS_DIR: &str = "Octants";

/// File extension for octant files
pub const NODE_FILE_EXTENSION: &str = "node";

/// Size of the octant file header in bytes
pub const NODE_HEADER_LEN: usize = 8;

/// Read/write access to the octant files of one point cloud
#[derive(Clone, Debug)]
pub struct OctantStore {
    data_dir: PathBuf,
}

impl OctantStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Get the file path for an octant
    pub fn node_path(&self, guid: Uuid) -> PathBuf {
        self.data_dir
            .join(OCTANTS_DIR)
            .join(format!("{}.{}", guid.simple(), NODE_FILE_EXTENSION))
    }

    /// Check if an octant file exists on disk
    pub fn node_exists(&self, guid: Uuid) -> bool {
        self.node_path(guid).exists()
    }

    /// Read only the point count from an octant's header (sync).
    pub fn read_point_count(&self, guid: Uuid) -> Result<u32> {
        let path = self.node_path(guid);
        let mut file = File::open(&path).map_err(|e| map_open_error(e, &path))?;

        let mut header = [0u8; 4];
        file.read_exact(&mut header).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => malformed(&path, "header truncated"),
            _ => Error::Io(e),
        })?;

        let count = i32::from_le_bytes(header);
        u32::try_from(count).map_err(|_| malformed(&path, format!("negative point count {}", count)))
    }

    /// Load and decode every point of an octant.
    pub async fn load_points<A: PointAccessor>(&self, guid: Uuid, accessor: &A) -> Result<Vec<A::Point>> {
        let path = self.node_path(guid);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| map_open_error(e, &path))?;
        decode_node(&path, &bytes, accessor)
    }

    /// Write an octant file from raw records (sync).
    pub fn write_node(&self, guid: Uuid, record_len: usize, records: &[u8]) -> Result<PathBuf> {
        let path = self.node_path(guid);
        if record_len == 0 || records.len() % record_len != 0 {
            return Err(malformed(&path, format!(
                "{} record bytes are not a multiple of record length {}",
                records.len(),
                record_len
            )));
        }

        let count = i32::try_from(records.len() / record_len)
            .map_err(|_| malformed(&path, "too many points for one octant"))?;
        let record_len_i32 = i32::try_from(record_len)
            .map_err(|_| malformed(&path, "record length too large"))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut bytes = Vec::with_capacity(NODE_HEADER_LEN + records.len());
        bytes.extend_from_slice(&count.to_le_bytes());
        bytes.extend_from_slice(&record_len_i32.to_le_bytes());
        bytes.extend_from_slice(records);
        std::fs::write(&path, bytes)?;

        Ok(path)
    }

    /// Write an octant file from plain-old-data points (sync).
    pub fn write_points<P: Pod>(&self, guid: Uuid, points: &[P]) -> Result<PathBuf> {
        self.write_node(guid, std::mem::size_of::<P>(), bytemuck::cast_slice(points))
    }

    /// Delete an octant file
    pub fn delete_node(&self, guid: Uuid) -> Result<()> {
        let path = self.node_path(guid);
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        Ok(())
    }
}

/// Decode a complete octant file.
pub fn decode_node<A: PointAccessor>(path: &Path, bytes: &[u8], accessor: &A) -> Result<Vec<A::Point>> {
    if bytes.len() < NODE_HEADER_LEN {
        return Err(malformed(path, "header truncated"));
    }

    let count = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let record_len = i32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);

    let count = usize::try_from(count)
        .map_err(|_| malformed(path, format!("negative point count {}", count)))?;
    let record_len = usize::try_from(record_len)
        .ok()
        .filter(|len| *len > 0)
        .ok_or_else(|| malformed(path, format!("invalid record length {}", record_len)))?;

    if let Some(expected) = accessor.record_len() {
        if record_len < expected {
            return Err(malformed(path, format!(
                "record length {} shorter than accessor layout {}",
                record_len, expected
            )));
        }
    }

    let body = &bytes[NODE_HEADER_LEN..];
    let needed = count
        .checked_mul(record_len)
        .ok_or_else(|| malformed(path, "point data size overflows"))?;
    if body.len() < needed {
        return Err(malformed(path, format!(
            "expected {} bytes of point data, found {}",
            needed,
            body.len()
        )));
    }

    Ok(body[..needed]
        .chunks_exact(record_len)
        .map(|raw| accessor.decode_record(raw))
        .collect())
}

fn map_open_error(e: io::Error, path: &Path) -> Error {
    if e.kind() == io::ErrorKind::NotFound {
        Error::MissingNodeFile(path.to_path_buf())
    } else {
        Error::Io(e)
    }
}

fn malformed(path: &Path, reason: impl Into<String>) -> Error {
    Error::MalformedNodeFile {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}
