//! Segment mapping abstraction.
//!
//! [`SnapshotReader`](crate::reader::SnapshotReader) only needs a byte
//! view of the segment, so the mapping sits behind [`SegmentMap`]. The
//! real implementation maps `/dev/shm` read-only; tests build segments
//! in memory with [`MemSegment`].

use std::fs::File;
use std::path::{Path, PathBuf};

use memmap2::Mmap;

use crate::error::{ShmError, ShmResult};

/// Byte view of a sensor segment.
pub trait SegmentMap {
    fn bytes(&self) -> &[u8];
}

/// Read-only mmap of a segment under `/dev/shm`.
pub struct ShmSegment {
    mmap: Mmap,
    path: PathBuf,
}

impl ShmSegment {
    /// Path of a named segment under `/dev/shm`.
    pub fn shm_path(name: &str) -> PathBuf {
        Path::new("/dev/shm").join(name)
    }

    /// Map an existing segment read-only.
    pub fn open(name: &str) -> ShmResult<Self> {
        let path = Self::shm_path(name);
        if !path.exists() {
            return Err(ShmError::NotFound {
                name: name.to_string(),
            });
        }
        let file = File::open(&path)?;
        // Safety: mapped read-only; the producer only ever appends
        // whole-record updates under its lock, and we copy out before
        // interpreting anything.
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self { mmap, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SegmentMap for ShmSegment {
    fn bytes(&self) -> &[u8] {
        &self.mmap
    }
}

/// In-memory segment for tests and offline tooling.
pub struct MemSegment {
    bytes: Vec<u8>,
}

impl MemSegment {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

impl SegmentMap for MemSegment {
    fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn open_missing_segment_is_not_found() {
        assert!(matches!(
            ShmSegment::open("statlink_test_no_such_segment"),
            Err(ShmError::NotFound { .. })
        ));
    }

    #[test]
    fn mem_segment_exposes_bytes() {
        let seg = MemSegment::new(vec![1, 2, 3]);
        assert_eq!(seg.bytes(), &[1, 2, 3]);
    }

    #[test]
    fn mmap_reads_file_contents() {
        // Map a regular file; the mmap path is identical for /dev/shm.
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"segment bytes").unwrap();
        f.flush().unwrap();

        let file = File::open(f.path()).unwrap();
        let mmap = unsafe { Mmap::map(&file).unwrap() };
        assert_eq!(&mmap[..], b"segment bytes");
    }
}
