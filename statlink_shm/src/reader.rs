//! Snapshot reader over the producer's sensor segment.
//!
//! All operations follow the same discipline: acquire the producer's
//! lock with a bounded wait, re-read and validate the header, copy the
//! requested records out, release. Nothing borrowed from the mapping
//! survives past the lock, so a producer restart between polls can at
//! worst cost one failed read.

use std::time::Duration;

use statlink_common::consts::LOCK_TIMEOUT_MS;

use crate::error::{ShmError, ShmResult};
use crate::layout::{RawReading, RawSensorDevice, Reading, SegmentHeader, SensorDevice};
use crate::lock::ProducerLock;
use crate::map::{SegmentMap, ShmSegment};

/// Reader over one mapped sensor segment.
pub struct SnapshotReader<M: SegmentMap = ShmSegment> {
    name: String,
    map: Option<M>,
    lock: ProducerLock,
    lock_timeout: Duration,
}

impl SnapshotReader<ShmSegment> {
    /// Attach to the named segment under `/dev/shm` and validate it.
    ///
    /// The producer's lock file is expected next to the segment as
    /// `<name>.lock`.
    pub fn attach(name: &str) -> ShmResult<Self> {
        let map = ShmSegment::open(name)?;
        let lock = ProducerLock::new(ShmSegment::shm_path(&format!("{name}.lock")));
        let reader = Self::from_parts(name, map, lock)?;
        tracing::debug!(segment = %name, "attached sensor segment");
        Ok(reader)
    }
}

impl<M: SegmentMap> SnapshotReader<M> {
    /// Build a reader from an explicit mapping and lock, validating the
    /// header before returning.
    pub fn from_parts(name: impl Into<String>, map: M, lock: ProducerLock) -> ShmResult<Self> {
        let reader = Self {
            name: name.into(),
            map: Some(map),
            lock,
            lock_timeout: Duration::from_millis(LOCK_TIMEOUT_MS),
        };
        reader.snapshot(|_, _| Ok(()))?;
        Ok(reader)
    }

    /// Override the lock wait bound.
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_open(&self) -> bool {
        self.map.is_some()
    }

    /// Unix time of the producer's last poll.
    pub fn poll_time(&self) -> ShmResult<i64> {
        self.snapshot(|header, _| Ok(header.poll_time))
    }

    /// Copy out all sensor device records.
    pub fn read_sensors(&self) -> ShmResult<Vec<SensorDevice>> {
        self.snapshot(|header, bytes| {
            let mut out = Vec::with_capacity(header.sensor_count as usize);
            for i in 0..header.sensor_count as usize {
                let start = header.sensor_offset as usize + i * header.sensor_stride as usize;
                // In bounds per header.validate.
                let raw: RawSensorDevice =
                    unsafe { std::ptr::read_unaligned(bytes[start..].as_ptr() as *const _) };
                out.push(SensorDevice::decode(&raw));
            }
            Ok(out)
        })
    }

    /// Copy out all reading records.
    pub fn read_readings(&self) -> ShmResult<Vec<Reading>> {
        self.snapshot(|header, bytes| {
            let mut out = Vec::with_capacity(header.reading_count as usize);
            for i in 0..header.reading_count as usize {
                out.push(Reading::decode(&read_raw_reading(header, bytes, i)));
            }
            Ok(out)
        })
    }

    /// Current value of one reading by id.
    ///
    /// `Ok(None)` means the segment is healthy but no longer carries
    /// that id (sensor unplugged, producer reconfigured). Source-level
    /// failures stay errors.
    pub fn reading_value(&self, reading_id: u32) -> ShmResult<Option<f64>> {
        self.snapshot(|header, bytes| {
            for i in 0..header.reading_count as usize {
                let raw = read_raw_reading(header, bytes, i);
                if raw.reading_id == reading_id {
                    let value = raw.value;
                    return Ok(Some(value));
                }
            }
            Ok(None)
        })
    }

    /// Release the mapping. Idempotent; later reads return `NotFound`.
    pub fn close(&mut self) {
        self.map = None;
    }

    fn snapshot<T>(&self, f: impl FnOnce(&SegmentHeader, &[u8]) -> ShmResult<T>) -> ShmResult<T> {
        let map = self.map.as_ref().ok_or_else(|| ShmError::NotFound {
            name: self.name.clone(),
        })?;
        let _guard = self.lock.acquire(self.lock_timeout)?;
        let bytes = map.bytes();
        let header = SegmentHeader::read_from(bytes)?;
        header.validate(bytes.len())?;
        f(&header, bytes)
    }
}

fn read_raw_reading(header: &SegmentHeader, bytes: &[u8], index: usize) -> RawReading {
    let start = header.reading_offset as usize + index * header.reading_stride as usize;
    // In bounds per header.validate.
    unsafe { std::ptr::read_unaligned(bytes[start..].as_ptr() as *const _) }
}
