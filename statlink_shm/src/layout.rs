//! Packed on-disk layout of the producer's sensor segment.
//!
//! These structures mirror the producer's byte layout exactly. All are
//! `repr(C, packed)` and decoded with unaligned copies; never take a
//! reference to a field of a mapped instance. Element sizes in the
//! header may be larger than our structs when the producer appends
//! fields, so iteration must use the header strides, not `size_of`.

use static_assertions::const_assert_eq;

use crate::error::{ShmError, ShmResult};

/// Size of the two fixed text fields on sensors and readings.
pub const TEXT_FIELD_LEN: usize = 128;

/// Size of the unit text field on readings.
pub const UNIT_FIELD_LEN: usize = 16;

/// Segment header at offset 0.
#[repr(C, packed)]
#[derive(Debug, Clone, Copy)]
pub struct SegmentHeader {
    /// Producer magic. Zero or all-ones means the producer is gone or
    /// mid-teardown.
    pub signature: u32,
    pub version: u32,
    pub revision: u32,
    /// Unix time of the producer's last poll.
    pub poll_time: i64,
    pub sensor_offset: u32,
    /// Element size of one sensor record. May exceed
    /// `size_of::<RawSensorDevice>()`.
    pub sensor_stride: u32,
    pub sensor_count: u32,
    pub reading_offset: u32,
    /// Element size of one reading record. May exceed
    /// `size_of::<RawReading>()`.
    pub reading_stride: u32,
    pub reading_count: u32,
}

const_assert_eq!(std::mem::size_of::<SegmentHeader>(), 44);

/// One sensor device record (a physical device grouping readings).
#[repr(C, packed)]
#[derive(Debug, Clone, Copy)]
pub struct RawSensorDevice {
    pub sensor_id: u32,
    pub sensor_instance: u32,
    pub name_orig: [u8; TEXT_FIELD_LEN],
    pub name_user: [u8; TEXT_FIELD_LEN],
}

const_assert_eq!(std::mem::size_of::<RawSensorDevice>(), 264);

/// One reading record.
#[repr(C, packed)]
#[derive(Debug, Clone, Copy)]
pub struct RawReading {
    /// Reading kind discriminant, see [`ReadingKind`].
    pub kind: u32,
    /// Index into the sensor device array.
    pub sensor_index: u32,
    /// Stable reading id, unique within the segment.
    pub reading_id: u32,
    pub label_orig: [u8; TEXT_FIELD_LEN],
    pub label_user: [u8; TEXT_FIELD_LEN],
    pub unit: [u8; UNIT_FIELD_LEN],
    pub value: f64,
    pub value_min: f64,
    pub value_max: f64,
    pub value_avg: f64,
}

const_assert_eq!(std::mem::size_of::<RawReading>(), 316);

/// Reading kind as the producer tags it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadingKind {
    None,
    Temperature,
    Voltage,
    Fan,
    Current,
    Power,
    Clock,
    Usage,
    Other,
}

impl ReadingKind {
    /// Map the raw discriminant. Unknown values collapse to `Other` so
    /// a newer producer never breaks discovery.
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => ReadingKind::None,
            1 => ReadingKind::Temperature,
            2 => ReadingKind::Voltage,
            3 => ReadingKind::Fan,
            4 => ReadingKind::Current,
            5 => ReadingKind::Power,
            6 => ReadingKind::Clock,
            7 => ReadingKind::Usage,
            _ => ReadingKind::Other,
        }
    }
}

impl SegmentHeader {
    /// Copy a header out of the start of a mapping.
    pub fn read_from(bytes: &[u8]) -> ShmResult<Self> {
        if bytes.len() < std::mem::size_of::<Self>() {
            return Err(ShmError::Corrupt {
                reason: format!("mapping too small for header: {} bytes", bytes.len()),
            });
        }
        // Unaligned POD copy; any bit pattern is a valid SegmentHeader.
        Ok(unsafe { std::ptr::read_unaligned(bytes.as_ptr() as *const Self) })
    }

    /// Check the header against the mapped length.
    ///
    /// A zero or all-ones signature is how the producer signals teardown,
    /// so that is `Corrupt` too: callers must treat it as source loss.
    pub fn validate(&self, mapped_len: usize) -> ShmResult<()> {
        let signature = self.signature;
        if signature == 0 || signature == u32::MAX {
            return Err(ShmError::Corrupt {
                reason: format!("invalid signature {signature:#010x}"),
            });
        }
        Self::check_section(
            "sensor",
            self.sensor_offset,
            self.sensor_stride,
            self.sensor_count,
            std::mem::size_of::<RawSensorDevice>(),
            mapped_len,
        )?;
        Self::check_section(
            "reading",
            self.reading_offset,
            self.reading_stride,
            self.reading_count,
            std::mem::size_of::<RawReading>(),
            mapped_len,
        )?;
        Ok(())
    }

    fn check_section(
        what: &str,
        offset: u32,
        stride: u32,
        count: u32,
        min_stride: usize,
        mapped_len: usize,
    ) -> ShmResult<()> {
        if count == 0 {
            return Ok(());
        }
        if (stride as usize) < min_stride {
            return Err(ShmError::Corrupt {
                reason: format!("{what} stride {stride} below record size {min_stride}"),
            });
        }
        let end = (offset as u64) + (stride as u64) * (count as u64);
        if end > mapped_len as u64 {
            return Err(ShmError::Corrupt {
                reason: format!("{what} section ends at {end}, mapping is {mapped_len} bytes"),
            });
        }
        Ok(())
    }
}

/// Decode a NUL-padded fixed text field, lossy on bad UTF-8.
pub fn fixed_str(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).trim().to_string()
}

/// Owned copy of one sensor device record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorDevice {
    pub id: u32,
    pub instance: u32,
    /// User-renamed name when present, original otherwise.
    pub name: String,
}

impl SensorDevice {
    pub(crate) fn decode(raw: &RawSensorDevice) -> Self {
        let user = fixed_str(&raw.name_user);
        let name = if user.is_empty() {
            fixed_str(&raw.name_orig)
        } else {
            user
        };
        Self {
            id: raw.sensor_id,
            instance: raw.sensor_instance,
            name,
        }
    }
}

/// Owned copy of one reading record.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub kind: ReadingKind,
    pub sensor_index: u32,
    pub id: u32,
    /// User-renamed label when present, original otherwise.
    pub label: String,
    pub unit: String,
    pub value: f64,
    pub value_min: f64,
    pub value_max: f64,
    pub value_avg: f64,
}

impl Reading {
    pub(crate) fn decode(raw: &RawReading) -> Self {
        let user = fixed_str(&raw.label_user);
        let label = if user.is_empty() {
            fixed_str(&raw.label_orig)
        } else {
            user
        };
        Self {
            kind: ReadingKind::from_raw(raw.kind),
            sensor_index: raw.sensor_index,
            id: raw.reading_id,
            label,
            unit: fixed_str(&raw.unit),
            value: raw.value,
            value_min: raw.value_min,
            value_max: raw.value_max,
            value_avg: raw.value_avg,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn header(signature: u32) -> SegmentHeader {
        SegmentHeader {
            signature,
            version: 1,
            revision: 0,
            poll_time: 1_700_000_000,
            sensor_offset: 44,
            sensor_stride: 264,
            sensor_count: 0,
            reading_offset: 44,
            reading_stride: 316,
            reading_count: 0,
        }
    }

    #[test]
    fn zero_signature_is_corrupt() {
        let err = header(0).validate(4096).unwrap_err();
        assert!(matches!(err, ShmError::Corrupt { .. }));
    }

    #[test]
    fn all_ones_signature_is_corrupt() {
        let err = header(u32::MAX).validate(4096).unwrap_err();
        assert!(matches!(err, ShmError::Corrupt { .. }));
    }

    #[test]
    fn section_past_mapping_is_corrupt() {
        let mut h = header(0x5369_5748);
        h.reading_count = 100;
        let err = h.validate(4096).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("reading section"), "{msg}");
    }

    #[test]
    fn undersized_stride_is_corrupt() {
        let mut h = header(0x5369_5748);
        h.sensor_count = 1;
        h.sensor_stride = 100;
        assert!(h.validate(4096).is_err());
    }

    #[test]
    fn oversized_stride_is_accepted() {
        // Newer producers append fields to their records.
        let mut h = header(0x5369_5748);
        h.sensor_count = 2;
        h.sensor_stride = 300;
        assert!(h.validate(4096).is_ok());
    }

    #[test]
    fn header_too_small_mapping() {
        let err = SegmentHeader::read_from(&[0u8; 20]).unwrap_err();
        assert!(matches!(err, ShmError::Corrupt { .. }));
    }

    #[test]
    fn fixed_str_stops_at_nul() {
        let mut field = [0u8; 16];
        field[..3].copy_from_slice(b"CPU");
        field[4] = b'X'; // garbage past the terminator
        assert_eq!(fixed_str(&field), "CPU");
    }

    #[test]
    fn decode_prefers_user_label() {
        let mut raw = RawReading {
            kind: 1,
            sensor_index: 0,
            reading_id: 7,
            label_orig: [0; TEXT_FIELD_LEN],
            label_user: [0; TEXT_FIELD_LEN],
            unit: [0; UNIT_FIELD_LEN],
            value: 55.5,
            value_min: 40.0,
            value_max: 80.0,
            value_avg: 50.0,
        };
        raw.label_orig[..8].copy_from_slice(b"CPU Temp");
        raw.label_user[..6].copy_from_slice(b"My CPU");
        raw.unit[..3].copy_from_slice("\u{b0}C".as_bytes());

        let reading = Reading::decode(&raw);
        assert_eq!(reading.label, "My CPU");
        assert_eq!(reading.kind, ReadingKind::Temperature);
        assert_eq!(reading.unit, "\u{b0}C");
        assert_eq!(reading.value, 55.5);
    }

    #[test]
    fn unknown_kind_maps_to_other() {
        assert_eq!(ReadingKind::from_raw(99), ReadingKind::Other);
        assert_eq!(ReadingKind::from_raw(7), ReadingKind::Usage);
    }

    proptest! {
        #[test]
        fn fixed_str_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
            let s = fixed_str(&bytes);
            prop_assert!(s.len() <= bytes.len() * 3);
        }
    }
}
