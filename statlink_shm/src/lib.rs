//! StatLink Shared Memory Reader
//!
//! Read-only snapshot access to the sensor segment a third-party
//! hardware monitor publishes under `/dev/shm`. The layout is the
//! producer's, not ours: a packed header describing two record arrays
//! (sensor devices and readings) addressed by offset, element size and
//! count. The producer may grow its record types between releases, so
//! all iteration is stride-aware and every access is bounds-checked
//! against the mapping.
//!
//! # Access discipline
//!
//! The producer guards the segment with an advisory lock. Every read
//! acquires that lock with a bounded wait, copies the records out and
//! releases. No references into the mapping ever escape this crate.
//!
//! # Module Structure
//!
//! - [`layout`] - Packed record structures and decoding
//! - [`lock`] - Bounded acquisition of the producer's advisory lock
//! - [`map`] - Segment mapping abstraction (mmap or in-memory)
//! - [`reader`] - The snapshot reader itself
//! - [`error`] - Error types

pub mod error;
pub mod layout;
pub mod lock;
pub mod map;
pub mod reader;

pub use error::{ShmError, ShmResult};
pub use layout::{Reading, ReadingKind, SegmentHeader, SensorDevice};
pub use lock::ProducerLock;
pub use map::{MemSegment, SegmentMap, ShmSegment};
pub use reader::SnapshotReader;
