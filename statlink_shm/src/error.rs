//! Error types for shared memory snapshot access

use thiserror::Error;

/// Errors that can occur while reading the producer's segment
#[derive(Error, Debug)]
pub enum ShmError {
    /// Segment not found (producer not running or not publishing)
    #[error("Segment not found: {name}")]
    NotFound {
        /// Segment name
        name: String,
    },

    /// Header failed validation; the mapping is not a sensor segment
    #[error("Segment corrupt: {reason}")]
    Corrupt {
        /// What the validation found
        reason: String,
    },

    /// The producer held its lock past the wait bound
    #[error("Producer lock not acquired within {waited_ms}ms")]
    LockTimeout {
        /// How long we waited
        waited_ms: u64,
    },

    /// IO error
    #[error("IO error: {source}")]
    Io {
        /// Source IO error
        #[from]
        source: std::io::Error,
    },

    /// Nix system call error
    #[error("System call error: {source}")]
    Nix {
        /// Source nix error
        #[from]
        source: nix::Error,
    },
}

/// Result type for shared memory snapshot operations
pub type ShmResult<T> = Result<T, ShmError>;
