//! StatLink Common Library
//!
//! Shared constants, the closed sensor data model, the UDP wire payload
//! and configuration loading for all StatLink workspace crates.
//!
//! # Module Structure
//!
//! - [`consts`] - Numeric limits, default paths and timing constants
//! - [`metric`] - Sensor keys, categories and catalog/config entries
//! - [`packet`] - Link status codes and the versioned UDP payload
//! - [`config`] - Monitor configuration loading and validation
//! - [`prelude`] - Common re-exports for convenience

pub mod config;
pub mod consts;
pub mod metric;
pub mod packet;
pub mod prelude;
