//! StatLink Daemon Library
//!
//! Acquisition, failover and emission logic behind the `statlink`
//! binary. The pipeline per poll tick:
//!
//! 1. [`sources`] reads each configured metric from the active source
//!    (shared memory, query provider, REST endpoint or built-in system
//!    metrics).
//! 2. [`cache`] backfills failed reads with last-known-good values.
//! 3. [`health`] tracks source failures and schedules reconnects with
//!    doubling backoff.
//! 4. [`emitter`] classifies the tick and sends exactly one UDP packet.
//!
//! [`discovery`] enumerates sensors up front and [`catalog`] turns
//! their free-form labels into unique, display-sized names.

pub mod cache;
pub mod catalog;
pub mod discovery;
pub mod emitter;
pub mod health;
pub mod poller;
pub mod sources;
