//! Last-known-good metric values.
//!
//! The display client has no notion of a missing row; every packet
//! carries the full configured metric list. When a read fails the
//! cached value stands in, and a metric that has never been read at
//! all reports zero. The zero default is applied at packet assembly,
//! never stored, so a later first read is distinguishable from it.

use std::collections::HashMap;

/// Per-slot last-known-good values.
#[derive(Default)]
pub struct ValueCache {
    values: HashMap<u8, i64>,
}

impl ValueCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, id: u8, value: i64) {
        self.values.insert(id, value);
    }

    pub fn get(&self, id: u8) -> Option<i64> {
        self.values.get(&id).copied()
    }

    /// Cached value, or the wire default for a never-read slot.
    pub fn get_or_default(&self, id: u8) -> i64 {
        self.get(id).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_read_slot_defaults_to_zero() {
        let cache = ValueCache::new();
        assert_eq!(cache.get(7), None);
        assert_eq!(cache.get_or_default(7), 0);
    }

    #[test]
    fn last_write_wins() {
        let mut cache = ValueCache::new();
        cache.put(7, 55);
        cache.put(7, 60);
        assert_eq!(cache.get(7), Some(60));
        assert_eq!(cache.get_or_default(7), 60);
    }
}
