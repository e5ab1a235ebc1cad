//! Content Hashing
//!
//! Cache keys throughout Relay are content hashes: two payloads with equal
//! content produce equal keys regardless of where or when they were built.
//! Long-lived keys (geometry, shader networks, attribute sets) use xxh3,
//! short-lived lookup keys use Fx.

use std::hash::{Hash, Hasher};

use xxhash_rust::xxh3::{Xxh3, xxh3_64};

/// xxh3-64 of any `Hash` value.
#[must_use]
pub fn content_hash<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = Xxh3::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// xxh3-64 of raw bytes.
#[inline]
#[must_use]
pub fn hash_bytes(bytes: &[u8]) -> u64 {
    xxh3_64(bytes)
}

/// Fast non-cryptographic hash for in-memory lookups.
pub fn fx_hash_key<K: Hash>(key: &K) -> u64 {
    let mut hasher = rustc_hash::FxHasher::default();
    key.hash(&mut hasher);
    hasher.finish()
}

/// Incremental content hasher for composite keys.
pub struct ContentHasher {
    inner: Xxh3,
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentHasher {
    #[must_use]
    pub fn new() -> Self {
        Self { inner: Xxh3::new() }
    }

    /// Feeds a `Hash` value.
    pub fn add<T: Hash + ?Sized>(&mut self, value: &T) -> &mut Self {
        value.hash(&mut self.inner);
        self
    }

    /// Feeds raw bytes (vertex data, indices).
    pub fn add_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.inner.update(bytes);
        self
    }

    /// Feeds a slice of plain-old-data (e.g. `Vec3` points) as bytes.
    pub fn add_pod<T: bytemuck::Pod>(&mut self, values: &[T]) -> &mut Self {
        self.inner.update(bytemuck::cast_slice(values));
        self
    }

    #[must_use]
    pub fn finish(&self) -> u64 {
        self.inner.digest()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_consistency() {
        assert_eq!(content_hash("polymesh"), content_hash("polymesh"));
        assert_ne!(content_hash("polymesh"), content_hash("curves"));
    }

    #[test]
    fn test_incremental_order_matters() {
        let mut a = ContentHasher::new();
        a.add(&1u32).add(&2u32);
        let mut b = ContentHasher::new();
        b.add(&2u32).add(&1u32);
        assert_ne!(a.finish(), b.finish());
    }
}
