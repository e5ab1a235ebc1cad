//! Shader Cache
//!
//! Content-addressed store of translated networks. Structurally equal
//! networks resolve to the same native nodes no matter how many objects
//! reference them, or under which handles they were authored.
//!
//! Entries are reference counted. Releasing the last reference does not
//! delete anything by itself; [`ShaderCache::collect_garbage`] removes the
//! native nodes of unreferenced entries. Interactive sessions call it on
//! every commit, batch sessions never need to.

use std::sync::Arc;

use relay_core::error::Result;
use relay_core::graph::{NodeGraph, NodeKey};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::network::ShaderNetwork;
use crate::translator::{NodeNaming, TranslatedNetwork, translate};

/// Reference to a cached network, returned by [`ShaderCache::acquire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderHandle {
    hash: u64,
    /// Native output node. Also disambiguates hash collisions.
    pub node: NodeKey,
}

struct CacheEntry {
    network: Arc<ShaderNetwork>,
    translated: TranslatedNetwork,
    refs: usize,
}

/// Content-addressed, reference-counted cache of translated networks.
pub struct ShaderCache {
    prefix: String,
    parent: Option<NodeKey>,
    entries: FxHashMap<u64, SmallVec<[CacheEntry; 1]>>,
}

impl ShaderCache {
    /// Cache whose nodes are named `<prefix>:<hash>:<handle>`.
    #[must_use]
    pub fn new(prefix: impl Into<String>, parent: Option<NodeKey>) -> Self {
        Self {
            prefix: prefix.into(),
            parent,
            entries: FxHashMap::default(),
        }
    }

    /// Returns the native output node for `network`, translating it on first
    /// use, and takes a reference on it.
    pub fn acquire(&mut self, graph: &mut NodeGraph, network: &Arc<ShaderNetwork>) -> Result<ShaderHandle> {
        let hash = network.content_hash();
        let bucket = self.entries.entry(hash).or_default();

        if let Some(entry) = bucket.iter_mut().find(|e| *e.network == **network) {
            entry.refs += 1;
            return Ok(ShaderHandle {
                hash,
                node: entry.translated.output,
            });
        }

        let prefix = if bucket.is_empty() {
            format!("{}:{hash:016x}", self.prefix)
        } else {
            format!("{}:{hash:016x}-{}", self.prefix, bucket.len())
        };
        let translated = match translate(graph, network, &NodeNaming::prefixed(prefix), self.parent) {
            Ok(t) => t,
            Err(err) => {
                if bucket.is_empty() {
                    self.entries.remove(&hash);
                }
                return Err(err);
            }
        };
        log::debug!(
            "Translated shader network {hash:016x} ({} nodes)",
            translated.nodes.len()
        );

        let node = translated.output;
        bucket.push(CacheEntry {
            network: Arc::clone(network),
            translated,
            refs: 1,
        });
        Ok(ShaderHandle { hash, node })
    }

    /// Drops one reference taken by [`ShaderCache::acquire`].
    pub fn release(&mut self, handle: ShaderHandle) {
        if let Some(entry) = self
            .entries
            .get_mut(&handle.hash)
            .and_then(|bucket| bucket.iter_mut().find(|e| e.translated.output == handle.node))
        {
            entry.refs = entry.refs.saturating_sub(1);
        }
    }

    /// Deletes the native nodes of every unreferenced network. Returns the
    /// number of networks removed.
    pub fn collect_garbage(&mut self, graph: &mut NodeGraph) -> usize {
        let mut removed = 0;
        self.entries.retain(|_, bucket| {
            bucket.retain(|entry| {
                if entry.refs > 0 {
                    return true;
                }
                for key in &entry.translated.nodes {
                    graph.remove(*key);
                }
                removed += 1;
                false
            });
            !bucket.is_empty()
        });
        if removed > 0 {
            log::debug!("Collected {removed} unreferenced shader networks");
        }
        removed
    }

    /// Number of distinct networks held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.values().map(SmallVec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current reference count of a handle's network.
    #[must_use]
    pub fn ref_count(&self, handle: ShaderHandle) -> usize {
        self.entries
            .get(&handle.hash)
            .and_then(|bucket| bucket.iter().find(|e| e.translated.output == handle.node))
            .map_or(0, |e| e.refs)
    }
}
