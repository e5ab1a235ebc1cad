//! Native Scene Graph
//!
//! The in-memory stand-in for a renderer's scene: named, typed nodes held in
//! a generational arena. Translators write into it; tests and the scene
//! description writer read from it.
//!
//! # Overview
//!
//! - Nodes are created from a [`NodeLibrary`] entry and addressed by
//!   [`NodeKey`]. Keys of removed nodes become stale and are never reused
//!   for a different node.
//! - Names are unique per scope. The root scope holds top-level nodes; a
//!   procedural node opens a new scope for its children.
//! - Parameters are set either raw ([`NodeGraph::set`]) or from a tagged
//!   [`Value`] converted against the declared parameter type
//!   ([`NodeGraph::set_value`]).
//! - Exactly one `options` node exists per graph.
//!
//! # Usage
//!
//! ```rust,ignore
//! let mut graph = NodeGraph::new(Arc::new(NodeLibrary::builtin()));
//! let sphere = graph.create("sphere", "ball", None)?;
//! graph.set_value(sphere, "radius", &Value::Float(2.0));
//! ```

mod convert;
pub mod io;
pub mod library;
mod node;

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::{SlotMap, new_key_type};

use crate::error::{RelayError, Result};
use crate::value::Value;

pub use convert::{convert, native_type_of};
pub use library::{NodeEntry, NodeKind, NodeLibrary, ParamType};
pub use node::{Link, NativeNode, NativeValue};

new_key_type! {
    /// Handle to a node in a [`NodeGraph`].
    pub struct NodeKey;
}

/// Name under which the options node is registered.
pub const OPTIONS_NODE_NAME: &str = "options";

/// Arena of native nodes.
pub struct NodeGraph {
    library: Arc<NodeLibrary>,
    nodes: SlotMap<NodeKey, NativeNode>,
    names: FxHashMap<(Option<NodeKey>, String), NodeKey>,
    options: NodeKey,
    next_serial: u64,
}

impl NodeGraph {
    #[must_use]
    pub fn new(library: Arc<NodeLibrary>) -> Self {
        let entry = library.get(OPTIONS_NODE_NAME).cloned().unwrap_or_else(|| {
            Arc::new(NodeEntry::new(OPTIONS_NODE_NAME, NodeKind::Options))
        });
        let mut nodes = SlotMap::with_key();
        let options = nodes.insert(NativeNode {
            name: OPTIONS_NODE_NAME.to_string(),
            entry,
            parent: None,
            params: Default::default(),
            links: Default::default(),
            declared: Default::default(),
            serial: 0,
        });
        let mut names = FxHashMap::default();
        names.insert((None, OPTIONS_NODE_NAME.to_string()), options);

        Self {
            library,
            nodes,
            names,
            options,
            next_serial: 1,
        }
    }

    #[inline]
    #[must_use]
    pub fn library(&self) -> &Arc<NodeLibrary> {
        &self.library
    }

    // ========================================================================
    // Node lifetime
    // ========================================================================

    /// Creates a node of `entry` named `name` in the scope of `parent`.
    pub fn create(&mut self, entry: &str, name: &str, parent: Option<NodeKey>) -> Result<NodeKey> {
        let entry = self.library.entry(entry)?;
        if let Some(p) = parent
            && !self.nodes.contains_key(p)
        {
            return Err(RelayError::StaleNode(format!("parent of \"{name}\"")));
        }
        let scoped = (parent, name.to_string());
        if self.names.contains_key(&scoped) {
            return Err(RelayError::DuplicateNodeName(name.to_string()));
        }

        let serial = self.next_serial;
        self.next_serial += 1;
        let key = self.nodes.insert(NativeNode {
            name: name.to_string(),
            entry,
            parent,
            params: Default::default(),
            links: Default::default(),
            declared: Default::default(),
            serial,
        });
        self.names.insert(scoped, key);
        log::trace!("Created native node \"{name}\"");
        Ok(key)
    }

    /// Removes a node and every node scoped under it.
    ///
    /// Pointers and links into removed nodes are cleared from the survivors.
    /// The options node cannot be removed.
    pub fn remove(&mut self, key: NodeKey) -> bool {
        if key == self.options || !self.nodes.contains_key(key) {
            return false;
        }

        let mut doomed = FxHashSet::default();
        let mut stack = vec![key];
        while let Some(k) = stack.pop() {
            if doomed.insert(k) {
                stack.extend(
                    self.nodes
                        .iter()
                        .filter(|(_, n)| n.parent == Some(k))
                        .map(|(child, _)| child),
                );
            }
        }

        for k in &doomed {
            if let Some(node) = self.nodes.remove(*k) {
                self.names.remove(&(node.parent, node.name));
            }
        }

        for node in self.nodes.values_mut() {
            node.links.retain(|_, link| !doomed.contains(&link.source));
            node.params.retain(|_, value| match value {
                NativeValue::Node(k) => !doomed.contains(k),
                _ => true,
            });
            for value in node.params.values_mut() {
                if let NativeValue::NodeArray(keys) = value {
                    keys.retain(|k| !doomed.contains(k));
                }
            }
        }
        true
    }

    #[must_use]
    pub fn contains(&self, key: NodeKey) -> bool {
        self.nodes.contains_key(key)
    }

    #[must_use]
    pub fn get(&self, key: NodeKey) -> Option<&NativeNode> {
        self.nodes.get(key)
    }

    /// Looks up a top-level node by name.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<NodeKey> {
        self.lookup_in(name, None)
    }

    /// Looks up a node by name within the scope of `parent`.
    #[must_use]
    pub fn lookup_in(&self, name: &str, parent: Option<NodeKey>) -> Option<NodeKey> {
        self.names.get(&(parent, name.to_string())).copied()
    }

    /// Convenience: node by top-level name.
    #[must_use]
    pub fn node(&self, name: &str) -> Option<&NativeNode> {
        self.lookup(name).and_then(|k| self.nodes.get(k))
    }

    #[inline]
    #[must_use]
    pub fn options(&self) -> NodeKey {
        self.options
    }

    #[must_use]
    pub fn options_node(&self) -> &NativeNode {
        &self.nodes[self.options]
    }

    /// Name of a live node.
    #[must_use]
    pub fn name_of(&self, key: NodeKey) -> Option<&str> {
        self.nodes.get(key).map(NativeNode::name)
    }

    // ========================================================================
    // Parameters
    // ========================================================================

    /// Stores a raw native value. Links on the same parameter are dropped.
    pub fn set(&mut self, key: NodeKey, param: &str, value: NativeValue) -> bool {
        let Some(node) = self.nodes.get_mut(key) else {
            return false;
        };
        node.links.remove(param);
        node.params.insert(param.to_string(), value);
        true
    }

    /// Clears a parameter value and any link on it.
    pub fn unset(&mut self, key: NodeKey, param: &str) {
        if let Some(node) = self.nodes.get_mut(key) {
            node.params.remove(param);
            node.links.remove(param);
        }
    }

    /// Declares a user parameter on a node.
    pub fn declare(&mut self, key: NodeKey, param: &str, ty: ParamType) -> bool {
        let Some(node) = self.nodes.get_mut(key) else {
            return false;
        };
        if node.entry.param_type(param).is_some() {
            return false;
        }
        node.declared.insert(param.to_string(), ty);
        true
    }

    /// Converts `value` against the parameter's declared type and stores it.
    ///
    /// Dynamic entries accept undeclared parameters typed from the value.
    /// Unsupported conversions warn and leave the node untouched.
    pub fn set_value(&mut self, key: NodeKey, param: &str, value: &Value) -> bool {
        let Some(node) = self.nodes.get(key) else {
            return false;
        };
        let ty = match node.param_type(param) {
            Some(ty) => Some(ty),
            None if node.entry.is_dynamic() => native_type_of(value),
            None => {
                log::warn!(
                    "Node \"{}\" ({}) has no parameter \"{param}\"",
                    node.name,
                    node.entry.name()
                );
                return false;
            }
        };
        match ty.and_then(|ty| convert(value, ty)) {
            Some(native) => self.set(key, param, native),
            None => {
                log::warn!(
                    "Cannot convert data \"{param}\" of type \"{}\".",
                    value.type_name()
                );
                false
            }
        }
    }

    /// Connects `source` (optionally a named output) into `param` of `dest`.
    pub fn link(
        &mut self,
        dest: NodeKey,
        param: &str,
        source: NodeKey,
        output: Option<&str>,
    ) -> bool {
        if !self.nodes.contains_key(source) {
            return false;
        }
        let Some(node) = self.nodes.get_mut(dest) else {
            return false;
        };
        node.links.insert(
            param.to_string(),
            Link {
                source,
                output: output.map(str::to_string),
            },
        );
        true
    }

    // ========================================================================
    // Iteration
    // ========================================================================

    /// All live nodes in creation order.
    #[must_use]
    pub fn iter(&self) -> Vec<(NodeKey, &NativeNode)> {
        let mut nodes: Vec<_> = self.nodes.iter().collect();
        nodes.sort_by_key(|(_, n)| n.serial);
        nodes
    }

    /// Live nodes created from `entry`, in creation order.
    #[must_use]
    pub fn nodes_of_entry(&self, entry: &str) -> Vec<(NodeKey, &NativeNode)> {
        self.iter()
            .into_iter()
            .filter(|(_, n)| n.entry_name() == entry)
            .collect()
    }

    #[must_use]
    pub fn count_entry(&self, entry: &str) -> usize {
        self.nodes
            .values()
            .filter(|n| n.entry_name() == entry)
            .count()
    }

    #[must_use]
    pub fn count_kind(&self, kind: NodeKind) -> usize {
        self.nodes.values().filter(|n| n.kind() == kind).count()
    }

    #[must_use]
    pub fn children(&self, parent: NodeKey) -> Vec<NodeKey> {
        self.iter()
            .into_iter()
            .filter(|(_, n)| n.parent == Some(parent))
            .map(|(k, _)| k)
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
