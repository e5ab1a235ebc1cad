//! Scene Description Documents
//!
//! A [`NodeGraph`] serializes to a self-contained JSON document. Node
//! references (pointers, node arrays, links and parent scopes) are written as
//! indices into the document's node list, so a loaded graph reproduces the
//! same structure with fresh keys.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use glam::{Mat4, Vec2, Vec3, Vec4};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::library::{NodeLibrary, ParamType};
use super::node::NativeValue;
use super::{NodeGraph, NodeKey};
use crate::error::{RelayError, Result};

const FORMAT: &str = "relay-scene";
const VERSION: u32 = 1;

/// Serialized form of a whole graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneDocument {
    pub format: String,
    pub version: u32,
    pub nodes: Vec<NodeRecord>,
}

/// Serialized form of one node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    pub name: String,
    pub entry: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<usize>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub declared: BTreeMap<String, ParamType>,
    #[serde(default)]
    pub params: BTreeMap<String, StoredValue>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub links: BTreeMap<String, StoredLink>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredLink {
    pub source: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

/// [`NativeValue`] with node keys replaced by document indices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum StoredValue {
    Byte(u8),
    Int(i32),
    UInt(u32),
    Bool(bool),
    Float(f32),
    Rgb(Vec3),
    Rgba(Vec4),
    Vector(Vec3),
    Vector2(Vec2),
    String(String),
    Matrix(Mat4),
    Node(usize),
    ByteArray(Vec<u8>),
    IntArray(Vec<i32>),
    UIntArray(Vec<u32>),
    BoolArray(Vec<bool>),
    FloatArray(Vec<f32>),
    RgbArray(Vec<Vec3>),
    VectorArray(Vec<Vec3>),
    StringArray(Vec<String>),
    MatrixArray(Vec<Mat4>),
    NodeArray(Vec<usize>),
}

/// Dangling pointers are dropped with a warning. `node` and `param` name
/// the value in that warning.
fn store(
    node: &str,
    param: &str,
    value: &NativeValue,
    index: &FxHashMap<NodeKey, usize>,
) -> Option<StoredValue> {
    use NativeValue as N;
    use StoredValue as S;
    Some(match value {
        N::Byte(v) => S::Byte(*v),
        N::Int(v) => S::Int(*v),
        N::UInt(v) => S::UInt(*v),
        N::Bool(v) => S::Bool(*v),
        N::Float(v) => S::Float(*v),
        N::Rgb(v) => S::Rgb(*v),
        N::Rgba(v) => S::Rgba(*v),
        N::Vector(v) => S::Vector(*v),
        N::Vector2(v) => S::Vector2(*v),
        N::String(v) => S::String(v.clone()),
        N::Matrix(v) => S::Matrix(*v),
        N::Node(k) => match index.get(k) {
            Some(i) => S::Node(*i),
            None => {
                log::warn!("Dropping dangling pointer \"{param}\" on node \"{node}\"");
                return None;
            }
        },
        N::ByteArray(v) => S::ByteArray(v.clone()),
        N::IntArray(v) => S::IntArray(v.clone()),
        N::UIntArray(v) => S::UIntArray(v.clone()),
        N::BoolArray(v) => S::BoolArray(v.clone()),
        N::FloatArray(v) => S::FloatArray(v.clone()),
        N::RgbArray(v) => S::RgbArray(v.clone()),
        N::VectorArray(v) => S::VectorArray(v.clone()),
        N::StringArray(v) => S::StringArray(v.clone()),
        N::MatrixArray(v) => S::MatrixArray(v.clone()),
        N::NodeArray(v) => {
            let stored: Vec<usize> = v.iter().filter_map(|k| index.get(k).copied()).collect();
            if stored.len() != v.len() {
                log::warn!(
                    "Dropping {} dangling pointer(s) from \"{param}\" on node \"{node}\"",
                    v.len() - stored.len()
                );
            }
            S::NodeArray(stored)
        }
    })
}

fn restore(value: &StoredValue, keys: &[NodeKey]) -> Result<NativeValue> {
    use NativeValue as N;
    use StoredValue as S;
    let key = |i: usize| {
        keys.get(i)
            .copied()
            .ok_or_else(|| RelayError::InvalidDocument(format!("node index {i} out of range")))
    };
    Ok(match value {
        S::Byte(v) => N::Byte(*v),
        S::Int(v) => N::Int(*v),
        S::UInt(v) => N::UInt(*v),
        S::Bool(v) => N::Bool(*v),
        S::Float(v) => N::Float(*v),
        S::Rgb(v) => N::Rgb(*v),
        S::Rgba(v) => N::Rgba(*v),
        S::Vector(v) => N::Vector(*v),
        S::Vector2(v) => N::Vector2(*v),
        S::String(v) => N::String(v.clone()),
        S::Matrix(v) => N::Matrix(*v),
        S::Node(i) => N::Node(key(*i)?),
        S::ByteArray(v) => N::ByteArray(v.clone()),
        S::IntArray(v) => N::IntArray(v.clone()),
        S::UIntArray(v) => N::UIntArray(v.clone()),
        S::BoolArray(v) => N::BoolArray(v.clone()),
        S::FloatArray(v) => N::FloatArray(v.clone()),
        S::RgbArray(v) => N::RgbArray(v.clone()),
        S::VectorArray(v) => N::VectorArray(v.clone()),
        S::StringArray(v) => N::StringArray(v.clone()),
        S::MatrixArray(v) => N::MatrixArray(v.clone()),
        S::NodeArray(v) => N::NodeArray(v.iter().map(|i| key(*i)).collect::<Result<_>>()?),
    })
}

impl NodeGraph {
    /// Snapshot of the graph as a document.
    #[must_use]
    pub fn to_document(&self) -> SceneDocument {
        let ordered = self.iter();
        let index: FxHashMap<NodeKey, usize> = ordered
            .iter()
            .enumerate()
            .map(|(i, (k, _))| (*k, i))
            .collect();

        let nodes = ordered
            .iter()
            .map(|(_, node)| NodeRecord {
                name: node.name.clone(),
                entry: node.entry_name().to_string(),
                parent: node.parent.and_then(|p| index.get(&p).copied()),
                declared: node.declared.clone(),
                params: node
                    .params
                    .iter()
                    .filter_map(|(k, v)| Some((k.clone(), store(&node.name, k, v, &index)?)))
                    .collect(),
                links: node
                    .links
                    .iter()
                    .filter_map(|(k, l)| {
                        Some((
                            k.clone(),
                            StoredLink {
                                source: *index.get(&l.source)?,
                                output: l.output.clone(),
                            },
                        ))
                    })
                    .collect(),
            })
            .collect();

        SceneDocument {
            format: FORMAT.to_string(),
            version: VERSION,
            nodes,
        }
    }

    /// Rebuilds a graph from a document.
    ///
    /// Records must list parents before their children, which
    /// [`NodeGraph::to_document`] guarantees.
    pub fn from_document(doc: &SceneDocument, library: Arc<NodeLibrary>) -> Result<Self> {
        if doc.format != FORMAT {
            return Err(RelayError::InvalidDocument(format!(
                "unexpected format \"{}\"",
                doc.format
            )));
        }
        if doc.version > VERSION {
            return Err(RelayError::InvalidDocument(format!(
                "unsupported version {}",
                doc.version
            )));
        }

        let mut graph = Self::new(library);
        let mut keys = Vec::with_capacity(doc.nodes.len());

        // Pass 1: create nodes.
        for record in &doc.nodes {
            let key = if record.entry == super::OPTIONS_NODE_NAME && record.parent.is_none() {
                graph.options()
            } else {
                let parent = match record.parent {
                    Some(i) => Some(*keys.get(i).ok_or_else(|| {
                        RelayError::InvalidDocument(format!(
                            "parent of \"{}\" appears after it",
                            record.name
                        ))
                    })?),
                    None => None,
                };
                graph.create(&record.entry, &record.name, parent)?
            };
            keys.push(key);
        }

        // Pass 2: parameters and links, now that every index resolves.
        for (record, key) in doc.nodes.iter().zip(&keys) {
            for (param, ty) in &record.declared {
                graph.declare(*key, param, *ty);
            }
            for (param, value) in &record.params {
                let native = restore(value, &keys)?;
                graph.set(*key, param, native);
            }
            for (param, link) in &record.links {
                let source = *keys.get(link.source).ok_or_else(|| {
                    RelayError::InvalidDocument(format!("link source {} out of range", link.source))
                })?;
                graph.link(*key, param, source, link.output.as_deref());
            }
        }

        Ok(graph)
    }

    /// Writes the graph to `path` as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(&self.to_document())?;
        fs::write(path, json)?;
        log::info!("Wrote scene description to {}", path.display());
        Ok(())
    }

    /// Reads a graph previously written by [`NodeGraph::save`].
    pub fn load(path: impl AsRef<Path>, library: Arc<NodeLibrary>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let doc: SceneDocument = serde_json::from_str(&text)?;
        Self::from_document(&doc, library)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn test_document_preserves_pointers_and_scopes() {
        let lib = Arc::new(NodeLibrary::builtin());
        let mut graph = NodeGraph::new(lib.clone());
        let proc = graph.create("procedural", "proc", None).unwrap();
        let ball = graph.create("sphere", "ball", Some(proc)).unwrap();
        graph.set_value(ball, "radius", &Value::Float(3.0));
        let inst = graph.create("ginstance", "inst", None).unwrap();
        graph.set(inst, "node", NativeValue::Node(proc));
        let flat = graph.create("flat", "f", None).unwrap();
        let lambert = graph.create("lambert", "l", None).unwrap();
        graph.link(lambert, "Kd_color", flat, Some("r"));

        let loaded = NodeGraph::from_document(&graph.to_document(), lib).unwrap();
        assert_eq!(loaded.len(), graph.len());

        let proc2 = loaded.lookup("proc").unwrap();
        let ball2 = loaded.lookup_in("ball", Some(proc2)).unwrap();
        assert_eq!(loaded.get(ball2).unwrap().get_float("radius"), Some(3.0));
        assert_eq!(loaded.node("inst").unwrap().get_node("node"), Some(proc2));

        let link = loaded.node("l").unwrap().link("Kd_color").unwrap().clone();
        assert_eq!(loaded.name_of(link.source), Some("f"));
        assert_eq!(link.output.as_deref(), Some("r"));
    }

    #[test]
    fn test_dangling_pointers_are_dropped() {
        let lib = Arc::new(NodeLibrary::builtin());
        let mut graph = NodeGraph::new(lib.clone());
        let kept = graph.create("flat", "kept", None).unwrap();
        let gone = graph.create("flat", "gone", None).unwrap();
        let inst = graph.create("ginstance", "inst", None).unwrap();
        assert!(graph.remove(gone));
        graph.set(inst, "node", NativeValue::Node(gone));
        let options = graph.options();
        graph.set(options, "aov_shaders", NativeValue::NodeArray(vec![kept, gone]));

        let doc = graph.to_document();
        let record = doc.nodes.iter().find(|r| r.name == "inst").unwrap();
        assert!(!record.params.contains_key("node"));

        let loaded = NodeGraph::from_document(&doc, lib).unwrap();
        let kept2 = loaded.lookup("kept").unwrap();
        assert_eq!(
            loaded.options_node().get_nodes("aov_shaders"),
            Some(&[kept2][..])
        );
        assert!(loaded.node("inst").unwrap().get("node").is_none());
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.json");
        let lib = Arc::new(NodeLibrary::builtin());

        let mut graph = NodeGraph::new(lib.clone());
        graph.set(graph.options(), "AA_seed", NativeValue::Int(7));
        graph.save(&path).unwrap();

        let loaded = NodeGraph::load(&path, lib).unwrap();
        assert_eq!(loaded.options_node().get_int("AA_seed"), Some(7));
    }

    #[test]
    fn test_rejects_foreign_format() {
        let doc = SceneDocument {
            format: "other".into(),
            version: 1,
            nodes: vec![],
        };
        assert!(matches!(
            NodeGraph::from_document(&doc, Arc::new(NodeLibrary::builtin())),
            Err(RelayError::InvalidDocument(_))
        ));
    }
}
