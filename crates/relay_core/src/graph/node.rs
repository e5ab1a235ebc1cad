use std::collections::BTreeMap;
use std::sync::Arc;

use glam::{Mat4, Vec2, Vec3, Vec4};

use super::NodeKey;
use super::library::{NodeEntry, NodeKind, ParamType};

/// A typed parameter value stored on a native node.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
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
    Node(NodeKey),
    ByteArray(Vec<u8>),
    IntArray(Vec<i32>),
    UIntArray(Vec<u32>),
    BoolArray(Vec<bool>),
    FloatArray(Vec<f32>),
    RgbArray(Vec<Vec3>),
    VectorArray(Vec<Vec3>),
    StringArray(Vec<String>),
    MatrixArray(Vec<Mat4>),
    NodeArray(Vec<NodeKey>),
}

impl NativeValue {
    #[must_use]
    pub fn param_type(&self) -> ParamType {
        match self {
            Self::Byte(_) => ParamType::Byte,
            Self::Int(_) => ParamType::Int,
            Self::UInt(_) => ParamType::UInt,
            Self::Bool(_) => ParamType::Bool,
            Self::Float(_) => ParamType::Float,
            Self::Rgb(_) => ParamType::Rgb,
            Self::Rgba(_) => ParamType::Rgba,
            Self::Vector(_) => ParamType::Vector,
            Self::Vector2(_) => ParamType::Vector2,
            Self::String(_) => ParamType::String,
            Self::Matrix(_) => ParamType::Matrix,
            Self::Node(_) => ParamType::Node,
            Self::ByteArray(_) => ParamType::ByteArray,
            Self::IntArray(_) => ParamType::IntArray,
            Self::UIntArray(_) => ParamType::UIntArray,
            Self::BoolArray(_) => ParamType::BoolArray,
            Self::FloatArray(_) => ParamType::FloatArray,
            Self::RgbArray(_) => ParamType::RgbArray,
            Self::VectorArray(_) => ParamType::VectorArray,
            Self::StringArray(_) => ParamType::StringArray,
            Self::MatrixArray(_) => ParamType::MatrixArray,
            Self::NodeArray(_) => ParamType::NodeArray,
        }
    }

    #[must_use]
    pub fn as_byte(&self) -> Option<u8> {
        match self {
            Self::Byte(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Byte(v) => Some(i32::from(*v)),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_uint(&self) -> Option<u32> {
        match self {
            Self::UInt(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f32> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_rgb(&self) -> Option<Vec3> {
        match self {
            Self::Rgb(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_vector(&self) -> Option<Vec3> {
        match self {
            Self::Vector(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_matrix(&self) -> Option<Mat4> {
        match self {
            Self::Matrix(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_node(&self) -> Option<NodeKey> {
        match self {
            Self::Node(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_float_array(&self) -> Option<&[f32]> {
        match self {
            Self::FloatArray(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_string_array(&self) -> Option<&[String]> {
        match self {
            Self::StringArray(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_matrix_array(&self) -> Option<&[Mat4]> {
        match self {
            Self::MatrixArray(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_node_array(&self) -> Option<&[NodeKey]> {
        match self {
            Self::NodeArray(v) => Some(v),
            _ => None,
        }
    }

    /// Number of elements (1 for scalars).
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::ByteArray(v) => v.len(),
            Self::IntArray(v) => v.len(),
            Self::UIntArray(v) => v.len(),
            Self::BoolArray(v) => v.len(),
            Self::FloatArray(v) => v.len(),
            Self::RgbArray(v) | Self::VectorArray(v) => v.len(),
            Self::StringArray(v) => v.len(),
            Self::MatrixArray(v) => v.len(),
            Self::NodeArray(v) => v.len(),
            _ => 1,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Node keys referenced by this value.
    pub(crate) fn referenced_nodes(&self) -> &[NodeKey] {
        match self {
            Self::Node(k) => std::slice::from_ref(k),
            Self::NodeArray(v) => v,
            _ => &[],
        }
    }
}

/// A shading connection into a node parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub source: NodeKey,
    /// Component or named output of the source (`"r"`, `"out"`), if any.
    pub output: Option<String>,
}

/// A node in the native graph.
#[derive(Debug, Clone)]
pub struct NativeNode {
    pub(crate) name: String,
    pub(crate) entry: Arc<NodeEntry>,
    pub(crate) parent: Option<NodeKey>,
    pub(crate) params: BTreeMap<String, NativeValue>,
    pub(crate) links: BTreeMap<String, Link>,
    pub(crate) declared: BTreeMap<String, ParamType>,
    pub(crate) serial: u64,
}

impl NativeNode {
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn entry(&self) -> &NodeEntry {
        &self.entry
    }

    #[inline]
    #[must_use]
    pub fn entry_name(&self) -> &str {
        self.entry.name()
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.entry.kind()
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    /// Declared type of `param`, from the entry or a user declaration.
    #[must_use]
    pub fn param_type(&self, param: &str) -> Option<ParamType> {
        self.entry
            .param_type(param)
            .or_else(|| self.declared.get(param).copied())
    }

    #[must_use]
    pub fn is_declared(&self, param: &str) -> bool {
        self.declared.contains_key(param)
    }

    #[must_use]
    pub fn get(&self, param: &str) -> Option<&NativeValue> {
        self.params.get(param)
    }

    #[must_use]
    pub fn link(&self, param: &str) -> Option<&Link> {
        self.links.get(param)
    }

    pub fn params(&self) -> impl Iterator<Item = (&str, &NativeValue)> + '_ {
        self.params.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn links(&self) -> impl Iterator<Item = (&str, &Link)> + '_ {
        self.links.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn declarations(&self) -> impl Iterator<Item = (&str, ParamType)> + '_ {
        self.declared.iter().map(|(k, v)| (k.as_str(), *v))
    }

    // ── Typed getters ──

    #[must_use]
    pub fn get_byte(&self, param: &str) -> Option<u8> {
        self.get(param).and_then(NativeValue::as_byte)
    }

    #[must_use]
    pub fn get_int(&self, param: &str) -> Option<i32> {
        self.get(param).and_then(NativeValue::as_int)
    }

    #[must_use]
    pub fn get_bool(&self, param: &str) -> Option<bool> {
        self.get(param).and_then(NativeValue::as_bool)
    }

    #[must_use]
    pub fn get_float(&self, param: &str) -> Option<f32> {
        self.get(param).and_then(NativeValue::as_float)
    }

    #[must_use]
    pub fn get_rgb(&self, param: &str) -> Option<Vec3> {
        self.get(param).and_then(NativeValue::as_rgb)
    }

    #[must_use]
    pub fn get_str(&self, param: &str) -> Option<&str> {
        self.get(param).and_then(NativeValue::as_str)
    }

    #[must_use]
    pub fn get_matrix(&self, param: &str) -> Option<Mat4> {
        self.get(param).and_then(NativeValue::as_matrix)
    }

    #[must_use]
    pub fn get_node(&self, param: &str) -> Option<NodeKey> {
        self.get(param).and_then(NativeValue::as_node)
    }

    #[must_use]
    pub fn get_strings(&self, param: &str) -> Option<&[String]> {
        self.get(param).and_then(NativeValue::as_string_array)
    }

    #[must_use]
    pub fn get_nodes(&self, param: &str) -> Option<&[NodeKey]> {
        self.get(param).and_then(NativeValue::as_node_array)
    }
}
