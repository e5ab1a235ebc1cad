//! Tagged Values
//!
//! [`Value`] is the closed set of data that attributes, options, output
//! parameters and shader parameters can carry. Each variant has a stable
//! [`Value::type_name`] used in diagnostics.
//!
//! Values are hashed bit-exactly (floats by their bit pattern) so that two
//! payloads with identical content always produce identical cache keys.

use std::hash::{Hash, Hasher};

use glam::{IVec2, IVec3, Mat4, Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// Interpolation basis of a [`Spline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SplineBasis {
    #[default]
    Linear,
    BSpline,
    CatmullRom,
    Bezier,
    Constant,
}

impl SplineBasis {
    /// Name used by shading languages for this basis.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::BSpline => "bspline",
            Self::CatmullRom => "catmull-rom",
            Self::Bezier => "bezier",
            Self::Constant => "constant",
        }
    }
}

/// A 1D spline of `(position, value)` control points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spline<T> {
    pub basis: SplineBasis,
    pub points: Vec<(f32, T)>,
}

impl<T> Spline<T> {
    #[must_use]
    pub fn new(basis: SplineBasis, points: Vec<(f32, T)>) -> Self {
        Self { basis, points }
    }

    pub fn positions(&self) -> impl Iterator<Item = f32> + '_ {
        self.points.iter().map(|(p, _)| *p)
    }

    pub fn values(&self) -> impl Iterator<Item = &T> + '_ {
        self.points.iter().map(|(_, v)| v)
    }
}

/// Closed tagged value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Int(i32),
    Float(f32),
    String(String),
    V2i(IVec2),
    V3i(IVec3),
    V2f(Vec2),
    V3f(Vec3),
    Color3f(Vec3),
    Color4f(Vec4),
    M44f(Mat4),
    BoolArray(Vec<bool>),
    IntArray(Vec<i32>),
    FloatArray(Vec<f32>),
    StringArray(Vec<String>),
    V3fArray(Vec<Vec3>),
    Color3fArray(Vec<Vec3>),
    M44fArray(Vec<Mat4>),
    FloatSpline(Spline<f32>),
    ColorSpline(Spline<Vec3>),
}

impl Value {
    /// Stable, human readable name of the variant.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "Bool",
            Self::Int(_) => "Int",
            Self::Float(_) => "Float",
            Self::String(_) => "String",
            Self::V2i(_) => "V2i",
            Self::V3i(_) => "V3i",
            Self::V2f(_) => "V2f",
            Self::V3f(_) => "V3f",
            Self::Color3f(_) => "Color3f",
            Self::Color4f(_) => "Color4f",
            Self::M44f(_) => "M44f",
            Self::BoolArray(_) => "BoolArray",
            Self::IntArray(_) => "IntArray",
            Self::FloatArray(_) => "FloatArray",
            Self::StringArray(_) => "StringArray",
            Self::V3fArray(_) => "V3fArray",
            Self::Color3fArray(_) => "Color3fArray",
            Self::M44fArray(_) => "M44fArray",
            Self::FloatSpline(_) => "FloatSpline",
            Self::ColorSpline(_) => "ColorSpline",
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Int(i) => Some(*i != 0),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Bool(b) => Some(i32::from(*b)),
            _ => None,
        }
    }

    /// Numeric scalar view. Ints widen to floats.
    #[must_use]
    pub fn as_float(&self) -> Option<f32> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f32),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
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
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Vec2> for Value {
    fn from(v: Vec2) -> Self {
        Self::V2f(v)
    }
}

impl From<Vec3> for Value {
    fn from(v: Vec3) -> Self {
        Self::V3f(v)
    }
}

impl From<Mat4> for Value {
    fn from(v: Mat4) -> Self {
        Self::M44f(v)
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Self::StringArray(v)
    }
}

// ============================================================================
// Bit-exact hashing
// ============================================================================

fn hash_floats<H: Hasher>(values: &[f32], state: &mut H) {
    values.len().hash(state);
    for v in values {
        v.to_bits().hash(state);
    }
}

fn hash_vec3s<H: Hasher>(values: &[Vec3], state: &mut H) {
    values.len().hash(state);
    for v in values {
        hash_floats(&v.to_array(), state);
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_name().hash(state);
        match self {
            Self::Bool(v) => v.hash(state),
            Self::Int(v) => v.hash(state),
            Self::Float(v) => v.to_bits().hash(state),
            Self::String(v) => v.hash(state),
            Self::V2i(v) => v.to_array().hash(state),
            Self::V3i(v) => v.to_array().hash(state),
            Self::V2f(v) => hash_floats(&v.to_array(), state),
            Self::V3f(v) | Self::Color3f(v) => hash_floats(&v.to_array(), state),
            Self::Color4f(v) => hash_floats(&v.to_array(), state),
            Self::M44f(m) => hash_floats(&m.to_cols_array(), state),
            Self::BoolArray(v) => v.hash(state),
            Self::IntArray(v) => v.hash(state),
            Self::FloatArray(v) => hash_floats(v, state),
            Self::StringArray(v) => v.hash(state),
            Self::V3fArray(v) | Self::Color3fArray(v) => hash_vec3s(v, state),
            Self::M44fArray(v) => {
                v.len().hash(state);
                for m in v {
                    hash_floats(&m.to_cols_array(), state);
                }
            }
            Self::FloatSpline(s) => {
                s.basis.hash(state);
                hash_floats(&s.positions().collect::<Vec<_>>(), state);
                hash_floats(&s.values().copied().collect::<Vec<_>>(), state);
            }
            Self::ColorSpline(s) => {
                s.basis.hash(state);
                hash_floats(&s.positions().collect::<Vec<_>>(), state);
                hash_vec3s(&s.values().copied().collect::<Vec<_>>(), state);
            }
        }
    }
}
