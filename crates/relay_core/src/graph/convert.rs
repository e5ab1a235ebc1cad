//! Conversion from [`Value`] to [`NativeValue`] against a declared parameter
//! type. Returns `None` when no sensible conversion exists; callers report
//! that once and skip the value.

use crate::value::Value;

use super::library::ParamType;
use super::node::NativeValue;

/// Converts `value` for a parameter declared as `ty`.
///
/// Scalars convert to single-element arrays so that array parameters can be
/// authored with a single value.
#[must_use]
pub fn convert(value: &Value, ty: ParamType) -> Option<NativeValue> {
    use NativeValue as N;
    use ParamType as P;

    let native = match (ty, value) {
        (P::Byte, Value::Int(i)) => N::Byte(u8::try_from(*i).ok()?),
        (P::Byte, Value::Bool(b)) => N::Byte(u8::from(*b)),
        (P::Int, Value::Int(i)) => N::Int(*i),
        (P::Int, Value::Bool(b)) => N::Int(i32::from(*b)),
        (P::UInt, Value::Int(i)) => N::UInt(u32::try_from(*i).ok()?),
        (P::Bool, Value::Bool(b)) => N::Bool(*b),
        (P::Bool, Value::Int(i)) => N::Bool(*i != 0),
        (P::Float, Value::Float(f)) => N::Float(*f),
        (P::Float, Value::Int(i)) => N::Float(*i as f32),
        (P::Rgb, Value::Color3f(c) | Value::V3f(c)) => N::Rgb(*c),
        (P::Rgb, Value::Color4f(c)) => N::Rgb(c.truncate()),
        (P::Rgba, Value::Color4f(c)) => N::Rgba(*c),
        (P::Rgba, Value::Color3f(c)) => N::Rgba(c.extend(1.0)),
        (P::Vector, Value::V3f(v) | Value::Color3f(v)) => N::Vector(*v),
        (P::Vector2, Value::V2f(v)) => N::Vector2(*v),
        (P::Vector2, Value::V2i(v)) => N::Vector2(v.as_vec2()),
        (P::String, Value::String(s)) => N::String(s.clone()),
        (P::Matrix, Value::M44f(m)) => N::Matrix(*m),

        (P::ByteArray, Value::IntArray(v)) => N::ByteArray(
            v.iter()
                .map(|i| u8::try_from(*i).ok())
                .collect::<Option<Vec<_>>>()?,
        ),
        (P::IntArray, Value::IntArray(v)) => N::IntArray(v.clone()),
        (P::UIntArray, Value::IntArray(v)) => N::UIntArray(
            v.iter()
                .map(|i| u32::try_from(*i).ok())
                .collect::<Option<Vec<_>>>()?,
        ),
        (P::BoolArray, Value::BoolArray(v)) => N::BoolArray(v.clone()),
        (P::FloatArray, Value::FloatArray(v)) => N::FloatArray(v.clone()),
        (P::RgbArray, Value::Color3fArray(v) | Value::V3fArray(v)) => N::RgbArray(v.clone()),
        (P::VectorArray, Value::V3fArray(v) | Value::Color3fArray(v)) => {
            N::VectorArray(v.clone())
        }
        (P::StringArray, Value::StringArray(v)) => N::StringArray(v.clone()),
        (P::MatrixArray, Value::M44fArray(v)) => N::MatrixArray(v.clone()),

        // Single value into an array parameter.
        (array, scalar) if array.is_array() => {
            let element = scalar_of(array)?;
            return match convert(scalar, element)? {
                N::Byte(v) => Some(N::ByteArray(vec![v])),
                N::Int(v) => Some(N::IntArray(vec![v])),
                N::UInt(v) => Some(N::UIntArray(vec![v])),
                N::Bool(v) => Some(N::BoolArray(vec![v])),
                N::Float(v) => Some(N::FloatArray(vec![v])),
                N::Rgb(v) => Some(N::RgbArray(vec![v])),
                N::Vector(v) => Some(N::VectorArray(vec![v])),
                N::String(v) => Some(N::StringArray(vec![v])),
                N::Matrix(v) => Some(N::MatrixArray(vec![v])),
                _ => None,
            };
        }
        _ => return None,
    };
    Some(native)
}

fn scalar_of(array: ParamType) -> Option<ParamType> {
    Some(match array {
        ParamType::ByteArray => ParamType::Byte,
        ParamType::IntArray => ParamType::Int,
        ParamType::UIntArray => ParamType::UInt,
        ParamType::BoolArray => ParamType::Bool,
        ParamType::FloatArray => ParamType::Float,
        ParamType::RgbArray => ParamType::Rgb,
        ParamType::VectorArray => ParamType::Vector,
        ParamType::StringArray => ParamType::String,
        ParamType::MatrixArray => ParamType::Matrix,
        _ => return None,
    })
}

/// Natural native type of a value, for parameters that have no declaration
/// (user constants, dynamic entries).
#[must_use]
pub fn native_type_of(value: &Value) -> Option<ParamType> {
    Some(match value {
        Value::Bool(_) => ParamType::Bool,
        Value::Int(_) => ParamType::Int,
        Value::Float(_) => ParamType::Float,
        Value::String(_) => ParamType::String,
        Value::V2f(_) | Value::V2i(_) => ParamType::Vector2,
        Value::V3f(_) => ParamType::Vector,
        Value::Color3f(_) => ParamType::Rgb,
        Value::Color4f(_) => ParamType::Rgba,
        Value::M44f(_) => ParamType::Matrix,
        Value::BoolArray(_) => ParamType::BoolArray,
        Value::IntArray(_) => ParamType::IntArray,
        Value::FloatArray(_) => ParamType::FloatArray,
        Value::StringArray(_) => ParamType::StringArray,
        Value::V3fArray(_) => ParamType::VectorArray,
        Value::Color3fArray(_) => ParamType::RgbArray,
        Value::M44fArray(_) => ParamType::MatrixArray,
        Value::V3i(_) | Value::FloatSpline(_) | Value::ColorSpline(_) => return None,
    })
}
