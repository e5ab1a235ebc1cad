use std::collections::BTreeMap;

use glam::Vec3;
use relay_core::hash::ContentHasher;
use relay_core::value::Value;

/// Parameter naming the native entry explicitly.
pub const NODE_TYPE_PARAMETER: &str = "ai:nodeType";

/// A shape implemented by the renderer itself, described by name and
/// parameters rather than geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalProcedural {
    pub file_name: String,
    pub bound: (Vec3, Vec3),
    pub parameters: BTreeMap<String, Value>,
}

impl ExternalProcedural {
    #[must_use]
    pub fn new(file_name: impl Into<String>, bound: (Vec3, Vec3)) -> Self {
        Self {
            file_name: file_name.into(),
            bound,
            parameters: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_parameter(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.parameters.insert(name.to_string(), value.into());
        self
    }

    /// Native entry to instantiate: `ai:nodeType` if given, else the file name.
    #[must_use]
    pub fn node_type(&self) -> &str {
        self.parameters
            .get(NODE_TYPE_PARAMETER)
            .and_then(Value::as_str)
            .unwrap_or(&self.file_name)
    }

    /// Parameters forwarded to the native node.
    pub fn native_parameters(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.parameters
            .iter()
            .filter(|(k, _)| k.as_str() != NODE_TYPE_PARAMETER)
            .map(|(k, v)| (k.as_str(), v))
    }

    pub(crate) fn hash_into(&self, hasher: &mut ContentHasher) {
        hasher
            .add("external")
            .add(&self.file_name)
            .add_pod(&[self.bound.0, self.bound.1])
            .add(&self.parameters);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_type_defaults_to_file_name() {
        let p = ExternalProcedural::new("volume", (Vec3::splat(-1.0), Vec3::ONE));
        assert_eq!(p.node_type(), "volume");

        let p = ExternalProcedural::new("/path/clouds.vdb", (Vec3::ZERO, Vec3::ONE))
            .with_parameter(NODE_TYPE_PARAMETER, "volume")
            .with_parameter("step_size", 0.25_f32);
        assert_eq!(p.node_type(), "volume");
        assert_eq!(p.native_parameters().count(), 1);
    }
}
