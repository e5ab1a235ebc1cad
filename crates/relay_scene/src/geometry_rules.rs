//! Geometry Rules
//!
//! Which attributes change the processed geometry of a shape is a property
//! of the backend, not of the attribute keys themselves. A subdivision
//! iteration count means nothing to a polygon mesh, and step size means
//! nothing to curves. [`GeometryRules`] is the table describing this, and
//! [`EffectiveGeometry`] is what the table yields for one shape: the subset
//! of attribute values that actually shape the native geometry.
//!
//! The effective configuration drives three decisions:
//! - the geometry key (equal keys share one native shape),
//! - whether a shape may be instanced at all (adaptive tessellation depends
//!   on placement),
//! - whether an attribute edit can be applied in place.
//!
//! # Usage
//!
//! ```rust,ignore
//! let rules = GeometryRules::default();
//! let effective = rules.effective(ShapeKind::Mesh, Some(MeshInterpolation::Linear), &attrs, &BTreeMap::new());
//! if rules.is_instanceable(&effective) { /* share */ }
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use relay_core::hash::ContentHasher;
use relay_core::value::Value;
use relay_shading::ShaderNetwork;
use smallvec::SmallVec;

use crate::attributes::AttributeSet;
use crate::primitives::{MeshInterpolation, ShapeKind};

/// When a rule contributes to the effective configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleCondition {
    /// For every shape of a matching kind.
    Always,
    /// Only for meshes that are actually being subdivided.
    Subdivided,
}

/// One geometry-affecting attribute.
#[derive(Debug, Clone)]
pub struct GeometryRule {
    /// Attribute key, e.g. `ai:polymesh:subdiv_iterations`.
    pub attribute: String,
    /// Native shape parameter the value is written to.
    pub parameter: String,
    pub default: Value,
    pub kinds: SmallVec<[ShapeKind; 4]>,
    pub condition: RuleCondition,
}

impl GeometryRule {
    #[must_use]
    pub fn new(
        attribute: &str,
        parameter: &str,
        default: impl Into<Value>,
        kinds: &[ShapeKind],
        condition: RuleCondition,
    ) -> Self {
        Self {
            attribute: attribute.to_string(),
            parameter: parameter.to_string(),
            default: default.into(),
            kinds: kinds.iter().copied().collect(),
            condition,
        }
    }

    fn applies_to(&self, kind: ShapeKind, subdivided: bool) -> bool {
        self.kinds.contains(&kind)
            && match self.condition {
                RuleCondition::Always => true,
                RuleCondition::Subdivided => subdivided,
            }
    }
}

/// Native subdivision scheme of a mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubdivType {
    None,
    Linear,
    CatClark,
}

impl SubdivType {
    #[must_use]
    pub fn native_name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Linear => "linear",
            Self::CatClark => "catclark",
        }
    }
}

/// Inputs of the instancing predicate: shapes whose tessellation depends on
/// placement cannot be shared.
#[derive(Debug, Clone)]
pub struct InstancingPredicate {
    pub adaptive_error: String,
    pub adaptive_space: String,
    /// The one adaptive space that is placement independent.
    pub object_space: String,
}

impl Default for InstancingPredicate {
    fn default() -> Self {
        Self {
            adaptive_error: "subdiv_adaptive_error".to_string(),
            adaptive_space: "subdiv_adaptive_space".to_string(),
            object_space: "object".to_string(),
        }
    }
}

/// Configurable table of geometry-affecting attributes.
#[derive(Debug, Clone)]
pub struct GeometryRules {
    rules: Vec<GeometryRule>,
    /// Attribute that turns linear meshes into subdivision meshes.
    pub subdivide_polygons: String,
    pub instancing: InstancingPredicate,
}

impl Default for GeometryRules {
    fn default() -> Self {
        Self::builtin()
    }
}

impl GeometryRules {
    /// A table with no rules at all.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            rules: Vec::new(),
            subdivide_polygons: "ai:polymesh:subdivide_polygons".to_string(),
            instancing: InstancingPredicate::default(),
        }
    }

    /// The rules of the native backend.
    #[must_use]
    pub fn builtin() -> Self {
        use RuleCondition::{Always, Subdivided};
        use ShapeKind::{Curves, External, Mesh, Sphere, Volume};

        let mut rules = Self::empty();

        // ── Subdivision ──
        rules.push(GeometryRule::new("ai:polymesh:subdiv_iterations", "subdiv_iterations", 1, &[Mesh], Subdivided));
        rules.push(GeometryRule::new("ai:polymesh:subdiv_adaptive_error", "subdiv_adaptive_error", 0.0_f32, &[Mesh], Subdivided));
        rules.push(GeometryRule::new("ai:polymesh:subdiv_adaptive_metric", "subdiv_adaptive_metric", "auto", &[Mesh], Subdivided));
        rules.push(GeometryRule::new("ai:polymesh:subdiv_adaptive_space", "subdiv_adaptive_space", "raster", &[Mesh], Subdivided));
        rules.push(GeometryRule::new("ai:polymesh:subdiv_uv_smoothing", "subdiv_uv_smoothing", "pin_corners", &[Mesh], Subdivided));
        rules.push(GeometryRule::new("ai:polymesh:subdiv_smooth_derivs", "subdiv_smooth_derivs", false, &[Mesh], Subdivided));

        // ── Displacement ──
        rules.push(GeometryRule::new("ai:disp_height", "disp_height", 1.0_f32, &[Mesh], Always));
        rules.push(GeometryRule::new("ai:disp_padding", "disp_padding", 0.0_f32, &[Mesh], Always));
        rules.push(GeometryRule::new("ai:disp_zero_value", "disp_zero_value", 0.0_f32, &[Mesh], Always));
        rules.push(GeometryRule::new("ai:disp_autobump", "disp_autobump", false, &[Mesh], Always));

        // ── Curves ──
        rules.push(GeometryRule::new("ai:curves:mode", "mode", "ribbon", &[Curves], Always));
        rules.push(GeometryRule::new("ai:curves:min_pixel_width", "min_pixel_width", 0.0_f32, &[Curves], Always));

        // ── Volumes ──
        let volumetric = [Mesh, Sphere, Volume, External];
        rules.push(GeometryRule::new("ai:shape:step_size", "step_size", 0.0_f32, &volumetric, Always));
        rules.push(GeometryRule::new("ai:shape:volume_padding", "volume_padding", 0.0_f32, &volumetric, Always));
        rules.push(GeometryRule::new("ai:volume:velocity_scale", "velocity_scale", 1.0_f32, &[Volume], Always));
        rules.push(GeometryRule::new("ai:volume:velocity_fps", "velocity_fps", 24.0_f32, &[Volume], Always));
        rules.push(GeometryRule::new(
            "ai:volume:velocity_outlier_threshold",
            "velocity_outlier_threshold",
            0.001_f32,
            &[Volume],
            Always,
        ));

        rules
    }

    /// Adds a rule, replacing any rule for the same attribute.
    pub fn push(&mut self, rule: GeometryRule) {
        self.rules.retain(|r| r.attribute != rule.attribute);
        self.rules.push(rule);
    }

    #[must_use]
    pub fn rules(&self) -> &[GeometryRule] {
        &self.rules
    }

    /// Subdivision scheme a mesh ends up with under `attributes`.
    #[must_use]
    pub fn subdiv_type(&self, interpolation: MeshInterpolation, attributes: &AttributeSet) -> SubdivType {
        match interpolation {
            MeshInterpolation::CatmullClark => SubdivType::CatClark,
            MeshInterpolation::Linear => {
                let subdivide = attributes
                    .data(&self.subdivide_polygons)
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                if subdivide {
                    SubdivType::Linear
                } else {
                    SubdivType::None
                }
            }
        }
    }

    /// Effective geometry configuration of one shape.
    ///
    /// `overrides` are parameters the primitive sets itself; rules writing
    /// the same parameter are skipped.
    #[must_use]
    pub fn effective(
        &self,
        kind: ShapeKind,
        interpolation: Option<MeshInterpolation>,
        attributes: &AttributeSet,
        overrides: &BTreeMap<String, Value>,
    ) -> EffectiveGeometry {
        let subdiv_type = match (kind, interpolation) {
            (ShapeKind::Mesh, Some(interpolation)) => Some(self.subdiv_type(interpolation, attributes)),
            (ShapeKind::Mesh, None) => Some(SubdivType::None),
            _ => None,
        };
        let subdivided = subdiv_type.is_some_and(|t| t != SubdivType::None);

        let values = self
            .rules
            .iter()
            .filter(|rule| rule.applies_to(kind, subdivided))
            .filter(|rule| !overrides.contains_key(&rule.parameter))
            .map(|rule| {
                let value = attributes.data(&rule.attribute).cloned().unwrap_or_else(|| rule.default.clone());
                (rule.parameter.clone(), value)
            })
            .collect();

        let displacement = if kind == ShapeKind::Mesh {
            attributes.displacement().cloned()
        } else {
            None
        };

        EffectiveGeometry {
            kind,
            subdiv_type,
            values,
            displacement,
        }
    }

    /// False for shapes whose tessellation depends on where they are placed.
    #[must_use]
    pub fn is_instanceable(&self, effective: &EffectiveGeometry) -> bool {
        if !effective.is_subdivided() {
            return true;
        }
        let error = effective
            .get(&self.instancing.adaptive_error)
            .and_then(Value::as_float)
            .unwrap_or(0.0);
        let space = effective
            .get(&self.instancing.adaptive_space)
            .and_then(Value::as_str)
            .unwrap_or(&self.instancing.object_space);
        !(error > 0.0 && space != self.instancing.object_space)
    }
}

/// The attribute values that actually shape one native shape.
#[derive(Debug, Clone)]
pub struct EffectiveGeometry {
    pub kind: ShapeKind,
    /// Meshes only.
    pub subdiv_type: Option<SubdivType>,
    /// `(native parameter, value)` in rule order.
    pub values: SmallVec<[(String, Value); 8]>,
    pub displacement: Option<Arc<ShaderNetwork>>,
}

impl EffectiveGeometry {
    #[must_use]
    pub fn get(&self, parameter: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(p, _)| p == parameter)
            .map(|(_, v)| v)
    }

    #[must_use]
    pub fn is_subdivided(&self) -> bool {
        self.subdiv_type.is_some_and(|t| t != SubdivType::None)
    }

    /// Hash of everything geometry-affecting. Equal signatures mean the
    /// processed geometry is identical.
    #[must_use]
    pub fn signature(&self) -> u64 {
        let mut hasher = ContentHasher::new();
        hasher.add(&self.kind).add(&self.subdiv_type);
        for (param, value) in &self.values {
            hasher.add(param).add(value);
        }
        hasher.add(&self.displacement.as_ref().map(|n| n.content_hash()));
        hasher.finish()
    }
}

impl PartialEq for EffectiveGeometry {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.subdiv_type == other.subdiv_type
            && self.values == other.values
            && self.displacement == other.displacement
    }
}

/// Convenience for callers building an empty override map.
#[must_use]
pub fn no_overrides() -> BTreeMap<String, Value> {
    BTreeMap::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::compound;

    fn attrs(items: &[(&str, Value)]) -> AttributeSet {
        AttributeSet::new(compound(items.iter().cloned()))
    }

    fn mesh(rules: &GeometryRules, interpolation: MeshInterpolation, set: &AttributeSet) -> EffectiveGeometry {
        rules.effective(ShapeKind::Mesh, Some(interpolation), set, &no_overrides())
    }

    #[test]
    fn test_subdiv_params_inert_on_polygons() {
        let rules = GeometryRules::builtin();
        let a = mesh(&rules, MeshInterpolation::Linear, &attrs(&[]));
        let b = mesh(
            &rules,
            MeshInterpolation::Linear,
            &attrs(&[("ai:polymesh:subdiv_iterations", Value::Int(4))]),
        );
        assert_eq!(a.signature(), b.signature());
        assert!(a.get("subdiv_iterations").is_none());
    }

    #[test]
    fn test_subdivide_polygons_changes_geometry() {
        let rules = GeometryRules::builtin();
        let a = mesh(&rules, MeshInterpolation::Linear, &attrs(&[]));
        let b = mesh(
            &rules,
            MeshInterpolation::Linear,
            &attrs(&[("ai:polymesh:subdivide_polygons", Value::Bool(true))]),
        );
        assert_eq!(b.subdiv_type, Some(SubdivType::Linear));
        assert_ne!(a.signature(), b.signature());

        // Already subdividing: the toggle is a no-op.
        let c = mesh(&rules, MeshInterpolation::CatmullClark, &attrs(&[]));
        let d = mesh(
            &rules,
            MeshInterpolation::CatmullClark,
            &attrs(&[("ai:polymesh:subdivide_polygons", Value::Bool(true))]),
        );
        assert_eq!(c.signature(), d.signature());
    }

    #[test]
    fn test_adaptive_instancing_predicate() {
        let rules = GeometryRules::builtin();
        let raster = mesh(
            &rules,
            MeshInterpolation::CatmullClark,
            &attrs(&[("ai:polymesh:subdiv_adaptive_error", Value::Float(0.1))]),
        );
        assert!(!rules.is_instanceable(&raster));

        let object = mesh(
            &rules,
            MeshInterpolation::CatmullClark,
            &attrs(&[
                ("ai:polymesh:subdiv_adaptive_error", Value::Float(0.1)),
                ("ai:polymesh:subdiv_adaptive_space", Value::from("object")),
            ]),
        );
        assert!(rules.is_instanceable(&object));

        let polygons = mesh(
            &rules,
            MeshInterpolation::Linear,
            &attrs(&[("ai:polymesh:subdiv_adaptive_error", Value::Float(0.1))]),
        );
        assert!(rules.is_instanceable(&polygons));
    }

    #[test]
    fn test_overrides_skip_rules() {
        let rules = GeometryRules::builtin();
        let mut overrides = no_overrides();
        overrides.insert("step_size".to_string(), Value::Float(0.25));
        let set = attrs(&[("ai:shape:step_size", Value::Float(10.0))]);
        let effective = rules.effective(ShapeKind::External, None, &set, &overrides);
        assert!(effective.get("step_size").is_none());
        assert!(effective.get("volume_padding").is_some());
    }

    #[test]
    fn test_curves_ignore_volume_rules() {
        let rules = GeometryRules::builtin();
        let a = rules.effective(ShapeKind::Curves, None, &attrs(&[]), &no_overrides());
        let b = rules.effective(
            ShapeKind::Curves,
            None,
            &attrs(&[("ai:shape:step_size", Value::Float(1.0))]),
            &no_overrides(),
        );
        assert_eq!(a.signature(), b.signature());
        assert_eq!(a.get("mode"), Some(&Value::from("ribbon")));
    }
}
