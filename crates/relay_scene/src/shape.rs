//! Shape Translation
//!
//! Turns primitives into native shape nodes. Geometry arrays come from the
//! primitive (all motion samples concatenated), everything else from the
//! [`EffectiveGeometry`] computed by the geometry rules.

use glam::{Vec2, Vec3};
use relay_core::error::{RelayError, Result};
use relay_core::graph::{NativeValue, NodeGraph, NodeKey};
use relay_core::hash::ContentHasher;

use crate::geometry_rules::EffectiveGeometry;
use crate::primitives::{ExternalProcedural, NODE_TYPE_PARAMETER, Object};

/// Everything needed to build (or look up) one native shape.
#[derive(Debug, Clone, Copy)]
pub struct ShapeRequest<'a> {
    /// Motion samples, all of the same kind and topology.
    pub samples: &'a [Object],
    /// Sample times. Empty for static geometry.
    pub times: &'a [f32],
    pub effective: &'a EffectiveGeometry,
    /// Camera shutter, for shapes that read motion from it.
    pub shutter: Option<Vec2>,
}

impl ShapeRequest<'_> {
    /// Content key of the processed geometry.
    #[must_use]
    pub fn geometry_key(&self) -> u64 {
        let mut hasher = ContentHasher::new();
        hasher.add(&self.samples.len());
        for sample in self.samples {
            sample.hash_into(&mut hasher);
        }
        hasher
            .add_pod(self.times)
            .add(&self.effective.signature());
        if let Some(shutter) = self.shutter {
            hasher.add_pod(&[shutter]);
        }
        hasher.finish()
    }

    fn motion_range(&self) -> Option<(f32, f32)> {
        match (self.times.first(), self.times.last()) {
            (Some(first), Some(last)) if self.times.len() > 1 => Some((*first, *last)),
            _ => None,
        }
    }
}

/// Creates the native shape for `request` named `name` under `parent`.
///
/// `displacement` is the translated displacement network, if any. On error
/// no node is left behind.
pub fn build_shape(
    graph: &mut NodeGraph,
    name: &str,
    parent: Option<NodeKey>,
    request: &ShapeRequest<'_>,
    displacement: Option<NodeKey>,
) -> Result<NodeKey> {
    let Some(first) = request.samples.first() else {
        return Err(RelayError::UnsupportedPrimitive {
            name: name.to_string(),
            reason: "no samples".to_string(),
        });
    };

    let entry = match first {
        Object::Mesh(_) => "polymesh",
        Object::Curves(_) => "curves",
        Object::Sphere(_) => "sphere",
        Object::Volume(_) => "volume",
        Object::External(external) => external.node_type(),
        Object::Procedural(_) => {
            return Err(RelayError::UnsupportedPrimitive {
                name: name.to_string(),
                reason: "procedurals are expanded, not translated to shapes".to_string(),
            });
        }
    };

    let node = graph.create(entry, name, parent)?;
    write_geometry(graph, node, request);
    write_effective(graph, node, request.effective);
    if let Some(disp) = displacement {
        graph.set(node, "disp_map", NativeValue::Node(disp));
    }
    log::debug!("Created {entry} shape \"{name}\"");
    Ok(node)
}

fn write_geometry(graph: &mut NodeGraph, node: NodeKey, request: &ShapeRequest<'_>) {
    match &request.samples[0] {
        Object::Mesh(mesh) => {
            graph.set(node, "nsides", NativeValue::UIntArray(mesh.verts_per_face.clone()));
            graph.set(node, "vidxs", NativeValue::UIntArray(mesh.vertex_ids.clone()));
            let points = concat_points(request.samples, |o| match o {
                Object::Mesh(m) => Some(&m.points),
                _ => None,
            });
            graph.set(node, "vlist", NativeValue::VectorArray(points));
            if let Some(subdiv_type) = request.effective.subdiv_type {
                graph.set(node, "subdiv_type", NativeValue::String(subdiv_type.native_name().to_string()));
                graph.set(node, "smoothing", NativeValue::Bool(request.effective.is_subdivided()));
            }
        }
        Object::Curves(curves) => {
            graph.set(node, "num_points", NativeValue::UIntArray(curves.verts_per_curve.clone()));
            let points = concat_points(request.samples, |o| match o {
                Object::Curves(c) => Some(&c.points),
                _ => None,
            });
            graph.set(node, "points", NativeValue::VectorArray(points));
            graph.set(node, "radius", NativeValue::FloatArray(curves.radius()));
            graph.set(node, "basis", NativeValue::String(curves.basis.native_name().to_string()));
        }
        Object::Sphere(sphere) => {
            graph.set(node, "center", NativeValue::Vector(Vec3::ZERO));
            graph.set(node, "radius", NativeValue::Float(sphere.radius));
        }
        Object::Volume(volume) => {
            graph.set(node, "filename", NativeValue::String(volume.file_name.clone()));
            graph.set(node, "grids", NativeValue::StringArray(volume.grids.clone()));
        }
        Object::External(external) => write_external(graph, node, external),
        Object::Procedural(_) => {}
    }

    if let Some((start, end)) = request.motion_range() {
        graph.set(node, "motion_start", NativeValue::Float(start));
        graph.set(node, "motion_end", NativeValue::Float(end));
    } else if let Some(shutter) = request.shutter {
        graph.set(node, "motion_start", NativeValue::Float(shutter.x));
        graph.set(node, "motion_end", NativeValue::Float(shutter.y));
    }
}

fn write_external(graph: &mut NodeGraph, node: NodeKey, external: &ExternalProcedural) {
    // With an explicit node type the file name is a real file.
    if external.parameters.contains_key(NODE_TYPE_PARAMETER) && declares(graph, node, "filename") {
        graph.set(node, "filename", NativeValue::String(external.file_name.clone()));
    }
    for (name, value) in external.native_parameters() {
        graph.set_value(node, name, value);
    }
}

fn write_effective(graph: &mut NodeGraph, node: NodeKey, effective: &EffectiveGeometry) {
    for (param, value) in &effective.values {
        // Custom external entries need not declare every shape parameter.
        if declares(graph, node, param) {
            graph.set_value(node, param, value);
        }
    }
}

fn declares(graph: &NodeGraph, node: NodeKey, param: &str) -> bool {
    graph
        .get(node)
        .is_some_and(|n| n.param_type(param).is_some())
}

fn concat_points<'a>(samples: &'a [Object], points: impl Fn(&'a Object) -> Option<&'a Vec<Vec3>>) -> Vec<Vec3> {
    samples
        .iter()
        .filter_map(points)
        .flat_map(|p| p.iter().copied())
        .collect()
}
