//! Object Scopes
//!
//! A scope is one namespace of submitted objects: the session root, or the
//! inside of an expanded procedural. Each scope owns its instance cache,
//! its shader cache and the records of the objects submitted to it.
//!
//! # Overview
//!
//! [`ScopeRenderer`] borrows the native graph, one scope and the
//! session-wide [`SceneContext`], and implements [`Renderer`] on top of
//! them. The session hands one to clients for its root scope and one to
//! every procedural it expands.
//!
//! Per-object native state:
//!
//! | Submitted as        | Nodes                                                  |
//! |---------------------|--------------------------------------------------------|
//! | object              | `ginstance` named after it, or a unique shape          |
//! | procedural object   | `procedural` node, children created at commit          |
//! | light               | `light:<name>` (+ upstream nodes), optional geometry   |
//! | camera              | `persp_camera` / `ortho_camera` named after it         |

use std::collections::BTreeMap;
use std::sync::Arc;

use glam::{Mat4, Vec2};
use relay_core::error::{RelayError, Result};
use relay_core::graph::{NativeValue, NodeGraph, NodeKey, native_type_of};
use relay_core::value::Value;
use relay_shading::{NodeNaming, ShaderCache, ShaderHandle, TranslatedNetwork, translate};
use rustc_hash::FxHashMap;
use slotmap::{SlotMap, new_key_type};
use smallvec::SmallVec;

use crate::attributes::{AttributeFactory, AttributeSet, CompoundObject};
use crate::camera::{Camera, Projection};
use crate::geometry_rules::GeometryRules;
use crate::instance_cache::{InstanceCache, Placement};
use crate::primitives::{MeshInterpolation, Object, ShapeKind};
use crate::procedural::Procedural;
use crate::renderer::{ObjectHandle, Renderer};
use crate::settings::RenderType;
use crate::shape::ShapeRequest;

new_key_type! {
    /// Key of a procedural's child scope.
    pub(crate) struct ScopeKey;
}

/// Name prefix of translated light nodes.
pub const LIGHT_PREFIX: &str = "light:";

// ============================================================================
// Session-wide state
// ============================================================================

pub(crate) struct CameraRecord {
    pub node: NodeKey,
    pub camera: Camera,
}

/// A procedural waiting for the next commit.
pub(crate) struct PendingProcedural {
    /// Scope holding the procedural's record. `None` for the root.
    pub owner: Option<ScopeKey>,
    pub handle: ObjectHandle,
    pub node: NodeKey,
    pub procedural: Arc<dyn Procedural>,
}

/// State shared by every scope of one session.
pub(crate) struct SceneContext {
    pub mode: RenderType,
    pub rules: GeometryRules,
    pub factory: AttributeFactory,
    pub cameras: FxHashMap<String, CameraRecord>,
    pub last_camera: Option<String>,
    /// Camera selected by the `camera` option.
    pub render_camera: Option<String>,
    pub pending: Vec<PendingProcedural>,
    pub released_scopes: Vec<ScopeKey>,
}

impl SceneContext {
    pub fn new(mode: RenderType, rules: GeometryRules) -> Self {
        Self {
            mode,
            rules,
            factory: AttributeFactory::new(),
            cameras: FxHashMap::default(),
            last_camera: None,
            render_camera: None,
            pending: Vec::new(),
            released_scopes: Vec::new(),
        }
    }

    /// Shutter of the render camera, else of the most recent camera.
    fn shutter(&self) -> Option<Vec2> {
        self.render_camera
            .as_deref()
            .and_then(|name| self.cameras.get(name))
            .or_else(|| self.last_camera.as_deref().and_then(|name| self.cameras.get(name)))
            .map(|record| record.camera.shutter)
    }
}

// ============================================================================
// Object records
// ============================================================================

#[derive(Debug, Clone)]
enum TransformState {
    Static(Mat4),
    Sampled { matrices: Vec<Mat4>, start: f32, end: f32 },
}

impl TransformState {
    fn apply(&self, graph: &mut NodeGraph, node: NodeKey) {
        match self {
            Self::Static(matrix) => {
                graph.set(node, "matrix", NativeValue::Matrix(*matrix));
            }
            Self::Sampled { matrices, start, end } => {
                graph.set(node, "matrix", NativeValue::MatrixArray(matrices.clone()));
                graph.set(node, "motion_start", NativeValue::Float(*start));
                graph.set(node, "motion_end", NativeValue::Float(*end));
            }
        }
    }
}

/// Geometry placed for an object, plus what is needed to recompute its
/// effective configuration on edit.
struct GeometryState {
    placement: Placement,
    kind: ShapeKind,
    interpolation: Option<MeshInterpolation>,
    overrides: BTreeMap<String, Value>,
}

/// Attribute-driven state written onto an object's own node.
#[derive(Default)]
struct InstanceState {
    surface: Option<ShaderHandle>,
    /// Declared `user:*` parameters.
    user: Vec<String>,
}

enum Body {
    Geometry(GeometryState),
    Procedural { node: NodeKey, scope: Option<ScopeKey> },
    Light { geometry: Option<GeometryState>, network: Option<TranslatedNetwork> },
    Camera { node: NodeKey },
}

pub(crate) struct ObjectRecord {
    name: String,
    attributes: Arc<AttributeSet>,
    transform: TransformState,
    instance: InstanceState,
    body: Body,
}

impl ObjectRecord {
    fn new(name: &str, attributes: &Arc<AttributeSet>, instance: InstanceState, body: Body) -> Self {
        Self {
            name: name.to_string(),
            attributes: Arc::clone(attributes),
            transform: TransformState::Static(Mat4::IDENTITY),
            instance,
            body,
        }
    }

    /// Node carrying visibility, shader and user attributes.
    fn instance_node(&self) -> Option<NodeKey> {
        match &self.body {
            Body::Geometry(geometry) => Some(geometry.placement.node),
            Body::Procedural { node, .. } => Some(*node),
            Body::Light { geometry, .. } => geometry.as_ref().map(|g| g.placement.node),
            Body::Camera { .. } => None,
        }
    }

    fn geometry(&self) -> Option<&GeometryState> {
        match &self.body {
            Body::Geometry(geometry) => Some(geometry),
            Body::Light { geometry, .. } => geometry.as_ref(),
            _ => None,
        }
    }

    /// Nodes that receive the object's transform.
    fn transform_nodes(&self) -> SmallVec<[NodeKey; 2]> {
        let mut nodes = SmallVec::new();
        match &self.body {
            Body::Geometry(geometry) => nodes.push(geometry.placement.node),
            Body::Procedural { node, .. } | Body::Camera { node } => nodes.push(*node),
            Body::Light { geometry, network } => {
                nodes.extend(geometry.as_ref().map(|g| g.placement.node));
                nodes.extend(network.as_ref().map(|n| n.output));
            }
        }
        nodes
    }

    pub(crate) fn attach_scope(&mut self, key: ScopeKey) {
        if let Body::Procedural { scope, .. } = &mut self.body {
            *scope = Some(key);
        }
    }

    pub(crate) fn child_scope(&self) -> Option<ScopeKey> {
        match &self.body {
            Body::Procedural { scope, .. } => *scope,
            _ => None,
        }
    }
}

// ============================================================================
// Scope
// ============================================================================

pub(crate) struct Scope {
    pub parent: Option<NodeKey>,
    pub instances: InstanceCache,
    pub shaders: ShaderCache,
    pub objects: SlotMap<ObjectHandle, ObjectRecord>,
}

impl Scope {
    pub fn new(parent: Option<NodeKey>) -> Self {
        Self {
            parent,
            instances: InstanceCache::new(parent),
            shaders: ShaderCache::new("shader", parent),
            objects: SlotMap::with_key(),
        }
    }

    /// Child scopes of the procedurals submitted here.
    pub fn child_scopes(&self) -> Vec<ScopeKey> {
        self.objects.values().filter_map(ObjectRecord::child_scope).collect()
    }
}

// ============================================================================
// ScopeRenderer
// ============================================================================

/// [`Renderer`] over one scope.
pub(crate) struct ScopeRenderer<'a> {
    graph: &'a mut NodeGraph,
    scope: &'a mut Scope,
    key: Option<ScopeKey>,
    context: &'a mut SceneContext,
}

impl<'a> ScopeRenderer<'a> {
    pub fn new(
        graph: &'a mut NodeGraph,
        scope: &'a mut Scope,
        key: Option<ScopeKey>,
        context: &'a mut SceneContext,
    ) -> Self {
        Self {
            graph,
            scope,
            key,
            context,
        }
    }

    fn place_geometry(
        &mut self,
        name: &str,
        samples: &[Object],
        times: &[f32],
        attributes: &AttributeSet,
    ) -> Result<GeometryState> {
        let Some(first) = samples.first() else {
            return Err(RelayError::InvalidTimeSamples(format!("\"{name}\" has no samples")));
        };
        let kind = first.kind();
        let interpolation = match first {
            Object::Mesh(mesh) => Some(mesh.interpolation),
            _ => None,
        };
        let overrides: BTreeMap<String, Value> = match first {
            Object::External(external) => external
                .native_parameters()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            _ => BTreeMap::new(),
        };

        let effective = self
            .context
            .rules
            .effective(kind, interpolation, attributes, &overrides);
        let shutter = if kind == ShapeKind::Volume {
            self.context.shutter()
        } else {
            None
        };
        let request = ShapeRequest {
            samples,
            times,
            effective: &effective,
            shutter,
        };
        let placement = self.scope.instances.place(
            self.graph,
            &mut self.scope.shaders,
            &self.context.rules,
            name,
            &request,
        )?;

        Ok(GeometryState {
            placement,
            kind,
            interpolation,
            overrides,
        })
    }

    fn release_geometry(&mut self, geometry: &GeometryState) {
        self.scope
            .instances
            .release(self.graph, &mut self.scope.shaders, &geometry.placement);
    }

    fn insert(&mut self, record: ObjectRecord) -> ObjectHandle {
        for node in record.transform_nodes() {
            record.transform.apply(self.graph, node);
        }
        self.scope.objects.insert(record)
    }

    fn procedural(
        &mut self,
        name: &str,
        procedural: Arc<dyn Procedural>,
        attributes: &Arc<AttributeSet>,
    ) -> Result<ObjectHandle> {
        let node = self.graph.create("procedural", name, self.scope.parent)?;
        let instance = match apply_instance_attributes(self.graph, &mut self.scope.shaders, node, attributes) {
            Ok(instance) => instance,
            Err(err) => {
                self.graph.remove(node);
                return Err(err);
            }
        };

        let handle = self.insert(ObjectRecord::new(
            name,
            attributes,
            instance,
            Body::Procedural { node, scope: None },
        ));
        self.context.pending.push(PendingProcedural {
            owner: self.key,
            handle,
            node,
            procedural,
        });
        Ok(handle)
    }

    /// Applies an edit that already passed the geometry check. On error
    /// nothing about the object has changed.
    fn apply_edit(&mut self, handle: ObjectHandle, attributes: &Arc<AttributeSet>) -> Result<()> {
        let Some(record) = self.scope.objects.get_mut(handle) else {
            return Err(RelayError::UnknownObject(format!("{handle:?}")));
        };

        let instance_node = record.instance_node();
        let surface = match instance_node {
            Some(_) => acquire_surface(self.graph, &mut self.scope.shaders, attributes)?,
            None => None,
        };

        let light_changed = record.attributes.light() != attributes.light();
        if let Body::Light { geometry, network } = &mut record.body
            && light_changed
        {
            let light = LightRequest {
                parent: self.scope.parent,
                name: &record.name,
                geometry: geometry.as_ref(),
                transform: &record.transform,
            };
            if let Err(err) = light.replace(self.graph, network, &record.attributes, attributes) {
                if let Some(surface) = surface {
                    self.scope.shaders.release(surface);
                }
                return Err(err);
            }
        }

        if let Some(node) = instance_node {
            let instance = write_instance_attributes(self.graph, node, attributes, surface, &record.instance.user);
            let previous = std::mem::replace(&mut record.instance, instance);
            if let Some(surface) = previous.surface {
                self.scope.shaders.release(surface);
            }
        }

        record.attributes = Arc::clone(attributes);
        Ok(())
    }
}

impl Renderer for ScopeRenderer<'_> {
    fn attributes(&mut self, attributes: &CompoundObject) -> Arc<AttributeSet> {
        self.context.factory.get(attributes)
    }

    fn object(&mut self, name: &str, object: Object, attributes: &Arc<AttributeSet>) -> Result<ObjectHandle> {
        self.object_samples(name, vec![object], &[], attributes)
    }

    fn object_samples(
        &mut self,
        name: &str,
        samples: Vec<Object>,
        times: &[f32],
        attributes: &Arc<AttributeSet>,
    ) -> Result<ObjectHandle> {
        validate_samples(name, &samples, times)?;
        if let Some(Object::Procedural(procedural)) = samples.first() {
            let procedural = Arc::clone(procedural);
            return self.procedural(name, procedural, attributes);
        }

        let geometry = self.place_geometry(name, &samples, times, attributes)?;
        let instance = match apply_instance_attributes(
            self.graph,
            &mut self.scope.shaders,
            geometry.placement.node,
            attributes,
        ) {
            Ok(instance) => instance,
            Err(err) => {
                self.release_geometry(&geometry);
                return Err(err);
            }
        };

        Ok(self.insert(ObjectRecord::new(name, attributes, instance, Body::Geometry(geometry))))
    }

    fn light(&mut self, name: &str, object: Option<Object>, attributes: &Arc<AttributeSet>) -> Result<ObjectHandle> {
        let geometry = match object {
            Some(Object::Procedural(_)) => {
                return Err(RelayError::UnsupportedPrimitive {
                    name: name.to_string(),
                    reason: "lights cannot use procedural geometry".to_string(),
                });
            }
            Some(object) => {
                object.validate(name)?;
                Some(self.place_geometry(name, std::slice::from_ref(&object), &[], attributes)?)
            }
            None => None,
        };

        let instance = match &geometry {
            Some(g) => match apply_instance_attributes(self.graph, &mut self.scope.shaders, g.placement.node, attributes) {
                Ok(instance) => instance,
                Err(err) => {
                    self.release_geometry(g);
                    return Err(err);
                }
            },
            None => InstanceState::default(),
        };

        let network = match translate_light(self.graph, self.scope.parent, name, attributes, geometry.as_ref()) {
            Ok(network) => network,
            Err(err) => {
                if let Some(surface) = instance.surface {
                    self.scope.shaders.release(surface);
                }
                if let Some(g) = &geometry {
                    self.release_geometry(g);
                }
                return Err(err);
            }
        };

        Ok(self.insert(ObjectRecord::new(
            name,
            attributes,
            instance,
            Body::Light { geometry, network },
        )))
    }

    fn camera(&mut self, name: &str, camera: &Camera, attributes: &Arc<AttributeSet>) -> Result<ObjectHandle> {
        let node = self
            .graph
            .create(camera.projection.native_entry(), name, self.scope.parent)?;
        write_camera(self.graph, node, camera);

        self.context.cameras.insert(
            name.to_string(),
            CameraRecord {
                node,
                camera: camera.clone(),
            },
        );
        self.context.last_camera = Some(name.to_string());

        Ok(self.insert(ObjectRecord::new(
            name,
            attributes,
            InstanceState::default(),
            Body::Camera { node },
        )))
    }

    fn transform(&mut self, handle: ObjectHandle, matrix: Mat4) -> Result<()> {
        let record = self
            .scope
            .objects
            .get_mut(handle)
            .ok_or_else(|| RelayError::UnknownObject(format!("{handle:?}")))?;
        record.transform = TransformState::Static(matrix);
        for node in record.transform_nodes() {
            record.transform.apply(self.graph, node);
        }
        Ok(())
    }

    fn transform_samples(&mut self, handle: ObjectHandle, samples: &[Mat4], times: &[f32]) -> Result<()> {
        if samples.is_empty() || samples.len() != times.len() {
            return Err(RelayError::InvalidTimeSamples(format!(
                "{} transform samples for {} times",
                samples.len(),
                times.len()
            )));
        }
        if !is_increasing(times) {
            return Err(RelayError::InvalidTimeSamples("times are not increasing".to_string()));
        }

        let record = self
            .scope
            .objects
            .get_mut(handle)
            .ok_or_else(|| RelayError::UnknownObject(format!("{handle:?}")))?;
        record.transform = match (samples, times) {
            ([matrix], _) => TransformState::Static(*matrix),
            (_, [start, .., end]) => TransformState::Sampled {
                matrices: samples.to_vec(),
                start: *start,
                end: *end,
            },
            _ => TransformState::Static(Mat4::IDENTITY),
        };
        for node in record.transform_nodes() {
            record.transform.apply(self.graph, node);
        }
        Ok(())
    }

    fn edit_attributes(&mut self, handle: ObjectHandle, attributes: &Arc<AttributeSet>) -> bool {
        if self.context.mode != RenderType::Interactive {
            log::warn!("Attribute edits are only supported by interactive sessions");
            return false;
        }
        let Some(record) = self.scope.objects.get(handle) else {
            return false;
        };

        if let Some(geometry) = record.geometry() {
            let effective = self.context.rules.effective(
                geometry.kind,
                geometry.interpolation,
                attributes,
                &geometry.overrides,
            );
            if effective.signature() != geometry.placement.signature {
                log::debug!("\"{}\" must be regenerated to apply the new attributes", record.name);
                return false;
            }
        }

        let name = record.name.clone();
        match self.apply_edit(handle, attributes) {
            Ok(()) => true,
            Err(err) => {
                log::error!("Unable to edit attributes of \"{name}\": {err}");
                false
            }
        }
    }

    fn release(&mut self, handle: ObjectHandle) {
        let Some(record) = self.scope.objects.remove(handle) else {
            return;
        };
        if let Some(surface) = record.instance.surface {
            self.scope.shaders.release(surface);
        }

        match record.body {
            Body::Geometry(geometry) => self.release_geometry(&geometry),
            Body::Light { geometry, network } => {
                if let Some(network) = network {
                    remove_nodes(self.graph, &network);
                }
                if let Some(geometry) = geometry {
                    self.release_geometry(&geometry);
                }
            }
            Body::Camera { node } => {
                self.graph.remove(node);
                if self.context.cameras.get(&record.name).is_some_and(|c| c.node == node) {
                    self.context.cameras.remove(&record.name);
                }
                if self.context.last_camera.as_deref() == Some(record.name.as_str()) {
                    self.context.last_camera = None;
                }
            }
            Body::Procedural { node, scope } => {
                self.graph.remove(node);
                self.context.pending.retain(|p| p.node != node);
                if let Some(scope) = scope {
                    self.context.released_scopes.push(scope);
                }
            }
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn is_increasing(times: &[f32]) -> bool {
    times.windows(2).all(|w| w[0] < w[1])
}

fn validate_samples(name: &str, samples: &[Object], times: &[f32]) -> Result<()> {
    let Some(first) = samples.first() else {
        return Err(RelayError::InvalidTimeSamples(format!("\"{name}\" has no samples")));
    };
    if (samples.len() > 1 || !times.is_empty()) && samples.len() != times.len() {
        return Err(RelayError::InvalidTimeSamples(format!(
            "\"{name}\" has {} samples for {} times",
            samples.len(),
            times.len()
        )));
    }
    if !is_increasing(times) {
        return Err(RelayError::InvalidTimeSamples(format!(
            "times of \"{name}\" are not increasing"
        )));
    }
    for sample in samples {
        sample.validate(name)?;
    }
    if samples.iter().skip(1).any(|s| !s.is_deformation_of(first)) {
        return Err(RelayError::UnsupportedPrimitive {
            name: name.to_string(),
            reason: "motion samples differ in type or topology".to_string(),
        });
    }
    Ok(())
}

/// Acquires the surface shader and writes the attribute-driven parameters
/// of a newly created `node`.
fn apply_instance_attributes(
    graph: &mut NodeGraph,
    shaders: &mut ShaderCache,
    node: NodeKey,
    attributes: &AttributeSet,
) -> Result<InstanceState> {
    let surface = acquire_surface(graph, shaders, attributes)?;
    Ok(write_instance_attributes(graph, node, attributes, surface, &[]))
}

fn acquire_surface(
    graph: &mut NodeGraph,
    shaders: &mut ShaderCache,
    attributes: &AttributeSet,
) -> Result<Option<ShaderHandle>> {
    attributes
        .surface()
        .map(|network| shaders.acquire(graph, network))
        .transpose()
}

/// Writes the attribute-driven parameters of `node`.
///
/// `previous_user` are the `user:*` parameters written by the last call;
/// those no longer present are cleared.
fn write_instance_attributes(
    graph: &mut NodeGraph,
    node: NodeKey,
    attributes: &AttributeSet,
    surface: Option<ShaderHandle>,
    previous_user: &[String],
) -> InstanceState {
    match surface {
        Some(handle) => {
            graph.set(node, "shader", NativeValue::Node(handle.node));
        }
        None => graph.unset(node, "shader"),
    }

    graph.set(node, "visibility", NativeValue::Byte(attributes.visibility().bits()));
    graph.set(node, "sidedness", NativeValue::Byte(attributes.sidedness().bits()));
    graph.set(node, "receive_shadows", NativeValue::Bool(attributes.receive_shadows()));
    graph.set(node, "self_shadows", NativeValue::Bool(attributes.self_shadows()));
    graph.set(node, "opaque", NativeValue::Bool(attributes.opaque()));
    graph.set(node, "matte", NativeValue::Bool(attributes.matte()));
    graph.set(
        node,
        "transform_type",
        NativeValue::String(attributes.transform_type().to_string()),
    );
    match attributes.sss_setname() {
        Some(set) => {
            graph.set(node, "sss_setname", NativeValue::String(set.to_string()));
        }
        None => graph.unset(node, "sss_setname"),
    }
    graph.set(
        node,
        "trace_sets",
        NativeValue::StringArray(attributes.trace_sets().to_vec()),
    );

    for stale in previous_user.iter().filter(|p| !attributes.user().contains_key(*p)) {
        graph.unset(node, stale);
    }
    let mut user = Vec::with_capacity(attributes.user().len());
    for (param, value) in attributes.user() {
        let Some(ty) = native_type_of(value) else {
            log::warn!("Cannot convert data \"{param}\" of type \"{}\".", value.type_name());
            continue;
        };
        let declared = graph.get(node).is_some_and(|n| n.param_type(param).is_some());
        if !declared {
            graph.declare(node, param, ty);
        }
        if graph.set_value(node, param, value) {
            user.push(param.clone());
        }
    }

    InstanceState { surface, user }
}

/// Translates the light network of `attributes` as `light:<name>`.
fn translate_light(
    graph: &mut NodeGraph,
    parent: Option<NodeKey>,
    name: &str,
    attributes: &AttributeSet,
    geometry: Option<&GeometryState>,
) -> Result<Option<TranslatedNetwork>> {
    let Some(network) = attributes.light() else {
        log::debug!("Light \"{name}\" has no light shader");
        return Ok(None);
    };

    let output_name = format!("{LIGHT_PREFIX}{name}");
    let naming = NodeNaming::prefixed(output_name.clone()).with_output_name(output_name);
    let translated = translate(graph, network, &naming, parent)?;

    if let Some(geometry) = geometry {
        let accepts_mesh = graph
            .get(translated.output)
            .is_some_and(|n| n.param_type("mesh").is_some());
        if accepts_mesh {
            graph.set(translated.output, "mesh", NativeValue::Node(geometry.placement.node));
        } else {
            log::warn!("Light \"{name}\" does not accept geometry");
        }
    }
    Ok(Some(translated))
}

/// An existing light whose network is being replaced.
struct LightRequest<'a> {
    parent: Option<NodeKey>,
    name: &'a str,
    geometry: Option<&'a GeometryState>,
    transform: &'a TransformState,
}

impl LightRequest<'_> {
    /// Swaps `network` for the light network of `attributes`. Both share node
    /// names, so the old nodes go first; if the new network fails to
    /// translate, the one of `previous` is rebuilt.
    fn replace(
        &self,
        graph: &mut NodeGraph,
        network: &mut Option<TranslatedNetwork>,
        previous: &AttributeSet,
        attributes: &AttributeSet,
    ) -> Result<()> {
        if let Some(old) = network.take() {
            remove_nodes(graph, &old);
        }
        let result = match translate_light(graph, self.parent, self.name, attributes, self.geometry) {
            Ok(translated) => {
                *network = translated;
                Ok(())
            }
            Err(err) => {
                match translate_light(graph, self.parent, self.name, previous, self.geometry) {
                    Ok(restored) => *network = restored,
                    Err(restore) => log::error!("Unable to restore light \"{}\": {restore}", self.name),
                }
                Err(err)
            }
        };
        if let Some(translated) = network {
            self.transform.apply(graph, translated.output);
        }
        result
    }
}

fn remove_nodes(graph: &mut NodeGraph, network: &TranslatedNetwork) {
    for node in &network.nodes {
        graph.remove(*node);
    }
}

fn write_camera(graph: &mut NodeGraph, node: NodeKey, camera: &Camera) {
    if camera.projection == Projection::Perspective {
        graph.set(node, "fov", NativeValue::Float(camera.field_of_view));
    }
    graph.set(node, "near_clip", NativeValue::Float(camera.clipping_planes.x));
    graph.set(node, "far_clip", NativeValue::Float(camera.clipping_planes.y));
    graph.set(node, "shutter_start", NativeValue::Float(camera.shutter.x));
    graph.set(node, "shutter_end", NativeValue::Float(camera.shutter.y));

    let width = camera.resolution.x.max(1) as f32 * camera.pixel_aspect_ratio;
    let height = camera.resolution.y.max(1) as f32;
    let aspect = height / width;
    graph.set(node, "screen_window_min", NativeValue::Vector2(Vec2::new(-1.0, -aspect)));
    graph.set(node, "screen_window_max", NativeValue::Vector2(Vec2::new(1.0, aspect)));
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use glam::{Vec2, Vec3};
    use relay_core::graph::NodeLibrary;
    use relay_shading::{Shader, ShaderNetwork};

    use super::*;
    use crate::attributes::{AttributeValue, compound};
    use crate::primitives::{MeshPrimitive, SpherePrimitive};

    struct Fixture {
        graph: NodeGraph,
        scope: Scope,
        context: SceneContext,
    }

    impl Fixture {
        fn new(mode: RenderType) -> Self {
            Self {
                graph: NodeGraph::new(Arc::new(NodeLibrary::builtin())),
                scope: Scope::new(None),
                context: SceneContext::new(mode, GeometryRules::builtin()),
            }
        }

        fn renderer(&mut self) -> ScopeRenderer<'_> {
            ScopeRenderer::new(&mut self.graph, &mut self.scope, None, &mut self.context)
        }
    }

    fn plane() -> Object {
        MeshPrimitive::create_plane(Vec2::splat(-1.0), Vec2::ONE).into()
    }

    #[test]
    fn test_rejects_mismatched_samples() {
        let mut f = Fixture::new(RenderType::Batch);
        let mut r = f.renderer();
        let attrs = r.attributes(&CompoundObject::new());

        let err = r
            .object_samples("a", vec![plane(), plane()], &[0.0], &attrs)
            .unwrap_err();
        assert!(matches!(err, RelayError::InvalidTimeSamples(_)));

        let err = r
            .object_samples("b", vec![plane(), SpherePrimitive::new(1.0).into()], &[0.0, 1.0], &attrs)
            .unwrap_err();
        assert!(matches!(err, RelayError::UnsupportedPrimitive { .. }));
        assert_eq!(f.graph.count_entry("polymesh"), 0);
    }

    #[test]
    fn test_transform_samples_set_motion_range() {
        let mut f = Fixture::new(RenderType::Batch);
        let mut r = f.renderer();
        let attrs = r.attributes(&CompoundObject::new());
        let handle = r.object("a", plane(), &attrs).unwrap();
        let samples = [Mat4::IDENTITY, Mat4::from_translation(Vec3::X)];
        r.transform_samples(handle, &samples, &[-0.25, 0.25]).unwrap();

        let node = f.graph.node("a").unwrap();
        assert_eq!(node.get("matrix").map(NativeValue::len), Some(2));
        assert_eq!(node.get_float("motion_start"), Some(-0.25));
        assert_eq!(node.get_float("motion_end"), Some(0.25));
    }

    #[test]
    fn test_edits_rejected_outside_interactive() {
        let mut f = Fixture::new(RenderType::Batch);
        let mut r = f.renderer();
        let attrs = r.attributes(&CompoundObject::new());
        let handle = r.object("a", plane(), &attrs).unwrap();
        assert!(!r.edit_attributes(handle, &attrs));
    }

    #[test]
    fn test_user_attributes_are_declared_and_cleared() {
        let mut f = Fixture::new(RenderType::Interactive);
        let mut r = f.renderer();
        let with_user = r.attributes(&compound([("user:foo", Value::Int(1))]));
        let handle = r.object("a", plane(), &with_user).unwrap();
        let without = r.attributes(&CompoundObject::new());
        assert!(r.edit_attributes(handle, &without));
        assert!(f.graph.node("a").unwrap().get("user:foo").is_none());
    }

    #[test]
    fn test_light_nodes_are_prefixed() {
        let mut f = Fixture::new(RenderType::Batch);
        let mut r = f.renderer();
        let network = ShaderNetwork::single(Shader::new("point_light", "ai:light")).unwrap();
        let attrs = r.attributes(&compound([("ai:light", AttributeValue::from(network))]));
        r.light("key", None, &attrs).unwrap();

        let light = f.graph.node("light:key").unwrap();
        assert_eq!(light.entry_name(), "point_light");
        assert_eq!(light.get_matrix("matrix"), Some(Mat4::IDENTITY));
    }
}
