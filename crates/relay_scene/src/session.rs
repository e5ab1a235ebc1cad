//! Render Sessions
//!
//! [`Session`] is the entry point of the crate: it owns the native graph,
//! the global options and every scope of submitted objects.
//!
//! # Usage
//!
//! ```rust,ignore
//! use relay_scene::{RenderType, Renderer, Session};
//!
//! let mut session = Session::create("Arnold", RenderType::Batch, None)?;
//! let attributes = session.attributes(&Default::default());
//! session.object("plane", plane.into(), &attributes)?;
//! session.render()?;
//! ```
//!
//! # Commit
//!
//! [`Session::render`] expands pending procedurals, resolves the render
//! camera into the options node, collects unused shaders (interactive
//! sessions only) and, for scene-description sessions, writes the graph to
//! the destination file.

use std::path::Path;
use std::sync::Arc;

use glam::Mat4;
use relay_core::error::{RelayError, Result};
use relay_core::graph::NodeGraph;
use slotmap::SlotMap;

use crate::attributes::{AttributeSet, AttributeValue, CompoundObject};
use crate::camera::Camera;
use crate::options::OptionState;
use crate::outputs::Output;
use crate::primitives::Object;
use crate::renderer::{ObjectHandle, Renderer};
use crate::scope::{SceneContext, Scope, ScopeKey, ScopeRenderer};
use crate::settings::{RenderType, SessionSettings};

/// Backends [`Session::create`] accepts.
const RENDERER_TYPES: &[&str] = &["Arnold"];

pub struct Session {
    settings: SessionSettings,
    graph: NodeGraph,
    root: Scope,
    procedural_scopes: SlotMap<ScopeKey, Scope>,
    context: SceneContext,
    options: OptionState,
}

impl Session {
    /// Registered renderer type names.
    #[must_use]
    pub fn types() -> &'static [&'static str] {
        RENDERER_TYPES
    }

    /// Creates a session for the backend `type_name`.
    pub fn create(type_name: &str, mode: RenderType, destination: Option<&Path>) -> Result<Self> {
        if !RENDERER_TYPES.contains(&type_name) {
            return Err(RelayError::UnknownRendererType(type_name.to_string()));
        }
        let mut settings = SessionSettings::new(mode);
        settings.destination = destination.map(Path::to_path_buf);
        Self::new(settings)
    }

    pub fn new(settings: SessionSettings) -> Result<Self> {
        if settings.mode == RenderType::SceneDescription && settings.destination.is_none() {
            return Err(RelayError::MissingDestination);
        }
        log::info!("Creating {:?} session", settings.mode);

        Ok(Self {
            graph: NodeGraph::new(Arc::clone(&settings.library)),
            root: Scope::new(None),
            procedural_scopes: SlotMap::with_key(),
            context: SceneContext::new(settings.mode, settings.rules.clone()),
            options: OptionState::new(),
            settings,
        })
    }

    #[inline]
    #[must_use]
    pub fn mode(&self) -> RenderType {
        self.settings.mode
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// The native graph built so far.
    #[inline]
    #[must_use]
    pub fn graph(&self) -> &NodeGraph {
        &self.graph
    }

    #[must_use]
    pub fn options(&self) -> &OptionState {
        &self.options
    }

    /// Number of shader networks held by the top-level scope.
    #[must_use]
    pub fn shader_count(&self) -> usize {
        self.root.shaders.len()
    }

    /// Number of shared shapes held by the top-level scope.
    #[must_use]
    pub fn shared_shape_count(&self) -> usize {
        self.root.instances.len()
    }

    // ========================================================================
    // Global state
    // ========================================================================

    /// Sets (`Some`) or resets (`None`) a global option.
    pub fn option(&mut self, name: &str, value: Option<AttributeValue>) -> Result<()> {
        self.options
            .set(&mut self.graph, &mut self.root.shaders, name, value.as_ref())?;
        self.context.render_camera = self.options.camera().map(str::to_string);
        Ok(())
    }

    /// Creates, replaces (`Some`) or removes (`None`) an output.
    pub fn output(&mut self, name: &str, output: Option<Output>) -> Result<()> {
        self.options.output(&mut self.graph, name, output.as_ref())
    }

    // ========================================================================
    // Commit
    // ========================================================================

    pub fn render(&mut self) -> Result<()> {
        self.expand_procedurals();
        self.drop_released_scopes();

        let camera = self
            .options
            .camera()
            .and_then(|name| self.context.cameras.get(name))
            .map(|record| (record.node, &record.camera));
        self.options.commit(&mut self.graph, camera);

        if self.settings.mode == RenderType::Interactive {
            let mut collected = self.root.shaders.collect_garbage(&mut self.graph);
            for scope in self.procedural_scopes.values_mut() {
                collected += scope.shaders.collect_garbage(&mut self.graph);
            }
            if collected > 0 {
                log::debug!("Collected {collected} unused shader networks");
            }
            self.context.factory.purge();
        }

        if self.settings.mode == RenderType::SceneDescription
            && let Some(destination) = &self.settings.destination
        {
            self.graph.save(destination)?;
            log::info!("Wrote scene description \"{}\"", destination.display());
        }

        log::info!("Committed {} native nodes", self.graph.len());
        Ok(())
    }

    /// Runs every procedural submitted since the last commit, including
    /// procedurals submitted by procedurals.
    fn expand_procedurals(&mut self) {
        loop {
            let pending = std::mem::take(&mut self.context.pending);
            if pending.is_empty() {
                break;
            }

            for procedural in pending {
                if !self.graph.contains(procedural.node) {
                    continue;
                }
                let key = self.procedural_scopes.insert(Scope::new(Some(procedural.node)));
                let owner = match procedural.owner {
                    None => Some(&mut self.root),
                    Some(owner) => self.procedural_scopes.get_mut(owner),
                };
                if let Some(record) = owner.and_then(|scope| scope.objects.get_mut(procedural.handle)) {
                    record.attach_scope(key);
                }

                let name = self.graph.name_of(procedural.node).unwrap_or_default().to_string();
                let Some(scope) = self.procedural_scopes.get_mut(key) else {
                    continue;
                };
                let mut renderer = ScopeRenderer::new(&mut self.graph, scope, Some(key), &mut self.context);
                match procedural.procedural.render(&mut renderer) {
                    Ok(()) => log::debug!("Expanded procedural \"{name}\""),
                    Err(err) => log::error!("Procedural \"{name}\" failed to expand: {err}"),
                }
            }
        }
    }

    fn drop_released_scopes(&mut self) {
        let mut released = std::mem::take(&mut self.context.released_scopes);
        while let Some(key) = released.pop() {
            if let Some(scope) = self.procedural_scopes.remove(key) {
                released.extend(scope.child_scopes());
            }
        }
        let graph = &self.graph;
        self.context.cameras.retain(|_, record| graph.contains(record.node));
    }

    fn root_renderer(&mut self) -> ScopeRenderer<'_> {
        ScopeRenderer::new(&mut self.graph, &mut self.root, None, &mut self.context)
    }
}

impl Renderer for Session {
    fn attributes(&mut self, attributes: &CompoundObject) -> Arc<AttributeSet> {
        self.context.factory.get(attributes)
    }

    fn object(&mut self, name: &str, object: Object, attributes: &Arc<AttributeSet>) -> Result<ObjectHandle> {
        self.root_renderer().object(name, object, attributes)
    }

    fn object_samples(
        &mut self,
        name: &str,
        samples: Vec<Object>,
        times: &[f32],
        attributes: &Arc<AttributeSet>,
    ) -> Result<ObjectHandle> {
        self.root_renderer()
            .object_samples(name, samples, times, attributes)
    }

    fn light(&mut self, name: &str, object: Option<Object>, attributes: &Arc<AttributeSet>) -> Result<ObjectHandle> {
        self.root_renderer().light(name, object, attributes)
    }

    fn camera(&mut self, name: &str, camera: &Camera, attributes: &Arc<AttributeSet>) -> Result<ObjectHandle> {
        self.root_renderer().camera(name, camera, attributes)
    }

    fn transform(&mut self, handle: ObjectHandle, matrix: Mat4) -> Result<()> {
        self.root_renderer().transform(handle, matrix)
    }

    fn transform_samples(&mut self, handle: ObjectHandle, samples: &[Mat4], times: &[f32]) -> Result<()> {
        self.root_renderer().transform_samples(handle, samples, times)
    }

    fn edit_attributes(&mut self, handle: ObjectHandle, attributes: &Arc<AttributeSet>) -> bool {
        self.root_renderer().edit_attributes(handle, attributes)
    }

    fn release(&mut self, handle: ObjectHandle) {
        self.root_renderer().release(handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_renderer_type() {
        let err = Session::create("Cycles", RenderType::Batch, None).err().unwrap();
        assert!(matches!(err, RelayError::UnknownRendererType(name) if name == "Cycles"));
    }

    #[test]
    fn test_scene_description_needs_destination() {
        let err = Session::create("Arnold", RenderType::SceneDescription, None).err().unwrap();
        assert!(matches!(err, RelayError::MissingDestination));
        assert_eq!(Session::types(), &["Arnold"]);
    }
}
