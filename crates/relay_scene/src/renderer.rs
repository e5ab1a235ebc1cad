//! The `Renderer` Interface
//!
//! What scene clients and procedurals see of a session: submission of
//! objects, lights and cameras, and mutation of what was submitted.
//! [`crate::Session`] implements it for the top-level scene; procedurals
//! receive an implementation scoped to their own node.

use std::sync::Arc;

use glam::Mat4;
use relay_core::error::Result;
use slotmap::new_key_type;

use crate::attributes::{AttributeSet, CompoundObject};
use crate::camera::Camera;
use crate::primitives::Object;

new_key_type! {
    /// Handle to a submitted object, light or camera.
    pub struct ObjectHandle;
}

pub trait Renderer {
    /// Parses (or reuses) the attribute set for `attributes`.
    fn attributes(&mut self, attributes: &CompoundObject) -> Arc<AttributeSet>;

    fn object(&mut self, name: &str, object: Object, attributes: &Arc<AttributeSet>) -> Result<ObjectHandle>;

    /// Deforming object: one sample per time.
    fn object_samples(
        &mut self,
        name: &str,
        samples: Vec<Object>,
        times: &[f32],
        attributes: &Arc<AttributeSet>,
    ) -> Result<ObjectHandle>;

    /// A light, optionally with geometry (mesh lights).
    fn light(&mut self, name: &str, object: Option<Object>, attributes: &Arc<AttributeSet>) -> Result<ObjectHandle>;

    fn camera(&mut self, name: &str, camera: &Camera, attributes: &Arc<AttributeSet>) -> Result<ObjectHandle>;

    fn transform(&mut self, handle: ObjectHandle, matrix: Mat4) -> Result<()>;

    fn transform_samples(&mut self, handle: ObjectHandle, samples: &[Mat4], times: &[f32]) -> Result<()>;

    /// Applies `attributes` in place. `false` means the object must be
    /// released and submitted again.
    fn edit_attributes(&mut self, handle: ObjectHandle, attributes: &Arc<AttributeSet>) -> bool;

    /// Destroys the object's native nodes.
    fn release(&mut self, handle: ObjectHandle);
}
