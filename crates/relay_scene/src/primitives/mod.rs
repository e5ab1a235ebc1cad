//! Scene Primitives
//!
//! Renderer-agnostic geometry handed to a session. Each primitive knows how
//! to validate itself and how to contribute to a content hash. Turning a
//! primitive into native nodes is the job of [`crate::shape`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use glam::Vec2;
//! use relay_scene::primitives::{MeshPrimitive, Object};
//!
//! let plane: Object = MeshPrimitive::create_plane(Vec2::splat(-1.0), Vec2::splat(1.0)).into();
//! ```

mod curves;
mod external;
mod mesh;
mod sphere;
mod volume;

use std::fmt;
use std::sync::Arc;

pub use curves::{CurveBasis, CurveWidth, CurvesPrimitive};
pub use external::{ExternalProcedural, NODE_TYPE_PARAMETER};
pub use mesh::{MeshInterpolation, MeshPrimitive};
pub use sphere::SpherePrimitive;
pub use volume::VolumeObject;

use relay_core::error::Result;
use relay_core::hash::ContentHasher;

use crate::procedural::Procedural;

/// Coarse shape category, used to select geometry rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Mesh,
    Curves,
    Sphere,
    Volume,
    External,
    Procedural,
}

/// Anything that can be submitted with `Renderer::object`.
#[derive(Clone)]
pub enum Object {
    Mesh(MeshPrimitive),
    Curves(CurvesPrimitive),
    Sphere(SpherePrimitive),
    External(ExternalProcedural),
    Volume(VolumeObject),
    /// Expanded into child objects when the session commits.
    Procedural(Arc<dyn Procedural>),
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mesh(m) => f.debug_tuple("Mesh").field(m).finish(),
            Self::Curves(c) => f.debug_tuple("Curves").field(c).finish(),
            Self::Sphere(s) => f.debug_tuple("Sphere").field(s).finish(),
            Self::External(e) => f.debug_tuple("External").field(e).finish(),
            Self::Volume(v) => f.debug_tuple("Volume").field(v).finish(),
            Self::Procedural(_) => f.write_str("Procedural(..)"),
        }
    }
}

/// Content equality. Procedurals are equal only to themselves.
impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Mesh(a), Self::Mesh(b)) => a == b,
            (Self::Curves(a), Self::Curves(b)) => a == b,
            (Self::Sphere(a), Self::Sphere(b)) => a == b,
            (Self::External(a), Self::External(b)) => a == b,
            (Self::Volume(a), Self::Volume(b)) => a == b,
            (Self::Procedural(a), Self::Procedural(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Object {
    #[must_use]
    pub fn kind(&self) -> ShapeKind {
        match self {
            Self::Mesh(_) => ShapeKind::Mesh,
            Self::Curves(_) => ShapeKind::Curves,
            Self::Sphere(_) => ShapeKind::Sphere,
            Self::External(_) => ShapeKind::External,
            Self::Volume(_) => ShapeKind::Volume,
            Self::Procedural(_) => ShapeKind::Procedural,
        }
    }

    pub fn validate(&self, name: &str) -> Result<()> {
        match self {
            Self::Mesh(m) => m.validate(name),
            Self::Curves(c) => c.validate(name),
            Self::Sphere(s) => s.validate(name),
            Self::External(_) | Self::Volume(_) | Self::Procedural(_) => Ok(()),
        }
    }

    /// Feeds the geometric content into `hasher`. Procedurals have no
    /// content hash and are never shared.
    pub(crate) fn hash_into(&self, hasher: &mut ContentHasher) {
        match self {
            Self::Mesh(m) => m.hash_into(hasher),
            Self::Curves(c) => c.hash_into(hasher),
            Self::Sphere(s) => s.hash_into(hasher),
            Self::External(e) => e.hash_into(hasher),
            Self::Volume(v) => v.hash_into(hasher),
            Self::Procedural(_) => {
                hasher.add("procedural");
            }
        }
    }

    /// Whether `other` can be a later motion sample of `self`.
    #[must_use]
    pub fn is_deformation_of(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Mesh(a), Self::Mesh(b)) => a.same_topology(b),
            (Self::Curves(a), Self::Curves(b)) => a.same_topology(b),
            _ => false,
        }
    }
}

impl From<MeshPrimitive> for Object {
    fn from(v: MeshPrimitive) -> Self {
        Self::Mesh(v)
    }
}

impl From<CurvesPrimitive> for Object {
    fn from(v: CurvesPrimitive) -> Self {
        Self::Curves(v)
    }
}

impl From<SpherePrimitive> for Object {
    fn from(v: SpherePrimitive) -> Self {
        Self::Sphere(v)
    }
}

impl From<ExternalProcedural> for Object {
    fn from(v: ExternalProcedural) -> Self {
        Self::External(v)
    }
}

impl From<VolumeObject> for Object {
    fn from(v: VolumeObject) -> Self {
        Self::Volume(v)
    }
}

impl From<Arc<dyn Procedural>> for Object {
    fn from(v: Arc<dyn Procedural>) -> Self {
        Self::Procedural(v)
    }
}
