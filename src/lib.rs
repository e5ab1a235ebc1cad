//! Relay
//!
//! Renderer-agnostic scene translation. Clients describe objects, lights,
//! cameras, shader networks and outputs; a [`Session`] turns them into a
//! native node graph, sharing identical shader networks and identical
//! geometry along the way.
//!
//! The work is split across three crates, re-exported here:
//!
//! | Crate           | Contents                                              |
//! |-----------------|-------------------------------------------------------|
//! | `relay_core`    | values, hashing, ray types, the native node graph     |
//! | `relay_shading` | shader networks, translation, the shader cache        |
//! | `relay_scene`   | attributes, primitives, instancing, options, sessions |
//!
//! # Usage
//!
//! ```rust,ignore
//! use relay::prelude::*;
//!
//! let mut session = Session::create("Arnold", RenderType::Batch, None)?;
//! let attributes = session.attributes(&compound([("doubleSided", false)]));
//! let plane = MeshPrimitive::create_plane(Vec2::splat(-1.0), Vec2::ONE);
//! let handle = session.object("plane", plane.into(), &attributes)?;
//! session.transform(handle, Mat4::from_translation(Vec3::Z))?;
//! session.render()?;
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub use relay_core as core;
pub use relay_scene as scene;
pub use relay_shading as shading;

pub use relay_core::{NodeGraph, NodeKey, NodeLibrary, RayType, RelayError, Result, Value};
pub use relay_scene::{
    AttributeSet, AttributeValue, Camera, CompoundObject, Object, ObjectHandle, Output, Procedural,
    RenderType, Renderer, Session, SessionSettings, compound,
};
pub use relay_shading::{Shader, ShaderNetwork};

/// Everything needed to drive a session.
pub mod prelude {
    pub use glam::{IVec2, Mat4, Vec2, Vec3};

    pub use relay_core::{NativeValue, RayType, RelayError, Value};
    pub use relay_scene::{
        AttributeValue, Camera, CompoundObject, CurvesPrimitive, ExternalProcedural,
        MeshInterpolation, MeshPrimitive, Object, Output, Procedural, Projection, RenderRegion,
        RenderType, Renderer, Session, SessionSettings, SpherePrimitive, VolumeObject, compound,
    };
    pub use relay_shading::{Shader, ShaderNetwork};
}
