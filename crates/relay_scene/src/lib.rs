//! Relay Scene
//!
//! Renderer sessions: everything between a client describing a scene and
//! the native node graph a renderer consumes.
//!
//! - [`attributes`]: parsed, deduplicated attribute sets
//! - [`primitives`]: renderer-agnostic geometry
//! - [`geometry_rules`]: which attributes affect processed geometry
//! - [`instance_cache`]: sharing identical shapes between objects
//! - [`options`] and [`outputs`]: renderer-global state
//! - [`session`]: the [`Session`] tying it together behind [`Renderer`]

pub mod attributes;
pub mod camera;
pub mod geometry_rules;
pub mod instance_cache;
pub mod options;
pub mod outputs;
pub mod primitives;
pub mod procedural;
pub mod registry;
pub mod renderer;
mod scope;
pub mod session;
pub mod settings;
pub mod shape;

pub use attributes::{AttributeFactory, AttributeSet, AttributeValue, CompoundObject, compound};
pub use camera::{Camera, Projection, RenderRegion};
pub use geometry_rules::{EffectiveGeometry, GeometryRule, GeometryRules, RuleCondition, SubdivType};
pub use instance_cache::{INSTANCE_PREFIX, InstanceCache, Placement};
pub use options::OptionState;
pub use outputs::{Output, TranslatedOutput};
pub use primitives::{
    CurveBasis, CurveWidth, CurvesPrimitive, ExternalProcedural, MeshInterpolation, MeshPrimitive,
    Object, ShapeKind, SpherePrimitive, VolumeObject,
};
pub use procedural::Procedural;
pub use renderer::{ObjectHandle, Renderer};
pub use scope::LIGHT_PREFIX;
pub use session::Session;
pub use settings::{RenderType, SessionSettings};
