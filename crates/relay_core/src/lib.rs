//! Relay Core
//!
//! Foundation types shared by every Relay crate:
//!
//! - [`Value`]: the closed tagged value carried by attributes, options and
//!   shader parameters
//! - [`hash`]: content hashing for cache keys
//! - [`RayType`]: ray visibility masks
//! - [`graph`]: the session-owned native node graph and its node library
//! - [`RelayError`]: the workspace error type

pub mod error;
pub mod graph;
pub mod hash;
pub mod value;
pub mod visibility;

pub use error::{RelayError, Result};
pub use graph::{
    Link, NativeNode, NativeValue, NodeEntry, NodeGraph, NodeKey, NodeKind, NodeLibrary,
    ParamType,
};
pub use hash::{ContentHasher, content_hash};
pub use value::{Spline, SplineBasis, Value};
pub use visibility::RayType;
