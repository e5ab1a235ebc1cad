//! Relay Shading
//!
//! Shader networks and their translation into native node graphs.
//!
//! - [`network`]: authoring ([`Shader`]) and validated ([`ShaderNetwork`])
//!   forms of a shading graph
//! - [`translator`]: flattening a network into native nodes
//! - [`cache`]: content-addressed sharing of translated networks

pub mod cache;
pub mod network;
pub mod translator;

pub use cache::{ShaderCache, ShaderHandle};
pub use network::{
    HANDLE_PARAMETER, LinkRef, NetworkNode, NetworkParameter, Shader, ShaderLanguage,
    ShaderNetwork, ShaderParameter,
};
pub use translator::{NodeNaming, TranslatedNetwork, translate};
