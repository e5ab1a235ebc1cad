use relay_core::error::Result;

use crate::renderer::Renderer;

/// Client-implemented geometry generator.
///
/// Submitted as [`crate::primitives::Object::Procedural`] and expanded when
/// the session commits: `render` is called once with a renderer whose
/// objects live under the procedural's own node.
pub trait Procedural: Send + Sync {
    fn render(&self, renderer: &mut dyn Renderer) -> Result<()>;
}
