use std::path::PathBuf;
use std::sync::Arc;

use relay_core::graph::NodeLibrary;

use crate::geometry_rules::GeometryRules;

/// How a session delivers its scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RenderType {
    /// Build once, render once.
    #[default]
    Batch,
    /// Live session: objects may be edited and released between commits.
    Interactive,
    /// Write the native graph to a file at every commit.
    SceneDescription,
}

/// Session configuration.
///
/// | Field         | Default                     |
/// |---------------|-----------------------------|
/// | `mode`        | [`RenderType::Batch`]       |
/// | `destination` | none                        |
/// | `library`     | [`NodeLibrary::builtin`]    |
/// | `rules`       | [`GeometryRules::builtin`]  |
#[derive(Clone)]
pub struct SessionSettings {
    pub mode: RenderType,
    /// Scene-description output file. Required for
    /// [`RenderType::SceneDescription`].
    pub destination: Option<PathBuf>,
    pub library: Arc<NodeLibrary>,
    pub rules: GeometryRules,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            mode: RenderType::Batch,
            destination: None,
            library: Arc::new(NodeLibrary::builtin()),
            rules: GeometryRules::builtin(),
        }
    }
}

impl SessionSettings {
    #[must_use]
    pub fn new(mode: RenderType) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_destination(mut self, destination: impl Into<PathBuf>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    #[must_use]
    pub fn with_library(mut self, library: Arc<NodeLibrary>) -> Self {
        self.library = library;
        self
    }

    #[must_use]
    pub fn with_rules(mut self, rules: GeometryRules) -> Self {
        self.rules = rules;
        self
    }
}
