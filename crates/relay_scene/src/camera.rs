use glam::{IVec2, Vec2};

/// Camera projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Projection {
    #[default]
    Perspective,
    Orthographic,
}

impl Projection {
    #[must_use]
    pub fn native_entry(self) -> &'static str {
        match self {
            Self::Perspective => "persp_camera",
            Self::Orthographic => "ortho_camera",
        }
    }
}

/// Pixel-space crop window, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderRegion {
    pub min: IVec2,
    pub max: IVec2,
}

impl RenderRegion {
    #[must_use]
    pub fn new(min: IVec2, max: IVec2) -> Self {
        Self { min, max }
    }

    /// The whole frame of a `resolution` sized image.
    #[must_use]
    pub fn full(resolution: IVec2) -> Self {
        Self::new(IVec2::ZERO, resolution - IVec2::ONE)
    }
}

/// Renderer-agnostic camera description.
///
/// | Field               | Default              |
/// |---------------------|----------------------|
/// | `projection`        | Perspective          |
/// | `field_of_view`     | 50 degrees           |
/// | `resolution`        | 640 x 480            |
/// | `render_region`     | full frame           |
/// | `clipping_planes`   | 0.01 .. 100000       |
/// | `shutter`           | 0 .. 0               |
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub projection: Projection,
    /// Horizontal field of view in degrees.
    pub field_of_view: f32,
    pub resolution: IVec2,
    pub render_region: Option<RenderRegion>,
    pub pixel_aspect_ratio: f32,
    pub clipping_planes: Vec2,
    pub shutter: Vec2,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            projection: Projection::Perspective,
            field_of_view: 50.0,
            resolution: IVec2::new(640, 480),
            render_region: None,
            pixel_aspect_ratio: 1.0,
            clipping_planes: Vec2::new(0.01, 100_000.0),
            shutter: Vec2::ZERO,
        }
    }
}

impl Camera {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_resolution(mut self, resolution: IVec2) -> Self {
        self.resolution = resolution;
        self
    }

    #[must_use]
    pub fn with_render_region(mut self, region: RenderRegion) -> Self {
        self.render_region = Some(region);
        self
    }

    #[must_use]
    pub fn with_shutter(mut self, open: f32, close: f32) -> Self {
        self.shutter = Vec2::new(open, close);
        self
    }

    #[must_use]
    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }

    #[must_use]
    pub fn with_field_of_view(mut self, degrees: f32) -> Self {
        self.field_of_view = degrees;
        self
    }

    /// Effective crop window.
    #[must_use]
    pub fn region(&self) -> RenderRegion {
        self.render_region
            .unwrap_or_else(|| RenderRegion::full(self.resolution))
    }
}
