//! Native Node Library
//!
//! Describes every node entry the native graph can instantiate: its kind and
//! the declared type of each parameter. Translators introspect these
//! declarations to decide how a value is converted or how a link is wired
//! (node pointer vs. shading connection), instead of guessing from the
//! source node.
//!
//! [`NodeLibrary::builtin`] ships the catalog used by the default session.
//! Additional entries can be registered at runtime.

use std::collections::BTreeMap;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{RelayError, Result};

/// Declared type of a native parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParamType {
    Byte,
    Int,
    UInt,
    Bool,
    Float,
    Rgb,
    Rgba,
    Vector,
    Vector2,
    String,
    Matrix,
    Node,
    ByteArray,
    IntArray,
    UIntArray,
    BoolArray,
    FloatArray,
    RgbArray,
    VectorArray,
    StringArray,
    MatrixArray,
    NodeArray,
}

impl ParamType {
    #[must_use]
    pub fn is_array(self) -> bool {
        matches!(
            self,
            Self::ByteArray
                | Self::IntArray
                | Self::UIntArray
                | Self::BoolArray
                | Self::FloatArray
                | Self::RgbArray
                | Self::VectorArray
                | Self::StringArray
                | Self::MatrixArray
                | Self::NodeArray
        )
    }

    /// Array counterpart of a scalar type (used for motion keys).
    #[must_use]
    pub fn array_of(self) -> Option<Self> {
        Some(match self {
            Self::Byte => Self::ByteArray,
            Self::Int => Self::IntArray,
            Self::UInt => Self::UIntArray,
            Self::Bool => Self::BoolArray,
            Self::Float => Self::FloatArray,
            Self::Rgb => Self::RgbArray,
            Self::Vector => Self::VectorArray,
            Self::String => Self::StringArray,
            Self::Matrix => Self::MatrixArray,
            Self::Node => Self::NodeArray,
            _ => return None,
        })
    }

    /// Prefix used for user-declared constant parameters (`constant RGB`).
    #[must_use]
    pub fn declaration_name(self) -> &'static str {
        match self {
            Self::Byte | Self::ByteArray => "BYTE",
            Self::Int | Self::IntArray => "INT",
            Self::UInt | Self::UIntArray => "UINT",
            Self::Bool | Self::BoolArray => "BOOL",
            Self::Float | Self::FloatArray => "FLOAT",
            Self::Rgb | Self::RgbArray => "RGB",
            Self::Rgba => "RGBA",
            Self::Vector | Self::VectorArray => "VECTOR",
            Self::Vector2 => "VECTOR2",
            Self::String | Self::StringArray => "STRING",
            Self::Matrix | Self::MatrixArray => "MATRIX",
            Self::Node | Self::NodeArray => "NODE",
        }
    }
}

/// Broad classification of a node entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Options,
    Camera,
    Light,
    Shape,
    Shader,
    Filter,
    Driver,
}

/// A node type the native graph knows how to instantiate.
#[derive(Debug, Clone)]
pub struct NodeEntry {
    name: String,
    kind: NodeKind,
    params: BTreeMap<String, ParamType>,
    /// Dynamic entries accept any parameter, typed from the value assigned.
    dynamic: bool,
}

impl NodeEntry {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            params: BTreeMap::new(),
            dynamic: false,
        }
    }

    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, ty: ParamType) -> Self {
        self.params.insert(name.into(), ty);
        self
    }

    #[must_use]
    pub fn with_params(mut self, params: &[(&str, ParamType)]) -> Self {
        for (name, ty) in params {
            self.params.insert((*name).to_string(), *ty);
        }
        self
    }

    #[must_use]
    pub fn dynamic(mut self) -> Self {
        self.dynamic = true;
        self
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    #[inline]
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    /// Declared type of a parameter, if the entry has one.
    #[must_use]
    pub fn param_type(&self, name: &str) -> Option<ParamType> {
        self.params.get(name).copied()
    }

    pub fn params(&self) -> impl Iterator<Item = (&str, ParamType)> + '_ {
        self.params.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Registry of node entries, shared by reference between sessions.
#[derive(Debug, Clone, Default)]
pub struct NodeLibrary {
    entries: FxHashMap<String, Arc<NodeEntry>>,
}

impl NodeLibrary {
    /// Empty library containing only the `options` entry.
    #[must_use]
    pub fn new() -> Self {
        let mut lib = Self {
            entries: FxHashMap::default(),
        };
        lib.register(NodeEntry::new("options", NodeKind::Options).with_params(OPTIONS_PARAMS));
        lib
    }

    /// The built-in catalog.
    #[must_use]
    pub fn builtin() -> Self {
        let mut lib = Self::new();
        register_builtin(&mut lib);
        lib
    }

    /// Adds or replaces an entry.
    pub fn register(&mut self, entry: NodeEntry) {
        self.entries.insert(entry.name.clone(), Arc::new(entry));
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<NodeEntry>> {
        self.entries.get(name)
    }

    pub fn entry(&self, name: &str) -> Result<Arc<NodeEntry>> {
        self.entries
            .get(name)
            .cloned()
            .ok_or_else(|| RelayError::UnknownNodeEntry(name.to_string()))
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Built-in catalog
// ============================================================================

use ParamType as P;

const OPTIONS_PARAMS: &[(&str, ParamType)] = &[
    ("outputs", P::StringArray),
    ("light_path_expressions", P::StringArray),
    ("aov_shaders", P::NodeArray),
    ("atmosphere", P::Node),
    ("background", P::Node),
    ("camera", P::Node),
    ("xres", P::Int),
    ("yres", P::Int),
    ("pixel_aspect_ratio", P::Float),
    ("region_min_x", P::Int),
    ("region_min_y", P::Int),
    ("region_max_x", P::Int),
    ("region_max_y", P::Int),
    ("AA_seed", P::Int),
    ("AA_samples", P::Int),
    ("GI_diffuse_samples", P::Int),
    ("GI_specular_samples", P::Int),
    ("GI_diffuse_depth", P::Int),
    ("GI_specular_depth", P::Int),
    ("GI_transmission_depth", P::Int),
    ("GI_total_depth", P::Int),
    ("threads", P::Int),
    ("bucket_size", P::Int),
    ("bucket_scanning", P::String),
    ("texture_searchpath", P::String),
    ("plugin_searchpath", P::String),
    ("procedural_searchpath", P::String),
    ("ignore_textures", P::Bool),
    ("ignore_shaders", P::Bool),
    ("ignore_atmosphere", P::Bool),
    ("ignore_lights", P::Bool),
    ("ignore_shadows", P::Bool),
    ("ignore_subdivision", P::Bool),
    ("ignore_displacement", P::Bool),
    ("ignore_bump", P::Bool),
    ("ignore_motion_blur", P::Bool),
    ("ignore_sss", P::Bool),
    ("abort_on_error", P::Bool),
    ("error_color_bad_texture", P::Rgb),
    ("error_color_bad_pixel", P::Rgb),
    ("error_color_bad_shader", P::Rgb),
];

/// Parameters shared by every shape (including instances).
const SHAPE_PARAMS: &[(&str, ParamType)] = &[
    ("matrix", P::Matrix),
    ("motion_start", P::Float),
    ("motion_end", P::Float),
    ("visibility", P::Byte),
    ("sidedness", P::Byte),
    ("receive_shadows", P::Bool),
    ("self_shadows", P::Bool),
    ("matte", P::Bool),
    ("opaque", P::Bool),
    ("shader", P::Node),
    ("disp_map", P::Node),
    ("disp_height", P::Float),
    ("disp_padding", P::Float),
    ("disp_zero_value", P::Float),
    ("disp_autobump", P::Bool),
    ("trace_sets", P::StringArray),
    ("transform_type", P::String),
    ("sss_setname", P::String),
    ("step_size", P::Float),
    ("volume_padding", P::Float),
    ("id", P::UInt),
];

const LIGHT_PARAMS: &[(&str, ParamType)] = &[
    ("matrix", P::Matrix),
    ("motion_start", P::Float),
    ("motion_end", P::Float),
    ("color", P::Rgb),
    ("intensity", P::Float),
    ("exposure", P::Float),
    ("samples", P::Int),
    ("normalize", P::Bool),
    ("cast_shadows", P::Bool),
    ("filters", P::NodeArray),
];

const CAMERA_PARAMS: &[(&str, ParamType)] = &[
    ("matrix", P::Matrix),
    ("motion_start", P::Float),
    ("motion_end", P::Float),
    ("near_clip", P::Float),
    ("far_clip", P::Float),
    ("shutter_start", P::Float),
    ("shutter_end", P::Float),
    ("screen_window_min", P::Vector2),
    ("screen_window_max", P::Vector2),
    ("filtermap", P::Node),
];

const DRIVER_PARAMS: &[(&str, ParamType)] = &[("filename", P::String), ("append", P::Bool)];

fn shape(name: &str, extra: &[(&str, ParamType)]) -> NodeEntry {
    NodeEntry::new(name, NodeKind::Shape)
        .with_params(SHAPE_PARAMS)
        .with_params(extra)
}

fn light(name: &str, extra: &[(&str, ParamType)]) -> NodeEntry {
    NodeEntry::new(name, NodeKind::Light)
        .with_params(LIGHT_PARAMS)
        .with_params(extra)
}

fn shader(name: &str, params: &[(&str, ParamType)]) -> NodeEntry {
    NodeEntry::new(name, NodeKind::Shader).with_params(params)
}

fn register_builtin(lib: &mut NodeLibrary) {
    // Shapes
    lib.register(shape(
        "polymesh",
        &[
            ("nsides", P::UIntArray),
            ("vidxs", P::UIntArray),
            ("vlist", P::VectorArray),
            ("smoothing", P::Bool),
            ("subdiv_type", P::String),
            ("subdiv_iterations", P::Byte),
            ("subdiv_adaptive_error", P::Float),
            ("subdiv_adaptive_metric", P::String),
            ("subdiv_adaptive_space", P::String),
            ("subdiv_uv_smoothing", P::String),
            ("subdiv_smooth_derivs", P::Bool),
        ],
    ));
    lib.register(shape(
        "curves",
        &[
            ("num_points", P::UIntArray),
            ("points", P::VectorArray),
            ("radius", P::FloatArray),
            ("basis", P::String),
            ("mode", P::String),
            ("min_pixel_width", P::Float),
        ],
    ));
    lib.register(shape(
        "sphere",
        &[("center", P::Vector), ("radius", P::Float)],
    ));
    lib.register(shape("box", &[("min", P::Vector), ("max", P::Vector)]));
    lib.register(shape(
        "volume",
        &[
            ("filename", P::String),
            ("grids", P::StringArray),
            ("velocity_grids", P::StringArray),
            ("velocity_scale", P::Float),
            ("velocity_fps", P::Float),
            ("velocity_outlier_threshold", P::Float),
        ],
    ));
    lib.register(shape(
        "ginstance",
        &[("node", P::Node), ("inherit_xform", P::Bool)],
    ));
    lib.register(shape("procedural", &[("filename", P::String)]));

    // Cameras
    lib.register(
        NodeEntry::new("persp_camera", NodeKind::Camera)
            .with_params(CAMERA_PARAMS)
            .with_param("fov", P::Float),
    );
    lib.register(NodeEntry::new("ortho_camera", NodeKind::Camera).with_params(CAMERA_PARAMS));

    // Lights
    lib.register(light("point_light", &[("radius", P::Float)]));
    lib.register(light(
        "spot_light",
        &[
            ("radius", P::Float),
            ("cone_angle", P::Float),
            ("penumbra_angle", P::Float),
        ],
    ));
    lib.register(light("distant_light", &[("angle", P::Float)]));
    lib.register(light("quad_light", &[("vertices", P::VectorArray)]));
    lib.register(light("skydome_light", &[("resolution", P::Int)]));
    lib.register(light("mesh_light", &[("mesh", P::Node)]));

    // Surface and utility shaders
    lib.register(shader("flat", &[("color", P::Rgb)]));
    lib.register(shader(
        "noise",
        &[
            ("octaves", P::Int),
            ("distortion", P::Float),
            ("lacunarity", P::Float),
            ("amplitude", P::Float),
            ("scale", P::Vector),
            ("offset", P::Vector),
            ("color1", P::Rgb),
            ("color2", P::Rgb),
        ],
    ));
    lib.register(shader(
        "standard_surface",
        &[
            ("base", P::Float),
            ("base_color", P::Rgb),
            ("diffuse_roughness", P::Float),
            ("specular", P::Float),
            ("specular_color", P::Rgb),
            ("specular_roughness", P::Float),
            ("metalness", P::Float),
            ("emission", P::Float),
            ("emission_color", P::Rgb),
            ("normal", P::Vector),
            ("opacity", P::Rgb),
        ],
    ));
    lib.register(shader(
        "lambert",
        &[("Kd", P::Float), ("Kd_color", P::Rgb), ("opacity", P::Rgb)],
    ));
    lib.register(shader(
        "utility",
        &[
            ("color", P::Rgb),
            ("color_mode", P::String),
            ("shade_mode", P::String),
        ],
    ));
    lib.register(shader(
        "image",
        &[
            ("filename", P::String),
            ("color_space", P::String),
            ("multiply", P::Rgb),
            ("offset", P::Rgb),
        ],
    ));
    lib.register(shader(
        "gobo",
        &[
            ("slidemap", P::Rgb),
            ("rotate", P::Float),
            ("offset", P::Vector2),
            ("density", P::Float),
            ("filter_mode", P::String),
            ("scale_s", P::Float),
            ("scale_t", P::Float),
        ],
    ));
    lib.register(shader("add", &[("input1", P::Rgb), ("input2", P::Rgb)]));
    lib.register(shader("multiply", &[("input1", P::Rgb), ("input2", P::Rgb)]));
    lib.register(shader(
        "float_to_rgb",
        &[("r", P::Float), ("g", P::Float), ("b", P::Float)],
    ));
    lib.register(shader(
        "aov_write_rgb",
        &[
            ("aov_input", P::Rgb),
            ("aov_name", P::String),
            ("blend_opacity", P::Bool),
        ],
    ));
    lib.register(shader(
        "aov_write_float",
        &[("aov_input", P::Float), ("aov_name", P::String)],
    ));
    lib.register(shader(
        "aov_write_int",
        &[("aov_input", P::Int), ("aov_name", P::String)],
    ));
    lib.register(shader(
        "atmosphere_volume",
        &[
            ("density", P::Float),
            ("samples", P::Int),
            ("eccentricity", P::Float),
            ("attenuation", P::Float),
            ("rgb_density", P::Rgb),
        ],
    ));
    lib.register(
        shader(
            "osl",
            &[
                ("shadername", P::String),
                ("output", P::String),
                ("code", P::String),
            ],
        )
        .dynamic(),
    );

    // Filters
    for filter in [
        "gaussian_filter",
        "box_filter",
        "triangle_filter",
        "blackman_harris_filter",
        "catrom_filter",
        "mitnet_filter",
        "cone_filter",
        "closest_filter",
    ] {
        lib.register(NodeEntry::new(filter, NodeKind::Filter).with_param("width", P::Float));
    }

    // Drivers
    lib.register(
        NodeEntry::new("driver_exr", NodeKind::Driver)
            .with_params(DRIVER_PARAMS)
            .with_params(&[
                ("compression", P::String),
                ("half_precision", P::Bool),
                ("tiled", P::Bool),
                ("autocrop", P::Bool),
                ("custom_attributes", P::StringArray),
            ]),
    );
    lib.register(
        NodeEntry::new("driver_deepexr", NodeKind::Driver)
            .with_params(DRIVER_PARAMS)
            .with_params(&[
                ("compression", P::String),
                ("tiled", P::Bool),
                ("custom_attributes", P::StringArray),
            ]),
    );
    lib.register(
        NodeEntry::new("driver_tiff", NodeKind::Driver)
            .with_params(DRIVER_PARAMS)
            .with_params(&[
                ("compression", P::String),
                ("format", P::String),
                ("dither", P::Bool),
                ("tiled", P::Bool),
            ]),
    );
    lib.register(
        NodeEntry::new("driver_png", NodeKind::Driver)
            .with_params(DRIVER_PARAMS)
            .with_params(&[("format", P::String), ("dither", P::Bool)]),
    );
    lib.register(
        NodeEntry::new("driver_jpeg", NodeKind::Driver)
            .with_params(DRIVER_PARAMS)
            .with_params(&[("quality", P::Int), ("dither", P::Bool)]),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_contains_core_entries() {
        let lib = NodeLibrary::builtin();
        for name in ["options", "polymesh", "ginstance", "osl", "mesh_light", "driver_exr"] {
            assert!(lib.contains(name), "missing {name}");
        }
    }

    #[test]
    fn test_unknown_entry_is_an_error() {
        let lib = NodeLibrary::builtin();
        assert!(matches!(
            lib.entry("not_a_node"),
            Err(RelayError::UnknownNodeEntry(_))
        ));
    }

    #[test]
    fn test_pointer_parameters_are_declared_as_nodes() {
        let lib = NodeLibrary::builtin();
        let camera = lib.get("persp_camera").unwrap();
        assert_eq!(camera.param_type("filtermap"), Some(ParamType::Node));
        let spot = lib.get("spot_light").unwrap();
        assert_eq!(spot.param_type("filters"), Some(ParamType::NodeArray));
        let lambert = lib.get("lambert").unwrap();
        assert_eq!(lambert.param_type("Kd_color"), Some(ParamType::Rgb));
    }

    #[test]
    fn test_only_exr_drivers_take_custom_attributes() {
        let lib = NodeLibrary::builtin();
        assert!(lib.get("driver_exr").unwrap().param_type("custom_attributes").is_some());
        assert!(lib.get("driver_tiff").unwrap().param_type("custom_attributes").is_none());
    }
}
