//! Output/Option Registry
//!
//! Renderer-global state: outputs, declared options, the AOV shader list and
//! the atmosphere/background shaders.
//!
//! # Overview
//!
//! Most options write straight through to the native `options` node. A few
//! are resolved at commit because they depend on other state:
//!
//! | Option            | Resolved as                                          |
//! |-------------------|------------------------------------------------------|
//! | `camera`          | `camera` pointer, `xres`/`yres`, `region_*`          |
//! | `frame`           | `AA_seed` when no explicit seed is set               |
//! | `ai:AA_seed`      | `AA_seed`                                            |
//! | `ai:log:filename` | directory created at commit                          |
//!
//! AOV shaders (`ai:aov_shader:<key>`) and outputs are keyed registries:
//! setting a key replaces only that entry, and the native arrays list entries
//! in order of first insertion.

use std::path::Path;
use std::sync::Arc;

use relay_core::error::Result;
use relay_core::graph::{NativeValue, NodeGraph, NodeKey, native_type_of};
use relay_core::value::Value;
use relay_shading::{ShaderCache, ShaderHandle, ShaderNetwork};

use crate::attributes::AttributeValue;
use crate::camera::Camera;
use crate::outputs::{Output, TranslatedOutput, translate_output};
use crate::registry::KeyedRegistry;

const NATIVE_PREFIX: &str = "ai:";
const AOV_SHADER_PREFIX: &str = "ai:aov_shader:";
const DECLARE_PREFIX: &str = "ai:declare:";

/// Global render state of one session.
#[derive(Default)]
pub struct OptionState {
    camera: Option<String>,
    frame: Option<i32>,
    aa_seed: Option<i32>,
    log_file: Option<String>,
    aov_shaders: KeyedRegistry<ShaderHandle>,
    atmosphere: Option<ShaderHandle>,
    background: Option<ShaderHandle>,
    outputs: KeyedRegistry<TranslatedOutput>,
}

impl OptionState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Name of the render camera, if one was selected.
    #[must_use]
    pub fn camera(&self) -> Option<&str> {
        self.camera.as_deref()
    }

    /// Seed written at commit: explicit seed, else frame, else 1.
    #[must_use]
    pub fn aa_seed(&self) -> i32 {
        self.aa_seed.or(self.frame).unwrap_or(1)
    }

    #[must_use]
    pub fn aov_shader_count(&self) -> usize {
        self.aov_shaders.len()
    }

    /// Sets (`Some`) or resets (`None`) one option.
    pub fn set(
        &mut self,
        graph: &mut NodeGraph,
        shaders: &mut ShaderCache,
        name: &str,
        value: Option<&AttributeValue>,
    ) -> Result<()> {
        let data = value.and_then(AttributeValue::as_data);
        match name {
            "camera" => self.camera = data.and_then(Value::as_str).map(str::to_string),
            "frame" => self.frame = data.and_then(Value::as_int),
            "ai:AA_seed" => self.aa_seed = data.and_then(Value::as_int),
            "ai:log:filename" => self.log_file = data.and_then(Value::as_str).map(str::to_string),
            "ai:atmosphere" => {
                let network = shader_network(name, value);
                set_shader_pointer(graph, shaders, "atmosphere", &mut self.atmosphere, network)?;
            }
            "ai:background" => {
                let network = shader_network(name, value);
                set_shader_pointer(graph, shaders, "background", &mut self.background, network)?;
            }
            _ => {
                if let Some(key) = name.strip_prefix(AOV_SHADER_PREFIX) {
                    self.set_aov_shader(graph, shaders, key, value)?;
                } else if let Some(param) = name.strip_prefix(DECLARE_PREFIX) {
                    declare_option(graph, param, data);
                } else if let Some(param) = name.strip_prefix(NATIVE_PREFIX) {
                    set_native_option(graph, param, value);
                } else {
                    log::debug!("Ignoring option \"{name}\" for another renderer");
                }
            }
        }
        Ok(())
    }

    fn set_aov_shader(
        &mut self,
        graph: &mut NodeGraph,
        shaders: &mut ShaderCache,
        key: &str,
        value: Option<&AttributeValue>,
    ) -> Result<()> {
        let previous = match shader_network(key, value) {
            Some(network) => {
                let handle = shaders.acquire(graph, network)?;
                self.aov_shaders.set(key, handle)
            }
            None => self.aov_shaders.remove(key),
        };
        if let Some(previous) = previous {
            shaders.release(previous);
        }

        let options = graph.options();
        if self.aov_shaders.is_empty() {
            graph.unset(options, "aov_shaders");
        } else {
            let nodes = self.aov_shaders.flatten(|h| h.node);
            graph.set(options, "aov_shaders", NativeValue::NodeArray(nodes));
        }
        Ok(())
    }

    // ========================================================================
    // Outputs
    // ========================================================================

    /// Creates, replaces (`Some`) or removes (`None`) the output `name`.
    pub fn output(&mut self, graph: &mut NodeGraph, name: &str, output: Option<&Output>) -> Result<()> {
        if let Some(old) = self.outputs.get(name) {
            graph.remove(old.filter);
            graph.remove(old.driver);
        }

        let result = match output {
            Some(output) => translate_output(graph, name, output),
            None => Ok(None),
        };
        match &result {
            Ok(Some(translated)) => {
                self.outputs.set(name, translated.clone());
            }
            Ok(None) | Err(_) => {
                self.outputs.remove(name);
            }
        }
        self.write_outputs(graph);
        result.map(|_| ())
    }

    #[must_use]
    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    fn write_outputs(&self, graph: &mut NodeGraph) {
        let options = graph.options();
        let lines = self.outputs.flatten(|o| o.line.clone());
        let lpes: Vec<String> = self.outputs.values().filter_map(|o| o.lpe.clone()).collect();
        set_or_unset(graph, options, "outputs", lines);
        set_or_unset(graph, options, "light_path_expressions", lpes);
    }

    // ========================================================================
    // Commit
    // ========================================================================

    /// Writes commit-time options. `camera` is the resolved render camera.
    pub fn commit(&self, graph: &mut NodeGraph, camera: Option<(NodeKey, &Camera)>) {
        let options = graph.options();

        let default_camera = Camera::default();
        let description = match camera {
            Some((node, description)) => {
                graph.set(options, "camera", NativeValue::Node(node));
                description
            }
            None => {
                if let Some(name) = &self.camera {
                    log::warn!("Camera \"{name}\" does not exist");
                }
                &default_camera
            }
        };
        let region = description.region();
        graph.set(options, "xres", NativeValue::Int(description.resolution.x));
        graph.set(options, "yres", NativeValue::Int(description.resolution.y));
        graph.set(options, "pixel_aspect_ratio", NativeValue::Float(description.pixel_aspect_ratio));
        graph.set(options, "region_min_x", NativeValue::Int(region.min.x));
        graph.set(options, "region_min_y", NativeValue::Int(region.min.y));
        graph.set(options, "region_max_x", NativeValue::Int(region.max.x));
        graph.set(options, "region_max_y", NativeValue::Int(region.max.y));

        graph.set(options, "AA_seed", NativeValue::Int(self.aa_seed()));

        if let Some(file) = self.log_file.as_deref().filter(|f| !f.is_empty()) {
            ensure_parent_directory(Path::new(file));
        }
    }
}

fn set_or_unset(graph: &mut NodeGraph, node: NodeKey, param: &str, values: Vec<String>) {
    if values.is_empty() {
        graph.unset(node, param);
    } else {
        graph.set(node, param, NativeValue::StringArray(values));
    }
}

/// Network of a shader-valued option. Plain data cannot be converted and
/// is treated as a reset.
fn shader_network<'a>(name: &str, value: Option<&'a AttributeValue>) -> Option<&'a Arc<ShaderNetwork>> {
    match value? {
        AttributeValue::Network(network) => Some(network),
        AttributeValue::Data(data) => {
            log::warn!("Cannot convert data \"{name}\" of type \"{}\".", data.type_name());
            None
        }
    }
}

/// Points the options parameter `param` at `network`, replacing the handle
/// in `slot`. On error `slot` and the graph are unchanged.
fn set_shader_pointer(
    graph: &mut NodeGraph,
    shaders: &mut ShaderCache,
    param: &str,
    slot: &mut Option<ShaderHandle>,
    network: Option<&Arc<ShaderNetwork>>,
) -> Result<()> {
    let handle = network.map(|n| shaders.acquire(graph, n)).transpose()?;
    if let Some(previous) = std::mem::replace(slot, handle) {
        shaders.release(previous);
    }

    let options = graph.options();
    match handle {
        Some(h) => {
            graph.set(options, param, NativeValue::Node(h.node));
        }
        None => graph.unset(options, param),
    }
    Ok(())
}

fn declare_option(graph: &mut NodeGraph, param: &str, value: Option<&Value>) {
    let options = graph.options();
    let Some(value) = value else {
        graph.unset(options, param);
        return;
    };
    let Some(ty) = native_type_of(value) else {
        log::warn!("Cannot convert data \"{param}\" of type \"{}\".", value.type_name());
        return;
    };
    let declared = graph.options_node().param_type(param);
    if declared.is_none() {
        graph.declare(options, param, ty);
    }
    graph.set_value(options, param, value);
}

fn set_native_option(graph: &mut NodeGraph, param: &str, value: Option<&AttributeValue>) {
    let options = graph.options();
    match value {
        None => graph.unset(options, param),
        Some(AttributeValue::Data(data)) => {
            graph.set_value(options, param, data);
        }
        Some(AttributeValue::Network(_)) => {
            log::warn!("Option \"ai:{param}\" does not accept a shader network");
        }
    }
}

fn ensure_parent_directory(file: &Path) {
    let Some(directory) = file.parent().filter(|d| !d.as_os_str().is_empty()) else {
        return;
    };
    if let Err(err) = std::fs::create_dir_all(directory) {
        log::error!("Unable to create directory \"{}\" : {err}", directory.display());
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use glam::IVec2;
    use relay_core::graph::NodeLibrary;
    use relay_shading::{Shader, ShaderNetwork};

    use super::*;
    use crate::camera::RenderRegion;

    struct Fixture {
        graph: NodeGraph,
        shaders: ShaderCache,
        options: OptionState,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                graph: NodeGraph::new(Arc::new(NodeLibrary::builtin())),
                shaders: ShaderCache::new("shader", None),
                options: OptionState::new(),
            }
        }

        fn set(&mut self, name: &str, value: Option<AttributeValue>) {
            self.options
                .set(&mut self.graph, &mut self.shaders, name, value.as_ref())
                .unwrap();
        }
    }

    fn aov(name: &str) -> AttributeValue {
        let network = ShaderNetwork::single(Shader::new("aov_write_rgb", "ai:shader").with("aov_name", name)).unwrap();
        AttributeValue::Network(Arc::new(network))
    }

    #[test]
    fn test_aa_seed_fallbacks() {
        let mut f = Fixture::new();
        assert_eq!(f.options.aa_seed(), 1);
        f.set("frame", Some(Value::Int(20).into()));
        assert_eq!(f.options.aa_seed(), 20);
        f.set("ai:AA_seed", Some(Value::Int(3).into()));
        assert_eq!(f.options.aa_seed(), 3);
        f.set("ai:AA_seed", None);
        assert_eq!(f.options.aa_seed(), 20);
    }

    #[test]
    fn test_aov_shader_registry() {
        let mut f = Fixture::new();
        f.set("ai:aov_shader:test", Some(aov("a")));
        f.set("ai:aov_shader:test2", Some(aov("b")));
        assert_eq!(f.graph.options_node().get_nodes("aov_shaders").map(<[_]>::len), Some(2));

        f.set("ai:aov_shader:test", Some(aov("c")));
        assert_eq!(f.graph.options_node().get_nodes("aov_shaders").map(<[_]>::len), Some(2));

        f.set("ai:aov_shader:test", None);
        assert_eq!(f.graph.options_node().get_nodes("aov_shaders").map(<[_]>::len), Some(1));
        f.set("ai:aov_shader:test2", None);
        assert!(f.graph.options_node().get("aov_shaders").is_none());
    }

    #[test]
    fn test_declared_option() {
        let mut f = Fixture::new();
        f.set("ai:declare:myOption", Some(Value::from("hello").into()));
        assert_eq!(f.graph.options_node().get_str("myOption"), Some("hello"));
    }

    #[test]
    fn test_commit_resolves_camera() {
        let mut f = Fixture::new();
        let camera_node = f.graph.create("persp_camera", "myCamera", None).unwrap();
        let camera = Camera::new()
            .with_resolution(IVec2::new(2000, 1000))
            .with_render_region(RenderRegion::new(IVec2::ZERO, IVec2::new(1999, 749)));
        f.set("camera", Some(Value::from("myCamera").into()));
        f.options.commit(&mut f.graph, Some((camera_node, &camera)));

        let options = f.graph.options_node();
        assert_eq!(options.get_node("camera"), Some(camera_node));
        assert_eq!(options.get_int("xres"), Some(2000));
        assert_eq!(options.get_int("region_max_y"), Some(749));
        assert_eq!(options.get_int("AA_seed"), Some(1));
    }
}
