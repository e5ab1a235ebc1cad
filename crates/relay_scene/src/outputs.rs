//! Outputs
//!
//! An [`Output`] names an image to produce: where it goes, in which format,
//! and which render data it holds. Each output becomes a filter node and a
//! driver node, plus one line in the options `outputs` array:
//!
//! ```text
//! <aov> <TYPE> ieCoreArnold:filter:<name> ieCoreArnold:display:<name>
//! ```
//!
//! Light path expression outputs (`lpe <expr>`) additionally contribute
//! `ieCoreArnold:lpe:<name> <expr>` to `light_path_expressions`.

use std::collections::BTreeMap;

use glam::Vec2;
use relay_core::error::Result;
use relay_core::graph::{NativeValue, NodeGraph, NodeKey};
use relay_core::value::Value;

pub const FILTER_PREFIX: &str = "ieCoreArnold:filter:";
pub const DISPLAY_PREFIX: &str = "ieCoreArnold:display:";
pub const LPE_PREFIX: &str = "ieCoreArnold:lpe:";

/// Parameter prefix for image header metadata.
pub const HEADER_PREFIX: &str = "header:";

const DEFAULT_FILTER: &str = "gaussian";

/// Output parameters consumed here rather than passed to the driver.
const RESERVED_PARAMETERS: [&str; 4] = ["filter", "filterwidth", "includeAlpha", "custom_attributes"];

/// An image output.
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub file_name: String,
    /// Driver format, e.g. `exr`, `tiff`.
    pub type_name: String,
    /// `rgb`, `rgba`, `<float|int|color|vector|point> <aov>` or `lpe <expr>`.
    pub data: String,
    pub parameters: BTreeMap<String, Value>,
}

impl Output {
    #[must_use]
    pub fn new(file_name: impl Into<String>, type_name: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            type_name: type_name.into(),
            data: data.into(),
            parameters: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_parameter(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.parameters.insert(name.to_string(), value.into());
        self
    }

    fn include_alpha(&self) -> bool {
        self.parameters
            .get("includeAlpha")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// What the `data` string asks the renderer to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSpec {
    pub aov: String,
    pub native_type: &'static str,
    /// Light path expression, for `lpe` outputs.
    pub lpe: Option<String>,
}

impl DataSpec {
    /// Parses `data` for the output called `name`. `None` for unsupported
    /// data strings.
    #[must_use]
    pub fn parse(name: &str, data: &str, include_alpha: bool) -> Option<Self> {
        let data = data.trim();
        let (token, rest) = match data.split_once(char::is_whitespace) {
            Some((token, rest)) => (token, rest.trim()),
            None => (data, ""),
        };

        let mut spec = match (token, rest.is_empty()) {
            ("rgb", true) => Self::simple("RGBA", "RGB"),
            ("rgba", true) => Self::simple("RGBA", "RGBA"),
            ("float", false) => Self::simple(rest, "FLOAT"),
            ("int", false) => Self::simple(rest, "INT"),
            ("color", false) => Self::simple(rest, "RGB"),
            ("vector" | "point", false) => Self::simple(rest, "VECTOR"),
            ("lpe", false) => Self {
                aov: format!("{LPE_PREFIX}{name}"),
                native_type: "RGB",
                lpe: Some(rest.to_string()),
            },
            _ => return None,
        };
        if include_alpha && spec.native_type == "RGB" {
            spec.native_type = "RGBA";
        }
        Some(spec)
    }

    fn simple(aov: &str, native_type: &'static str) -> Self {
        Self {
            aov: aov.to_string(),
            native_type,
            lpe: None,
        }
    }
}

/// Native nodes and option lines produced for one output.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatedOutput {
    pub filter: NodeKey,
    pub driver: NodeKey,
    /// Entry of the options `outputs` array.
    pub line: String,
    /// Entry of the options `light_path_expressions` array.
    pub lpe: Option<String>,
}

/// Creates the filter and driver for `output`.
///
/// Returns `Ok(None)` (with a warning) for unsupported data strings.
pub fn translate_output(graph: &mut NodeGraph, name: &str, output: &Output) -> Result<Option<TranslatedOutput>> {
    let Some(data) = DataSpec::parse(name, &output.data, output.include_alpha()) else {
        log::warn!("Unsupported data \"{}\" for output \"{name}\"", output.data);
        return Ok(None);
    };

    let filter_name = format!("{FILTER_PREFIX}{name}");
    let driver_name = format!("{DISPLAY_PREFIX}{name}");

    let filter_type = output
        .parameters
        .get("filter")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_FILTER);
    let filter = graph.create(&format!("{filter_type}_filter"), &filter_name, None)?;
    if let Some(Value::V2f(Vec2 { x, .. })) = output.parameters.get("filterwidth") {
        graph.set(filter, "width", NativeValue::Float(*x));
    }

    let driver = match graph.create(&format!("driver_{}", output.type_name), &driver_name, None) {
        Ok(driver) => driver,
        Err(err) => {
            graph.remove(filter);
            return Err(err);
        }
    };
    graph.set(driver, "filename", NativeValue::String(output.file_name.clone()));

    for (param, value) in &output.parameters {
        if RESERVED_PARAMETERS.contains(&param.as_str()) || param.starts_with(HEADER_PREFIX) {
            continue;
        }
        if graph.get(driver).is_some_and(|n| n.param_type(param).is_some()) {
            graph.set_value(driver, param, value);
        } else {
            log::debug!("Ignoring output parameter \"{param}\" unknown to driver_{}", output.type_name);
        }
    }

    let declares_custom = graph
        .get(driver)
        .is_some_and(|n| n.param_type("custom_attributes").is_some());
    if declares_custom {
        let custom_attributes = custom_attributes(output);
        if !custom_attributes.is_empty() {
            graph.set(driver, "custom_attributes", NativeValue::StringArray(custom_attributes));
        }
    }

    let line = format!("{} {} {filter_name} {driver_name}", data.aov, data.native_type);
    let lpe = data.lpe.map(|expr| format!("{} {expr}", data.aov));
    log::debug!("Output \"{name}\": {line}");

    Ok(Some(TranslatedOutput {
        filter,
        driver,
        line,
        lpe,
    }))
}

/// Explicit `custom_attributes` followed by converted `header:*` metadata.
fn custom_attributes(output: &Output) -> Vec<String> {
    let mut attributes = output
        .parameters
        .get("custom_attributes")
        .and_then(Value::as_string_array)
        .map(<[String]>::to_vec)
        .unwrap_or_default();

    for (param, value) in &output.parameters {
        let Some(key) = param.strip_prefix(HEADER_PREFIX) else {
            continue;
        };
        match header_attribute(key, value) {
            Some(attribute) => attributes.push(attribute),
            None => log::warn!("Cannot convert data \"{key}\" of type \"{}\".", value.type_name()),
        }
    }
    attributes
}

/// Formats one header entry as a driver custom attribute.
#[must_use]
pub fn header_attribute(key: &str, value: &Value) -> Option<String> {
    let tuple = |components: &[String]| format!("string '{key}' ({})", components.join(" "));
    let text = match value {
        Value::String(s) => format!("string '{key}' {s}"),
        Value::Bool(b) => format!("int '{key}' {}", i32::from(*b)),
        Value::Int(i) => format!("int '{key}' {i}"),
        Value::Float(f) => format!("float '{key}' {f}"),
        Value::V2i(v) => tuple(&[v.x.to_string(), v.y.to_string()]),
        Value::V3i(v) => tuple(&[v.x.to_string(), v.y.to_string(), v.z.to_string()]),
        Value::V2f(v) => tuple(&[v.x.to_string(), v.y.to_string()]),
        Value::V3f(v) | Value::Color3f(v) => tuple(&[v.x.to_string(), v.y.to_string(), v.z.to_string()]),
        Value::Color4f(v) => tuple(&[v.x.to_string(), v.y.to_string(), v.z.to_string(), v.w.to_string()]),
        _ => return None,
    };
    Some(text)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use glam::{IVec2, Vec3, Vec4};
    use relay_core::graph::NodeLibrary;

    use super::*;

    #[test]
    fn test_data_strings() {
        let spec = DataSpec::parse("beauty", "rgba", false).unwrap();
        assert_eq!((spec.aov.as_str(), spec.native_type), ("RGBA", "RGBA"));

        let spec = DataSpec::parse("a", "color A", false).unwrap();
        assert_eq!((spec.aov.as_str(), spec.native_type), ("A", "RGB"));

        let spec = DataSpec::parse("b", "color B", true).unwrap();
        assert_eq!(spec.native_type, "RGBA");

        let spec = DataSpec::parse("test", "lpe C.*D.*", false).unwrap();
        assert_eq!(spec.aov, "ieCoreArnold:lpe:test");
        assert_eq!(spec.lpe.as_deref(), Some("C.*D.*"));

        assert!(DataSpec::parse("x", "bogus", false).is_none());
    }

    #[test]
    fn test_header_formatting() {
        assert_eq!(header_attribute("foo", &Value::from("bar")).unwrap(), "string 'foo' bar");
        assert_eq!(header_attribute("bar", &Value::Bool(true)).unwrap(), "int 'bar' 1");
        assert_eq!(header_attribute("floatbar", &Value::Float(1.618_034)).unwrap(), "float 'floatbar' 1.618034");
        assert_eq!(header_attribute("vec2i", &Value::V2i(IVec2::splat(100))).unwrap(), "string 'vec2i' (100 100)");
        assert_eq!(header_attribute("color3f", &Value::Color3f(Vec3::splat(100.0))).unwrap(), "string 'color3f' (100 100 100)");
        assert_eq!(
            header_attribute("color4f", &Value::Color4f(Vec4::splat(100.0))).unwrap(),
            "string 'color4f' (100 100 100 100)"
        );
        assert!(header_attribute("bar", &Value::StringArray(vec!["one".into()])).is_none());
    }

    #[test]
    fn test_translate_creates_filter_and_driver() {
        let mut graph = NodeGraph::new(Arc::new(NodeLibrary::builtin()));
        let output = Output::new("beauty.exr", "exr", "rgba")
            .with_parameter("filterwidth", Vec2::splat(3.5))
            .with_parameter("custom_attributes", vec!["string 'original data' test".to_string()])
            .with_parameter("header:bar", true);

        let translated = translate_output(&mut graph, "exrTest", &output).unwrap().unwrap();
        assert_eq!(translated.line, "RGBA RGBA ieCoreArnold:filter:exrTest ieCoreArnold:display:exrTest");

        let filter = graph.get(translated.filter).unwrap();
        assert_eq!(filter.entry_name(), "gaussian_filter");
        assert_eq!(filter.get_float("width"), Some(3.5));

        let driver = graph.get(translated.driver).unwrap();
        assert_eq!(driver.get_str("filename"), Some("beauty.exr"));
        assert_eq!(
            driver.get_strings("custom_attributes"),
            Some(&["string 'original data' test".to_string(), "int 'bar' 1".to_string()][..])
        );
    }

    #[test]
    fn test_tiff_has_no_custom_attributes() {
        let mut graph = NodeGraph::new(Arc::new(NodeLibrary::builtin()));
        let output = Output::new("beauty.tiff", "tiff", "rgba").with_parameter("header:foo", "bar");
        let translated = translate_output(&mut graph, "tiffTest", &output).unwrap().unwrap();
        assert!(graph.get(translated.driver).unwrap().get("custom_attributes").is_none());
    }
}
