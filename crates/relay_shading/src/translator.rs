//! Shader Network Translator
//!
//! Flattens a [`ShaderNetwork`] into native nodes of a [`NodeGraph`].
//!
//! # Overview
//!
//! Translation is a depth-first walk from the output node towards its
//! inputs. Every `(node, requested output)` pair is translated at most once
//! per call, so a source feeding several consumers yields one native node.
//!
//! How a link is wired is decided by the *destination* parameter's declared
//! native type:
//!
//! | Destination type | Result |
//! |------------------|--------|
//! | `Node`           | pointer parameter set to the source node |
//! | `NodeArray`      | array of pointers (from a link array) |
//! | anything else    | shading connection, optionally on a component |
//!
//! OSL nodes become `osl` wrappers (`shadername` + `param_*` parameters).
//! A specific output of an OSL node is exposed through its own wrapper with
//! `output` set, so distinct outputs never share a wrapper.

use relay_core::error::Result;
use relay_core::graph::{NativeValue, NodeGraph, NodeKey, ParamType};
use relay_core::value::Value;
use rustc_hash::FxHashMap;

use crate::network::{NetworkParameter, ShaderLanguage, ShaderNetwork};

/// Native entry used to wrap OSL shaders.
pub const OSL_ENTRY: &str = "osl";

/// Prefix of OSL shader parameters on the wrapper node.
pub const OSL_PARAM_PREFIX: &str = "param_";

/// How translated nodes are named.
#[derive(Debug, Clone)]
pub struct NodeNaming {
    /// Every node is named `<prefix>:<handle>`.
    pub prefix: String,
    /// Overrides the name of the output node (lights use `light:<name>`).
    pub output_name: Option<String>,
}

impl NodeNaming {
    #[must_use]
    pub fn prefixed(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            output_name: None,
        }
    }

    #[must_use]
    pub fn with_output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = Some(name.into());
        self
    }
}

/// Native nodes created for one network.
#[derive(Debug, Clone)]
pub struct TranslatedNetwork {
    /// Native counterpart of the network output.
    pub output: NodeKey,
    /// Every node created, output last.
    pub nodes: Vec<NodeKey>,
}

/// Translates `network` into `graph`, scoping created nodes under `parent`.
///
/// Nodes already created by a failed call are removed again, so a malformed
/// network leaves the graph untouched.
pub fn translate(
    graph: &mut NodeGraph,
    network: &ShaderNetwork,
    naming: &NodeNaming,
    parent: Option<NodeKey>,
) -> Result<TranslatedNetwork> {
    let mut translator = Translator {
        graph,
        network,
        naming,
        parent,
        memo: FxHashMap::default(),
        created: Vec::new(),
    };
    match translator.visit(network.output_index(), None) {
        Ok(output) => Ok(TranslatedNetwork {
            output,
            nodes: translator.created,
        }),
        Err(err) => {
            for key in translator.created {
                translator.graph.remove(key);
            }
            Err(err)
        }
    }
}

struct Translator<'a> {
    graph: &'a mut NodeGraph,
    network: &'a ShaderNetwork,
    naming: &'a NodeNaming,
    parent: Option<NodeKey>,
    memo: FxHashMap<(usize, Option<String>), NodeKey>,
    created: Vec<NodeKey>,
}

impl Translator<'_> {
    fn node_name(&self, index: usize, output: Option<&str>) -> String {
        let node = self.network.node(index);
        if index == self.network.output_index()
            && output.is_none()
            && let Some(name) = &self.naming.output_name
        {
            return name.clone();
        }
        match output {
            Some(o) => format!("{}:{}.{o}", self.naming.prefix, node.handle),
            None => format!("{}:{}", self.naming.prefix, node.handle),
        }
    }

    /// Translates node `index`. `output` is only meaningful for OSL nodes,
    /// where it selects the wrapper for one specific output.
    fn visit(&mut self, index: usize, output: Option<&str>) -> Result<NodeKey> {
        let network = self.network;
        let node = network.node(index);
        let output = match node.language {
            ShaderLanguage::Osl => output.map(str::to_string),
            ShaderLanguage::Native => None,
        };
        if let Some(key) = self.memo.get(&(index, output.clone())) {
            return Ok(*key);
        }

        let name = self.node_name(index, output.as_deref());
        let key = match node.language {
            ShaderLanguage::Native => self.graph.create(&node.name, &name, self.parent)?,
            ShaderLanguage::Osl => {
                let key = self.graph.create(OSL_ENTRY, &name, self.parent)?;
                self.graph
                    .set(key, "shadername", NativeValue::String(node.name.clone()));
                if let Some(o) = &output {
                    self.graph.set(key, "output", NativeValue::String(o.clone()));
                }
                key
            }
        };
        // Registered before the parameters so a failure below cleans it up.
        self.created.push(key);
        self.memo.insert((index, output), key);

        for (param, value) in &node.parameters {
            match node.language {
                ShaderLanguage::Native => self.native_parameter(key, param, value)?,
                ShaderLanguage::Osl => self.osl_parameter(key, param, value)?,
            }
        }

        // Output last, matching dependency order.
        if let Some(pos) = self.created.iter().position(|k| *k == key) {
            let k = self.created.remove(pos);
            self.created.push(k);
        }
        Ok(key)
    }

    /// Resolves a link source to `(native node, component for the link)`.
    fn source(&mut self, source: usize, output: Option<&str>) -> Result<(NodeKey, Option<String>)> {
        match self.network.node(source).language {
            // The wrapper already selects the output.
            ShaderLanguage::Osl => Ok((self.visit(source, output)?, None)),
            ShaderLanguage::Native => Ok((self.visit(source, None)?, output.map(str::to_string))),
        }
    }

    fn native_parameter(&mut self, key: NodeKey, param: &str, value: &NetworkParameter) -> Result<()> {
        let declared = self.graph.get(key).and_then(|n| n.param_type(param));
        match value {
            NetworkParameter::Value(v) => {
                self.graph.set_value(key, param, v);
            }
            NetworkParameter::Link { source, output } => match declared {
                Some(ParamType::Node) => {
                    let (src, _) = self.source(*source, output.as_deref())?;
                    self.graph.set(key, param, NativeValue::Node(src));
                }
                Some(ParamType::NodeArray) => {
                    let (src, _) = self.source(*source, output.as_deref())?;
                    self.graph.set(key, param, NativeValue::NodeArray(vec![src]));
                }
                _ => {
                    let (src, component) = self.source(*source, output.as_deref())?;
                    self.graph.link(key, param, src, component.as_deref());
                }
            },
            NetworkParameter::LinkArray(links) => {
                if declared != Some(ParamType::NodeArray) {
                    log::warn!(
                        "Parameter \"{param}\" of \"{}\" does not accept an array of links",
                        self.graph.name_of(key).unwrap_or_default()
                    );
                    return Ok(());
                }
                let mut targets = Vec::with_capacity(links.len());
                for (source, output) in links {
                    targets.push(self.source(*source, output.as_deref())?.0);
                }
                self.graph.set(key, param, NativeValue::NodeArray(targets));
            }
        }
        Ok(())
    }

    fn osl_parameter(&mut self, key: NodeKey, param: &str, value: &NetworkParameter) -> Result<()> {
        let native = format!("{OSL_PARAM_PREFIX}{param}");
        match value {
            NetworkParameter::Value(Value::FloatSpline(spline)) => {
                self.set_spline_header(key, &native, spline.basis.as_str(), spline.positions());
                self.graph.set(
                    key,
                    &format!("{native}Values"),
                    NativeValue::FloatArray(spline.values().copied().collect()),
                );
            }
            NetworkParameter::Value(Value::ColorSpline(spline)) => {
                self.set_spline_header(key, &native, spline.basis.as_str(), spline.positions());
                self.graph.set(
                    key,
                    &format!("{native}Values"),
                    NativeValue::RgbArray(spline.values().copied().collect()),
                );
            }
            NetworkParameter::Value(v) => {
                self.graph.set_value(key, &native, v);
            }
            NetworkParameter::Link { source, output } => {
                let (src, component) = self.source(*source, output.as_deref())?;
                self.graph.link(key, &native, src, component.as_deref());
            }
            NetworkParameter::LinkArray(_) => {
                log::warn!("OSL parameter \"{param}\" cannot take an array of links");
            }
        }
        Ok(())
    }

    fn set_spline_header(
        &mut self,
        key: NodeKey,
        native: &str,
        basis: &str,
        positions: impl Iterator<Item = f32>,
    ) {
        self.graph.set(
            key,
            &format!("{native}Basis"),
            NativeValue::String(basis.to_string()),
        );
        self.graph.set(
            key,
            &format!("{native}Positions"),
            NativeValue::FloatArray(positions.collect()),
        );
    }
}
