//! Shader Networks
//!
//! Two forms of the same data:
//!
//! - [`Shader`]: the authoring form. Nodes name each other by string handle.
//!   Handles are assigned with the reserved `__handle` parameter and links
//!   are written as `link:<handle>` or `link:<handle>.<output>` strings (or
//!   arrays of them), so networks can be assembled from plain key/value data.
//! - [`ShaderNetwork`]: the validated form. Links are resolved to node
//!   indices, handles are unique, and the graph is acyclic. The last node is
//!   the network output.
//!
//! Network equality and hashing are structural: handles are local names and
//! do not participate, only link topology by node position does.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use relay_core::error::{RelayError, Result};
use relay_core::hash::content_hash;
use relay_core::value::Value;
use rustc_hash::FxHashMap;

/// Reserved parameter carrying a node's handle.
pub const HANDLE_PARAMETER: &str = "__handle";

const LINK_PREFIX: &str = "link:";

/// Shading language a node is written in, taken from its type tag prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderLanguage {
    /// A node entry of the native library (`ai:surface`, `ai:shader`, ...).
    Native,
    /// An OSL shader, wrapped in an opaque `osl` node (`osl:shader`, ...).
    Osl,
}

impl ShaderLanguage {
    #[must_use]
    pub fn from_type(type_tag: &str) -> Self {
        if type_tag.starts_with("osl:") {
            Self::Osl
        } else {
            Self::Native
        }
    }
}

/// Reference to another node's output in the authoring form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LinkRef {
    pub handle: String,
    pub output: Option<String>,
}

impl LinkRef {
    #[must_use]
    pub fn new(handle: impl Into<String>, output: Option<&str>) -> Self {
        Self {
            handle: handle.into(),
            output: output.map(str::to_string),
        }
    }

    /// Parses `link:<handle>` / `link:<handle>.<output>`.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let rest = text.strip_prefix(LINK_PREFIX)?;
        if rest.is_empty() {
            return None;
        }
        Some(match rest.split_once('.') {
            Some((handle, output)) => Self::new(handle, Some(output)),
            None => Self::new(rest, None),
        })
    }
}

/// Parameter of an authored shader.
#[derive(Debug, Clone, PartialEq)]
pub enum ShaderParameter {
    Value(Value),
    Link(LinkRef),
    LinkArray(Vec<LinkRef>),
}

impl From<Value> for ShaderParameter {
    fn from(value: Value) -> Self {
        match &value {
            Value::String(s) => {
                if let Some(link) = LinkRef::parse(s) {
                    return Self::Link(link);
                }
            }
            Value::StringArray(items) if !items.is_empty() => {
                let links: Option<Vec<_>> = items.iter().map(|s| LinkRef::parse(s)).collect();
                if let Some(links) = links {
                    return Self::LinkArray(links);
                }
            }
            _ => {}
        }
        Self::Value(value)
    }
}

/// An authored shader node.
#[derive(Debug, Clone, PartialEq)]
pub struct Shader {
    pub name: String,
    pub type_tag: String,
    pub handle: Option<String>,
    pub parameters: BTreeMap<String, ShaderParameter>,
}

impl Shader {
    #[must_use]
    pub fn new(name: impl Into<String>, type_tag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_tag: type_tag.into(),
            handle: None,
            parameters: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_handle(mut self, handle: impl Into<String>) -> Self {
        self.handle = Some(handle.into());
        self
    }

    /// Sets a parameter. Honours the `__handle` key and `link:` strings.
    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.set(name, value.into());
        self
    }

    #[must_use]
    pub fn with_link(mut self, name: &str, handle: &str, output: Option<&str>) -> Self {
        self.parameters.insert(
            name.to_string(),
            ShaderParameter::Link(LinkRef::new(handle, output)),
        );
        self
    }

    #[must_use]
    pub fn with_links(mut self, name: &str, handles: &[&str]) -> Self {
        self.parameters.insert(
            name.to_string(),
            ShaderParameter::LinkArray(handles.iter().map(|h| LinkRef::new(*h, None)).collect()),
        );
        self
    }

    pub fn set(&mut self, name: &str, value: Value) {
        if name == HANDLE_PARAMETER {
            if let Value::String(handle) = value {
                self.handle = Some(handle);
            }
            return;
        }
        self.parameters.insert(name.to_string(), value.into());
    }

    #[must_use]
    pub fn language(&self) -> ShaderLanguage {
        ShaderLanguage::from_type(&self.type_tag)
    }
}

// ============================================================================
// Validated network
// ============================================================================

/// Parameter of a validated node.
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkParameter {
    Value(Value),
    Link {
        source: usize,
        output: Option<String>,
    },
    LinkArray(Vec<(usize, Option<String>)>),
}

/// A node of a validated network.
#[derive(Debug, Clone)]
pub struct NetworkNode {
    pub name: String,
    pub type_tag: String,
    pub language: ShaderLanguage,
    pub handle: String,
    pub parameters: BTreeMap<String, NetworkParameter>,
}

impl NetworkNode {
    /// Indices of every node this one links from.
    pub fn sources(&self) -> impl Iterator<Item = usize> + '_ {
        self.parameters.values().flat_map(|p| {
            let sources: Vec<usize> = match p {
                NetworkParameter::Value(_) => Vec::new(),
                NetworkParameter::Link { source, .. } => vec![*source],
                NetworkParameter::LinkArray(links) => links.iter().map(|(s, _)| *s).collect(),
            };
            sources
        })
    }

    fn structurally_eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.type_tag == other.type_tag
            && self.parameters == other.parameters
    }
}

/// A validated, acyclic shader graph. The last node is the output.
#[derive(Debug, Clone)]
pub struct ShaderNetwork {
    nodes: Vec<NetworkNode>,
    output: usize,
    hash: u64,
}

impl ShaderNetwork {
    /// Validates `shaders` into a network whose output is the last shader.
    pub fn new(shaders: Vec<Shader>) -> Result<Self> {
        if shaders.is_empty() {
            return Err(RelayError::EmptyNetwork);
        }

        // Assign handles, generating one where the author gave none.
        let mut handles: FxHashMap<String, usize> = FxHashMap::default();
        for (i, shader) in shaders.iter().enumerate() {
            if let Some(handle) = &shader.handle
                && handles.insert(handle.clone(), i).is_some()
            {
                return Err(RelayError::DuplicateHandle(handle.clone()));
            }
        }
        let mut assigned = Vec::with_capacity(shaders.len());
        for (i, shader) in shaders.iter().enumerate() {
            let handle = match &shader.handle {
                Some(h) => h.clone(),
                None => {
                    let mut candidate = format!("{}{}", shader.name, i);
                    while handles.contains_key(&candidate) {
                        candidate.push('_');
                    }
                    handles.insert(candidate.clone(), i);
                    candidate
                }
            };
            assigned.push(handle);
        }

        // Resolve links.
        let mut nodes = Vec::with_capacity(shaders.len());
        for (shader, handle) in shaders.into_iter().zip(assigned) {
            let resolve = |param: &str, link: &LinkRef| -> Result<(usize, Option<String>)> {
                handles
                    .get(&link.handle)
                    .map(|i| (*i, link.output.clone()))
                    .ok_or_else(|| RelayError::DanglingLink {
                        shader: shader.name.clone(),
                        parameter: param.to_string(),
                        handle: link.handle.clone(),
                    })
            };

            let mut parameters = BTreeMap::new();
            for (param, value) in &shader.parameters {
                let resolved = match value {
                    ShaderParameter::Value(v) => NetworkParameter::Value(v.clone()),
                    ShaderParameter::Link(link) => {
                        let (source, output) = resolve(param, link)?;
                        NetworkParameter::Link { source, output }
                    }
                    ShaderParameter::LinkArray(links) => NetworkParameter::LinkArray(
                        links
                            .iter()
                            .map(|l| resolve(param, l))
                            .collect::<Result<_>>()?,
                    ),
                };
                parameters.insert(param.clone(), resolved);
            }

            nodes.push(NetworkNode {
                language: shader.language(),
                name: shader.name,
                type_tag: shader.type_tag,
                handle,
                parameters,
            });
        }

        check_acyclic(&nodes)?;

        let output = nodes.len() - 1;
        let hash = structural_hash(&nodes, output);
        Ok(Self {
            nodes,
            output,
            hash,
        })
    }

    /// Single-node network.
    pub fn single(shader: Shader) -> Result<Self> {
        Self::new(vec![shader])
    }

    #[inline]
    #[must_use]
    pub fn nodes(&self) -> &[NetworkNode] {
        &self.nodes
    }

    #[inline]
    #[must_use]
    pub fn node(&self, index: usize) -> &NetworkNode {
        &self.nodes[index]
    }

    #[inline]
    #[must_use]
    pub fn output_index(&self) -> usize {
        self.output
    }

    #[must_use]
    pub fn output(&self) -> &NetworkNode {
        &self.nodes[self.output]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Structural content hash (handles excluded).
    #[inline]
    #[must_use]
    pub fn content_hash(&self) -> u64 {
        self.hash
    }

    /// Index of the node carrying `handle`.
    #[must_use]
    pub fn find(&self, handle: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.handle == handle)
    }
}

impl PartialEq for ShaderNetwork {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
            && self.output == other.output
            && self.nodes.len() == other.nodes.len()
            && self
                .nodes
                .iter()
                .zip(&other.nodes)
                .all(|(a, b)| a.structurally_eq(b))
    }
}

impl Hash for ShaderNetwork {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}

fn check_acyclic(nodes: &[NetworkNode]) -> Result<()> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        New,
        Active,
        Done,
    }

    let mut marks = vec![Mark::New; nodes.len()];
    for start in 0..nodes.len() {
        if marks[start] != Mark::New {
            continue;
        }
        // Iterative DFS: (node, sources not yet visited).
        let mut stack: Vec<(usize, Vec<usize>)> = vec![(start, nodes[start].sources().collect())];
        marks[start] = Mark::Active;
        while let Some((node, pending)) = stack.last_mut() {
            match pending.pop() {
                Some(next) => match marks[next] {
                    Mark::Active => {
                        return Err(RelayError::ShaderCycle(nodes[next].handle.clone()));
                    }
                    Mark::New => {
                        marks[next] = Mark::Active;
                        let sources = nodes[next].sources().collect();
                        stack.push((next, sources));
                    }
                    Mark::Done => {}
                },
                None => {
                    marks[*node] = Mark::Done;
                    stack.pop();
                }
            }
        }
    }
    Ok(())
}

fn structural_hash(nodes: &[NetworkNode], output: usize) -> u64 {
    let mut parts: Vec<u64> = Vec::with_capacity(nodes.len() + 1);
    parts.push(output as u64);
    for node in nodes {
        let mut params: Vec<u64> = Vec::with_capacity(node.parameters.len());
        for (name, param) in &node.parameters {
            let h = match param {
                NetworkParameter::Value(v) => content_hash(&(name, 0u8, v)),
                NetworkParameter::Link { source, output } => {
                    content_hash(&(name, 1u8, *source as u64, output))
                }
                NetworkParameter::LinkArray(links) => {
                    let links: Vec<(u64, &Option<String>)> =
                        links.iter().map(|(s, o)| (*s as u64, o)).collect();
                    content_hash(&(name, 2u8, links))
                }
            };
            params.push(h);
        }
        parts.push(content_hash(&(&node.name, &node.type_tag, params)));
    }
    content_hash(&parts)
}
