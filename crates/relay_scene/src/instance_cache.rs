//! Geometry/Instance Cache
//!
//! Places objects in the native graph, sharing shapes between objects whose
//! processed geometry is identical.
//!
//! # Overview
//!
//! Every instanceable object becomes a `ginstance` named after the object,
//! pointing at a shared shape named `instance:<geometry-key>`. The shared
//! shape itself is invisible (`visibility = 0`) so it is only rendered
//! through its instances. Shapes whose tessellation depends on placement
//! (adaptive subdivision in raster space) are emitted directly under the
//! object's name and never shared.
//!
//! Geometry keys are content hashes. Each key holds a bucket of shapes, and
//! a hit is only reused when the stored source is equal to the request, so
//! colliding keys never alias different geometry.
//!
//! Shared shapes are reference counted; the last [`InstanceCache::release`]
//! deletes the shape together with its displacement reference.

use glam::Vec2;
use relay_core::error::Result;
use relay_core::graph::{NativeValue, NodeGraph, NodeKey};
use relay_shading::{ShaderCache, ShaderHandle};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::geometry_rules::{EffectiveGeometry, GeometryRules};
use crate::primitives::Object;
use crate::shape::{ShapeRequest, build_shape};

/// Name prefix of shared shapes.
pub const INSTANCE_PREFIX: &str = "instance:";

/// How an object's geometry is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeRef {
    /// Through a `ginstance` of a shared shape.
    Shared {
        key: u64,
        /// The shared shape node. Also disambiguates key collisions.
        shape: NodeKey,
    },
    /// Directly, as a shape owned by the object.
    Unique { displacement: Option<ShaderHandle> },
}

/// Result of placing one object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// The node named after the object: a `ginstance` or a unique shape.
    pub node: NodeKey,
    pub shape: ShapeRef,
    /// Effective geometry signature at construction time.
    pub signature: u64,
}

impl Placement {
    #[must_use]
    pub fn is_instanced(&self) -> bool {
        matches!(self.shape, ShapeRef::Shared { .. })
    }
}

/// What a shared shape was built from.
struct ShapeSource {
    samples: Vec<Object>,
    times: Vec<f32>,
    effective: EffectiveGeometry,
    shutter: Option<Vec2>,
}

impl ShapeSource {
    fn new(request: &ShapeRequest<'_>) -> Self {
        Self {
            samples: request.samples.to_vec(),
            times: request.times.to_vec(),
            effective: request.effective.clone(),
            shutter: request.shutter,
        }
    }

    fn matches(&self, request: &ShapeRequest<'_>) -> bool {
        self.samples.as_slice() == request.samples
            && self.times.as_slice() == request.times
            && self.effective == *request.effective
            && self.shutter == request.shutter
    }
}

struct SharedShape {
    node: NodeKey,
    refs: usize,
    displacement: Option<ShaderHandle>,
    source: ShapeSource,
}

/// Content-keyed, reference-counted store of shared shapes for one scope.
pub struct InstanceCache {
    parent: Option<NodeKey>,
    shapes: FxHashMap<u64, SmallVec<[SharedShape; 1]>>,
}

impl InstanceCache {
    /// A cache whose nodes live under `parent` (the root scope for `None`).
    #[must_use]
    pub fn new(parent: Option<NodeKey>) -> Self {
        Self {
            parent,
            shapes: FxHashMap::default(),
        }
    }

    /// Places `name` with the geometry of `request`.
    pub fn place(
        &mut self,
        graph: &mut NodeGraph,
        shaders: &mut ShaderCache,
        rules: &GeometryRules,
        name: &str,
        request: &ShapeRequest<'_>,
    ) -> Result<Placement> {
        let signature = request.effective.signature();

        if !rules.is_instanceable(request.effective) {
            let displacement = acquire_displacement(graph, shaders, request)?;
            let node = match build_shape(graph, name, self.parent, request, displacement.map(|h| h.node)) {
                Ok(node) => node,
                Err(err) => {
                    if let Some(handle) = displacement {
                        shaders.release(handle);
                    }
                    return Err(err);
                }
            };
            log::debug!("\"{name}\" is placement dependent, not instancing");
            return Ok(Placement {
                node,
                shape: ShapeRef::Unique { displacement },
                signature,
            });
        }

        let key = request.geometry_key();
        let shape = self.acquire_shared(graph, shaders, key, request)?;

        let instance = match graph.create("ginstance", name, self.parent) {
            Ok(instance) => instance,
            Err(err) => {
                self.unref(graph, shaders, key, shape);
                return Err(err);
            }
        };
        graph.set(instance, "node", NativeValue::Node(shape));
        graph.set(instance, "inherit_xform", NativeValue::Bool(false));

        Ok(Placement {
            node: instance,
            shape: ShapeRef::Shared { key, shape },
            signature,
        })
    }

    /// Deletes the object's node and drops its reference on shared state.
    pub fn release(&mut self, graph: &mut NodeGraph, shaders: &mut ShaderCache, placement: &Placement) {
        graph.remove(placement.node);
        match placement.shape {
            ShapeRef::Shared { key, shape } => self.unref(graph, shaders, key, shape),
            ShapeRef::Unique { displacement } => {
                if let Some(handle) = displacement {
                    shaders.release(handle);
                }
            }
        }
    }

    /// Number of instances referencing the shared shape of `placement`.
    #[must_use]
    pub fn ref_count(&self, placement: &Placement) -> usize {
        let ShapeRef::Shared { key, shape } = placement.shape else {
            return 0;
        };
        self.shapes
            .get(&key)
            .and_then(|bucket| bucket.iter().find(|s| s.node == shape))
            .map_or(0, |s| s.refs)
    }

    /// Number of live shared shapes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shapes.values().map(SmallVec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Shape for `request` in the bucket of `key`, built on first use.
    fn acquire_shared(
        &mut self,
        graph: &mut NodeGraph,
        shaders: &mut ShaderCache,
        key: u64,
        request: &ShapeRequest<'_>,
    ) -> Result<NodeKey> {
        let bucket = self.shapes.entry(key).or_default();
        if let Some(shared) = bucket.iter_mut().find(|s| s.source.matches(request)) {
            shared.refs += 1;
            return Ok(shared.node);
        }

        let shape_name = if bucket.is_empty() {
            format!("{INSTANCE_PREFIX}{key:016x}")
        } else {
            log::debug!("Geometry key {key:016x} collides, adding a distinct shape");
            format!("{INSTANCE_PREFIX}{key:016x}-{}", bucket.len())
        };
        let built = acquire_displacement(graph, shaders, request).and_then(|displacement| {
            match build_shape(graph, &shape_name, self.parent, request, displacement.map(|h| h.node)) {
                Ok(node) => Ok((node, displacement)),
                Err(err) => {
                    if let Some(handle) = displacement {
                        shaders.release(handle);
                    }
                    Err(err)
                }
            }
        });
        let (node, displacement) = match built {
            Ok(built) => built,
            Err(err) => {
                if bucket.is_empty() {
                    self.shapes.remove(&key);
                }
                return Err(err);
            }
        };

        graph.set(node, "visibility", NativeValue::Byte(0));
        bucket.push(SharedShape {
            node,
            refs: 1,
            displacement,
            source: ShapeSource::new(request),
        });
        Ok(node)
    }

    fn unref(&mut self, graph: &mut NodeGraph, shaders: &mut ShaderCache, key: u64, shape: NodeKey) {
        let Some(bucket) = self.shapes.get_mut(&key) else {
            return;
        };
        let Some(index) = bucket.iter().position(|s| s.node == shape) else {
            return;
        };
        let shared = &mut bucket[index];
        shared.refs = shared.refs.saturating_sub(1);
        if shared.refs > 0 {
            return;
        }

        let shared = bucket.remove(index);
        if bucket.is_empty() {
            self.shapes.remove(&key);
        }
        if let Some(name) = graph.name_of(shared.node) {
            log::debug!("Removed shared shape {name}");
        }
        graph.remove(shared.node);
        if let Some(handle) = shared.displacement {
            shaders.release(handle);
        }
    }
}

fn acquire_displacement(
    graph: &mut NodeGraph,
    shaders: &mut ShaderCache,
    request: &ShapeRequest<'_>,
) -> Result<Option<ShaderHandle>> {
    request
        .effective
        .displacement
        .as_ref()
        .map(|network| shaders.acquire(graph, network))
        .transpose()
}
