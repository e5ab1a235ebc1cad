//! Attribute Sets
//!
//! An [`AttributeSet`] is the parsed, immutable form of a [`CompoundObject`]:
//! the loosely typed `key → value` mapping a scene client attaches to
//! objects. Instance-level attributes (visibility, sidedness, shading flags,
//! trace sets, user data, the surface shader) are parsed eagerly. Geometry
//! attributes stay available by key so [`crate::geometry_rules`] can decide
//! which of them matter for a given shape.
//!
//! # Sharing
//!
//! [`AttributeFactory`] hands out `Arc<AttributeSet>`s keyed by content
//! hash. Equal compounds resolve to the same `Arc` while any holder keeps it
//! alive, so thousands of objects with the same attributes share one parse.
//!
//! # Recognised keys
//!
//! | Key                                 | Default                 |
//! |-------------------------------------|-------------------------|
//! | `doubleSided`                       | `true`                  |
//! | `ai:visibility:<ray>`               | `true`                  |
//! | `ai:receive_shadows`                | `true`                  |
//! | `ai:self_shadows`                   | `true`                  |
//! | `ai:opaque`                         | `true`                  |
//! | `ai:matte`                          | `false`                 |
//! | `ai:transform_type`                 | `rotate_about_center`   |
//! | `ai:sss_setname`                    | unset                   |
//! | `sets`                              | `["__none__"]`          |
//! | `user:*`                            | declared as constants   |
//! | `ai:surface`/`osl:surface`/`osl:shader` | surface network     |
//! | `ai:light`                          | light network           |
//! | `ai:disp_map`                       | displacement network    |

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

use glam::{Mat4, Vec2, Vec3};
use relay_core::hash::ContentHasher;
use relay_core::value::Value;
use relay_core::visibility::RayType;
use relay_shading::ShaderNetwork;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Attribute keys with special meaning.
pub mod keys {
    pub const DOUBLE_SIDED: &str = "doubleSided";
    pub const VISIBILITY_PREFIX: &str = "ai:visibility:";
    pub const RECEIVE_SHADOWS: &str = "ai:receive_shadows";
    pub const SELF_SHADOWS: &str = "ai:self_shadows";
    pub const OPAQUE: &str = "ai:opaque";
    pub const MATTE: &str = "ai:matte";
    pub const TRANSFORM_TYPE: &str = "ai:transform_type";
    pub const SSS_SETNAME: &str = "ai:sss_setname";
    pub const SETS: &str = "sets";
    pub const USER_PREFIX: &str = "user:";
    /// Surface keys in order of precedence.
    pub const SURFACE: [&str; 3] = ["ai:surface", "osl:surface", "osl:shader"];
    pub const LIGHT: &str = "ai:light";
    pub const DISPLACEMENT: &str = "ai:disp_map";
}

/// Trace set used when an object belongs to no sets.
pub const NO_TRACE_SETS: &str = "__none__";

/// A single attribute: plain data or a shading network.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Data(Value),
    Network(Arc<ShaderNetwork>),
}

impl AttributeValue {
    #[must_use]
    pub fn as_data(&self) -> Option<&Value> {
        match self {
            Self::Data(v) => Some(v),
            Self::Network(_) => None,
        }
    }

    #[must_use]
    pub fn as_network(&self) -> Option<&Arc<ShaderNetwork>> {
        match self {
            Self::Network(n) => Some(n),
            Self::Data(_) => None,
        }
    }
}

impl Hash for AttributeValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Self::Data(v) => {
                0u8.hash(state);
                v.hash(state);
            }
            Self::Network(n) => {
                1u8.hash(state);
                n.content_hash().hash(state);
            }
        }
    }
}

macro_rules! impl_data_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for AttributeValue {
                fn from(v: $ty) -> Self {
                    Self::Data(v.into())
                }
            }
        )*
    };
}

impl_data_from!(Value, bool, i32, f32, &str, String, Vec2, Vec3, Mat4, Vec<String>);

impl From<Arc<ShaderNetwork>> for AttributeValue {
    fn from(v: Arc<ShaderNetwork>) -> Self {
        Self::Network(v)
    }
}

impl From<ShaderNetwork> for AttributeValue {
    fn from(v: ShaderNetwork) -> Self {
        Self::Network(Arc::new(v))
    }
}

/// Loosely typed attribute mapping, as authored by the scene client.
pub type CompoundObject = BTreeMap<String, AttributeValue>;

/// Builds a [`CompoundObject`] from `(key, value)` pairs.
#[must_use]
pub fn compound<I, K, V>(items: I) -> CompoundObject
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<AttributeValue>,
{
    items
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

// ============================================================================
// AttributeSet
// ============================================================================

/// Immutable, parsed attribute bundle shared by reference.
#[derive(Debug)]
pub struct AttributeSet {
    source: CompoundObject,
    hash: u64,

    visibility: RayType,
    sidedness: RayType,
    receive_shadows: bool,
    self_shadows: bool,
    opaque: bool,
    matte: bool,
    transform_type: String,
    sss_setname: Option<String>,
    trace_sets: Vec<String>,
    user: BTreeMap<String, Value>,

    surface: Option<Arc<ShaderNetwork>>,
    light: Option<Arc<ShaderNetwork>>,
    displacement: Option<Arc<ShaderNetwork>>,
}

impl AttributeSet {
    /// Parses `source`. Values of the wrong type warn and fall back to the
    /// default.
    #[must_use]
    pub fn new(source: CompoundObject) -> Self {
        let hash = compound_hash(&source);

        let mut visibility = RayType::all();
        for (suffix, ray) in RayType::ATTRIBUTE_NAMES {
            let key = format!("{}{suffix}", keys::VISIBILITY_PREFIX);
            visibility.set(ray, read_bool(&source, &key, true));
        }
        let sidedness = if read_bool(&source, keys::DOUBLE_SIDED, true) {
            RayType::all()
        } else {
            RayType::empty()
        };

        let trace_sets = match source.get(keys::SETS) {
            Some(AttributeValue::Data(Value::StringArray(sets))) if !sets.is_empty() => sets.clone(),
            Some(AttributeValue::Data(Value::String(set))) if !set.is_empty() => vec![set.clone()],
            _ => vec![NO_TRACE_SETS.to_string()],
        };

        let user = source
            .iter()
            .filter(|(k, _)| k.starts_with(keys::USER_PREFIX))
            .filter_map(|(k, v)| v.as_data().map(|v| (k.clone(), v.clone())))
            .collect();

        let surface = keys::SURFACE
            .iter()
            .find_map(|key| source.get(*key).and_then(AttributeValue::as_network))
            .cloned();
        let light = read_network(&source, keys::LIGHT);
        let displacement = read_network(&source, keys::DISPLACEMENT);

        Self {
            visibility,
            sidedness,
            receive_shadows: read_bool(&source, keys::RECEIVE_SHADOWS, true),
            self_shadows: read_bool(&source, keys::SELF_SHADOWS, true),
            opaque: read_bool(&source, keys::OPAQUE, true),
            matte: read_bool(&source, keys::MATTE, false),
            transform_type: read_string(&source, keys::TRANSFORM_TYPE)
                .unwrap_or_else(|| "rotate_about_center".to_string()),
            sss_setname: read_string(&source, keys::SSS_SETNAME),
            trace_sets,
            user,
            surface,
            light,
            displacement,
            hash,
            source,
        }
    }

    /// Content hash of the source compound.
    #[must_use]
    pub fn hash(&self) -> u64 {
        self.hash
    }

    #[must_use]
    pub fn source(&self) -> &CompoundObject {
        &self.source
    }

    /// Raw data attribute by key.
    #[must_use]
    pub fn data(&self, key: &str) -> Option<&Value> {
        self.source.get(key).and_then(AttributeValue::as_data)
    }

    #[must_use]
    pub fn visibility(&self) -> RayType {
        self.visibility
    }

    #[must_use]
    pub fn sidedness(&self) -> RayType {
        self.sidedness
    }

    #[must_use]
    pub fn receive_shadows(&self) -> bool {
        self.receive_shadows
    }

    #[must_use]
    pub fn self_shadows(&self) -> bool {
        self.self_shadows
    }

    #[must_use]
    pub fn opaque(&self) -> bool {
        self.opaque
    }

    #[must_use]
    pub fn matte(&self) -> bool {
        self.matte
    }

    #[must_use]
    pub fn transform_type(&self) -> &str {
        &self.transform_type
    }

    #[must_use]
    pub fn sss_setname(&self) -> Option<&str> {
        self.sss_setname.as_deref()
    }

    #[must_use]
    pub fn trace_sets(&self) -> &[String] {
        &self.trace_sets
    }

    /// `user:*` attributes, keyed by full name.
    #[must_use]
    pub fn user(&self) -> &BTreeMap<String, Value> {
        &self.user
    }

    #[must_use]
    pub fn surface(&self) -> Option<&Arc<ShaderNetwork>> {
        self.surface.as_ref()
    }

    #[must_use]
    pub fn light(&self) -> Option<&Arc<ShaderNetwork>> {
        self.light.as_ref()
    }

    #[must_use]
    pub fn displacement(&self) -> Option<&Arc<ShaderNetwork>> {
        self.displacement.as_ref()
    }
}

impl Default for AttributeSet {
    fn default() -> Self {
        Self::new(CompoundObject::new())
    }
}

fn compound_hash(source: &CompoundObject) -> u64 {
    let mut hasher = ContentHasher::new();
    for (key, value) in source {
        hasher.add(key).add(value);
    }
    hasher.finish()
}

fn warn_type(key: &str, expected: &str, value: &AttributeValue) {
    let actual = match value {
        AttributeValue::Data(v) => v.type_name(),
        AttributeValue::Network(_) => "ShaderNetwork",
    };
    log::warn!("Attribute \"{key}\" expected {expected} but got \"{actual}\"");
}

fn read_bool(source: &CompoundObject, key: &str, default: bool) -> bool {
    let Some(value) = source.get(key) else {
        return default;
    };
    match value.as_data().and_then(Value::as_bool) {
        Some(b) => b,
        None => {
            warn_type(key, "Bool", value);
            default
        }
    }
}

fn read_string(source: &CompoundObject, key: &str) -> Option<String> {
    let value = source.get(key)?;
    match value.as_data().and_then(Value::as_str) {
        Some(s) => Some(s.to_string()),
        None => {
            warn_type(key, "String", value);
            None
        }
    }
}

fn read_network(source: &CompoundObject, key: &str) -> Option<Arc<ShaderNetwork>> {
    let value = source.get(key)?;
    match value.as_network() {
        Some(n) => Some(Arc::clone(n)),
        None => {
            warn_type(key, "ShaderNetwork", value);
            None
        }
    }
}

// ============================================================================
// AttributeFactory
// ============================================================================

/// Content-keyed cache of parsed attribute sets.
///
/// Holds weak references only: a set lives exactly as long as the objects
/// (or clients) holding it.
#[derive(Default)]
pub struct AttributeFactory {
    cache: FxHashMap<u64, SmallVec<[Weak<AttributeSet>; 1]>>,
}

impl AttributeFactory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the shared set for `source`, parsing it on first use.
    pub fn get(&mut self, source: &CompoundObject) -> Arc<AttributeSet> {
        let hash = compound_hash(source);
        let bucket = self.cache.entry(hash).or_default();
        bucket.retain(|weak| weak.strong_count() > 0);

        if let Some(existing) = bucket
            .iter()
            .filter_map(Weak::upgrade)
            .find(|set| set.source == *source)
        {
            return existing;
        }

        let set = Arc::new(AttributeSet::new(source.clone()));
        bucket.push(Arc::downgrade(&set));
        set
    }

    /// Drops bookkeeping for sets nobody holds any more.
    pub fn purge(&mut self) {
        self.cache.retain(|_, bucket| {
            bucket.retain(|weak| weak.strong_count() > 0);
            !bucket.is_empty()
        });
    }

    /// Number of live cached sets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache
            .values()
            .flat_map(|bucket| bucket.iter())
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
