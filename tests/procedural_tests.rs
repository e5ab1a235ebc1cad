//! Procedural Tests
//!
//! Tests for:
//! - Expansion at commit into nodes scoped under the procedural
//! - Independent instancing and shader sharing per procedural
//! - Nested procedurals and release

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use relay::prelude::*;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Emits `count` identical planes.
struct Planes {
    count: usize,
    expansions: AtomicUsize,
}

impl Planes {
    fn new(count: usize) -> Arc<Self> {
        Arc::new(Self {
            count,
            expansions: AtomicUsize::new(0),
        })
    }
}

impl Procedural for Planes {
    fn render(&self, renderer: &mut dyn Renderer) -> relay::Result<()> {
        self.expansions.fetch_add(1, Ordering::Relaxed);
        let attributes = renderer.attributes(&CompoundObject::new());
        for i in 0..self.count {
            let plane = MeshPrimitive::create_plane(Vec2::splat(-1.0), Vec2::ONE);
            let handle = renderer.object(&format!("plane{i}"), plane.into(), &attributes)?;
            renderer.transform(handle, Mat4::from_translation(Vec3::X * i as f32))?;
        }
        Ok(())
    }
}

/// Emits one `Planes` procedural.
struct Nested(Arc<Planes>);

impl Procedural for Nested {
    fn render(&self, renderer: &mut dyn Renderer) -> relay::Result<()> {
        let attributes = renderer.attributes(&CompoundObject::new());
        let inner: Arc<dyn Procedural> = self.0.clone();
        renderer.object("inner", Object::Procedural(inner), &attributes)?;
        Ok(())
    }
}

// ============================================================================
// Expansion
// ============================================================================

#[test]
fn procedurals_expand_at_commit() -> Result<()> {
    init();
    let mut session = Session::create("Arnold", RenderType::Batch, None)?;
    let planes = Planes::new(3);
    let attributes = session.attributes(&CompoundObject::new());
    let procedural: Arc<dyn Procedural> = planes.clone();
    session.object("procedural", Object::Procedural(procedural), &attributes)?;

    assert_eq!(session.graph().count_entry("ginstance"), 0);
    session.render()?;
    session.render()?;
    assert_eq!(planes.expansions.load(Ordering::Relaxed), 1);

    let graph = session.graph();
    let node = graph.lookup("procedural").expect("procedural node");
    assert_eq!(graph.get(node).map(|n| n.entry_name()), Some("procedural"));
    assert_eq!(graph.count_entry("ginstance"), 3);
    assert_eq!(graph.count_entry("polymesh"), 1);

    let plane = graph.lookup_in("plane1", Some(node)).expect("child of the procedural");
    assert_eq!(graph.get(plane).and_then(|n| n.parent()), Some(node));
    assert!(graph.lookup("plane1").is_none());
    Ok(())
}

#[test]
fn procedurals_share_nothing_with_each_other() -> Result<()> {
    init();
    let mut session = Session::create("Arnold", RenderType::Batch, None)?;
    let attributes = session.attributes(&CompoundObject::new());
    for name in ["a", "b"] {
        let procedural: Arc<dyn Procedural> = Planes::new(2);
        session.object(name, Object::Procedural(procedural), &attributes)?;
    }
    session.render()?;

    let graph = session.graph();
    assert_eq!(graph.count_entry("polymesh"), 2);
    assert_eq!(graph.count_entry("ginstance"), 4);
    Ok(())
}

#[test]
fn nested_procedurals_expand() -> Result<()> {
    init();
    let mut session = Session::create("Arnold", RenderType::Batch, None)?;
    let planes = Planes::new(2);
    let attributes = session.attributes(&CompoundObject::new());
    let outer: Arc<dyn Procedural> = Arc::new(Nested(planes.clone()));
    session.object("outer", Object::Procedural(outer), &attributes)?;
    session.render()?;

    let graph = session.graph();
    let outer = graph.lookup("outer").expect("outer node");
    let inner = graph.lookup_in("inner", Some(outer)).expect("inner node");
    assert!(graph.lookup_in("plane0", Some(inner)).is_some());
    assert_eq!(planes.expansions.load(Ordering::Relaxed), 1);
    Ok(())
}

// ============================================================================
// Release
// ============================================================================

#[test]
fn released_procedurals_remove_their_children() -> Result<()> {
    init();
    let mut session = Session::create("Arnold", RenderType::Interactive, None)?;
    let attributes = session.attributes(&CompoundObject::new());
    let procedural: Arc<dyn Procedural> = Planes::new(2);
    let handle = session.object("procedural", Object::Procedural(procedural), &attributes)?;
    session.render()?;
    assert_eq!(session.graph().count_entry("ginstance"), 2);

    session.release(handle);
    session.render()?;
    let graph = session.graph();
    assert!(graph.lookup("procedural").is_none());
    assert_eq!(graph.count_entry("ginstance"), 0);
    assert_eq!(graph.count_entry("polymesh"), 0);
    Ok(())
}

#[test]
fn procedurals_released_before_commit_never_expand() -> Result<()> {
    init();
    let mut session = Session::create("Arnold", RenderType::Batch, None)?;
    let planes = Planes::new(1);
    let attributes = session.attributes(&CompoundObject::new());
    let procedural: Arc<dyn Procedural> = planes.clone();
    let handle = session.object("procedural", Object::Procedural(procedural), &attributes)?;
    session.release(handle);
    session.render()?;

    assert_eq!(planes.expansions.load(Ordering::Relaxed), 0);
    assert_eq!(session.graph().count_entry("ginstance"), 0);
    Ok(())
}
