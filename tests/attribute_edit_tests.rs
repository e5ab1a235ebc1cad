//! Attribute Edit Tests
//!
//! Tests for:
//! - Accepted edits: visibility, shaders and user data updated in place
//! - Rejected edits: anything that changes processed geometry
//! - Shader garbage collection at commit
//! - Non-interactive sessions refusing edits

use anyhow::Result;
use relay::prelude::*;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn interactive() -> Result<Session> {
    Ok(Session::create("Arnold", RenderType::Interactive, None)?)
}

fn plane() -> MeshPrimitive {
    MeshPrimitive::create_plane(Vec2::splat(-1.0), Vec2::ONE)
}

fn flat(color: Vec3) -> AttributeValue {
    ShaderNetwork::single(Shader::new("flat", "ai:surface").with("color", Value::Color3f(color)))
        .expect("single-node network")
        .into()
}

// ============================================================================
// Accepted Edits
// ============================================================================

#[test]
fn visibility_edits_apply_in_place() -> Result<()> {
    init();
    let mut session = interactive()?;
    let visible = session.attributes(&CompoundObject::new());
    let handle = session.object("plane", plane().into(), &visible)?;
    session.render()?;
    let all_rays = session.graph().node("plane").and_then(|n| n.get_byte("visibility"));

    let hidden = session.attributes(&compound([("ai:visibility:camera", false)]));
    assert!(session.edit_attributes(handle, &hidden));
    let edited = session.graph().node("plane").and_then(|n| n.get_byte("visibility"));
    assert_ne!(all_rays, edited);
    assert_eq!(all_rays.map(|v| v & !RayType::CAMERA.bits()), edited);
    Ok(())
}

#[test]
fn surface_edits_swap_shaders_and_collect_old_ones() -> Result<()> {
    init();
    let mut session = interactive()?;
    let red = session.attributes(&compound([("ai:surface", flat(Vec3::X))]));
    let handle = session.object("plane", plane().into(), &red)?;
    session.render()?;
    assert_eq!(session.graph().count_entry("flat"), 1);

    let green = session.attributes(&compound([("ai:surface", flat(Vec3::Y))]));
    assert!(session.edit_attributes(handle, &green));
    assert_eq!(session.graph().count_entry("flat"), 2);

    session.render()?;
    let graph = session.graph();
    assert_eq!(graph.count_entry("flat"), 1);
    let (shader, node) = graph.nodes_of_entry("flat")[0];
    assert_eq!(node.get_rgb("color"), Some(Vec3::Y));
    assert_eq!(graph.node("plane").and_then(|n| n.get_node("shader")), Some(shader));
    Ok(())
}

#[test]
fn user_attributes_follow_edits() -> Result<()> {
    init();
    let mut session = interactive()?;
    let first = session.attributes(&compound([("user:tag", "a")]));
    let handle = session.object("plane", plane().into(), &first)?;
    assert_eq!(session.graph().node("plane").and_then(|n| n.get_str("user:tag")), Some("a"));

    let second = session.attributes(&compound([("user:tag", "b")]));
    assert!(session.edit_attributes(handle, &second));
    assert_eq!(session.graph().node("plane").and_then(|n| n.get_str("user:tag")), Some("b"));

    let none = session.attributes(&CompoundObject::new());
    assert!(session.edit_attributes(handle, &none));
    assert!(session.graph().node("plane").and_then(|n| n.get("user:tag")).is_none());
    Ok(())
}

// ============================================================================
// Rejected Edits
// ============================================================================

#[test]
fn geometric_edits_are_rejected() -> Result<()> {
    init();
    let mut session = interactive()?;
    let mesh = plane().with_interpolation(MeshInterpolation::CatmullClark);
    let low = session.attributes(&compound([("ai:polymesh:subdiv_iterations", 1_i32)]));
    let handle = session.object("plane", mesh.into(), &low)?;

    let high = session.attributes(&compound([("ai:polymesh:subdiv_iterations", 2_i32)]));
    assert!(!session.edit_attributes(handle, &high));

    let same = session.attributes(&compound([
        ("ai:polymesh:subdiv_iterations", Value::Int(1)),
        ("ai:matte", Value::Bool(true)),
    ]));
    assert!(session.edit_attributes(handle, &same));
    Ok(())
}

#[test]
fn subdivision_edits_are_irrelevant_for_linear_meshes() -> Result<()> {
    init();
    let mut session = interactive()?;
    let low = session.attributes(&compound([("ai:polymesh:subdiv_iterations", 1_i32)]));
    let handle = session.object("plane", plane().into(), &low)?;
    let high = session.attributes(&compound([("ai:polymesh:subdiv_iterations", 2_i32)]));
    assert!(session.edit_attributes(handle, &high));
    Ok(())
}

/// `subdiv_type` of the shape behind the object `name`.
fn subdiv_type(session: &Session, name: &str) -> Option<String> {
    let graph = session.graph();
    let shape = graph.node(name)?.get_node("node")?;
    graph.get(shape)?.get_str("subdiv_type").map(str::to_string)
}

#[test]
fn subdivide_polygons_edits_are_rejected_on_linear_meshes() -> Result<()> {
    init();
    let mut session = interactive()?;
    let off = session.attributes(&compound([("ai:polymesh:subdivide_polygons", false)]));
    let on = session.attributes(&compound([("ai:polymesh:subdivide_polygons", true)]));
    let on_matte = session.attributes(&compound([
        ("ai:polymesh:subdivide_polygons", Value::Bool(true)),
        ("ai:matte", Value::Bool(true)),
    ]));

    let polygons = session.object("polygons", plane().into(), &off)?;
    let subdivided = session.object("subdivided", plane().into(), &on)?;
    session.render()?;
    assert_eq!(subdiv_type(&session, "polygons").as_deref(), Some("none"));
    assert_eq!(subdiv_type(&session, "subdivided").as_deref(), Some("linear"));

    assert!(!session.edit_attributes(polygons, &on_matte));
    assert!(!session.edit_attributes(subdivided, &off));

    assert_eq!(subdiv_type(&session, "polygons").as_deref(), Some("none"));
    assert_eq!(subdiv_type(&session, "subdivided").as_deref(), Some("linear"));
    assert_eq!(
        session.graph().node("polygons").and_then(|n| n.get_bool("matte")),
        Some(false)
    );
    Ok(())
}

#[test]
fn subdivide_polygons_is_inert_on_catmull_clark_meshes() -> Result<()> {
    init();
    let mut session = interactive()?;
    let mesh = plane().with_interpolation(MeshInterpolation::CatmullClark);
    let off = session.attributes(&compound([("ai:polymesh:subdivide_polygons", false)]));
    let handle = session.object("plane", mesh.into(), &off)?;

    let on = session.attributes(&compound([("ai:polymesh:subdivide_polygons", true)]));
    assert!(session.edit_attributes(handle, &on));
    assert!(session.edit_attributes(handle, &off));
    assert_eq!(subdiv_type(&session, "plane").as_deref(), Some("catclark"));
    Ok(())
}

#[test]
fn displacement_edits_are_rejected() -> Result<()> {
    init();
    let mut session = interactive()?;
    let plain = session.attributes(&CompoundObject::new());
    let handle = session.object("plane", plane().into(), &plain)?;

    let network = ShaderNetwork::single(Shader::new("noise", "ai:shader"))?;
    let displaced = session.attributes(&compound([("ai:disp_map", AttributeValue::from(network))]));
    assert!(!session.edit_attributes(handle, &displaced));
    Ok(())
}

#[test]
fn batch_sessions_refuse_edits() -> Result<()> {
    init();
    let mut session = Session::create("Arnold", RenderType::Batch, None)?;
    let attributes = session.attributes(&CompoundObject::new());
    let handle = session.object("plane", plane().into(), &attributes)?;
    assert!(!session.edit_attributes(handle, &attributes));
    Ok(())
}
