//! Shader Translation Tests
//!
//! Tests for:
//! - Surface networks: one native node per shader, links and pointers
//! - Sharing: equal networks translate once per session
//! - Malformed networks: errors without leftover nodes

use std::sync::Arc;

use anyhow::Result;
use relay::prelude::*;
use relay::scene::attributes::AttributeSet;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn plane() -> Object {
    MeshPrimitive::create_plane(Vec2::splat(-1.0), Vec2::ONE).into()
}

fn flat(color: Vec3) -> ShaderNetwork {
    ShaderNetwork::single(Shader::new("flat", "ai:surface").with("color", Value::Color3f(color)))
        .expect("single-node network")
}

fn surface(session: &mut Session, network: ShaderNetwork) -> Arc<AttributeSet> {
    session.attributes(&compound([("ai:surface", AttributeValue::from(network))]))
}

// ============================================================================
// Sharing
// ============================================================================

#[test]
fn equal_networks_translate_once() -> Result<()> {
    init();
    let mut session = Session::create("Arnold", RenderType::Batch, None)?;

    for i in 0..10 {
        let attributes = surface(&mut session, flat(Vec3::new(1.0, 0.0, 0.0)));
        session.object(&format!("plane{i}"), plane(), &attributes)?;
    }
    session.render()?;

    let graph = session.graph();
    assert_eq!(graph.count_entry("flat"), 1);
    assert_eq!(graph.count_entry("ginstance"), 10);

    let (shader, _) = graph.nodes_of_entry("flat")[0];
    for (_, instance) in graph.nodes_of_entry("ginstance") {
        assert_eq!(instance.get_node("shader"), Some(shader));
    }
    Ok(())
}

#[test]
fn different_networks_translate_separately() -> Result<()> {
    init();
    let mut session = Session::create("Arnold", RenderType::Batch, None)?;

    let red = surface(&mut session, flat(Vec3::X));
    let green = surface(&mut session, flat(Vec3::Y));
    session.object("a", plane(), &red)?;
    session.object("b", plane(), &green)?;
    session.render()?;

    assert_eq!(session.graph().count_entry("flat"), 2);
    assert_eq!(session.shader_count(), 2);
    Ok(())
}

// ============================================================================
// Links
// ============================================================================

#[test]
fn linked_parameters_reference_upstream_nodes() -> Result<()> {
    init();
    let mut session = Session::create("Arnold", RenderType::Batch, None)?;

    let network = ShaderNetwork::new(vec![
        Shader::new("noise", "ai:shader").with_handle("noiseHandle"),
        Shader::new("flat", "ai:surface").with_link("color", "noiseHandle", None),
    ])?;
    let attributes = surface(&mut session, network);
    session.object("plane", plane(), &attributes)?;
    session.render()?;

    let graph = session.graph();
    let (noise, noise_node) = graph.nodes_of_entry("noise")[0];
    let (_, flat_node) = graph.nodes_of_entry("flat")[0];
    assert!(noise_node.name().ends_with(":noiseHandle"));
    assert_eq!(flat_node.link("color").map(|l| l.source), Some(noise));
    Ok(())
}

#[test]
fn unknown_shader_fails_without_side_effects() -> Result<()> {
    init();
    let mut session = Session::create("Arnold", RenderType::Batch, None)?;

    let network = ShaderNetwork::single(Shader::new("doesNotExist", "ai:surface"))?;
    let attributes = surface(&mut session, network);
    let result = session.object("plane", plane(), &attributes);

    assert!(matches!(result, Err(RelayError::UnknownNodeEntry(_))));
    let graph = session.graph();
    assert_eq!(graph.count_entry("ginstance"), 0);
    assert_eq!(graph.count_entry("polymesh"), 0);
    assert!(graph.node("plane").is_none());
    Ok(())
}

#[test]
fn dangling_links_are_rejected() {
    let result = ShaderNetwork::new(vec![Shader::new("flat", "ai:surface").with_link("color", "missing", None)]);
    assert!(matches!(result, Err(RelayError::DanglingLink { .. })));
}
