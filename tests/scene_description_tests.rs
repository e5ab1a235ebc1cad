//! Scene Description Tests
//!
//! Tests for:
//! - Writing the native graph at commit
//! - Reloading a written graph with pointers and links intact

use std::sync::Arc;

use anyhow::Result;
use relay::NodeGraph;
use relay::core::NodeLibrary;
use relay::prelude::*;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn scene_description_round_trip() -> Result<()> {
    init();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("scene.json");

    let mut session = Session::create("Arnold", RenderType::SceneDescription, Some(path.as_path()))?;
    let network = ShaderNetwork::new(vec![
        Shader::new("noise", "ai:shader").with_handle("noiseHandle"),
        Shader::new("flat", "ai:surface").with_link("color", "noiseHandle", None),
    ])?;
    let attributes = session.attributes(&compound([
        ("ai:surface", AttributeValue::from(network)),
        ("user:id", Value::Int(7).into()),
    ]));
    let plane = MeshPrimitive::create_plane(Vec2::splat(-1.0), Vec2::ONE);
    let handle = session.object("plane", plane.into(), &attributes)?;
    session.transform(handle, Mat4::from_translation(Vec3::Z))?;
    session.output("beauty", Some(Output::new("beauty.exr", "exr", "rgba")))?;
    session.render()?;

    assert!(path.exists());
    let loaded = NodeGraph::load(&path, Arc::new(NodeLibrary::builtin()))?;
    assert_eq!(loaded.len(), session.graph().len());

    let instance = loaded.node("plane").expect("instance");
    assert_eq!(instance.get_matrix("matrix"), Some(Mat4::from_translation(Vec3::Z)));
    assert_eq!(instance.get_int("user:id"), Some(7));

    let shader = instance.get_node("shader").and_then(|k| loaded.get(k)).expect("surface");
    assert_eq!(shader.entry_name(), "flat");
    let noise = shader.link("color").and_then(|l| loaded.get(l.source)).expect("upstream");
    assert_eq!(noise.entry_name(), "noise");

    let shape = instance.get_node("node").and_then(|k| loaded.get(k)).expect("shared shape");
    assert_eq!(shape.entry_name(), "polymesh");

    assert_eq!(loaded.options_node().get_strings("outputs").map(<[_]>::len), Some(1));
    Ok(())
}

#[test]
fn batch_sessions_write_nothing() -> Result<()> {
    init();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("scene.json");
    let mut session = Session::create("Arnold", RenderType::Batch, Some(path.as_path()))?;
    session.render()?;
    assert!(!path.exists());
    Ok(())
}
