//! Option Tests
//!
//! Tests for:
//! - Render camera resolution, region and pointer
//! - AA seed fallbacks
//! - Native and declared options
//! - AOV shader registry, atmosphere and background
//! - Log file directories

use anyhow::Result;
use relay::prelude::*;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn batch() -> Result<Session> {
    Ok(Session::create("Arnold", RenderType::Batch, None)?)
}

fn shader(name: &str) -> AttributeValue {
    ShaderNetwork::single(Shader::new(name, "ai:shader"))
        .expect("single-node network")
        .into()
}

// ============================================================================
// Camera
// ============================================================================

#[test]
fn render_camera_sets_resolution_and_region() -> Result<()> {
    init();
    let mut session = batch()?;
    let attributes = session.attributes(&CompoundObject::new());
    let camera = Camera::new()
        .with_resolution(IVec2::new(2000, 1000))
        .with_render_region(RenderRegion::new(IVec2::new(0, 250), IVec2::new(1999, 749)));
    session.camera("testCamera", &camera, &attributes)?;
    session.option("camera", Some(Value::from("testCamera").into()))?;
    session.render()?;

    let graph = session.graph();
    let options = graph.options_node();
    assert_eq!(options.get_node("camera"), graph.lookup("testCamera"));
    assert_eq!(options.get_int("xres"), Some(2000));
    assert_eq!(options.get_int("yres"), Some(1000));
    assert_eq!(options.get_int("region_min_y"), Some(250));
    assert_eq!(options.get_int("region_max_y"), Some(749));
    Ok(())
}

#[test]
fn missing_camera_falls_back_to_defaults() -> Result<()> {
    init();
    let mut session = batch()?;
    session.option("camera", Some(Value::from("doesNotExist").into()))?;
    session.render()?;

    let options = session.graph().options_node();
    assert!(options.get("camera").is_none());
    assert_eq!(options.get_int("xres"), Some(640));
    assert_eq!(options.get_int("yres"), Some(480));
    Ok(())
}

#[test]
fn camera_parameters_are_translated() -> Result<()> {
    init();
    let mut session = batch()?;
    let attributes = session.attributes(&CompoundObject::new());
    let camera = Camera::new().with_field_of_view(35.0).with_shutter(-0.25, 0.25);
    session.camera("persp", &camera, &attributes)?;
    let ortho = Camera::new().with_projection(Projection::Orthographic);
    session.camera("ortho", &ortho, &attributes)?;

    let graph = session.graph();
    let persp = graph.node("persp").expect("camera node");
    assert_eq!(persp.entry_name(), "persp_camera");
    assert_eq!(persp.get_float("fov"), Some(35.0));
    assert_eq!(persp.get_float("shutter_start"), Some(-0.25));
    assert_eq!(graph.node("ortho").map(|n| n.entry_name()), Some("ortho_camera"));
    Ok(())
}

// ============================================================================
// Seeds & Native Options
// ============================================================================

#[test]
fn aa_seed_follows_frame_unless_set() -> Result<()> {
    init();
    let mut session = batch()?;
    session.render()?;
    assert_eq!(session.graph().options_node().get_int("AA_seed"), Some(1));

    session.option("frame", Some(Value::Int(20).into()))?;
    session.render()?;
    assert_eq!(session.graph().options_node().get_int("AA_seed"), Some(20));

    session.option("ai:AA_seed", Some(Value::Int(3).into()))?;
    session.render()?;
    assert_eq!(session.graph().options_node().get_int("AA_seed"), Some(3));

    session.option("ai:AA_seed", None)?;
    session.render()?;
    assert_eq!(session.graph().options_node().get_int("AA_seed"), Some(20));
    Ok(())
}

#[test]
fn native_options_write_through() -> Result<()> {
    init();
    let mut session = batch()?;
    session.option("ai:AA_samples", Some(Value::Int(5).into()))?;
    assert_eq!(session.graph().options_node().get_int("AA_samples"), Some(5));

    session.option("ai:AA_samples", None)?;
    assert!(session.graph().options_node().get("AA_samples").is_none());

    session.option("cycles:samples", Some(Value::Int(5).into()))?;
    Ok(())
}

#[test]
fn declared_options_are_user_parameters() -> Result<()> {
    init();
    let mut session = batch()?;
    session.option("ai:declare:myLovelyUserOption", Some(Value::from("heythere").into()))?;
    assert_eq!(
        session.graph().options_node().get_str("myLovelyUserOption"),
        Some("heythere")
    );
    Ok(())
}

// ============================================================================
// Shaders
// ============================================================================

#[test]
fn aov_shaders_are_keyed() -> Result<()> {
    init();
    let mut session = batch()?;
    let count = |s: &Session| s.graph().options_node().get_nodes("aov_shaders").map_or(0, <[_]>::len);

    session.option("ai:aov_shader:test", Some(shader("aov_write_rgb")))?;
    assert_eq!(count(&session), 1);
    session.option("ai:aov_shader:test2", Some(shader("aov_write_float")))?;
    assert_eq!(count(&session), 2);
    session.option("ai:aov_shader:test", Some(shader("aov_write_int")))?;
    assert_eq!(count(&session), 2);
    assert_eq!(session.options().aov_shader_count(), 2);

    session.option("ai:aov_shader:test", None)?;
    assert_eq!(count(&session), 1);
    session.option("ai:aov_shader:test2", None)?;
    assert_eq!(count(&session), 0);
    Ok(())
}

#[test]
fn atmosphere_and_background_point_at_shaders() -> Result<()> {
    init();
    let mut session = batch()?;
    session.option("ai:atmosphere", Some(shader("noise")))?;
    session.option("ai:background", Some(shader("flat")))?;

    let graph = session.graph();
    let options = graph.options_node();
    let atmosphere = options.get_node("atmosphere").and_then(|k| graph.get(k));
    assert_eq!(atmosphere.map(|n| n.entry_name()), Some("noise"));
    let background = options.get_node("background").and_then(|k| graph.get(k));
    assert_eq!(background.map(|n| n.entry_name()), Some("flat"));

    session.option("ai:atmosphere", None)?;
    assert!(session.graph().options_node().get("atmosphere").is_none());
    Ok(())
}

#[test]
fn plain_data_resets_shader_options() -> Result<()> {
    init();
    let mut session = Session::create("Arnold", RenderType::Interactive, None)?;
    session.option("ai:background", Some(shader("flat")))?;
    session.option("ai:background", Some(Value::from("flat").into()))?;
    assert!(session.graph().options_node().get("background").is_none());

    session.render()?;
    assert_eq!(session.graph().count_entry("flat"), 0);
    Ok(())
}

// ============================================================================
// Log File
// ============================================================================

#[test]
fn log_file_directory_is_created_at_commit() -> Result<()> {
    init();
    let dir = tempfile::tempdir()?;
    let log_file = dir.path().join("renderLogs").join("render.log");
    let mut session = batch()?;
    session.option(
        "ai:log:filename",
        Some(Value::from(log_file.to_string_lossy().into_owned()).into()),
    )?;
    assert!(!log_file.parent().is_some_and(std::path::Path::exists));

    session.render()?;
    assert!(dir.path().join("renderLogs").is_dir());
    Ok(())
}
