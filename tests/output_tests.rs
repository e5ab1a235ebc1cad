//! Output Tests
//!
//! Tests for:
//! - Filter and driver creation, the options `outputs` lines
//! - Light path expression outputs
//! - Header metadata on drivers that support it
//! - Replacing and removing outputs
//! - Unconvertible header values

use std::sync::{Mutex, OnceLock};
use std::thread::{self, ThreadId};

use anyhow::Result;
use relay::prelude::*;

/// Forwards to `env_logger` and keeps every warning, tagged with the
/// logging thread so parallel tests only see their own.
struct CapturingLogger {
    inner: env_logger::Logger,
    warnings: Mutex<Vec<(ThreadId, String)>>,
}

impl CapturingLogger {
    /// Removes and returns the warnings logged by the current thread.
    fn take_warnings(&self) -> Vec<String> {
        let current = thread::current().id();
        let mut warnings = self.warnings.lock().unwrap();
        let (mine, others): (Vec<_>, Vec<_>) = warnings.drain(..).partition(|(id, _)| *id == current);
        *warnings = others;
        mine.into_iter().map(|(_, message)| message).collect()
    }
}

impl log::Log for CapturingLogger {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        metadata.level() <= log::Level::Warn || self.inner.enabled(metadata)
    }

    fn log(&self, record: &log::Record<'_>) {
        if record.level() == log::Level::Warn {
            self.warnings
                .lock()
                .unwrap()
                .push((thread::current().id(), record.args().to_string()));
        }
        if self.inner.matches(record) {
            self.inner.log(record);
        }
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

static LOGGER: OnceLock<&'static CapturingLogger> = OnceLock::new();

fn init() -> &'static CapturingLogger {
    LOGGER.get_or_init(|| {
        let logger: &'static CapturingLogger = Box::leak(Box::new(CapturingLogger {
            inner: env_logger::builder().is_test(true).build(),
            warnings: Mutex::new(Vec::new()),
        }));
        if log::set_logger(logger).is_ok() {
            log::set_max_level(logger.inner.filter().max(log::LevelFilter::Warn));
        }
        logger
    })
}

fn batch() -> Result<Session> {
    Ok(Session::create("Arnold", RenderType::Batch, None)?)
}

fn output_lines(session: &Session) -> Vec<String> {
    session
        .graph()
        .options_node()
        .get_strings("outputs")
        .map(<[String]>::to_vec)
        .unwrap_or_default()
}

// ============================================================================
// Translation
// ============================================================================

#[test]
fn beauty_output_creates_filter_and_driver() -> Result<()> {
    init();
    let mut session = batch()?;
    session.output("beauty", Some(Output::new("beauty.exr", "exr", "rgba")))?;

    let graph = session.graph();
    let driver = graph.node("ieCoreArnold:display:beauty").expect("driver");
    assert_eq!(driver.entry_name(), "driver_exr");
    assert_eq!(driver.get_str("filename"), Some("beauty.exr"));
    let filter = graph.node("ieCoreArnold:filter:beauty").expect("filter");
    assert_eq!(filter.entry_name(), "gaussian_filter");

    assert_eq!(
        output_lines(&session),
        vec!["RGBA RGBA ieCoreArnold:filter:beauty ieCoreArnold:display:beauty".to_string()]
    );
    Ok(())
}

#[test]
fn filter_type_and_width_come_from_parameters() -> Result<()> {
    init();
    let mut session = batch()?;
    let output = Output::new("a.exr", "exr", "color A")
        .with_parameter("filter", "box")
        .with_parameter("filterwidth", Value::V2f(Vec2::new(3.0, 3.0)));
    session.output("a", Some(output))?;

    let filter = session.graph().node("ieCoreArnold:filter:a").expect("filter");
    assert_eq!(filter.entry_name(), "box_filter");
    assert_eq!(filter.get_float("width"), Some(3.0));
    Ok(())
}

#[test]
fn lpe_outputs_register_expressions() -> Result<()> {
    init();
    let mut session = batch()?;
    session.output("test", Some(Output::new("test.exr", "exr", "lpe C.*D.*")))?;

    let options = session.graph().options_node();
    assert_eq!(
        options.get_strings("light_path_expressions"),
        Some(&["ieCoreArnold:lpe:test C.*D.*".to_string()][..])
    );
    assert!(output_lines(&session)[0].starts_with("ieCoreArnold:lpe:test RGB "));
    Ok(())
}

#[test]
fn unsupported_data_creates_nothing() -> Result<()> {
    init();
    let mut session = batch()?;
    session.output("bogus", Some(Output::new("x.exr", "exr", "nonsense")))?;
    assert!(session.graph().node("ieCoreArnold:display:bogus").is_none());
    assert!(output_lines(&session).is_empty());
    Ok(())
}

// ============================================================================
// Metadata
// ============================================================================

#[test]
fn header_metadata_becomes_custom_attributes() -> Result<()> {
    init();
    let mut session = batch()?;
    let output = Output::new("beauty.exr", "exr", "rgba")
        .with_parameter("custom_attributes", vec!["string 'original' value".to_string()])
        .with_parameter("header:bar", 1_i32)
        .with_parameter("header:foo", "bar");
    session.output("beauty", Some(output))?;

    let driver = session.graph().node("ieCoreArnold:display:beauty").expect("driver");
    assert_eq!(
        driver.get_strings("custom_attributes"),
        Some(
            &[
                "string 'original' value".to_string(),
                "int 'bar' 1".to_string(),
                "string 'foo' bar".to_string(),
            ][..]
        )
    );
    Ok(())
}

#[test]
fn drivers_without_custom_attributes_ignore_headers() -> Result<()> {
    init();
    let mut session = batch()?;
    let output = Output::new("beauty.tif", "tiff", "rgba").with_parameter("header:foo", "bar");
    session.output("beauty", Some(output))?;

    let driver = session.graph().node("ieCoreArnold:display:beauty").expect("driver");
    assert!(driver.get("custom_attributes").is_none());
    Ok(())
}

#[test]
fn unconvertible_headers_warn_once_and_are_skipped() -> Result<()> {
    let logger = init();
    let mut session = batch()?;
    logger.take_warnings();

    let output = Output::new("beauty.exr", "exr", "rgba")
        .with_parameter("header:foo", "bar")
        .with_parameter("header:ids", Value::IntArray(vec![1, 2, 3]));
    session.output("beauty", Some(output))?;

    let driver = session.graph().node("ieCoreArnold:display:beauty").expect("driver");
    assert_eq!(
        driver.get_strings("custom_attributes"),
        Some(&["string 'foo' bar".to_string()][..])
    );
    assert_eq!(output_lines(&session).len(), 1);

    let warnings = logger.take_warnings();
    let conversions: Vec<_> = warnings
        .iter()
        .filter(|w| w.starts_with("Cannot convert data \"ids\""))
        .collect();
    assert_eq!(conversions.len(), 1, "warnings: {warnings:?}");
    assert_eq!(warnings.len(), 1);
    Ok(())
}

// ============================================================================
// Registry
// ============================================================================

#[test]
fn replacing_and_removing_outputs() -> Result<()> {
    init();
    let mut session = batch()?;
    session.output("a", Some(Output::new("a.exr", "exr", "rgba")))?;
    session.output("b", Some(Output::new("b.exr", "exr", "rgb")))?;
    session.output("a", Some(Output::new("a.tif", "tiff", "rgba")))?;

    let lines = output_lines(&session);
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("ieCoreArnold:display:a"));
    assert_eq!(
        session.graph().node("ieCoreArnold:display:a").map(|n| n.entry_name()),
        Some("driver_tiff")
    );

    session.output("a", None)?;
    session.output("b", None)?;
    assert!(output_lines(&session).is_empty());
    assert!(session.graph().node("ieCoreArnold:display:a").is_none());
    assert_eq!(session.options().output_count(), 0);
    Ok(())
}
