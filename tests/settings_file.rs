use lesson_canvas::canvas::input::{MouseButton, RawInput, SurfaceRect};
use lesson_canvas::canvas::messages::ScoreResponse;
use lesson_canvas::canvas::model::Point;
use lesson_canvas::canvas::sizer::SizingPolicy;
use lesson_canvas::canvas::CanvasConfig;
use tempfile::tempdir;

use canvas_fakes::*;

#[test]
fn saved_config_loads_back() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("lesson.json");
    let path = path.to_str().unwrap();

    let config = CanvasConfig {
        lesson_id: "7".into(),
        template_text: Some("க".into()),
        sizing: SizingPolicy::Viewport {
            fraction: 0.4,
            max_height: 320.0,
        },
        debug_logging: true,
        log_file: Some(dir.path().join("canvas.log")),
        ..CanvasConfig::default()
    };
    config.save(path).unwrap();

    assert_eq!(CanvasConfig::load(path).unwrap(), config);
}

#[test]
fn missing_or_empty_file_gives_defaults() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("absent.json");
    assert_eq!(
        CanvasConfig::load(missing.to_str().unwrap()).unwrap(),
        CanvasConfig::default()
    );

    let empty = dir.path().join("empty.json");
    std::fs::write(&empty, "  \n").unwrap();
    assert_eq!(
        CanvasConfig::load(empty.to_str().unwrap()).unwrap(),
        CanvasConfig::default()
    );
}

#[test]
fn malformed_file_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ lesson_id: ").unwrap();
    assert!(CanvasConfig::load(path.to_str().unwrap()).is_err());
}

#[test]
fn export_writes_the_ink_as_png() {
    let dir = tempdir().unwrap();
    let client = ScriptedClient::new(Ok(ScoreResponse::scored(true, None, "ok")));
    let mut canvas = canvas_with(lesson_config(Some("அ")), client, 300.0);
    let rect = SurfaceRect::default();
    canvas.handle_input(
        &RawInput::MouseDown {
            button: MouseButton::Primary,
            client: Point::new(5.0, 5.0),
        },
        rect,
    );
    canvas.handle_input(
        &RawInput::MouseMove {
            client: Point::new(50.0, 50.0),
        },
        rect,
    );

    let path = canvas.export_attempt(dir.path()).unwrap();
    assert!(path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with("_attempt.png")));

    let saved = image::open(&path).unwrap().to_rgba8();
    let ink = canvas.surface().ink();
    assert_eq!(saved.dimensions(), ink.size());
    assert_eq!(saved.as_raw().as_slice(), ink.pixels());
}
