use anyhow::anyhow;
use eframe::egui;

use lesson_canvas::canvas::settings::{CanvasConfig, DEFAULT_CONFIG_PATH};
use lesson_canvas::gui::LessonApp;
use lesson_canvas::logging;

fn main() -> anyhow::Result<()> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = CanvasConfig::load(&path)?;
    logging::init(config.debug_logging, config.log_file.as_deref());
    tracing::info!("starting lesson canvas from {path}");

    let app = LessonApp::new(config)?;
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([720.0, 560.0])
            .with_min_inner_size([320.0, 240.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Lesson Canvas",
        native_options,
        Box::new(move |cc| {
            app.install_fonts(&cc.egui_ctx);
            Box::new(app)
        }),
    )
    .map_err(|e| anyhow!("{e}"))
}
