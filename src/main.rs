mod app;
mod color;
mod config;
mod data;
mod ml;
mod state;
mod ui;

use app::ExoDetectApp;
use config::AppSettings;
use eframe::egui;

fn main() -> eframe::Result {
    env_logger::init();

    let settings = AppSettings::from_env();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 860.0])
            .with_min_inner_size([720.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        "ExoDetect AI – Find New Worlds",
        options,
        Box::new(|_cc| Ok(Box::new(ExoDetectApp::new(settings)))),
    )
}
