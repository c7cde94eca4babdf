use eframe::egui::{self, ScrollArea, Ui};

use crate::config::AppSettings;
use crate::state::AppState;
use crate::ui::{panels, views};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct ExoDetectApp {
    pub state: AppState,
}

impl ExoDetectApp {
    pub fn new(settings: AppSettings) -> Self {
        Self {
            state: AppState::new(settings),
        }
    }
}

impl eframe::App for ExoDetectApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar + status ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: data source + hyperparameters ----
        egui::SidePanel::left("config_panel")
            .default_width(260.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: preview, results, prediction ----
        egui::CentralPanel::default().show(ctx, |ui| {
            ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui: &mut Ui| {
                    ui.heading("ExoDetect AI");
                    ui.label("Classify Kepler Objects of Interest with a random forest.");
                    ui.separator();

                    views::dataset_preview(ui, &self.state);
                    ui.separator();
                    views::performance(ui, &self.state);
                    ui.separator();
                    views::prediction_form(ui, &mut self.state);
                });
        });
    }
}
