use eframe::egui::{self, Color32, RichText, Ui};

use crate::config::{
    MAX_DEPTH_RANGE, TEST_SIZE_RANGE, TEST_SIZE_STEP, TREE_COUNT_RANGE, TREE_COUNT_STEP,
};
use crate::state::{AppState, Status};

// ---------------------------------------------------------------------------
// Left side panel – data source and training controls
// ---------------------------------------------------------------------------

/// Render the left configuration panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Data");
    ui.separator();

    let mut use_default = state.use_default;
    let default_available = state.settings.default_dataset.is_file();
    ui.add_enabled_ui(default_available, |ui: &mut Ui| {
        if ui
            .checkbox(&mut use_default, "Use default NASA dataset")
            .on_disabled_hover_text(format!(
                "{} not found",
                state.settings.default_dataset.display()
            ))
            .changed()
        {
            state.set_use_default(use_default);
        }
    });

    if ui.button("Upload CSV / Parquet…").clicked() {
        open_file_dialog(state);
    }

    match &state.dataset {
        Some(ds) => {
            ui.label(format!("Source: {}", ds.label));
            ui.small(format!("content hash {}", ds.hash));
        }
        None => {
            ui.label("No dataset loaded.");
        }
    }

    ui.add_space(8.0);
    ui.heading("Model configuration");
    ui.separator();

    ui.add(
        egui::Slider::new(&mut state.config.n_trees, TREE_COUNT_RANGE)
            .step_by(TREE_COUNT_STEP as f64)
            .text("Trees"),
    );
    ui.add(egui::Slider::new(&mut state.config.max_depth, MAX_DEPTH_RANGE).text("Max depth"));
    ui.add(
        egui::Slider::new(&mut state.config.test_size, TEST_SIZE_RANGE)
            .step_by(TEST_SIZE_STEP)
            .fixed_decimals(2)
            .text("Test size"),
    );

    ui.add_space(4.0);
    let can_train = state.dataset.is_some();
    if ui
        .add_enabled(can_train, egui::Button::new(RichText::new("Train model").strong()))
        .clicked()
    {
        state.train();
    }

    if !state.progress.is_empty() {
        ui.add_space(4.0);
        for stage in &state.progress {
            ui.small(format!("✔ {stage}"));
        }
    }

    ui.add_space(8.0);
    ui.separator();
    if let Some(engine) = &state.engine {
        ui.label(format!("Saved model in {}", state.store.dir().display()));
        ui.small(format!("run {}", engine.run_id()));
    } else {
        ui.label("No trained model yet.");
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(ds) = &state.dataset {
            ui.label(format!(
                "{} rows × {} columns",
                ds.table.n_rows(),
                ds.table.n_cols()
            ));
            ui.separator();
        }

        match &state.status {
            Some(Status::Error(msg)) => {
                ui.label(RichText::new(msg).color(Color32::RED));
            }
            Some(Status::Info(msg)) => {
                ui.label(msg);
            }
            None => {}
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open KOI table")
        .add_filter("Supported files", &["csv", "parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        log::info!("Selected upload {}", path.display());
        state.select_upload(path);
    }
}
