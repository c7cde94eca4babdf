use eframe::egui::{self, Color32, DragValue, RichText, ScrollArea, Ui};
use egui_extras::{Column as TableColumn, TableBuilder};

use crate::ml::inference::KEY_FEATURES;
use crate::state::{AppState, PREVIEW_ROWS};
use crate::ui::plot;

// ---------------------------------------------------------------------------
// Dataset preview
// ---------------------------------------------------------------------------

pub fn dataset_preview(ui: &mut Ui, state: &AppState) {
    ui.heading("Dataset preview");
    let Some(ds) = &state.dataset else {
        ui.label("Upload a KOI table (File → Open…) or enable the default dataset.");
        return;
    };

    let table = &ds.table;
    ui.label(format!(
        "{}: {} rows, {} columns",
        ds.label,
        table.n_rows(),
        table.n_cols()
    ));

    let columns = table.columns();
    let rows = table.head(PREVIEW_ROWS);

    ScrollArea::horizontal()
        .id_salt("preview_scroll")
        .show(ui, |ui: &mut Ui| {
            TableBuilder::new(ui)
                .striped(true)
                .vscroll(false)
                .columns(TableColumn::auto().at_least(70.0), columns.len())
                .header(20.0, |mut header| {
                    for column in columns {
                        header.col(|ui: &mut Ui| {
                            let kind = if column.data.is_numeric() { "numeric" } else { "text" };
                            ui.strong(&column.name).on_hover_text(kind);
                        });
                    }
                })
                .body(|mut body| {
                    for row in &rows {
                        body.row(18.0, |mut table_row| {
                            for cell in row {
                                table_row.col(|ui: &mut Ui| {
                                    ui.label(cell.to_string());
                                });
                            }
                        });
                    }
                });
        });
}

// ---------------------------------------------------------------------------
// Training results
// ---------------------------------------------------------------------------

pub fn performance(ui: &mut Ui, state: &AppState) {
    ui.heading("Model performance");
    let Some(report) = &state.report else {
        ui.label("Train a model to see its evaluation on the held-out split.");
        return;
    };

    ui.label(
        RichText::new(format!("Accuracy: {:.4}", report.accuracy))
            .size(20.0)
            .strong(),
    );
    ui.label(format!(
        "{} training rows, {} test rows",
        report.n_train, report.n_test
    ));

    ui.add_space(6.0);
    ui.strong("Classification report");
    ui.label(RichText::new(report.classification.to_string()).monospace());

    ui.add_space(6.0);
    ui.strong("Confusion matrix");
    plot::confusion_heatmap(ui, &report.confusion);

    ui.add_space(6.0);
    ui.strong(format!(
        "Top {} most important features",
        report.top_features.len()
    ));
    plot::importance_chart(ui, &report.top_features);
}

// ---------------------------------------------------------------------------
// Prediction form
// ---------------------------------------------------------------------------

const FORM_COLUMNS: usize = 3;

/// Result colour per class index.
const CLASS_COLORS: [Color32; 2] = [
    Color32::from_rgb(40, 160, 80),
    Color32::from_rgb(220, 140, 30),
];

pub fn prediction_form(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Classify a new object");
    if state.engine.is_none() {
        ui.label("Please upload a dataset and train a model to enable predictions.");
        return;
    }

    ui.label("Enter feature values; key features are shown first in bold.");

    // Key features first, then the rest in training order.
    let mut ordered: Vec<String> = state
        .inputs
        .keys()
        .filter(|name| KEY_FEATURES.contains(&name.as_str()))
        .cloned()
        .collect();
    ordered.sort_by_key(|name| KEY_FEATURES.iter().position(|k| *k == name.as_str()));
    if let Some(engine) = &state.engine {
        ordered.extend(
            engine
                .feature_names()
                .iter()
                .filter(|name| !KEY_FEATURES.contains(&name.as_str()))
                .cloned(),
        );
    }

    ScrollArea::vertical()
        .id_salt("prediction_inputs")
        .max_height(320.0)
        .show(ui, |ui: &mut Ui| {
            egui::Grid::new("prediction_form")
                .num_columns(FORM_COLUMNS * 2)
                .spacing([12.0, 4.0])
                .show(ui, |ui: &mut Ui| {
                    for (i, name) in ordered.iter().enumerate() {
                        let Some(value) = state.inputs.get_mut(name) else {
                            continue;
                        };
                        let text = RichText::new(name);
                        let text = if KEY_FEATURES.contains(&name.as_str()) {
                            text.strong()
                        } else {
                            text
                        };
                        ui.label(text);
                        ui.add(DragValue::new(value).speed(0.1));
                        if (i + 1) % FORM_COLUMNS == 0 {
                            ui.end_row();
                        }
                    }
                });
        });

    ui.add_space(6.0);
    if ui
        .button(RichText::new("CLASSIFY OBJECT").strong().size(16.0))
        .clicked()
    {
        state.predict();
    }

    if let Some(prediction) = &state.prediction {
        let color = CLASS_COLORS[prediction.class.index()];
        ui.label(
            RichText::new(prediction.class.to_string())
                .size(22.0)
                .strong()
                .color(color),
        );
        ui.label(format!(
            "Confidence: {:.2}%",
            prediction.confidence * 100.0
        ));
    }
}
