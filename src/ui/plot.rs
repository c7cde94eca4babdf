use eframe::egui::{self, RichText, Ui};
use egui_plot::{Bar, BarChart, Plot};

use crate::color::{contrast_text, heat_color, ranked_palette};
use crate::ml::metrics::{CLASS_LABELS, ConfusionMatrix};
use crate::ml::train::FeatureImportance;

// ---------------------------------------------------------------------------
// Feature importance chart
// ---------------------------------------------------------------------------

/// Horizontal bar chart, most important feature on top.
pub fn importance_chart(ui: &mut Ui, features: &[FeatureImportance]) {
    let n = features.len();
    let palette = ranked_palette(n);
    let bars: Vec<Bar> = features
        .iter()
        .zip(palette)
        .enumerate()
        .map(|(rank, (f, color))| {
            Bar::new((n - 1 - rank) as f64, f.importance)
                .name(&f.feature)
                .fill(color)
                .width(0.7)
        })
        .collect();

    let names: Vec<String> = features.iter().map(|f| f.feature.clone()).collect();

    Plot::new("feature_importance")
        .height(26.0 * n.max(4) as f32)
        .x_axis_label("Importance")
        .y_axis_formatter(move |mark, _range| {
            let value = mark.value.round();
            if (mark.value - value).abs() > 1e-6 || value < 0.0 {
                return String::new();
            }
            let pos = value as usize;
            if pos >= names.len() {
                return String::new();
            }
            names[names.len() - 1 - pos].clone()
        })
        .allow_drag(false)
        .allow_scroll(false)
        .allow_zoom(false)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).horizontal().name("importance"));
        });
}

// ---------------------------------------------------------------------------
// Confusion matrix heatmap
// ---------------------------------------------------------------------------

/// Rows are actual classes, columns predicted classes.
pub fn confusion_heatmap(ui: &mut Ui, cm: &ConfusionMatrix) {
    let max = cm.counts.iter().copied().max().unwrap_or(0).max(1) as f32;

    egui::Grid::new("confusion_matrix")
        .spacing([6.0, 6.0])
        .show(ui, |ui: &mut Ui| {
            ui.label("");
            for label in CLASS_LABELS.iter().take(cm.n_classes) {
                ui.strong(format!("Predicted {label}"));
            }
            ui.end_row();

            for (truth, row) in cm.rows().iter().enumerate() {
                let label = CLASS_LABELS.get(truth).copied().unwrap_or("?");
                ui.strong(format!("Actual {label}"));
                for &count in row {
                    let fill = heat_color(count as f32 / max);
                    ui.label(
                        RichText::new(format!("  {count:^6}  "))
                            .monospace()
                            .size(18.0)
                            .background_color(fill)
                            .color(contrast_text(fill)),
                    );
                }
                ui.end_row();
            }
        });
}
