use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::DatePickerButton;

use crate::data::filter::{AmountRange, DateRange};
use crate::data::model::Field;
use crate::export::ExportFormat;
use crate::state::AppState;
use crate::ui::format::format_count;

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters");
    ui.separator();

    let Some(dataset) = state.dataset.clone() else {
        ui.label("No dataset loaded.");
        return;
    };

    let mut changed = false;

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Date range ----
            if let Some(range) = state.criteria.date_range {
                ui.strong("Project Completed Date Range");
                let (mut start, mut end) = (range.start, range.end);
                ui.horizontal(|ui: &mut Ui| {
                    changed |= ui
                        .add(DatePickerButton::new(&mut start).id_salt("date_start"))
                        .changed();
                    ui.label("–");
                    changed |= ui
                        .add(DatePickerButton::new(&mut end).id_salt("date_end"))
                        .changed();
                });
                state.criteria.date_range = Some(DateRange::new(start, end));
                ui.separator();
            }

            // ---- Categorical multiselects (collapsible) ----
            for field in Field::CATEGORICAL {
                let n_total = state.options.count(field);
                let n_selected = state.criteria.selection(field).map_or(0, |s| s.len());
                let header_text = if n_selected == 0 {
                    format!("{field}  (all {n_total})")
                } else {
                    format!("{field}  ({n_selected}/{n_total})")
                };

                egui::CollapsingHeader::new(RichText::new(header_text).strong())
                    .id_salt(field.label())
                    .default_open(false)
                    .show(ui, |ui: &mut Ui| {
                        ui.horizontal(|ui: &mut Ui| {
                            if ui.small_button("All").clicked() {
                                state.select_all(field);
                            }
                            if ui.small_button("None").clicked() {
                                state.clear_selection(field);
                            }
                        });

                        let Some(selected) = state.criteria.selection_mut(field) else {
                            return;
                        };
                        for value in state.options.values(field) {
                            let mut checked = selected.contains(value);
                            if ui.checkbox(&mut checked, value.as_str()).changed() {
                                if checked {
                                    selected.insert(value.clone());
                                } else {
                                    selected.remove(value);
                                }
                                changed = true;
                            }
                        }
                    });
            }
            ui.separator();

            // ---- Amount range ----
            let (lo, hi) = dataset.amount_bounds();
            let current = state.criteria.amount_range;
            let (mut min, mut max) = (current.min.clamp(lo, hi), current.max.clamp(lo, hi));
            let step = state.config.amount_step;
            ui.strong("Incentive Amount Range");
            changed |= ui
                .add(
                    egui::Slider::new(&mut min, lo..=hi)
                        .step_by(step)
                        .prefix("$")
                        .text("min"),
                )
                .changed();
            changed |= ui
                .add(
                    egui::Slider::new(&mut max, lo..=hi)
                        .step_by(step)
                        .prefix("$")
                        .text("max"),
                )
                .changed();
            if changed {
                state.criteria.amount_range = AmountRange::from_stepped(min, max, lo, hi, step);
            }
            ui.separator();

            let active = state.criteria.active_count(&dataset);
            ui.label(format!("{active} active filter(s)"));
            if ui.button("Reset filters").clicked() {
                state.reset_filters();
                changed = false;
            }
        });

    if changed {
        state.refilter();
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
            if ui.button("Reload").clicked() {
                state.reload();
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(ds) = &state.dataset {
            ui.label(format!(
                "{} projects loaded, {} visible",
                format_count(ds.len()),
                format_count(state.visible_indices.len())
            ));

            ui.separator();

            for format in [ExportFormat::Csv, ExportFormat::Xlsx] {
                if ui.button(format!("Download {}", format.label())).clicked() {
                    save_export(state, format);
                }
            }
        }

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open incentive project data")
        .add_filter("Supported files", &["xlsx", "xlsm", "xls", "ods", "csv", "json", "parquet", "pq"])
        .add_filter("Spreadsheet", &["xlsx", "xlsm", "xls", "ods"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        state.load_source(&path);
    }
}

/// Export failures only touch the status line; the dashboard is unaffected.
fn save_export(state: &mut AppState, format: ExportFormat) {
    let Some(path) = rfd::FileDialog::new()
        .set_title("Save filtered data")
        .set_file_name(format.file_name(&state.config.export_file_stem))
        .add_filter(format.label(), &[format.extension()])
        .save_file()
    else {
        return;
    };

    let result = match state.export_bytes(format) {
        Some(Ok(bytes)) => crate::export::write_bytes(&path, &bytes),
        Some(Err(e)) => Err(e),
        None => return,
    };
    match result {
        Ok(()) => state.status_message = None,
        Err(e) => {
            log::error!("Export to {} failed: {e:#}", path.display());
            state.status_message = Some(format!("Export failed: {e}"));
        }
    }
}
