use eframe::egui::{self, RichText, Ui};
use egui_extras::{Column, TableBuilder};

use crate::state::AppState;

const ROW_HEIGHT: f32 = 18.0;

/// The filtered records, every column in source order.
pub fn filtered_table(ui: &mut Ui, state: &AppState) {
    let Some(dataset) = state.dataset.as_deref() else {
        return;
    };

    ui.horizontal(|ui: &mut Ui| {
        ui.heading("Filtered Data");
        ui.label(format!("{} rows", state.visible_indices.len()));
    });

    let columns = &dataset.columns;
    TableBuilder::new(ui)
        .striped(true)
        .resizable(true)
        .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
        .columns(Column::auto().at_least(80.0).clip(true), columns.len())
        .header(ROW_HEIGHT + 4.0, |mut header| {
            for column in columns {
                header.col(|ui: &mut Ui| {
                    ui.label(RichText::new(&column.label).strong());
                });
            }
        })
        .body(|body| {
            body.rows(ROW_HEIGHT, state.visible_indices.len(), |mut row| {
                let record = state
                    .visible_indices
                    .get(row.index())
                    .and_then(|&i| dataset.records.get(i));
                let Some(record) = record else {
                    return;
                };
                for column in columns {
                    let text = record.cell(&column.source).to_string();
                    row.col(|ui: &mut Ui| {
                        ui.label(text);
                    });
                }
            });
        });
}
