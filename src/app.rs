use eframe::egui;

use crate::config::DashboardConfig;
use crate::state::AppState;
use crate::ui::{charts, panels, table};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct AirboardApp {
    pub state: AppState,
}

impl AirboardApp {
    /// Build the app and load the configured source once.
    pub fn new(config: DashboardConfig) -> Self {
        let mut state = AppState::new(config);
        let path = state.config.source_path.clone();
        state.load_source(&path);
        Self { state }
    }
}

impl eframe::App for AirboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: filters ----
        egui::SidePanel::left("filter_panel")
            .default_width(260.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        if self.state.dataset.is_none() {
            egui::CentralPanel::default().show(ctx, |ui| {
                charts::empty_message(ui, &self.state);
            });
            return;
        }

        // ---- Bottom panel: filtered table ----
        egui::TopBottomPanel::bottom("table_panel")
            .resizable(true)
            .default_height(280.0)
            .show(ctx, |ui| {
                table::filtered_table(ui, &self.state);
            });

        // ---- Central panel: KPIs and charts ----
        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                charts::dashboard(ui, &self.state);
            });
        });
    }
}
