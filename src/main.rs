use airboard_dash::app::AirboardApp;
use airboard_dash::config::DashboardConfig;
use anyhow::Result;
use eframe::egui;

fn main() -> Result<()> {
    env_logger::init();

    let config = DashboardConfig::from_env()?;
    log::info!("Data source: {}", config.source_path.display());

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([800.0, 500.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Air Board Program Summary Dashboard",
        options,
        Box::new(|_cc| Ok(Box::new(AirboardApp::new(config)))),
    )
    .map_err(|e| anyhow::anyhow!("running dashboard: {e}"))
}
