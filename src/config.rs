use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Names a JSON config file to layer over the defaults.
pub const CONFIG_ENV: &str = "AIRBOARD_CONFIG";
/// Overrides the source data path.
pub const DATA_ENV: &str = "AIRBOARD_DATA";
/// Overrides the workbook sheet name.
pub const SHEET_ENV: &str = "AIRBOARD_SHEET";

/// Dashboard settings. Every field is optional in the config file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub source_path: PathBuf,
    pub sheet_name: String,
    pub top_n_makes: usize,
    /// Step of the amount range sliders.
    pub amount_step: f64,
    pub export_file_stem: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            source_path: PathBuf::from("data/Airboard Program Summary Data.xlsx"),
            sheet_name: "Air Board Program Summary".to_string(),
            top_n_makes: crate::data::summary::TOP_MAKES,
            amount_step: 100.0,
            export_file_stem: "filtered_data".to_string(),
        }
    }
}

impl DashboardConfig {
    /// Defaults, then the file named by `AIRBOARD_CONFIG`, then the
    /// `AIRBOARD_DATA` / `AIRBOARD_SHEET` overrides.
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        if let Some(path) = std::env::var_os(DATA_ENV) {
            config.source_path = PathBuf::from(path);
        }
        if let Ok(sheet) = std::env::var(SHEET_ENV) {
            config.sheet_name = sheet;
        }
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = DashboardConfig::from_json(r#"{ "sheet_name": "Projects", "amount_step": 50 }"#)
            .unwrap();
        assert_eq!(config.sheet_name, "Projects");
        assert_eq!(config.amount_step, 50.0);
        assert_eq!(config.top_n_makes, 10);
        assert_eq!(config.source_path, DashboardConfig::default().source_path);
    }

    #[test]
    fn bad_json_is_an_error() {
        assert!(DashboardConfig::from_json("{ not json").is_err());
        assert!(DashboardConfig::from_file(Path::new("/nonexistent/airboard.json")).is_err());
    }
}
