use std::path::Path;
use std::sync::Arc;

use crate::color::ColorMap;
use crate::config::DashboardConfig;
use crate::data::cache::DatasetCache;
use crate::data::filter::{apply, FilterCriteria, FilterOptions, FilteredView};
use crate::data::loader::load_file;
use crate::data::model::{Dataset, Field};
use crate::data::summary::{summarize_with, Summary};
use crate::error::ExportError;
use crate::export::ExportFormat;

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The state of one dashboard session, independent of rendering.
///
/// The dataset is shared and read-only; criteria, view and summary belong to
/// this session alone.
pub struct AppState {
    pub config: DashboardConfig,

    cache: DatasetCache,

    /// Loaded dataset (None until a load succeeds).
    pub dataset: Option<Arc<Dataset>>,

    /// Values offered by the multiselects.
    pub options: FilterOptions,

    /// Current filter selections.
    pub criteria: FilterCriteria,

    /// Indices of records passing the current filters (cached).
    pub visible_indices: Vec<usize>,

    /// Aggregates of the visible records.
    pub summary: Summary,

    /// Colour per incentive program.
    pub program_colors: ColorMap,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            config,
            cache: DatasetCache::new(),
            dataset: None,
            options: FilterOptions::default(),
            criteria: FilterCriteria::default(),
            visible_indices: Vec::new(),
            summary: Summary::default(),
            program_colors: ColorMap::default(),
            status_message: None,
        }
    }

    /// Load (or fetch from cache) the dataset at `path`.
    ///
    /// A failure leaves the session without a dataset; nothing downstream
    /// renders until a load succeeds.
    pub fn load_source(&mut self, path: &Path) {
        let sheet = self.config.sheet_name.clone();
        match self.cache.get_or_load(path, |p| load_file(p, &sheet)) {
            Ok(dataset) => {
                self.config.source_path = path.to_path_buf();
                self.set_dataset(dataset);
            }
            Err(e) => {
                log::error!("Failed to load {}: {e:#}", path.display());
                self.dataset = None;
                self.visible_indices.clear();
                self.summary = Summary::default();
                self.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }

    /// Re-read the current source, bypassing the cache.
    pub fn reload(&mut self) {
        self.cache.invalidate();
        let path = self.config.source_path.clone();
        self.load_source(&path);
    }

    /// Ingest a newly loaded dataset and reset filters to its full extent.
    pub fn set_dataset(&mut self, dataset: Arc<Dataset>) {
        self.options = FilterOptions::from_dataset(&dataset);
        self.program_colors = ColorMap::new(self.options.values(Field::IncentiveProgram));
        self.criteria = FilterCriteria::full_extent(&dataset);
        self.dataset = Some(dataset);
        self.status_message = None;
        self.refilter();
    }

    /// Recompute `visible_indices` and `summary` after a criteria change.
    pub fn refilter(&mut self) {
        let Some(ds) = &self.dataset else {
            return;
        };
        let criteria = self.criteria.clone().normalized();
        let view = apply(ds, &criteria);
        self.summary = summarize_with(&view, self.config.top_n_makes);
        self.visible_indices = view.indices().to_vec();
        self.criteria = criteria;
    }

    /// The visible records as a view over the dataset.
    pub fn view(&self) -> Option<FilteredView<'_>> {
        self.dataset
            .as_deref()
            .map(|ds| FilteredView::from_indices(ds, self.visible_indices.clone()))
    }

    /// Back to the full extent of the loaded dataset.
    pub fn reset_filters(&mut self) {
        if let Some(ds) = &self.dataset {
            self.criteria = FilterCriteria::full_extent(ds);
            self.refilter();
        }
    }

    /// Toggle a single value in a categorical selection.
    pub fn toggle_selection(&mut self, field: Field, value: &str) {
        if let Some(selected) = self.criteria.selection_mut(field) {
            if !selected.remove(value) {
                selected.insert(value.to_string());
            }
            self.refilter();
        }
    }

    /// Select every known value of a categorical field.
    ///
    /// Unlike an empty selection this excludes records with no value.
    pub fn select_all(&mut self, field: Field) {
        if let Some(selected) = self.criteria.selection_mut(field) {
            selected.extend(self.options.values(field).cloned());
            self.refilter();
        }
    }

    /// Clear a categorical selection (no restriction).
    pub fn clear_selection(&mut self, field: Field) {
        if let Some(selected) = self.criteria.selection_mut(field) {
            selected.clear();
            self.refilter();
        }
    }

    /// Encode the visible records; `None` without a dataset.
    pub fn export_bytes(&self, format: ExportFormat) -> Option<Result<Vec<u8>, ExportError>> {
        self.view().map(|view| format.encode(&view))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn csv_source() -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(
            file,
            "Project Completed,Incentive Program,Equipment Type,Old Equipment Make,New Equipment Make,Incentive Amount"
        )
        .unwrap();
        writeln!(file, "2021-03-01,A,Forklift,Clark,Toyota,1000").unwrap();
        writeln!(file, "2022-05-10,B,Forklift,Clark,Hyster,2000").unwrap();
        writeln!(file, "2022-07-20,A,Sweeper,Tennant,Tennant,").unwrap();
        file
    }

    #[test]
    fn load_sets_full_extent_and_summary() {
        let file = csv_source();
        let mut state = AppState::new(DashboardConfig::default());
        state.load_source(file.path());

        assert!(state.status_message.is_none());
        assert_eq!(state.visible_indices, vec![0, 1, 2]);
        assert_eq!(state.summary.total_incentive, 3000.0);
        assert_eq!(state.options.count(Field::IncentiveProgram), 2);
    }

    #[test]
    fn toggling_and_clearing_refilters() {
        let file = csv_source();
        let mut state = AppState::new(DashboardConfig::default());
        state.load_source(file.path());

        state.toggle_selection(Field::IncentiveProgram, "A");
        assert_eq!(state.visible_indices, vec![0, 2]);
        assert_eq!(state.summary.total_incentive, 1000.0);

        state.toggle_selection(Field::IncentiveProgram, "A");
        assert_eq!(state.visible_indices.len(), 3);

        state.toggle_selection(Field::EquipmentType, "Sweeper");
        assert_eq!(state.visible_indices, vec![2]);
        state.clear_selection(Field::EquipmentType);
        assert_eq!(state.visible_indices.len(), 3);
    }

    #[test]
    fn select_all_selects_every_known_value() {
        let file = csv_source();
        let mut state = AppState::new(DashboardConfig::default());
        state.load_source(file.path());
        assert_eq!(state.visible_indices.len(), 3);

        state.select_all(Field::OldEquipmentMake);
        assert_eq!(state.criteria.old_makes.len(), 2);
        assert_eq!(state.visible_indices.len(), 3);
    }

    #[test]
    fn failed_load_clears_dataset_and_reports() {
        let file = csv_source();
        let mut state = AppState::new(DashboardConfig::default());
        state.load_source(file.path());
        state.load_source(Path::new("/nonexistent/projects.csv"));

        assert!(state.dataset.is_none());
        assert!(state.view().is_none());
        assert!(state.status_message.as_deref().is_some_and(|m| m.starts_with("Error")));
        assert!(state.export_bytes(ExportFormat::Csv).is_none());
    }

    #[test]
    fn export_covers_visible_rows_only() {
        let file = csv_source();
        let mut state = AppState::new(DashboardConfig::default());
        state.load_source(file.path());
        state.toggle_selection(Field::NewEquipmentMake, "Hyster");

        let bytes = state.export_bytes(ExportFormat::Csv).unwrap().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("Hyster"));
    }
}
