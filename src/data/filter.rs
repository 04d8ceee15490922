use std::collections::{BTreeMap, BTreeSet};

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use super::model::{Dataset, Field, Record};

// ---------------------------------------------------------------------------
// Ranges
// ---------------------------------------------------------------------------

/// Inclusive calendar-day range. The end covers its whole day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Reversed bounds are swapped.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self { start: end, end: start }
        }
    }

    pub fn contains(&self, dt: NaiveDateTime) -> bool {
        // end of day is 23:59:59; fractional seconds after that fall outside
        let last_second = self
            .end
            .and_time(NaiveTime::MIN)
            .checked_add_signed(Duration::seconds(86_399))
            .unwrap_or(NaiveDateTime::MAX);
        dt >= self.start.and_time(NaiveTime::MIN) && dt <= last_second
    }

    fn covers(&self, lo: NaiveDate, hi: NaiveDate) -> bool {
        self.start <= lo && self.end >= hi
    }
}

/// Inclusive amount range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmountRange {
    pub min: f64,
    pub max: f64,
}

impl Default for AmountRange {
    /// Unbounded: admits every amount.
    fn default() -> Self {
        Self {
            min: f64::NEG_INFINITY,
            max: f64::INFINITY,
        }
    }
}

impl AmountRange {
    /// Reversed bounds are swapped.
    pub fn new(min: f64, max: f64) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    pub fn contains(&self, amount: f64) -> bool {
        amount >= self.min && amount <= self.max
    }

    /// Whether the range spans the dataset's whole (floored/ceiled) amount extent.
    /// Only then do records without an amount pass the amount filter.
    pub fn is_full_extent(&self, dataset: &Dataset) -> bool {
        let (lo, hi) = dataset.amount_bounds();
        self.min <= lo && self.max >= hi
    }

    /// Range picked on a slider over `lo..=hi` that rounds to multiples of
    /// `step` from `lo`. A bound less than one step from an end of the
    /// extent is moved onto that end, so the full extent stays reachable
    /// when `hi - lo` is not a multiple of `step`.
    pub fn from_stepped(min: f64, max: f64, lo: f64, hi: f64, step: f64) -> Self {
        let (min, max) = (min.clamp(lo, hi), max.clamp(lo, hi));
        if step <= 0.0 {
            return Self::new(min, max);
        }
        let min = if min - lo < step { lo } else { min };
        let max = if hi - max < step { hi } else { max };
        Self::new(min, max)
    }
}

// ---------------------------------------------------------------------------
// FilterCriteria
// ---------------------------------------------------------------------------

/// The user's current narrowing constraints.
///
/// Within a categorical field the selected values are OR-ed; across fields
/// every constraint must hold. An empty selection means "no restriction".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterCriteria {
    pub date_range: Option<DateRange>,
    pub programs: BTreeSet<String>,
    pub equipment_types: BTreeSet<String>,
    pub old_makes: BTreeSet<String>,
    pub new_makes: BTreeSet<String>,
    pub amount_range: AmountRange,
}

impl FilterCriteria {
    /// Criteria spanning the whole dataset: every record passes.
    pub fn full_extent(dataset: &Dataset) -> Self {
        let (min, max) = dataset.amount_bounds();
        Self {
            date_range: dataset
                .date_bounds()
                .map(|(start, end)| DateRange::new(start, end)),
            amount_range: AmountRange::new(min, max),
            ..Self::default()
        }
    }

    /// Selected values of a categorical field (`None` for date/amount).
    pub fn selection(&self, field: Field) -> Option<&BTreeSet<String>> {
        match field {
            Field::IncentiveProgram => Some(&self.programs),
            Field::EquipmentType => Some(&self.equipment_types),
            Field::OldEquipmentMake => Some(&self.old_makes),
            Field::NewEquipmentMake => Some(&self.new_makes),
            Field::ProjectCompleted | Field::IncentiveAmount => None,
        }
    }

    pub fn selection_mut(&mut self, field: Field) -> Option<&mut BTreeSet<String>> {
        match field {
            Field::IncentiveProgram => Some(&mut self.programs),
            Field::EquipmentType => Some(&mut self.equipment_types),
            Field::OldEquipmentMake => Some(&mut self.old_makes),
            Field::NewEquipmentMake => Some(&mut self.new_makes),
            Field::ProjectCompleted | Field::IncentiveAmount => None,
        }
    }

    /// Same criteria with any reversed range put back in order.
    pub fn normalized(mut self) -> Self {
        self.date_range = self.date_range.map(|r| DateRange::new(r.start, r.end));
        self.amount_range = AmountRange::new(self.amount_range.min, self.amount_range.max);
        self
    }

    /// Whether the date filter actually narrows this dataset.
    pub fn date_active(&self, dataset: &Dataset) -> bool {
        match (self.date_range, dataset.date_bounds()) {
            (Some(range), Some((lo, hi))) => !range.covers(lo, hi),
            _ => false,
        }
    }

    /// Whether the amount filter actually narrows this dataset.
    pub fn amount_active(&self, dataset: &Dataset) -> bool {
        !self.amount_range.is_full_extent(dataset)
    }

    /// Number of constraints that narrow the dataset, for the UI badge.
    pub fn active_count(&self, dataset: &Dataset) -> usize {
        let categorical = Field::CATEGORICAL
            .iter()
            .filter(|&&f| self.selection(f).is_some_and(|s| !s.is_empty()))
            .count();
        categorical
            + usize::from(self.date_active(dataset))
            + usize::from(self.amount_active(dataset))
    }
}

// ---------------------------------------------------------------------------
// FilterOptions – the values offered by the multiselects
// ---------------------------------------------------------------------------

/// Sorted distinct non-null values of every categorical column.
#[derive(Debug, Clone, Default)]
pub struct FilterOptions {
    values: BTreeMap<Field, BTreeSet<String>>,
}

impl FilterOptions {
    pub fn from_dataset(dataset: &Dataset) -> Self {
        let mut values: BTreeMap<Field, BTreeSet<String>> = BTreeMap::new();
        for rec in &dataset.records {
            for field in Field::CATEGORICAL {
                if let Some(v) = rec.categorical(field) {
                    values.entry(field).or_default().insert(v.to_string());
                }
            }
        }
        Self { values }
    }

    pub fn values(&self, field: Field) -> impl Iterator<Item = &String> + '_ {
        self.values.get(&field).into_iter().flatten()
    }

    pub fn count(&self, field: Field) -> usize {
        self.values.get(&field).map_or(0, BTreeSet::len)
    }
}

// ---------------------------------------------------------------------------
// Filter passes
// ---------------------------------------------------------------------------

/// One narrowing step. Every pass is an independent predicate, so running
/// them in any order yields the same view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterPass {
    DateRange,
    Category(Field),
    Amount,
}

impl FilterPass {
    pub const ALL: [FilterPass; 6] = [
        FilterPass::DateRange,
        FilterPass::Category(Field::IncentiveProgram),
        FilterPass::Category(Field::EquipmentType),
        FilterPass::Category(Field::OldEquipmentMake),
        FilterPass::Category(Field::NewEquipmentMake),
        FilterPass::Amount,
    ];
}

/// Per-application facts derived once from the dataset.
struct PassContext<'c> {
    criteria: &'c FilterCriteria,
    date_active: bool,
    amount_active: bool,
}

impl PassContext<'_> {
    fn keeps(&self, pass: FilterPass, rec: &Record) -> bool {
        match pass {
            FilterPass::DateRange => match (self.date_active, self.criteria.date_range) {
                (true, Some(range)) => rec.project_completed.is_some_and(|dt| range.contains(dt)),
                _ => true,
            },
            FilterPass::Category(field) => match self.criteria.selection(field) {
                Some(selected) if !selected.is_empty() => rec
                    .categorical(field)
                    .is_some_and(|v| selected.contains(v)),
                _ => true,
            },
            FilterPass::Amount => match rec.incentive_amount {
                Some(amount) => self.criteria.amount_range.contains(amount),
                None => !self.amount_active,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// FilteredView
// ---------------------------------------------------------------------------

/// The records of a dataset that satisfy some criteria, in dataset order.
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    dataset: &'a Dataset,
    indices: Vec<usize>,
}

impl PartialEq for FilteredView<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.dataset, other.dataset) && self.indices == other.indices
    }
}

impl<'a> FilteredView<'a> {
    /// Every record of the dataset.
    pub fn all(dataset: &'a Dataset) -> Self {
        Self {
            dataset,
            indices: (0..dataset.len()).collect(),
        }
    }

    /// Rebuild a view from stored indices; out-of-range indices are dropped.
    pub fn from_indices(dataset: &'a Dataset, mut indices: Vec<usize>) -> Self {
        indices.retain(|&i| i < dataset.len());
        Self { dataset, indices }
    }

    pub fn dataset(&self) -> &'a Dataset {
        self.dataset
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &'a Record> + '_ {
        let dataset = self.dataset;
        self.indices.iter().filter_map(move |&i| dataset.records.get(i))
    }

    /// Narrow this view further with `criteria`.
    pub fn narrow(&self, criteria: &FilterCriteria) -> FilteredView<'a> {
        self.narrow_in_order(criteria, &FilterPass::ALL)
    }

    /// Narrow with the given passes, each one operating on the previous result.
    pub fn narrow_in_order(&self, criteria: &FilterCriteria, passes: &[FilterPass]) -> FilteredView<'a> {
        let ctx = PassContext {
            criteria,
            date_active: criteria.date_active(self.dataset),
            amount_active: criteria.amount_active(self.dataset),
        };
        let records = &self.dataset.records;

        let mut indices = self.indices.clone();
        for &pass in passes {
            indices.retain(|&i| records.get(i).is_some_and(|rec| ctx.keeps(pass, rec)));
        }
        FilteredView {
            dataset: self.dataset,
            indices,
        }
    }
}

/// Return the records of `dataset` that pass every constraint in `criteria`.
///
/// A record passes when:
/// * the date range is inactive, or its completion date lies inside it
/// * each non-empty categorical selection contains its value
/// * its amount lies in the amount range, or it has no amount and the range
///   spans the whole dataset
pub fn apply<'a>(dataset: &'a Dataset, criteria: &FilterCriteria) -> FilteredView<'a> {
    FilteredView::all(dataset).narrow(criteria)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn rec(when: Option<NaiveDate>, program: &str, kind: &str, make: Option<&str>, amount: Option<f64>) -> Record {
        Record {
            project_completed: when.map(|d| d.and_time(NaiveTime::MIN)),
            incentive_program: Some(program.to_string()),
            equipment_type: Some(kind.to_string()),
            old_equipment_make: Some("Clark".to_string()),
            new_equipment_make: make.map(str::to_string),
            incentive_amount: amount,
            extra: Vec::new(),
        }
    }

    fn scenario() -> Dataset {
        Dataset::from_records(vec![
            rec(Some(date(2021, 3, 1)), "A", "Forklift", Some("Toyota"), Some(1000.0)),
            rec(Some(date(2022, 5, 10)), "B", "Forklift", Some("Hyster"), Some(2000.0)),
            rec(Some(date(2022, 7, 20)), "A", "Sweeper", Some("Tennant"), None),
        ])
    }

    fn set(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn full_extent_keeps_everything() {
        let ds = scenario();
        let criteria = FilterCriteria::full_extent(&ds);
        assert_eq!(criteria.amount_range, AmountRange::new(1000.0, 2000.0));
        assert_eq!(apply(&ds, &criteria), FilteredView::all(&ds));
        assert_eq!(apply(&ds, &FilterCriteria::default()).len(), 3);
        assert_eq!(criteria.active_count(&ds), 0);
    }

    #[test]
    fn program_selection() {
        let ds = scenario();
        let criteria = FilterCriteria {
            programs: set(&["A"]),
            ..FilterCriteria::full_extent(&ds)
        };
        let view = apply(&ds, &criteria);
        assert_eq!(view.indices(), &[0, 2]);
    }

    #[test]
    fn date_range_end_covers_whole_day() {
        let mut ds = scenario();
        ds.records[1].project_completed = date(2022, 12, 31).and_hms_opt(18, 45, 0);
        let criteria = FilterCriteria {
            date_range: Some(DateRange::new(date(2022, 1, 1), date(2022, 12, 31))),
            ..FilterCriteria::default()
        };
        assert_eq!(apply(&ds, &criteria).indices(), &[1, 2]);
    }

    #[test]
    fn null_dates_only_drop_when_date_filter_narrows() {
        let mut ds = scenario();
        ds.records.push(rec(None, "C", "Loader", None, Some(1500.0)));

        let full = FilterCriteria::full_extent(&ds);
        assert_eq!(apply(&ds, &full).len(), 4);

        let narrowed = FilterCriteria {
            date_range: Some(DateRange::new(date(2021, 1, 1), date(2022, 6, 1))),
            ..full
        };
        assert_eq!(apply(&ds, &narrowed).indices(), &[0, 1]);
    }

    #[test]
    fn null_amounts_only_drop_when_amount_filter_narrows() {
        let ds = scenario();
        let narrowed = FilterCriteria {
            amount_range: AmountRange::new(1000.0, 1500.0),
            ..FilterCriteria::full_extent(&ds)
        };
        assert!(narrowed.amount_active(&ds));
        assert_eq!(apply(&ds, &narrowed).indices(), &[0]);
    }

    #[test]
    fn stepped_slider_bounds_reach_the_full_extent() {
        let mut ds = scenario();
        ds.records[1].incentive_amount = Some(2034.0);
        let (lo, hi) = ds.amount_bounds();
        assert_eq!((lo, hi), (1000.0, 2034.0));

        // a slider stepping by 100 from 1000 tops out at 2000
        let range = AmountRange::from_stepped(1000.0, 2000.0, lo, hi, 100.0);
        assert_eq!(range, AmountRange::new(1000.0, 2034.0));
        let criteria = FilterCriteria {
            amount_range: range,
            ..FilterCriteria::full_extent(&ds)
        };
        assert!(!criteria.amount_active(&ds));
        assert_eq!(apply(&ds, &criteria).indices(), &[0, 1, 2]);

        assert_eq!(
            AmountRange::from_stepped(1099.9, 1900.0, lo, hi, 100.0),
            AmountRange::new(1000.0, 1900.0)
        );
        assert_eq!(
            AmountRange::from_stepped(1100.0, 1934.0, lo, hi, 100.0),
            AmountRange::new(1100.0, 1934.0)
        );
        assert_eq!(
            AmountRange::from_stepped(1200.0, 1300.0, lo, hi, 0.0),
            AmountRange::new(1200.0, 1300.0)
        );
    }

    #[test]
    fn null_category_excluded_by_non_empty_selection() {
        let mut ds = scenario();
        ds.records[0].new_equipment_make = None;
        let criteria = FilterCriteria {
            new_makes: set(&["Toyota", "Hyster", "Tennant"]),
            ..FilterCriteria::default()
        };
        assert_eq!(apply(&ds, &criteria).indices(), &[1, 2]);
    }

    #[test]
    fn or_within_field_and_across_fields() {
        let ds = scenario();
        let criteria = FilterCriteria {
            programs: set(&["A", "B"]),
            equipment_types: set(&["Forklift"]),
            ..FilterCriteria::default()
        };
        assert_eq!(apply(&ds, &criteria).indices(), &[0, 1]);
    }

    #[test]
    fn pass_order_does_not_matter() {
        let ds = scenario();
        let criteria = FilterCriteria {
            date_range: Some(DateRange::new(date(2022, 1, 1), date(2022, 12, 31))),
            programs: set(&["A", "B"]),
            equipment_types: set(&["Forklift", "Sweeper"]),
            amount_range: AmountRange::new(1500.0, 5000.0),
            ..FilterCriteria::default()
        };
        let forward = FilteredView::all(&ds).narrow_in_order(&criteria, &FilterPass::ALL);
        let mut reversed = FilterPass::ALL;
        reversed.reverse();
        let backward = FilteredView::all(&ds).narrow_in_order(&criteria, &reversed);
        let mut rotated = FilterPass::ALL;
        rotated.rotate_left(3);
        let middle = FilteredView::all(&ds).narrow_in_order(&criteria, &rotated);

        assert_eq!(forward, backward);
        assert_eq!(forward, middle);
        assert_eq!(forward.indices(), &[1]);
    }

    #[test]
    fn reapplying_is_idempotent() {
        let ds = scenario();
        let criteria = FilterCriteria {
            programs: set(&["A"]),
            ..FilterCriteria::full_extent(&ds)
        };
        let once = apply(&ds, &criteria);
        assert_eq!(once.narrow(&criteria), once);
    }

    #[test]
    fn nothing_matches_is_empty_not_error() {
        let ds = scenario();
        let criteria = FilterCriteria {
            programs: set(&["Z"]),
            ..FilterCriteria::default()
        };
        assert!(apply(&ds, &criteria).is_empty());

        let empty = Dataset::default();
        assert!(apply(&empty, &FilterCriteria::full_extent(&empty)).is_empty());
    }

    #[test]
    fn reversed_ranges_are_normalized() {
        let criteria = FilterCriteria {
            date_range: Some(DateRange {
                start: date(2022, 12, 31),
                end: date(2022, 1, 1),
            }),
            amount_range: AmountRange { min: 10.0, max: 1.0 },
            ..FilterCriteria::default()
        }
        .normalized();
        assert_eq!(criteria.date_range.map(|r| r.start), Some(date(2022, 1, 1)));
        assert_eq!(criteria.amount_range, AmountRange::new(1.0, 10.0));
    }

    #[test]
    fn options_are_sorted_and_distinct() {
        let opts = FilterOptions::from_dataset(&scenario());
        let programs: Vec<&String> = opts.values(Field::IncentiveProgram).collect();
        assert_eq!(programs, vec!["A", "B"]);
        assert_eq!(opts.count(Field::EquipmentType), 2);
    }
}
