use std::collections::{BTreeMap, HashMap};

use chrono::Datelike;

use super::filter::FilteredView;
use super::model::Record;

/// How many makes the "top new makes" ranking keeps.
pub const TOP_MAKES: usize = 10;

/// KPI scalars and grouped aggregates of a filtered view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    pub total_count: usize,
    /// Sum of non-null amounts.
    pub total_incentive: f64,
    /// Mean of non-null amounts; 0 when there are none.
    pub average_incentive: f64,
    /// Ascending by year. Records without a date are left out.
    pub incentive_by_year: Vec<(i32, f64)>,
    /// Descending by sum; ties keep first-encountered order.
    pub incentive_by_equipment_type: Vec<(String, f64)>,
    /// At most `TOP_MAKES` entries, descending by count; ties keep first-encountered order.
    pub top_new_makes_by_count: Vec<(String, usize)>,
    /// Non-null amounts per program, programs in first-encountered order.
    pub incentive_distribution_by_program: Vec<(String, Vec<f64>)>,
}

/// Summarize a view with the default top-makes cap.
pub fn summarize(view: &FilteredView<'_>) -> Summary {
    summarize_with(view, TOP_MAKES)
}

/// Summarize a view, keeping at most `top_n` makes in the ranking.
pub fn summarize_with(view: &FilteredView<'_>, top_n: usize) -> Summary {
    let records: Vec<&Record> = view.records().collect();

    let amounts: Vec<f64> = records.iter().filter_map(|r| r.incentive_amount).collect();
    let total_incentive: f64 = amounts.iter().sum();
    let average_incentive = if amounts.is_empty() {
        0.0
    } else {
        total_incentive / amounts.len() as f64
    };

    let mut by_year: BTreeMap<i32, f64> = BTreeMap::new();
    for rec in &records {
        if let Some(dt) = rec.project_completed {
            *by_year.entry(dt.year()).or_default() += rec.incentive_amount.unwrap_or(0.0);
        }
    }

    let mut by_type = grouped(&records, |r| r.equipment_type.as_deref(), || 0.0_f64, |sum, r| {
        *sum += r.incentive_amount.unwrap_or(0.0);
    });
    by_type.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut by_make = grouped(&records, |r| r.new_equipment_make.as_deref(), || 0usize, |n, _| {
        *n += 1;
    });
    by_make.sort_by(|a, b| b.1.cmp(&a.1));
    by_make.truncate(top_n);

    let by_program = grouped(&records, |r| r.incentive_program.as_deref(), Vec::<f64>::new, |v, r| {
        if let Some(amount) = r.incentive_amount {
            v.push(amount);
        }
    });

    Summary {
        total_count: records.len(),
        total_incentive,
        average_incentive,
        incentive_by_year: by_year.into_iter().collect(),
        incentive_by_equipment_type: by_type,
        top_new_makes_by_count: by_make,
        incentive_distribution_by_program: by_program,
    }
}

/// Fold records into groups keyed by a text column, in first-encountered
/// order. Records whose key is null are skipped.
fn grouped<'r, T>(
    records: &[&'r Record],
    key: impl Fn(&'r Record) -> Option<&'r str>,
    init: impl Fn() -> T,
    mut fold: impl FnMut(&mut T, &'r Record),
) -> Vec<(String, T)> {
    let mut slots: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(String, T)> = Vec::new();
    for &rec in records {
        let Some(k) = key(rec) else {
            continue;
        };
        let slot = *slots.entry(k).or_insert_with(|| {
            groups.push((k.to_string(), init()));
            groups.len() - 1
        });
        if let Some((_, acc)) = groups.get_mut(slot) {
            fold(acc, rec);
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::{apply, FilterCriteria};
    use crate::data::model::Dataset;
    use chrono::NaiveDate;
    use std::collections::BTreeSet;

    fn rec(ymd: (i32, u32, u32), program: &str, kind: &str, make: Option<&str>, amount: Option<f64>) -> Record {
        Record {
            project_completed: NaiveDate::from_ymd_opt(ymd.0, ymd.1, ymd.2)
                .and_then(|d| d.and_hms_opt(0, 0, 0)),
            incentive_program: Some(program.to_string()),
            equipment_type: Some(kind.to_string()),
            new_equipment_make: make.map(str::to_string),
            incentive_amount: amount,
            ..Record::default()
        }
    }

    fn scenario() -> Dataset {
        Dataset::from_records(vec![
            rec((2021, 3, 1), "A", "Forklift", Some("Toyota"), Some(1000.0)),
            rec((2022, 5, 10), "B", "Forklift", Some("Hyster"), Some(2000.0)),
            rec((2022, 7, 20), "A", "Sweeper", None, None),
        ])
    }

    #[test]
    fn full_view_matches_reference_figures() {
        let ds = scenario();
        let summary = summarize(&apply(&ds, &FilterCriteria::full_extent(&ds)));

        assert_eq!(summary.total_count, 3);
        assert_eq!(summary.total_incentive, 3000.0);
        assert_eq!(summary.average_incentive, 1500.0);
        assert_eq!(summary.incentive_by_year, vec![(2021, 1000.0), (2022, 2000.0)]);
        assert_eq!(
            summary.incentive_by_equipment_type,
            vec![("Forklift".to_string(), 3000.0), ("Sweeper".to_string(), 0.0)]
        );
        assert_eq!(
            summary.top_new_makes_by_count,
            vec![("Toyota".to_string(), 1), ("Hyster".to_string(), 1)]
        );
        assert_eq!(
            summary.incentive_distribution_by_program,
            vec![("A".to_string(), vec![1000.0]), ("B".to_string(), vec![2000.0])]
        );
    }

    #[test]
    fn program_filter_total() {
        let ds = scenario();
        let criteria = FilterCriteria {
            programs: BTreeSet::from(["A".to_string()]),
            ..FilterCriteria::full_extent(&ds)
        };
        let view = apply(&ds, &criteria);
        assert_eq!(view.len(), 2);
        assert_eq!(summarize(&view).total_incentive, 1000.0);
    }

    #[test]
    fn empty_view_yields_zeros() {
        let ds = Dataset::default();
        let summary = summarize(&apply(&ds, &FilterCriteria::default()));
        assert_eq!(summary, Summary::default());
        assert_eq!(summary.average_incentive, 0.0);
    }

    #[test]
    fn equipment_totals_add_up() {
        let ds = scenario();
        let summary = summarize(&apply(&ds, &FilterCriteria::default()));
        let by_type: f64 = summary.incentive_by_equipment_type.iter().map(|(_, v)| v).sum();
        assert_eq!(by_type, summary.total_incentive);
    }

    #[test]
    fn top_makes_capped_and_ties_keep_encounter_order() {
        let mut records = Vec::new();
        for i in 0..12 {
            records.push(rec((2020, 1, 1), "A", "Forklift", Some(format!("Make{i:02}").as_str()), Some(1.0)));
        }
        // Make05 appears twice, so it leads; the rest tie at one
        records.push(rec((2020, 1, 2), "A", "Forklift", Some("Make05"), Some(1.0)));
        let ds = Dataset::from_records(records);

        let summary = summarize(&apply(&ds, &FilterCriteria::default()));
        let names: Vec<&str> = summary
            .top_new_makes_by_count
            .iter()
            .map(|(n, _)| n.as_str())
            .collect();
        assert_eq!(names.len(), TOP_MAKES);
        assert_eq!(names[0], "Make05");
        assert_eq!(&names[1..4], &["Make00", "Make01", "Make02"]);
        assert!(!names.contains(&"Make10"));
    }

    #[test]
    fn equipment_ties_keep_encounter_order() {
        let ds = Dataset::from_records(vec![
            rec((2020, 1, 1), "A", "Sweeper", None, Some(500.0)),
            rec((2020, 1, 1), "A", "Loader", None, Some(500.0)),
            rec((2020, 1, 1), "A", "Forklift", None, Some(900.0)),
        ]);
        let summary = summarize(&apply(&ds, &FilterCriteria::default()));
        let order: Vec<&str> = summary
            .incentive_by_equipment_type
            .iter()
            .map(|(n, _)| n.as_str())
            .collect();
        assert_eq!(order, vec!["Forklift", "Sweeper", "Loader"]);
    }
}
