use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use super::coerce;
use crate::error::LoadError;

// ---------------------------------------------------------------------------
// CellValue – a single raw cell as read from the source
// ---------------------------------------------------------------------------

/// A dynamically-typed cell, as produced by the format-specific readers.
///
/// The required columns are coerced into typed [`Record`] fields at load
/// time; every other column keeps its cells in this form.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
    Null,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::DateTime(dt) => write!(f, "{}", format_datetime(dt)),
            CellValue::Null => Ok(()),
        }
    }
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

/// Midnight timestamps print as a bare date.
pub fn format_datetime(dt: &NaiveDateTime) -> String {
    if dt.time() == NaiveTime::MIN {
        dt.format("%Y-%m-%d").to_string()
    } else {
        dt.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

// ---------------------------------------------------------------------------
// Field – the fixed schema
// ---------------------------------------------------------------------------

/// The six columns the dashboard filters and aggregates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    ProjectCompleted,
    IncentiveProgram,
    EquipmentType,
    OldEquipmentMake,
    NewEquipmentMake,
    IncentiveAmount,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::ProjectCompleted,
        Field::IncentiveProgram,
        Field::EquipmentType,
        Field::OldEquipmentMake,
        Field::NewEquipmentMake,
        Field::IncentiveAmount,
    ];

    /// The text columns offered as multiselect filters.
    pub const CATEGORICAL: [Field; 4] = [
        Field::IncentiveProgram,
        Field::EquipmentType,
        Field::OldEquipmentMake,
        Field::NewEquipmentMake,
    ];

    /// Column label in the source file (exact match after trimming).
    pub fn label(self) -> &'static str {
        match self {
            Field::ProjectCompleted => "Project Completed",
            Field::IncentiveProgram => "Incentive Program",
            Field::EquipmentType => "Equipment Type",
            Field::OldEquipmentMake => "Old Equipment Make",
            Field::NewEquipmentMake => "New Equipment Make",
            Field::IncentiveAmount => "Incentive Amount",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Record – one row of the dataset
// ---------------------------------------------------------------------------

/// A single incentive project.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    pub project_completed: Option<NaiveDateTime>,
    pub incentive_program: Option<String>,
    pub equipment_type: Option<String>,
    pub old_equipment_make: Option<String>,
    pub new_equipment_make: Option<String>,
    pub incentive_amount: Option<f64>,
    /// Passthrough cells, aligned with [`Dataset::extra_columns`].
    pub extra: Vec<CellValue>,
}

impl Record {
    /// Value of a text column. `None` for the date and amount fields.
    pub fn categorical(&self, field: Field) -> Option<&str> {
        match field {
            Field::IncentiveProgram => self.incentive_program.as_deref(),
            Field::EquipmentType => self.equipment_type.as_deref(),
            Field::OldEquipmentMake => self.old_equipment_make.as_deref(),
            Field::NewEquipmentMake => self.new_equipment_make.as_deref(),
            Field::ProjectCompleted | Field::IncentiveAmount => None,
        }
    }

    /// The record's value in `column`, re-wrapped as a cell for display/export.
    pub fn cell(&self, column: &ColumnSource) -> CellValue {
        match column {
            ColumnSource::Field(Field::ProjectCompleted) => self
                .project_completed
                .map_or(CellValue::Null, CellValue::DateTime),
            ColumnSource::Field(Field::IncentiveAmount) => self
                .incentive_amount
                .map_or(CellValue::Null, CellValue::Float),
            ColumnSource::Field(field) => self
                .categorical(*field)
                .map_or(CellValue::Null, |s| CellValue::String(s.to_string())),
            ColumnSource::Extra(i) => self.extra.get(*i).cloned().unwrap_or(CellValue::Null),
        }
    }
}

// ---------------------------------------------------------------------------
// Columns – source order, resolved once at load
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnSource {
    Field(Field),
    /// Index into [`Record::extra`].
    Extra(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Trimmed label.
    pub label: String,
    pub source: ColumnSource,
}

/// Raw header + cells, the common output of every format reader.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

/// How many values the loader had to turn into nulls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub rows: usize,
    pub unparseable_dates: usize,
    pub unparseable_amounts: usize,
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded table
// ---------------------------------------------------------------------------

/// The full parsed dataset. Immutable after load.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub records: Vec<Record>,
    /// Every column in source order.
    pub columns: Vec<ColumnSpec>,
    /// Labels of the passthrough columns, in source order.
    pub extra_columns: Vec<String>,
    pub report: LoadReport,
}

impl Dataset {
    /// Resolve the fixed schema against a raw table and coerce every row.
    ///
    /// Labels are trimmed before matching. A label that repeats a required
    /// column is kept as passthrough; only the first occurrence is typed.
    pub fn from_table(table: RawTable) -> Result<Self, LoadError> {
        let labels: Vec<String> = table.headers.iter().map(|h| h.trim().to_string()).collect();

        let mut field_pos = [None; 6];
        let mut columns = Vec::with_capacity(labels.len());
        let mut extra_columns = Vec::new();
        let mut extra_pos = Vec::new();

        for (idx, label) in labels.iter().enumerate() {
            let field = Field::ALL
                .iter()
                .position(|f| f.label() == label.as_str())
                .filter(|&slot| field_pos[slot].is_none());
            let source = match field {
                Some(slot) => {
                    field_pos[slot] = Some(idx);
                    ColumnSource::Field(Field::ALL[slot])
                }
                None => {
                    extra_columns.push(label.clone());
                    extra_pos.push(idx);
                    ColumnSource::Extra(extra_pos.len() - 1)
                }
            };
            columns.push(ColumnSpec {
                label: label.clone(),
                source,
            });
        }

        let mut resolved = [0usize; 6];
        for (slot, field) in Field::ALL.iter().enumerate() {
            resolved[slot] = field_pos[slot].ok_or_else(|| LoadError::MissingColumn {
                column: field.label(),
                available: labels.clone(),
            })?;
        }
        let [date_idx, program_idx, type_idx, old_idx, new_idx, amount_idx] = resolved;

        let mut report = LoadReport {
            rows: table.rows.len(),
            ..LoadReport::default()
        };
        let null = CellValue::Null;

        let records = table
            .rows
            .into_iter()
            .map(|row| {
                let cell = |i: usize| row.get(i).unwrap_or(&null);

                let project_completed = coerce::to_datetime(cell(date_idx));
                if project_completed.is_none() && !coerce::is_blank(cell(date_idx)) {
                    report.unparseable_dates += 1;
                }
                let incentive_amount = coerce::to_amount(cell(amount_idx));
                if incentive_amount.is_none() && !coerce::is_blank(cell(amount_idx)) {
                    report.unparseable_amounts += 1;
                }

                Record {
                    project_completed,
                    incentive_program: coerce::to_text(cell(program_idx)),
                    equipment_type: coerce::to_text(cell(type_idx)),
                    old_equipment_make: coerce::to_text(cell(old_idx)),
                    new_equipment_make: coerce::to_text(cell(new_idx)),
                    incentive_amount,
                    extra: extra_pos.iter().map(|&i| cell(i).clone()).collect(),
                }
            })
            .collect();

        Ok(Dataset {
            records,
            columns,
            extra_columns,
            report,
        })
    }

    /// Build a dataset straight from typed records (no passthrough columns).
    pub fn from_records(records: Vec<Record>) -> Self {
        let columns = Field::ALL
            .iter()
            .map(|&f| ColumnSpec {
                label: f.label().to_string(),
                source: ColumnSource::Field(f),
            })
            .collect();
        Dataset {
            report: LoadReport {
                rows: records.len(),
                ..LoadReport::default()
            },
            records,
            columns,
            extra_columns: Vec::new(),
        }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Earliest and latest completion date, if any record has one.
    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let mut dates = self
            .records
            .iter()
            .filter_map(|r| r.project_completed.map(|dt| dt.date()));
        let first = dates.next()?;
        Some(dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
    }

    /// Amount extent floored/ceiled to whole numbers; `(0, 0)` with no amounts.
    pub fn amount_bounds(&self) -> (f64, f64) {
        let mut amounts = self.records.iter().filter_map(|r| r.incentive_amount);
        match amounts.next() {
            Some(first) => {
                let (lo, hi) = amounts.fold((first, first), |(lo, hi), a| (lo.min(a), hi.max(a)));
                (lo.floor(), hi.ceil())
            }
            None => (0.0, 0.0),
        }
    }
}
