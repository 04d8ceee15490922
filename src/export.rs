use std::path::Path;

use rust_xlsxwriter::{Format, Workbook};

use crate::data::coerce::datetime_to_serial;
use crate::data::filter::FilteredView;
use crate::data::model::CellValue;
use crate::error::ExportError;

/// Sheet name used for the spreadsheet export.
pub const EXPORT_SHEET: &str = "Filtered";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Xlsx,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ExportFormat::Csv => "CSV",
            ExportFormat::Xlsx => "Excel",
        }
    }

    pub fn file_name(self, stem: &str) -> String {
        format!("{stem}.{}", self.extension())
    }

    /// Encode every column and row of the view.
    pub fn encode(self, view: &FilteredView<'_>) -> Result<Vec<u8>, ExportError> {
        match self {
            ExportFormat::Csv => to_csv_bytes(view),
            ExportFormat::Xlsx => to_xlsx_bytes(view),
        }
    }
}

/// UTF-8 CSV, header row first, columns in source order. Null cells are empty.
pub fn to_csv_bytes(view: &FilteredView<'_>) -> Result<Vec<u8>, ExportError> {
    let columns = &view.dataset().columns;
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record(columns.iter().map(|c| c.label.as_str()))?;
    for rec in view.records() {
        writer.write_record(columns.iter().map(|c| rec.cell(&c.source).to_string()))?;
    }

    writer.into_inner().map_err(|e| ExportError::Io(e.into_error()))
}

/// Single-sheet workbook with the same header and rows as the CSV export.
/// Dates are real spreadsheet dates, amounts are numbers.
pub fn to_xlsx_bytes(view: &FilteredView<'_>) -> Result<Vec<u8>, ExportError> {
    let columns = &view.dataset().columns;
    let header_format = Format::new().set_bold();
    let date_format = Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(EXPORT_SHEET)?;

    for (col, column) in columns.iter().enumerate() {
        sheet.write_string_with_format(0, column_number(col), column.label.as_str(), &header_format)?;
    }

    for (i, rec) in view.records().enumerate() {
        let row = (i + 1) as u32;
        for (col, column) in columns.iter().enumerate() {
            let col = column_number(col);
            match rec.cell(&column.source) {
                CellValue::Null => {}
                CellValue::String(s) => {
                    sheet.write_string(row, col, s)?;
                }
                CellValue::Integer(n) => {
                    sheet.write_number(row, col, n as f64)?;
                }
                CellValue::Float(v) => {
                    sheet.write_number(row, col, v)?;
                }
                CellValue::Bool(b) => {
                    sheet.write_boolean(row, col, b)?;
                }
                CellValue::DateTime(dt) => {
                    sheet.write_number_with_format(row, col, datetime_to_serial(&dt), &date_format)?;
                }
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

/// Out-of-range columns saturate and are rejected by the writer.
fn column_number(col: usize) -> u16 {
    u16::try_from(col).unwrap_or(u16::MAX)
}

/// Write encoded export bytes to `path`.
pub fn write_bytes(path: &Path, bytes: &[u8]) -> Result<(), ExportError> {
    std::fs::write(path, bytes)?;
    log::info!("Exported {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::{apply, FilterCriteria};
    use crate::data::model::{Dataset, RawTable};

    fn dataset() -> Dataset {
        let table = RawTable {
            headers: [
                "Project ID",
                "Project Completed",
                "Incentive Program",
                "Equipment Type",
                "Old Equipment Make",
                "New Equipment Make",
                "Incentive Amount",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            rows: vec![
                vec![
                    CellValue::Integer(1),
                    CellValue::String("2021-03-01".into()),
                    CellValue::String("A".into()),
                    CellValue::String("Forklift".into()),
                    CellValue::String("Clark, Inc.".into()),
                    CellValue::String("Toyota".into()),
                    CellValue::Integer(1000),
                ],
                vec![
                    CellValue::Integer(2),
                    CellValue::Null,
                    CellValue::String("B".into()),
                    CellValue::String("Sweeper".into()),
                    CellValue::Null,
                    CellValue::String("Tennant".into()),
                    CellValue::Null,
                ],
            ],
        };
        Dataset::from_table(table).unwrap()
    }

    #[test]
    fn csv_has_header_then_rows() {
        let ds = dataset();
        let bytes = to_csv_bytes(&apply(&ds, &FilterCriteria::default())).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines[0],
            "Project ID,Project Completed,Incentive Program,Equipment Type,Old Equipment Make,New Equipment Make,Incentive Amount"
        );
        assert_eq!(lines[1], "1,2021-03-01,A,Forklift,\"Clark, Inc.\",Toyota,1000");
        assert_eq!(lines[2], "2,,B,Sweeper,,Tennant,");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn empty_view_exports_header_only() {
        let ds = dataset();
        let criteria = FilterCriteria {
            programs: ["Z".to_string()].into(),
            ..FilterCriteria::default()
        };
        let bytes = to_csv_bytes(&apply(&ds, &criteria)).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap().lines().count(), 1);
    }

    #[test]
    fn xlsx_is_a_zip_container() {
        let ds = dataset();
        let bytes = ExportFormat::Xlsx
            .encode(&apply(&ds, &FilterCriteria::default()))
            .unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn file_names_follow_stem() {
        assert_eq!(ExportFormat::Csv.file_name("filtered_data"), "filtered_data.csv");
        assert_eq!(ExportFormat::Xlsx.file_name("filtered_data"), "filtered_data.xlsx");
    }
}
