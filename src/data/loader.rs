use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Array, AsArray};
use arrow::datatypes::{
    DataType, Date32Type, Date64Type, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type,
    TimeUnit, TimestampMicrosecondType, TimestampMillisecondType, TimestampNanosecondType,
    TimestampSecondType, UInt32Type, UInt64Type,
};
use arrow::util::display::array_value_to_string;
use calamine::{open_workbook_auto, Data, DataType as _, Reader};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{CellValue, Dataset, RawTable};
use crate::error::LoadError;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load the incentive dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.xlsx` / `.xlsm` / `.xls` / `.ods` – the sheet named `sheet_name`
/// * `.csv`     – header row, one project per line
/// * `.json`    – `[{ "Project Completed": ..., "Incentive Amount": ..., ... }, ...]`
/// * `.parquet` – one column per field, as written by Pandas or Polars
///
/// The header row is resolved against the fixed schema; a missing required
/// column fails the whole load.
pub fn load_file(path: &Path, sheet_name: &str) -> Result<Dataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => read_workbook(path, sheet_name)?,
        "csv" => read_csv(path)?,
        "json" => read_json(path)?,
        "parquet" | "pq" => read_parquet(path)?,
        other => return Err(LoadError::UnsupportedExtension(other.to_string()).into()),
    };

    let dataset = Dataset::from_table(table)
        .with_context(|| format!("resolving columns of {}", path.display()))?;

    let report = dataset.report;
    if report.unparseable_dates > 0 {
        log::warn!(
            "{} value(s) in 'Project Completed' could not be read as dates and were set to null",
            report.unparseable_dates
        );
    }
    if report.unparseable_amounts > 0 {
        log::warn!(
            "{} value(s) in 'Incentive Amount' could not be read as numbers and were set to null",
            report.unparseable_amounts
        );
    }
    log::info!(
        "Loaded {} projects from {} (passthrough columns: {:?})",
        dataset.len(),
        path.display(),
        dataset.extra_columns
    );

    Ok(dataset)
}

/// Pandas-style placeholder for a blank header cell.
fn header_label(raw: String, idx: usize) -> String {
    if raw.trim().is_empty() {
        format!("Unnamed: {idx}")
    } else {
        raw
    }
}

// ---------------------------------------------------------------------------
// Spreadsheet reader
// ---------------------------------------------------------------------------

/// The first row of the sheet is the header.
///
/// A workbook with a single sheet is read even when its name differs from
/// `sheet_name`; with several sheets the name must match.
fn read_workbook(path: &Path, sheet_name: &str) -> Result<RawTable> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("opening workbook {}", path.display()))?;

    let names = workbook.sheet_names();
    let sheet = if names.iter().any(|n| n == sheet_name) {
        sheet_name.to_string()
    } else if let [only] = names.as_slice() {
        log::warn!("Sheet '{sheet_name}' not found; reading the only sheet '{only}' instead");
        only.clone()
    } else {
        return Err(LoadError::MissingSheet {
            wanted: sheet_name.to_string(),
            available: names,
        }
        .into());
    };

    let range = workbook
        .worksheet_range(&sheet)
        .with_context(|| format!("reading sheet '{sheet}'"))?;

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .ok_or_else(|| LoadError::EmptySheet(sheet.clone()))?
        .iter()
        .enumerate()
        .map(|(i, c)| header_label(c.to_string(), i))
        .collect();

    let rows = rows
        .map(|row| row.iter().map(spreadsheet_cell).collect())
        .collect();

    Ok(RawTable { headers, rows })
}

fn spreadsheet_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Int(i) => CellValue::Integer(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::String(s) => CellValue::String(s.clone()),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(_) | Data::DateTimeIso(_) => cell
            .as_datetime()
            .map_or_else(|| CellValue::String(cell.to_string()), CellValue::DateTime),
        Data::DurationIso(s) => CellValue::String(s.clone()),
        // cell errors (#N/A, #DIV/0!, ...) and empty cells
        _ => CellValue::Null,
    }
}

// ---------------------------------------------------------------------------
// CSV reader
// ---------------------------------------------------------------------------

/// Short or long rows are tolerated; missing trailing cells read as null.
fn read_csv(path: &Path) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening CSV {}", path.display()))?;

    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .enumerate()
        .map(|(i, h)| header_label(h.to_string(), i))
        .collect();
    if headers.is_empty() {
        return Err(LoadError::NoHeader.into());
    }

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        rows.push(record.iter().map(guess_cell_type).collect());
    }

    Ok(RawTable { headers, rows })
}

fn guess_cell_type(s: &str) -> CellValue {
    if s.is_empty() {
        return CellValue::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return CellValue::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return CellValue::Float(f);
    }
    if s == "true" || s == "false" {
        return CellValue::Bool(s == "true");
    }
    CellValue::String(s.to_string())
}

// ---------------------------------------------------------------------------
// JSON reader
// ---------------------------------------------------------------------------

/// Records-oriented array, the default `df.to_json(orient='records')`.
/// Columns are the union of all keys, in first-seen order.
fn read_json(path: &Path) -> Result<RawTable> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root.as_array().context("Expected top-level JSON array")?;

    let mut headers: Vec<String> = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for key in obj.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
    }
    if headers.is_empty() {
        return Err(LoadError::NoHeader.into());
    }

    let rows = records
        .iter()
        .filter_map(|rec| rec.as_object())
        .map(|obj| {
            headers
                .iter()
                .map(|h| obj.get(h).map_or(CellValue::Null, json_to_cell))
                .collect()
        })
        .collect();

    Ok(RawTable { headers, rows })
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => CellValue::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Null,
        other => CellValue::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet reader
// ---------------------------------------------------------------------------

/// Load a Parquet file with one flat column per field.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
fn read_parquet(path: &Path) -> Result<RawTable> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let headers: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let columns = batch.columns();
        for row in 0..batch.num_rows() {
            rows.push(columns.iter().map(|col| arrow_cell(col, row)).collect());
        }
    }

    Ok(RawTable { headers, rows })
}

/// Extract a single cell from an Arrow column at a given row.
fn arrow_cell(col: &Arc<dyn Array>, row: usize) -> CellValue {
    if col.is_null(row) {
        return CellValue::Null;
    }
    let cell = match col.data_type() {
        DataType::Utf8 => col
            .as_string_opt::<i32>()
            .map(|a| CellValue::String(a.value(row).to_string())),
        DataType::LargeUtf8 => col
            .as_string_opt::<i64>()
            .map(|a| CellValue::String(a.value(row).to_string())),
        DataType::Int16 => col
            .as_primitive_opt::<Int16Type>()
            .map(|a| CellValue::Integer(a.value(row).into())),
        DataType::Int32 => col
            .as_primitive_opt::<Int32Type>()
            .map(|a| CellValue::Integer(a.value(row).into())),
        DataType::Int64 => col
            .as_primitive_opt::<Int64Type>()
            .map(|a| CellValue::Integer(a.value(row))),
        DataType::UInt32 => col
            .as_primitive_opt::<UInt32Type>()
            .map(|a| CellValue::Integer(a.value(row).into())),
        DataType::UInt64 => col
            .as_primitive_opt::<UInt64Type>()
            .map(|a| CellValue::Float(a.value(row) as f64)),
        DataType::Float32 => col
            .as_primitive_opt::<Float32Type>()
            .map(|a| CellValue::Float(a.value(row).into())),
        DataType::Float64 => col
            .as_primitive_opt::<Float64Type>()
            .map(|a| CellValue::Float(a.value(row))),
        DataType::Boolean => col.as_boolean_opt().map(|a| CellValue::Bool(a.value(row))),
        DataType::Date32 => col
            .as_primitive_opt::<Date32Type>()
            .and_then(|a| a.value_as_datetime(row))
            .map(CellValue::DateTime),
        DataType::Date64 => col
            .as_primitive_opt::<Date64Type>()
            .and_then(|a| a.value_as_datetime(row))
            .map(CellValue::DateTime),
        DataType::Timestamp(unit, _) => match unit {
            TimeUnit::Second => col
                .as_primitive_opt::<TimestampSecondType>()
                .and_then(|a| a.value_as_datetime(row)),
            TimeUnit::Millisecond => col
                .as_primitive_opt::<TimestampMillisecondType>()
                .and_then(|a| a.value_as_datetime(row)),
            TimeUnit::Microsecond => col
                .as_primitive_opt::<TimestampMicrosecondType>()
                .and_then(|a| a.value_as_datetime(row)),
            TimeUnit::Nanosecond => col
                .as_primitive_opt::<TimestampNanosecondType>()
                .and_then(|a| a.value_as_datetime(row)),
        }
        .map(CellValue::DateTime),
        _ => None,
    };

    // Anything else (dictionary, decimal, ...) goes through Arrow's own formatter.
    cell.unwrap_or_else(|| {
        array_value_to_string(col.as_ref(), row)
            .map(CellValue::String)
            .unwrap_or(CellValue::Null)
    })
}
