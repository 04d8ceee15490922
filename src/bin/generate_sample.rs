//! Writes a synthetic incentive-project dataset for trying out the dashboard.
//!
//! Usage: `generate_sample [OUTPUT]` where OUTPUT ends in `.xlsx` (default:
//! the dashboard's default source path) or `.parquet`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use airboard_dash::config::DashboardConfig;
use airboard_dash::data::coerce::datetime_to_serial;
use anyhow::{bail, Context, Result};
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray, TimestampMillisecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use parquet::arrow::ArrowWriter;
use rust_xlsxwriter::{Format, Workbook};

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        let i = (self.next_f64() * items.len() as f64) as usize;
        items.get(i.min(items.len().saturating_sub(1))).copied().unwrap_or("")
    }
}

/// One generated row. `amount_text` carries deliberately unparseable values.
struct Row {
    id: i64,
    completed: Option<NaiveDateTime>,
    program: &'static str,
    equipment: &'static str,
    old_make: &'static str,
    new_make: &'static str,
    amount: Option<f64>,
    amount_text: Option<&'static str>,
    county: &'static str,
}

const PROGRAMS: &[&str] = &["Carl Moyer", "FARMER", "Community Air Protection", "Zero-Emission Forklift"];
const EQUIPMENT: &[&str] = &["Forklift", "Tractor", "Sweeper", "Loader", "Generator", "Yard Truck"];
const OLD_MAKES: &[&str] = &["Clark", "Caterpillar", "John Deere", "Hyster", "Yale", "Kubota"];
const NEW_MAKES: &[&str] = &[
    "Toyota", "Hyster", "Yale", "Crown", "Raymond", "John Deere", "Caterpillar", "Kubota",
    "Tennant", "Kalmar", "Linde", "Doosan",
];
const COUNTIES: &[&str] = &["Fresno", "Kern", "Tulare", "Merced", "Stanislaus"];

fn generate_rows(n: usize) -> Vec<Row> {
    let mut rng = SimpleRng::new(42);
    let start = NaiveDate::from_ymd_opt(2018, 1, 1)
        .unwrap_or(NaiveDate::MIN)
        .and_time(NaiveTime::MIN);

    (0..n)
        .map(|i| {
            let day = (rng.next_f64() * 365.0 * 6.0) as i64;
            let completed = (rng.next_f64() > 0.03).then(|| start + Duration::days(day));
            let equipment = rng.pick(EQUIPMENT);
            let base = match equipment {
                "Tractor" => 60_000.0,
                "Yard Truck" => 90_000.0,
                "Loader" => 45_000.0,
                _ => 20_000.0,
            };
            let amount = (base * (0.5 + rng.next_f64())).round();
            let dirty = rng.next_f64();
            Row {
                id: 1000 + i as i64,
                completed,
                program: rng.pick(PROGRAMS),
                equipment,
                old_make: rng.pick(OLD_MAKES),
                new_make: rng.pick(NEW_MAKES),
                amount: (dirty > 0.02).then_some(amount),
                amount_text: (dirty <= 0.01).then_some("pending"),
                county: rng.pick(COUNTIES),
            }
        })
        .collect()
}

/// Column labels, padded the way real exports often are.
const HEADERS: [&str; 8] = [
    "Project ID",
    " Project Completed",
    "Incentive Program ",
    "Equipment Type",
    "Old Equipment Make",
    "New Equipment Make",
    "Incentive Amount",
    "County",
];

fn write_workbook(path: &Path, sheet_name: &str, rows: &[Row]) -> Result<()> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(sheet_name)?;
    let date_format = Format::new().set_num_format("yyyy-mm-dd");

    for (col, label) in HEADERS.iter().enumerate() {
        sheet.write_string(0, col as u16, *label)?;
    }
    for (i, row) in rows.iter().enumerate() {
        let r = (i + 1) as u32;
        sheet.write_number(r, 0, row.id as f64)?;
        if let Some(dt) = &row.completed {
            sheet.write_number_with_format(r, 1, datetime_to_serial(dt), &date_format)?;
        }
        sheet.write_string(r, 2, row.program)?;
        sheet.write_string(r, 3, row.equipment)?;
        sheet.write_string(r, 4, row.old_make)?;
        sheet.write_string(r, 5, row.new_make)?;
        match (row.amount, row.amount_text) {
            (_, Some(text)) => {
                sheet.write_string(r, 6, text)?;
            }
            (Some(v), None) => {
                sheet.write_number(r, 6, v)?;
            }
            (None, None) => {}
        }
        sheet.write_string(r, 7, row.county)?;
    }

    workbook
        .save(path)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

fn write_parquet(path: &Path, rows: &[Row]) -> Result<()> {
    let text = |f: fn(&Row) -> &'static str| -> ArrayRef {
        Arc::new(StringArray::from(rows.iter().map(f).collect::<Vec<_>>()))
    };
    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from(rows.iter().map(|r| r.id).collect::<Vec<_>>())),
        Arc::new(TimestampMillisecondArray::from(
            rows.iter()
                .map(|r| r.completed.map(|dt| dt.and_utc().timestamp_millis()))
                .collect::<Vec<_>>(),
        )),
        text(|r| r.program),
        text(|r| r.equipment),
        text(|r| r.old_make),
        text(|r| r.new_make),
        Arc::new(Float64Array::from(
            rows.iter()
                .map(|r| r.amount.filter(|_| r.amount_text.is_none()))
                .collect::<Vec<_>>(),
        )),
        text(|r| r.county),
    ];

    let schema = Arc::new(Schema::new(vec![
        Field::new(HEADERS[0].trim(), DataType::Int64, false),
        Field::new(HEADERS[1].trim(), DataType::Timestamp(TimeUnit::Millisecond, None), true),
        Field::new(HEADERS[2].trim(), DataType::Utf8, false),
        Field::new(HEADERS[3].trim(), DataType::Utf8, false),
        Field::new(HEADERS[4].trim(), DataType::Utf8, false),
        Field::new(HEADERS[5].trim(), DataType::Utf8, false),
        Field::new(HEADERS[6].trim(), DataType::Float64, true),
        Field::new(HEADERS[7].trim(), DataType::Utf8, false),
    ]));

    let batch = RecordBatch::try_new(schema.clone(), columns).context("building record batch")?;

    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn main() -> Result<()> {
    let config = DashboardConfig::default();
    let output = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| config.source_path.clone());

    if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }

    let rows = generate_rows(600);
    match output.extension().and_then(|e| e.to_str()) {
        Some("xlsx") => write_workbook(&output, &config.sheet_name, &rows)?,
        Some("parquet") => write_parquet(&output, &rows)?,
        other => bail!("unsupported output extension: {other:?} (use .xlsx or .parquet)"),
    }

    println!("Wrote {} projects to {}", rows.len(), output.display());
    Ok(())
}
