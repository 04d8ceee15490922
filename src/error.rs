use thiserror::Error;

/// Failures the loader detects itself, after the raw file has been read.
///
/// I/O and format-level parse failures are reported through `anyhow` with
/// context instead; both end up fatal for the session.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("unsupported file extension: .{0}")]
    UnsupportedExtension(String),

    #[error("required column '{column}' not found (available: {available:?})")]
    MissingColumn {
        column: &'static str,
        available: Vec<String>,
    },

    #[error("sheet '{wanted}' not found in workbook (sheets: {available:?})")]
    MissingSheet {
        wanted: String,
        available: Vec<String>,
    },

    #[error("sheet '{0}' has no header row")]
    EmptySheet(String),

    #[error("source has no header row")]
    NoHeader,
}

/// Export failures are local: they never touch the dashboard state.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("writing CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("writing spreadsheet: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),

    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
}
