use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, Float32Array, Float64Array, Int32Array, Int64Array};
use log::debug;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::MeasurementTable;
use crate::error::{ModelError, Result};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// On-disk layouts of a measurement table, picked by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    /// Whitespace-delimited text, one row per line (anything unrecognised).
    Text,
    /// Headerless comma-separated rows.
    Csv,
    /// `[[id, t_1, e_1, ...], ...]`
    Json,
    /// One numeric column per flat column.
    Parquet,
}

impl TableFormat {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        match ext.as_str() {
            "csv" => TableFormat::Csv,
            "json" => TableFormat::Json,
            "parquet" | "pq" => TableFormat::Parquet,
            _ => TableFormat::Text,
        }
    }
}

/// Load a measurement table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.txt`, `.dat`, anything else – whitespace-delimited numbers
/// * `.csv`     – comma-separated numbers, no header
/// * `.json`    – array of numeric arrays
/// * `.parquet` – numeric columns in flat-row order
pub fn load_file(path: &Path) -> Result<MeasurementTable> {
    let format = TableFormat::from_path(path);
    debug!("loading {} as {format:?}", path.display());

    let rows = match format {
        TableFormat::Text => {
            let text = std::fs::read_to_string(path).map_err(|e| ModelError::io(path, e))?;
            parse_text(&text)?
        }
        TableFormat::Csv => load_csv(path)?,
        TableFormat::Json => load_json(path)?,
        TableFormat::Parquet => load_parquet(path)?,
    };

    MeasurementTable::from_columns(&rows)
}

// ---------------------------------------------------------------------------
// Whitespace text loader
// ---------------------------------------------------------------------------

/// Parse a whitespace table. Blank lines and `#` comments are skipped;
/// parse errors report the 1-based line and column.
pub fn parse_text(text: &str) -> Result<Vec<Vec<f64>>> {
    let mut rows = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let row = trimmed
            .split_whitespace()
            .enumerate()
            .map(|(col, tok)| parse_cell(tok, line_no + 1, col + 1))
            .collect::<Result<Vec<f64>>>()?;
        rows.push(row);
    }
    Ok(rows)
}

fn parse_cell(tok: &str, row: usize, column: usize) -> Result<f64> {
    tok.trim().parse::<f64>().map_err(|_| ModelError::Parse {
        row,
        column,
        message: format!("'{tok}' is not a number"),
    })
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// Headerless CSV; every field must be numeric.
fn load_csv(path: &Path) -> Result<Vec<Vec<f64>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| ModelError::format(path, format!("opening CSV: {e}")))?;

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record =
            result.map_err(|e| ModelError::format(path, format!("CSV row {}: {e}", row_no + 1)))?;
        if record.iter().all(|f| f.is_empty()) {
            continue;
        }
        let row = record
            .iter()
            .enumerate()
            .map(|(col, field)| parse_cell(field, row_no + 1, col + 1))
            .collect::<Result<Vec<f64>>>()?;
        rows.push(row);
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema:
///
/// ```json
/// [
///   [1, 120.5, 3.2, 110.0, 3.4],
///   ...
/// ]
/// ```
fn load_json(path: &Path) -> Result<Vec<Vec<f64>>> {
    let text = std::fs::read_to_string(path).map_err(|e| ModelError::io(path, e))?;
    parse_json(&text).map_err(|e| match e {
        ModelError::Format { message, .. } => ModelError::format(path, message),
        other => other,
    })
}

pub fn parse_json(text: &str) -> Result<Vec<Vec<f64>>> {
    let root: JsonValue = serde_json::from_str(text)
        .map_err(|e| ModelError::format("<json>", format!("parsing JSON: {e}")))?;

    let records = root
        .as_array()
        .ok_or_else(|| ModelError::format("<json>", "expected top-level JSON array"))?;

    records
        .iter()
        .enumerate()
        .map(|(i, rec)| {
            let cells = rec.as_array().ok_or_else(|| ModelError::Parse {
                row: i + 1,
                column: 0,
                message: "row is not a JSON array".into(),
            })?;
            cells
                .iter()
                .enumerate()
                .map(|(j, v)| {
                    v.as_f64().ok_or_else(|| ModelError::Parse {
                        row: i + 1,
                        column: j + 1,
                        message: format!("{v} is not a number"),
                    })
                })
                .collect::<Result<Vec<f64>>>()
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file whose columns are the flat row columns in order
/// (`id`, `t_1`, `e_1`, ...). Column names are not interpreted.
///
/// Accepts Float64, Float32, Int64 and Int32 columns; nulls are rejected.
fn load_parquet(path: &Path) -> Result<Vec<Vec<f64>>> {
    let file = std::fs::File::open(path).map_err(|e| ModelError::io(path, e))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| ModelError::format(path, format!("reading parquet metadata: {e}")))?;
    let reader = builder
        .build()
        .map_err(|e| ModelError::format(path, format!("building parquet reader: {e}")))?;

    let mut rows = Vec::new();

    for batch_result in reader {
        let batch = batch_result
            .map_err(|e| ModelError::format(path, format!("reading parquet record batch: {e}")))?;
        let first_row = rows.len();

        for row in 0..batch.num_rows() {
            let cells = batch
                .columns()
                .iter()
                .enumerate()
                .map(|(col, array)| extract_f64(array, row, first_row + row + 1, col + 1))
                .collect::<Result<Vec<f64>>>()?;
            rows.push(cells);
        }
    }

    Ok(rows)
}

// -- Parquet / Arrow helpers --

/// Read one numeric cell from an Arrow column.
fn extract_f64(col: &Arc<dyn Array>, row: usize, row_no: usize, col_no: usize) -> Result<f64> {
    let parse_err = |message: String| ModelError::Parse {
        row: row_no,
        column: col_no,
        message,
    };

    if col.is_null(row) {
        return Err(parse_err("null value".into()));
    }

    let any = col.as_any();
    if let Some(arr) = any.downcast_ref::<Float64Array>() {
        Ok(arr.value(row))
    } else if let Some(arr) = any.downcast_ref::<Float32Array>() {
        Ok(arr.value(row) as f64)
    } else if let Some(arr) = any.downcast_ref::<Int64Array>() {
        Ok(arr.value(row) as f64)
    } else if let Some(arr) = any.downcast_ref::<Int32Array>() {
        Ok(arr.value(row) as f64)
    } else {
        Err(parse_err(format!(
            "column type {:?} is not numeric",
            col.data_type()
        )))
    }
}
