use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use log::debug;
use parquet::arrow::ArrowWriter;

use super::loader::TableFormat;
use super::model::MeasurementTable;
use crate::error::{ModelError, Result};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Write `table` to `path`, format chosen by extension (see [`TableFormat`]).
///
/// The table is first written to a hidden sibling file which is renamed over
/// `path` only once everything has been flushed. On any failure the
/// temporary file is removed and `path` keeps its previous content.
pub fn write_file(path: &Path, table: &MeasurementTable) -> Result<()> {
    let tmp = temp_path(path);
    debug!("writing {} rows to {}", table.len(), tmp.display());

    let written = write_format(&tmp, TableFormat::from_path(path), table)
        .and_then(|()| std::fs::rename(&tmp, path).map_err(|e| ModelError::io(path, e)));

    if written.is_err() {
        // Best effort: the file may never have been created.
        let _ = std::fs::remove_file(&tmp);
    }
    written
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".into());
    path.with_file_name(format!(".{name}.{}.tmp", std::process::id()))
}

fn write_format(tmp: &Path, format: TableFormat, table: &MeasurementTable) -> Result<()> {
    match format {
        TableFormat::Parquet => return write_parquet(tmp, table),
        TableFormat::Csv => return write_csv(tmp, table),
        TableFormat::Text | TableFormat::Json => {}
    }

    let file = File::create(tmp).map_err(|e| ModelError::io(tmp, e))?;
    let mut out = BufWriter::new(file);
    let io_err = |e| ModelError::io(tmp, e);

    if format == TableFormat::Json {
        let rows: Vec<Vec<f64>> = table.rows.iter().map(|r| r.to_columns()).collect();
        serde_json::to_writer(&mut out, &rows)
            .map_err(|e| ModelError::format(tmp, format!("serializing JSON: {e}")))?;
    } else {
        out.write_all(format_text(table).as_bytes()).map_err(io_err)?;
    }

    let file = out.into_inner().map_err(|e| io_err(e.into_error()))?;
    file.sync_all().map_err(io_err)
}

// ---------------------------------------------------------------------------
// Text / CSV writers
// ---------------------------------------------------------------------------

/// Shortest text that parses back to `v`; exponent form outside
/// `[1e-5, 1e16)` so extreme magnitudes stay short.
pub fn format_value(v: f64) -> String {
    let magnitude = v.abs();
    if v == 0.0 || !v.is_finite() || (1e-5..1e16).contains(&magnitude) {
        v.to_string()
    } else {
        format!("{v:e}")
    }
}

/// Space-delimited rendering, one row per line.
pub fn format_text(table: &MeasurementTable) -> String {
    let mut text = String::new();
    for row in &table.rows {
        let cells: Vec<String> = row.to_columns().iter().map(|&v| format_value(v)).collect();
        text.push_str(&cells.join(" "));
        text.push('\n');
    }
    text
}

fn write_csv(tmp: &Path, table: &MeasurementTable) -> Result<()> {
    let csv_err = |e: csv::Error| ModelError::format(tmp, format!("writing CSV: {e}"));
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(tmp)
        .map_err(csv_err)?;

    for row in &table.rows {
        writer
            .write_record(row.to_columns().iter().map(|&v| format_value(v)))
            .map_err(csv_err)?;
    }
    writer.flush().map_err(|e| ModelError::io(tmp, e))
}

// ---------------------------------------------------------------------------
// Parquet writer
// ---------------------------------------------------------------------------

/// Column names for a flat row of `width` columns: `id, t_1, e_1, ...`.
fn column_names(width: usize) -> Vec<String> {
    std::iter::once("id".to_string())
        .chain((1..width).map(|c| {
            let step = (c + 1) / 2;
            if c % 2 == 1 {
                format!("t_{step}")
            } else {
                format!("e_{step}")
            }
        }))
        .collect()
}

fn write_parquet(tmp: &Path, table: &MeasurementTable) -> Result<()> {
    let width = table.column_count().unwrap_or(1);
    let flat: Vec<Vec<f64>> = table.rows.iter().map(|r| r.to_columns()).collect();
    if let Some(bad) = flat.iter().position(|r| r.len() != width) {
        return Err(ModelError::Shape(format!(
            "row {} has {} columns, parquet output needs {width} in every row",
            bad + 1,
            flat[bad].len()
        )));
    }

    let fields: Vec<Field> = column_names(width)
        .into_iter()
        .map(|name| Field::new(name, DataType::Float64, false))
        .collect();
    let schema = Arc::new(Schema::new(fields));

    let columns: Vec<ArrayRef> = (0..width)
        .map(|c| Arc::new(Float64Array::from_iter_values(flat.iter().map(|r| r[c]))) as ArrayRef)
        .collect();

    let pq_err = |e: String| ModelError::format(tmp, e);
    let batch = RecordBatch::try_new(schema.clone(), columns)
        .map_err(|e| pq_err(format!("building record batch: {e}")))?;

    let file = File::create(tmp).map_err(|e| ModelError::io(tmp, e))?;
    let mut writer = ArrowWriter::try_new(file, schema, None)
        .map_err(|e| pq_err(format!("creating parquet writer: {e}")))?;
    writer
        .write(&batch)
        .map_err(|e| pq_err(format!("writing parquet batch: {e}")))?;
    writer
        .close()
        .map_err(|e| pq_err(format!("closing parquet writer: {e}")))?;
    Ok(())
}
