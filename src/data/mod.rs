/// Data layer: core types, loading, and writing.
///
/// Architecture:
/// ```text
///  .txt / .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → MeasurementTable
///   └──────────┘
///        │
///        ▼
///   ┌──────────────────┐
///   │ MeasurementTable │  Vec<MeasurementRow>, id + (time, energy) pairs
///   └──────────────────┘
///        │  (fit::smooth)
///        ▼
///   ┌──────────┐
///   │  writer   │  temp file → rename into place
///   └──────────┘
/// ```

pub mod loader;
pub mod model;
pub mod writer;
