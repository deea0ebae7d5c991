use std::fmt;

use crate::error::{ModelError, Result};

// ---------------------------------------------------------------------------
// FrequencyTable – the shared CPU operating points
// ---------------------------------------------------------------------------

/// Frequency steps (GHz) used by the measurement campaign the tool was
/// written for.
pub const DEFAULT_FREQUENCIES: [f64; 15] = [
    0.8, 1.0, 1.2, 1.4, 1.6, 1.8, 2.0, 2.1, 2.3, 2.5, 2.7, 2.9, 3.1, 3.3, 3.5,
];

/// Ordered set of frequency points, index-aligned with the (time, energy)
/// pairs of every row.
///
/// Always non-empty, finite, strictly positive and strictly ascending.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyTable(Vec<f64>);

impl FrequencyTable {
    pub fn new(values: Vec<f64>) -> Result<Self> {
        if values.is_empty() {
            return Err(ModelError::Config("frequency table is empty".into()));
        }
        if let Some(bad) = values.iter().find(|f| !f.is_finite() || **f <= 0.0) {
            return Err(ModelError::Config(format!(
                "frequency {bad} is not a positive finite value"
            )));
        }
        if let Some(w) = values.windows(2).find(|w| w[0] >= w[1]) {
            return Err(ModelError::Config(format!(
                "frequencies must be strictly ascending ({} is followed by {})",
                w[0], w[1]
            )));
        }
        Ok(Self(values))
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl Default for FrequencyTable {
    fn default() -> Self {
        Self(DEFAULT_FREQUENCIES.to_vec())
    }
}

impl fmt::Display for FrequencyTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|v| v.to_string()).collect();
        write!(f, "[{}]", parts.join(", "))
    }
}

// ---------------------------------------------------------------------------
// MeasurementRow – one query / sample
// ---------------------------------------------------------------------------

/// One line of the measurement file: `[id, t_1, e_1, ..., t_k, e_k]`.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementRow {
    /// Query identifier (kept as read; the files store it as a float).
    pub id: f64,
    /// Execution time per frequency step.
    pub times: Vec<f64>,
    /// Energy per frequency step – same length as `times`.
    pub energies: Vec<f64>,
}

impl MeasurementRow {
    /// Split a flat column vector into id and interleaved pairs.
    pub fn from_columns(columns: &[f64]) -> Result<Self> {
        let Some((&id, rest)) = columns.split_first() else {
            return Err(ModelError::Shape("row has no columns".into()));
        };
        if rest.len() % 2 != 0 {
            return Err(ModelError::Shape(format!(
                "id {id}: {} value columns do not form (time, energy) pairs",
                rest.len()
            )));
        }
        let (times, energies) = rest.chunks_exact(2).map(|p| (p[0], p[1])).unzip();
        Ok(Self {
            id,
            times,
            energies,
        })
    }

    /// Flatten back into `[id, t_1, e_1, ...]`.
    pub fn to_columns(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(1 + 2 * self.pair_count());
        out.push(self.id);
        for (t, e) in self.times.iter().zip(&self.energies) {
            out.push(*t);
            out.push(*e);
        }
        out
    }

    /// Number of (time, energy) pairs.
    pub fn pair_count(&self) -> usize {
        self.times.len()
    }

    /// Fails unless the row carries exactly one pair per frequency step.
    pub fn check_shape(&self, frequencies: &FrequencyTable) -> Result<()> {
        if self.times.len() != self.energies.len() {
            return Err(ModelError::Shape(format!(
                "id {}: {} times but {} energies",
                self.id,
                self.times.len(),
                self.energies.len()
            )));
        }
        if self.pair_count() != frequencies.len() {
            return Err(ModelError::Shape(format!(
                "id {}: {} (time, energy) pairs but {} frequencies",
                self.id,
                self.pair_count(),
                frequencies.len()
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MeasurementTable – the complete loaded file
// ---------------------------------------------------------------------------

/// All rows of a measurement file, in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasurementTable {
    pub rows: Vec<MeasurementRow>,
}

impl MeasurementTable {
    pub fn from_rows(rows: Vec<MeasurementRow>) -> Self {
        Self { rows }
    }

    /// Build from flat numeric rows as they appear on disk.
    pub fn from_columns<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self> {
        rows.iter()
            .enumerate()
            .map(|(i, r)| {
                MeasurementRow::from_columns(r.as_ref()).map_err(|e| match e {
                    ModelError::Shape(m) => ModelError::Shape(format!("table row {}: {m}", i + 1)),
                    other => other,
                })
            })
            .collect::<Result<Vec<_>>>()
            .map(Self::from_rows)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Width of a flat row (`1 + 2k`), taken from the first row.
    pub fn column_count(&self) -> Option<usize> {
        self.rows.first().map(|r| 1 + 2 * r.pair_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_columns_split_and_join() {
        let cols = [7.0, 10.0, 5.0, 20.0, 20.0, 30.0, 45.0];
        let row = MeasurementRow::from_columns(&cols).unwrap();
        assert_eq!(row.id, 7.0);
        assert_eq!(row.times, vec![10.0, 20.0, 30.0]);
        assert_eq!(row.energies, vec![5.0, 20.0, 45.0]);
        assert_eq!(row.to_columns(), cols.to_vec());
    }

    #[test]
    fn test_row_with_dangling_column_is_shape_error() {
        let err = MeasurementRow::from_columns(&[1.0, 10.0, 5.0, 20.0]).unwrap_err();
        assert!(matches!(err, ModelError::Shape(_)));
        assert!(matches!(
            MeasurementRow::from_columns(&[]),
            Err(ModelError::Shape(_))
        ));
    }

    #[test]
    fn test_dangling_column_reports_table_row() {
        let err = MeasurementTable::from_columns(&[
            vec![1.0, 10.0, 5.0],
            vec![1.0, 10.0, 5.0, 20.0],
        ])
        .unwrap_err();
        match err {
            ModelError::Shape(msg) => {
                assert!(msg.starts_with("table row 2: id 1:"), "{msg}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_check_shape_against_frequencies() {
        let freqs = FrequencyTable::new(vec![1.0, 2.0, 3.0]).unwrap();
        let ok = MeasurementRow::from_columns(&[1.0, 1.0, 1.0, 2.0, 2.0, 3.0, 3.0]).unwrap();
        assert!(ok.check_shape(&freqs).is_ok());

        let short = MeasurementRow::from_columns(&[1.0, 1.0, 1.0, 2.0, 2.0]).unwrap();
        assert!(matches!(short.check_shape(&freqs), Err(ModelError::Shape(_))));
    }

    #[test]
    fn test_frequency_table_validation() {
        assert!(FrequencyTable::new(vec![]).is_err());
        assert!(FrequencyTable::new(vec![1.0, 1.0, 2.0]).is_err());
        assert!(FrequencyTable::new(vec![2.0, 1.0]).is_err());
        assert!(FrequencyTable::new(vec![-1.0, 1.0]).is_err());
        assert!(FrequencyTable::new(vec![0.5, f64::NAN]).is_err());
        assert_eq!(FrequencyTable::default().len(), 15);
    }

    #[test]
    fn test_table_column_count() {
        let table = MeasurementTable::from_columns(&[vec![1.0, 2.0, 3.0]]).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.column_count(), Some(3));
        assert_eq!(MeasurementTable::default().column_count(), None);
    }
}
