use log::{debug, info, warn};

use super::{fit, mirror, Quadratic};
use crate::data::model::{FrequencyTable, MeasurementRow, MeasurementTable};
use crate::error::{ModelError, Result};

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Switches controlling how each row is smoothed.
#[derive(Debug, Clone, PartialEq)]
pub struct SmoothingOptions {
    /// Add mirrored `(-f, v)` samples before fitting.
    pub symmetrize: bool,
    /// Re-fit the time columns as well as the energy columns.
    pub fit_time: bool,
    /// Report predicted energies at or above this value.
    pub energy_threshold: Option<f64>,
    /// Added to every row id. Zero keeps ids as read.
    pub id_offset: f64,
}

impl Default for SmoothingOptions {
    fn default() -> Self {
        Self {
            symmetrize: false,
            fit_time: true,
            energy_threshold: None,
            id_offset: 0.0,
        }
    }
}

/// A smoothed energy at or above [`SmoothingOptions::energy_threshold`].
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdHit {
    pub id: f64,
    pub frequency: f64,
    pub energy: f64,
}

// ---------------------------------------------------------------------------
// FrequencyEnergyModel
// ---------------------------------------------------------------------------

/// Replaces noisy per-frequency samples with the values of a per-row
/// quadratic fit evaluated at the same frequencies.
///
/// Stateless apart from its configuration; rows never influence each other.
#[derive(Debug, Clone)]
pub struct FrequencyEnergyModel {
    frequencies: FrequencyTable,
    options: SmoothingOptions,
}

impl FrequencyEnergyModel {
    pub fn new(frequencies: FrequencyTable, options: SmoothingOptions) -> Self {
        Self {
            frequencies,
            options,
        }
    }

    pub fn frequencies(&self) -> &FrequencyTable {
        &self.frequencies
    }

    pub fn options(&self) -> &SmoothingOptions {
        &self.options
    }

    /// Fit one quantity (energy or time) of a row against the frequency
    /// table, mirroring the axis first when `symmetrize` is set.
    pub fn fit_quantity(&self, values: &[f64]) -> Result<Quadratic> {
        let freqs = self.frequencies.as_slice();
        if self.options.symmetrize {
            let (f, v) = mirror(freqs, values);
            fit(&f, &v)
        } else {
            fit(freqs, values)
        }
    }

    fn resample(&self, q: &Quadratic) -> Vec<f64> {
        self.frequencies
            .as_slice()
            .iter()
            .map(|&f| q.evaluate(f))
            .collect()
    }

    /// Smooth a single row: energies always, times when `fit_time` is set.
    pub fn smooth_row(&self, row: &MeasurementRow) -> Result<MeasurementRow> {
        row.check_shape(&self.frequencies)?;
        let freqs = self.frequencies.as_slice();

        let energy = self.fit_quantity(&row.energies)?;
        debug!(
            "row {}: energy {energy} (rms residual {:.4})",
            row.id,
            energy.rms_residual(freqs, &row.energies)
        );

        let times = if self.options.fit_time {
            let time = self.fit_quantity(&row.times)?;
            debug!(
                "row {}: time {time} (rms residual {:.4})",
                row.id,
                time.rms_residual(freqs, &row.times)
            );
            self.resample(&time)
        } else {
            row.times.clone()
        };

        Ok(MeasurementRow {
            id: row.id + self.options.id_offset,
            times,
            energies: self.resample(&energy),
        })
    }

    /// Smooth every row, keeping order. The first bad row aborts the run.
    pub fn process_table(&self, table: &MeasurementTable) -> Result<MeasurementTable> {
        let rows = table
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| self.smooth_row(row).map_err(|e| with_row_index(e, i)))
            .collect::<Result<Vec<_>>>()?;
        let smoothed = MeasurementTable::from_rows(rows);

        for hit in self.threshold_exceedances(&smoothed) {
            warn!(
                "id {}: predicted energy {:.3} at {} GHz reaches threshold",
                hit.id, hit.energy, hit.frequency
            );
        }
        info!(
            "smoothed {} rows over {} frequencies{}",
            smoothed.len(),
            self.frequencies.len(),
            if self.options.symmetrize { " (symmetrized)" } else { "" }
        );
        Ok(smoothed)
    }

    /// Every (row, frequency) whose energy reaches the configured threshold.
    pub fn threshold_exceedances(&self, table: &MeasurementTable) -> Vec<ThresholdHit> {
        let Some(threshold) = self.options.energy_threshold else {
            return Vec::new();
        };
        table
            .rows
            .iter()
            .flat_map(|row| {
                self.frequencies
                    .as_slice()
                    .iter()
                    .zip(&row.energies)
                    .filter(|(_, e)| **e >= threshold)
                    .map(|(&frequency, &energy)| ThresholdHit {
                        id: row.id,
                        frequency,
                        energy,
                    })
            })
            .collect()
    }
}

fn with_row_index(err: ModelError, index: usize) -> ModelError {
    match err {
        ModelError::Shape(m) => ModelError::Shape(format!("table row {}: {m}", index + 1)),
        ModelError::Fit(m) => ModelError::Fit(format!("table row {}: {m}", index + 1)),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::tests::assert_close;

    fn freqs_123() -> FrequencyTable {
        FrequencyTable::new(vec![1.0, 2.0, 3.0]).unwrap()
    }

    fn row(cols: &[f64]) -> MeasurementRow {
        MeasurementRow::from_columns(cols).unwrap()
    }

    #[test]
    fn test_end_to_end_example() {
        let model = FrequencyEnergyModel::new(freqs_123(), SmoothingOptions::default());
        let table = MeasurementTable::from_rows(vec![row(&[
            7.0, 10.0, 5.0, 20.0, 20.0, 30.0, 45.0,
        ])]);

        let q = model.fit_quantity(&table.rows[0].energies).unwrap();
        assert_close(q.a, 5.0, 1e-9);
        assert_close(q.b, 0.0, 1e-9);
        assert_close(q.c, 0.0, 1e-9);

        let out = model.process_table(&table).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.rows[0].id, 7.0);
        for (got, want) in out.rows[0].energies.iter().zip([5.0, 20.0, 45.0]) {
            assert_close(*got, want, 1e-9);
        }
        for (got, want) in out.rows[0].times.iter().zip([10.0, 20.0, 30.0]) {
            assert_close(*got, want, 1e-9);
        }
    }

    #[test]
    fn test_shape_mismatch_aborts() {
        let model = FrequencyEnergyModel::new(freqs_123(), SmoothingOptions::default());
        let bad = row(&[1.0, 10.0, 5.0, 20.0, 20.0]);
        assert!(matches!(model.smooth_row(&bad), Err(ModelError::Shape(_))));

        let table = MeasurementTable::from_rows(vec![
            row(&[1.0, 10.0, 5.0, 20.0, 20.0, 30.0, 45.0]),
            bad,
        ]);
        match model.process_table(&table) {
            Err(ModelError::Shape(msg)) => assert!(msg.contains("table row 2"), "{msg}"),
            other => panic!("expected shape error, got {other:?}"),
        }
    }

    #[test]
    fn test_fit_time_disabled_keeps_times() {
        let options = SmoothingOptions {
            fit_time: false,
            ..Default::default()
        };
        let model = FrequencyEnergyModel::new(freqs_123(), options);
        let input = row(&[3.0, 11.0, 5.0, 17.0, 20.0, 33.0, 45.0]);
        let out = model.smooth_row(&input).unwrap();
        assert_eq!(out.times, input.times);
    }

    #[test]
    fn test_noisy_times_are_smoothed() {
        let model = FrequencyEnergyModel::new(
            FrequencyTable::new(vec![1.0, 2.0, 3.0, 4.0]).unwrap(),
            SmoothingOptions::default(),
        );
        let input = row(&[1.0, 10.0, 1.0, 12.0, 4.0, 9.0, 9.0, 14.0, 16.0]);
        let out = model.smooth_row(&input).unwrap();
        assert_ne!(out.times, input.times);
        assert_eq!(out.pair_count(), 4);
    }

    #[test]
    fn test_symmetrized_fit_is_even() {
        let options = SmoothingOptions {
            symmetrize: true,
            ..Default::default()
        };
        let model = FrequencyEnergyModel::new(freqs_123(), options);
        let q = model.fit_quantity(&[3.0, 7.0, 14.0]).unwrap();
        assert_close(q.b, 0.0, 1e-10);
    }

    #[test]
    fn test_id_untouched_unless_offset() {
        let input = row(&[41.0, 10.0, 5.0, 20.0, 20.0, 30.0, 45.0]);
        let plain = FrequencyEnergyModel::new(freqs_123(), SmoothingOptions::default());
        assert_eq!(plain.smooth_row(&input).unwrap().id, 41.0);

        let shifted = FrequencyEnergyModel::new(
            freqs_123(),
            SmoothingOptions {
                id_offset: 1.0,
                ..Default::default()
            },
        );
        assert_eq!(shifted.smooth_row(&input).unwrap().id, 42.0);
    }

    #[test]
    fn test_rows_keep_order_and_independence() {
        let model = FrequencyEnergyModel::new(freqs_123(), SmoothingOptions::default());
        let a = row(&[1.0, 1.0, 2.0, 2.0, 8.0, 3.0, 18.0]);
        let b = row(&[2.0, 1.0, 1.0, 2.0, 1.0, 3.0, 1.0]);
        let both = model
            .process_table(&MeasurementTable::from_rows(vec![a.clone(), b.clone()]))
            .unwrap();
        let alone = model
            .process_table(&MeasurementTable::from_rows(vec![b]))
            .unwrap();
        assert_eq!(both.rows[0].id, 1.0);
        assert_eq!(both.rows[1], alone.rows[0]);
    }

    #[test]
    fn test_threshold_exceedances() {
        let options = SmoothingOptions {
            energy_threshold: Some(20.0),
            ..Default::default()
        };
        let model = FrequencyEnergyModel::new(freqs_123(), options);
        let table = MeasurementTable::from_rows(vec![row(&[
            7.0, 10.0, 5.0, 20.0, 21.0, 30.0, 45.0,
        ])]);
        let hits = model.threshold_exceedances(&table);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].frequency, 2.0);
        assert_eq!(hits[1].energy, 45.0);

        let silent = FrequencyEnergyModel::new(freqs_123(), SmoothingOptions::default());
        assert!(silent.threshold_exceedances(&table).is_empty());
    }
}
