//! Aggregate CPU power model.
//!
//! Averages the power drawn at each frequency step over all measured
//! queries, fits an even parabola `P(f) = a·f² + c` (mirrored axis) and
//! uses it to estimate the power of a set of cores running at given
//! frequencies.

use log::info;

use crate::data::model::{FrequencyTable, MeasurementTable};
use crate::error::{ModelError, Result};
use crate::fit::{fit, mirror, Quadratic};

/// Watts attributed to each active core on top of the dynamic term.
pub const IDLE_OFFSET_W: f64 = 0.1;

/// Mean power per frequency step: `mean(e_k / (t_k / 1000))`, i.e. joules
/// over milliseconds converted to watts.
pub fn mean_power(table: &MeasurementTable, frequencies: &FrequencyTable) -> Result<Vec<f64>> {
    if table.is_empty() {
        return Err(ModelError::Shape("no rows to average power over".into()));
    }
    for (i, row) in table.rows.iter().enumerate() {
        row.check_shape(frequencies).map_err(|e| match e {
            ModelError::Shape(m) => ModelError::Shape(format!("table row {}: {m}", i + 1)),
            other => other,
        })?;
    }

    let rows = table.len() as f64;
    (0..frequencies.len())
        .map(|k| {
            let mut sum = 0.0;
            for (i, row) in table.rows.iter().enumerate() {
                let seconds = row.times[k] / 1000.0;
                if seconds == 0.0 {
                    return Err(ModelError::Fit(format!(
                        "table row {}: id {}: zero time at {} GHz",
                        i + 1,
                        row.id,
                        frequencies.as_slice()[k]
                    )));
                }
                sum += row.energies[k] / seconds;
            }
            Ok(sum / rows)
        })
        .collect()
}

/// Even quadratic power curve over CPU frequency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerModel {
    coefficients: Quadratic,
}

impl PowerModel {
    /// Fit the model to the mean power of every frequency step.
    pub fn fit(table: &MeasurementTable, frequencies: &FrequencyTable) -> Result<Self> {
        let power = mean_power(table, frequencies)?;
        let (f, p) = mirror(frequencies.as_slice(), &power);
        let coefficients = fit(&f, &p)?;
        info!(
            "power model over {} rows: P(f) = {coefficients}",
            table.len()
        );
        Ok(Self { coefficients })
    }

    pub fn coefficients(&self) -> Quadratic {
        self.coefficients
    }

    /// Estimated package power with one core per entry of `core_frequencies`.
    ///
    /// The constant term is shared; every active core adds `a·f²` plus
    /// [`IDLE_OFFSET_W`]. An empty slice gives the idle power.
    pub fn cpu_power(&self, core_frequencies: &[f64]) -> f64 {
        let base = self.coefficients.c - IDLE_OFFSET_W;
        core_frequencies
            .iter()
            .map(|f| self.coefficients.a * f * f + IDLE_OFFSET_W)
            .fold(base, |acc, core| acc + core)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::tests::assert_close;

    fn table_with_power(freqs: &[f64], watts: impl Fn(f64) -> f64) -> MeasurementTable {
        // Two rows with different run times but the same power.
        let rows: Vec<Vec<f64>> = [250.0, 1000.0]
            .iter()
            .enumerate()
            .map(|(i, &ms)| {
                let mut cols = vec![i as f64];
                for &f in freqs {
                    cols.push(ms);
                    cols.push(watts(f) * ms / 1000.0);
                }
                cols
            })
            .collect();
        MeasurementTable::from_columns(&rows).unwrap()
    }

    #[test]
    fn test_mean_power() {
        let freqs = FrequencyTable::new(vec![1.0, 2.0, 3.0]).unwrap();
        let table = table_with_power(freqs.as_slice(), |f| 10.0 * f);
        let power = mean_power(&table, &freqs).unwrap();
        for (got, want) in power.iter().zip([10.0, 20.0, 30.0]) {
            assert_close(*got, want, 1e-9);
        }
    }

    #[test]
    fn test_fit_recovers_quadratic_power() {
        let freqs = FrequencyTable::default();
        let table = table_with_power(freqs.as_slice(), |f| 1.5 * f * f + 4.0);
        let model = PowerModel::fit(&table, &freqs).unwrap();
        let q = model.coefficients();
        assert_close(q.a, 1.5, 1e-8);
        assert_close(q.b, 0.0, 1e-8);
        assert_close(q.c, 4.0, 1e-8);
    }

    #[test]
    fn test_cpu_power_per_core() {
        let model = PowerModel {
            coefficients: Quadratic::new(2.0, 0.0, 5.0),
        };
        assert_close(model.cpu_power(&[]), 4.9, 1e-12);
        assert_close(model.cpu_power(&[1.0]), 7.0, 1e-12);
        assert_close(model.cpu_power(&[1.0, 1.0]), 9.1, 1e-12);
        assert_close(model.cpu_power(&[1.0, 2.0]), 15.1, 1e-12);
    }

    #[test]
    fn test_zero_time_and_empty_table() {
        let freqs = FrequencyTable::new(vec![1.0, 2.0, 3.0]).unwrap();
        let table =
            MeasurementTable::from_columns(&[vec![1.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0]]).unwrap();
        assert!(matches!(mean_power(&table, &freqs), Err(ModelError::Fit(_))));
        assert!(matches!(
            mean_power(&MeasurementTable::default(), &freqs),
            Err(ModelError::Shape(_))
        ));
    }
}
