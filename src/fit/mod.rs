//! Quadratic least-squares regression over frequency samples.
//!
//! ```text
//!  (f_i, v_i) samples ──► [f², f, 1] design ──► Householder QR ──► (a, b, c)
//! ```
//!
//! Columns are scaled to unit norm before factorisation so the rank test
//! on the diagonal of R is independent of the units of `f`.

pub mod smooth;

use std::fmt;

use crate::error::{ModelError, Result};

/// Relative size below which a diagonal entry of R counts as zero.
const RANK_TOLERANCE: f64 = 1e-10;

/// `value(f) = a·f² + b·f + c`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quadratic {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl Quadratic {
    pub fn new(a: f64, b: f64, c: f64) -> Self {
        Self { a, b, c }
    }

    pub fn evaluate(&self, f: f64) -> f64 {
        evaluate(f, self.a, self.b, self.c)
    }

    /// Root-mean-square residual of the model against the samples.
    pub fn rms_residual(&self, frequencies: &[f64], values: &[f64]) -> f64 {
        if frequencies.is_empty() {
            return 0.0;
        }
        let sum_sq: f64 = frequencies
            .iter()
            .zip(values)
            .map(|(&f, &v)| (self.evaluate(f) - v).powi(2))
            .sum();
        (sum_sq / frequencies.len() as f64).sqrt()
    }
}

impl fmt::Display for Quadratic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}·f² {:+.6}·f {:+.6}", self.a, self.b, self.c)
    }
}

/// `a·f² + b·f + c`
pub fn evaluate(f: f64, a: f64, b: f64, c: f64) -> f64 {
    (a * f + b) * f + c
}

/// Fit `value(f) = a·f² + b·f + c` by least squares.
///
/// # Errors
/// * [`ModelError::Shape`] when the sequences differ in length or hold
///   fewer than three samples.
/// * [`ModelError::Fit`] when a sample is not finite or the frequencies do
///   not span three distinct values (rank-deficient design).
pub fn fit(frequencies: &[f64], values: &[f64]) -> Result<Quadratic> {
    if frequencies.len() != values.len() {
        return Err(ModelError::Shape(format!(
            "{} frequencies but {} values",
            frequencies.len(),
            values.len()
        )));
    }
    let n = frequencies.len();
    if n < 3 {
        return Err(ModelError::Shape(format!(
            "a quadratic fit needs at least 3 samples, got {n}"
        )));
    }
    if let Some(bad) = frequencies.iter().chain(values).find(|v| !v.is_finite()) {
        return Err(ModelError::Fit(format!("sample {bad} is not finite")));
    }

    // Design matrix in column-major order: [f², f, 1].
    let mut cols: [Vec<f64>; 3] = [
        frequencies.iter().map(|f| f * f).collect(),
        frequencies.to_vec(),
        vec![1.0; n],
    ];
    let mut scale = [0.0; 3];
    for (col, s) in cols.iter_mut().zip(scale.iter_mut()) {
        *s = norm(col);
        if *s == 0.0 {
            return Err(ModelError::Fit("design matrix has an all-zero column".into()));
        }
        col.iter_mut().for_each(|v| *v /= *s);
    }

    let mut rhs = values.to_vec();
    let mut diag = [0.0; 3];

    for k in 0..3 {
        let alpha = {
            let x = &cols[k][k..];
            let len = norm(x);
            if x[0] > 0.0 {
                -len
            } else {
                len
            }
        };
        diag[k] = alpha;
        if alpha == 0.0 {
            break;
        }

        // Householder vector v = x - alpha·e1, kept in cols[k][k..].
        cols[k][k] -= alpha;
        let v: Vec<f64> = cols[k][k..].to_vec();
        let vtv: f64 = v.iter().map(|x| x * x).sum();
        if vtv == 0.0 {
            continue;
        }

        for j in (k + 1)..3 {
            reflect(&v, vtv, &mut cols[j][k..]);
        }
        reflect(&v, vtv, &mut rhs[k..]);
    }

    let largest = diag.iter().fold(0.0_f64, |m, d| m.max(d.abs()));
    if let Some(k) = diag.iter().position(|d| d.abs() <= RANK_TOLERANCE * largest) {
        return Err(ModelError::Fit(format!(
            "rank-deficient design (column {k}): need at least 3 distinct frequencies"
        )));
    }

    // Back substitution on the upper triangle R (diag + cols above it).
    let mut coef = [0.0; 3];
    for k in (0..3).rev() {
        let mut acc = rhs[k];
        for j in (k + 1)..3 {
            acc -= cols[j][k] * coef[j];
        }
        coef[k] = acc / diag[k];
    }

    Ok(Quadratic::new(
        coef[0] / scale[0],
        coef[1] / scale[1],
        coef[2] / scale[2],
    ))
}

/// Append the mirrored samples `(-f_i, v_i)` so the fit is pulled towards
/// an even parabola (`b ≈ 0`).
pub fn mirror(frequencies: &[f64], values: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let freqs = frequencies
        .iter()
        .copied()
        .chain(frequencies.iter().map(|f| -f))
        .collect();
    let vals = values.iter().chain(values).copied().collect();
    (freqs, vals)
}

fn norm(x: &[f64]) -> f64 {
    x.iter().map(|v| v * v).sum::<f64>().sqrt()
}

/// y ← (I - 2·v·vᵀ / vᵀv)·y
fn reflect(v: &[f64], vtv: f64, y: &mut [f64]) {
    let dot: f64 = v.iter().zip(y.iter()).map(|(a, b)| a * b).sum();
    let factor = 2.0 * dot / vtv;
    for (yi, vi) in y.iter_mut().zip(v) {
        *yi -= factor * vi;
    }
}
