//! Writes a synthetic noisy measurement table for trying out `freqfit`.
//!
//! Usage: `generate_sample [output.txt]` – also writes a `.parquet` copy next
//! to the text file.

use std::path::PathBuf;

use anyhow::{Context, Result};
use freqfit::data::model::{MeasurementTable, DEFAULT_FREQUENCIES};
use freqfit::data::writer::write_file;

/// Package power in watts at frequency `f` GHz.
fn power_w(f: f64) -> f64 {
    1.6 * f * f + 0.4 * f + 6.0
}

/// One query: `[id, t_1, e_1, ...]` with time in ms and energy in J.
fn generate_row(id: usize, work: f64, noise_level: f64, rng: &mut SimpleRng) -> Vec<f64> {
    let mut row = vec![id as f64];
    for &f in &DEFAULT_FREQUENCIES {
        let time_ms = (work / f + 2.0) * (1.0 + rng.gauss(0.0, noise_level));
        let energy_j = power_w(f) * time_ms / 1000.0 * (1.0 + rng.gauss(0.0, noise_level));
        row.push(time_ms.max(0.01));
        row.push(energy_j.max(0.0));
    }
    row
}

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

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

fn main() -> Result<()> {
    let text_path = PathBuf::from(
        std::env::args()
            .nth(1)
            .unwrap_or_else(|| "sample_measurements.txt".to_string()),
    );
    let parquet_path = text_path.with_extension("parquet");

    let mut rng = SimpleRng::new(42);

    // Light, medium and heavy queries, 20 of each.
    let rows: Vec<Vec<f64>> = [50.0, 400.0, 2500.0]
        .iter()
        .flat_map(|&work| std::iter::repeat(work).take(20))
        .enumerate()
        .map(|(id, work)| {
            let work = work * (0.5 + rng.next_f64());
            generate_row(id, work, 0.04, &mut rng)
        })
        .collect();
    let table = MeasurementTable::from_columns(&rows)?;

    for path in [&text_path, &parquet_path] {
        write_file(path, &table).with_context(|| format!("writing {}", path.display()))?;
    }

    println!(
        "Wrote {} queries ({} frequencies each) to {} and {}",
        table.len(),
        DEFAULT_FREQUENCIES.len(),
        text_path.display(),
        parquet_path.display()
    );
    Ok(())
}
