//! Quadratic energy/time vs CPU frequency models for per-query measurement
//! tables.
//!
//! ```text
//!  data::loader ──► fit::smooth::FrequencyEnergyModel ──► data::writer
//!                └► power::PowerModel
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod fit;
pub mod power;
