use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::data::model::{FrequencyTable, DEFAULT_FREQUENCIES};
use crate::error::{ModelError, Result};
use crate::fit::smooth::SmoothingOptions;

// ---------------------------------------------------------------------------
// Run configuration
// ---------------------------------------------------------------------------

/// Everything a run needs, as read from a JSON config file.
///
/// ```json
/// {
///   "input_path": "time_energy.txt",
///   "output_path": "smoothed.txt",
///   "frequencies": [0.8, 1.0, 1.2],
///   "symmetrize": false,
///   "fit_time": true,
///   "energy_threshold": 3000.0
/// }
/// ```
///
/// Every key is optional; command-line flags override file values.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub input_path: Option<PathBuf>,
    pub output_path: Option<PathBuf>,
    pub frequencies: Vec<f64>,
    pub symmetrize: bool,
    pub fit_time: bool,
    pub energy_threshold: Option<f64>,
    pub id_offset: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_path: None,
            output_path: None,
            frequencies: DEFAULT_FREQUENCIES.to_vec(),
            symmetrize: false,
            fit_time: true,
            energy_threshold: None,
            id_offset: 0.0,
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ModelError::io(path, e))?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| ModelError::Config(e.to_string()))
    }

    pub fn frequency_table(&self) -> Result<FrequencyTable> {
        FrequencyTable::new(self.frequencies.clone())
    }

    pub fn smoothing_options(&self) -> SmoothingOptions {
        SmoothingOptions {
            symmetrize: self.symmetrize,
            fit_time: self.fit_time,
            energy_threshold: self.energy_threshold,
            id_offset: self.id_offset,
        }
    }

    pub fn require_input(&self) -> Result<&Path> {
        self.input_path
            .as_deref()
            .ok_or_else(|| ModelError::Config("no input path given".into()))
    }

    pub fn require_output(&self) -> Result<&Path> {
        self.output_path
            .as_deref()
            .ok_or_else(|| ModelError::Config("no output path given".into()))
    }

    /// Check everything that can be checked before touching the filesystem.
    pub fn validate(&self) -> Result<()> {
        self.frequency_table()?;
        if let Some(t) = self.energy_threshold {
            if !t.is_finite() {
                return Err(ModelError::Config(format!("energy threshold {t} is not finite")));
            }
        }
        if !self.id_offset.is_finite() {
            return Err(ModelError::Config("id offset is not finite".into()));
        }
        Ok(())
    }
}

/// Parse a comma-separated list of numbers such as `0.8,1.0,1.2`.
pub fn parse_float_list(s: &str) -> std::result::Result<Vec<f64>, String> {
    s.split(',')
        .map(str::trim)
        .filter(|tok| !tok.is_empty())
        .map(|tok| {
            tok.parse::<f64>()
                .map_err(|_| format!("'{tok}' is not a number"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::from_json("{}").unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.frequency_table().unwrap().len(), 15);
        assert_eq!(cfg.smoothing_options(), SmoothingOptions::default());
        assert!(cfg.require_input().is_err());
    }

    #[test]
    fn test_full_file() {
        let cfg = Config::from_json(
            r#"{
                "input_path": "in.txt",
                "output_path": "out.txt",
                "frequencies": [1.0, 2.0, 3.0],
                "symmetrize": true,
                "fit_time": false,
                "energy_threshold": 3000
            }"#,
        )
        .unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.require_input().unwrap(), Path::new("in.txt"));
        let opts = cfg.smoothing_options();
        assert!(opts.symmetrize);
        assert!(!opts.fit_time);
        assert_eq!(opts.energy_threshold, Some(3000.0));
    }

    #[test]
    fn test_rejects_unknown_keys_and_bad_frequencies() {
        assert!(matches!(
            Config::from_json(r#"{"symetrize": true}"#),
            Err(ModelError::Config(_))
        ));
        let cfg = Config::from_json(r#"{"frequencies": [2.0, 1.0, 3.0]}"#).unwrap();
        assert!(matches!(cfg.validate(), Err(ModelError::Config(_))));
    }

    #[test]
    fn test_parse_float_list() {
        assert_eq!(parse_float_list("0.8, 1.0,1.2").unwrap(), vec![0.8, 1.0, 1.2]);
        assert_eq!(parse_float_list("").unwrap(), Vec::<f64>::new());
        assert!(parse_float_list("1,x").is_err());
    }
}
