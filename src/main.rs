use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::{debug, info};

use freqfit::config::{parse_float_list, Config};
use freqfit::data::{loader, writer};
use freqfit::fit::smooth::FrequencyEnergyModel;
use freqfit::power::PowerModel;

/// Fit quadratic energy/time models to per-frequency CPU measurements.
#[derive(Parser, Debug)]
#[command(name = "freqfit", version, about)]
struct Cli {
    /// JSON configuration file; flags below override its values.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v debug, -vv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replace every row's samples with its quadratic fit.
    Smooth(SmoothArgs),
    /// Fit the aggregate power model and evaluate it for core sets.
    Power(PowerArgs),
}

#[derive(Args, Debug)]
struct TableArgs {
    /// Measurement table to read.
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Comma-separated frequency table, e.g. `0.8,1.0,1.2`.
    #[arg(long, value_parser = parse_frequencies)]
    frequencies: Option<FloatList>,
}

#[derive(Args, Debug)]
struct SmoothArgs {
    #[command(flatten)]
    table: TableArgs,

    /// Where to write the smoothed table.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Fit over the mirrored frequency axis as well.
    #[arg(long, overrides_with = "no_symmetrize")]
    symmetrize: bool,

    /// Fit over the measured frequencies only, even if the config file
    /// enables symmetrization.
    #[arg(long, overrides_with = "symmetrize")]
    no_symmetrize: bool,

    /// Leave the time columns as measured.
    #[arg(long)]
    no_fit_time: bool,

    /// Warn about predicted energies at or above this value.
    #[arg(long)]
    energy_threshold: Option<f64>,

    /// Add this to every row id.
    #[arg(long, allow_hyphen_values = true)]
    id_offset: Option<f64>,
}

#[derive(Args, Debug)]
struct PowerArgs {
    #[command(flatten)]
    table: TableArgs,

    /// Core frequencies to evaluate, one set per flag (`--cores 0.8,3.5`).
    #[arg(long, value_parser = parse_frequencies)]
    cores: Vec<FloatList>,
}

#[derive(Clone, Debug)]
struct FloatList(Vec<f64>);

fn parse_frequencies(s: &str) -> std::result::Result<FloatList, String> {
    parse_float_list(s).map(FloatList)
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

impl TableArgs {
    fn apply(&self, cfg: &mut Config) {
        if let Some(input) = &self.input {
            cfg.input_path = Some(input.clone());
        }
        if let Some(FloatList(freqs)) = &self.frequencies {
            cfg.frequencies = freqs.clone();
        }
    }
}

impl SmoothArgs {
    fn apply(&self, cfg: &mut Config) {
        self.table.apply(cfg);
        if let Some(output) = &self.output {
            cfg.output_path = Some(output.clone());
        }
        if self.symmetrize {
            cfg.symmetrize = true;
        }
        if self.no_symmetrize {
            cfg.symmetrize = false;
        }
        if self.no_fit_time {
            cfg.fit_time = false;
        }
        if self.energy_threshold.is_some() {
            cfg.energy_threshold = self.energy_threshold;
        }
        if let Some(offset) = self.id_offset {
            cfg.id_offset = offset;
        }
    }
}

/// Config file (or defaults) when one is given on the command line.
fn base_config(cli_config: Option<&PathBuf>) -> Result<Config> {
    match cli_config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(Config::default()),
    }
}

fn run_smooth(cli_config: Option<&PathBuf>, args: &SmoothArgs) -> Result<()> {
    let mut cfg = base_config(cli_config)?;
    args.apply(&mut cfg);
    cfg.validate()?;

    let input = cfg.require_input()?;
    let output = cfg.require_output()?;
    let model = FrequencyEnergyModel::new(cfg.frequency_table()?, cfg.smoothing_options());
    info!("frequencies (GHz): {}", model.frequencies());
    debug!("smoothing options: {:?}", model.options());

    let table = loader::load_file(input)
        .with_context(|| format!("reading measurements from {}", input.display()))?;
    info!("read {} rows from {}", table.len(), input.display());

    let smoothed = model
        .process_table(&table)
        .context("smoothing measurements")?;

    writer::write_file(output, &smoothed)
        .with_context(|| format!("writing {}", output.display()))?;
    info!("wrote {} rows to {}", smoothed.len(), output.display());
    Ok(())
}

fn run_power(cli_config: Option<&PathBuf>, args: &PowerArgs) -> Result<()> {
    let mut cfg = base_config(cli_config)?;
    args.table.apply(&mut cfg);
    cfg.validate()?;

    let input = cfg.require_input()?;
    let frequencies = cfg.frequency_table()?;
    let table = loader::load_file(input)
        .with_context(|| format!("reading measurements from {}", input.display()))?;

    let model = PowerModel::fit(&table, &frequencies).context("fitting power model")?;
    let q = model.coefficients();
    println!("a = {}\nb = {}\nc = {}", q.a, q.b, q.c);

    let core_sets: Vec<Vec<f64>> = if args.cores.is_empty() {
        // Single slowest core up to all-fastest quad core, plus idle.
        let (lo, hi) = (frequencies.as_slice()[0], frequencies.as_slice()[frequencies.len() - 1]);
        vec![vec![lo], vec![lo, lo], vec![lo, hi], vec![hi; 4], vec![]]
    } else {
        args.cores.iter().map(|FloatList(c)| c.clone()).collect()
    };
    for cores in &core_sets {
        println!("cpu_power({cores:?}) = {:.4}", model.cpu_power(cores));
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Command::Smooth(args) => run_smooth(cli.config.as_ref(), args),
        Command::Power(args) => run_power(cli.config.as_ref(), args),
    }
}
