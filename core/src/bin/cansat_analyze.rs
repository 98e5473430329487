use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use cansat_core::cli::print_report;
use cansat_core::comparator::{JsonFileReference, OpenMeteoReference, ReferenceProvider};
use cansat_core::config::load_config;
use cansat_core::generator::SyntheticPlan;
use cansat_core::metrics::Metrics;
use cansat_core::pipeline::{run, Source};

#[derive(Parser, Debug)]
#[command(name = "cansat-analyze", about = "Refine CanSat telemetry and derive flight quantities")]
struct Args {
    /// Analysis config (JSON). Defaults are used when the file is missing
    #[arg(long, default_value = "cansat.json")]
    config: PathBuf,

    /// Raw telemetry file (defaults to the config's raw path)
    #[arg(long, conflicts_with_all = ["synthetic", "store"])]
    raw: Option<PathBuf>,

    /// Generate a synthetic flight instead of reading one
    #[arg(long, default_value_t = false, conflicts_with = "store")]
    synthetic: bool,

    /// Seed for --synthetic
    #[arg(long, requires = "synthetic")]
    seed: Option<u64>,

    /// Read the flight back from a table store directory
    #[arg(long)]
    store: Option<PathBuf>,

    /// Output directory for report and views (defaults to the config's out path)
    #[arg(long)]
    out: Option<PathBuf>,

    /// Reference temperatures as JSON { "temperatures": [...], "times": [...] }
    #[arg(long, conflicts_with = "forecast")]
    reference_json: Option<PathBuf>,

    /// Fetch reference temperatures from the Open-Meteo forecast at "lat,lon"
    #[arg(long, value_parser = parse_lat_lon, allow_hyphen_values = true)]
    forecast: Option<(f64, f64)>,

    /// Grid points per axis of the exported wind field (defaults to the config's)
    #[arg(long)]
    grid: Option<usize>,

    /// Print Prometheus counters after the run
    #[arg(long, default_value_t = false)]
    metrics: bool,
}

fn parse_lat_lon(s: &str) -> Result<(f64, f64), String> {
    let (lat, lon) = s.split_once(',').ok_or("expected lat,lon")?;
    let lat: f64 = lat.trim().parse().map_err(|e| format!("latitude: {e}"))?;
    let lon: f64 = lon.trim().parse().map_err(|e| format!("longitude: {e}"))?;
    Ok((lat, lon))
}

impl Args {
    fn source(&self) -> Source {
        if self.synthetic {
            Source::Synthetic {
                seed: self.seed,
                plan: SyntheticPlan::default(),
            }
        } else if let Some(dir) = &self.store {
            Source::Store(dir.clone())
        } else {
            Source::Raw
        }
    }

    fn reference(&self) -> Option<Box<dyn ReferenceProvider>> {
        match (&self.reference_json, self.forecast) {
            (Some(path), _) => Some(Box::new(JsonFileReference::new(path))),
            (None, Some((lat, lon))) => Some(Box::new(OpenMeteoReference::new(lat, lon))),
            (None, None) => None,
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = load_config(&args.config).with_context(|| format!("loading {}", args.config.display()))?;
    if let Some(raw) = &args.raw {
        config.paths.raw = raw.clone();
    }
    if let Some(out) = &args.out {
        config.paths.out = out.clone();
    }
    if let Some(grid) = args.grid {
        config.wind_grid = grid;
    }

    let metrics = Metrics::global();
    let reference = args.reference();
    let report = run(&config, &args.source(), reference.as_deref(), Some(metrics));

    print_report(&report);
    if args.metrics {
        println!("{}", metrics.render());
    }
    Ok(())
}
