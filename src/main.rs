//! hazgrid CLI
//!
//! Drives the full workflow: read a gridded rate forecast, distribute (or
//! re-weight) rates across magnitude bins, scale, assemble point sources,
//! write the source-model artifact and optionally run the hazard engine on
//! a prepared job directory.
//!
//! # Usage
//!
//! ```bash
//! hazgrid --forecast forecasts/m.csv --bval 0.929 -N 5.1 \
//!   --name Multiplicative --output examples/multiplicative/source.xml \
//!   --run examples/multiplicative
//! ```

use clap::Parser;
use hazgrid_core::config::ModelConfig;
use hazgrid_core::errors::{HazGridError, HazGridResult};
use hazgrid_core::forecast::{BinnedForecast, SpatialForecast};
use hazgrid_engine::{latest_calc_file, run_job, write_source_model};
use log::info;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

fn parse_site(raw: &str) -> Result<(f64, f64), String> {
    let (lon, lat) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected LON,LAT, got {:?}", raw))?;
    let lon = lon
        .trim()
        .parse()
        .map_err(|_| format!("cannot parse longitude {:?}", lon))?;
    let lat = lat
        .trim()
        .parse()
        .map_err(|_| format!("cannot parse latitude {:?}", lat))?;
    Ok((lon, lat))
}

/// Build seismic source models from gridded rate forecasts
#[derive(Parser, Debug)]
#[command(name = "hazgrid")]
#[command(about = "Build seismic source models from gridded rate forecasts")]
struct Args {
    /// Forecast CSV file
    #[arg(short, long)]
    forecast: PathBuf,

    /// Output path for the source-model artifact
    #[arg(short, long)]
    output: PathBuf,

    /// The forecast carries per-magnitude-bin rates
    #[arg(long)]
    binned: bool,

    /// Gutenberg-Richter b-value for magnitude (re)distribution
    #[arg(short, long)]
    bval: Option<f64>,

    /// Uniform multiplicative rate scale factor
    #[arg(short = 'N', long)]
    scale: Option<f64>,

    /// Model name embedded in the source model
    #[arg(short, long)]
    name: Option<String>,

    /// Investigation time written with the source model, years
    #[arg(long, default_value_t = 1.0)]
    investigation_time: f64,

    /// TOML file with magnitude and source-parameter overrides
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Site of interest as LON,LAT; repeat for more sites
    #[arg(long = "site", value_parser = parse_site)]
    sites: Vec<(f64, f64)>,

    /// Write the sites to this plain-text grid file
    #[arg(long)]
    site_grid: Option<PathBuf>,

    /// Job directory containing job.ini; run the engine after writing
    #[arg(long)]
    run: Option<PathBuf>,
}

fn write_site_grid(path: &Path, sites: &[(f64, f64)]) -> HazGridResult<()> {
    if sites.is_empty() {
        return Err(HazGridError::InvalidConfig(
            "--site-grid requires at least one --site".to_string(),
        ));
    }
    let mut out = String::new();
    for (lon, lat) in sites {
        let _ = writeln!(out, "{:.2} {:.2}", lon, lat);
    }
    std::fs::write(path, out)?;
    Ok(())
}

fn run(args: &Args) -> HazGridResult<()> {
    let config = match &args.config {
        Some(path) => ModelConfig::from_toml_path(path)?,
        None => ModelConfig::default(),
    };
    let bval = args.bval.or(config.bval).ok_or_else(|| {
        HazGridError::InvalidConfig(
            "no b-value given; pass --bval or set it in the config file".to_string(),
        )
    })?;
    let scale = args.scale.or(config.scale).unwrap_or(1.0);
    let name = args
        .name
        .clone()
        .or_else(|| config.name.clone())
        .unwrap_or_else(|| "hazgrid".to_string());
    let bins = config.magnitudes.bins()?;

    let mut model = if args.binned {
        let mut model = BinnedForecast::from_path(&args.forecast, bins)?;
        model.reweight_truncated_gr(bval);
        model
    } else {
        SpatialForecast::from_path(&args.forecast)?.into_binned(bins, bval)
    };
    model.scale(scale);

    let sources = model.build_sources(&config.source)?;
    write_source_model(&args.output, &name, args.investigation_time, &sources)?;

    if let Some(path) = &args.site_grid {
        write_site_grid(path, &args.sites)?;
    }

    if let Some(dir) = &args.run {
        let calc_id = run_job(dir)?;
        let database = latest_calc_file(dir)?;
        info!(
            "calculation {} complete; database at {}",
            calc_id,
            database.display()
        );
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    if let Err(err) = run(&args) {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn site_pairs_parse() {
        assert_eq!(parse_site("174.7,-36.8").unwrap(), (174.7, -36.8));
        assert_eq!(parse_site(" 174.7 , -36.8 ").unwrap(), (174.7, -36.8));
        assert!(parse_site("174.7").is_err());
        assert!(parse_site("lon,lat").is_err());
    }
}
