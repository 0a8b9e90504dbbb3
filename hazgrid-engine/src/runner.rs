//! Hazard-calculation runner
//!
//! Thin wrapper around the external engine CLI. A run directory contains
//! the job descriptor (`job.ini`), the written source-model artifact and the
//! ancillary grid and logic-tree files; this module only launches the
//! process, resolves the calculation id and copies the result database back
//! into the directory. Failures surface as [`HazGridError::RunFailed`] with
//! no cleanup of prior state, and nothing here retries: the engine run is an
//! expensive, non-idempotent external process, so retrying is an operator
//! decision.

use hazgrid_core::errors::{HazGridError, HazGridResult};
use log::info;
use std::path::{Path, PathBuf};
use std::process::Command;

const DEFAULT_ENGINE_BIN: &str = "oq";

/// Engine executable name; the OQ_BIN environment variable overrides it.
fn engine_bin() -> String {
    std::env::var("OQ_BIN").unwrap_or_else(|_| DEFAULT_ENGINE_BIN.to_string())
}

fn oqdata_dir() -> HazGridResult<PathBuf> {
    let home = std::env::var_os("HOME").ok_or_else(|| {
        HazGridError::RunFailed("HOME is not set; cannot locate the engine data directory".into())
    })?;
    Ok(PathBuf::from(home).join("oqdata"))
}

/// Extract the latest calculation id from `engine --lhc` output.
///
/// The listing is ordered oldest first; the id is the first token of the
/// last non-empty line.
pub fn parse_latest_calc_id(listing: &str) -> HazGridResult<u32> {
    let line = listing
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .ok_or_else(|| HazGridError::RunFailed("empty calculation listing".to_string()))?;
    let token = line
        .split_whitespace()
        .next()
        .ok_or_else(|| HazGridError::RunFailed("empty calculation listing".to_string()))?;
    token.parse().map_err(|_| {
        HazGridError::RunFailed(format!("cannot parse a calculation id from {:?}", line))
    })
}

/// Run the hazard engine on `dir/job.ini` and copy the result database into
/// `dir`.
///
/// Returns the calculation id on success. On failure no partial state is
/// cleaned up, so the directory can be inspected as the engine left it.
pub fn run_job(dir: impl AsRef<Path>) -> HazGridResult<u32> {
    let dir = dir.as_ref();
    let job = dir.join("job.ini");
    let bin = engine_bin();

    info!("running {} engine --run {}", bin, job.display());
    let status = Command::new(&bin)
        .args(["engine", "--run"])
        .arg(&job)
        .status()?;
    if !status.success() {
        return Err(HazGridError::RunFailed(format!(
            "{} engine --run {} exited with {}",
            bin,
            job.display(),
            status
        )));
    }

    let listing = Command::new(&bin).args(["engine", "--lhc"]).output()?;
    if !listing.status.success() {
        return Err(HazGridError::RunFailed(format!(
            "{} engine --lhc exited with {}",
            bin, listing.status
        )));
    }
    let calc_id = parse_latest_calc_id(&String::from_utf8_lossy(&listing.stdout))?;

    let database = oqdata_dir()?.join(format!("calc_{}.hdf5", calc_id));
    std::fs::copy(&database, dir.join(format!("calc_{}.hdf5", calc_id)))?;
    info!(
        "calculation {} finished; database copied to {}",
        calc_id,
        dir.display()
    );
    Ok(calc_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_last_listing_row() {
        let listing = "\
12 complete 2026-01-10 someone hazard run a\n\
14 complete 2026-01-12 someone hazard run b\n\
17 complete 2026-02-01 someone hazard run c\n";
        assert_eq!(parse_latest_calc_id(listing).unwrap(), 17);
    }

    #[test]
    fn skips_trailing_blank_lines() {
        let listing = "3 complete yesterday someone demo\n\n\n";
        assert_eq!(parse_latest_calc_id(listing).unwrap(), 3);
    }

    #[test]
    fn rejects_empty_listing() {
        assert!(matches!(
            parse_latest_calc_id(""),
            Err(HazGridError::RunFailed(_))
        ));
        assert!(matches!(
            parse_latest_calc_id("\n  \n"),
            Err(HazGridError::RunFailed(_))
        ));
    }

    #[test]
    fn rejects_non_numeric_listing() {
        assert!(matches!(
            parse_latest_calc_id("id status owner\n"),
            Err(HazGridError::RunFailed(_))
        ));
    }
}
