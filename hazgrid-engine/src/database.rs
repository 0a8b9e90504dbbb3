//! Result-database access
//!
//! A finished calculation leaves a `calc_<id>.hdf5` database in the run
//! directory. Locating the most recent one (greatest embedded id) needs no
//! HDF5 support and is always available; extracting site coordinates and
//! mean hazard curves requires the `hdf5` cargo feature, which links the
//! system HDF5 library.
//!
//! The database does not re-expose the intensity-measure levels the job was
//! configured with, so callers must supply them; [`default_imtls`] matches
//! the bundled job configurations.

use hazgrid_core::errors::{HazGridError, HazGridResult};
use ndarray::{Array1, Array2};
use std::path::{Path, PathBuf};

/// Mean hazard curves harvested from one calculation.
#[derive(Debug, Clone, PartialEq)]
pub struct HazardCurves {
    /// Site coordinates, one (lon, lat) row per site.
    pub grid: Array2<f64>,
    /// Mean probability-of-exceedance values, one row per site, one column
    /// per intensity-measure level.
    pub hcurves: Array2<f64>,
    /// Intensity-measure levels the columns refer to (caller-supplied).
    pub imtls: Array1<f64>,
}

/// The 30 log-spaced intensity-measure levels (10^-2 to 10^0.2 g) shared by
/// the bundled job configurations.
pub fn default_imtls() -> Array1<f64> {
    Array1::logspace(10.0, -2.0, 0.2, 30)
}

/// Extract the numeric id from a `calc_<id>.hdf5` file name.
pub fn calc_id_from_name(name: &str) -> Option<u32> {
    name.strip_prefix("calc_")?
        .strip_suffix(".hdf5")?
        .parse()
        .ok()
}

/// Locate the most recent calculation database in `dir`.
///
/// "Most recent" means the greatest id embedded in the file name, matching
/// the engine's monotonically increasing calculation counter.
pub fn latest_calc_file(dir: impl AsRef<Path>) -> HazGridResult<PathBuf> {
    let dir = dir.as_ref();
    let mut best: Option<(u32, PathBuf)> = None;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if let Some(id) = calc_id_from_name(name) {
            if best.as_ref().map_or(true, |(best_id, _)| id > *best_id) {
                best = Some((id, entry.path()));
            }
        }
    }
    best.map(|(_, path)| path).ok_or_else(|| {
        HazGridError::Database(format!(
            "no calculation database found in {}",
            dir.display()
        ))
    })
}

#[cfg(feature = "hdf5")]
mod read {
    use super::*;
    use log::info;

    fn db_err(err: impl std::fmt::Display) -> HazGridError {
        HazGridError::Database(err.to_string())
    }

    fn read_vec(file: &hdf5::File, name: &str) -> HazGridResult<Vec<f64>> {
        file.dataset(name)
            .map_err(db_err)?
            .read_raw::<f64>()
            .map_err(db_err)
    }

    /// Read site coordinates and mean hazard curves from the most recent
    /// calculation database in `dir`.
    ///
    /// `imtls` must be the intensity-measure levels the calculation was
    /// configured with; only their count can be checked here.
    pub fn read_mean_curves(dir: impl AsRef<Path>, imtls: Array1<f64>) -> HazGridResult<HazardCurves> {
        let path = latest_calc_file(dir)?;
        info!("reading mean curves from {}", path.display());
        let file = hdf5::File::open(&path).map_err(db_err)?;

        let lon = read_vec(&file, "sitecol/lon")?;
        let lat = read_vec(&file, "sitecol/lat")?;
        if lon.len() != lat.len() {
            return Err(HazGridError::Database(format!(
                "site coordinate arrays disagree: {} lon vs {} lat",
                lon.len(),
                lat.len()
            )));
        }
        let mut grid = Array2::zeros((lon.len(), 2));
        for (site, (x, y)) in lon.iter().zip(lat.iter()).enumerate() {
            grid[[site, 0]] = *x;
            grid[[site, 1]] = *y;
        }

        // Statistics are stored [site, stat, imt, level], row-major; the mean
        // curve is the first statistic of the first intensity-measure type.
        let stats = file.dataset("hcurves-stats").map_err(db_err)?;
        let shape = stats.shape();
        if shape.len() != 4 {
            return Err(HazGridError::Database(format!(
                "hcurves-stats has {} dimensions, expected 4",
                shape.len()
            )));
        }
        let flat = stats.read_raw::<f64>().map_err(db_err)?;
        let (nsites, nlevels) = (shape[0], shape[3]);
        let site_stride = shape[1] * shape[2] * nlevels;
        let mut hcurves = Array2::zeros((nsites, nlevels));
        for site in 0..nsites {
            for level in 0..nlevels {
                hcurves[[site, level]] = flat[site * site_stride + level];
            }
        }

        if hcurves.ncols() != imtls.len() {
            return Err(HazGridError::Database(format!(
                "curve length {} does not match the {} supplied intensity levels",
                hcurves.ncols(),
                imtls.len()
            )));
        }
        if hcurves.nrows() != grid.nrows() {
            return Err(HazGridError::Database(format!(
                "{} curves for {} sites",
                hcurves.nrows(),
                grid.nrows()
            )));
        }

        Ok(HazardCurves {
            grid,
            hcurves,
            imtls,
        })
    }
}

#[cfg(feature = "hdf5")]
pub use read::read_mean_curves;

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn calc_ids_parse_from_file_names() {
        assert_eq!(calc_id_from_name("calc_17.hdf5"), Some(17));
        assert_eq!(calc_id_from_name("calc_0.hdf5"), Some(0));
        assert_eq!(calc_id_from_name("calc_17.txt"), None);
        assert_eq!(calc_id_from_name("calc_abc.hdf5"), None);
        assert_eq!(calc_id_from_name("job.ini"), None);
    }

    #[test]
    fn picks_the_greatest_calc_id() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["calc_3.hdf5", "calc_12.hdf5", "calc_9.hdf5", "job.ini"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        let latest = latest_calc_file(dir.path()).unwrap();
        assert_eq!(latest.file_name().unwrap(), "calc_12.hdf5");
    }

    #[test]
    fn errors_when_no_database_exists() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("job.ini"), b"").unwrap();
        assert!(matches!(
            latest_calc_file(dir.path()),
            Err(HazGridError::Database(_))
        ));
    }

    #[test]
    fn default_imtls_span_the_expected_range() {
        let imtls = default_imtls();
        assert_eq!(imtls.len(), 30);
        assert_relative_eq!(imtls[0], 0.01, max_relative = 1e-12);
        assert_relative_eq!(imtls[29], 10f64.powf(0.2), max_relative = 1e-12);
        for pair in imtls.as_slice().unwrap().windows(2) {
            assert!(pair[1] > pair[0]);
        }
    }
}
