//! Gridded rate forecast ingestion and rate processing
//!
//! Forecast files are delimited text with one header row and one row per
//! spatial cell. Columns 0-3 hold two (lon, lat) corner pairs of the cell's
//! bounding box; the cell centroid is the midpoint of the two corners, each
//! coordinate averaged independently. The two file layouts are modeled as
//! two types rather than a mode flag:
//!
//! - [`SpatialForecast`]: column 8 is the total annual rate, column 9 the
//!   dispersion statistic. Carries no per-magnitude-bin rates until
//!   [`SpatialForecast::into_binned`] projects the totals through a
//!   truncated Gutenberg-Richter distribution.
//! - [`BinnedForecast`]: columns 6 to last-1 are per-magnitude-bin rates
//!   (one per configured bin), the last column is the dispersion statistic.
//!   Totals are the row sums. [`BinnedForecast::reweight_truncated_gr`]
//!   re-weights (not replaces) the existing magnitude distribution.
//!
//! Invalid combinations, such as re-weighting a forecast that has no bins
//! or projecting one that already has them, are unrepresentable.

use crate::config::SourceConfig;
use crate::errors::{HazGridError, HazGridResult};
use crate::magnitude::{EvenlyDiscretizedMfd, MagnitudeBins};
use crate::source::{Location, PointSource, TemporalOccurrenceModel};
use csv::{ReaderBuilder, StringRecord, Trim};
use log::{debug, info, warn};
use ndarray::{Array1, Array2};
use std::ops::Index;
use std::path::Path;

const SPATIAL_RATE_COL: usize = 8;
const SPATIAL_DISPERSION_COL: usize = 9;
const BINNED_FIRST_RATE_COL: usize = 6;

/// Ordered sequence of cell centroids. Fixed for the lifetime of a loaded
/// forecast; all per-cell arrays are aligned by index to this sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastGrid {
    centroids: Vec<Location>,
}

impl ForecastGrid {
    pub fn new(centroids: Vec<Location>) -> Self {
        Self { centroids }
    }

    pub fn len(&self) -> usize {
        self.centroids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centroids.is_empty()
    }

    pub fn get(&self, cell: usize) -> Option<&Location> {
        self.centroids.get(cell)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Location> {
        self.centroids.iter()
    }
}

impl Index<usize> for ForecastGrid {
    type Output = Location;

    fn index(&self, cell: usize) -> &Location {
        &self.centroids[cell]
    }
}

/// A forecast carrying one total rate per cell, no magnitude structure.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialForecast {
    grid: ForecastGrid,
    rates: Array1<f64>,
    dispersion: Array1<f64>,
}

/// A forecast carrying per-magnitude-bin rates for every cell.
#[derive(Debug, Clone, PartialEq)]
pub struct BinnedForecast {
    grid: ForecastGrid,
    bins: MagnitudeBins,
    rates: Array1<f64>,
    dispersion: Array1<f64>,
    rates_mbin: Array2<f64>,
}

fn parse_field(record: &StringRecord, line: usize, column: usize) -> HazGridResult<f64> {
    let raw = record.get(column).unwrap_or("");
    raw.parse::<f64>().map_err(|_| HazGridError::Parse {
        line,
        column,
        value: raw.to_string(),
    })
}

/// Midpoint of the two (lon, lat) corner pairs in columns 0-3.
fn centroid(record: &StringRecord, line: usize) -> HazGridResult<Location> {
    let lon_a = parse_field(record, line, 0)?;
    let lat_a = parse_field(record, line, 1)?;
    let lon_b = parse_field(record, line, 2)?;
    let lat_b = parse_field(record, line, 3)?;
    Ok(Location::new((lon_a + lon_b) / 2.0, (lat_a + lat_b) / 2.0))
}

fn open_reader(path: &Path) -> HazGridResult<csv::Reader<std::fs::File>> {
    Ok(ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_path(path)?)
}

fn warn_on_negative_rates(rates: &Array1<f64>, path: &Path) {
    let negatives = rates.iter().filter(|r| **r < 0.0).count();
    if negatives > 0 {
        warn!(
            "{}: {} cells carry negative rates",
            path.display(),
            negatives
        );
    }
}

impl SpatialForecast {
    /// Assemble a forecast from already-parsed arrays.
    ///
    /// Fails if the per-cell arrays are not aligned with the grid.
    pub fn from_parts(
        grid: ForecastGrid,
        rates: Array1<f64>,
        dispersion: Array1<f64>,
    ) -> HazGridResult<Self> {
        if rates.len() != grid.len() || dispersion.len() != grid.len() {
            return Err(HazGridError::InvalidConfig(format!(
                "misaligned forecast arrays: {} cells, {} rates, {} dispersion values",
                grid.len(),
                rates.len(),
                dispersion.len()
            )));
        }
        Ok(Self {
            grid,
            rates,
            dispersion,
        })
    }

    /// Read a spatial-only forecast file.
    pub fn from_path(path: impl AsRef<Path>) -> HazGridResult<Self> {
        let path = path.as_ref();
        let mut reader = open_reader(path)?;

        let mut centroids = Vec::new();
        let mut rates = Vec::new();
        let mut dispersion = Vec::new();
        for (i, result) in reader.records().enumerate() {
            let record = result?;
            let line = i + 2;
            if record.len() <= SPATIAL_DISPERSION_COL {
                return Err(HazGridError::MalformedInput {
                    line,
                    expected: format!("at least {}", SPATIAL_DISPERSION_COL + 1),
                    got: record.len(),
                });
            }
            centroids.push(centroid(&record, line)?);
            rates.push(parse_field(&record, line, SPATIAL_RATE_COL)?);
            dispersion.push(parse_field(&record, line, SPATIAL_DISPERSION_COL)?);
        }
        if centroids.is_empty() {
            return Err(HazGridError::EmptyInput(path.display().to_string()));
        }

        info!(
            "read spatial forecast {} ({} cells)",
            path.display(),
            centroids.len()
        );
        let rates = Array1::from(rates);
        warn_on_negative_rates(&rates, path);
        Self::from_parts(ForecastGrid::new(centroids), rates, Array1::from(dispersion))
    }

    pub fn len(&self) -> usize {
        self.grid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grid.is_empty()
    }

    pub fn grid(&self) -> &ForecastGrid {
        &self.grid
    }

    /// Total expected annual rate per cell.
    pub fn rates(&self) -> &Array1<f64> {
        &self.rates
    }

    /// Per-cell dispersion statistic (0 means Poisson).
    pub fn dispersion(&self) -> &Array1<f64> {
        &self.dispersion
    }

    /// Multiply every total rate by `factor`, in place.
    ///
    /// Repeated calls compose multiplicatively. A non-positive factor is
    /// accepted mechanically and produces a degenerate model; guarding
    /// against that is the caller's responsibility.
    pub fn scale(&mut self, factor: f64) {
        self.rates *= factor;
        debug!("scaled {} total rates by {}", self.rates.len(), factor);
    }

    /// Project the total rates into magnitude bins with a truncated
    /// Gutenberg-Richter distribution.
    ///
    /// Every cell receives the same relative magnitude-frequency shape,
    /// scaled by its own total rate, so each row of the resulting matrix
    /// sums back to the cell total.
    pub fn into_binned(self, bins: MagnitudeBins, bval: f64) -> BinnedForecast {
        let weights = bins.truncated_gr_weights(bval);
        let mut rates_mbin = Array2::zeros((self.grid.len(), bins.len()));
        for (cell, mut row) in rates_mbin.outer_iter_mut().enumerate() {
            row.assign(&(&weights * self.rates[cell]));
        }
        debug!(
            "distributed {} cell totals over {} magnitude bins (b={})",
            self.grid.len(),
            bins.len(),
            bval
        );
        BinnedForecast {
            grid: self.grid,
            bins,
            rates: self.rates,
            dispersion: self.dispersion,
            rates_mbin,
        }
    }
}

impl BinnedForecast {
    /// Assemble a forecast from already-parsed arrays.
    ///
    /// Cell totals are derived as row sums of `rates_mbin`. Fails if the
    /// matrix shape does not line up with the grid and bin geometry.
    pub fn from_parts(
        grid: ForecastGrid,
        bins: MagnitudeBins,
        rates_mbin: Array2<f64>,
        dispersion: Array1<f64>,
    ) -> HazGridResult<Self> {
        if rates_mbin.nrows() != grid.len()
            || rates_mbin.ncols() != bins.len()
            || dispersion.len() != grid.len()
        {
            return Err(HazGridError::InvalidConfig(format!(
                "misaligned forecast arrays: {} cells, {} bins, {}x{} rate matrix, {} dispersion values",
                grid.len(),
                bins.len(),
                rates_mbin.nrows(),
                rates_mbin.ncols(),
                dispersion.len()
            )));
        }
        let rates = rates_mbin.sum_axis(ndarray::Axis(1));
        Ok(Self {
            grid,
            bins,
            rates,
            dispersion,
            rates_mbin,
        })
    }

    /// Read a magnitude-binned forecast file.
    ///
    /// The per-bin column count must match `bins` exactly.
    pub fn from_path(path: impl AsRef<Path>, bins: MagnitudeBins) -> HazGridResult<Self> {
        let path = path.as_ref();
        let expected_cols = BINNED_FIRST_RATE_COL + bins.len() + 1;
        let mut reader = open_reader(path)?;

        let mut centroids = Vec::new();
        let mut flat = Vec::new();
        let mut dispersion = Vec::new();
        for (i, result) in reader.records().enumerate() {
            let record = result?;
            let line = i + 2;
            if record.len() != expected_cols {
                return Err(HazGridError::MalformedInput {
                    line,
                    expected: expected_cols.to_string(),
                    got: record.len(),
                });
            }
            centroids.push(centroid(&record, line)?);
            for column in BINNED_FIRST_RATE_COL..BINNED_FIRST_RATE_COL + bins.len() {
                flat.push(parse_field(&record, line, column)?);
            }
            dispersion.push(parse_field(&record, line, expected_cols - 1)?);
        }
        if centroids.is_empty() {
            return Err(HazGridError::EmptyInput(path.display().to_string()));
        }

        info!(
            "read binned forecast {} ({} cells x {} bins)",
            path.display(),
            centroids.len(),
            bins.len()
        );
        let rates_mbin = Array2::from_shape_vec((centroids.len(), bins.len()), flat)
            .expect("row-major layout matches collected shape");
        let forecast = Self::from_parts(
            ForecastGrid::new(centroids),
            bins,
            rates_mbin,
            Array1::from(dispersion),
        )?;
        warn_on_negative_rates(&forecast.rates, path);
        Ok(forecast)
    }

    pub fn len(&self) -> usize {
        self.grid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grid.is_empty()
    }

    pub fn grid(&self) -> &ForecastGrid {
        &self.grid
    }

    pub fn bins(&self) -> &MagnitudeBins {
        &self.bins
    }

    /// Total expected annual rate per cell (row sums of the bin matrix).
    pub fn rates(&self) -> &Array1<f64> {
        &self.rates
    }

    /// Per-cell dispersion statistic (0 means Poisson).
    pub fn dispersion(&self) -> &Array1<f64> {
        &self.dispersion
    }

    /// Expected rate per cell per magnitude bin.
    pub fn rates_mbin(&self) -> &Array2<f64> {
        &self.rates_mbin
    }

    /// Multiply every total and every bin rate by `factor`, in place.
    ///
    /// See [`SpatialForecast::scale`] for the caveats on non-positive
    /// factors; scaling before or after magnitude distribution is
    /// numerically equivalent for the spatial path.
    pub fn scale(&mut self, factor: f64) {
        self.rates *= factor;
        self.rates_mbin *= factor;
        debug!("scaled {} binned cells by {}", self.rates.len(), factor);
    }

    /// Re-weight the existing magnitude distribution with truncated
    /// Gutenberg-Richter weights.
    ///
    /// Each row is multiplied element-wise by the weight vector and the cell
    /// total re-derived as the new row sum. This reshapes a forecast that
    /// already carries a magnitude-dependent spatial density; it does not
    /// replace it, so repeated invocations keep sharpening the distribution
    /// rather than converging.
    pub fn reweight_truncated_gr(&mut self, bval: f64) {
        let weights = self.bins.truncated_gr_weights(bval);
        for (cell, mut row) in self.rates_mbin.outer_iter_mut().enumerate() {
            row *= &weights;
            self.rates[cell] = row.sum();
        }
        debug!("re-weighted {} cells with b={}", self.grid.len(), bval);
    }

    /// Build one point source per cell.
    ///
    /// The configuration is validated up front so an invalid parameter never
    /// yields a partially-built sequence. The result is index-aligned with
    /// the grid: source `n` describes cell `n`, with a zero-padded id
    /// derived from the index.
    pub fn build_sources(&self, config: &SourceConfig) -> HazGridResult<Vec<PointSource>> {
        config.validate()?;

        let sources = (0..self.len())
            .map(|cell| PointSource {
                id: format!("{:05}", cell),
                name: format!("point{:05}", cell),
                location: self.grid[cell],
                tectonic_region: config.tectonic_region.clone(),
                mfd: EvenlyDiscretizedMfd {
                    min_mag: self.bins.mmin(),
                    bin_width: self.bins.mbin(),
                    occurrence_rates: self.rates_mbin.row(cell).to_vec(),
                },
                rupture_mesh_spacing: config.rupture_mesh_spacing,
                magnitude_scaling: config.magnitude_scaling,
                rupture_aspect_ratio: config.rupture_aspect_ratio,
                temporal_occurrence_model: TemporalOccurrenceModel::select(
                    self.dispersion[cell],
                    self.rates[cell],
                    config.time_span,
                ),
                upper_seismogenic_depth: config.upper_seismogenic_depth,
                lower_seismogenic_depth: config.lower_seismogenic_depth,
                nodal_plane_distribution: config.nodal_plane_distribution.clone(),
                hypocenter_distribution: config.hypocenter_distribution.clone(),
            })
            .collect();
        info!("assembled {} point sources", self.len());
        Ok(sources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use is_close::is_close;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SPATIAL_HEADER: &str = "lon_a,lat_a,lon_b,lat_b,c4,c5,c6,c7,rate,alpha";

    fn write_forecast(lines: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file.flush().unwrap();
        file
    }

    fn two_cell_spatial() -> SpatialForecast {
        let file = write_forecast(&[
            SPATIAL_HEADER,
            "174.0,-37.0,174.2,-36.8,0,0,0,0,0.01,0.0",
            "175.0,-38.0,175.2,-37.8,0,0,0,0,0.02,0.5",
        ]);
        SpatialForecast::from_path(file.path()).unwrap()
    }

    #[test]
    fn spatial_read_centroids_rates_dispersion() {
        let forecast = two_cell_spatial();
        assert_eq!(forecast.len(), 2);
        assert_relative_eq!(forecast.grid()[0].lon, 174.1, max_relative = 1e-12);
        assert_relative_eq!(forecast.grid()[0].lat, -36.9, max_relative = 1e-12);
        assert_relative_eq!(forecast.grid()[1].lon, 175.1, max_relative = 1e-12);
        assert_relative_eq!(forecast.grid()[1].lat, -37.9, max_relative = 1e-12);
        assert_eq!(forecast.rates().to_vec(), vec![0.01, 0.02]);
        assert_eq!(forecast.dispersion().to_vec(), vec![0.0, 0.5]);
    }

    #[test]
    fn spatial_rejects_short_rows() {
        let file = write_forecast(&[SPATIAL_HEADER, "174.0,-37.0,174.2,-36.8,0,0,0,0,0.01"]);
        let err = SpatialForecast::from_path(file.path()).unwrap_err();
        assert!(matches!(
            err,
            HazGridError::MalformedInput { line: 2, got: 9, .. }
        ));
    }

    #[test]
    fn spatial_rejects_non_numeric_fields() {
        let file = write_forecast(&[
            SPATIAL_HEADER,
            "174.0,-37.0,174.2,-36.8,0,0,0,0,0.01,0.0",
            "175.0,-38.0,175.2,-37.8,0,0,0,0,abc,0.5",
        ]);
        let err = SpatialForecast::from_path(file.path()).unwrap_err();
        match err {
            HazGridError::Parse {
                line,
                column,
                value,
            } => {
                assert_eq!(line, 3);
                assert_eq!(column, 8);
                assert_eq!(value, "abc");
            }
            other => panic!("expected Parse error, got {:?}", other),
        }
    }

    #[test]
    fn header_only_file_is_empty_input() {
        let file = write_forecast(&[SPATIAL_HEADER]);
        assert!(matches!(
            SpatialForecast::from_path(file.path()),
            Err(HazGridError::EmptyInput(_))
        ));
    }

    #[test]
    fn binned_totals_are_file_row_sums() {
        let bins = MagnitudeBins::new(5.0, 6.0, 1.0).unwrap();
        let file = write_forecast(&[
            "lon_a,lat_a,lon_b,lat_b,c4,c5,m5,m6,alpha",
            "174.0,-37.0,174.2,-36.8,0,0,0.003,0.001,0.0",
            "175.0,-38.0,175.2,-37.8,0,0,0.010,0.002,0.5",
        ]);
        let forecast = BinnedForecast::from_path(file.path(), bins).unwrap();
        assert_relative_eq!(forecast.rates()[0], 0.004, max_relative = 1e-12);
        assert_relative_eq!(forecast.rates()[1], 0.012, max_relative = 1e-12);
        assert_eq!(forecast.rates_mbin().shape(), &[2, 2]);
        assert_eq!(forecast.dispersion().to_vec(), vec![0.0, 0.5]);
    }

    #[test]
    fn binned_rejects_wrong_bin_count() {
        // Geometry expects 2 bins; the file carries 3.
        let bins = MagnitudeBins::new(5.0, 6.0, 1.0).unwrap();
        let file = write_forecast(&[
            "lon_a,lat_a,lon_b,lat_b,c4,c5,m5,m55,m6,alpha",
            "174.0,-37.0,174.2,-36.8,0,0,0.003,0.002,0.001,0.0",
        ]);
        let err = BinnedForecast::from_path(file.path(), bins).unwrap_err();
        assert!(matches!(
            err,
            HazGridError::MalformedInput {
                line: 2,
                got: 10,
                ..
            }
        ));
    }

    #[test]
    fn scaling_composes_multiplicatively() {
        let mut chained = two_cell_spatial();
        chained.scale(2.0);
        chained.scale(3.0);

        let mut single = two_cell_spatial();
        single.scale(6.0);

        assert!(chained
            .rates()
            .iter()
            .zip(single.rates().iter())
            .all(|(a, b)| is_close!(*a, *b)));
    }

    #[test]
    fn distribution_row_sums_match_totals() {
        let bins = MagnitudeBins::default();
        let forecast = two_cell_spatial();
        let totals = forecast.rates().clone();
        let binned = forecast.into_binned(bins, 0.929);
        for cell in 0..binned.len() {
            assert_relative_eq!(
                binned.rates_mbin().row(cell).sum(),
                totals[cell],
                max_relative = 1e-9
            );
        }
    }

    #[test]
    fn scale_before_and_after_distribution_agree() {
        let bins = MagnitudeBins::default();

        let mut scaled_first = two_cell_spatial();
        scaled_first.scale(5.1);
        let binned_a = scaled_first.into_binned(bins.clone(), 1.0);

        let mut binned_b = two_cell_spatial().into_binned(bins, 1.0);
        binned_b.scale(5.1);

        for (a, b) in binned_a.rates_mbin().iter().zip(binned_b.rates_mbin().iter()) {
            assert_relative_eq!(*a, *b, max_relative = 1e-12);
        }
        for (a, b) in binned_a.rates().iter().zip(binned_b.rates().iter()) {
            assert_relative_eq!(*a, *b, max_relative = 1e-12);
        }
    }

    #[test]
    fn all_cells_share_the_distribution_shape() {
        let bins = MagnitudeBins::default();
        let binned = two_cell_spatial().into_binned(bins, 1.0);
        let row0 = binned.rates_mbin().row(0);
        let row1 = binned.rates_mbin().row(1);
        // Row 1 carries twice the total rate of row 0, so bin-by-bin the
        // ratio is constant.
        for (a, b) in row0.iter().zip(row1.iter()) {
            assert_relative_eq!(*b / *a, 2.0, max_relative = 1e-9);
        }
    }

    #[test]
    fn reweight_recomputes_totals_and_is_not_idempotent() {
        let bins = MagnitudeBins::new(5.0, 6.0, 1.0).unwrap();
        let grid = ForecastGrid::new(vec![Location::new(174.1, -36.9)]);
        let rates_mbin = ndarray::array![[0.003, 0.001]];
        let mut forecast = BinnedForecast::from_parts(
            grid,
            bins.clone(),
            rates_mbin,
            Array1::from(vec![0.0]),
        )
        .unwrap();

        let weights = bins.truncated_gr_weights(1.0);
        forecast.reweight_truncated_gr(1.0);
        assert_relative_eq!(
            forecast.rates_mbin()[[0, 0]],
            0.003 * weights[0],
            max_relative = 1e-12
        );
        assert_relative_eq!(
            forecast.rates_mbin()[[0, 1]],
            0.001 * weights[1],
            max_relative = 1e-12
        );
        assert_relative_eq!(
            forecast.rates()[0],
            forecast.rates_mbin().row(0).sum(),
            max_relative = 1e-12
        );

        // A second pass multiplies by the weights again.
        let first = forecast.rates_mbin().clone();
        forecast.reweight_truncated_gr(1.0);
        assert_relative_eq!(
            forecast.rates_mbin()[[0, 0]],
            first[[0, 0]] * weights[0],
            max_relative = 1e-12
        );
    }

    #[test]
    fn from_parts_rejects_misaligned_arrays() {
        let grid = ForecastGrid::new(vec![Location::new(0.0, 0.0)]);
        let err = SpatialForecast::from_parts(
            grid,
            Array1::from(vec![0.1, 0.2]),
            Array1::from(vec![0.0]),
        )
        .unwrap_err();
        assert!(matches!(err, HazGridError::InvalidConfig(_)));
    }
}
