//! Magnitude bin geometry and magnitude-frequency distributions
//!
//! A [`MagnitudeBins`] instance fixes the discretization shared by every cell
//! of a model: bin centers spanning `[mmin, mmax]` inclusive with step
//! `mbin`. The truncated Gutenberg-Richter weights computed from it depend
//! only on the b-value and this geometry, never on cell data.

use crate::errors::{HazGridError, HazGridResult};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Discretized magnitude bin geometry.
///
/// Immutable once constructed; the default spans magnitudes 5.0 to 8.0 in
/// steps of 0.1 (31 bins).
#[derive(Debug, Clone, PartialEq)]
pub struct MagnitudeBins {
    mmin: f64,
    mmax: f64,
    mbin: f64,
    centers: Array1<f64>,
}

impl MagnitudeBins {
    /// Build a bin geometry from its bounds and width.
    ///
    /// Returns [`HazGridError::InvalidConfig`] unless `mbin > 0` and
    /// `mmin < mmax`.
    pub fn new(mmin: f64, mmax: f64, mbin: f64) -> HazGridResult<Self> {
        if !(mbin > 0.0) {
            return Err(HazGridError::InvalidConfig(format!(
                "magnitude bin width must be positive, got {}",
                mbin
            )));
        }
        if !(mmin < mmax) {
            return Err(HazGridError::InvalidConfig(format!(
                "magnitude range is empty: mmin={} mmax={}",
                mmin, mmax
            )));
        }
        let n = ((mmax - mmin) / mbin).round() as usize + 1;
        let centers = Array1::from_iter((0..n).map(|i| mmin + i as f64 * mbin));
        Ok(Self {
            mmin,
            mmax,
            mbin,
            centers,
        })
    }

    /// Number of magnitude bins.
    pub fn len(&self) -> usize {
        self.centers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centers.is_empty()
    }

    /// Minimum magnitude (center of the first bin).
    pub fn mmin(&self) -> f64 {
        self.mmin
    }

    /// Maximum magnitude (center of the last bin).
    pub fn mmax(&self) -> f64 {
        self.mmax
    }

    /// Bin width.
    pub fn mbin(&self) -> f64 {
        self.mbin
    }

    /// Bin centers, ordered from `mmin` to `mmax`.
    pub fn centers(&self) -> &Array1<f64> {
        &self.centers
    }

    /// Truncated Gutenberg-Richter weight of each bin.
    ///
    /// For a bin centered on magnitude `m` with width `Δ`:
    ///
    /// ```text
    /// w(m) = [10^(-b(m - Δ/2)) - 10^(-b(m + Δ/2))]
    ///      / [10^(-b(mmin - Δ/2)) - 10^(-b(mmax + Δ/2))]
    /// ```
    ///
    /// The numerators telescope to the denominator across the full range, so
    /// the weights sum to 1 up to floating-point error.
    pub fn truncated_gr_weights(&self, bval: f64) -> Array1<f64> {
        let half = self.mbin / 2.0;
        let norm = 10f64.powf(-bval * (self.mmin - half)) - 10f64.powf(-bval * (self.mmax + half));
        self.centers
            .mapv(|m| (10f64.powf(-bval * (m - half)) - 10f64.powf(-bval * (m + half))) / norm)
    }
}

impl Default for MagnitudeBins {
    fn default() -> Self {
        Self::new(5.0, 8.0, 0.1).expect("default bin geometry is valid")
    }
}

/// An evenly-discretized magnitude-frequency distribution.
///
/// One per source: the occurrence rate of events in each bin, starting at
/// `min_mag` with constant `bin_width`. This is the row of the model's rate
/// matrix reinterpreted for a single cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvenlyDiscretizedMfd {
    /// Center of the first magnitude bin.
    pub min_mag: f64,
    /// Width of every bin.
    pub bin_width: f64,
    /// Expected annual rate per bin.
    pub occurrence_rates: Vec<f64>,
}

impl EvenlyDiscretizedMfd {
    /// Total expected annual rate across all bins.
    pub fn total_rate(&self) -> f64 {
        self.occurrence_rates.iter().sum()
    }

    /// Center of the last magnitude bin.
    pub fn max_mag(&self) -> f64 {
        self.min_mag + self.bin_width * (self.occurrence_rates.len().saturating_sub(1)) as f64
    }
}
