//! Source-parameter configuration
//!
//! Every point-source parameter that is not derived from forecast data is
//! carried explicitly by [`SourceConfig`], with defaults matching the
//! standard shallow-crust setup. Configurations deserialize from TOML and
//! must pass [`SourceConfig::validate`] before being used for assembly.

use crate::errors::{HazGridError, HazGridResult};
use crate::magnitude::MagnitudeBins;
use crate::source::{MagnitudeScaling, NodalPlane, Pmf};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Magnitude discretization settings.
///
/// Default: magnitudes 5.0 to 8.0 in steps of 0.1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MagnitudeConfig {
    pub mmin: f64,
    pub mmax: f64,
    pub mbin: f64,
}

impl MagnitudeConfig {
    /// Materialize the bin geometry, validating the bounds.
    pub fn bins(&self) -> HazGridResult<MagnitudeBins> {
        MagnitudeBins::new(self.mmin, self.mmax, self.mbin)
    }
}

impl Default for MagnitudeConfig {
    fn default() -> Self {
        Self {
            mmin: 5.0,
            mmax: 8.0,
            mbin: 0.1,
        }
    }
}

/// Parameters applied identically to every point source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Time span of the negative-binomial temporal model, years.
    ///
    /// Default: 1.0
    pub time_span: f64,

    /// Tectonic region label attached to every source.
    ///
    /// Default: "Active Shallow Crust"
    pub tectonic_region: String,

    /// Rupture mesh spacing, km.
    ///
    /// Default: 5.0
    pub rupture_mesh_spacing: f64,

    /// Magnitude-area scaling relation.
    ///
    /// Default: point ruptures (PointMSR)
    pub magnitude_scaling: MagnitudeScaling,

    /// Rupture length/width aspect ratio.
    ///
    /// Default: 1.0
    pub rupture_aspect_ratio: f64,

    /// Depth to the top of the seismogenic zone, km.
    ///
    /// Default: 0.0
    pub upper_seismogenic_depth: f64,

    /// Depth to the bottom of the seismogenic zone, km.
    ///
    /// Default: 30.0
    pub lower_seismogenic_depth: f64,

    /// Nodal-plane probability distribution.
    ///
    /// Default: a single vertical plane (strike 0, dip 90, rake 0).
    pub nodal_plane_distribution: Pmf<NodalPlane>,

    /// Hypocentral-depth probability distribution, km.
    ///
    /// Default: 10 km and 30 km with equal weight.
    pub hypocenter_distribution: Pmf<f64>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            time_span: 1.0,
            tectonic_region: "Active Shallow Crust".to_string(),
            rupture_mesh_spacing: 5.0,
            magnitude_scaling: MagnitudeScaling::PointMsr,
            rupture_aspect_ratio: 1.0,
            upper_seismogenic_depth: 0.0,
            lower_seismogenic_depth: 30.0,
            nodal_plane_distribution: Pmf::new(vec![(1.0, NodalPlane::new(0.0, 90.0, 0.0))]),
            hypocenter_distribution: Pmf::new(vec![(0.5, 10.0), (0.5, 30.0)]),
        }
    }
}

const PMF_WEIGHT_TOL: f64 = 1e-6;

impl SourceConfig {
    /// Check every parameter against its physically valid range.
    ///
    /// Called by source assembly before any cell is processed, so an invalid
    /// configuration never produces a partially-built source sequence.
    pub fn validate(&self) -> HazGridResult<()> {
        if !(self.time_span > 0.0) {
            return Err(HazGridError::InvalidConfig(format!(
                "time span must be positive, got {}",
                self.time_span
            )));
        }
        if !(self.rupture_mesh_spacing > 0.0) {
            return Err(HazGridError::InvalidConfig(format!(
                "rupture mesh spacing must be positive, got {}",
                self.rupture_mesh_spacing
            )));
        }
        if !(self.rupture_aspect_ratio > 0.0) {
            return Err(HazGridError::InvalidConfig(format!(
                "rupture aspect ratio must be positive, got {}",
                self.rupture_aspect_ratio
            )));
        }
        if self.upper_seismogenic_depth < 0.0 {
            return Err(HazGridError::InvalidConfig(format!(
                "upper seismogenic depth must be non-negative, got {}",
                self.upper_seismogenic_depth
            )));
        }
        if !(self.lower_seismogenic_depth > self.upper_seismogenic_depth) {
            return Err(HazGridError::InvalidConfig(format!(
                "lower seismogenic depth ({}) must lie below the upper depth ({})",
                self.lower_seismogenic_depth, self.upper_seismogenic_depth
            )));
        }

        if self.nodal_plane_distribution.is_empty() {
            return Err(HazGridError::InvalidConfig(
                "nodal-plane distribution is empty".to_string(),
            ));
        }
        let npd_sum = self.nodal_plane_distribution.weights_sum();
        if (npd_sum - 1.0).abs() > PMF_WEIGHT_TOL {
            return Err(HazGridError::InvalidConfig(format!(
                "nodal-plane weights must sum to 1, got {}",
                npd_sum
            )));
        }
        for (_, plane) in self.nodal_plane_distribution.iter() {
            if !(0.0..360.0).contains(&plane.strike) {
                return Err(HazGridError::InvalidConfig(format!(
                    "strike must lie in [0, 360), got {}",
                    plane.strike
                )));
            }
            if !(plane.dip > 0.0 && plane.dip <= 90.0) {
                return Err(HazGridError::InvalidConfig(format!(
                    "dip must lie in (0, 90], got {}",
                    plane.dip
                )));
            }
            if !(-180.0..=180.0).contains(&plane.rake) {
                return Err(HazGridError::InvalidConfig(format!(
                    "rake must lie in [-180, 180], got {}",
                    plane.rake
                )));
            }
        }

        if self.hypocenter_distribution.is_empty() {
            return Err(HazGridError::InvalidConfig(
                "hypocentral-depth distribution is empty".to_string(),
            ));
        }
        let hdd_sum = self.hypocenter_distribution.weights_sum();
        if (hdd_sum - 1.0).abs() > PMF_WEIGHT_TOL {
            return Err(HazGridError::InvalidConfig(format!(
                "hypocentral-depth weights must sum to 1, got {}",
                hdd_sum
            )));
        }
        for (_, depth) in self.hypocenter_distribution.iter() {
            if *depth < self.upper_seismogenic_depth || *depth > self.lower_seismogenic_depth {
                return Err(HazGridError::InvalidConfig(format!(
                    "hypocentral depth {} lies outside the seismogenic range [{}, {}]",
                    depth, self.upper_seismogenic_depth, self.lower_seismogenic_depth
                )));
            }
        }

        Ok(())
    }
}

/// A complete model scenario: rate processing plus source parameters.
///
/// This is what the CLI and library callers load from a TOML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ModelConfig {
    /// Model name embedded in the written source model.
    pub name: Option<String>,
    /// Gutenberg-Richter b-value used for magnitude (re)distribution.
    pub bval: Option<f64>,
    /// Uniform multiplicative rate scale factor.
    pub scale: Option<f64>,
    pub magnitudes: MagnitudeConfig,
    pub source: SourceConfig,
}

impl ModelConfig {
    /// Load a scenario from a TOML file.
    pub fn from_toml_path(path: &Path) -> HazGridResult<Self> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text)
            .map_err(|e| HazGridError::InvalidConfig(format!("{}: {}", path.display(), e)))
    }
}
