//! Point seismicity sources and their parameter types
//!
//! A [`PointSource`] represents all seismicity of one grid cell as
//! originating from a single point, with defined depth bounds, nodal-plane
//! and hypocentral-depth uncertainty distributions, a magnitude-frequency
//! distribution and a temporal occurrence model. Sources are built once per
//! cell after all rate processing is finalized, handed to the source-model
//! writer by value, and never mutated afterward.

use crate::magnitude::EvenlyDiscretizedMfd;
use serde::{Deserialize, Serialize};

/// Geographic location in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lon: f64,
    pub lat: f64,
}

impl Location {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

/// Rupture plane orientation: strike/dip/rake in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodalPlane {
    pub strike: f64,
    pub dip: f64,
    pub rake: f64,
}

impl NodalPlane {
    pub fn new(strike: f64, dip: f64, rake: f64) -> Self {
        Self { strike, dip, rake }
    }
}

/// A discrete probability mass function over outcomes of type `T`.
///
/// Weights are expected to sum to 1; [`SourceConfig`](crate::config::SourceConfig)
/// validation enforces this before any source assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pmf<T> {
    outcomes: Vec<(f64, T)>,
}

impl<T> Pmf<T> {
    /// Build a PMF from `(weight, outcome)` pairs without validation.
    ///
    /// Use [`Pmf::weights_sum`] (or config validation) to check consistency.
    pub fn new(outcomes: Vec<(f64, T)>) -> Self {
        Self { outcomes }
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Sum of all weights.
    pub fn weights_sum(&self) -> f64 {
        self.outcomes.iter().map(|(w, _)| w).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(f64, T)> {
        self.outcomes.iter()
    }
}

/// Identifier of the magnitude-area scaling relation applied to ruptures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MagnitudeScaling {
    /// Degenerate point ruptures, independent of magnitude.
    PointMsr,
    /// Wells and Coppersmith (1994) area scaling.
    WellsCoppersmith1994,
}

impl MagnitudeScaling {
    /// Name understood by the calculation engine.
    pub fn engine_name(&self) -> &'static str {
        match self {
            MagnitudeScaling::PointMsr => "PointMSR",
            MagnitudeScaling::WellsCoppersmith1994 => "WC1994",
        }
    }
}

/// Probability model for the timing of earthquake occurrences.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum TemporalOccurrenceModel {
    /// Memoryless occurrence at the rates given by the source's MFD.
    Poisson { time_span: f64 },
    /// Over-dispersed occurrence with variance `mean * (1 + alpha * mean)`.
    NegativeBinomial {
        time_span: f64,
        mean: f64,
        alpha: f64,
    },
}

impl TemporalOccurrenceModel {
    /// Select the temporal model for one cell from its dispersion statistic.
    ///
    /// A dispersion of exactly 0 means no over-dispersion: Poisson with a
    /// fixed unit time span. Any other value selects a negative-binomial
    /// model parameterized by the cell's mean rate and alpha, over the
    /// configured time span.
    pub fn select(dispersion: f64, mean_rate: f64, time_span: f64) -> Self {
        if dispersion == 0.0 {
            TemporalOccurrenceModel::Poisson { time_span: 1.0 }
        } else {
            TemporalOccurrenceModel::NegativeBinomial {
                time_span,
                mean: mean_rate,
                alpha: dispersion,
            }
        }
    }

    pub fn time_span(&self) -> f64 {
        match self {
            TemporalOccurrenceModel::Poisson { time_span } => *time_span,
            TemporalOccurrenceModel::NegativeBinomial { time_span, .. } => *time_span,
        }
    }

    pub fn is_poisson(&self) -> bool {
        matches!(self, TemporalOccurrenceModel::Poisson { .. })
    }

    /// Variance of the event count over one time span, given the mean count.
    ///
    /// Poisson variance equals the mean; the negative-binomial variance is
    /// inflated by the dispersion parameter.
    pub fn count_variance(&self, mean_count: f64) -> f64 {
        match self {
            TemporalOccurrenceModel::Poisson { .. } => mean_count,
            TemporalOccurrenceModel::NegativeBinomial { alpha, .. } => {
                mean_count * (1.0 + alpha * mean_count)
            }
        }
    }
}

/// Fully-assembled description of one point seismicity source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointSource {
    /// Zero-padded identifier, unique within the model.
    pub id: String,
    pub name: String,
    /// Cell centroid.
    pub location: Location,
    pub tectonic_region: String,
    pub mfd: EvenlyDiscretizedMfd,
    pub rupture_mesh_spacing: f64,
    pub magnitude_scaling: MagnitudeScaling,
    pub rupture_aspect_ratio: f64,
    pub temporal_occurrence_model: TemporalOccurrenceModel,
    /// Depth to the top of the seismogenic zone, km.
    pub upper_seismogenic_depth: f64,
    /// Depth to the bottom of the seismogenic zone, km.
    pub lower_seismogenic_depth: f64,
    pub nodal_plane_distribution: Pmf<NodalPlane>,
    pub hypocenter_distribution: Pmf<f64>,
}
