//! Core rate-modeling engine for gridded seismicity hazard models
//!
//! This crate turns spatially-gridded earthquake forecast rates into the
//! parameter sets describing point seismicity sources:
//!
//! 1. [`forecast`] ingests delimited forecast files into per-cell centroids,
//!    total rates, dispersion statistics and (optionally) per-magnitude-bin
//!    rates.
//! 2. Rates are scaled uniformly and distributed across magnitude bins with
//!    a truncated Gutenberg-Richter law ([`magnitude`]).
//! 3. [`forecast::BinnedForecast::build_sources`] selects a temporal
//!    occurrence model per cell (Poisson, or negative-binomial when the
//!    cell is over-dispersed) and assembles one [`source::PointSource`] per
//!    cell.
//!
//! Writing the source model, invoking the hazard engine and reading its
//! result database live in the companion `hazgrid-engine` crate.

pub mod config;
pub mod errors;
pub mod forecast;
pub mod magnitude;
pub mod source;

pub use config::{MagnitudeConfig, ModelConfig, SourceConfig};
pub use errors::{HazGridError, HazGridResult};
pub use forecast::{BinnedForecast, ForecastGrid, SpatialForecast};
pub use magnitude::{EvenlyDiscretizedMfd, MagnitudeBins};
pub use source::{
    Location, MagnitudeScaling, NodalPlane, Pmf, PointSource, TemporalOccurrenceModel,
};
