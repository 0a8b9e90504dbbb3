//! Gridded seismicity hazard models
//!
//! `hazgrid` converts spatially-gridded earthquake forecast rates into
//! probabilistic seismic source models for an external hazard-calculation
//! engine, then harvests the resulting curves. The crate is a facade over
//! the two workspace members:
//!
//! - `hazgrid-core`: forecast ingestion, rate scaling, truncated
//!   Gutenberg-Richter magnitude distribution and point-source assembly.
//! - `hazgrid-engine`: source-model writing, engine invocation and result
//!   database access.
//!
//! A typical scenario:
//!
//! ```no_run
//! use hazgrid::{MagnitudeBins, SourceConfig, SpatialForecast};
//!
//! # fn main() -> hazgrid::HazGridResult<()> {
//! let mut model = SpatialForecast::from_path("forecast.csv")?
//!     .into_binned(MagnitudeBins::default(), 0.929);
//! model.scale(5.1);
//! let sources = model.build_sources(&SourceConfig::default())?;
//! hazgrid::write_source_model("source.xml", "Multiplicative", 1.0, &sources)?;
//! # Ok(())
//! # }
//! ```

pub use hazgrid_core::{
    BinnedForecast, EvenlyDiscretizedMfd, ForecastGrid, HazGridError, HazGridResult, Location,
    MagnitudeBins, MagnitudeConfig, MagnitudeScaling, ModelConfig, NodalPlane, Pmf, PointSource,
    SourceConfig, SpatialForecast, TemporalOccurrenceModel,
};

pub use hazgrid_engine::{
    default_imtls, latest_calc_file, run_job, write_source_model, HazardCurves,
};
#[cfg(feature = "hdf5")]
pub use hazgrid_engine::read_mean_curves;
