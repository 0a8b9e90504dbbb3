//! External collaborators for the hazgrid rate-modeling engine
//!
//! Everything here is thin I/O glue around the hazard-calculation engine:
//!
//! - [`writer`]: serializes assembled point sources into a source-model
//!   artifact.
//! - [`runner`]: invokes the engine CLI on a prepared run directory and
//!   copies the result database back.
//! - [`database`]: locates result databases and (with the `hdf5` feature)
//!   extracts site grids and mean hazard curves.
//!
//! None of the domain logic lives here; see `hazgrid-core`.

pub mod database;
pub mod runner;
pub mod writer;

pub use database::{calc_id_from_name, default_imtls, latest_calc_file, HazardCurves};
#[cfg(feature = "hdf5")]
pub use database::read_mean_curves;
pub use runner::{parse_latest_calc_id, run_job};
pub use writer::write_source_model;
