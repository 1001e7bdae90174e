//! Calibration pipeline.
//!
//! This module wires together observation extraction, per-display
//! rectification, adjacency snapping, scale estimation and layout
//! composition into one synchronous call.

mod error;
mod params;
mod pipeline;

pub use error::{CalibrationError, ErrorKind};
pub use params::CalibrationParams;
pub use pipeline::{calibrate, CalibrationOutput, Calibrator};
