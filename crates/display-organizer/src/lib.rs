//! Display layout calibration from photographs of on-screen markers.
//!
//! Each display shows square fiducial markers (see [`MarkerCatalog`]). A
//! photograph of all displays is turned into marker observations, every
//! display is rectified from its four corner markers, displays are snapped
//! together along shared edges, and their relative scale is measured from
//! marker sizes inside the rectified images. The result is a
//! [`LayoutDescriptor`].
//!
//! ```no_run
//! use display_organizer::{calibrate, CatalogSpec, MarkerCatalog, MarkerLayoutKind};
//! # fn photo() -> display_organizer::core::GrayImage { unimplemented!() }
//!
//! let catalog = MarkerCatalog::new(CatalogSpec::new(2, MarkerLayoutKind::Calibration))?;
//! let photo = photo();
//! let out = calibrate(&[photo.view()], &catalog)?;
//! for e in &out.layout.entries {
//!     println!("display {} at ({}, {})", e.display_index, e.offset_x, e.offset_y);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub use display_organizer_aruco as aruco;
pub use display_organizer_core as core;

mod adjacency;
mod calibrate;
mod catalog;
mod compose;
mod io;
mod observation;
#[cfg(feature = "image")]
mod photo;
mod rectify;
mod scale;

pub use adjacency::resolve_adjacency;
pub use calibrate::{
    calibrate, CalibrationError, CalibrationOutput, CalibrationParams, Calibrator, ErrorKind,
};
pub use catalog::{
    encode_gray_png, CatalogError, CatalogSpec, CornerRole, Display, Marker, MarkerCatalog,
    MarkerImageFormat, MarkerLayoutKind,
};
pub use compose::{LayoutComposer, LayoutDescriptor, LayoutEntry};
pub use io::{CalibrationConfig, CalibrationReport, IoError};
pub use observation::{
    DetectedMarker, DetectorOutput, MarkerDetector, MarkerObservation, MarkerObservationExtractor,
    PhotoObservations,
};
#[cfg(feature = "image")]
pub use photo::{calibrate_from_config, gray_from_dynamic, gray_view, load_photo, save_gray};
pub use rectify::{
    pad_corners, representative_corners, DisplayRectifier, RectifiedDisplay, RectifyParams,
};
pub use scale::{RectifiedMarkers, ScaleEstimator, ScaleFactor};
