use crate::rectify::RectifyParams;
use display_organizer_aruco::ArucoDetectorParams;
use serde::{Deserialize, Serialize};

/// Configuration for a [`Calibrator`](super::Calibrator) using the built-in detector.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationParams {
    /// Marker detection in photographs and in rectified displays.
    pub detector: ArucoDetectorParams,
    pub rectify: RectifyParams,
}
