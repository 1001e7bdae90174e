//! Square fiducial markers for display calibration.
//!
//! This crate covers:
//! - the embedded `DICT_4X4_50` dictionary (compiled into the binary),
//! - rasterizing markers for display on screen,
//! - finding dark quads in a photograph and decoding them against the
//!   dictionary, with rotation and single-bit error correction.
//!
//! Detected corners are always reported in the marker's own frame
//! (top-left, top-right, bottom-right, bottom-left), whatever the marker's
//! rotation in the image.

pub mod builtins;
mod candidates;
mod decode;
mod detector;
mod dictionary;
mod draw;
mod matcher;
mod threshold;

pub use candidates::CandidateParams;
pub use decode::{DecodeConfig, QuadDecode, QuadDecoder};
pub use detector::{
    ArucoDetections, ArucoDetector, ArucoDetectorParams, MarkerDetection, ThresholdMode,
};
pub use dictionary::Dictionary;
pub use draw::draw_marker;
pub use matcher::{rotate_code_u64, Match, Matcher};
