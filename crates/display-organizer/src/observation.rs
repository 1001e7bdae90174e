//! Marker observations extracted from one photograph.

use crate::calibrate::CalibrationError;
use crate::catalog::Display;
use display_organizer_aruco::{ArucoDetections, ArucoDetector, ArucoDetectorParams};
use display_organizer_core::{GrayImageView, Quad};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// A decoded marker reported by a [`MarkerDetector`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectedMarker {
    pub id: u32,
    pub quad: Quad,
}

/// Output of a [`MarkerDetector`] on one image.
#[derive(Clone, Debug, Default)]
pub struct DetectorOutput {
    pub markers: Vec<DetectedMarker>,
    /// Candidate outlines that did not decode.
    pub rejected: Vec<Quad>,
}

/// Pluggable square-marker detection capability.
pub trait MarkerDetector: Send + Sync {
    fn detect_markers(&self, image: &GrayImageView<'_>) -> DetectorOutput;
}

impl From<ArucoDetections> for DetectorOutput {
    fn from(d: ArucoDetections) -> Self {
        Self {
            markers: d
                .markers
                .into_iter()
                .map(|m| DetectedMarker {
                    id: m.id,
                    quad: m.corners,
                })
                .collect(),
            rejected: d.rejected,
        }
    }
}

impl MarkerDetector for ArucoDetector {
    fn detect_markers(&self, image: &GrayImageView<'_>) -> DetectorOutput {
        self.detect(image).into()
    }
}

/// One marker seen in one photograph.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerObservation {
    pub marker_id: u32,
    /// Four ordered points in photo pixels; order is detector-defined.
    pub quad: Quad,
    /// Index of the photograph in the run's input list.
    pub source_image: usize,
}

/// All markers seen in one photograph.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PhotoObservations {
    pub source_image: usize,
    pub markers: BTreeMap<u32, MarkerObservation>,
    pub rejected: Vec<Quad>,
}

impl PhotoObservations {
    #[inline]
    pub fn get(&self, id: u32) -> Option<&MarkerObservation> {
        self.markers.get(&id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Corner marker ids of `display` that were not observed, in role order.
    pub fn missing_corners(&self, display: &Display) -> Vec<u32> {
        display
            .corner_markers
            .iter()
            .copied()
            .filter(|id| !self.markers.contains_key(id))
            .collect()
    }
}

/// Turns photographs into marker observations using a [`MarkerDetector`].
#[derive(Clone, Debug)]
pub struct MarkerObservationExtractor<D = ArucoDetector> {
    detector: D,
}

impl Default for MarkerObservationExtractor<ArucoDetector> {
    fn default() -> Self {
        Self::new(ArucoDetector::new(ArucoDetectorParams::default()))
    }
}

impl<D: MarkerDetector> MarkerObservationExtractor<D> {
    pub fn new(detector: D) -> Self {
        Self { detector }
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    /// Detect markers in `image`; fails when nothing decodes.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, image), fields(w = image.width, h = image.height))
    )]
    pub fn extract(
        &self,
        image: &GrayImageView<'_>,
        source_image: usize,
    ) -> Result<PhotoObservations, CalibrationError> {
        let out = self.detector.detect_markers(image);
        if out.markers.is_empty() {
            log::info!(
                "photo {source_image}: no markers ({} rejected candidates)",
                out.rejected.len()
            );
            return Err(CalibrationError::DetectionEmpty { source_image });
        }

        let markers: BTreeMap<u32, MarkerObservation> = out
            .markers
            .into_iter()
            .map(|m| {
                let obs = MarkerObservation {
                    marker_id: m.id,
                    quad: m.quad,
                    source_image,
                };
                (m.id, obs)
            })
            .collect();
        log::debug!(
            "photo {source_image}: markers {:?}",
            markers.keys().collect::<Vec<_>>()
        );

        Ok(PhotoObservations {
            source_image,
            markers,
            rejected: out.rejected,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibrate::ErrorKind;
    use crate::catalog::{CatalogSpec, MarkerCatalog, MarkerLayoutKind};
    use display_organizer_core::GrayImage;
    use nalgebra::Point2;

    struct FixedDetector(Vec<DetectedMarker>);

    impl MarkerDetector for FixedDetector {
        fn detect_markers(&self, _image: &GrayImageView<'_>) -> DetectorOutput {
            DetectorOutput {
                markers: self.0.clone(),
                rejected: Vec::new(),
            }
        }
    }

    fn unit_quad(x: f32) -> Quad {
        [
            Point2::new(x, 0.0),
            Point2::new(x + 1.0, 0.0),
            Point2::new(x + 1.0, 1.0),
            Point2::new(x, 1.0),
        ]
    }

    #[test]
    fn empty_detection_is_an_error() {
        let img = GrayImage::new(32, 32, 200);
        let err = MarkerObservationExtractor::default()
            .extract(&img.view(), 3)
            .expect_err("nothing to find");
        assert_eq!(err.kind(), ErrorKind::DetectionEmpty);
        assert!(matches!(err, CalibrationError::DetectionEmpty { source_image: 3 }));
    }

    #[test]
    fn custom_detector_feeds_observations_and_missing_corners() {
        let det = FixedDetector(vec![
            DetectedMarker { id: 2, quad: unit_quad(2.0) },
            DetectedMarker { id: 0, quad: unit_quad(0.0) },
        ]);
        let img = GrayImage::new(4, 4, 0);
        let obs = MarkerObservationExtractor::new(det)
            .extract(&img.view(), 1)
            .expect("observations");
        assert_eq!(obs.len(), 2);
        assert_eq!(obs.get(2).map(|o| o.source_image), Some(1));

        let cat = MarkerCatalog::new(CatalogSpec::new(1, MarkerLayoutKind::Calibration))
            .expect("catalog");
        let display = cat.display(0).expect("display");
        assert_eq!(obs.missing_corners(&display), vec![1, 3]);
    }

    #[test]
    fn aruco_backend_reads_rendered_screen() {
        let cat = MarkerCatalog::new(CatalogSpec::new(2, MarkerLayoutKind::Calibration))
            .expect("catalog");
        let screen = cat.render_screen(1, 320, 240, 48).expect("screen");
        let mut photo = GrayImage::new(400, 320, 90);
        photo.paste(&screen, 40, 40);

        let obs = MarkerObservationExtractor::default()
            .extract(&photo.view(), 0)
            .expect("observations");
        let ids: Vec<u32> = obs.markers.keys().copied().collect();
        assert_eq!(ids, vec![4, 5, 6, 7]);
        let tl = obs.get(4).expect("TL marker");
        // 48px marker inset by 5px inside a screen pasted at (40, 40).
        assert_eq!(tl.quad[0], Point2::new(45.0, 45.0));
    }
}
