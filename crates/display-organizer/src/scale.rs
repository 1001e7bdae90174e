//! Relative scale between two rectified displays.

use crate::calibrate::CalibrationError;
use crate::catalog::{CornerRole, MarkerCatalog};
use crate::observation::{DetectedMarker, MarkerDetector};
use crate::rectify::RectifiedDisplay;
use display_organizer_core::quad_mean_diagonal;
use serde::{Deserialize, Serialize};

/// `target` size relative to `reference`; 1.0 means equal pixel density.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScaleFactor {
    pub reference_display_index: usize,
    pub target_display_index: usize,
    pub factor: f64,
}

/// Markers re-detected inside one rectified display.
#[derive(Clone, Debug)]
pub struct RectifiedMarkers {
    pub display_index: usize,
    /// Sorted by id.
    pub markers: Vec<DetectedMarker>,
}

impl RectifiedMarkers {
    pub fn detect<D: MarkerDetector + ?Sized>(rect: &RectifiedDisplay, detector: &D) -> Self {
        let mut markers = detector.detect_markers(&rect.image.view()).markers;
        markers.sort_by_key(|m| m.id);
        Self {
            display_index: rect.display_index,
            markers,
        }
    }

    fn by_role(&self, catalog: &MarkerCatalog, role: CornerRole) -> Option<&DetectedMarker> {
        let id = catalog.corner_marker_id(self.display_index, role)?;
        self.markers.iter().find(|m| m.id == id)
    }
}

/// Compares marker sizes across rectified displays.
#[derive(Clone, Copy, Debug)]
pub struct ScaleEstimator<'a> {
    catalog: &'a MarkerCatalog,
}

impl<'a> ScaleEstimator<'a> {
    pub fn new(catalog: &'a MarkerCatalog) -> Self {
        Self { catalog }
    }

    /// Scale of `target` relative to `reference`.
    ///
    /// Both sides use the marker of the first corner role (TL, TR, BR, BL)
    /// found in both displays; with no shared role, each side's lowest id.
    pub fn estimate(
        &self,
        reference: &RectifiedMarkers,
        target: &RectifiedMarkers,
    ) -> Result<ScaleFactor, CalibrationError> {
        for side in [reference, target] {
            if side.markers.is_empty() {
                return Err(CalibrationError::ScaleIndeterminate {
                    display_index: side.display_index,
                });
            }
        }

        let out = |factor| ScaleFactor {
            reference_display_index: reference.display_index,
            target_display_index: target.display_index,
            factor,
        };
        if reference.display_index == target.display_index {
            return Ok(out(1.0));
        }

        let (ref_marker, tgt_marker) = CornerRole::ALL
            .iter()
            .find_map(|&role| {
                Some((
                    reference.by_role(self.catalog, role)?,
                    target.by_role(self.catalog, role)?,
                ))
            })
            .unwrap_or((&reference.markers[0], &target.markers[0]));

        let ref_diag = quad_mean_diagonal(&ref_marker.quad) as f64;
        let tgt_diag = quad_mean_diagonal(&tgt_marker.quad) as f64;
        if !(ref_diag.is_finite() && ref_diag > 0.0) {
            return Err(CalibrationError::ScaleIndeterminate {
                display_index: reference.display_index,
            });
        }
        let factor = tgt_diag / ref_diag;
        if !(factor.is_finite() && factor > 0.0) {
            return Err(CalibrationError::ScaleIndeterminate {
                display_index: target.display_index,
            });
        }
        log::debug!(
            "scale display {} vs {}: markers {} / {} -> {factor:.4}",
            target.display_index,
            reference.display_index,
            tgt_marker.id,
            ref_marker.id
        );
        Ok(out(factor))
    }
}
