//! Perspective rectification of one display from its corner markers.

use crate::calibrate::CalibrationError;
use crate::catalog::{CornerRole, Display};
use crate::observation::PhotoObservations;
use display_organizer_core::{
    homography_from_4pt, quad_centroid, quad_edge_length, warp_perspective_gray, Aabb,
    GrayImage, GrayImageView, Homography, Quad,
};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Rectifier configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RectifyParams {
    /// Padding is `trunc(reference_edge / padding_divisor)` pixels, where the
    /// reference edge is the first edge of the top-left marker. Non-positive
    /// values disable padding.
    pub padding_divisor: f32,
}

impl Default for RectifyParams {
    fn default() -> Self {
        Self {
            padding_divisor: 10.0,
        }
    }
}

impl RectifyParams {
    pub fn padding_for_edge(&self, edge_px: f32) -> u32 {
        if !(self.padding_divisor.is_finite() && self.padding_divisor > 0.0) {
            return 0;
        }
        let p = (edge_px / self.padding_divisor).trunc();
        if p.is_finite() && p > 0.0 {
            p as u32
        } else {
            0
        }
    }
}

/// A display resampled into its own fronto-parallel frame.
#[derive(Clone, Debug)]
pub struct RectifiedDisplay {
    pub display_index: usize,
    pub width: usize,
    pub height: usize,
    pub padding_px: u32,
    /// Photo position of the rectified image's top-left pixel edge.
    pub source_offset: Point2<f64>,
    /// Maps photo pixels to rectified pixels.
    pub homography: Homography,
    /// Representative display corners in the photo (TL, TR, BR, BL).
    pub corners: Quad,
    pub image: GrayImage,
}

impl RectifiedDisplay {
    /// `[offset, offset + size]` in photo coordinates.
    pub fn placement(&self) -> Aabb {
        Aabb::from_origin_size(
            self.source_offset.x,
            self.source_offset.y,
            self.width as f64,
            self.height as f64,
        )
    }
}

/// Point of `quad` farthest in `role`'s outward direction from the quad centroid.
fn extremal_point(quad: &Quad, role: CornerRole) -> Point2<f32> {
    let c = quad_centroid(quad);
    let (dx, dy) = role.direction();
    let score = |p: &Point2<f32>| (p.x - c.x) as f64 * dx + (p.y - c.y) as f64 * dy;
    let mut best = quad[0];
    let mut best_score = score(&best);
    for p in &quad[1..] {
        let s = score(p);
        if s > best_score {
            best = *p;
            best_score = s;
        }
    }
    best
}

/// The display's outer corner in the photo, one per role (TL, TR, BR, BL).
///
/// Each point is taken from the matching corner marker, so the result does
/// not depend on the detector's corner order.
pub fn representative_corners(
    display: &Display,
    observations: &PhotoObservations,
) -> Result<Quad, CalibrationError> {
    let missing = observations.missing_corners(display);
    if !missing.is_empty() {
        return Err(CalibrationError::IncompleteDisplayMarkers {
            display_index: display.index,
            missing,
        });
    }

    let mut out = [Point2::origin(); 4];
    for role in CornerRole::ALL {
        let id = display.corner_marker(role);
        let obs = observations
            .get(id)
            .ok_or_else(|| CalibrationError::IncompleteDisplayMarkers {
                display_index: display.index,
                missing: vec![id],
            })?;
        out[role.index()] = extremal_point(&obs.quad, role);
    }
    Ok(out)
}

/// Push each corner `padding` pixels outward along its role direction.
pub fn pad_corners(corners: &Quad, padding: f32) -> Quad {
    let mut out = *corners;
    for role in CornerRole::ALL {
        let (dx, dy) = role.direction();
        let p = &mut out[role.index()];
        p.x += dx as f32 * padding;
        p.y += dy as f32 * padding;
    }
    out
}

/// Builds [`RectifiedDisplay`]s from one photograph's observations.
#[derive(Clone, Debug, Default)]
pub struct DisplayRectifier {
    params: RectifyParams,
}

impl DisplayRectifier {
    pub fn new(params: RectifyParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &RectifyParams {
        &self.params
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "info",
            skip(self, display, observations, photo),
            fields(display_index = display.index)
        )
    )]
    pub fn rectify(
        &self,
        display: &Display,
        observations: &PhotoObservations,
        photo: &GrayImageView<'_>,
    ) -> Result<RectifiedDisplay, CalibrationError> {
        let display_index = display.index;
        let singular = || CalibrationError::RectificationSingular { display_index };

        let corners = representative_corners(display, observations)?;
        if corners.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return Err(singular());
        }

        let min_x = corners.iter().map(|p| p.x).fold(f32::INFINITY, f32::min).trunc();
        let max_x = corners.iter().map(|p| p.x).fold(f32::NEG_INFINITY, f32::max).trunc();
        let min_y = corners.iter().map(|p| p.y).fold(f32::INFINITY, f32::min).trunc();
        let max_y = corners.iter().map(|p| p.y).fold(f32::NEG_INFINITY, f32::max).trunc();
        let (width, height) = (max_x - min_x, max_y - min_y);
        if width <= 0.0 || height <= 0.0 {
            return Err(singular());
        }

        let tl_marker = display.corner_marker(CornerRole::TopLeft);
        let edge = observations
            .get(tl_marker)
            .map(|o| quad_edge_length(&o.quad, 0))
            .unwrap_or(0.0);
        let padding_px = self.params.padding_for_edge(edge);
        let p = padding_px as f32;

        let out_w = (width + 2.0 * p) as usize;
        let out_h = (height + 2.0 * p) as usize;
        let (wf, hf) = (out_w as f32, out_h as f32);
        let target = [
            Point2::new(0.0, 0.0),
            Point2::new(wf, 0.0),
            Point2::new(wf, hf),
            Point2::new(0.0, hf),
        ];

        let padded = pad_corners(&corners, p);
        let homography = homography_from_4pt(&padded, &target).ok_or_else(singular)?;
        let rect_to_photo = homography.inverse().ok_or_else(singular)?;
        if !rect_to_photo.is_finite() {
            return Err(singular());
        }

        let image = warp_perspective_gray(photo, &rect_to_photo, out_w, out_h);
        let source_offset = Point2::new((min_x - p) as f64, (min_y - p) as f64);
        log::debug!(
            "display {display_index}: {out_w}x{out_h} rectified, padding {padding_px}, offset ({}, {})",
            source_offset.x,
            source_offset.y
        );

        Ok(RectifiedDisplay {
            display_index,
            width: out_w,
            height: out_h,
            padding_px,
            source_offset,
            homography,
            corners,
            image,
        })
    }
}
