//! Assembling placed, scaled displays into a layout.

use crate::rectify::RectifiedDisplay;
use crate::scale::ScaleFactor;
use display_organizer_core::{Aabb, GrayImage};
use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

/// Placement of one display in photo pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayoutEntry {
    pub display_index: usize,
    pub offset_x: f64,
    pub offset_y: f64,
    /// Size relative to the reference display.
    pub scale_factor: f64,
    pub rectified_width: usize,
    pub rectified_height: usize,
}

impl LayoutEntry {
    /// The box this display occupies in photo pixels.
    pub fn footprint(&self) -> Aabb {
        Aabb::from_origin_size(
            self.offset_x,
            self.offset_y,
            self.rectified_width as f64,
            self.rectified_height as f64,
        )
    }

    /// Rectified size expressed in reference-display pixels.
    pub fn normalized_size(&self) -> (f64, f64) {
        (
            self.rectified_width as f64 / self.scale_factor,
            self.rectified_height as f64 / self.scale_factor,
        )
    }
}

/// Final arrangement of all displays, ordered by display index.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayoutDescriptor {
    pub entries: Vec<LayoutEntry>,
}

impl LayoutDescriptor {
    pub fn entry(&self, display_index: usize) -> Option<&LayoutEntry> {
        self.entries.iter().find(|e| e.display_index == display_index)
    }

    /// Smallest box covering every footprint; `None` for an empty layout.
    pub fn union_bounds(&self) -> Option<Aabb> {
        self.entries
            .iter()
            .map(LayoutEntry::footprint)
            .reduce(|acc, b| acc.union(&b))
    }

    /// Copy translated so the union bounds start at the origin.
    pub fn normalized(&self) -> Self {
        let Some(bounds) = self.union_bounds() else {
            return self.clone();
        };
        let (dx, dy) = (bounds.min.x, bounds.min.y);
        Self {
            entries: self
                .entries
                .iter()
                .map(|e| LayoutEntry {
                    offset_x: e.offset_x - dx,
                    offset_y: e.offset_y - dy,
                    ..*e
                })
                .collect(),
        }
    }
}

/// Combines rectified displays, their adjacency translations and scales.
#[derive(Clone, Copy, Debug, Default)]
pub struct LayoutComposer;

impl LayoutComposer {
    /// `translations` and `scales` are looked up by display index; a display
    /// without a translation stays put and one without a scale gets 1.0.
    pub fn compose(
        &self,
        displays: &[RectifiedDisplay],
        translations: &[(usize, Vector2<f64>)],
        scales: &[ScaleFactor],
    ) -> LayoutDescriptor {
        let mut entries: Vec<LayoutEntry> = displays
            .iter()
            .map(|d| {
                let t = translations
                    .iter()
                    .find(|(i, _)| *i == d.display_index)
                    .map(|(_, t)| *t)
                    .unwrap_or_else(Vector2::zeros);
                let scale_factor = scales
                    .iter()
                    .find(|s| s.target_display_index == d.display_index)
                    .map(|s| s.factor)
                    .unwrap_or(1.0);
                LayoutEntry {
                    display_index: d.display_index,
                    offset_x: d.source_offset.x + t.x,
                    offset_y: d.source_offset.y + t.y,
                    scale_factor,
                    rectified_width: d.width,
                    rectified_height: d.height,
                }
            })
            .collect();
        entries.sort_by_key(|e| e.display_index);
        LayoutDescriptor { entries }
    }

    /// Paste every rectified image at its layout offset onto a canvas
    /// covering the union bounds. Uncovered pixels are black.
    pub fn render_preview(
        &self,
        layout: &LayoutDescriptor,
        displays: &[RectifiedDisplay],
    ) -> Option<GrayImage> {
        let bounds = layout.union_bounds()?;
        let origin = Point2::new(bounds.min.x.floor(), bounds.min.y.floor());
        let w = (bounds.max.x.ceil() - origin.x).max(0.0) as usize;
        let h = (bounds.max.y.ceil() - origin.y).max(0.0) as usize;
        let mut canvas = GrayImage::new(w, h, 0);
        for e in &layout.entries {
            let Some(d) = displays.iter().find(|d| d.display_index == e.display_index) else {
                continue;
            };
            let x = (e.offset_x - origin.x).round() as i64;
            let y = (e.offset_y - origin.y).round() as i64;
            canvas.paste(&d.image, x, y);
        }
        Some(canvas)
    }
}
