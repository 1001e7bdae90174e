//! Dark-blob quad candidates from a binarized image.

use display_organizer_core::{GrayImageView, Quad};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Geometric gates applied to connected dark components.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateParams {
    /// Minimum bounding-box side in pixels.
    pub min_side_px: usize,
    /// Maximum bounding-box aspect ratio (long / short side).
    pub max_aspect: f32,
    /// Accepted range of `pixel_count / bbox_area`.
    pub min_fill: f32,
    pub max_fill: f32,
}

impl Default for CandidateParams {
    fn default() -> Self {
        Self {
            min_side_px: 8,
            max_aspect: 4.0,
            min_fill: 0.2,
            max_fill: 0.98,
        }
    }
}

/// One accepted component with its estimated outline.
#[derive(Clone, Debug)]
pub struct Candidate {
    /// Outer corners, clockwise, starting at the corner nearest the image origin.
    pub quad: Quad,
    pub pixel_count: usize,
}

/// Collect 4-connected components with `v <= threshold` and fit a quad to each.
///
/// Components touching the image border are skipped; they belong to the
/// surrounding scene rather than to a marker.
pub(crate) fn find_quad_candidates(
    img: &GrayImageView<'_>,
    threshold: u8,
    params: &CandidateParams,
) -> Vec<Candidate> {
    let (w, h) = (img.width, img.height);
    if w == 0 || h == 0 || img.data.len() < w * h {
        return Vec::new();
    }

    let dark = |idx: usize| img.data[idx] <= threshold;
    let mut visited = vec![false; w * h];
    let mut out = Vec::new();
    let mut queue = VecDeque::new();
    let mut pixels: Vec<(usize, usize)> = Vec::new();

    for y0 in 0..h {
        for x0 in 0..w {
            let idx0 = y0 * w + x0;
            if visited[idx0] || !dark(idx0) {
                continue;
            }

            visited[idx0] = true;
            queue.push_back((x0, y0));
            pixels.clear();
            let mut touches_border = false;
            let (mut min_x, mut min_y, mut max_x, mut max_y) = (x0, y0, x0, y0);

            while let Some((x, y)) = queue.pop_front() {
                pixels.push((x, y));
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);
                if x == 0 || y == 0 || x + 1 == w || y + 1 == h {
                    touches_border = true;
                }

                let neighbors = [
                    (x.wrapping_sub(1), y),
                    (x + 1, y),
                    (x, y.wrapping_sub(1)),
                    (x, y + 1),
                ];
                for (nx, ny) in neighbors {
                    if nx >= w || ny >= h {
                        continue;
                    }
                    let nidx = ny * w + nx;
                    if visited[nidx] || !dark(nidx) {
                        continue;
                    }
                    visited[nidx] = true;
                    queue.push_back((nx, ny));
                }
            }

            if touches_border {
                continue;
            }

            let bw = max_x - min_x + 1;
            let bh = max_y - min_y + 1;
            if bw < params.min_side_px || bh < params.min_side_px {
                continue;
            }
            let aspect = bw.max(bh) as f32 / bw.min(bh) as f32;
            if aspect > params.max_aspect {
                continue;
            }
            let fill = pixels.len() as f32 / (bw * bh) as f32;
            if fill < params.min_fill || fill > params.max_fill {
                continue;
            }

            if let Some(quad) = fit_quad(&pixels) {
                out.push(Candidate {
                    quad,
                    pixel_count: pixels.len(),
                });
            }
        }
    }

    out
}

/// Estimate the outer corners of a blob.
///
/// Works on pixel centers: the first corner is the pixel farthest from the
/// centroid, the opposite corner is farthest from the first, and the two
/// remaining corners are the extremes on either side of that diagonal. Each
/// corner is then pushed half a pixel outward to land on the pixel edge.
fn fit_quad(pixels: &[(usize, usize)]) -> Option<Quad> {
    if pixels.len() < 4 {
        return None;
    }

    let pts = pixels
        .iter()
        .map(|&(x, y)| Point2::new(x as f64 + 0.5, y as f64 + 0.5));
    let n = pixels.len() as f64;
    let (sx, sy) = pts.clone().fold((0.0, 0.0), |(ax, ay), p| (ax + p.x, ay + p.y));
    let c = Point2::new(sx / n, sy / n);

    let farthest_from = |r: Point2<f64>| {
        pts.clone()
            .fold((r, -1.0), |best, p| {
                let d = (p - r).norm_squared();
                if d > best.1 {
                    (p, d)
                } else {
                    best
                }
            })
            .0
    };
    let p0 = farthest_from(c);
    let p2 = farthest_from(p0);

    let axis = p2 - p0;
    if axis.norm_squared() < 1e-9 {
        return None;
    }
    let (mut p1, mut d1) = (p0, 0.0);
    let (mut p3, mut d3) = (p0, 0.0);
    for p in pts {
        let v = p - p0;
        let cross = axis.x * v.y - axis.y * v.x;
        if cross > d1 {
            d1 = cross;
            p1 = p;
        } else if -cross > d3 {
            d3 = -cross;
            p3 = p;
        }
    }
    if d1 <= 0.0 || d3 <= 0.0 {
        return None;
    }

    let mut corners = [p0, p1, p2, p3];
    let qc = Point2::new(
        corners.iter().map(|p| p.x).sum::<f64>() / 4.0,
        corners.iter().map(|p| p.y).sum::<f64>() / 4.0,
    );
    for p in corners.iter_mut() {
        p.x += 0.5 * (p.x - qc.x).signum();
        p.y += 0.5 * (p.y - qc.y).signum();
    }

    corners.sort_by(|a, b| {
        let ta = (a.y - qc.y).atan2(a.x - qc.x);
        let tb = (b.y - qc.y).atan2(b.x - qc.x);
        ta.total_cmp(&tb)
    });
    let start = corners
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| (a.x + a.y).total_cmp(&(b.x + b.y)))
        .map(|(i, _)| i)?;
    corners.rotate_left(start);

    Some(corners.map(|p| Point2::new(p.x as f32, p.y as f32)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use display_organizer_core::GrayImage;

    fn square_scene() -> GrayImage {
        let mut img = GrayImage::new(100, 80, 255);
        img.fill_rect(20, 10, 50, 40, 0);
        img
    }

    #[test]
    fn solid_square_yields_exact_outline() {
        let img = square_scene();
        let params = CandidateParams {
            max_fill: 1.0,
            ..CandidateParams::default()
        };
        let found = find_quad_candidates(&img.view(), 127, &params);
        assert_eq!(found.len(), 1);
        let q = found[0].quad;
        assert_eq!(q[0], Point2::new(20.0, 10.0));
        assert_eq!(q[1], Point2::new(50.0, 10.0));
        assert_eq!(q[2], Point2::new(50.0, 40.0));
        assert_eq!(q[3], Point2::new(20.0, 40.0));
        assert_eq!(found[0].pixel_count, 900);
    }

    #[test]
    fn gates_reject_small_border_and_full_blobs() {
        let mut img = square_scene();
        img.fill_rect(70, 60, 74, 64, 0); // too small
        img.fill_rect(0, 0, 10, 10, 0); // touches the border
        let found = find_quad_candidates(&img.view(), 127, &CandidateParams::default());
        // The 30x30 square is completely filled and fails the fill gate.
        assert!(found.is_empty());
    }

    #[test]
    fn elongated_blob_fails_aspect_gate() {
        let mut img = GrayImage::new(120, 40, 255);
        img.fill_rect(5, 10, 105, 20, 0);
        let params = CandidateParams {
            max_fill: 1.0,
            ..CandidateParams::default()
        };
        assert!(find_quad_candidates(&img.view(), 127, &params).is_empty());
    }
}
