use crate::{sample_bilinear_u8, GrayImage, GrayImageView};
use nalgebra::{Matrix3, Point2, SMatrix, SVector, Vector2, Vector3};
use serde::{Deserialize, Serialize};

/// Planar projective transform, `dst ~ h * src`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    pub fn identity() -> Self {
        Self::new(Matrix3::identity())
    }

    #[inline]
    pub fn apply(&self, p: Point2<f32>) -> Point2<f32> {
        let v = self.h * Vector3::new(p.x as f64, p.y as f64, 1.0);
        let w = v[2];
        Point2::new((v[0] / w) as f32, (v[1] / w) as f32)
    }

    pub fn inverse(&self) -> Option<Self> {
        let inv = self.h.try_inverse()?;
        unit_h33(inv).map(Self::new)
    }

    pub fn is_finite(&self) -> bool {
        self.h.iter().all(|v| v.is_finite())
    }
}

/// Similarity that moves the centroid of `pts` to the origin and scales
/// their mean distance from it to sqrt(2).
fn conditioning(pts: &[Point2<f32>; 4]) -> ([Point2<f64>; 4], Matrix3<f64>) {
    let c = pts
        .iter()
        .fold(Vector2::zeros(), |acc: Vector2<f64>, p| {
            acc + Vector2::new(p.x as f64, p.y as f64)
        })
        / 4.0;
    let spread = pts
        .iter()
        .map(|p| (Vector2::new(p.x as f64, p.y as f64) - c).norm())
        .sum::<f64>()
        / 4.0;
    let s = if spread > 1e-12 {
        std::f64::consts::SQRT_2 / spread
    } else {
        1.0
    };

    let t = Matrix3::new(s, 0.0, -s * c.x, 0.0, s, -s * c.y, 0.0, 0.0, 1.0);
    let out = pts.map(|p| Point2::new(s * (p.x as f64 - c.x), s * (p.y as f64 - c.y)));
    (out, t)
}

fn unit_h33(h: Matrix3<f64>) -> Option<Matrix3<f64>> {
    let w = h[(2, 2)];
    (w.abs() >= 1e-12).then(|| h / w)
}

/// True if any three of the four points are (nearly) collinear.
///
/// `tol` is an area threshold in squared pixels.
pub fn has_collinear_triplet(pts: &[Point2<f32>; 4], tol: f64) -> bool {
    const TRIPLETS: [[usize; 3]; 4] = [[0, 1, 2], [0, 1, 3], [0, 2, 3], [1, 2, 3]];
    let v = |i: usize| Vector2::new(pts[i].x as f64, pts[i].y as f64);
    TRIPLETS
        .iter()
        .any(|&[a, b, c]| (v(b) - v(a)).perp(&(v(c) - v(a))).abs() <= tol)
}

/// Compute H such that `dst ~ H * src` from four correspondences.
///
/// Corner order must be consistent between `src` and `dst`. Returns `None`
/// for degenerate configurations (three collinear points on either side) or
/// a singular system.
pub fn homography_from_4pt(src: &[Point2<f32>; 4], dst: &[Point2<f32>; 4]) -> Option<Homography> {
    if has_collinear_triplet(src, 1e-6) || has_collinear_triplet(dst, 1e-6) {
        return None;
    }

    let (src_n, t_src) = conditioning(src);
    let (dst_n, t_dst) = conditioning(dst);

    // h33 fixed to 1; each correspondence contributes one row per axis.
    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();
    for (k, (s, d)) in src_n.iter().zip(dst_n.iter()).enumerate() {
        for (axis, target) in [d.x, d.y].into_iter().enumerate() {
            let r = 2 * k + axis;
            let col = 3 * axis;
            a[(r, col)] = s.x;
            a[(r, col + 1)] = s.y;
            a[(r, col + 2)] = 1.0;
            a[(r, 6)] = -target * s.x;
            a[(r, 7)] = -target * s.y;
            b[r] = target;
        }
    }

    let x = a.lu().solve(&b)?;
    let conditioned = Matrix3::new(x[0], x[1], x[2], x[3], x[4], x[5], x[6], x[7], 1.0);

    let h = t_dst.try_inverse()? * conditioned * t_src;
    let h = Homography::new(unit_h33(h)?);
    h.is_finite().then_some(h)
}

/// Resample `src` into an `out_w × out_h` image.
///
/// Each output pixel center is mapped through `h_src_from_out` into `src`
/// and sampled bilinearly; samples falling outside `src` are black.
pub fn warp_perspective_gray(
    src: &GrayImageView<'_>,
    h_src_from_out: &Homography,
    out_w: usize,
    out_h: usize,
) -> GrayImage {
    let mut out = GrayImage::new(out_w, out_h, 0);

    for y in 0..out_h {
        let row = y * out_w;
        for x in 0..out_w {
            let p = h_src_from_out.apply(Point2::new(x as f32 + 0.5, y as f32 + 0.5));
            out.data[row + x] = sample_bilinear_u8(src, p.x, p.y);
        }
    }

    out
}
