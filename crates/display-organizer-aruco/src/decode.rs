//! Bit sampling and decoding of a single marker quad.

use crate::threshold::otsu_threshold_from_samples;
use crate::{Match, Matcher};
use display_organizer_core::{get_gray, homography_from_4pt, GrayImageView, Homography, Quad};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Sampling configuration for decoding a marker inside a quad.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeConfig {
    /// Marker border width in cells (OpenCV uses 1).
    pub border_bits: usize,
    /// Fraction of the marker side ignored near its outline.
    pub inset_frac: f32,
    /// Require border-black ratio >= this.
    pub min_border_score: f32,
    /// Side of the canonical square the quad is sampled through, in pixels.
    pub canonical_side: f32,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            border_bits: 1,
            inset_frac: 0.0,
            min_border_score: 0.85,
            canonical_side: 60.0,
        }
    }
}

/// Result of decoding one quad.
#[derive(Clone, Copy, Debug)]
pub struct QuadDecode {
    pub matched: Match,
    /// Observed inner bits (row-major, black=1) in quad orientation.
    pub code: u64,
    pub border_score: f32,
    /// Whether the decoder inverted polarity to maximize `border_score`.
    pub inverted: bool,
    /// `border_score` penalized by the Hamming distance, in `[0, 1]`.
    pub score: f32,
}

#[derive(Clone, Copy, Debug)]
struct BitObservation {
    code: u64,
    border_score: f32,
    inverted: bool,
}

const MIN_SIDE_PX: f32 = 12.0;
const THRESH_SUBDIV: usize = 3;

/// Precomputed canonical sample positions for one marker geometry.
struct SampleGrid {
    cells: usize,
    points: Vec<Point2<f32>>, // row-major: cy * cells + cx
    threshold_points: Vec<Point2<f32>>,
}

impl SampleGrid {
    fn new(cfg: &DecodeConfig, bits: usize) -> Option<Self> {
        if bits * bits > 64 {
            return None;
        }
        let cells = bits + 2 * cfg.border_bits;
        let s = cfg.canonical_side;
        if cells == 0 || !s.is_finite() {
            return None;
        }

        let inset = (cfg.inset_frac * s).max(0.0);
        let side = s - 2.0 * inset;
        if side < MIN_SIDE_PX {
            return None;
        }

        let step = side / cells as f32;
        let points = (0..cells * cells)
            .map(|i| {
                let (cx, cy) = (i % cells, i / cells);
                Point2::new(
                    inset + (cx as f32 + 0.5) * step,
                    inset + (cy as f32 + 0.5) * step,
                )
            })
            .collect();

        let grid = cells * THRESH_SUBDIV;
        let tstep = side / grid as f32;
        let threshold_points = (0..grid * grid)
            .map(|i| {
                let (tx, ty) = (i % grid, i / grid);
                Point2::new(
                    inset + (tx as f32 + 0.5) * tstep,
                    inset + (ty as f32 + 0.5) * tstep,
                )
            })
            .collect();

        Some(Self {
            cells,
            points,
            threshold_points,
        })
    }
}

/// Reusable decoder for quads of one dictionary geometry.
pub struct QuadDecoder<'a> {
    cfg: &'a DecodeConfig,
    matcher: &'a Matcher,
    grid: SampleGrid,
    canonical: Quad,
    scratch_bits: Vec<u8>,
    scratch_thr: Vec<u8>,
}

impl<'a> QuadDecoder<'a> {
    pub fn new(cfg: &'a DecodeConfig, matcher: &'a Matcher) -> Option<Self> {
        let grid = SampleGrid::new(cfg, matcher.dictionary().marker_size)?;
        let s = cfg.canonical_side;
        Some(Self {
            cfg,
            matcher,
            scratch_bits: Vec::with_capacity(grid.points.len()),
            scratch_thr: Vec::with_capacity(grid.threshold_points.len()),
            grid,
            canonical: [
                Point2::new(0.0, 0.0),
                Point2::new(s, 0.0),
                Point2::new(s, s),
                Point2::new(0.0, s),
            ],
        })
    }

    /// Sample and match the marker whose outline is `quad` (clockwise, any start).
    pub fn decode(&mut self, image: &GrayImageView<'_>, quad: &Quad) -> Option<QuadDecode> {
        let h = homography_from_4pt(&self.canonical, quad)?;
        let obs = self.sample_bits(image, &h)?;
        let matched = self.matcher.match_code(obs.code)?;

        let bits = self.matcher.dictionary().bit_count().max(1) as f32;
        let ham_pen = 1.0 - matched.hamming as f32 / bits;
        Some(QuadDecode {
            matched,
            code: obs.code,
            border_score: obs.border_score,
            inverted: obs.inverted,
            score: (obs.border_score * ham_pen).clamp(0.0, 1.0),
        })
    }

    fn sample_bits(&mut self, img: &GrayImageView<'_>, h: &Homography) -> Option<BitObservation> {
        self.scratch_bits.clear();
        for p in &self.grid.points {
            let q = h.apply(*p);
            self.scratch_bits.push(sample_mean_3x3(img, q.x, q.y)?);
        }

        self.scratch_thr.clear();
        for p in &self.grid.threshold_points {
            let q = h.apply(*p);
            if let Some(v) = sample_mean_3x3(img, q.x, q.y) {
                self.scratch_thr.push(v);
            }
        }

        decode_samples(
            &self.scratch_bits,
            &self.scratch_thr,
            self.grid.cells,
            self.matcher.dictionary().marker_size,
            self.cfg.border_bits,
            self.cfg.min_border_score,
        )
    }
}

fn decode_samples(
    samples: &[u8],
    thr_samples: &[u8],
    cells: usize,
    bits: usize,
    border: usize,
    min_border_score: f32,
) -> Option<BitObservation> {
    if samples.len() != cells * cells {
        return None;
    }

    let thr = if thr_samples.is_empty() {
        otsu_threshold_from_samples(samples)?
    } else {
        otsu_threshold_from_samples(thr_samples)?
    };

    let mut best: Option<BitObservation> = None;

    for inverted in [false, true] {
        let mut border_ok = 0u32;
        let mut border_total = 0u32;
        let mut code: u64 = 0;

        for cy in 0..cells {
            for cx in 0..cells {
                let is_black = (samples[cy * cells + cx] <= thr) != inverted;
                let is_border = cx < border
                    || cy < border
                    || cx >= cells - border
                    || cy >= cells - border;
                if is_border {
                    border_total += 1;
                    border_ok += u32::from(is_black);
                } else if is_black {
                    code |= 1u64 << ((cy - border) * bits + (cx - border));
                }
            }
        }

        let border_score = if border_total > 0 {
            border_ok as f32 / border_total as f32
        } else {
            1.0
        };
        if border_score < min_border_score {
            continue;
        }
        if best.is_none_or(|b| border_score > b.border_score) {
            best = Some(BitObservation {
                code,
                border_score,
                inverted,
            });
        }
    }

    best
}

fn sample_mean_3x3(img: &GrayImageView<'_>, x: f32, y: f32) -> Option<u8> {
    let ix = x.floor() as i32;
    let iy = y.floor() as i32;
    if ix < 1 || iy < 1 || ix + 1 >= img.width as i32 || iy + 1 >= img.height as i32 {
        return None;
    }

    let mut sum = 0u32;
    for dy in -1..=1 {
        for dx in -1..=1 {
            sum += get_gray(img, ix + dx, iy + dy) as u32;
        }
    }
    Some((sum / 9) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::DICT_4X4_50;
    use crate::{draw_marker, rotate_code_u64};
    use display_organizer_core::GrayImage;

    fn marker_on_canvas(id: u32, side: usize, margin: usize) -> (GrayImage, Quad) {
        let marker = draw_marker(&DICT_4X4_50, id, side, 1).expect("drawable id");
        let mut canvas = GrayImage::new(side + 2 * margin, side + 2 * margin, 255);
        canvas.paste(&marker, margin as i64, margin as i64);
        let (m, s) = (margin as f32, (margin + side) as f32);
        let quad = [
            Point2::new(m, m),
            Point2::new(s, m),
            Point2::new(s, s),
            Point2::new(m, s),
        ];
        (canvas, quad)
    }

    #[test]
    fn decodes_axis_aligned_marker() {
        let matcher = Matcher::new(DICT_4X4_50, 0);
        let cfg = DecodeConfig::default();
        let mut decoder = QuadDecoder::new(&cfg, &matcher).expect("decoder");

        let (img, quad) = marker_on_canvas(3, 60, 10);
        let d = decoder.decode(&img.view(), &quad).expect("decoded");
        assert_eq!(d.matched.id, 3);
        assert_eq!(d.matched.rotation, 0);
        assert_eq!(d.code, DICT_4X4_50.codes[3]);
        assert!(!d.inverted);
        assert_eq!(d.border_score, 1.0);
    }

    #[test]
    fn quad_start_index_shows_up_as_rotation() {
        let matcher = Matcher::new(DICT_4X4_50, 0);
        let cfg = DecodeConfig::default();
        let mut decoder = QuadDecoder::new(&cfg, &matcher).expect("decoder");

        let (img, quad) = marker_on_canvas(9, 48, 8);
        // Start the outline at the marker's BL corner, still clockwise.
        let shifted = [quad[3], quad[0], quad[1], quad[2]];
        let d = decoder.decode(&img.view(), &shifted).expect("decoded");
        assert_eq!(d.matched.id, 9);
        assert_eq!(d.code, rotate_code_u64(DICT_4X4_50.codes[9], 4, d.matched.rotation));
        // The marker's own TL corner is at index `rotation` of the sampled quad.
        assert_eq!(shifted[d.matched.rotation as usize], quad[0]);
    }

    #[test]
    fn blank_quad_does_not_decode() {
        let matcher = Matcher::new(DICT_4X4_50, 1);
        let cfg = DecodeConfig::default();
        let mut decoder = QuadDecoder::new(&cfg, &matcher).expect("decoder");

        let img = GrayImage::new(80, 80, 255);
        let quad = [
            Point2::new(10.0, 10.0),
            Point2::new(70.0, 10.0),
            Point2::new(70.0, 70.0),
            Point2::new(10.0, 70.0),
        ];
        assert!(decoder.decode(&img.view(), &quad).is_none());
    }
}
