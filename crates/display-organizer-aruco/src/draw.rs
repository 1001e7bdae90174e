//! Rasterization of dictionary markers.

use crate::Dictionary;
use display_organizer_core::GrayImage;

/// Render marker `id` as a `size_px × size_px` black-on-white image.
///
/// The marker grid is `marker_size + 2 * border_bits` cells per side; pixel
/// `x` belongs to cell `floor(x * cells / size_px)`, so cells differ by at
/// most one pixel when `size_px` is not a multiple of the cell count.
///
/// Returns `None` for unknown ids or when `size_px` is smaller than the grid.
pub fn draw_marker(
    dict: &Dictionary,
    id: u32,
    size_px: usize,
    border_bits: usize,
) -> Option<GrayImage> {
    let code = dict.code(id)?;
    let n = dict.marker_size;
    let cells = n + 2 * border_bits;
    if size_px < cells {
        return None;
    }

    let cell_of = |p: usize| p * cells / size_px;
    let mut img = GrayImage::new(size_px, size_px, 255);
    for y in 0..size_px {
        let cy = cell_of(y);
        for x in 0..size_px {
            let cx = cell_of(x);
            let inner = cx >= border_bits
                && cy >= border_bits
                && cx < border_bits + n
                && cy < border_bits + n;
            let black = if inner {
                let bit = (cy - border_bits) * n + (cx - border_bits);
                (code >> bit) & 1 == 1
            } else {
                true
            };
            if black {
                img.put(x, y, 0);
            }
        }
    }
    Some(img)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::DICT_4X4_50;

    #[test]
    fn border_is_black_and_bits_follow_code() {
        let img = draw_marker(&DICT_4X4_50, 0, 60, 1).expect("marker");
        assert_eq!((img.width, img.height), (60, 60));
        for i in 0..60 {
            assert_eq!(img.get(i, 0), Some(0));
            assert_eq!(img.get(0, i), Some(0));
            assert_eq!(img.get(i, 59), Some(0));
            assert_eq!(img.get(59, i), Some(0));
        }

        let code = DICT_4X4_50.codes[0];
        for by in 0..4 {
            for bx in 0..4 {
                let expected = if (code >> (by * 4 + bx)) & 1 == 1 { 0 } else { 255 };
                let px = img.get(15 + bx * 10, 15 + by * 10);
                assert_eq!(px, Some(expected), "bit ({bx},{by})");
            }
        }
    }

    #[test]
    fn rejects_unknown_id_and_tiny_size() {
        assert!(draw_marker(&DICT_4X4_50, 50, 60, 1).is_none());
        assert!(draw_marker(&DICT_4X4_50, 0, 5, 1).is_none());
    }
}
