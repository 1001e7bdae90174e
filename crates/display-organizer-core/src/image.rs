/// Borrowed 8-bit grayscale image, row-major.
#[derive(Clone, Copy, Debug)]
pub struct GrayImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // row-major, len = w*h
}

/// Owned 8-bit grayscale image, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl GrayImage {
    /// Image filled with a constant intensity.
    pub fn new(width: usize, height: usize, fill: u8) -> Self {
        Self {
            width,
            height,
            data: vec![fill; width * height],
        }
    }

    /// Wrap a raw buffer; `None` if its length does not match `width * height`.
    pub fn from_raw(width: usize, height: usize, data: Vec<u8>) -> Option<Self> {
        let expected = width.checked_mul(height)?;
        (data.len() == expected).then_some(Self {
            width,
            height,
            data,
        })
    }

    #[inline]
    pub fn view(&self) -> GrayImageView<'_> {
        GrayImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        (x < self.width && y < self.height).then(|| self.data[y * self.width + x])
    }

    #[inline]
    pub fn put(&mut self, x: usize, y: usize, value: u8) {
        if x < self.width && y < self.height {
            self.data[y * self.width + x] = value;
        }
    }

    /// Fill the half-open rectangle `[x0, x1) × [y0, y1)`, clipped to the image.
    pub fn fill_rect(&mut self, x0: i64, y0: i64, x1: i64, y1: i64, value: u8) {
        let (cx0, cx1) = clip_span(x0, x1, self.width);
        let (cy0, cy1) = clip_span(y0, y1, self.height);
        for y in cy0..cy1 {
            let row = y * self.width;
            self.data[row + cx0..row + cx1].fill(value);
        }
    }

    /// Copy `src` so its top-left pixel lands at `(x, y)`; parts outside are clipped.
    pub fn paste(&mut self, src: &GrayImage, x: i64, y: i64) {
        let (dx0, dx1) = clip_span(x, x + src.width as i64, self.width);
        let (dy0, dy1) = clip_span(y, y + src.height as i64, self.height);
        if dx0 >= dx1 {
            return;
        }
        for dy in dy0..dy1 {
            let sy = (dy as i64 - y) as usize;
            let sx0 = (dx0 as i64 - x) as usize;
            let src_row = &src.data[sy * src.width + sx0..sy * src.width + sx0 + (dx1 - dx0)];
            let row = dy * self.width;
            self.data[row + dx0..row + dx1].copy_from_slice(src_row);
        }
    }
}

fn clip_span(lo: i64, hi: i64, len: usize) -> (usize, usize) {
    let lo = lo.clamp(0, len as i64) as usize;
    let hi = hi.clamp(0, len as i64) as usize;
    (lo, hi.max(lo))
}

#[inline]
pub fn get_gray(src: &GrayImageView<'_>, x: i32, y: i32) -> u8 {
    if x < 0 || y < 0 || x >= src.width as i32 || y >= src.height as i32 {
        return 0;
    }
    src.data[y as usize * src.width + x as usize]
}

/// Bilinear sample at continuous image coordinates.
///
/// Pixel `(i, j)` covers `[i, i+1) × [j, j+1)`, so its center is at
/// `(i + 0.5, j + 0.5)`. Samples outside the image read as black.
#[inline]
pub fn sample_bilinear(src: &GrayImageView<'_>, x: f32, y: f32) -> f32 {
    let x = x - 0.5;
    let y = y - 0.5;
    let x0 = x.floor() as i32;
    let y0 = y.floor() as i32;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = get_gray(src, x0, y0) as f32;
    let p10 = get_gray(src, x0 + 1, y0) as f32;
    let p01 = get_gray(src, x0, y0 + 1) as f32;
    let p11 = get_gray(src, x0 + 1, y0 + 1) as f32;

    let a = p00 + fx * (p10 - p00);
    let b = p01 + fx * (p11 - p01);
    a + fy * (b - a)
}

#[inline]
pub fn sample_bilinear_u8(src: &GrayImageView<'_>, x: f32, y: f32) -> u8 {
    sample_bilinear(src, x, y).round().clamp(0.0, 255.0) as u8
}
