//! Marker assignment per display and on-screen marker rendering.

use display_organizer_aruco::{builtins::DICT_4X4_50, draw_marker, Dictionary};
use display_organizer_core::GrayImage;
use serde::{Deserialize, Serialize};

/// How markers are laid out on one display.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerLayoutKind {
    /// One marker per screen corner; slots `0..4` are TL, TR, BR, BL.
    #[default]
    Calibration,
    /// A 3×3 grid; slot = `row * 3 + col`, corners at slots 0, 2, 8, 6.
    Organization,
}

impl MarkerLayoutKind {
    #[inline]
    pub fn markers_per_display(self) -> usize {
        match self {
            Self::Calibration => 4,
            Self::Organization => 9,
        }
    }

    /// Slot of each corner role, indexed by [`CornerRole::index`].
    #[inline]
    pub fn corner_slots(self) -> [usize; 4] {
        match self {
            Self::Calibration => [0, 1, 2, 3],
            Self::Organization => [0, 2, 8, 6],
        }
    }

    pub fn slot_role(self, slot: usize) -> Option<CornerRole> {
        self.corner_slots()
            .iter()
            .position(|&s| s == slot)
            .map(|i| CornerRole::ALL[i])
    }

    /// Grid cell `(col, row)` of a slot on a `grid_side × grid_side` screen grid.
    fn slot_cell(self, slot: usize) -> (usize, usize) {
        match self {
            Self::Calibration => match slot {
                0 => (0, 0),
                1 => (1, 0),
                2 => (1, 1),
                _ => (0, 1),
            },
            Self::Organization => (slot % 3, slot / 3),
        }
    }

    fn grid_side(self) -> usize {
        match self {
            Self::Calibration => 2,
            Self::Organization => 3,
        }
    }
}

/// Screen corner a marker marks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CornerRole {
    TopLeft,
    TopRight,
    BottomRight,
    BottomLeft,
}

impl CornerRole {
    /// Clockwise from the top-left.
    pub const ALL: [CornerRole; 4] = [
        CornerRole::TopLeft,
        CornerRole::TopRight,
        CornerRole::BottomRight,
        CornerRole::BottomLeft,
    ];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            Self::TopLeft => 0,
            Self::TopRight => 1,
            Self::BottomRight => 2,
            Self::BottomLeft => 3,
        }
    }

    /// Outward unit direction in image coordinates (y down).
    #[inline]
    pub fn direction(self) -> (f64, f64) {
        match self {
            Self::TopLeft => (-1.0, -1.0),
            Self::TopRight => (1.0, -1.0),
            Self::BottomRight => (1.0, 1.0),
            Self::BottomLeft => (-1.0, 1.0),
        }
    }
}

/// Encoding for [`MarkerCatalog::encode_marker`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerImageFormat {
    /// Raw row-major 8-bit pixels, `size_px * size_px` bytes.
    Gray8,
    #[default]
    Png,
}

fn default_marker_size_mm() -> f32 {
    50.0
}

fn default_marker_padding_mm() -> f32 {
    5.0
}

/// Static description of a calibration run's marker scheme.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatalogSpec {
    pub display_count: usize,
    #[serde(default)]
    pub layout: MarkerLayoutKind,
    #[serde(default = "default_dictionary")]
    pub dictionary: Dictionary,
    /// Printed side of each marker on screen.
    #[serde(default = "default_marker_size_mm")]
    pub marker_size_mm: f32,
    /// White margin between a corner marker and the screen edge.
    #[serde(default = "default_marker_padding_mm")]
    pub marker_padding_mm: f32,
}

fn default_dictionary() -> Dictionary {
    DICT_4X4_50
}

impl CatalogSpec {
    pub fn new(display_count: usize, layout: MarkerLayoutKind) -> Self {
        Self {
            display_count,
            layout,
            dictionary: DICT_4X4_50,
            marker_size_mm: default_marker_size_mm(),
            marker_padding_mm: default_marker_padding_mm(),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    #[error("at least one display is required")]
    NoDisplays,
    #[error("{needed} markers needed, dictionary has {available}")]
    DictionaryExhausted { needed: usize, available: usize },
    #[error("marker size and padding must be finite, size > 0 and padding >= 0")]
    InvalidMarkerSize,
    #[error("marker id {0} is not assigned")]
    UnknownMarker(u32),
    #[error("display {0} is not part of the catalog")]
    UnknownDisplay(usize),
    #[error("marker size {size_px}px cannot be drawn")]
    MarkerTooSmall { size_px: usize },
    #[error("{width}x{height} screen cannot hold the marker grid at {marker_px}px")]
    ScreenTooSmall {
        width: usize,
        height: usize,
        marker_px: usize,
    },
    #[error(transparent)]
    Png(#[from] png::EncodingError),
}

/// One assigned marker.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub id: u32,
    pub display_index: usize,
    pub slot: usize,
    /// `None` for organization slots that are not screen corners.
    pub corner_role: Option<CornerRole>,
    pub physical_size_mm: f32,
}

/// The four corner markers of one display.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Display {
    pub index: usize,
    /// Marker ids indexed by [`CornerRole::index`].
    pub corner_markers: [u32; 4],
}

impl Display {
    #[inline]
    pub fn corner_marker(&self, role: CornerRole) -> u32 {
        self.corner_markers[role.index()]
    }
}

/// Deterministic mapping between displays, slots and marker ids.
///
/// `id = display_index * markers_per_display + slot`.
#[derive(Clone, Debug)]
pub struct MarkerCatalog {
    spec: CatalogSpec,
}

impl MarkerCatalog {
    pub fn new(spec: CatalogSpec) -> Result<Self, CatalogError> {
        if spec.display_count == 0 {
            return Err(CatalogError::NoDisplays);
        }
        if !spec.marker_size_mm.is_finite()
            || spec.marker_size_mm <= 0.0
            || !spec.marker_padding_mm.is_finite()
            || spec.marker_padding_mm < 0.0
        {
            return Err(CatalogError::InvalidMarkerSize);
        }
        let needed = spec
            .display_count
            .saturating_mul(spec.layout.markers_per_display());
        let available = spec.dictionary.len();
        if needed > available {
            return Err(CatalogError::DictionaryExhausted { needed, available });
        }
        Ok(Self { spec })
    }

    #[inline]
    pub fn spec(&self) -> &CatalogSpec {
        &self.spec
    }

    #[inline]
    pub fn display_count(&self) -> usize {
        self.spec.display_count
    }

    #[inline]
    pub fn layout(&self) -> MarkerLayoutKind {
        self.spec.layout
    }

    #[inline]
    pub fn dictionary(&self) -> Dictionary {
        self.spec.dictionary
    }

    pub fn marker_id(&self, display_index: usize, slot: usize) -> Option<u32> {
        let per = self.spec.layout.markers_per_display();
        if display_index >= self.spec.display_count || slot >= per {
            return None;
        }
        u32::try_from(display_index * per + slot).ok()
    }

    pub fn corner_marker_id(&self, display_index: usize, role: CornerRole) -> Option<u32> {
        self.marker_id(display_index, self.spec.layout.corner_slots()[role.index()])
    }

    pub fn display(&self, index: usize) -> Option<Display> {
        if index >= self.spec.display_count {
            return None;
        }
        let slots = self.spec.layout.corner_slots();
        let per = self.spec.layout.markers_per_display();
        Some(Display {
            index,
            corner_markers: slots.map(|s| (index * per + s) as u32),
        })
    }

    pub fn displays(&self) -> impl Iterator<Item = Display> + '_ {
        (0..self.spec.display_count).filter_map(|i| self.display(i))
    }

    /// Every marker id on a display, in slot order.
    pub fn display_markers(&self, index: usize) -> Option<Vec<u32>> {
        let per = self.spec.layout.markers_per_display();
        (0..per).map(|slot| self.marker_id(index, slot)).collect()
    }

    /// Reverse lookup of an assigned id.
    pub fn marker(&self, id: u32) -> Option<Marker> {
        let per = self.spec.layout.markers_per_display();
        let display_index = id as usize / per;
        if display_index >= self.spec.display_count {
            return None;
        }
        let slot = id as usize % per;
        Some(Marker {
            id,
            display_index,
            slot,
            corner_role: self.spec.layout.slot_role(slot),
            physical_size_mm: self.spec.marker_size_mm,
        })
    }

    /// Draw an assigned marker at `size_px × size_px`.
    pub fn render_marker(&self, id: u32, size_px: usize) -> Result<GrayImage, CatalogError> {
        if self.marker(id).is_none() {
            return Err(CatalogError::UnknownMarker(id));
        }
        draw_marker(&self.spec.dictionary, id, size_px, 1)
            .ok_or(CatalogError::MarkerTooSmall { size_px })
    }

    /// Draw and encode an assigned marker.
    pub fn encode_marker(
        &self,
        id: u32,
        size_px: usize,
        format: MarkerImageFormat,
    ) -> Result<Vec<u8>, CatalogError> {
        let img = self.render_marker(id, size_px)?;
        match format {
            MarkerImageFormat::Gray8 => Ok(img.data),
            MarkerImageFormat::Png => Ok(encode_gray_png(&img)?),
        }
    }

    /// Gap between the screen edge and the nearest marker, in pixels.
    pub fn screen_inset_px(&self, marker_px: usize) -> usize {
        let ratio = self.spec.marker_padding_mm / self.spec.marker_size_mm;
        (marker_px as f32 * ratio).round() as usize
    }

    /// White full-screen image with the display's markers placed per layout.
    pub fn render_screen(
        &self,
        display_index: usize,
        width: usize,
        height: usize,
        marker_px: usize,
    ) -> Result<GrayImage, CatalogError> {
        let ids = self
            .display_markers(display_index)
            .ok_or(CatalogError::UnknownDisplay(display_index))?;
        let inset = self.screen_inset_px(marker_px);
        let n = self.spec.layout.grid_side();
        let span = n * marker_px + 2 * inset;
        if width < span || height < span {
            return Err(CatalogError::ScreenTooSmall {
                width,
                height,
                marker_px,
            });
        }

        let free_x = width - 2 * inset - marker_px;
        let free_y = height - 2 * inset - marker_px;
        let mut screen = GrayImage::new(width, height, 255);
        for (slot, id) in ids.into_iter().enumerate() {
            let (col, row) = self.spec.layout.slot_cell(slot);
            let x = inset + col * free_x / (n - 1);
            let y = inset + row * free_y / (n - 1);
            let marker = self.render_marker(id, marker_px)?;
            screen.paste(&marker, x as i64, y as i64);
        }
        Ok(screen)
    }
}

/// Encode an 8-bit grayscale image as PNG.
pub fn encode_gray_png(img: &GrayImage) -> Result<Vec<u8>, png::EncodingError> {
    let mut buf = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut buf, img.width as u32, img.height as u32);
        encoder.set_color(png::ColorType::Grayscale);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&img.data)?;
        writer.finish()?;
    }
    Ok(buf)
}
