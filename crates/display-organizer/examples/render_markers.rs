//! Write the marker screens of every display as PNG files, plus a synthetic
//! photograph of all screens and a config that calibrates it.
//!
//! Usage: `render_markers [display_count] [organization|calibration] [out_dir]`
//!
//! Afterwards `calibrate_photo <out_dir>/calibrate_config.json` runs the
//! whole pipeline on the synthetic photograph.

use std::{env, fs, path::PathBuf};

use display_organizer::core::GrayImage;
use display_organizer::{
    encode_gray_png, CalibrationConfig, CatalogSpec, MarkerCatalog, MarkerImageFormat,
    MarkerLayoutKind,
};
use log::{info, LevelFilter};

const SCREEN_W: usize = 1920;
const SCREEN_H: usize = 1080;
const MARKER_PX: usize = 240;

// Synthetic photograph: screens shrunk by 4, on a mid-gray desk.
const PHOTO_SHRINK: usize = 4;
const PHOTO_MARGIN: usize = 60;
const PHOTO_GAP: usize = 40;
const PHOTO_STAGGER: usize = 30;
const DESK_GRAY: u8 = 90;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    display_organizer::core::init_with_level(LevelFilter::Info)?;

    let mut args = env::args().skip(1);
    let display_count: usize = args.next().map(|s| s.parse()).transpose()?.unwrap_or(2);
    let layout = match args.next().as_deref() {
        Some("organization") => MarkerLayoutKind::Organization,
        _ => MarkerLayoutKind::Calibration,
    };
    let out_dir = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("markers_out"));
    fs::create_dir_all(&out_dir)?;

    let spec = CatalogSpec::new(display_count, layout);
    let catalog = MarkerCatalog::new(spec)?;
    for display in catalog.displays() {
        let screen = catalog.render_screen(display.index, SCREEN_W, SCREEN_H, MARKER_PX)?;
        let path = out_dir.join(format!("screen_{}.png", display.index));
        fs::write(&path, encode_gray_png(&screen)?)?;
        info!("display {} -> {}", display.index, path.display());

        for id in catalog.display_markers(display.index).unwrap_or_default() {
            let png = catalog.encode_marker(id, MARKER_PX, MarkerImageFormat::Png)?;
            fs::write(out_dir.join(format!("marker_{id:02}.png")), png)?;
        }
    }

    let photo = synthetic_photo(&catalog)?;
    fs::write(out_dir.join("photo.png"), encode_gray_png(&photo)?)?;

    let config = CalibrationConfig {
        photo_paths: vec!["photo.png".into()],
        catalog: spec,
        output_path: Some("display_layout_report.json".into()),
        preview_path: Some("display_layout_preview.png".into()),
        rectified_dir: Some("rectified".into()),
        max_hamming: None,
        padding_divisor: None,
        detector: None,
        rectify: None,
    };
    let config_path = out_dir.join("calibrate_config.json");
    config.write_json(&config_path)?;
    info!("photo and config -> {}", config_path.display());
    Ok(())
}

/// Every display's screen side by side, alternately staggered vertically.
fn synthetic_photo(catalog: &MarkerCatalog) -> Result<GrayImage, Box<dyn std::error::Error>> {
    let (w, h, m) = (
        SCREEN_W / PHOTO_SHRINK,
        SCREEN_H / PHOTO_SHRINK,
        MARKER_PX / PHOTO_SHRINK,
    );
    let n = catalog.display_count();
    let photo_w = 2 * PHOTO_MARGIN + n * w + (n - 1) * PHOTO_GAP;
    let photo_h = 2 * PHOTO_MARGIN + h + PHOTO_STAGGER;

    let mut photo = GrayImage::new(photo_w, photo_h, DESK_GRAY);
    for display in catalog.displays() {
        let screen = catalog.render_screen(display.index, w, h, m)?;
        let x = PHOTO_MARGIN + display.index * (w + PHOTO_GAP);
        let y = PHOTO_MARGIN + (display.index % 2) * PHOTO_STAGGER;
        photo.paste(&screen, x as i64, y as i64);
    }
    Ok(photo)
}
