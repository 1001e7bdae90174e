//! Conversions to and from the `image` crate, plus a config-driven runner.

use crate::calibrate::Calibrator;
use crate::io::{CalibrationConfig, CalibrationReport, IoError};
use display_organizer_core::{GrayImage, GrayImageView};
use std::path::Path;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Borrow an `image::GrayImage` as a core view without copying.
pub fn gray_view(img: &::image::GrayImage) -> GrayImageView<'_> {
    GrayImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}

/// Luma conversion of any decoded image.
pub fn gray_from_dynamic(img: &::image::DynamicImage) -> GrayImage {
    let luma = img.to_luma8();
    let (w, h) = (luma.width() as usize, luma.height() as usize);
    GrayImage {
        width: w,
        height: h,
        data: luma.into_raw(),
    }
}

/// Load a photograph from disk as 8-bit grayscale.
pub fn load_photo(path: impl AsRef<Path>) -> Result<GrayImage, IoError> {
    let img = ::image::ImageReader::open(path)?.decode()?;
    Ok(gray_from_dynamic(&img))
}

/// Save a grayscale image; the format follows the file extension.
pub fn save_gray(img: &GrayImage, path: impl AsRef<Path>) -> Result<(), IoError> {
    let buf = ::image::GrayImage::from_raw(img.width as u32, img.height as u32, img.data.clone())
        .ok_or(IoError::InvalidBuffer {
            width: img.width,
            height: img.height,
        })?;
    buf.save(path)?;
    Ok(())
}

/// Run a calibration described by a JSON config file and write its report.
///
/// Calibration failures are recorded in the report rather than returned;
/// only I/O and configuration problems produce an `Err`.
#[cfg_attr(feature = "tracing", instrument(level = "info", skip(config_path)))]
pub fn calibrate_from_config(config_path: impl AsRef<Path>) -> Result<CalibrationReport, IoError> {
    let config_path = config_path.as_ref();
    let cfg = CalibrationConfig::load_json(config_path)?;
    let base = config_path.parent().unwrap_or_else(|| Path::new("."));
    let resolve = |p: &str| base.join(p);

    let photos = cfg
        .photo_paths
        .iter()
        .map(|p| load_photo(resolve(p)))
        .collect::<Result<Vec<_>, _>>()?;
    let views: Vec<GrayImageView<'_>> = photos.iter().map(GrayImage::view).collect();

    let calibrator = Calibrator::new(cfg.build_catalog()?, cfg.build_params());
    let mut report = CalibrationReport::new(&cfg, config_path);
    match calibrator.calibrate(&views) {
        Ok(out) => {
            report.set_output(&out);
            if let Some(path) = cfg.preview_path.as_deref() {
                if let Some(preview) = out.render_preview() {
                    save_gray(&preview, resolve(path))?;
                }
            }
            if let Some(dir) = cfg.rectified_dir.as_deref() {
                let dir = resolve(dir);
                std::fs::create_dir_all(&dir)?;
                for r in &out.rectified {
                    save_gray(&r.image, dir.join(format!("display_{}.png", r.display_index)))?;
                }
            }
        }
        Err(err) => {
            log::warn!("calibration failed: {err}");
            report.set_error(&err);
        }
    }

    let output_path = resolve(&cfg.output_path().to_string_lossy());
    report.write_json(&output_path)?;
    log::info!("wrote layout report to {}", output_path.display());
    Ok(report)
}
