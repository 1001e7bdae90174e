//! JSON configuration and report helpers for calibration runs.

use crate::calibrate::{CalibrationError, CalibrationOutput, CalibrationParams, ErrorKind};
use crate::catalog::{CatalogError, CatalogSpec, MarkerCatalog};
use crate::compose::LayoutDescriptor;
use crate::observation::MarkerObservation;
use crate::rectify::RectifyParams;
use crate::scale::ScaleFactor;
use display_organizer_aruco::ArucoDetectorParams;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(thiserror::Error, Debug)]
pub enum IoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[cfg(feature = "image")]
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error("image buffer does not match {width}x{height}")]
    InvalidBuffer { width: usize, height: usize },
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Input description of one calibration run.
///
/// Relative paths are resolved against the config file's directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationConfig {
    pub photo_paths: Vec<String>,
    pub catalog: CatalogSpec,
    #[serde(default)]
    pub output_path: Option<String>,
    #[serde(default)]
    pub preview_path: Option<String>,
    #[serde(default)]
    pub rectified_dir: Option<String>,
    #[serde(default)]
    pub max_hamming: Option<u8>,
    #[serde(default)]
    pub padding_divisor: Option<f32>,
    #[serde(default)]
    pub detector: Option<ArucoDetectorParams>,
    #[serde(default)]
    pub rectify: Option<RectifyParams>,
}

impl CalibrationConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, IoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), IoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Resolve the output report path.
    pub fn output_path(&self) -> PathBuf {
        self.output_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("display_layout_report.json"))
    }

    pub fn build_catalog(&self) -> Result<MarkerCatalog, CatalogError> {
        MarkerCatalog::new(self.catalog)
    }

    /// Calibration parameters with the config's overrides applied.
    pub fn build_params(&self) -> CalibrationParams {
        let mut params = CalibrationParams::default();
        if let Some(detector) = self.detector.clone() {
            params.detector = detector;
        }
        if let Some(rectify) = self.rectify.clone() {
            params.rectify = rectify;
        }
        if let Some(max_hamming) = self.max_hamming {
            params.detector.max_hamming = max_hamming;
        }
        if let Some(divisor) = self.padding_divisor {
            params.rectify.padding_divisor = divisor;
        }
        params
    }
}

/// Outcome of one run, written next to the inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationReport {
    pub config_path: String,
    pub photo_paths: Vec<String>,
    pub catalog: CatalogSpec,
    #[serde(default)]
    pub source_image: Option<usize>,
    #[serde(default)]
    pub layout: Option<LayoutDescriptor>,
    /// `layout` translated so its union bounds start at the origin.
    #[serde(default)]
    pub normalized_layout: Option<LayoutDescriptor>,
    #[serde(default)]
    pub scales: Option<Vec<ScaleFactor>>,
    #[serde(default)]
    pub markers: Option<Vec<MarkerObservation>>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_kind: Option<ErrorKind>,
}

impl CalibrationReport {
    pub fn new(cfg: &CalibrationConfig, config_path: &Path) -> Self {
        Self {
            config_path: config_path.to_string_lossy().into_owned(),
            photo_paths: cfg.photo_paths.clone(),
            catalog: cfg.catalog,
            source_image: None,
            layout: None,
            normalized_layout: None,
            scales: None,
            markers: None,
            error: None,
            error_kind: None,
        }
    }

    /// Populate report fields from a successful run.
    pub fn set_output(&mut self, out: &CalibrationOutput) {
        self.source_image = Some(out.source_image);
        self.normalized_layout = Some(out.layout.normalized());
        self.layout = Some(out.layout.clone());
        self.scales = Some(out.scales.clone());
        self.markers = Some(out.observations.markers.values().copied().collect());
        self.error = None;
        self.error_kind = None;
    }

    /// Record a failed run.
    pub fn set_error(&mut self, err: &CalibrationError) {
        self.error = Some(err.to_string());
        self.error_kind = Some(err.kind());
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, IoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), IoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MarkerLayoutKind;
    use display_organizer_aruco::ThresholdMode;

    #[test]
    fn partial_config_fills_defaults() {
        let cfg: CalibrationConfig = serde_json::from_str(
            r#"{ "photo_paths": ["a.png"], "catalog": { "display_count": 2 } }"#,
        )
        .expect("config");
        assert_eq!(cfg.catalog.layout, MarkerLayoutKind::Calibration);
        assert_eq!(cfg.catalog.marker_size_mm, 50.0);
        assert_eq!(cfg.output_path(), PathBuf::from("display_layout_report.json"));

        let params = cfg.build_params();
        assert_eq!(params.rectify.padding_divisor, 10.0);
        assert_eq!(params.detector.threshold, ThresholdMode::Otsu);
        assert_eq!(cfg.build_catalog().expect("catalog").display_count(), 2);
    }

    #[test]
    fn overrides_apply_on_top_of_sections() {
        let cfg: CalibrationConfig = serde_json::from_str(
            r#"{
                "photo_paths": [],
                "catalog": { "display_count": 1, "layout": "organization" },
                "max_hamming": 0,
                "padding_divisor": 20.0,
                "detector": { "threshold": { "fixed": 100 } }
            }"#,
        )
        .expect("config");
        let params = cfg.build_params();
        assert_eq!(params.detector.max_hamming, 0);
        assert_eq!(params.detector.threshold, ThresholdMode::Fixed(100));
        assert_eq!(params.rectify.padding_divisor, 20.0);
        assert_eq!(cfg.catalog.layout, MarkerLayoutKind::Organization);
    }

    #[test]
    fn error_report_round_trips_on_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = CalibrationConfig {
            photo_paths: vec!["photo.png".into()],
            catalog: CatalogSpec::new(2, MarkerLayoutKind::Calibration),
            output_path: None,
            preview_path: None,
            rectified_dir: None,
            max_hamming: None,
            padding_divisor: None,
            detector: None,
            rectify: None,
        };
        let cfg_path = dir.path().join("config.json");
        cfg.write_json(&cfg_path).expect("write config");
        let loaded = CalibrationConfig::load_json(&cfg_path).expect("load config");
        assert_eq!(loaded.catalog, cfg.catalog);

        let mut report = CalibrationReport::new(&loaded, &cfg_path);
        report.set_error(&CalibrationError::DetectionEmpty { source_image: 0 });
        let report_path = dir.path().join("report.json");
        report.write_json(&report_path).expect("write report");

        let back = CalibrationReport::load_json(&report_path).expect("load report");
        assert_eq!(back.error_kind, Some(ErrorKind::DetectionEmpty));
        assert!(back.layout.is_none());
        assert_eq!(back.photo_paths, vec!["photo.png".to_string()]);
    }
}
