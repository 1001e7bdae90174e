use super::{CalibrationError, CalibrationParams};
use crate::adjacency::resolve_adjacency;
use crate::catalog::{Display, MarkerCatalog};
use crate::compose::{LayoutComposer, LayoutDescriptor};
use crate::observation::{MarkerDetector, MarkerObservationExtractor, PhotoObservations};
use crate::rectify::{DisplayRectifier, RectifiedDisplay};
use crate::scale::{RectifiedMarkers, ScaleEstimator, ScaleFactor};
use display_organizer_aruco::ArucoDetector;
use display_organizer_core::{Aabb, GrayImage, GrayImageView};
use nalgebra::Vector2;

#[cfg(feature = "rayon")]
use rayon::prelude::*;
#[cfg(feature = "tracing")]
use tracing::instrument;

/// Everything a successful run produced.
#[derive(Clone, Debug)]
pub struct CalibrationOutput {
    pub layout: LayoutDescriptor,
    /// Index of the photograph the layout was computed from.
    pub source_image: usize,
    pub observations: PhotoObservations,
    /// Rectified displays in display order, at their original offsets.
    pub rectified: Vec<RectifiedDisplay>,
    /// Adjacency translation applied to each display after the first.
    pub translations: Vec<(usize, Vector2<f64>)>,
    /// Scale of every display relative to display 0.
    pub scales: Vec<ScaleFactor>,
}

impl CalibrationOutput {
    /// All rectified displays pasted at their final offsets.
    pub fn render_preview(&self) -> Option<GrayImage> {
        LayoutComposer.render_preview(&self.layout, &self.rectified)
    }
}

/// End-to-end layout calibration for one marker scheme.
///
/// A run is all-or-nothing: the first failure (lowest display index for
/// per-display stages) aborts it and no partial layout is returned.
#[derive(Clone, Debug)]
pub struct Calibrator<D = ArucoDetector> {
    catalog: MarkerCatalog,
    extractor: MarkerObservationExtractor<D>,
    rectifier: DisplayRectifier,
}

impl Calibrator<ArucoDetector> {
    pub fn new(catalog: MarkerCatalog, params: CalibrationParams) -> Self {
        Self::with_detector(
            catalog,
            ArucoDetector::new(params.detector),
            DisplayRectifier::new(params.rectify),
        )
    }
}

impl<D: MarkerDetector> Calibrator<D> {
    pub fn with_detector(catalog: MarkerCatalog, detector: D, rectifier: DisplayRectifier) -> Self {
        Self {
            catalog,
            extractor: MarkerObservationExtractor::new(detector),
            rectifier,
        }
    }

    pub fn catalog(&self) -> &MarkerCatalog {
        &self.catalog
    }

    /// Compute the layout from one or more photographs.
    ///
    /// The first photograph showing all corner markers of every display is
    /// used. If none does, the failure of the first photograph is returned.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, photos), fields(photos = photos.len()))
    )]
    pub fn calibrate(
        &self,
        photos: &[GrayImageView<'_>],
    ) -> Result<CalibrationOutput, CalibrationError> {
        let (source_image, observations) = self.select_photo(photos)?;
        let photo = &photos[source_image];
        let displays: Vec<Display> = self.catalog.displays().collect();
        log::info!(
            "calibrating {} displays from photo {source_image} ({} markers)",
            displays.len(),
            observations.len()
        );

        let rectified = fan_out(&displays, |d| {
            self.rectifier.rectify(d, &observations, photo)
        })
        .into_iter()
        .collect::<Result<Vec<_>, _>>()?;

        let translations = snap_to_neighbors(&rectified);

        let detector = self.extractor.detector();
        let redetected = fan_out(&rectified, |r| RectifiedMarkers::detect(r, detector));
        let estimator = ScaleEstimator::new(&self.catalog);
        let scales = redetected
            .iter()
            .map(|target| estimator.estimate(&redetected[0], target))
            .collect::<Result<Vec<_>, _>>()?;

        let layout = LayoutComposer.compose(&rectified, &translations, &scales);
        for e in &layout.entries {
            log::info!(
                "display {}: offset ({:.1}, {:.1}), {}x{}, scale {:.4}",
                e.display_index,
                e.offset_x,
                e.offset_y,
                e.rectified_width,
                e.rectified_height,
                e.scale_factor
            );
        }

        Ok(CalibrationOutput {
            layout,
            source_image,
            observations,
            rectified,
            translations,
            scales,
        })
    }

    fn select_photo(
        &self,
        photos: &[GrayImageView<'_>],
    ) -> Result<(usize, PhotoObservations), CalibrationError> {
        let mut first_err = None;
        for (i, photo) in photos.iter().enumerate() {
            let checked = self.extractor.extract(photo, i).and_then(|obs| {
                match self.catalog.displays().find_map(|d| {
                    let missing = obs.missing_corners(&d);
                    (!missing.is_empty()).then_some((d.index, missing))
                }) {
                    Some((display_index, missing)) => {
                        Err(CalibrationError::IncompleteDisplayMarkers {
                            display_index,
                            missing,
                        })
                    }
                    None => Ok(obs),
                }
            });
            match checked {
                Ok(obs) => return Ok((i, obs)),
                Err(e) => {
                    log::info!("photo {i} skipped: {e}");
                    first_err.get_or_insert(e);
                }
            }
        }
        Err(first_err.unwrap_or(CalibrationError::NoPhotographs))
    }
}

/// Snap every display after the first onto its nearest already-placed display.
///
/// Ties in gap distance go to the lower display index.
fn snap_to_neighbors(rectified: &[RectifiedDisplay]) -> Vec<(usize, Vector2<f64>)> {
    let mut placed: Vec<Aabb> = Vec::with_capacity(rectified.len());
    let mut translations = Vec::new();
    for r in rectified {
        let footprint = r.placement();
        let anchor = placed
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, f64)>, (j, b)| {
                let d = footprint.gap_distance(b);
                match best {
                    Some((_, bd)) if bd <= d => best,
                    _ => Some((j, d)),
                }
            });
        let Some((j, _)) = anchor else {
            placed.push(footprint);
            continue;
        };
        let t = resolve_adjacency(&placed[j], &footprint);
        log::debug!(
            "display {} snapped to display {} by ({}, {})",
            r.display_index,
            rectified[j].display_index,
            t.x,
            t.y
        );
        placed.push(footprint.translated(t));
        translations.push((r.display_index, t));
    }
    translations
}

#[cfg(feature = "rayon")]
fn fan_out<T: Sync, R: Send>(items: &[T], f: impl Fn(&T) -> R + Sync + Send) -> Vec<R> {
    items.par_iter().map(f).collect()
}

#[cfg(not(feature = "rayon"))]
fn fan_out<T, R>(items: &[T], f: impl Fn(&T) -> R) -> Vec<R> {
    items.iter().map(f).collect()
}

/// Calibrate with the built-in detector and default parameters.
pub fn calibrate(
    photos: &[GrayImageView<'_>],
    catalog: &MarkerCatalog,
) -> Result<CalibrationOutput, CalibrationError> {
    Calibrator::new(catalog.clone(), CalibrationParams::default()).calibrate(photos)
}
