use approx::assert_abs_diff_eq;
use display_organizer::aruco::{ArucoDetector, ArucoDetectorParams};
use display_organizer::core::{Aabb, GrayImage, GrayImageView};
use display_organizer::{
    calibrate, CalibrationError, Calibrator, CatalogSpec, DetectorOutput, DisplayRectifier,
    ErrorKind, MarkerCatalog, MarkerDetector, MarkerLayoutKind,
};
use nalgebra::Vector2;

const BACKGROUND: u8 = 90;

/// One display screen placed in a synthetic photograph.
struct Placed {
    display: usize,
    width: usize,
    height: usize,
    marker_px: usize,
    x: i64,
    y: i64,
}

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn catalog(n: usize, layout: MarkerLayoutKind) -> MarkerCatalog {
    MarkerCatalog::new(CatalogSpec::new(n, layout)).expect("catalog")
}

fn photo(cat: &MarkerCatalog, w: usize, h: usize, screens: &[Placed]) -> GrayImage {
    let mut img = GrayImage::new(w, h, BACKGROUND);
    for s in screens {
        let screen = cat
            .render_screen(s.display, s.width, s.height, s.marker_px)
            .expect("screen");
        img.paste(&screen, s.x, s.y);
    }
    img
}

fn side_by_side(cat: &MarkerCatalog, second: Placed) -> GrayImage {
    photo(
        cat,
        1400,
        560,
        &[
            Placed {
                display: 0,
                width: 600,
                height: 360,
                marker_px: 60,
                x: 100,
                y: 100,
            },
            second,
        ],
    )
}

fn equal_second() -> Placed {
    Placed {
        display: 1,
        width: 600,
        height: 360,
        marker_px: 60,
        x: 750,
        y: 100,
    }
}

#[test]
fn two_equal_displays_snap_together() {
    init_logger();
    let cat = catalog(2, MarkerLayoutKind::Calibration);
    let img = side_by_side(&cat, equal_second());

    let out = calibrate(&[img.view()], &cat).expect("calibrated");
    assert_eq!(out.source_image, 0);

    let r0 = &out.rectified[0];
    assert_eq!((r0.width, r0.height, r0.padding_px), (600, 360, 6));
    assert_eq!(r0.placement(), Aabb::from_origin_size(100.0, 100.0, 600.0, 360.0));
    assert_eq!(
        out.rectified[1].placement(),
        Aabb::from_origin_size(750.0, 100.0, 600.0, 360.0)
    );

    assert_eq!(out.translations, vec![(1, Vector2::new(-50.0, 0.0))]);

    let e0 = out.layout.entry(0).expect("display 0");
    let e1 = out.layout.entry(1).expect("display 1");
    assert_eq!((e0.offset_x, e0.offset_y), (100.0, 100.0));
    assert_eq!((e1.offset_x, e1.offset_y), (700.0, 100.0));
    assert_eq!(e0.scale_factor, 1.0);
    assert_abs_diff_eq!(e1.scale_factor, 1.0, epsilon = 1e-6);

    let normalized = out.layout.normalized();
    assert_eq!(
        normalized.union_bounds(),
        Some(Aabb::from_origin_size(0.0, 0.0, 1200.0, 360.0))
    );
}

#[test]
fn rectified_display_reproduces_the_screen() {
    let cat = catalog(2, MarkerLayoutKind::Calibration);
    let img = side_by_side(&cat, equal_second());
    let out = calibrate(&[img.view()], &cat).expect("calibrated");

    let screen = cat.render_screen(0, 600, 360, 60).expect("screen");
    assert_eq!(out.rectified[0].image, screen);

    let preview = out.render_preview().expect("preview");
    assert_eq!((preview.width, preview.height), (1200, 360));
    // Display 1's TL marker border now starts right at the shared edge + inset.
    assert_eq!(preview.get(606, 6), Some(0));
    assert_eq!(preview.get(603, 3), Some(255));
}

#[test]
fn smaller_display_reports_half_scale() {
    let cat = catalog(2, MarkerLayoutKind::Calibration);
    let img = side_by_side(
        &cat,
        Placed {
            display: 1,
            width: 300,
            height: 180,
            marker_px: 30,
            x: 750,
            y: 100,
        },
    );

    let out = calibrate(&[img.view()], &cat).expect("calibrated");
    let e1 = out.layout.entry(1).expect("display 1");
    assert_eq!((e1.rectified_width, e1.rectified_height), (300, 180));
    assert_eq!((e1.offset_x, e1.offset_y), (700.0, 100.0));
    assert_abs_diff_eq!(e1.scale_factor, 0.5, epsilon = 1e-6);
    let (w, h) = e1.normalized_size();
    assert_abs_diff_eq!(w, 600.0, epsilon = 1e-3);
    assert_abs_diff_eq!(h, 360.0, epsilon = 1e-3);
}

#[test]
fn display_below_is_pulled_up() {
    let cat = catalog(2, MarkerLayoutKind::Calibration);
    let img = photo(
        &cat,
        800,
        600,
        &[
            Placed {
                display: 0,
                width: 600,
                height: 360,
                marker_px: 60,
                x: 100,
                y: 20,
            },
            Placed {
                display: 1,
                width: 400,
                height: 150,
                marker_px: 60,
                x: 150,
                y: 400,
            },
        ],
    );

    let out = calibrate(&[img.view()], &cat).expect("calibrated");
    assert_eq!(out.translations, vec![(1, Vector2::new(0.0, -20.0))]);
    let e1 = out.layout.entry(1).expect("display 1");
    assert_eq!((e1.offset_x, e1.offset_y), (150.0, 380.0));
}

#[test]
fn organization_layout_uses_grid_corners() {
    let cat = catalog(2, MarkerLayoutKind::Organization);
    let img = side_by_side(&cat, equal_second());

    let out = calibrate(&[img.view()], &cat).expect("calibrated");
    assert_eq!(out.observations.len(), 18);
    assert_eq!(
        out.rectified[0].placement(),
        Aabb::from_origin_size(100.0, 100.0, 600.0, 360.0)
    );
    assert_eq!(out.translations, vec![(1, Vector2::new(-50.0, 0.0))]);
}

#[test]
fn identical_inputs_give_identical_layouts() {
    let cat = catalog(2, MarkerLayoutKind::Calibration);
    let img = side_by_side(&cat, equal_second());
    let a = calibrate(&[img.view()], &cat).expect("first run");
    let b = calibrate(&[img.view()], &cat).expect("second run");
    assert_eq!(a.layout, b.layout);
    assert_eq!(a.scales, b.scales);
}

#[test]
fn blank_photo_reports_empty_detection() {
    let cat = catalog(2, MarkerLayoutKind::Calibration);
    let img = GrayImage::new(320, 200, BACKGROUND);
    let err = calibrate(&[img.view()], &cat).expect_err("nothing visible");
    assert!(matches!(err, CalibrationError::DetectionEmpty { source_image: 0 }));
}

#[test]
fn missing_display_lists_its_markers() {
    let cat = catalog(2, MarkerLayoutKind::Calibration);
    let img = photo(
        &cat,
        900,
        560,
        &[Placed {
            display: 0,
            width: 600,
            height: 360,
            marker_px: 60,
            x: 100,
            y: 100,
        }],
    );
    let err = calibrate(&[img.view()], &cat).expect_err("display 1 absent");
    assert_eq!(err.kind(), ErrorKind::IncompleteDisplayMarkers);
    assert_eq!(err.display_index(), Some(1));
    assert!(matches!(
        err,
        CalibrationError::IncompleteDisplayMarkers { ref missing, .. } if missing == &vec![4, 5, 6, 7]
    ));
}

#[test]
fn first_complete_photo_is_used() {
    let cat = catalog(2, MarkerLayoutKind::Calibration);
    let partial = photo(
        &cat,
        900,
        560,
        &[Placed {
            display: 0,
            width: 600,
            height: 360,
            marker_px: 60,
            x: 100,
            y: 100,
        }],
    );
    let full = side_by_side(&cat, equal_second());

    let out = calibrate(&[partial.view(), full.view()], &cat).expect("second photo");
    assert_eq!(out.source_image, 1);
    assert!(out.observations.markers.values().all(|o| o.source_image == 1));

    let blank = GrayImage::new(64, 64, BACKGROUND);
    let err = calibrate(&[blank.view(), partial.view()], &cat).expect_err("none complete");
    assert_eq!(err.kind(), ErrorKind::DetectionEmpty);

    let err = calibrate(&[], &cat).expect_err("no input");
    assert_eq!(err.kind(), ErrorKind::NoPhotographs);
}

/// Sees markers in full photographs only; rectified crops come back empty.
struct PhotoOnlyDetector(ArucoDetector);

impl MarkerDetector for PhotoOnlyDetector {
    fn detect_markers(&self, image: &GrayImageView<'_>) -> DetectorOutput {
        if image.width >= 1000 {
            self.0.detect_markers(image)
        } else {
            DetectorOutput::default()
        }
    }
}

#[test]
fn scale_without_redetected_markers_is_indeterminate() {
    let cat = catalog(2, MarkerLayoutKind::Calibration);
    let img = side_by_side(&cat, equal_second());
    let calibrator = Calibrator::with_detector(
        cat,
        PhotoOnlyDetector(ArucoDetector::new(ArucoDetectorParams::default())),
        DisplayRectifier::default(),
    );
    let err = calibrator.calibrate(&[img.view()]).expect_err("no scale");
    assert_eq!(err.kind(), ErrorKind::ScaleIndeterminate);
    assert_eq!(err.display_index(), Some(0));
}
