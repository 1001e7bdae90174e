//! Calibration with the `tracing` instrumentation compiled in.

use display_organizer::core::{init_tracing, GrayImage};
use display_organizer::{calibrate, CatalogSpec, MarkerCatalog, MarkerLayoutKind};

#[test]
fn instrumented_calibration_produces_the_same_layout() {
    init_tracing(false);

    let cat = MarkerCatalog::new(CatalogSpec::new(2, MarkerLayoutKind::Calibration))
        .expect("catalog");
    let mut img = GrayImage::new(1400, 560, 90);
    for (display, x) in [(0usize, 100i64), (1, 750)] {
        let screen = cat.render_screen(display, 600, 360, 60).expect("screen");
        img.paste(&screen, x, 100);
    }

    let out = calibrate(&[img.view()], &cat).expect("calibrated");
    let e1 = out.layout.entry(1).expect("display 1");
    assert_eq!((e1.offset_x, e1.offset_y), (700.0, 100.0));
}
