//! Calibrate from a JSON config and log the resulting layout.
//!
//! Usage: `calibrate_photo [config.json]`. The default config is the one
//! `render_markers` writes next to its synthetic photograph.

use std::{env, path::PathBuf};

use display_organizer::calibrate_from_config;

#[cfg(not(feature = "tracing"))]
use log::{info, warn, LevelFilter};

#[cfg(feature = "tracing")]
use tracing::{info, warn};

#[cfg(feature = "tracing")]
use display_organizer::core::init_tracing;
#[cfg(not(feature = "tracing"))]
use display_organizer::core::init_with_level;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(not(feature = "tracing"))]
    init_with_level(LevelFilter::Info)?;

    #[cfg(feature = "tracing")]
    init_tracing(false);

    let config_path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("markers_out/calibrate_config.json"));

    let report = calibrate_from_config(&config_path)?;
    match (&report.normalized_layout, &report.error) {
        (Some(layout), _) => {
            for e in &layout.entries {
                let (w, h) = e.normalized_size();
                info!(
                    "display {}: at ({:.0}, {:.0}), {:.0}x{:.0} reference px",
                    e.display_index, e.offset_x, e.offset_y, w, h
                );
            }
        }
        (None, Some(err)) => warn!("calibration failed: {err}"),
        (None, None) => warn!("no layout produced"),
    }
    Ok(())
}
