//! Stderr logger for the command-line examples and benches.
//!
//! Lines look like `[  1.204s  INFO rectify] message`. Records from this
//! workspace pass at the configured level; records from dependencies are
//! capped at `Warn`. Library code only uses the `log` macros.

use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{Level, LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::util::SubscriberInitExt;
#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt, EnvFilter};

const OWN_PREFIX: &str = "display_organizer";

struct LayoutLogger {
    level: LevelFilter,
    started: Instant,
}

impl LayoutLogger {
    fn limit_for(&self, target: &str) -> LevelFilter {
        if target.starts_with(OWN_PREFIX) {
            self.level
        } else {
            self.level.min(LevelFilter::Warn)
        }
    }
}

/// `display_organizer::calibrate::pipeline` -> `calibrate::pipeline`.
fn short_target(target: &str) -> &str {
    if !target.starts_with(OWN_PREFIX) {
        return target;
    }
    target.split_once("::").map_or(target, |(_, rest)| rest)
}

impl Log for LayoutLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.limit_for(metadata.target())
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let tag = match record.level() {
            Level::Error => "ERROR",
            Level::Warn => " WARN",
            Level::Info => " INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        };
        let _ = writeln!(
            std::io::stderr().lock(),
            "[{:8.3}s {} {}] {}",
            self.started.elapsed().as_secs_f64(),
            tag,
            short_target(record.target()),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: OnceLock<LayoutLogger> = OnceLock::new();

/// Install the stderr logger at `level`.
///
/// Later calls keep the first logger and return `Ok`.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_some() {
        return Ok(());
    }
    let logger = LOGGER.get_or_init(|| LayoutLogger {
        level,
        started: Instant::now(),
    });
    log::set_logger(logger)?;
    log::set_max_level(level);
    Ok(())
}

/// Install a `tracing` subscriber filtered by `RUST_LOG`.
///
/// Without `RUST_LOG` the workspace crates log at `info` and everything else
/// at `warn`. `json` switches to flattened JSON events for log collectors.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(
            "warn,display_organizer=info,display_organizer_aruco=info,display_organizer_core=info",
        )
    });
    let builder = fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE);
    let _ = if json {
        builder.json().flatten_event(true).finish().try_init()
    } else {
        builder
            .with_timer(fmt::time::Uptime::default())
            .finish()
            .try_init()
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workspace_targets_are_shortened() {
        assert_eq!(
            short_target("display_organizer::calibrate::pipeline"),
            "calibrate::pipeline"
        );
        assert_eq!(short_target("display_organizer_aruco::detector"), "detector");
        assert_eq!(short_target("png::encoder"), "png::encoder");
    }

    #[test]
    fn dependencies_are_capped_at_warn() {
        let logger = LayoutLogger {
            level: LevelFilter::Debug,
            started: Instant::now(),
        };
        assert_eq!(logger.limit_for("display_organizer::rectify"), LevelFilter::Debug);
        assert_eq!(logger.limit_for("png::decoder"), LevelFilter::Warn);
    }
}
