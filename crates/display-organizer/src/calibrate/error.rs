use crate::catalog::CatalogError;
use serde::{Deserialize, Serialize};

/// Why a calibration run stopped.
#[derive(thiserror::Error, Debug)]
pub enum CalibrationError {
    #[error("no markers detected in photograph {source_image}")]
    DetectionEmpty { source_image: usize },
    #[error("display {display_index} is missing corner markers {missing:?}")]
    IncompleteDisplayMarkers {
        display_index: usize,
        missing: Vec<u32>,
    },
    #[error("display {display_index} corner points do not define a rectifiable quad")]
    RectificationSingular { display_index: usize },
    #[error("no markers re-detected for display {display_index}, scale is undefined")]
    ScaleIndeterminate { display_index: usize },
    #[error("no photographs supplied")]
    NoPhotographs,
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Payload-free discriminant of [`CalibrationError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    DetectionEmpty,
    IncompleteDisplayMarkers,
    RectificationSingular,
    ScaleIndeterminate,
    NoPhotographs,
    Catalog,
}

impl CalibrationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DetectionEmpty { .. } => ErrorKind::DetectionEmpty,
            Self::IncompleteDisplayMarkers { .. } => ErrorKind::IncompleteDisplayMarkers,
            Self::RectificationSingular { .. } => ErrorKind::RectificationSingular,
            Self::ScaleIndeterminate { .. } => ErrorKind::ScaleIndeterminate,
            Self::NoPhotographs => ErrorKind::NoPhotographs,
            Self::Catalog(_) => ErrorKind::Catalog,
        }
    }

    /// The display the failure is attributed to, if any.
    pub fn display_index(&self) -> Option<usize> {
        match self {
            Self::IncompleteDisplayMarkers { display_index, .. }
            | Self::RectificationSingular { display_index }
            | Self::ScaleIndeterminate { display_index } => Some(*display_index),
            _ => None,
        }
    }
}
