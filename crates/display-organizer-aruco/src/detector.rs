//! Full-image marker detection: threshold, quad search, decode.

use crate::builtins::DICT_4X4_50;
use crate::candidates::{find_quad_candidates, CandidateParams};
use crate::decode::{DecodeConfig, QuadDecoder};
use crate::threshold::otsu_threshold;
use crate::{Dictionary, Matcher};
use display_organizer_core::{GrayImageView, Quad};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// How the image is binarized before the quad search.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdMode {
    /// Global Otsu threshold over the whole image.
    #[default]
    Otsu,
    /// Fixed intensity; pixels `<=` this value are dark.
    Fixed(u8),
}

/// Parameters of [`ArucoDetector`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ArucoDetectorParams {
    pub dictionary: Dictionary,
    /// Maximum accepted bit errors, clamped to the dictionary capability.
    pub max_hamming: u8,
    pub threshold: ThresholdMode,
    pub candidates: CandidateParams,
    pub decode: DecodeConfig,
}

impl Default for ArucoDetectorParams {
    fn default() -> Self {
        Self {
            dictionary: DICT_4X4_50,
            max_hamming: 1,
            threshold: ThresholdMode::Otsu,
            candidates: CandidateParams::default(),
            decode: DecodeConfig::default(),
        }
    }
}

/// One decoded marker in image coordinates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerDetection {
    pub id: u32,
    /// Outer corners in the marker's own frame: TL, TR, BR, BL.
    pub corners: Quad,
    /// Quarter turns between the marker frame and the image frame.
    pub rotation: u8,
    pub hamming: u8,
    pub score: f32,
    pub border_score: f32,
}

/// Output of one detection pass.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ArucoDetections {
    /// Decoded markers, unique by id and sorted by id.
    pub markers: Vec<MarkerDetection>,
    /// Candidate quads that passed the shape gates but did not decode.
    pub rejected: Vec<Quad>,
}

impl ArucoDetections {
    pub fn get(&self, id: u32) -> Option<&MarkerDetection> {
        self.markers
            .binary_search_by_key(&id, |m| m.id)
            .ok()
            .map(|i| &self.markers[i])
    }

    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.markers.iter().map(|m| m.id)
    }
}

/// Square-marker detector over an 8-bit grayscale image.
#[derive(Clone, Debug)]
pub struct ArucoDetector {
    params: ArucoDetectorParams,
    matcher: Matcher,
}

impl ArucoDetector {
    pub fn new(params: ArucoDetectorParams) -> Self {
        let matcher = Matcher::new(params.dictionary, params.max_hamming);
        Self { params, matcher }
    }

    pub fn params(&self) -> &ArucoDetectorParams {
        &self.params
    }

    pub fn dictionary(&self) -> Dictionary {
        self.matcher.dictionary()
    }

    /// Detect every dictionary marker visible in `image`.
    ///
    /// When two candidates decode to the same id the higher score wins; the
    /// earlier candidate in raster order wins ties.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, image), fields(w = image.width, h = image.height))
    )]
    pub fn detect(&self, image: &GrayImageView<'_>) -> ArucoDetections {
        let threshold = match self.params.threshold {
            ThresholdMode::Fixed(t) => Some(t),
            ThresholdMode::Otsu => otsu_threshold(&crate::threshold::histogram(image.data)),
        };
        let Some(threshold) = threshold else {
            log::debug!("uniform image, no markers");
            return ArucoDetections::default();
        };

        let candidates = find_quad_candidates(image, threshold, &self.params.candidates);
        let Some(mut decoder) = QuadDecoder::new(&self.params.decode, &self.matcher) else {
            log::warn!("decode config cannot sample this dictionary");
            return ArucoDetections {
                markers: Vec::new(),
                rejected: candidates.into_iter().map(|c| c.quad).collect(),
            };
        };

        let mut by_id: BTreeMap<u32, MarkerDetection> = BTreeMap::new();
        let mut rejected = Vec::new();
        for cand in candidates {
            let Some(d) = decoder.decode(image, &cand.quad) else {
                rejected.push(cand.quad);
                continue;
            };

            let r = d.matched.rotation as usize;
            let corners = std::array::from_fn(|i| cand.quad[(i + r) % 4]);
            let det = MarkerDetection {
                id: d.matched.id,
                corners,
                rotation: d.matched.rotation,
                hamming: d.matched.hamming,
                score: d.score,
                border_score: d.border_score,
            };

            match by_id.get(&det.id) {
                Some(prev) if prev.score >= det.score => {}
                _ => {
                    by_id.insert(det.id, det);
                }
            }
        }

        let markers: Vec<MarkerDetection> = by_id.into_values().collect();
        log::debug!(
            "threshold {threshold}: {} markers, {} rejected quads",
            markers.len(),
            rejected.len()
        );
        ArucoDetections { markers, rejected }
    }
}
