//! Core types and utilities for display layout calibration.
//!
//! This crate is small and purely geometric: grayscale image buffers,
//! bilinear sampling, 4-point homographies with perspective warping, and
//! axis-aligned box math. It knows nothing about markers or displays.

mod geometry;
mod homography;
mod image;
mod logger;

pub use geometry::{
    quad_centroid, quad_edge_length, quad_mean_diagonal, quad_signed_area, Aabb, Quad,
};
pub use homography::{has_collinear_triplet, homography_from_4pt, warp_perspective_gray, Homography};
pub use image::{get_gray, sample_bilinear, sample_bilinear_u8, GrayImage, GrayImageView};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
