//! # Pose estimation
//!
//! Relative pose between two calibrated views from 2D correspondences.
//!
//! - essential matrix: epipolar geometry in normalized coordinates (5 DOF)
//! - RANSAC: robust essential matrix estimation with an adaptive iteration budget
//! - [`PoseEstimator`]: RANSAC followed by SVD decomposition and cheirality disambiguation
//!
//! All relative poses follow the same convention: `(R, t)` maps a point expressed in the
//! **current** camera frame into the **previous** camera frame, `X_prev = R * X_curr + t`.

use glam::{DMat3, DMat4, DVec3};
use serde::{Deserialize, Serialize};

mod essential;
pub use essential::*;

mod ransac;
pub use ransac::*;

mod estimator;
pub use estimator::*;

/// Errors returned by the relative pose estimation pipeline.
///
/// Every variant describes a degenerate two-view geometry: the frame pair cannot produce a
/// trustworthy relative pose.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PoseEstimationError {
    /// Not enough valid correspondences for the minimal solver.
    #[error("Need at least {required} valid correspondences, got {actual}")]
    TooFewCorrespondences {
        /// Minimum number of correspondences.
        required: usize,
        /// Number of valid correspondences provided.
        actual: usize,
    },
    /// The correspondences collapse onto (nearly) a single image location.
    #[error("Correspondences are spatially degenerate (spread {spread:.3e} px)")]
    DegenerateConfiguration {
        /// Smallest RMS distance to the centroid over both views, in pixels.
        spread: f64,
    },
    /// The epipolar linear system is rank deficient.
    #[error("Epipolar linear system is ill-conditioned")]
    IllConditioned,
    /// RANSAC did not find a hypothesis with enough support.
    #[error("RANSAC found no consensus: best hypothesis has {inliers} inliers, {required} required")]
    NoConsensus {
        /// Inlier count of the best hypothesis.
        inliers: usize,
        /// Minimum number of inliers required.
        required: usize,
    },
    /// No decomposition candidate places a majority of points in front of both cameras.
    #[error("Cheirality check is ambiguous: {positive} of {sampled} points in front of both cameras")]
    AmbiguousCheirality {
        /// Positive-depth count of the best candidate.
        positive: usize,
        /// Number of triangulated sample points.
        sampled: usize,
    },
}

/// Relative motion between two views, with unit-norm translation.
///
/// `rotation` and `translation` map points from the current camera frame into the previous
/// camera frame. The translation only carries a direction: monocular two-view geometry cannot
/// observe scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelativePose {
    /// Rotation from the current camera frame to the previous camera frame.
    pub rotation: DMat3,
    /// Unit translation direction from the current camera frame to the previous camera frame.
    pub translation: DVec3,
}

impl RelativePose {
    /// Create a relative pose, normalizing the translation to unit length.
    pub fn new(rotation: DMat3, translation: DVec3) -> Self {
        Self {
            rotation,
            translation: translation.normalize_or_zero(),
        }
    }

    /// The 4x4 homogeneous form `[R | t; 0 0 0 1]`.
    pub fn to_homogeneous(&self) -> DMat4 {
        DMat4::from_cols(
            self.rotation.x_axis.extend(0.0),
            self.rotation.y_axis.extend(0.0),
            self.rotation.z_axis.extend(0.0),
            self.translation.extend(1.0),
        )
    }

    /// Whether the rotation is proper and orthonormal and the translation has unit norm,
    /// within `eps`.
    pub fn is_valid(&self, eps: f64) -> bool {
        crate::linalg::is_rotation(&self.rotation, eps)
            && (self.translation.length() - 1.0).abs() < eps
    }
}
