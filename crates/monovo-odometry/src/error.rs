use monovo_geometry::{camera::CalibrationError, pose::PoseEstimationError};

/// Errors raised by the odometry pipeline.
///
/// Only [`OdometryError::InvalidCalibration`] is fatal. The per-frame kinds are logged by the
/// [`FrameProcessor`](crate::FrameProcessor) and turned into a "no update" outcome.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum OdometryError {
    /// The intrinsic matrix is non-finite or not invertible.
    #[error("Invalid calibration: {0}")]
    InvalidCalibration(#[from] CalibrationError),

    /// The correspondence source returned fewer matches than required.
    #[error("Insufficient correspondences: {count} < {min_matches}")]
    InsufficientCorrespondences {
        /// Number of correspondences returned.
        count: usize,
        /// Minimum number of correspondences to attempt pose estimation.
        min_matches: usize,
    },

    /// No trustworthy relative pose could be recovered.
    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(#[from] PoseEstimationError),
}
