use monovo_geometry::{pose::PoseEstimatorConfig, triangulation::TriangulationParams};
use serde::{Deserialize, Serialize};

/// Configuration of the odometry pipeline.
///
/// Every field has a default, so partial configurations deserialize.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OdometryConfig {
    /// Minimum number of correspondences to attempt pose estimation.
    pub min_matches: usize,
    /// Relative pose estimation settings.
    pub pose: PoseEstimatorConfig,
    /// Triangulation settings.
    pub triangulation: TriangulationParams,
}

impl Default for OdometryConfig {
    fn default() -> Self {
        Self {
            min_matches: 50,
            pose: PoseEstimatorConfig::default(),
            triangulation: TriangulationParams::default(),
        }
    }
}
