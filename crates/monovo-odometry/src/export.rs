use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Owned copy of the trajectory and the map as rows of `[x, y, z]`.
///
/// `trajectory` is an N x 3 array in composition order, `map_points` an M x 3 array in
/// insertion order. Both are incremental odometry results: they drift without bound and carry
/// an arbitrary global scale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OdometryExport {
    /// Camera positions in the world frame.
    pub trajectory: Vec<[f64; 3]>,
    /// Map points in the world frame.
    pub map_points: Vec<[f64; 3]>,
}

impl OdometryExport {
    /// Copy a trajectory and a set of map points.
    pub fn new(trajectory: &[DVec3], map_points: &[DVec3]) -> Self {
        Self {
            trajectory: trajectory.iter().map(|p| p.to_array()).collect(),
            map_points: map_points.iter().map(|p| p.to_array()).collect(),
        }
    }

    /// Whether there is nothing to persist.
    pub fn is_empty(&self) -> bool {
        self.trajectory.is_empty() && self.map_points.is_empty()
    }

    /// The trajectory as a row-major flat array of length `3 * N`.
    pub fn trajectory_flat(&self) -> Vec<f64> {
        self.trajectory.iter().flatten().copied().collect()
    }

    /// The map points as a row-major flat array of length `3 * M`.
    pub fn map_points_flat(&self) -> Vec<f64> {
        self.map_points.iter().flatten().copied().collect()
    }
}
