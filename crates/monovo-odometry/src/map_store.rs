use glam::DVec3;

use crate::pose_chain::AbsolutePose;

/// A triangulated point in world coordinates.
pub type MapPoint = DVec3;

/// Append-only collection of world points.
///
/// Points are never merged, pruned or linked to the frames that observed them.
#[derive(Debug, Clone, Default)]
pub struct MapStore {
    points: Vec<MapPoint>,
}

impl MapStore {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move points from the camera frame of `pose` to the world frame and append them.
    ///
    /// Returns the number of points added.
    pub fn insert(&mut self, points_in_camera: &[DVec3], pose: &AbsolutePose) -> usize {
        self.points
            .extend(points_in_camera.iter().map(|p| pose.transform_point(*p)));
        points_in_camera.len()
    }

    /// Number of points in the map.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the map is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Borrow the points, in insertion order.
    pub fn points(&self) -> &[MapPoint] {
        &self.points
    }

    /// Copy of the points, safe to keep while the map keeps growing.
    pub fn snapshot(&self) -> Vec<MapPoint> {
        self.points.clone()
    }
}
