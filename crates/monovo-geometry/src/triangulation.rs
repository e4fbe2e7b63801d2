use glam::{DMat3, DVec2, DVec3};
use serde::{Deserialize, Serialize};

use crate::camera::CalibrationMatrix;
use crate::correspondence::Correspondence;
use crate::linalg::null_vector;
use crate::pose::RelativePose;

/// A 3x4 camera projection matrix stored row by row.
pub type ProjectionMatrix = [[f64; 4]; 3];

/// Parameters for the two-view triangulator.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriangulationParams {
    /// Maximum depth in the reference camera frame, in units of the (unit) baseline.
    pub max_depth: f64,
}

impl Default for TriangulationParams {
    fn default() -> Self {
        Self { max_depth: 100.0 }
    }
}

/// Build the projection matrix `P = K * [R | t]`.
pub fn projection_matrix(k: &DMat3, r: &DMat3, t: &DVec3) -> ProjectionMatrix {
    let kr = *k * *r;
    let kt = *k * *t;
    let mut p = [[0.0; 4]; 3];
    for (i, row) in p.iter_mut().enumerate() {
        let r_row = kr.row(i);
        *row = [r_row.x, r_row.y, r_row.z, kt[i]];
    }
    p
}

/// Triangulate one point from two views with the direct linear transform.
///
/// Each view contributes two rows `x * P[2] - P[0]` and `y * P[2] - P[1]` of a 4x4 homogeneous
/// system whose least-squares solution is the right singular vector of the smallest singular
/// value.
///
/// Returns `None` for points at infinity or non-finite solutions.
pub fn triangulate_dlt(
    p1: &ProjectionMatrix,
    p2: &ProjectionMatrix,
    x1: &DVec2,
    x2: &DVec2,
) -> Option<DVec3> {
    let mut a = faer::Mat::<f64>::zeros(4, 4);
    write_dlt_row(&mut a, 0, x1.x, &p1[2], &p1[0]);
    write_dlt_row(&mut a, 1, x1.y, &p1[2], &p1[1]);
    write_dlt_row(&mut a, 2, x2.x, &p2[2], &p2[0]);
    write_dlt_row(&mut a, 3, x2.y, &p2[2], &p2[1]);

    let (xh, _) = null_vector(&a);
    let w = xh[3];
    if w.abs() < 1e-12 {
        return None;
    }
    let x = DVec3::new(xh[0] / w, xh[1] / w, xh[2] / w);
    x.is_finite().then_some(x)
}

fn write_dlt_row(a: &mut faer::Mat<f64>, row: usize, x: f64, p3: &[f64; 4], p1: &[f64; 4]) {
    for j in 0..4 {
        a.write(row, j, x * p3[j] - p1[j]);
    }
}

/// Recovers 3D points from correspondences and a relative pose.
///
/// The reference camera is the current view, `P1 = K * [I | 0]`, and the previous view is
/// `P2 = K * [R | t]` following the [`RelativePose`] convention. Points are returned in the
/// reference camera frame; moving them to world coordinates is left to the caller.
#[derive(Debug, Clone)]
pub struct Triangulator {
    calibration: CalibrationMatrix,
    params: TriangulationParams,
}

impl Triangulator {
    /// Create a triangulator for a calibrated camera.
    pub fn new(calibration: CalibrationMatrix, params: TriangulationParams) -> Self {
        Self {
            calibration,
            params,
        }
    }

    /// The triangulation parameters.
    pub fn params(&self) -> &TriangulationParams {
        &self.params
    }

    /// Triangulate every correspondence and keep the points with depth in `(0, max_depth]`.
    ///
    /// Non-finite points and points outside the depth range are dropped silently.
    pub fn triangulate(
        &self,
        correspondences: &[Correspondence],
        pose: &RelativePose,
    ) -> Vec<DVec3> {
        let k = self.calibration.matrix();
        let p1 = projection_matrix(k, &DMat3::IDENTITY, &DVec3::ZERO);
        let p2 = projection_matrix(k, &pose.rotation, &pose.translation);

        let points = correspondences
            .iter()
            .filter_map(|c| triangulate_dlt(&p1, &p2, &c.current, &c.previous))
            .filter(|x| x.z > 0.0 && x.z <= self.params.max_depth)
            .collect::<Vec<_>>();

        log::debug!(
            "Triangulated {}/{} points within depth (0, {}]",
            points.len(),
            correspondences.len(),
            self.params.max_depth
        );

        points
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::CalibrationError;
    use crate::transforms::axis_angle_to_rotation_matrix;
    use approx::assert_relative_eq;

    fn setup() -> Result<(CalibrationMatrix, RelativePose), Box<dyn std::error::Error>> {
        let k = CalibrationMatrix::new(800.0, 800.0, 320.0, 240.0)?;
        let r = axis_angle_to_rotation_matrix(DVec3::Y, 5f64.to_radians())?;
        Ok((k, RelativePose::new(r, DVec3::X)))
    }

    fn observe(
        k: &CalibrationMatrix,
        pose: &RelativePose,
        p: DVec3,
    ) -> Option<Correspondence> {
        let q = pose.rotation * p + pose.translation;
        Some(Correspondence::new(k.project(q)?, k.project(p)?))
    }

    #[test]
    fn test_projection_matrix_identity() -> Result<(), CalibrationError> {
        let k = CalibrationMatrix::new(500.0, 400.0, 10.0, 20.0)?;
        let p = projection_matrix(k.matrix(), &DMat3::IDENTITY, &DVec3::ZERO);
        assert_eq!(p[0], [500.0, 0.0, 10.0, 0.0]);
        assert_eq!(p[1], [0.0, 400.0, 20.0, 0.0]);
        assert_eq!(p[2], [0.0, 0.0, 1.0, 0.0]);
        Ok(())
    }

    #[test]
    fn test_triangulate_recovers_points() -> Result<(), Box<dyn std::error::Error>> {
        let (k, pose) = setup()?;
        let points = vec![
            DVec3::new(0.5, -0.3, 5.0),
            DVec3::new(-1.0, 0.4, 7.5),
            DVec3::new(0.1, 0.9, 3.2),
        ];
        let correspondences = points
            .iter()
            .filter_map(|p| observe(&k, &pose, *p))
            .collect::<Vec<_>>();
        assert_eq!(correspondences.len(), points.len());

        let triangulator = Triangulator::new(k, TriangulationParams::default());
        let estimated = triangulator.triangulate(&correspondences, &pose);
        assert_eq!(estimated.len(), points.len());
        for (e, p) in estimated.iter().zip(points.iter()) {
            assert_relative_eq!(e.x, p.x, epsilon = 1e-6);
            assert_relative_eq!(e.y, p.y, epsilon = 1e-6);
            assert_relative_eq!(e.z, p.z, epsilon = 1e-6);
        }
        Ok(())
    }

    #[test]
    fn test_triangulate_depth_filter() -> Result<(), Box<dyn std::error::Error>> {
        let (k, pose) = setup()?;
        let near = DVec3::new(0.2, 0.1, 10.0);
        let far = DVec3::new(0.2, 0.1, 150.0);
        let correspondences = [near, far]
            .iter()
            .filter_map(|p| observe(&k, &pose, *p))
            .collect::<Vec<_>>();

        let triangulator = Triangulator::new(k, TriangulationParams { max_depth: 100.0 });
        let estimated = triangulator.triangulate(&correspondences, &pose);
        assert_eq!(estimated.len(), 1);
        assert!(estimated[0].z > 0.0 && estimated[0].z <= 100.0);
        Ok(())
    }

    #[test]
    fn test_triangulate_rejects_behind_camera() -> Result<(), Box<dyn std::error::Error>> {
        let (k, pose) = setup()?;
        // swapping the pose direction places the reconstruction behind the reference camera
        let flipped = RelativePose::new(pose.rotation, -pose.translation);
        let c = observe(&k, &pose, DVec3::new(0.3, 0.2, 6.0)).ok_or("not visible")?;

        let triangulator = Triangulator::new(k, TriangulationParams::default());
        assert!(triangulator.triangulate(&[c], &flipped).is_empty());
        Ok(())
    }
}
