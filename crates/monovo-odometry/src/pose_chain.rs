use glam::{DMat3, DMat4, DVec3};
use monovo_geometry::pose::RelativePose;
use serde::{Deserialize, Serialize};

/// Camera-to-world transform of one camera along the trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AbsolutePose {
    /// Rotation from the camera frame to the world frame.
    pub rotation: DMat3,
    /// Camera position in the world frame.
    pub translation: DVec3,
}

impl Default for AbsolutePose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl AbsolutePose {
    /// The world frame itself.
    pub const IDENTITY: Self = Self {
        rotation: DMat3::IDENTITY,
        translation: DVec3::ZERO,
    };

    /// The 4x4 homogeneous form `[R | t; 0 0 0 1]`.
    pub fn to_homogeneous(&self) -> DMat4 {
        DMat4::from_cols(
            self.rotation.x_axis.extend(0.0),
            self.rotation.y_axis.extend(0.0),
            self.rotation.z_axis.extend(0.0),
            self.translation.extend(1.0),
        )
    }

    /// Build a pose from a 4x4 homogeneous matrix, ignoring the last row.
    pub fn from_homogeneous(m: &DMat4) -> Self {
        Self {
            rotation: DMat3::from_mat4(*m),
            translation: m.w_axis.truncate(),
        }
    }

    /// Chain a relative pose: `T_world_curr = T_world_prev * T_prev_curr`.
    pub fn compose(&self, relative: &RelativePose) -> Self {
        Self::from_homogeneous(&(self.to_homogeneous() * relative.to_homogeneous()))
    }

    /// Map a point from the camera frame to the world frame: `R * p + t`.
    #[inline]
    pub fn transform_point(&self, p: DVec3) -> DVec3 {
        self.rotation * p + self.translation
    }
}

/// Ordered chain of absolute poses, seeded with the identity.
///
/// Each appended relative pose is composed onto the latest absolute pose. Nothing is ever
/// corrected, smoothed or optimized: the error of every step is carried into all later poses.
#[derive(Debug, Clone)]
pub struct PoseChain {
    poses: Vec<AbsolutePose>,
    trajectory: Vec<DVec3>,
}

impl Default for PoseChain {
    fn default() -> Self {
        Self::new()
    }
}

impl PoseChain {
    /// Create a chain holding only the identity pose.
    pub fn new() -> Self {
        Self {
            poses: vec![AbsolutePose::IDENTITY],
            trajectory: Vec::new(),
        }
    }

    /// Compose `relative` onto the latest pose, store the result and its position.
    pub fn append(&mut self, relative: &RelativePose) -> AbsolutePose {
        let next = self.latest().compose(relative);
        self.poses.push(next);
        self.trajectory.push(next.translation);
        next
    }

    /// The most recent absolute pose.
    pub fn latest(&self) -> &AbsolutePose {
        // the chain is never empty, it starts with the identity
        &self.poses[self.poses.len() - 1]
    }

    /// All absolute poses, starting with the identity seed.
    pub fn poses(&self) -> &[AbsolutePose] {
        &self.poses
    }

    /// Camera positions, one per appended relative pose.
    pub fn trajectory(&self) -> &[DVec3] {
        &self.trajectory
    }

    /// Number of absolute poses, including the identity seed.
    #[inline]
    pub fn len(&self) -> usize {
        self.poses.len()
    }

    /// Always false: the chain holds at least the identity seed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use monovo_geometry::linalg::is_rotation;
    use monovo_geometry::transforms::axis_angle_to_rotation_matrix;

    fn relative_poses() -> Result<Vec<RelativePose>, &'static str> {
        Ok(vec![
            RelativePose::new(axis_angle_to_rotation_matrix(DVec3::Y, 0.1)?, DVec3::X),
            RelativePose::new(
                axis_angle_to_rotation_matrix(DVec3::new(1.0, 1.0, 0.0), 0.05)?,
                DVec3::new(0.0, 0.3, 1.0),
            ),
            RelativePose::new(axis_angle_to_rotation_matrix(DVec3::Z, -0.2)?, DVec3::Z),
        ])
    }

    #[test]
    fn test_new_chain_is_identity() {
        let chain = PoseChain::new();
        assert_eq!(chain.len(), 1);
        assert_eq!(*chain.latest(), AbsolutePose::IDENTITY);
        assert!(chain.trajectory().is_empty());
    }

    #[test]
    fn test_chain_matches_homogeneous_product() -> Result<(), Box<dyn std::error::Error>> {
        let relatives = relative_poses()?;
        let mut chain = PoseChain::new();
        let mut expected = DMat4::IDENTITY;
        for (k, rel) in relatives.iter().enumerate() {
            let latest = chain.append(rel);
            expected *= rel.to_homogeneous();

            assert!(latest.to_homogeneous().abs_diff_eq(expected, 1e-12));
            assert_eq!(chain.trajectory().len(), k + 1);
            assert!(is_rotation(&latest.rotation, 1e-4));
        }
        assert_eq!(chain.len(), relatives.len() + 1);
        assert_eq!(chain.trajectory()[2], chain.latest().translation);
        Ok(())
    }

    #[test]
    fn test_compose_translation() -> Result<(), Box<dyn std::error::Error>> {
        let r = axis_angle_to_rotation_matrix(DVec3::Y, std::f64::consts::FRAC_PI_2)?;
        let first = AbsolutePose::IDENTITY.compose(&RelativePose::new(r, DVec3::Z));
        let second = first.compose(&RelativePose::new(DMat3::IDENTITY, DVec3::Z));
        // the second step moves along the rotated z axis, which is world x
        assert!(second.translation.abs_diff_eq(DVec3::new(1.0, 0.0, 1.0), 1e-12));
        Ok(())
    }

    #[test]
    fn test_homogeneous_roundtrip_and_transform() -> Result<(), Box<dyn std::error::Error>> {
        let pose = AbsolutePose {
            rotation: axis_angle_to_rotation_matrix(DVec3::new(0.2, 1.0, -0.4), 0.6)?,
            translation: DVec3::new(-1.0, 0.5, 2.0),
        };
        let m = pose.to_homogeneous();
        assert_eq!(AbsolutePose::from_homogeneous(&m), pose);

        let p = DVec3::new(0.3, -0.7, 4.0);
        let expected = m.transform_point3(p);
        let actual = pose.transform_point(p);
        assert_relative_eq!(actual.x, expected.x, epsilon = 1e-12);
        assert_relative_eq!(actual.y, expected.y, epsilon = 1e-12);
        assert_relative_eq!(actual.z, expected.z, epsilon = 1e-12);
        Ok(())
    }
}
