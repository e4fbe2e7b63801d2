use glam::{DMat3, DVec3};

/// Compute the rotation matrix from an axis and angle.
///
/// # Arguments
///
/// * `axis` - The axis of rotation, normalized internally.
/// * `angle` - The angle of rotation in radians.
///
/// # Returns
///
/// The rotation matrix, or an error if the axis is a zero vector.
///
/// Example:
///
/// ```no_run
/// use glam::DVec3;
/// use monovo_geometry::transforms::axis_angle_to_rotation_matrix;
///
/// let axis = DVec3::X;
/// let angle = std::f64::consts::PI / 2.0;
/// let rotation = axis_angle_to_rotation_matrix(axis, angle).unwrap();
/// ```
pub fn axis_angle_to_rotation_matrix(axis: DVec3, angle: f64) -> Result<DMat3, &'static str> {
    let magnitude = axis.length();
    if magnitude < 1e-10 {
        return Err("cannot compute rotation matrix from a zero vector");
    }
    let n = axis / magnitude;

    let c = angle.cos();
    let s = angle.sin();
    let t = 1.0 - c;

    let m00 = c + n.x * n.x * t;
    let m11 = c + n.y * n.y * t;
    let m22 = c + n.z * n.z * t;

    let tmp1 = n.x * n.y * t;
    let tmp2 = n.z * s;
    let m10 = tmp1 + tmp2;
    let m01 = tmp1 - tmp2;

    let tmp3 = n.x * n.z * t;
    let tmp4 = n.y * s;
    let m20 = tmp3 - tmp4;
    let m02 = tmp3 + tmp4;

    let tmp5 = n.y * n.z * t;
    let tmp6 = n.x * s;
    let m12 = tmp5 - tmp6;
    let m21 = tmp5 + tmp6;

    // glam matrices are column major
    Ok(DMat3::from_cols(
        DVec3::new(m00, m10, m20),
        DVec3::new(m01, m11, m21),
        DVec3::new(m02, m12, m22),
    ))
}

/// Rotation angle in radians of a rotation matrix, in `[0, pi]`.
pub fn rotation_angle(r: &DMat3) -> f64 {
    let trace = r.x_axis.x + r.y_axis.y + r.z_axis.z;
    ((trace - 1.0) * 0.5).clamp(-1.0, 1.0).acos()
}

/// Angle in radians of the relative rotation `a^T * b`.
pub fn rotation_distance(a: &DMat3, b: &DMat3) -> f64 {
    rotation_angle(&(a.transpose() * *b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_axis_angle_to_rotation_matrix() -> Result<(), Box<dyn std::error::Error>> {
        let rotation = axis_angle_to_rotation_matrix(DVec3::X, std::f64::consts::PI / 2.0)?;
        let expected = DMat3::from_cols(
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(0.0, 0.0, 1.0),
            DVec3::new(0.0, -1.0, 0.0),
        );
        assert!(rotation.abs_diff_eq(expected, 1e-12));
        Ok(())
    }

    #[test]
    fn test_matches_glam_axis_angle() -> Result<(), Box<dyn std::error::Error>> {
        let axis = DVec3::new(0.2, -1.0, 0.5);
        let rotation = axis_angle_to_rotation_matrix(axis, 0.7)?;
        let expected = DMat3::from_axis_angle(axis.normalize(), 0.7);
        assert!(rotation.abs_diff_eq(expected, 1e-12));
        Ok(())
    }

    #[test]
    fn test_zero_axis() {
        assert!(axis_angle_to_rotation_matrix(DVec3::ZERO, 1.0).is_err());
    }

    #[test]
    fn test_rotation_angle() -> Result<(), Box<dyn std::error::Error>> {
        let angle = 5f64.to_radians();
        let r = axis_angle_to_rotation_matrix(DVec3::Y, angle)?;
        assert_relative_eq!(rotation_angle(&r), angle, epsilon = 1e-12);
        assert_relative_eq!(rotation_distance(&r, &r), 0.0, epsilon = 1e-6);
        Ok(())
    }
}
