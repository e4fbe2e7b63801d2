use glam::{DMat3, DVec2, DVec3};
use serde::{Deserialize, Serialize};

/// Error returned when an intrinsic matrix cannot be used for estimation.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    /// One or more entries of the intrinsic matrix are NaN or infinite.
    #[error("Calibration matrix contains non-finite entries")]
    NonFinite,
    /// The intrinsic matrix has a (near) zero determinant.
    #[error("Calibration matrix is not invertible (determinant {determinant})")]
    Singular {
        /// Determinant of the rejected matrix.
        determinant: f64,
    },
}

/// The intrinsic matrix `K` of a distortion-free pinhole camera.
///
/// ```text
/// | fx  0  cx |
/// |  0 fy  cy |
/// |  0  0   1 |
/// ```
///
/// The matrix and its inverse are computed once at construction and never change afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 4]", into = "[f64; 4]")]
pub struct CalibrationMatrix {
    k: DMat3,
    k_inv: DMat3,
}

impl CalibrationMatrix {
    /// Create a calibration matrix from focal lengths and principal point, all in pixels.
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Result<Self, CalibrationError> {
        let k = DMat3::from_cols(
            DVec3::new(fx, 0.0, 0.0),
            DVec3::new(0.0, fy, 0.0),
            DVec3::new(cx, cy, 1.0),
        );
        Self::from_matrix(k)
    }

    /// Create a calibration matrix from a full 3x3 intrinsic matrix.
    ///
    /// Fails with [`CalibrationError`] when the matrix is non-finite or not invertible.
    pub fn from_matrix(k: DMat3) -> Result<Self, CalibrationError> {
        if !k.is_finite() {
            return Err(CalibrationError::NonFinite);
        }
        let determinant = k.determinant();
        if determinant.abs() < 1e-12 {
            return Err(CalibrationError::Singular { determinant });
        }
        Ok(Self {
            k,
            k_inv: k.inverse(),
        })
    }

    /// The intrinsic matrix.
    #[inline]
    pub fn matrix(&self) -> &DMat3 {
        &self.k
    }

    /// The inverse of the intrinsic matrix.
    #[inline]
    pub fn inverse(&self) -> &DMat3 {
        &self.k_inv
    }

    /// Focal length along x, in pixels.
    #[inline]
    pub fn fx(&self) -> f64 {
        self.k.x_axis.x
    }

    /// Focal length along y, in pixels.
    #[inline]
    pub fn fy(&self) -> f64 {
        self.k.y_axis.y
    }

    /// Principal point (cx, cy), in pixels.
    #[inline]
    pub fn principal_point(&self) -> DVec2 {
        DVec2::new(self.k.z_axis.x, self.k.z_axis.y)
    }

    /// Mean of the two focal lengths, used to express pixel thresholds in normalized units.
    #[inline]
    pub fn mean_focal(&self) -> f64 {
        0.5 * (self.fx().abs() + self.fy().abs())
    }

    /// Map a pixel coordinate to normalized image coordinates with `K^-1`.
    pub fn normalize(&self, pixel: DVec2) -> DVec2 {
        let xn = self.k_inv * pixel.extend(1.0);
        DVec2::new(xn.x / xn.z, xn.y / xn.z)
    }

    /// Project a point in the camera frame into pixel coordinates.
    ///
    /// Returns `None` for points on or behind the image plane.
    pub fn project(&self, point: DVec3) -> Option<DVec2> {
        if point.z <= f64::EPSILON {
            return None;
        }
        let uv = self.k * (point / point.z);
        Some(DVec2::new(uv.x, uv.y))
    }
}

impl TryFrom<[f64; 4]> for CalibrationMatrix {
    type Error = CalibrationError;

    fn try_from(value: [f64; 4]) -> Result<Self, Self::Error> {
        Self::new(value[0], value[1], value[2], value[3])
    }
}

impl From<CalibrationMatrix> for [f64; 4] {
    fn from(value: CalibrationMatrix) -> Self {
        let pp = value.principal_point();
        [value.fx(), value.fy(), pp.x, pp.y]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_normalize_project_consistency() -> Result<(), CalibrationError> {
        let k = CalibrationMatrix::new(800.0, 800.0, 320.0, 240.0)?;
        let p = DVec3::new(0.5, -0.25, 4.0);
        let uv = k.project(p).expect("point in front of the camera");
        assert_relative_eq!(uv.x, 420.0, epsilon = 1e-9);
        assert_relative_eq!(uv.y, 190.0, epsilon = 1e-9);

        let xn = k.normalize(uv);
        assert_relative_eq!(xn.x, p.x / p.z, epsilon = 1e-12);
        assert_relative_eq!(xn.y, p.y / p.z, epsilon = 1e-12);
        Ok(())
    }

    #[test]
    fn test_project_behind_camera() -> Result<(), CalibrationError> {
        let k = CalibrationMatrix::new(500.0, 500.0, 0.0, 0.0)?;
        assert!(k.project(DVec3::new(0.0, 0.0, -1.0)).is_none());
        Ok(())
    }

    #[test]
    fn test_invalid_calibration() {
        assert_eq!(
            CalibrationMatrix::new(f64::NAN, 800.0, 320.0, 240.0),
            Err(CalibrationError::NonFinite)
        );
        assert!(matches!(
            CalibrationMatrix::new(0.0, 800.0, 320.0, 240.0),
            Err(CalibrationError::Singular { .. })
        ));
    }

    #[test]
    fn test_deserialize_rejects_singular() {
        let k: Result<CalibrationMatrix, _> = serde_json::from_str("[0.0, 0.0, 1.0, 1.0]");
        assert!(k.is_err());
    }
}
