use glam::{DMat3, DVec2, DVec3};

use super::PoseEstimationError;
use crate::linalg::{null_vector, svd3};

/// Number of correspondences used by the minimal linear solver.
pub const ESSENTIAL_SAMPLE_SIZE: usize = 8;

/// Relative threshold on the singular values below which the linear system is rank deficient.
const RANK_TOLERANCE: f64 = 1e-10;

/// Estimate an essential matrix with the normalized 8-point algorithm.
///
/// - `x1`: normalized image coordinates in the current view.
/// - `x2`: normalized image coordinates in the previous view (same length, >= 8).
///
/// The returned matrix satisfies `x2^T * E * x1 = 0` and has singular values `(1, 1, 0)`.
pub fn essential_8point(x1: &[DVec2], x2: &[DVec2]) -> Result<DMat3, PoseEstimationError> {
    if x1.len() != x2.len() || x1.len() < ESSENTIAL_SAMPLE_SIZE {
        return Err(PoseEstimationError::TooFewCorrespondences {
            required: ESSENTIAL_SAMPLE_SIZE,
            actual: x1.len().min(x2.len()),
        });
    }

    // condition the points with similarity transforms T1, T2
    let (x1n, t1) = normalize_points_2d(x1);
    let (x2n, t2) = normalize_points_2d(x2);

    // build design matrix A (N x 9) for x2^T * E * x1 = 0
    let n = x1n.len();
    let mut a = faer::Mat::<f64>::zeros(n, 9);
    for i in 0..n {
        let (x, y) = (x1n[i].x, x1n[i].y);
        let (xp, yp) = (x2n[i].x, x2n[i].y);
        let row = [xp * x, xp * y, xp, yp * x, yp * y, yp, x, y, 1.0];
        for (j, v) in row.iter().enumerate() {
            a.write(i, j, *v);
        }
    }

    let (e, condition) = null_vector(&a);
    if condition < RANK_TOLERANCE || e.iter().any(|v| !v.is_finite()) {
        return Err(PoseEstimationError::IllConditioned);
    }

    // e is row major
    let e_norm = DMat3::from_cols(
        DVec3::new(e[0], e[3], e[6]),
        DVec3::new(e[1], e[4], e[7]),
        DVec3::new(e[2], e[5], e[8]),
    );

    // undo the conditioning: E = T2^T * E' * T1
    let e_denorm = t2.transpose() * e_norm * t1;
    Ok(enforce_essential_constraints(&e_denorm))
}

/// Enforce the (1, 1, 0) singular value constraint on an essential matrix.
pub fn enforce_essential_constraints(e: &DMat3) -> DMat3 {
    let svd = svd3(e);
    svd.u * DMat3::from_diagonal(DVec3::new(1.0, 1.0, 0.0)) * svd.v.transpose()
}

/// Decompose an essential matrix into its four candidate `(R, t)` solutions.
///
/// Every rotation is proper (`det(R) = +1`) and every translation has unit norm. Exactly one
/// candidate places the observed points in front of both cameras.
pub fn decompose_essential(e: &DMat3) -> [(DMat3, DVec3); 4] {
    let svd = svd3(e);
    let mut u = svd.u;
    let mut v = svd.v;

    // the third singular value is zero, flipping the last column leaves E unchanged
    if u.determinant() < 0.0 {
        u.z_axis = -u.z_axis;
    }
    if v.determinant() < 0.0 {
        v.z_axis = -v.z_axis;
    }

    let w = DMat3::from_cols(
        DVec3::new(0.0, 1.0, 0.0),
        DVec3::new(-1.0, 0.0, 0.0),
        DVec3::new(0.0, 0.0, 1.0),
    );

    let r1 = u * w * v.transpose();
    let r2 = u * w.transpose() * v.transpose();
    let t = u.z_axis.normalize();

    [(r1, t), (r1, -t), (r2, t), (r2, -t)]
}

/// Squared Sampson distance of a correspondence to the epipolar constraint `x2^T * E * x1 = 0`.
///
/// The distance is expressed in the units of the input coordinates.
pub fn sampson_distance(e: &DMat3, x1: &DVec2, x2: &DVec2) -> f64 {
    let x1h = x1.extend(1.0);
    let x2h = x2.extend(1.0);
    let ex1 = *e * x1h;
    let etx2 = e.transpose() * x2h;
    let x2tex1 = x2h.dot(ex1);
    let denom = ex1.x * ex1.x + ex1.y * ex1.y + etx2.x * etx2.x + etx2.y * etx2.y;
    if denom <= f64::EPSILON {
        return f64::INFINITY;
    }
    x2tex1 * x2tex1 / denom
}

/// Translate and scale points to zero mean and an average distance of sqrt(2) to the origin.
fn normalize_points_2d(x: &[DVec2]) -> (Vec<DVec2>, DMat3) {
    let n = x.len() as f64;
    let mean = x.iter().copied().sum::<DVec2>() / n;
    let mean_dist = x.iter().map(|p| p.distance(mean)).sum::<f64>() / n;
    let scale = if mean_dist > 0.0 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };

    let xn = x.iter().map(|p| (*p - mean) * scale).collect();

    // similarity transform T = [[s, 0, -s*mx], [0, s, -s*my], [0, 0, 1]]
    let t = DMat3::from_cols(
        DVec3::new(scale, 0.0, 0.0),
        DVec3::new(0.0, scale, 0.0),
        DVec3::new(-scale * mean.x, -scale * mean.y, 1.0),
    );
    (xn, t)
}
