use glam::{DMat3, DVec3};

/// Singular value decomposition `M = U * diag(s) * V^T` of a 3x3 matrix.
///
/// Singular values are sorted in non-increasing order.
#[derive(Debug, Clone, Copy)]
pub struct Svd3 {
    /// Left singular vectors as columns.
    pub u: DMat3,
    /// Singular values.
    pub s: DVec3,
    /// Right singular vectors as columns.
    pub v: DMat3,
}

/// Compute the SVD of a 3x3 matrix in double precision.
pub fn svd3(m: &DMat3) -> Svd3 {
    let a = dmat3_to_faer(m);
    let svd = a.svd();
    let s = svd.s_diagonal();
    Svd3 {
        u: faer_to_dmat3(svd.u()),
        s: DVec3::new(s.read(0), s.read(1), s.read(2)),
        v: faer_to_dmat3(svd.v()),
    }
}

/// Right singular vector associated with the smallest singular value of `a`.
///
/// Also returns the ratio between the smallest and the largest singular value of the
/// system, which is zero when `a` has a null space of dimension greater than one.
pub fn null_vector(a: &faer::Mat<f64>) -> (Vec<f64>, f64) {
    let svd = a.svd();
    let v = svd.v();
    let s = svd.s_diagonal();
    let last = v.ncols() - 1;
    let x = (0..v.nrows()).map(|i| v.read(i, last)).collect::<Vec<_>>();

    // for underdetermined systems the trailing singular values are implicitly zero
    let rank_probe = (a.ncols() - 2).min(s.nrows() - 1);
    let largest = s.read(0);
    let condition = if largest > 0.0 {
        s.read(rank_probe) / largest
    } else {
        0.0
    };
    (x, condition)
}

/// Skew-symmetric matrix `[t]_x` such that `[t]_x * v = t x v`.
pub fn skew(t: DVec3) -> DMat3 {
    DMat3::from_cols(
        DVec3::new(0.0, t.z, -t.y),
        DVec3::new(-t.z, 0.0, t.x),
        DVec3::new(t.y, -t.x, 0.0),
    )
}

/// Check that a matrix is a proper rotation: `R^T R = I` and `det(R) = +1` within `eps`.
pub fn is_rotation(r: &DMat3, eps: f64) -> bool {
    let rtr = r.transpose() * *r;
    rtr.abs_diff_eq(DMat3::IDENTITY, eps) && (r.determinant() - 1.0).abs() < eps
}

/// Transform a set of points using a rotation and translation: `dst = R * src + t`.
///
/// PRECONDITION: dst_points has the same length as src_points.
pub fn transform_points(
    src_points: &[DVec3],
    dst_r_src: &DMat3,
    dst_t_src: &DVec3,
    dst_points: &mut [DVec3],
) {
    assert_eq!(src_points.len(), dst_points.len());
    for (src, dst) in src_points.iter().zip(dst_points.iter_mut()) {
        *dst = *dst_r_src * *src + *dst_t_src;
    }
}

pub(crate) fn dmat3_to_faer(m: &DMat3) -> faer::Mat<f64> {
    faer::Mat::from_fn(3, 3, |i, j| m.col(j)[i])
}

pub(crate) fn faer_to_dmat3(m: faer::MatRef<'_, f64>) -> DMat3 {
    DMat3::from_cols(
        DVec3::new(m.read(0, 0), m.read(1, 0), m.read(2, 0)),
        DVec3::new(m.read(0, 1), m.read(1, 1), m.read(2, 1)),
        DVec3::new(m.read(0, 2), m.read(1, 2), m.read(2, 2)),
    )
}
