use glam::{DMat3, DVec3};

/// Singular value decomposition of a 3x3 matrix, `m = u * diag(s) * v^T`.
///
/// Singular values are sorted in decreasing order.
#[derive(Clone, Copy, Debug)]
pub struct Svd3 {
    /// Left singular vectors (columns).
    pub u: DMat3,
    /// Singular values, `s.x >= s.y >= s.z`.
    pub s: DVec3,
    /// Right singular vectors (columns).
    pub v: DMat3,
}

/// Build a matrix from its rows.
///
/// glam matrices are column major, this keeps the literals readable.
pub fn mat3_from_rows(rows: [[f64; 3]; 3]) -> DMat3 {
    DMat3::from_cols(
        DVec3::new(rows[0][0], rows[1][0], rows[2][0]),
        DVec3::new(rows[0][1], rows[1][1], rows[2][1]),
        DVec3::new(rows[0][2], rows[1][2], rows[2][2]),
    )
}

/// Build a matrix from a row-major 9-vector, as returned by the linear solvers.
pub fn mat3_from_row_slice(h: &[f64]) -> DMat3 {
    mat3_from_rows([[h[0], h[1], h[2]], [h[3], h[4], h[5]], [h[6], h[7], h[8]]])
}

/// Cross-product matrix `[v]x` such that `[v]x * w = v x w`.
pub fn skew(v: DVec3) -> DMat3 {
    mat3_from_rows([[0.0, -v.z, v.y], [v.z, 0.0, -v.x], [-v.y, v.x, 0.0]])
}

/// Frobenius norm of a 3x3 matrix.
pub fn frobenius_norm(m: &DMat3) -> f64 {
    m.to_cols_array().iter().map(|x| x * x).sum::<f64>().sqrt()
}

fn to_faer_mat33(m: &DMat3) -> faer::Mat<f64> {
    faer::Mat::from_fn(3, 3, |i, j| m.col(j)[i])
}

fn from_faer_mat33(m: faer::MatRef<'_, f64>, order: &[usize; 3]) -> DMat3 {
    DMat3::from_cols(
        DVec3::new(m.read(0, order[0]), m.read(1, order[0]), m.read(2, order[0])),
        DVec3::new(m.read(0, order[1]), m.read(1, order[1]), m.read(2, order[1])),
        DVec3::new(m.read(0, order[2]), m.read(1, order[2]), m.read(2, order[2])),
    )
}

/// Compute the SVD of a 3x3 matrix with faer.
pub fn svd3(m: &DMat3) -> Svd3 {
    let svd = to_faer_mat33(m).svd();
    let s = svd.s_diagonal();

    let mut order = [0usize, 1, 2];
    order.sort_by(|&a, &b| s.read(b).total_cmp(&s.read(a)));

    Svd3 {
        u: from_faer_mat33(svd.u(), &order),
        s: DVec3::new(s.read(order[0]), s.read(order[1]), s.read(order[2])),
        v: from_faer_mat33(svd.v(), &order),
    }
}

/// Solve the homogeneous system `A x = 0` in the least-squares sense under `|x| = 1`.
///
/// Returns the right singular vector associated with the smallest singular value.
pub fn solve_homogeneous(a: &faer::Mat<f64>) -> Vec<f64> {
    let svd = a.svd();
    let v = svd.v();
    let s = svd.s_diagonal();

    // wide systems: the trailing columns of V span the null space
    let col = if v.ncols() > s.nrows() {
        v.ncols() - 1
    } else {
        (0..s.nrows())
            .min_by(|&a, &b| s.read(a).total_cmp(&s.read(b)))
            .unwrap_or(v.ncols() - 1)
    };

    (0..v.nrows()).map(|i| v.read(i, col)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_svd3_reconstruct() {
        let m = mat3_from_rows([[0.1, 0.2, -0.3], [0.4, -0.1, 0.2], [-0.2, 0.5, 0.3]]);
        let svd = svd3(&m);
        assert!(svd.s.x >= svd.s.y && svd.s.y >= svd.s.z);

        let rec = svd.u * DMat3::from_diagonal(svd.s) * svd.v.transpose();
        let (a, b) = (rec.to_cols_array(), m.to_cols_array());
        for i in 0..9 {
            assert_relative_eq!(a[i], b[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_skew_matches_cross() {
        let v = DVec3::new(1.0, -2.0, 3.0);
        let w = DVec3::new(0.5, 0.25, -1.0);
        let lhs = skew(v) * w;
        let rhs = v.cross(w);
        assert_relative_eq!(lhs.x, rhs.x);
        assert_relative_eq!(lhs.y, rhs.y);
        assert_relative_eq!(lhs.z, rhs.z);
    }

    #[test]
    fn test_solve_homogeneous_wide() {
        // x + y - z = 0 and x - y = 0 -> (1, 1, 2) / |.|
        let mut a = faer::Mat::<f64>::zeros(2, 3);
        a.write(0, 0, 1.0);
        a.write(0, 1, 1.0);
        a.write(0, 2, -1.0);
        a.write(1, 0, 1.0);
        a.write(1, 1, -1.0);
        let x = solve_homogeneous(&a);
        let scale = x[2] / 2.0;
        assert_relative_eq!(x[0] / scale, 1.0, epsilon = 1e-10);
        assert_relative_eq!(x[1] / scale, 1.0, epsilon = 1e-10);
    }
}
