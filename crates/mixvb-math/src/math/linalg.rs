//! Dense linear-algebra helpers over `nalgebra` dynamic matrices.
//!
//! Scale matrices in a Normal-Wishart model are symmetric positive-definite,
//! so inversion goes through a Cholesky factorization first and only falls
//! back to LU when the input is not SPD. Results are symmetrized when the
//! input was symmetric so downstream SPD checks see an exactly symmetric
//! matrix.

use nalgebra::{Cholesky, DMatrix, DVector};
use thiserror::Error;

/// Relative tolerance used when deciding whether a matrix is symmetric.
pub const SYMMETRY_TOL: f64 = 1e-9;

/// Errors from matrix factorizations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LinalgError {
    #[error("matrix must be square, got {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },
    #[error("matrix contains non-finite entries")]
    NonFinite,
    #[error("matrix is singular")]
    Singular,
    #[error("matrix is not positive definite")]
    NotPositiveDefinite,
}

/// Invert a square matrix.
///
/// Fails with [`LinalgError::Singular`] when no inverse exists or when the
/// computed inverse is not finite.
pub fn invert(matrix: &DMatrix<f64>) -> Result<DMatrix<f64>, LinalgError> {
    ensure_square(matrix)?;
    if matrix.iter().any(|v| !v.is_finite()) {
        return Err(LinalgError::NonFinite);
    }

    let symmetric = is_symmetric(matrix, SYMMETRY_TOL);
    let inverse = match symmetric.then(|| Cholesky::new(matrix.clone())).flatten() {
        Some(chol) => symmetrize(chol.inverse()),
        None => {
            let inverse = matrix.clone().try_inverse().ok_or(LinalgError::Singular)?;
            if symmetric {
                symmetrize(inverse)
            } else {
                inverse
            }
        }
    };

    if inverse.iter().any(|v| !v.is_finite()) {
        return Err(LinalgError::Singular);
    }
    Ok(inverse)
}

/// Outer product `a bᵀ`.
pub fn outer(a: &DVector<f64>, b: &DVector<f64>) -> DMatrix<f64> {
    a * b.transpose()
}

/// Axis-aligned bounding box as `(min, max)` per dimension.
///
/// Returns None for empty input or points of differing dimension.
pub fn bounding_box(points: &[DVector<f64>]) -> Option<Vec<(f64, f64)>> {
    let first = points.first()?;
    let dimension = first.len();
    let mut bounds: Vec<(f64, f64)> = first.iter().map(|&v| (v, v)).collect();
    for point in &points[1..] {
        if point.len() != dimension {
            return None;
        }
        for (bound, &v) in bounds.iter_mut().zip(point.iter()) {
            bound.0 = bound.0.min(v);
            bound.1 = bound.1.max(v);
        }
    }
    Some(bounds)
}

/// True when the matrix is square, symmetric within `tol` (relative), and
/// admits a Cholesky factorization.
pub fn is_symmetric_positive_definite(matrix: &DMatrix<f64>, tol: f64) -> bool {
    matrix.is_square()
        && matrix.iter().all(|v| v.is_finite())
        && is_symmetric(matrix, tol)
        && Cholesky::new(matrix.clone()).is_some()
}

/// ln|A| for a symmetric positive-definite matrix, via Cholesky.
pub fn ln_det_spd(matrix: &DMatrix<f64>) -> Result<f64, LinalgError> {
    ensure_square(matrix)?;
    let chol = Cholesky::new(matrix.clone()).ok_or(LinalgError::NotPositiveDefinite)?;
    Ok(2.0 * chol.l_dirty().diagonal().iter().map(|d| d.ln()).sum::<f64>())
}

fn ensure_square(matrix: &DMatrix<f64>) -> Result<(), LinalgError> {
    if matrix.is_square() {
        Ok(())
    } else {
        Err(LinalgError::NotSquare {
            rows: matrix.nrows(),
            cols: matrix.ncols(),
        })
    }
}

fn is_symmetric(matrix: &DMatrix<f64>, tol: f64) -> bool {
    let n = matrix.nrows();
    for i in 0..n {
        for j in (i + 1)..n {
            let a = matrix[(i, j)];
            let b = matrix[(j, i)];
            let scale = 1.0f64.max(a.abs()).max(b.abs());
            if (a - b).abs() > tol * scale {
                return false;
            }
        }
    }
    true
}

fn symmetrize(matrix: DMatrix<f64>) -> DMatrix<f64> {
    (&matrix + matrix.transpose()) * 0.5
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq_matrix(a: &DMatrix<f64>, b: &DMatrix<f64>, tol: f64) -> bool {
        a.shape() == b.shape() && a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() <= tol)
    }

    #[test]
    fn invert_identity() {
        let eye = DMatrix::<f64>::identity(3, 3);
        let inv = invert(&eye).unwrap();
        assert!(approx_eq_matrix(&inv, &eye, 1e-14));
    }

    #[test]
    fn invert_spd_matrix() {
        let m = DMatrix::from_row_slice(2, 2, &[4.0, 1.0, 1.0, 3.0]);
        let inv = invert(&m).unwrap();
        let expected = DMatrix::from_row_slice(2, 2, &[3.0, -1.0, -1.0, 4.0]) / 11.0;
        assert!(approx_eq_matrix(&inv, &expected, 1e-12));
        assert_eq!(inv[(0, 1)], inv[(1, 0)]);
    }

    #[test]
    fn invert_falls_back_to_lu_for_indefinite_matrices() {
        let m = DMatrix::from_row_slice(2, 2, &[-2.0, 0.0, 0.0, -4.0]);
        let inv = invert(&m).unwrap();
        let expected = DMatrix::from_row_slice(2, 2, &[-0.5, 0.0, 0.0, -0.25]);
        assert!(approx_eq_matrix(&inv, &expected, 1e-14));
    }

    #[test]
    fn invert_non_symmetric() {
        let m = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 0.0, 1.0]);
        let inv = invert(&m).unwrap();
        let expected = DMatrix::from_row_slice(2, 2, &[1.0, -2.0, 0.0, 1.0]);
        assert!(approx_eq_matrix(&inv, &expected, 1e-14));
    }

    #[test]
    fn invert_singular_fails() {
        let m = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        assert_eq!(invert(&m), Err(LinalgError::Singular));
    }

    #[test]
    fn invert_rejects_non_square_and_non_finite() {
        let rect = DMatrix::<f64>::zeros(2, 3);
        assert_eq!(
            invert(&rect),
            Err(LinalgError::NotSquare { rows: 2, cols: 3 })
        );
        let nan = DMatrix::from_row_slice(1, 1, &[f64::NAN]);
        assert_eq!(invert(&nan), Err(LinalgError::NonFinite));
    }

    #[test]
    fn outer_product_shape_and_values() {
        let a = DVector::from_vec(vec![1.0, 2.0]);
        let b = DVector::from_vec(vec![3.0, 4.0, 5.0]);
        let m = outer(&a, &b);
        assert_eq!(m.shape(), (2, 3));
        assert_eq!(m[(1, 2)], 10.0);
    }

    #[test]
    fn bounding_box_tracks_extremes() {
        let pts = vec![
            DVector::from_vec(vec![1.0, -1.0]),
            DVector::from_vec(vec![-2.0, 5.0]),
            DVector::from_vec(vec![0.5, 0.0]),
        ];
        let bb = bounding_box(&pts).unwrap();
        assert_eq!(bb, vec![(-2.0, 1.0), (-1.0, 5.0)]);
    }

    #[test]
    fn bounding_box_empty_or_ragged_is_none() {
        assert!(bounding_box(&[]).is_none());
        let ragged = vec![DVector::from_vec(vec![1.0]), DVector::from_vec(vec![1.0, 2.0])];
        assert!(bounding_box(&ragged).is_none());
    }

    #[test]
    fn spd_detection() {
        let spd = DMatrix::from_row_slice(2, 2, &[2.0, 0.5, 0.5, 1.0]);
        assert!(is_symmetric_positive_definite(&spd, SYMMETRY_TOL));
        let indefinite = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 1.0]);
        assert!(!is_symmetric_positive_definite(&indefinite, SYMMETRY_TOL));
        let asym = DMatrix::from_row_slice(2, 2, &[2.0, 0.5, 0.0, 1.0]);
        assert!(!is_symmetric_positive_definite(&asym, SYMMETRY_TOL));
    }

    #[test]
    fn ln_det_matches_determinant() {
        let m = DMatrix::from_row_slice(2, 2, &[4.0, 1.0, 1.0, 3.0]);
        let ln_det = ln_det_spd(&m).unwrap();
        assert!((ln_det - 11.0f64.ln()).abs() < 1e-12);
        let indefinite = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 1.0]);
        assert_eq!(
            ln_det_spd(&indefinite),
            Err(LinalgError::NotPositiveDefinite)
        );
    }
}
