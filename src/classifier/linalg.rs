use nalgebra::{Cholesky, DMatrix, DVector, SymmetricEigen};
use ndarray::{Array1, Array2, ArrayView2, Axis};
/// Pivots below `scale * PIVOT_TOLERANCE` mark a covariance as singular.
const PIVOT_TOLERANCE: f64 = 1e-12;
/// Subtracts the column means.
pub fn center_columns(x: ArrayView2<f64>) -> Array2<f64> {
    let mut centered = x.to_owned();
    if let Some(means) = x.mean_axis(Axis(0)) {
        centered -= &means;
    }
    centered
}
/// Sample cross-covariance `a^T b / (n - 1)` of column-centered matrices.
pub fn cross_covariance(a: &Array2<f64>, b: &Array2<f64>) -> DMatrix<f64> {
    let n = a.nrows().max(2) as f64;
    to_matrix(&(a.t().dot(b) / (n - 1.0)))
}
pub fn to_matrix(a: &Array2<f64>) -> DMatrix<f64> {
    DMatrix::from_fn(a.nrows(), a.ncols(), |i, j| a[[i, j]])
}
pub fn to_array(v: &DVector<f64>) -> Array1<f64> {
    v.iter().copied().collect()
}
/// Lower Cholesky factor `L` with `a = L L^T`.
///
/// `None` when `a` is not numerically positive definite (for a covariance
/// matrix: a flat or linearly dependent channel) or holds non-finite values.
pub fn cholesky(a: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    if a.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let scale = a.diagonal().iter().fold(0.0f64, |acc, v| acc.max(v.abs()));
    if scale <= 0.0 {
        return None;
    }
    let l = Cholesky::new(a.clone())?.unpack();
    let tolerance = scale * PIVOT_TOLERANCE;
    if l.diagonal().iter().any(|d| d * d <= tolerance) {
        return None;
    }
    Some(l)
}
/// Largest eigenvalue of a symmetric matrix with its unit eigenvector.
pub fn leading_eigenpair(a: DMatrix<f64>) -> (f64, DVector<f64>) {
    let eigen = SymmetricEigen::new(a);
    let mut lead = 0;
    for (i, &value) in eigen.eigenvalues.iter().enumerate() {
        if value > eigen.eigenvalues[lead] {
            lead = i;
        }
    }
    (
        eigen.eigenvalues[lead],
        eigen.eigenvectors.column(lead).into_owned(),
    )
}
