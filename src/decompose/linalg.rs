use super::Decomposition;
use crate::error::{Error, Result, Stage};
use nalgebra::{DMatrix, DVector, SVD};
use ndarray::{Array1, Array2};

// Upper bound on implicit-shift QR sweeps before reporting non-convergence
const MAX_SVD_ITERATIONS: usize = 100_000;

// Off-diagonal convergence threshold. Machine epsilon leaves exactly
// rank-deficient inputs (a static scene is rank one) with wrong factors.
const SVD_EPS: f64 = 1e-12;

// ‖M - U·diag(Σ)·Vᵗ‖ / ‖M‖ above this is reported as degenerate
const MAX_RECONSTRUCTION_ERROR: f64 = 1e-8;

pub(crate) fn to_dmatrix(a: &Array2<f64>) -> DMatrix<f64> {
    DMatrix::from_fn(a.nrows(), a.ncols(), |i, j| a[[i, j]])
}

pub(crate) fn to_array(m: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn((m.nrows(), m.ncols()), |(i, j)| m[(i, j)])
}

/// Economy SVD with singular values in descending order
pub(crate) fn thin_svd(m: DMatrix<f64>, stage: Stage) -> Result<Decomposition> {
    let (rows, cols) = m.shape();
    let original = m.clone();
    let svd = SVD::try_new(m, true, true, SVD_EPS, MAX_SVD_ITERATIONS).ok_or_else(|| {
        Error::degenerate(
            stage,
            format!("SVD of {rows}x{cols} matrix did not converge"),
        )
    })?;

    let u = svd
        .u
        .as_ref()
        .ok_or_else(|| Error::degenerate(stage, "left singular vectors missing"))?;
    let v_t = svd
        .v_t
        .as_ref()
        .ok_or_else(|| Error::degenerate(stage, "right singular vectors missing"))?;
    check_reconstruction(&original, u, &svd.singular_values, v_t, stage)?;

    let singular_values = Array1::from_iter(svd.singular_values.iter().copied());

    Decomposition::new(to_array(u), singular_values, to_array(v_t), stage)
}

fn check_reconstruction(
    original: &DMatrix<f64>,
    u: &DMatrix<f64>,
    singular_values: &DVector<f64>,
    v_t: &DMatrix<f64>,
    stage: Stage,
) -> Result<()> {
    let mut scaled = u.clone();
    for (mut column, sigma) in scaled.column_iter_mut().zip(singular_values.iter()) {
        column *= *sigma;
    }
    let residual = (original - scaled * v_t).norm();
    let norm = original.norm();
    let error = if norm == 0.0 { residual } else { residual / norm };

    if !(error <= MAX_RECONSTRUCTION_ERROR) {
        return Err(Error::degenerate(
            stage,
            format!(
                "SVD of {}x{} matrix reconstructs with relative error {error:.3e}",
                original.nrows(),
                original.ncols()
            ),
        ));
    }
    Ok(())
}
