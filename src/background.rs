use crate::decompose::Decomposition;
use crate::error::{Error, Result, Stage};
use ndarray::{s, Array1, Array2, ArrayView1};

/// Rank-r reconstruction U[:, :r]·diag(Σ[:r])·Vᵗ[:r, :] of a decomposition
///
/// The reconstruction is the static background; the residual against the
/// original matrix is the moving foreground.
#[derive(Debug, Clone)]
pub struct Background {
    matrix: Array2<f64>,
    rank: usize,
}

impl Background {
    pub fn reconstruct(decomposition: &Decomposition, rank: usize) -> Result<Self> {
        let _span = tracing::debug_span!("background", rank).entered();

        let k = decomposition.rank();
        if rank == 0 || rank > k {
            return Err(Error::invalid(
                Stage::Background,
                format!("truncation rank {rank} outside [1, {k}]"),
            ));
        }

        let u = decomposition.u().slice(s![.., ..rank]);
        let sigma = decomposition.singular_values().slice(s![..rank]);
        let vt = decomposition.vt().slice(s![..rank, ..]);
        let matrix = (&u * &sigma).dot(&vt);

        Ok(Self { matrix, rank })
    }

    pub fn matrix(&self) -> &Array2<f64> {
        &self.matrix
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn frames(&self) -> usize {
        self.matrix.ncols()
    }

    /// Background column of frame `t`
    pub fn frame(&self, t: usize) -> Result<ArrayView1<'_, f64>> {
        self.check_frame(t)?;
        Ok(self.matrix.column(t))
    }

    /// Residual A[:, t] - background[:, t]
    pub fn foreground(&self, a: &Array2<f64>, t: usize) -> Result<Array1<f64>> {
        self.check_shape(a)?;
        self.check_frame(t)?;
        Ok(&a.column(t) - &self.matrix.column(t))
    }

    /// Frobenius-norm error ‖A - background‖ / ‖A‖
    pub fn relative_error(&self, a: &Array2<f64>) -> Result<f64> {
        self.check_shape(a)?;
        Ok(relative_error(a, &self.matrix))
    }

    fn check_shape(&self, a: &Array2<f64>) -> Result<()> {
        if a.dim() != self.matrix.dim() {
            return Err(Error::invalid(
                Stage::Background,
                format!(
                    "matrix shape {:?} differs from background shape {:?}",
                    a.dim(),
                    self.matrix.dim()
                ),
            ));
        }
        Ok(())
    }

    fn check_frame(&self, t: usize) -> Result<()> {
        if t >= self.frames() {
            return Err(Error::invalid(
                Stage::Background,
                format!("frame index {t} outside [0, {})", self.frames()),
            ));
        }
        Ok(())
    }
}

/// ‖a - b‖ / ‖a‖ in the Frobenius norm; the absolute error when a is zero
pub fn relative_error(a: &Array2<f64>, b: &Array2<f64>) -> f64 {
    let diff = frobenius(&(a - b));
    let norm = frobenius(a);
    if norm == 0.0 {
        diff
    } else {
        diff / norm
    }
}

fn frobenius(m: &Array2<f64>) -> f64 {
    m.iter().map(|v| v * v).sum::<f64>().sqrt()
}
