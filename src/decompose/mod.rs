mod exact;
mod linalg;
mod randomized;

pub use exact::ExactSvd;
pub use randomized::RandomizedSvd;

use crate::error::{Error, Result, Stage};
use ndarray::{Array1, Array2};

/// Factorization algorithm, always chosen explicitly by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    Exact,
    Randomized,
}

impl Algorithm {
    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::Exact => "standard SVD",
            Algorithm::Randomized => "randomized SVD",
        }
    }

    /// File stem used for exported artifacts
    pub fn file_stem(&self) -> &'static str {
        match self {
            Algorithm::Exact => "exact_svd",
            Algorithm::Randomized => "randomized_svd",
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            Algorithm::Exact => Stage::ExactSvd,
            Algorithm::Randomized => Stage::RandomizedSvd,
        }
    }
}

/// Factors (U, Σ, Vᵗ) with U·diag(Σ)·Vᵗ ≈ A
///
/// U is (pixels, k), Σ has length k in descending order, Vᵗ is (k, frames).
#[derive(Debug, Clone)]
pub struct Decomposition {
    u: Array2<f64>,
    singular_values: Array1<f64>,
    vt: Array2<f64>,
}

impl Decomposition {
    pub fn new(
        u: Array2<f64>,
        singular_values: Array1<f64>,
        vt: Array2<f64>,
        stage: Stage,
    ) -> Result<Self> {
        let k = singular_values.len();
        if u.ncols() != k || vt.nrows() != k {
            return Err(Error::invalid(
                stage,
                format!(
                    "factor shapes {:?}, {}, {:?} disagree on rank",
                    u.dim(),
                    k,
                    vt.dim()
                ),
            ));
        }
        if singular_values.iter().any(|s| !s.is_finite()) {
            return Err(Error::degenerate(stage, "non-finite singular value"));
        }
        Ok(Self {
            u,
            singular_values,
            vt,
        })
    }

    pub fn u(&self) -> &Array2<f64> {
        &self.u
    }

    pub fn singular_values(&self) -> &Array1<f64> {
        &self.singular_values
    }

    pub fn vt(&self) -> &Array2<f64> {
        &self.vt
    }

    /// Number of components k
    pub fn rank(&self) -> usize {
        self.singular_values.len()
    }

    /// Shape (pixels, frames) of the approximated matrix
    pub fn shape(&self) -> (usize, usize) {
        (self.u.nrows(), self.vt.ncols())
    }

    pub fn into_parts(self) -> (Array2<f64>, Array1<f64>, Array2<f64>) {
        (self.u, self.singular_values, self.vt)
    }
}

/// Trait for low-rank factorization strategies
/// Both strategies share the input/output contract and differ in accuracy/speed
pub trait Decomposer {
    fn algorithm(&self) -> Algorithm;

    fn decompose(&mut self, a: &Array2<f64>) -> Result<Decomposition>;
}

/// Reject empty or non-finite input before handing it to the factorization
fn check_input(a: &Array2<f64>, stage: Stage) -> Result<()> {
    if a.is_empty() {
        return Err(Error::invalid(
            stage,
            format!("cannot factor an empty {:?} matrix", a.dim()),
        ));
    }
    if a.iter().any(|v| !v.is_finite()) {
        return Err(Error::invalid(stage, "matrix contains non-finite entries"));
    }
    Ok(())
}
