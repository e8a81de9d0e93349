use super::linalg::{thin_svd, to_array, to_dmatrix};
use super::{check_input, Algorithm, Decomposer, Decomposition};
use crate::error::{Error, Result, Stage};
use nalgebra::DMatrix;
use ndarray::Array2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Randomized truncated SVD via a single random range projection
///
/// Steps, for A of shape (p, f) and target rank k:
/// 1. Draw P (f, k) with entries uniform on [0, 1)
/// 2. Y = A·P
/// 3. Q = orthonormal basis of Y (thin QR)
/// 4. B = Qᵗ·A, a (k, f) matrix
/// 5. B = Uy·Σ·Vᵗ (small dense SVD)
/// 6. U = Q·Uy
///
/// There is no oversampling and no power iteration, so accuracy drops when
/// the spectrum of A decays slowly past k. Use `ExactSvd` when that matters.
pub struct RandomizedSvd<R = ChaCha8Rng> {
    rank: usize,
    rng: R,
}

impl RandomizedSvd<ChaCha8Rng> {
    /// Reproducible projections from a fixed seed
    pub fn seeded(rank: usize, seed: u64) -> Self {
        Self::new(rank, ChaCha8Rng::seed_from_u64(seed))
    }

    pub fn from_entropy(rank: usize) -> Self {
        Self::new(rank, ChaCha8Rng::from_entropy())
    }
}

impl<R: Rng> RandomizedSvd<R> {
    pub fn new(rank: usize, rng: R) -> Self {
        Self { rank, rng }
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    fn check_rank(&self, pixels: usize, frames: usize) -> Result<()> {
        let k = self.rank;
        if k == 0 || k > frames {
            return Err(Error::invalid(
                Stage::RandomizedSvd,
                format!("target rank {k} outside [1, {frames}]"),
            ));
        }
        if k > pixels {
            return Err(Error::invalid(
                Stage::RandomizedSvd,
                format!("target rank {k} exceeds {pixels} pixels"),
            ));
        }
        Ok(())
    }
}

impl<R: Rng> Decomposer for RandomizedSvd<R> {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Randomized
    }

    fn decompose(&mut self, a: &Array2<f64>) -> Result<Decomposition> {
        let _span = tracing::debug_span!("randomized_svd", rank = self.rank).entered();
        check_input(a, Stage::RandomizedSvd)?;

        let (pixels, frames) = a.dim();
        self.check_rank(pixels, frames)?;
        let k = self.rank;

        let rng = &mut self.rng;
        let projection = DMatrix::from_fn(frames, k, |_, _| rng.gen::<f64>());

        let a = to_dmatrix(a);
        let y = &a * &projection;
        let q = y.qr().q();
        let b = q.transpose() * &a;

        let (uy, singular_values, vt) = thin_svd(b, Stage::RandomizedSvd)?.into_parts();
        let u = to_array(&q).dot(&uy);

        tracing::debug!(
            "Projected {}x{} onto {} components",
            pixels,
            frames,
            singular_values.len()
        );

        Decomposition::new(u, singular_values, vt, Stage::RandomizedSvd)
    }
}
