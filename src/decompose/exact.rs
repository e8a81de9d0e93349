use super::linalg::{thin_svd, to_dmatrix};
use super::{check_input, Algorithm, Decomposer, Decomposition};
use crate::error::{Result, Stage};
use ndarray::Array2;

/// Full economy SVD: k = min(pixels, frames)
///
/// Reference factorization for accuracy comparisons.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactSvd;

impl ExactSvd {
    pub fn new() -> Self {
        Self
    }
}

impl Decomposer for ExactSvd {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Exact
    }

    fn decompose(&mut self, a: &Array2<f64>) -> Result<Decomposition> {
        let _span = tracing::debug_span!("exact_svd").entered();
        check_input(a, Stage::ExactSvd)?;

        thin_svd(to_dmatrix(a), Stage::ExactSvd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decompose::test_util::{random_matrix, reconstruct, relative_error};
    use approx::assert_relative_eq;
    use ndarray::Array1;

    #[test]
    fn economy_shapes_for_tall_matrix() {
        let a = random_matrix(30, 8, 1);
        let d = ExactSvd.decompose(&a).unwrap();
        assert_eq!(d.u().dim(), (30, 8));
        assert_eq!(d.singular_values().len(), 8);
        assert_eq!(d.vt().dim(), (8, 8));
    }

    #[test]
    fn economy_shapes_for_wide_matrix() {
        let a = random_matrix(5, 12, 2);
        let d = ExactSvd.decompose(&a).unwrap();
        assert_eq!(d.u().dim(), (5, 5));
        assert_eq!(d.vt().dim(), (5, 12));
        assert_eq!(d.shape(), (5, 12));
    }

    #[test]
    fn singular_values_descending_and_non_negative() {
        let a = random_matrix(20, 15, 3);
        let d = ExactSvd.decompose(&a).unwrap();
        let s = d.singular_values();
        assert!(s.iter().all(|v| *v >= 0.0));
        assert!(s.windows(2).into_iter().all(|w| w[0] >= w[1]));
    }

    #[test]
    fn reconstruction_round_trip() {
        let a = random_matrix(40, 12, 4).mapv(|v| v.abs() * 255.0);
        let d = ExactSvd.decompose(&a).unwrap();
        assert!(relative_error(&a, &reconstruct(&d)) < 1e-6);
    }

    #[test]
    fn deterministic_singular_values() {
        let a = random_matrix(16, 9, 5);
        let first = ExactSvd.decompose(&a).unwrap();
        let second = ExactSvd.decompose(&a).unwrap();
        assert_eq!(first.singular_values(), second.singular_values());
    }

    #[test]
    fn constant_background_is_rank_one() {
        let column = Array1::linspace(10.0, 200.0, 24);
        let a = Array2::from_shape_fn((24, 6), |(i, _)| column[i]);
        let d = ExactSvd.decompose(&a).unwrap();
        let s = d.singular_values();

        let norm = column.dot(&column).sqrt() * (6.0f64).sqrt();
        assert_relative_eq!(s[0], norm, max_relative = 1e-10);
        assert!(s.iter().skip(1).all(|v| *v < 1e-8 * norm));
    }

    #[test]
    fn nan_input_is_rejected() {
        let mut a = random_matrix(4, 4, 6);
        a[[0, 0]] = f64::INFINITY;
        assert!(ExactSvd.decompose(&a).is_err());
    }
}
