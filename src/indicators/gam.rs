//! Penalized B-spline regression with a single smooth term, the linear
//! (identity link, gaussian) special case of a generalized additive model.

use crate::indicators::bspline::BSplineBasis;
use crate::indicators::linalg::{cholesky_solve, SymMatrix};

pub const DEFAULT_LAM: f64 = 0.6;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SmoothError {
    #[error("nothing to fit")]
    Empty,
    #[error("{x} explanatory values but {y} targets")]
    LengthMismatch { x: usize, y: usize },
    #[error("{points} points cannot support {n_splines} basis functions")]
    TooFewPoints { points: usize, n_splines: usize },
    #[error("{n_splines} splines are too few for order {spline_order}")]
    BasisTooSmall {
        n_splines: usize,
        spline_order: usize,
    },
    #[error("input contains NaN or infinite values")]
    NonFinite,
    #[error("normal equations are not positive definite")]
    Singular,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplineGam {
    pub n_splines: usize,
    pub spline_order: usize,
    pub lam: f64,
}

#[derive(Debug, Clone)]
pub struct FittedGam {
    basis: BSplineBasis,
    coef: Vec<f64>,
}

impl SplineGam {
    pub fn new(spline_order: usize, n_splines: usize) -> Self {
        Self {
            n_splines,
            spline_order,
            lam: DEFAULT_LAM,
        }
    }

    /// Minimizes `|y - Bb|^2 + lam * |D2 b|^2 + eps * |b|^2` where `B` is the
    /// basis matrix and `D2` the second-difference operator on coefficients.
    pub fn fit(&self, x: &[f64], y: &[f64]) -> Result<FittedGam, SmoothError> {
        if x.len() != y.len() {
            return Err(SmoothError::LengthMismatch {
                x: x.len(),
                y: y.len(),
            });
        }
        if x.is_empty() {
            return Err(SmoothError::Empty);
        }
        if x.len() < self.n_splines {
            return Err(SmoothError::TooFewPoints {
                points: x.len(),
                n_splines: self.n_splines,
            });
        }
        if x.iter().chain(y).any(|v| !v.is_finite()) || !self.lam.is_finite() {
            return Err(SmoothError::NonFinite);
        }

        let (lo, hi) = x
            .iter()
            .fold((f64::MAX, f64::MIN), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
        let basis = BSplineBasis::new(lo, hi, self.n_splines, self.spline_order)?;

        let n = basis.n_splines();
        let mut gram = SymMatrix::zeros(n);
        let mut rhs = vec![0.0; n];
        for (xi, yi) in x.iter().zip(y) {
            let (start, values) = basis.nonzero(*xi);
            for (a, va) in values.iter().enumerate() {
                rhs[start + a] += va * yi;
                for (b, vb) in values.iter().enumerate() {
                    gram.add(start + a, start + b, va * vb);
                }
            }
        }

        let lam = self.lam.max(0.0);
        for r in 0..n.saturating_sub(2) {
            let d = [(r, 1.0), (r + 1, -2.0), (r + 2, 1.0)];
            for (i, di) in d {
                for (j, dj) in d {
                    gram.add(i, j, lam * di * dj);
                }
            }
        }

        let ridge = f64::EPSILON.sqrt();
        for i in 0..n {
            gram.add(i, i, ridge);
        }

        let coef = cholesky_solve(&gram, &rhs).ok_or(SmoothError::Singular)?;
        if coef.iter().any(|c| !c.is_finite()) {
            return Err(SmoothError::Singular);
        }

        Ok(FittedGam { basis, coef })
    }
}

impl FittedGam {
    pub fn predict_one(&self, x: f64) -> f64 {
        self.basis
            .evaluate(x)
            .iter()
            .zip(&self.coef)
            .map(|(b, c)| b * c)
            .sum()
    }

    pub fn predict(&self, x: &[f64]) -> Vec<f64> {
        x.iter().map(|xi| self.predict_one(*xi)).collect()
    }
}

/// Fits `values` against their row index `0..n` and returns the fitted curve
/// evaluated at every index.
pub fn calculate_gam(
    values: &[f64],
    spline_order: usize,
    n_splines: usize,
) -> Result<Vec<f64>, SmoothError> {
    let x: Vec<f64> = (0..values.len()).map(|i| i as f64).collect();
    let fitted = SplineGam::new(spline_order, n_splines).fit(&x, values)?;
    Ok(fitted.predict(&x))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_length_matches_input() {
        let values: Vec<f64> = (0..100).map(|i| (i as f64 * 0.1).sin()).collect();
        for n_splines in [20, 50] {
            let fitted = calculate_gam(&values, 5, n_splines).unwrap();
            assert_eq!(fitted.len(), values.len());
        }
    }

    #[test]
    fn constant_series_gives_flat_curve() {
        let values = vec![142.37; 100];
        for n_splines in [20, 50] {
            let fitted = calculate_gam(&values, 5, n_splines).unwrap();
            for v in fitted {
                assert!((v - 142.37).abs() < 1e-4, "got {v}");
            }
        }
    }

    #[test]
    fn linear_trend_is_reproduced() {
        let values: Vec<f64> = (0..100).map(|i| 3.0 + 0.25 * i as f64).collect();
        let fitted = calculate_gam(&values, 5, 20).unwrap();
        for (f, v) in fitted.iter().zip(&values) {
            assert!((f - v).abs() < 1e-3, "{f} vs {v}");
        }
    }

    #[test]
    fn alternating_noise_is_smoothed_out() {
        let values: Vec<f64> = (0..100)
            .map(|i| if i % 2 == 0 { 11.0 } else { 9.0 })
            .collect();
        let fitted = calculate_gam(&values, 5, 20).unwrap();
        for v in &fitted[10..90] {
            assert!((v - 10.0).abs() < 0.5, "got {v}");
        }
    }

    #[test]
    fn higher_penalty_is_smoother() {
        let x: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| (v * 0.3).sin() * 5.0).collect();
        let roughness = |curve: &[f64]| -> f64 {
            curve
                .windows(3)
                .map(|w| (w[0] - 2.0 * w[1] + w[2]).powi(2))
                .sum()
        };
        let loose = SplineGam {
            lam: 0.01,
            ..SplineGam::new(5, 50)
        }
        .fit(&x, &y).unwrap();
        let stiff = SplineGam {
            lam: 1e6,
            ..SplineGam::new(5, 50)
        }
        .fit(&x, &y).unwrap();
        assert!(roughness(&stiff.predict(&x)) < roughness(&loose.predict(&x)));
    }

    #[test]
    fn rejects_fewer_points_than_splines() {
        let values = vec![1.0; 10];
        assert_eq!(
            calculate_gam(&values, 5, 20),
            Err(SmoothError::TooFewPoints {
                points: 10,
                n_splines: 20
            })
        );
    }

    #[test]
    fn rejects_empty_and_non_finite_input() {
        assert_eq!(calculate_gam(&[], 5, 20), Err(SmoothError::Empty));
        let mut values = vec![1.0; 30];
        values[7] = f64::NAN;
        assert_eq!(calculate_gam(&values, 5, 20), Err(SmoothError::NonFinite));
    }

    #[test]
    fn rejects_mismatched_columns() {
        let err = SplineGam::new(3, 4).fit(&[0.0, 1.0], &[1.0]).unwrap_err();
        assert_eq!(err, SmoothError::LengthMismatch { x: 2, y: 1 });
    }
}
