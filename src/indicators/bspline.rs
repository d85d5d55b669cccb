//! Uniform B-spline basis over a closed interval.
//!
//! `n_splines` basis functions of degree `spline_order` are laid on
//! `n_splines - spline_order` equal segments, with `spline_order` extra knots
//! on each side so every function has full support shape.

use crate::indicators::SmoothError;

#[derive(Debug, Clone, PartialEq)]
pub struct BSplineBasis {
    lo: f64,
    scale: f64,
    n_splines: usize,
    spline_order: usize,
    knots: Vec<f64>,
}

impl BSplineBasis {
    pub fn new(lo: f64, hi: f64, n_splines: usize, spline_order: usize) -> Result<Self, SmoothError> {
        if n_splines < spline_order + 1 {
            return Err(SmoothError::BasisTooSmall {
                n_splines,
                spline_order,
            });
        }
        if !lo.is_finite() || !hi.is_finite() {
            return Err(SmoothError::NonFinite);
        }

        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        let scale = if hi > lo { hi - lo } else { 1.0 };

        let segments = n_splines - spline_order;
        let step = 1.0 / segments as f64;
        let knots = (0..=(n_splines + spline_order))
            .map(|j| (j as f64 - spline_order as f64) * step)
            .collect();

        Ok(Self {
            lo,
            scale,
            n_splines,
            spline_order,
            knots,
        })
    }

    pub fn n_splines(&self) -> usize {
        self.n_splines
    }

    fn segments(&self) -> usize {
        self.n_splines - self.spline_order
    }

    /// Returns the index of the first non-zero basis function at `x` and the
    /// `spline_order + 1` values starting there. Points outside the domain are
    /// clamped onto it.
    pub fn nonzero(&self, x: f64) -> (usize, Vec<f64>) {
        let p = self.spline_order;
        let u = ((x - self.lo) / self.scale).clamp(0.0, 1.0);
        let segments = self.segments();
        let k = ((u * segments as f64).floor() as usize).min(segments - 1);
        let span = k + p;

        let mut values = vec![0.0; p + 1];
        let mut left = vec![0.0; p + 1];
        let mut right = vec![0.0; p + 1];
        values[0] = 1.0;
        for j in 1..=p {
            left[j] = u - self.knots[span + 1 - j];
            right[j] = self.knots[span + j] - u;
            let mut saved = 0.0;
            for r in 0..j {
                let temp = values[r] / (right[r + 1] + left[j - r]);
                values[r] = saved + right[r + 1] * temp;
                saved = left[j - r] * temp;
            }
            values[j] = saved;
        }

        (k, values)
    }

    /// Dense row of all `n_splines` basis values at `x`.
    pub fn evaluate(&self, x: f64) -> Vec<f64> {
        let mut row = vec![0.0; self.n_splines];
        let (start, values) = self.nonzero(x);
        row[start..start + values.len()].copy_from_slice(&values);
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_of_unity_inside_domain() {
        let basis = BSplineBasis::new(0.0, 99.0, 20, 5).unwrap();
        for i in 0..100 {
            let row = basis.evaluate(i as f64);
            let sum: f64 = row.iter().sum();
            assert!((sum - 1.0).abs() < 1e-10, "sum {sum} at {i}");
            assert!(row.iter().all(|v| *v >= -1e-12));
        }
    }

    #[test]
    fn right_endpoint_is_inclusive() {
        let basis = BSplineBasis::new(0.0, 10.0, 8, 3).unwrap();
        let row = basis.evaluate(10.0);
        assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(row[7] > 0.0);
    }

    #[test]
    fn local_support_has_order_plus_one_terms() {
        let basis = BSplineBasis::new(0.0, 1.0, 50, 5).unwrap();
        let (start, values) = basis.nonzero(0.5);
        assert_eq!(values.len(), 6);
        assert!(start + values.len() <= basis.n_splines());
    }

    #[test]
    fn degree_zero_is_indicator() {
        let basis = BSplineBasis::new(0.0, 4.0, 4, 0).unwrap();
        assert_eq!(basis.evaluate(0.5), vec![1.0, 0.0, 0.0, 0.0]);
        assert_eq!(basis.evaluate(2.5), vec![0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn degenerate_span_does_not_divide_by_zero() {
        let basis = BSplineBasis::new(3.0, 3.0, 6, 2).unwrap();
        let row = basis.evaluate(3.0);
        assert!(row.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn too_few_splines_for_order() {
        assert!(matches!(
            BSplineBasis::new(0.0, 1.0, 5, 5),
            Err(SmoothError::BasisTooSmall { .. })
        ));
    }
}
