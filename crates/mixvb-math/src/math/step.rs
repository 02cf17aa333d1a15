//! Paced interpolation toward a target value.
//!
//! `step(old, target, pace) = old·(1 − pace) + target·pace`. A pace of 1
//! returns the target, a pace of 0 returns the old value. Matrices and vectors
//! interpolate element-wise.

use nalgebra::{DMatrix, DVector};

/// Values that can move a fraction of the way toward a target.
pub trait Step: Sized {
    fn step(&self, target: &Self, pace: f64) -> Self;
}

impl Step for f64 {
    fn step(&self, target: &Self, pace: f64) -> Self {
        self * (1.0 - pace) + target * pace
    }
}

impl Step for DVector<f64> {
    fn step(&self, target: &Self, pace: f64) -> Self {
        self * (1.0 - pace) + target * pace
    }
}

impl Step for DMatrix<f64> {
    fn step(&self, target: &Self, pace: f64) -> Self {
        self * (1.0 - pace) + target * pace
    }
}

/// Free-function form of [`Step::step`].
pub fn step<T: Step>(old: &T, target: &T, pace: f64) -> T {
    old.step(target, pace)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_endpoints() {
        assert_eq!(step(&2.0, &10.0, 0.0), 2.0);
        assert_eq!(step(&2.0, &10.0, 1.0), 10.0);
        assert_eq!(step(&2.0, &10.0, 0.25), 4.0);
    }

    #[test]
    fn vector_moves_elementwise() {
        let old = DVector::from_vec(vec![0.0, 4.0]);
        let target = DVector::from_vec(vec![2.0, 0.0]);
        let mid = step(&old, &target, 0.5);
        assert_eq!(mid, DVector::from_vec(vec![1.0, 2.0]));
    }

    #[test]
    fn matrix_moves_elementwise() {
        let old = DMatrix::<f64>::identity(2, 2);
        let target = DMatrix::from_element(2, 2, 3.0);
        let moved = old.step(&target, 0.5);
        assert_eq!(moved, DMatrix::from_row_slice(2, 2, &[2.0, 1.5, 1.5, 2.0]));
    }
}
