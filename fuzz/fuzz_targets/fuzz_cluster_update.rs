//! Fuzz target for posterior updates.
//!
//! Arbitrary data, responsibilities, pace and repeat either update the
//! clusters or return an error; a failed update leaves them untouched.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use mixvb_core::{BasePrior, NormalWishartClusters};
use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Debug, Arbitrary)]
struct Input {
    dimension: u8,
    clusters: u8,
    points: Vec<f64>,
    weights: Vec<f64>,
    pace: f64,
    repeat: f64,
    seed_index: u8,
}

fuzz_target!(|input: Input| {
    let d = usize::from(input.dimension % 4) + 1;
    let k = usize::from(input.clusters % 4) + 1;
    let n = input.points.len() / d;
    if n == 0 || input.weights.len() < n * k {
        return;
    }

    let data: Vec<DVector<f64>> = input
        .points
        .chunks_exact(d)
        .map(|c| DVector::from_column_slice(c))
        .collect();
    let r = DMatrix::from_row_slice(n, k, &input.weights[..n * k]);

    let Ok(base) = BasePrior::for_finite(d) else {
        return;
    };
    let mut rng = StdRng::seed_from_u64(u64::from(input.seed_index));
    let Ok(mut clusters) =
        NormalWishartClusters::initialize_for_finite(base, &data, k, None, &mut rng)
    else {
        return;
    };

    let before = clusters.snapshot();
    if clusters
        .move_natural(&data, &r, input.pace, input.repeat)
        .is_err()
    {
        assert_eq!(clusters.snapshot(), before);
    }
    let _ = clusters.log_likelihood_fixed_precision(&data);
    let _ = clusters.predictive_distributions();
});
