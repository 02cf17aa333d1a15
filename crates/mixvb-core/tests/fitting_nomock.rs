//! No-mock fitting tests.
//!
//! Drives the engine the way a variational caller would:
//! - Gaussian samples drawn with `rand_distr`
//! - Expectation step computed from `log_likelihood_fixed_precision`
//! - Center files and configs written to real temp files

use mixvb_core::{
    BasePrior, CenterSource, MixtureConfig, MixtureError, ModelKind, NormalWishartClusters,
};
use mixvb_math::log_sum_exp;
use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use std::fs;
use tempfile::TempDir;

// ============================================================================
// Helpers
// ============================================================================

/// `per_cluster` unit-variance points around each of `means`, interleaved.
fn two_blobs(per_cluster: usize, seed: u64) -> (Vec<DVector<f64>>, Vec<usize>) {
    let means = [[0.0, 0.0], [10.0, 10.0]];
    let noise = Normal::new(0.0, 1.0).unwrap();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = Vec::with_capacity(2 * per_cluster);
    let mut labels = Vec::with_capacity(2 * per_cluster);
    for _ in 0..per_cluster {
        for (label, mean) in means.iter().enumerate() {
            data.push(DVector::from_vec(vec![
                mean[0] + noise.sample(&mut rng),
                mean[1] + noise.sample(&mut rng),
            ]));
            labels.push(label);
        }
    }
    (data, labels)
}

fn hard_responsibilities(labels: &[usize], k: usize) -> DMatrix<f64> {
    let mut r = DMatrix::zeros(labels.len(), k);
    for (n, &label) in labels.iter().enumerate() {
        r[(n, label)] = 1.0;
    }
    r
}

/// Softmax of `log_likelihood + expected_log_precision` per row.
fn expectation_step(clusters: &NormalWishartClusters, data: &[DVector<f64>]) -> DMatrix<f64> {
    let mut r = clusters.log_likelihood_fixed_precision(data).unwrap();
    let elp = clusters.expected_log_precision().unwrap();
    for mut row in r.row_iter_mut() {
        for (v, e) in row.iter_mut().zip(&elp) {
            *v += e;
        }
        let norm = log_sum_exp(row.iter());
        row.apply(|v| *v = (*v - norm).exp());
    }
    r
}

fn nearest(locations: &[DVector<f64>], target: &DVector<f64>) -> usize {
    let mut best = 0;
    for (k, loc) in locations.iter().enumerate() {
        if (loc - target).norm() < (&locations[best] - target).norm() {
            best = k;
        }
    }
    best
}

// ============================================================================
// Fitting
// ============================================================================

#[test]
fn labelled_update_recovers_means_and_covariances() {
    let (data, labels) = two_blobs(400, 1);
    let base = BasePrior::for_finite(2).unwrap();
    let mut rng = StdRng::seed_from_u64(3);
    let mut clusters =
        NormalWishartClusters::initialize_for_finite(base, &data, 2, None, &mut rng).unwrap();
    clusters
        .update(&data, &hard_responsibilities(&labels, 2))
        .unwrap();

    let locations = clusters.map_locations();
    assert!((&locations[0] - DVector::from_vec(vec![0.0, 0.0])).norm() < 0.3);
    assert!((&locations[1] - DVector::from_vec(vec![10.0, 10.0])).norm() < 0.3);

    for cov in clusters.map_covariances().unwrap() {
        assert!((cov[(0, 0)] - 1.0).abs() < 0.25, "cov = {cov}");
        assert!((cov[(1, 1)] - 1.0).abs() < 0.25, "cov = {cov}");
        assert!(cov[(0, 1)].abs() < 0.2, "cov = {cov}");
    }
}

#[test]
fn single_cluster_predictive_tracks_sample_mean() {
    let noise = Normal::new(0.0, 2.0).unwrap();
    let mut rng = StdRng::seed_from_u64(31);
    let data: Vec<DVector<f64>> = (0..2_000)
        .map(|_| DVector::from_fn(3, |i, _| 5.0 - i as f64 + noise.sample(&mut rng)))
        .collect();
    let sample_mean = data.iter().fold(DVector::zeros(3), |acc, x| acc + x) / data.len() as f64;

    let base = BasePrior::for_finite(3).unwrap();
    let mut clusters =
        NormalWishartClusters::initialize_for_finite(base, &data, 1, None, &mut rng).unwrap();
    clusters
        .update(&data, &DMatrix::from_element(data.len(), 1, 1.0))
        .unwrap();

    let predictive = clusters.predictive_distributions().unwrap();
    assert!((predictive[0].location() - &sample_mean).amax() < 1e-3);
    // Predictive covariance ≈ 4·I.
    let cov = predictive[0].covariance().unwrap();
    for i in 0..3 {
        assert!((cov[(i, i)] - 4.0).abs() < 0.5, "cov = {cov}");
    }
}

#[test]
fn predictive_density_prefers_own_cluster() {
    let (data, labels) = two_blobs(300, 2);
    let base = BasePrior::for_finite(2).unwrap();
    let mut rng = StdRng::seed_from_u64(5);
    let mut clusters =
        NormalWishartClusters::initialize_for_finite(base, &data, 2, None, &mut rng).unwrap();
    clusters
        .update(&data, &hard_responsibilities(&labels, 2))
        .unwrap();

    let predictive = clusters.predictive_distributions().unwrap();
    let origin = DVector::from_vec(vec![0.2, -0.1]);
    let far = DVector::from_vec(vec![9.8, 10.3]);
    assert!(predictive[0].log_density(&origin) > predictive[1].log_density(&origin));
    assert!(predictive[1].log_density(&far) > predictive[0].log_density(&far));

    // Heavy tails close to Gaussian with this much data.
    assert!(predictive[0].dof() > 290.0);
    let density = predictive[0].density(&DVector::from_vec(vec![0.0, 0.0]));
    let gaussian_peak = 1.0 / (2.0 * std::f64::consts::PI);
    assert!((density - gaussian_peak).abs() < 0.03, "density = {density}");
}

#[test]
fn variational_loop_separates_blobs() {
    let (data, _) = two_blobs(200, 3);
    let base = BasePrior::for_finite(2).unwrap();
    let mut rng = StdRng::seed_from_u64(8);
    let mut clusters =
        NormalWishartClusters::initialize_for_finite(base, &data, 2, None, &mut rng).unwrap();

    for _ in 0..10 {
        let r = expectation_step(&clusters, &data);
        clusters.update(&data, &r).unwrap();
    }

    let locations = clusters.map_locations();
    let a = nearest(locations, &DVector::from_vec(vec![0.0, 0.0]));
    let b = nearest(locations, &DVector::from_vec(vec![10.0, 10.0]));
    assert_ne!(a, b);
    assert!(locations[a].norm() < 0.4);
    assert!((&locations[b] - DVector::from_vec(vec![10.0, 10.0])).norm() < 0.4);
}

#[test]
fn streaming_batches_converge_like_batch() {
    let (data, labels) = two_blobs(500, 4);
    let base = BasePrior::for_finite(2).unwrap();
    let mut rng = StdRng::seed_from_u64(9);
    let initial =
        NormalWishartClusters::initialize_for_finite(base, &data, 2, None, &mut rng).unwrap();

    let mut batch = initial.clone();
    batch
        .update(&data, &hard_responsibilities(&labels, 2))
        .unwrap();

    let mut streamed = initial;
    let batch_size = 100;
    let repeat = data.len() as f64 / batch_size as f64;
    for epoch in 0..3 {
        for (chunk, chunk_labels) in data.chunks(batch_size).zip(labels.chunks(batch_size)) {
            let pace = 1.0 / (epoch as f64 + 2.0);
            streamed
                .move_natural(chunk, &hard_responsibilities(chunk_labels, 2), pace, repeat)
                .unwrap();
        }
    }

    for k in 0..2 {
        let gap = (&streamed.locations()[k] - &batch.locations()[k]).norm();
        assert!(gap < 0.4, "cluster {k} drifted {gap}");
        let rel = streamed.degrees_of_freedom()[k] / batch.degrees_of_freedom()[k];
        assert!((rel - 1.0).abs() < 0.2, "cluster {k} dof ratio {rel}");
    }
}

#[test]
fn unbounded_model_fits_with_spare_clusters() {
    let (data, labels) = two_blobs(150, 6);
    let base = BasePrior::for_unbounded(&data).unwrap();
    let mut rng = StdRng::seed_from_u64(10);
    let mut clusters =
        NormalWishartClusters::initialize_for_unbounded(base, &data, 4, &mut rng).unwrap();

    // Two clusters take the data; the other two fall back to the prior.
    let mut r = DMatrix::zeros(data.len(), 4);
    for (n, &label) in labels.iter().enumerate() {
        r[(n, label)] = 1.0;
    }
    clusters.update(&data, &r).unwrap();

    let base = clusters.base();
    for k in 2..4 {
        assert!((&clusters.locations()[k] - base.location()).amax() < 1e-9);
        assert!((clusters.precision_scales()[k] - base.precision_scale()).abs() < 1e-15);
        assert!((clusters.degrees_of_freedom()[k] - (base.degrees_of_freedom() + 1.0)).abs() < 1e-12);
    }
    assert!(clusters.predictive_distributions().is_ok());
}

// ============================================================================
// Center files
// ============================================================================

#[test]
fn center_file_sets_initial_locations() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("centers.json");
    fs::write(&path, "[[1.5, -2.0], [3.0, 4.0], [9.0, 9.0]]").unwrap();

    let (data, _) = two_blobs(20, 11);
    let base = BasePrior::for_finite(2).unwrap();
    let mut rng = StdRng::seed_from_u64(0);
    let clusters =
        NormalWishartClusters::initialize_for_finite(base, &data, 2, Some(&path), &mut rng)
            .unwrap();

    assert_eq!(clusters.locations()[0], DVector::from_vec(vec![1.5, -2.0]));
    assert_eq!(clusters.locations()[1], DVector::from_vec(vec![3.0, 4.0]));
    assert_eq!(clusters.center_source(), &CenterSource::File(path));
}

#[test]
fn zero_clusters_are_rejected_even_with_a_center_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("centers.json");
    fs::write(&path, "[[0.0, 0.0]]").unwrap();

    let (data, _) = two_blobs(10, 13);
    let base = BasePrior::for_finite(2).unwrap();
    let mut rng = StdRng::seed_from_u64(0);
    let err = NormalWishartClusters::initialize_for_finite(base, &data, 0, Some(&path), &mut rng)
        .unwrap_err();
    assert!(matches!(err, MixtureError::InvalidInput { field: "k", .. }));

    let base = BasePrior::for_unbounded(&data).unwrap();
    let err = NormalWishartClusters::initialize_for_unbounded(base, &data, 0, &mut rng).unwrap_err();
    assert!(matches!(err, MixtureError::InvalidInput { field: "k", .. }));
}

#[test]
fn missing_center_file_falls_back_to_seeding() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.json");

    let (data, _) = two_blobs(20, 12);
    let base = BasePrior::for_finite(2).unwrap();
    let mut rng = StdRng::seed_from_u64(0);
    let clusters =
        NormalWishartClusters::initialize_for_finite(base, &data, 2, Some(&path), &mut rng)
            .unwrap();

    assert!(clusters.center_source().used_fallback());
    for loc in clusters.locations() {
        assert!(data.contains(loc));
    }
}

#[test]
fn malformed_center_file_is_reported() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("centers.json");
    fs::write(&path, "[[1.0, 2.0], [oops]]").unwrap();

    let (data, _) = two_blobs(10, 13);
    let base = BasePrior::for_finite(2).unwrap();
    let mut rng = StdRng::seed_from_u64(0);
    let err = NormalWishartClusters::initialize_for_finite(base, &data, 2, Some(&path), &mut rng)
        .unwrap_err();
    assert!(matches!(err, MixtureError::CenterFileParse { .. }));
    assert_eq!(err.code(), 32);
}

// ============================================================================
// Config
// ============================================================================

#[test]
fn config_file_drives_initialization_and_streaming() {
    let dir = TempDir::new().unwrap();
    let centers = dir.path().join("centers.json");
    fs::write(&centers, "[[0.0, 0.0], [10.0, 10.0]]").unwrap();
    let config_path = dir.path().join("mixvb.json");
    let config_json = serde_json::json!({
        "schema_version": "1.0.0",
        "model": "finite",
        "clusters": 2,
        "seed": 21,
        "centers_file": &centers,
        "streaming": { "pace": 0.5, "repeat": 2.0 }
    });
    fs::write(&config_path, config_json.to_string()).unwrap();

    let config = MixtureConfig::from_file(&config_path).unwrap();
    assert_eq!(config.model, ModelKind::Finite);

    let (data, labels) = two_blobs(50, 14);
    let mut clusters = config.initialize(&data).unwrap();
    assert_eq!(clusters.center_source(), &CenterSource::File(centers));

    let half = data.len() / 2;
    config
        .streaming
        .step(
            &mut clusters,
            &data[..half],
            &hard_responsibilities(&labels[..half], 2),
        )
        .unwrap();
    // β moves halfway from 0.1 toward 0.1 + 2·25.
    assert!((clusters.precision_scales()[0] - (0.1 + 25.0)).abs() < 1e-9);

    let snapshot = serde_json::to_string(&clusters.snapshot()).unwrap();
    assert!(snapshot.contains("\"degrees_of_freedom\""));
}
