//! Initial cluster centers.
//!
//! Two sources:
//! - Farthest-point (Gonzalez) traversal: a random first point, then
//!   repeatedly the point farthest from every center chosen so far.
//! - A JSON center file: an array of at least K arrays of D numbers.
//!
//! A missing center file is recovered by falling back to the farthest-point
//! traversal; the fallback is recorded in [`CenterSource`].

use nalgebra::DVector;
use rand::Rng;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{MixtureError, Result};

/// Where the initial cluster centers came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", content = "path", rename_all = "snake_case")]
pub enum CenterSource {
    /// Farthest-point traversal over the data.
    FarthestPoint,
    /// Loaded from a center file.
    File(PathBuf),
    /// The center file did not exist; farthest-point traversal was used.
    FallbackAfterMissingFile(PathBuf),
}

impl CenterSource {
    pub fn used_fallback(&self) -> bool {
        matches!(self, CenterSource::FallbackAfterMissingFile(_))
    }
}

/// Pick `k` centers by farthest-point traversal.
///
/// Ties go to the lowest index. With more clusters than distinct points the
/// traversal keeps returning points at distance zero, so centers repeat.
pub fn farthest_point_centers<R: Rng + ?Sized>(
    data: &[DVector<f64>],
    k: usize,
    rng: &mut R,
) -> Result<Vec<DVector<f64>>> {
    if k == 0 {
        return Err(MixtureError::invalid("k", "at least one cluster is required"));
    }
    if data.is_empty() {
        return Err(MixtureError::invalid("data", "no data points"));
    }

    let first = rng.random_range(0..data.len());
    let mut centers = Vec::with_capacity(k);
    centers.push(data[first].clone());

    let mut nearest: Vec<f64> = data
        .iter()
        .map(|x| (x - &data[first]).norm_squared())
        .collect();

    while centers.len() < k {
        let (next, _) = nearest
            .iter()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |best, (i, &d)| {
                if d > best.1 {
                    (i, d)
                } else {
                    best
                }
            });
        let center = data[next].clone();
        for (dist, x) in nearest.iter_mut().zip(data) {
            *dist = dist.min((x - &center).norm_squared());
        }
        centers.push(center);
    }

    Ok(centers)
}

/// Read `k` centers of dimension `dimension` from a JSON file.
///
/// A missing file yields [`MixtureError::MissingResource`]; other read
/// failures and malformed content are reported as such.
pub fn load_centers(path: &Path, k: usize, dimension: usize) -> Result<Vec<DVector<f64>>> {
    let contents = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(MixtureError::MissingResource {
                path: path.to_path_buf(),
            })
        }
        Err(source) => {
            return Err(MixtureError::CenterFileIo {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    parse_centers(path, &contents, k, dimension)
}

/// Parse center-file content. `path` is only used for error context.
pub fn parse_centers(
    path: &Path,
    contents: &[u8],
    k: usize,
    dimension: usize,
) -> Result<Vec<DVector<f64>>> {
    let rows: Vec<Vec<f64>> =
        serde_json::from_slice(contents).map_err(|source| MixtureError::CenterFileParse {
            path: path.to_path_buf(),
            source,
        })?;

    if rows.len() < k {
        return Err(MixtureError::invalid(
            "centers",
            format!("{} lists {} centers, need {k}", path.display(), rows.len()),
        ));
    }
    rows.into_iter()
        .take(k)
        .enumerate()
        .map(|(i, row)| {
            if row.len() != dimension {
                return Err(MixtureError::invalid(
                    "centers",
                    format!(
                        "center {i} has dimension {}, expected {dimension}",
                        row.len()
                    ),
                ));
            }
            if row.iter().any(|v| !v.is_finite()) {
                return Err(MixtureError::invalid(
                    "centers",
                    format!("center {i} has non-finite coordinates"),
                ));
            }
            Ok(DVector::from_vec(row))
        })
        .collect()
}

/// Seed centers from `centers_file` when given, otherwise by farthest-point
/// traversal. A missing file falls back to the traversal.
pub(crate) fn seed_centers<R: Rng + ?Sized>(
    data: &[DVector<f64>],
    k: usize,
    dimension: usize,
    centers_file: Option<&Path>,
    rng: &mut R,
) -> Result<(Vec<DVector<f64>>, CenterSource)> {
    if k == 0 {
        return Err(MixtureError::invalid("k", "at least one cluster is required"));
    }
    let Some(path) = centers_file else {
        let centers = farthest_point_centers(data, k, rng)?;
        return Ok((centers, CenterSource::FarthestPoint));
    };

    match load_centers(path, k, dimension) {
        Ok(centers) => {
            debug!(path = %path.display(), k, "loaded cluster centers from file");
            Ok((centers, CenterSource::File(path.to_path_buf())))
        }
        Err(MixtureError::MissingResource { path }) => {
            warn!(
                path = %path.display(),
                "center file not found; seeding with farthest-point traversal"
            );
            let centers = farthest_point_centers(data, k, rng)?;
            Ok((centers, CenterSource::FallbackAfterMissingFile(path)))
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn line(points: &[f64]) -> Vec<DVector<f64>> {
        points.iter().map(|&x| DVector::from_vec(vec![x])).collect()
    }

    #[test]
    fn farthest_point_spreads_centers() {
        let data = line(&[0.0, 0.1, 0.2, 5.0, 10.0]);
        let mut rng = StdRng::seed_from_u64(7);
        let centers = farthest_point_centers(&data, 3, &mut rng).unwrap();
        assert_eq!(centers.len(), 3);
        let mut xs: Vec<f64> = centers.iter().map(|c| c[0]).collect();
        xs.sort_by(|a, b| a.partial_cmp(b).unwrap());
        // Whatever the first pick, the extremes and the middle are covered.
        assert!(xs[0] <= 0.2);
        assert!((xs[2] - 10.0).abs() < 1e-12);
        assert!(xs[1] >= 0.0 && xs[1] <= 5.0);
    }

    #[test]
    fn farthest_point_is_deterministic_for_a_seed() {
        let data = line(&[3.0, -1.0, 8.0, 2.5, 4.0, 7.5]);
        let a = farthest_point_centers(&data, 4, &mut StdRng::seed_from_u64(11)).unwrap();
        let b = farthest_point_centers(&data, 4, &mut StdRng::seed_from_u64(11)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn farthest_point_allows_more_clusters_than_points() {
        let data = line(&[1.0, 2.0]);
        let centers = farthest_point_centers(&data, 4, &mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(centers.len(), 4);
    }

    #[test]
    fn farthest_point_rejects_empty_inputs() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(farthest_point_centers(&[], 2, &mut rng).is_err());
        assert!(farthest_point_centers(&line(&[1.0]), 0, &mut rng).is_err());
    }

    #[test]
    fn parse_centers_takes_first_k() {
        let json = br#"[[0.0, 1.0], [2.0, 3.0], [4.0, 5.0]]"#;
        let centers = parse_centers(Path::new("c.json"), json, 2, 2).unwrap();
        assert_eq!(centers.len(), 2);
        assert_eq!(centers[1], DVector::from_vec(vec![2.0, 3.0]));
    }

    #[test]
    fn parse_centers_rejects_short_or_wrong_dimension() {
        let json = br#"[[0.0, 1.0]]"#;
        assert!(matches!(
            parse_centers(Path::new("c.json"), json, 2, 2),
            Err(MixtureError::InvalidInput { field: "centers", .. })
        ));
        let json = br#"[[0.0, 1.0, 2.0], [1.0, 1.0, 1.0]]"#;
        assert!(parse_centers(Path::new("c.json"), json, 2, 2).is_err());
        assert!(matches!(
            parse_centers(Path::new("c.json"), b"not json", 1, 2),
            Err(MixtureError::CenterFileParse { .. })
        ));
    }

    #[test]
    fn missing_file_is_a_missing_resource() {
        let err = load_centers(Path::new("/nonexistent/centers.json"), 2, 2).unwrap_err();
        assert!(matches!(err, MixtureError::MissingResource { .. }));
    }

    #[test]
    fn seed_centers_falls_back_when_file_missing() {
        let data = line(&[0.0, 1.0, 2.0]);
        let missing = Path::new("/nonexistent/centers.json");
        let (centers, source) =
            seed_centers(&data, 2, 1, Some(missing), &mut StdRng::seed_from_u64(3)).unwrap();
        assert_eq!(centers.len(), 2);
        assert!(source.used_fallback());
        assert_eq!(
            source,
            CenterSource::FallbackAfterMissingFile(missing.to_path_buf())
        );
    }

    #[test]
    fn seed_centers_rejects_zero_clusters_with_a_center_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("centers.json");
        std::fs::write(&path, "[[0.0, 0.0]]").unwrap();
        let data = vec![DVector::from_vec(vec![1.0, 2.0])];
        let err = seed_centers(&data, 0, 2, Some(&path), &mut StdRng::seed_from_u64(5)).unwrap_err();
        assert!(matches!(err, MixtureError::InvalidInput { field: "k", .. }));
    }
}
