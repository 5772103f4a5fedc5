/// Squared Euclidean distance between two equal-length vectors.
#[inline]
pub(crate) fn squared_euclidean(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

#[inline]
pub(crate) fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    squared_euclidean(a, b).sqrt()
}

/// Index and squared distance of the centroid nearest to `point`.
///
/// `centroids` is a flat `k * dim` buffer. Ties go to the lowest cluster id.
#[inline]
pub(crate) fn nearest_centroid(point: &[f64], centroids: &[f64], dim: usize) -> (usize, f64) {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (j, centroid) in centroids.chunks_exact(dim).enumerate() {
        let d = squared_euclidean(point, centroid);
        if d < best_dist {
            best_dist = d;
            best = j;
        }
    }
    (best, best_dist)
}
