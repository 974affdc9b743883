//! Similarity functions for the in-process index.
//!
//! All scores follow the "higher is better" convention used by the gateway.

use crate::config::DistanceKind;

pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

pub fn magnitude(v: &[f32]) -> f32 {
    dot(v, v).sqrt()
}

/// Cosine similarity in `[-1, 1]`; 0 when either vector is all zeros.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let (ma, mb) = (magnitude(a), magnitude(b));
    if ma == 0.0 || mb == 0.0 {
        return 0.0;
    }
    dot(a, b) / (ma * mb)
}

pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

/// Maps a distance in `[0, inf)` to a similarity in `(0, 1]`.
pub fn distance_to_similarity(d: f32) -> f32 {
    1.0 / (1.0 + d)
}

/// Similarity of `a` and `b` under `metric`.
pub fn score(metric: DistanceKind, a: &[f32], b: &[f32]) -> f32 {
    match metric {
        DistanceKind::Cosine => cosine_similarity(a, b),
        DistanceKind::Dot => dot(a, b),
        DistanceKind::Euclid => distance_to_similarity(euclidean_distance(a, b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_vectors_score_highest() {
        let a = [0.3, 0.4, 0.0];
        assert!((score(DistanceKind::Cosine, &a, &a) - 1.0).abs() < 1e-6);
        assert!((score(DistanceKind::Euclid, &a, &a) - 1.0).abs() < 1e-6);
        assert!((score(DistanceKind::Dot, &a, &a) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn zero_vector_has_zero_cosine() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn euclid_similarity_decreases_with_distance() {
        let o = [0.0, 0.0];
        let near = score(DistanceKind::Euclid, &o, &[1.0, 0.0]);
        let far = score(DistanceKind::Euclid, &o, &[3.0, 4.0]);
        assert!((near - 0.5).abs() < 1e-6);
        assert!((far - 1.0 / 6.0).abs() < 1e-6);
        assert!(near > far);
    }
}
