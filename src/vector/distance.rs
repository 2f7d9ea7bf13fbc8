//! Distance kernels. Every metric is exposed as a distance where lower is
//! closer; dot product is negated internally and flipped back for reporting.

use crate::vector::config::DistanceMetric;

impl DistanceMetric {
    /// Traversal distance, lower = closer
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceMetric::Cosine => cosine_distance(a, b),
            DistanceMetric::Euclidean => euclidean_sq(a, b).sqrt(),
            DistanceMetric::DotProduct => -dot_product(a, b),
            DistanceMetric::Manhattan => manhattan(a, b),
        }
    }

    /// The score reported to callers: the metric's natural value
    pub fn score(&self, distance: f32) -> f32 {
        match self {
            DistanceMetric::DotProduct => -distance,
            _ => distance,
        }
    }

    /// Whether larger reported scores mean closer
    pub fn higher_is_closer(&self) -> bool {
        matches!(self, DistanceMetric::DotProduct)
    }
}

pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    // f64 accumulation keeps long vectors stable
    a.iter().zip(b).map(|(x, y)| *x as f64 * *y as f64).sum::<f64>() as f32
}

pub fn euclidean_sq(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = *x as f64 - *y as f64;
            d * d
        })
        .sum::<f64>() as f32
}

pub fn manhattan(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (*x as f64 - *y as f64).abs()).sum::<f64>() as f32
}

pub fn norm(a: &[f32]) -> f32 {
    a.iter().map(|x| *x as f64 * *x as f64).sum::<f64>().sqrt() as f32
}

/// 1 - cos(a, b); a zero vector is orthogonal to everything
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let denom = norm(a) * norm(b);
    if denom == 0.0 {
        return 1.0;
    }
    let cos = (dot_product(a, b) / denom).clamp(-1.0, 1.0);
    1.0 - cos
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_values() {
        let a = [1.0, 0.0];
        let b = [0.0, 2.0];
        assert!((DistanceMetric::Cosine.distance(&a, &b) - 1.0).abs() < 1e-6);
        assert!((DistanceMetric::Euclidean.distance(&a, &b) - 5f32.sqrt()).abs() < 1e-6);
        assert!((DistanceMetric::Manhattan.distance(&a, &b) - 3.0).abs() < 1e-6);
        assert_eq!(DistanceMetric::DotProduct.distance(&[1.0, 2.0], &[3.0, 4.0]), -11.0);
        assert_eq!(DistanceMetric::DotProduct.score(-11.0), 11.0);
    }

    #[test]
    fn cosine_ignores_magnitude() {
        let d = cosine_distance(&[1.0, 1.0], &[5.0, 5.0]);
        assert!(d.abs() < 1e-6);
        assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]), 1.0);
    }
}
