//! Similarity normalization of 2D point sets.
//!
//! Linear systems built from raw pixel coordinates are badly conditioned;
//! the standard remedy is to translate the points to zero mean and scale
//! them so the average distance from the origin is `√2`.

use camcal_core::{from_homogeneous, to_homogeneous, Mat3, Pt2, Real};
use thiserror::Error;

/// Average distance from the origin after normalization.
const TARGET_RADIUS: Real = std::f64::consts::SQRT_2;

/// Mean radius below which the scale is considered undefined.
const MIN_SPREAD: Real = 1e-12;

#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum NormalizeError {
    /// No points to normalize.
    #[error("cannot normalize an empty point set")]
    EmptyInput,
    /// A coordinate is NaN or infinite.
    #[error("point set contains non-finite coordinates")]
    NonFiniteInput,
    /// All points coincide; the scale factor is undefined.
    #[error("degenerate point set: all points coincide")]
    DegenerateSpread,
}

/// A similarity transform (uniform scale + translation) and its inverse.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization {
    /// Raw coordinates → normalized frame.
    pub forward: Mat3,
    /// Normalized frame → raw coordinates.
    pub inverse: Mat3,
}

impl Normalization {
    /// Map a raw point into the normalized frame.
    pub fn apply(&self, p: &Pt2) -> Pt2 {
        from_homogeneous(&(self.forward * to_homogeneous(p)))
    }

    /// Map a normalized point back to raw coordinates.
    pub fn apply_inverse(&self, p: &Pt2) -> Pt2 {
        from_homogeneous(&(self.inverse * to_homogeneous(p)))
    }
}

/// Compute the normalizing similarity transform of a point set.
///
/// The transformed points have mean `(0, 0)` and average distance `√2` from
/// the origin.
pub fn normalization_from_points(points: &[Pt2]) -> Result<Normalization, NormalizeError> {
    if points.is_empty() {
        return Err(NormalizeError::EmptyInput);
    }
    if points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
        return Err(NormalizeError::NonFiniteInput);
    }

    let n = points.len() as Real;
    let mut mx = 0.0;
    let mut my = 0.0;
    for p in points {
        mx += p.x;
        my += p.y;
    }
    mx /= n;
    my /= n;

    let mut mean_dist = 0.0;
    for p in points {
        let dx = p.x - mx;
        let dy = p.y - my;
        mean_dist += (dx * dx + dy * dy).sqrt();
    }
    mean_dist /= n;

    if !mean_dist.is_finite() {
        return Err(NormalizeError::NonFiniteInput);
    }
    if mean_dist < MIN_SPREAD {
        return Err(NormalizeError::DegenerateSpread);
    }

    let s = TARGET_RADIUS / mean_dist;
    let forward = Mat3::new(s, 0.0, -s * mx, 0.0, s, -s * my, 0.0, 0.0, 1.0);
    let inverse = Mat3::new(1.0 / s, 0.0, mx, 0.0, 1.0 / s, my, 0.0, 0.0, 1.0);

    Ok(Normalization { forward, inverse })
}

/// Normalize a point set, returning the transformed points and the transform.
pub fn normalize_points(points: &[Pt2]) -> Result<(Vec<Pt2>, Normalization), NormalizeError> {
    let norm = normalization_from_points(points)?;
    let transformed = points.iter().map(|p| norm.apply(p)).collect();
    Ok((transformed, norm))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_points() -> Vec<Pt2> {
        vec![
            Pt2::new(120.0, 80.0),
            Pt2::new(410.0, 95.0),
            Pt2::new(400.0, 300.0),
            Pt2::new(130.0, 310.0),
            Pt2::new(260.0, 200.0),
        ]
    }

    #[test]
    fn normalized_points_are_centered_with_unit_average_radius() {
        let (pts, _) = normalize_points(&sample_points()).unwrap();

        let n = pts.len() as Real;
        let mx: Real = pts.iter().map(|p| p.x).sum::<Real>() / n;
        let my: Real = pts.iter().map(|p| p.y).sum::<Real>() / n;
        let mean_dist: Real = pts.iter().map(|p| (p.x * p.x + p.y * p.y).sqrt()).sum::<Real>() / n;

        assert!(mx.abs() < 1e-12);
        assert!(my.abs() < 1e-12);
        assert!((mean_dist - TARGET_RADIUS).abs() < 1e-12);
    }

    #[test]
    fn inverse_round_trips() {
        let points = sample_points();
        let (pts, norm) = normalize_points(&points).unwrap();
        for (orig, normed) in points.iter().zip(pts.iter()) {
            let back = norm.apply_inverse(normed);
            assert!((back - orig).norm() < 1e-9);
        }
    }

    #[test]
    fn empty_input_is_rejected() {
        assert_eq!(
            normalization_from_points(&[]).unwrap_err(),
            NormalizeError::EmptyInput
        );
    }

    #[test]
    fn non_finite_points_are_rejected() {
        let mut points = sample_points();
        points[1].x = Real::NAN;
        assert_eq!(
            normalization_from_points(&points).unwrap_err(),
            NormalizeError::NonFiniteInput
        );

        let mut points = sample_points();
        points[3].y = Real::INFINITY;
        assert_eq!(
            normalization_from_points(&points).unwrap_err(),
            NormalizeError::NonFiniteInput
        );
    }

    #[test]
    fn coincident_points_are_rejected() {
        let points = vec![Pt2::new(5.0, 5.0); 4];
        assert_eq!(
            normalization_from_points(&points).unwrap_err(),
            NormalizeError::DegenerateSpread
        );
    }
}
