use serde::{Deserialize, Serialize};

use crate::math::{Real, Vec2};

/// Two-term radial lens distortion acting on normalized camera coordinates.
///
/// `x' = x (1 + k1 r² + k2 r⁴)`, same for `y`, with `r² = x² + y²`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RadialDistortion {
    /// First radial coefficient.
    pub k1: Real,
    /// Second radial coefficient.
    pub k2: Real,
}

impl RadialDistortion {
    /// Zero distortion (identity mapping).
    pub fn zero() -> Self {
        Self::default()
    }

    /// Apply the radial model to a normalized camera-space point.
    pub fn distort(&self, n: &Vec2) -> Vec2 {
        let r2 = n.x * n.x + n.y * n.y;
        let f = 1.0 + self.k1 * r2 + self.k2 * r2 * r2;
        Vec2::new(n.x * f, n.y * f)
    }

    /// True if both coefficients are finite.
    pub fn is_finite(&self) -> bool {
        self.k1.is_finite() && self.k2.is_finite()
    }
}
