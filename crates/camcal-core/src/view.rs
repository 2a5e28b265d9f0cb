//! Observation containers for planar calibration.

use serde::{Deserialize, Serialize};

use crate::math::{Pt2, Pt3};

/// One view of the planar pattern: an ordered sequence of detected image
/// points, aligned index-for-index with the shared model points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanarView {
    /// Detected image points (pixels), one per model point.
    pub points: Vec<Pt2>,
}

impl PlanarView {
    pub fn new(points: Vec<Pt2>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// The full calibration data set: the shared planar model, all observed
/// views, and the image dimensions the observations were detected in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationData {
    /// Pattern points on the `z = 0` plane, identical for every view.
    pub model_points: Vec<Pt3>,
    /// Observed views.
    pub views: Vec<PlanarView>,
    /// Source image dimensions `(width, height)` in pixels, used for
    /// observation sanity checks and reporting.
    pub image_size: (u32, u32),
}

impl CalibrationData {
    pub fn new(model_points: Vec<Pt3>, views: Vec<PlanarView>, image_size: (u32, u32)) -> Self {
        Self {
            model_points,
            views,
            image_size,
        }
    }

    pub fn num_views(&self) -> usize {
        self.views.len()
    }

    pub fn num_model_points(&self) -> usize {
        self.model_points.len()
    }

    /// Total observation count across all views.
    pub fn num_observations(&self) -> usize {
        self.views.iter().map(|v| v.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observation_counts() {
        let model = vec![Pt3::new(0.0, 0.0, 0.0), Pt3::new(1.0, 0.0, 0.0)];
        let views = vec![
            PlanarView::new(vec![Pt2::new(1.0, 2.0), Pt2::new(3.0, 4.0)]),
            PlanarView::new(vec![Pt2::new(5.0, 6.0), Pt2::new(7.0, 8.0)]),
        ];
        let data = CalibrationData::new(model, views, (640, 480));
        assert_eq!(data.num_views(), 2);
        assert_eq!(data.num_model_points(), 2);
        assert_eq!(data.num_observations(), 4);
    }
}
