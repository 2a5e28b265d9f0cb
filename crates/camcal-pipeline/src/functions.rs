//! The staged calibration run.
//!
//! Stage order: pooled normalization, per-view homography solve and
//! refinement in the normalized frame, closed-form intrinsics (denormalized
//! afterwards), per-view pose decomposition and refinement, closed-form
//! distortion fit, distortion refinement, joint bundle over everything.

use camcal_core::{
    mat3_is_finite, project_point, reprojection_rms, CalibrationData, CalibrationResult, CameraPose,
    Mat3, Pt2, Pt3, Real,
};
use camcal_linear::{
    denormalize_intrinsics, dlt_homography, estimate_intrinsics, estimate_radial_distortion,
    normalization_from_points, pose_from_homography, DistortionFitView, Normalization,
};
use camcal_optim::{
    optimize_bundle, refine_distortion, refine_homography, refine_pose, LmBackend, SolveOptions,
};
use log::{debug, info, warn};

use crate::error::CalibrationError;
use crate::types::{CalibrationConfig, CalibrationReport, RejectedView, ViewDiagnostics};

/// Fewest views the closed-form intrinsics stage accepts.
const MIN_VIEWS: usize = 2;
/// Fewest correspondences for a well-posed homography.
const MIN_POINTS_PER_VIEW: usize = 4;

/// A view that survived the homography stage.
struct KeptView {
    /// Index into the input view list.
    index: usize,
    /// Observed pixel coordinates.
    observed: Vec<Pt2>,
    /// Homography in the normalized image frame.
    h_norm: Mat3,
    homography_converged: bool,
}

fn model_plane_points(model_points: &[Pt3]) -> Vec<Pt2> {
    model_points.iter().map(|p| Pt2::new(p.x, p.y)).collect()
}

fn points_are_finite(points: &[Pt2]) -> bool {
    points.iter().all(|p| p.x.is_finite() && p.y.is_finite())
}

/// Map a normalized-frame homography back to pixel coordinates, rescaled so
/// its bottom-right entry is 1.
fn pixel_homography(norm: &Normalization, h_norm: &Mat3) -> Option<Mat3> {
    let mut h = norm.inverse * h_norm;
    let scale = h[(2, 2)];
    if scale.abs() < Real::EPSILON || !mat3_is_finite(&h) {
        return None;
    }
    h /= scale;
    Some(h)
}

/// Per-view input validation, run before any pooled computation so that a
/// single malformed view cannot poison the shared normalization stage.
fn screen_views(
    data: &CalibrationData,
    drop_degenerate: bool,
) -> Result<(Vec<usize>, Vec<RejectedView>), CalibrationError> {
    let mut candidates = Vec::with_capacity(data.views.len());
    let mut rejected = Vec::new();

    for (index, view) in data.views.iter().enumerate() {
        let reason = if view.len() != data.model_points.len() {
            Some(format!(
                "{} points observed, pattern has {}",
                view.len(),
                data.model_points.len()
            ))
        } else if view.len() < MIN_POINTS_PER_VIEW {
            Some(format!(
                "{} correspondences, need at least {MIN_POINTS_PER_VIEW}",
                view.len()
            ))
        } else if !points_are_finite(&view.points) {
            Some("non-finite observed coordinates".to_string())
        } else {
            None
        };

        match reason {
            None => candidates.push(index),
            Some(reason) if drop_degenerate => {
                warn!("dropping view {index}: {reason}");
                rejected.push(RejectedView { index, reason });
            }
            Some(reason) => return Err(CalibrationError::DegenerateView { index, reason }),
        }
    }

    Ok((candidates, rejected))
}

fn solve_view_homographies(
    data: &CalibrationData,
    candidates: &[usize],
    model_2d: &[Pt2],
    norm: &Normalization,
    opts: &SolveOptions,
    drop_degenerate: bool,
) -> Result<(Vec<KeptView>, Vec<RejectedView>), CalibrationError> {
    let backend = LmBackend;
    let mut kept = Vec::with_capacity(candidates.len());
    let mut rejected = Vec::new();

    for &index in candidates {
        let view = &data.views[index];
        let reason = 'check: {
            let normalized: Vec<Pt2> = view.points.iter().map(|p| norm.apply(p)).collect();
            let h0 = match dlt_homography(model_2d, &normalized) {
                Ok(h) => h,
                Err(err) => break 'check Some(err.to_string()),
            };
            let (h_norm, report) = match refine_homography(&backend, model_2d, &normalized, &h0, opts)
            {
                Ok(out) => out,
                Err(err) => break 'check Some(format!("homography refinement failed: {err}")),
            };
            if !mat3_is_finite(&h_norm) {
                break 'check Some("homography refinement produced non-finite entries".to_string());
            }

            debug!(
                "view {index}: homography refined in {} evaluations, cost {:.3e}",
                report.iterations, report.final_cost
            );
            kept.push(KeptView {
                index,
                observed: view.points.clone(),
                h_norm,
                homography_converged: report.converged,
            });
            None
        };

        if let Some(reason) = reason {
            if !drop_degenerate {
                return Err(CalibrationError::DegenerateView { index, reason });
            }
            warn!("dropping view {index}: {reason}");
            rejected.push(RejectedView { index, reason });
        }
    }

    Ok((kept, rejected))
}

/// Run the full calibration over every view in `data`.
///
/// Degenerate views are dropped (and reported) when the config allows it;
/// everything else in the taxonomy aborts the run with the failing stage.
pub fn run_calibration(
    data: &CalibrationData,
    config: &CalibrationConfig,
) -> Result<CalibrationReport, CalibrationError> {
    if data.model_points.is_empty() {
        return Err(CalibrationError::InvalidInput(
            "pattern model is empty".to_string(),
        ));
    }
    if data.views.len() < MIN_VIEWS {
        return Err(CalibrationError::NotEnoughViews {
            kept: data.views.len(),
            need: MIN_VIEWS,
        });
    }
    info!(
        "calibrating from {} views of a {}-point pattern",
        data.views.len(),
        data.model_points.len()
    );

    // Stage 1: one similarity transform conditioning all observed points.
    // Only views that pass input screening contribute to the pooled set.
    let (candidates, mut rejected) = screen_views(data, config.drop_degenerate_views)?;
    if candidates.len() < MIN_VIEWS {
        return Err(CalibrationError::NotEnoughViews {
            kept: candidates.len(),
            need: MIN_VIEWS,
        });
    }
    let pooled: Vec<Pt2> = candidates
        .iter()
        .flat_map(|&i| data.views[i].points.iter().copied())
        .collect();
    let norm = normalization_from_points(&pooled)?;

    // Stage 2: per-view homographies in the normalized frame.
    let model_2d = model_plane_points(&data.model_points);
    let (kept, homography_rejected) = solve_view_homographies(
        data,
        &candidates,
        &model_2d,
        &norm,
        &config.solver,
        config.drop_degenerate_views,
    )?;
    rejected.extend(homography_rejected);
    if kept.len() < MIN_VIEWS {
        return Err(CalibrationError::NotEnoughViews {
            kept: kept.len(),
            need: MIN_VIEWS,
        });
    }

    // Stage 3: closed-form intrinsics from the normalized homographies.
    let h_norms: Vec<Mat3> = kept.iter().map(|v| v.h_norm).collect();
    let a_norm = estimate_intrinsics(&h_norms)?;
    let intrinsics = denormalize_intrinsics(&a_norm, &norm);
    if !intrinsics.is_finite() {
        return Err(CalibrationError::NonFinite {
            stage: "intrinsics",
        });
    }
    info!(
        "closed-form intrinsics: fx {:.2} fy {:.2} cx {:.2} cy {:.2} skew {:.4}",
        intrinsics.fx, intrinsics.fy, intrinsics.cx, intrinsics.cy, intrinsics.skew
    );

    // Stage 4: per-view pose decomposition and refinement, in pixel space.
    let backend = LmBackend;
    let mut solved: Vec<&KeptView> = Vec::with_capacity(kept.len());
    let mut poses: Vec<CameraPose> = Vec::with_capacity(kept.len());
    let mut diagnostics: Vec<ViewDiagnostics> = Vec::with_capacity(kept.len());
    let mut converged = true;
    for view in &kept {
        let h_pix = pixel_homography(&norm, &view.h_norm).ok_or(CalibrationError::NonFinite {
            stage: "homography denormalization",
        })?;
        let pose0 = match pose_from_homography(&intrinsics, &h_pix) {
            Ok(pose) => pose,
            Err(source) if config.drop_degenerate_views => {
                let reason = format!("pose decomposition failed: {source}");
                warn!("dropping view {}: {reason}", view.index);
                rejected.push(RejectedView {
                    index: view.index,
                    reason,
                });
                continue;
            }
            Err(source) => {
                return Err(CalibrationError::Extrinsics {
                    index: view.index,
                    source,
                })
            }
        };
        converged &= view.homography_converged;
        let initial_rms = reprojection_rms(
            &intrinsics,
            &pose0,
            None,
            &data.model_points,
            &view.observed,
        );

        let (pose, report) = refine_pose(
            &backend,
            &intrinsics,
            &data.model_points,
            &view.observed,
            &pose0,
            &config.solver,
        )
        .map_err(|cause| CalibrationError::Refinement {
            stage: "pose",
            cause,
        })?;
        if !pose.is_finite() {
            return Err(CalibrationError::NonFinite { stage: "pose" });
        }
        converged &= report.converged;

        let refined_rms = reprojection_rms(
            &intrinsics,
            &pose,
            None,
            &data.model_points,
            &view.observed,
        );
        debug!(
            "view {}: rms {:.4} -> {:.4} px after pose refinement",
            view.index, initial_rms, refined_rms
        );
        solved.push(view);
        poses.push(pose);
        diagnostics.push(ViewDiagnostics {
            index: view.index,
            initial_rms,
            refined_rms,
            final_rms: 0.0,
        });
    }
    if solved.len() < MIN_VIEWS {
        return Err(CalibrationError::NotEnoughViews {
            kept: solved.len(),
            need: MIN_VIEWS,
        });
    }

    // Stage 5/6: closed-form distortion from undistorted projections, then
    // nonlinear refinement against all views.
    let projections: Vec<Vec<Pt2>> = poses
        .iter()
        .map(|pose| {
            data.model_points
                .iter()
                .map(|pw| project_point(&intrinsics, pose, None, pw))
                .collect()
        })
        .collect();
    let fit_views: Vec<DistortionFitView<'_>> = solved
        .iter()
        .zip(projections.iter())
        .map(|(view, projected)| DistortionFitView {
            observed: &view.observed,
            projected,
        })
        .collect();
    let k0 = estimate_radial_distortion(&intrinsics, &fit_views)?;
    debug!("closed-form distortion: k1 {:.5} k2 {:.5}", k0.k1, k0.k2);

    let observed: Vec<Vec<Pt2>> = solved.iter().map(|v| v.observed.clone()).collect();
    let (distortion, dist_report) = refine_distortion(
        &backend,
        &intrinsics,
        &poses,
        &data.model_points,
        &observed,
        &k0,
        &config.solver,
    )
    .map_err(|cause| CalibrationError::Refinement {
        stage: "distortion",
        cause,
    })?;
    if !distortion.is_finite() {
        return Err(CalibrationError::NonFinite { stage: "distortion" });
    }
    converged &= dist_report.converged;

    // Stage 7: joint bundle over intrinsics, all poses and distortion.
    let bundle = optimize_bundle(
        &backend,
        &data.model_points,
        &observed,
        &intrinsics,
        &poses,
        &distortion,
        &config.solver,
    )
    .map_err(|cause| CalibrationError::Refinement {
        stage: "bundle",
        cause,
    })?;
    converged &= bundle.report.converged;

    let result = CalibrationResult {
        intrinsics: bundle.intrinsics,
        distortion: bundle.distortion,
        poses: bundle.poses,
    };
    if !result.is_finite() {
        return Err(CalibrationError::NonFinite { stage: "bundle" });
    }

    let mut sum_sq = 0.0;
    let mut total = 0usize;
    for ((diag, pose), obs) in diagnostics
        .iter_mut()
        .zip(result.poses.iter())
        .zip(observed.iter())
    {
        diag.final_rms = reprojection_rms(
            &result.intrinsics,
            pose,
            Some(&result.distortion),
            &data.model_points,
            obs,
        );
        sum_sq += diag.final_rms * diag.final_rms * obs.len() as Real;
        total += obs.len();
    }
    let rms = (sum_sq / total.max(1) as Real).sqrt();
    rejected.sort_by_key(|r| r.index);
    info!(
        "calibration finished: rms {:.4} px over {} views ({} rejected), converged: {}",
        rms,
        diagnostics.len(),
        rejected.len(),
        converged
    );

    Ok(CalibrationReport {
        result,
        views: diagnostics,
        rejected_views: rejected,
        rms,
        final_cost: bundle.report.final_cost,
        converged,
    })
}
