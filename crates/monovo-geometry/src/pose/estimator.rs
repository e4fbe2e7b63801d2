use glam::{DMat3, DVec2, DVec3};
use serde::{Deserialize, Serialize};

use super::{
    decompose_essential, ransac_essential, PoseEstimationError, RansacParams, RelativePose,
    ESSENTIAL_SAMPLE_SIZE,
};
use crate::camera::CalibrationMatrix;
use crate::correspondence::Correspondence;
use crate::triangulation::{projection_matrix, triangulate_dlt};

/// Parameters of the cheirality check used to pick one of the four decompositions.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheiralityParams {
    /// Maximum number of inliers triangulated per candidate.
    pub max_samples: usize,
    /// Points farther than this (in baseline units) are not counted, their depth sign is unreliable.
    pub max_depth: f64,
}

impl Default for CheiralityParams {
    fn default() -> Self {
        Self {
            max_samples: 64,
            max_depth: 50.0,
        }
    }
}

/// Configuration of the relative pose estimator.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseEstimatorConfig {
    /// RANSAC settings for the essential matrix.
    pub ransac: RansacParams,
    /// Candidate disambiguation settings.
    pub cheirality: CheiralityParams,
    /// Minimum RMS spread of the pixel points around their centroid, in pixels.
    ///
    /// Below this value the correspondences collapse onto one location and carry no geometry.
    pub min_spread_px: f64,
}

impl Default for PoseEstimatorConfig {
    fn default() -> Self {
        Self {
            ransac: RansacParams::default(),
            cheirality: CheiralityParams::default(),
            min_spread_px: 1.0,
        }
    }
}

/// Output of a successful relative pose estimation.
#[derive(Clone, Debug)]
pub struct PoseEstimate {
    /// Selected relative pose.
    pub pose: RelativePose,
    /// Essential matrix of the winning RANSAC hypothesis.
    pub essential: DMat3,
    /// Per-correspondence inlier mask, aligned with the input slice.
    pub inliers: Vec<bool>,
    /// Total inlier count.
    pub inlier_count: usize,
    /// Number of sampled inliers in front of both cameras for the selected pose.
    pub positive_depth: usize,
    /// Number of inliers triangulated by the cheirality check.
    pub sampled: usize,
    /// Number of RANSAC iterations performed.
    pub iterations: usize,
}

impl PoseEstimate {
    /// Collect the inlier correspondences, in input order.
    pub fn inlier_correspondences(&self, correspondences: &[Correspondence]) -> Vec<Correspondence> {
        correspondences
            .iter()
            .zip(self.inliers.iter())
            .filter(|(_, inlier)| **inlier)
            .map(|(c, _)| *c)
            .collect()
    }
}

/// Robust relative pose estimation between two calibrated views.
///
/// The pipeline is:
/// 1. drop non-finite correspondences and reject collapsed point sets,
/// 2. normalize pixels with `K^-1`,
/// 3. RANSAC over 8-point essential matrices scored by Sampson distance,
/// 4. SVD decomposition into four `(R, t)` candidates,
/// 5. cheirality check on a sample of inliers.
#[derive(Debug, Clone)]
pub struct PoseEstimator {
    calibration: CalibrationMatrix,
    config: PoseEstimatorConfig,
}

impl PoseEstimator {
    /// Create an estimator for a calibrated camera.
    pub fn new(calibration: CalibrationMatrix, config: PoseEstimatorConfig) -> Self {
        Self {
            calibration,
            config,
        }
    }

    /// The camera calibration.
    pub fn calibration(&self) -> &CalibrationMatrix {
        &self.calibration
    }

    /// The estimator configuration.
    pub fn config(&self) -> &PoseEstimatorConfig {
        &self.config
    }

    /// Estimate the relative pose from `(previous, current)` pixel correspondences.
    ///
    /// The returned pose maps points from the current camera frame into the previous one.
    pub fn estimate(
        &self,
        correspondences: &[Correspondence],
    ) -> Result<PoseEstimate, PoseEstimationError> {
        let valid = correspondences
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_finite())
            .map(|(i, _)| i)
            .collect::<Vec<_>>();

        if valid.len() < ESSENTIAL_SAMPLE_SIZE {
            return Err(PoseEstimationError::TooFewCorrespondences {
                required: ESSENTIAL_SAMPLE_SIZE,
                actual: valid.len(),
            });
        }

        let spread = rms_spread(valid.iter().map(|&i| correspondences[i].previous))
            .min(rms_spread(valid.iter().map(|&i| correspondences[i].current)));
        if spread < self.config.min_spread_px {
            return Err(PoseEstimationError::DegenerateConfiguration { spread });
        }

        let x1 = valid
            .iter()
            .map(|&i| self.calibration.normalize(correspondences[i].current))
            .collect::<Vec<_>>();
        let x2 = valid
            .iter()
            .map(|&i| self.calibration.normalize(correspondences[i].previous))
            .collect::<Vec<_>>();

        let threshold = self.config.ransac.threshold / self.calibration.mean_focal();
        let ransac = ransac_essential(&x1, &x2, threshold, &self.config.ransac)?;

        let selected = select_pose(
            &ransac.model,
            &x1,
            &x2,
            &ransac.inliers,
            &self.config.cheirality,
        )?;

        let mut inliers = vec![false; correspondences.len()];
        for (k, &i) in valid.iter().enumerate() {
            inliers[i] = ransac.inliers[k];
        }

        log::debug!(
            "Relative pose: {} inliers, {}/{} sampled points in front of both cameras",
            ransac.inlier_count,
            selected.positive,
            selected.sampled
        );

        Ok(PoseEstimate {
            pose: RelativePose::new(selected.rotation, selected.translation),
            essential: ransac.model,
            inliers,
            inlier_count: ransac.inlier_count,
            positive_depth: selected.positive,
            sampled: selected.sampled,
            iterations: ransac.iterations,
        })
    }
}

struct SelectedPose {
    rotation: DMat3,
    translation: DVec3,
    positive: usize,
    sampled: usize,
}

/// Pick the decomposition of `e` that puts most sampled inliers in front of both cameras.
///
/// A strict majority of the sampled points must have positive depth for the winner.
fn select_pose(
    e: &DMat3,
    x1: &[DVec2],
    x2: &[DVec2],
    inliers: &[bool],
    params: &CheiralityParams,
) -> Result<SelectedPose, PoseEstimationError> {
    let inlier_idx = inliers
        .iter()
        .enumerate()
        .filter(|(_, inlier)| **inlier)
        .map(|(i, _)| i)
        .collect::<Vec<_>>();

    // evenly strided subset of the inliers
    let stride = inlier_idx.len().div_ceil(params.max_samples.max(1)).max(1);
    let sample = inlier_idx.iter().step_by(stride).copied().collect::<Vec<_>>();

    let p1 = projection_matrix(&DMat3::IDENTITY, &DMat3::IDENTITY, &DVec3::ZERO);

    let mut best: Option<SelectedPose> = None;
    for (r, t) in decompose_essential(e) {
        let p2 = projection_matrix(&DMat3::IDENTITY, &r, &t);
        let positive = sample
            .iter()
            .filter_map(|&i| triangulate_dlt(&p1, &p2, &x1[i], &x2[i]))
            .filter(|x| {
                let z2 = (r * *x + t).z;
                x.z > 0.0 && z2 > 0.0 && x.z < params.max_depth
            })
            .count();

        if best.as_ref().map_or(true, |b| positive > b.positive) {
            best = Some(SelectedPose {
                rotation: r,
                translation: t,
                positive,
                sampled: sample.len(),
            });
        }
    }

    match best {
        Some(b) if 2 * b.positive > b.sampled => Ok(b),
        Some(b) => Err(PoseEstimationError::AmbiguousCheirality {
            positive: b.positive,
            sampled: b.sampled,
        }),
        None => Err(PoseEstimationError::AmbiguousCheirality {
            positive: 0,
            sampled: sample.len(),
        }),
    }
}

/// Root mean square distance of the points to their centroid.
fn rms_spread(points: impl Iterator<Item = DVec2> + Clone) -> f64 {
    let n = points.clone().count();
    if n == 0 {
        return 0.0;
    }
    let mean = points.clone().sum::<DVec2>() / n as f64;
    (points.map(|p| p.distance_squared(mean)).sum::<f64>() / n as f64).sqrt()
}
