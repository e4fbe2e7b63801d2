use glam::{DMat3, DVec3};
use monovo_geometry::{
    camera::CalibrationMatrix,
    pose::PoseEstimator,
    triangulation::Triangulator,
};

use crate::config::OdometryConfig;
use crate::correspondence::{rank_by_distance, Correspondence, CorrespondenceSource};
use crate::error::OdometryError;
use crate::export::OdometryExport;
use crate::map_store::{MapPoint, MapStore};
use crate::pose_chain::{AbsolutePose, PoseChain};

/// Number of best-ranked correspondences summarized in debug logs.
const RANKED_DIAGNOSTICS: usize = 50;

/// Features of the frame that new frames are matched against.
///
/// Only the [`FrameProcessor`] creates or replaces a baseline; callers can read it but never
/// modify it.
#[derive(Debug, Clone)]
pub struct Baseline<F> {
    frame_index: u64,
    features: F,
}

impl<F> Baseline<F> {
    /// Index of the frame the baseline was taken from, counting every processed frame.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// The baseline features.
    pub fn features(&self) -> &F {
        &self.features
    }
}

/// Phase of the tracking state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingPhase {
    /// No baseline yet, the next frame only becomes the baseline.
    Bootstrap,
    /// A baseline exists, the next frame is matched against it.
    Tracking,
}

/// What processing one frame did.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    /// First frame: stored as the baseline, no geometry produced.
    Bootstrapped,
    /// The relative pose was estimated and integrated.
    Tracked {
        /// Correspondences returned by the source.
        correspondences: usize,
        /// RANSAC inliers used for triangulation.
        inliers: usize,
        /// Points added to the map.
        points_added: usize,
    },
    /// Nothing was integrated for this frame.
    ///
    /// Either [`OdometryError::InsufficientCorrespondences`], after which tracking restarts from
    /// this frame, or [`OdometryError::DegenerateGeometry`].
    Skipped(OdometryError),
}

impl FrameOutcome {
    /// Whether the frame added an entry to the trajectory.
    pub fn is_tracked(&self) -> bool {
        matches!(self, FrameOutcome::Tracked { .. })
    }

    /// The reason the frame was skipped, if it was.
    pub fn error(&self) -> Option<&OdometryError> {
        match self {
            FrameOutcome::Skipped(err) => Some(err),
            _ => None,
        }
    }
}

enum TrackingState<F> {
    Bootstrap,
    Tracking { baseline: Baseline<F> },
}

/// Drives pose estimation, triangulation and map integration frame by frame.
///
/// Every processed frame becomes the new baseline, whatever the outcome, so tracking never
/// looks back more than one frame. Failed frames are logged and skipped: there is no failure
/// counter, no relocalization and no recovery policy.
pub struct FrameProcessor<F> {
    config: OdometryConfig,
    estimator: PoseEstimator,
    triangulator: Triangulator,
    pose_chain: PoseChain,
    map: MapStore,
    state: TrackingState<F>,
    frames_processed: u64,
}

impl<F> FrameProcessor<F> {
    /// Create a processor for a calibrated camera.
    pub fn new(calibration: CalibrationMatrix, config: OdometryConfig) -> Self {
        Self {
            config,
            estimator: PoseEstimator::new(calibration, config.pose),
            triangulator: Triangulator::new(calibration, config.triangulation),
            pose_chain: PoseChain::new(),
            map: MapStore::new(),
            state: TrackingState::Bootstrap,
            frames_processed: 0,
        }
    }

    /// Create a processor from a raw intrinsic matrix.
    ///
    /// Fails with [`OdometryError::InvalidCalibration`] for non-finite or singular matrices.
    pub fn from_matrix(k: DMat3, config: OdometryConfig) -> Result<Self, OdometryError> {
        Ok(Self::new(CalibrationMatrix::from_matrix(k)?, config))
    }

    /// The configuration.
    pub fn config(&self) -> &OdometryConfig {
        &self.config
    }

    /// Current phase of the state machine.
    pub fn phase(&self) -> TrackingPhase {
        match self.state {
            TrackingState::Bootstrap => TrackingPhase::Bootstrap,
            TrackingState::Tracking { .. } => TrackingPhase::Tracking,
        }
    }

    /// The baseline new frames are matched against, if any.
    pub fn baseline(&self) -> Option<&Baseline<F>> {
        match &self.state {
            TrackingState::Bootstrap => None,
            TrackingState::Tracking { baseline } => Some(baseline),
        }
    }

    /// Number of frames processed so far.
    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// The absolute pose chain.
    pub fn pose_chain(&self) -> &PoseChain {
        &self.pose_chain
    }

    /// The latest absolute camera pose.
    pub fn current_pose(&self) -> &AbsolutePose {
        self.pose_chain.latest()
    }

    /// Camera positions, one per tracked frame.
    pub fn trajectory(&self) -> &[DVec3] {
        self.pose_chain.trajectory()
    }

    /// The world map.
    pub fn map(&self) -> &MapStore {
        &self.map
    }

    /// Copy of the map points.
    pub fn map_snapshot(&self) -> Vec<MapPoint> {
        self.map.snapshot()
    }

    /// Copy of the trajectory and the map for persistence or visualization.
    pub fn export(&self) -> OdometryExport {
        OdometryExport::new(self.pose_chain.trajectory(), self.map.points())
    }

    /// Process one frame.
    ///
    /// Never fails: insufficient correspondences and degenerate geometry are logged and
    /// reported in the returned [`FrameOutcome`]. The frame always becomes the new baseline.
    pub fn process<S>(&mut self, features: F, source: &mut S) -> FrameOutcome
    where
        S: CorrespondenceSource<F> + ?Sized,
    {
        let frame_index = self.frames_processed;
        self.frames_processed += 1;

        let outcome = match &self.state {
            TrackingState::Bootstrap => {
                log::info!("Frame {frame_index}: bootstrap baseline");
                FrameOutcome::Bootstrapped
            }
            TrackingState::Tracking { baseline } => {
                let correspondences = source.correspondences(&baseline.features, &features);
                match self.integrate(&correspondences) {
                    Ok(outcome) => outcome,
                    Err(err) => {
                        report_failure(frame_index, &err);
                        FrameOutcome::Skipped(err)
                    }
                }
            }
        };

        self.state = TrackingState::Tracking {
            baseline: Baseline {
                frame_index,
                features,
            },
        };

        outcome
    }

    fn integrate(
        &mut self,
        correspondences: &[Correspondence],
    ) -> Result<FrameOutcome, OdometryError> {
        if correspondences.len() < self.config.min_matches {
            return Err(OdometryError::InsufficientCorrespondences {
                count: correspondences.len(),
                min_matches: self.config.min_matches,
            });
        }

        if log::log_enabled!(log::Level::Debug) {
            log_ranking(correspondences);
        }

        let estimate = self.estimator.estimate(correspondences)?;
        let latest = self.pose_chain.append(&estimate.pose);

        let inliers = estimate.inlier_correspondences(correspondences);
        let points = self.triangulator.triangulate(&inliers, &estimate.pose);
        let points_added = self.map.insert(&points, &latest);

        log::debug!(
            "Pose {}: position {:?}, {} inliers, {} new points, map size {}",
            self.pose_chain.len() - 1,
            latest.translation,
            estimate.inlier_count,
            points_added,
            self.map.len()
        );

        Ok(FrameOutcome::Tracked {
            correspondences: correspondences.len(),
            inliers: estimate.inlier_count,
            points_added,
        })
    }
}

fn report_failure(frame_index: u64, err: &OdometryError) {
    match err {
        OdometryError::InsufficientCorrespondences { .. } => {
            log::info!("Frame {frame_index}: {err}, resetting baseline");
        }
        _ => log::warn!("Frame {frame_index}: {err}, frame skipped"),
    }
}

fn log_ranking(correspondences: &[Correspondence]) {
    let mut ranked = correspondences.to_vec();
    rank_by_distance(&mut ranked);
    let distances = ranked
        .iter()
        .take(RANKED_DIAGNOSTICS)
        .filter_map(|c| c.distance)
        .collect::<Vec<_>>();
    if let (Some(best), Some(worst)) = (distances.first(), distances.last()) {
        log::debug!(
            "{} correspondences, best {} descriptor distances in [{best}, {worst}]",
            correspondences.len(),
            distances.len()
        );
    }
}
