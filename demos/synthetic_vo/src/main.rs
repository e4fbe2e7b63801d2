use argh::FromArgs;
use glam::{DMat3, DVec2, DVec3};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::{collections::HashMap, path::PathBuf};

use monovo::geometry::{
    camera::CalibrationMatrix,
    transforms::{axis_angle_to_rotation_matrix, rotation_distance},
};
use monovo::odometry::{
    Correspondence, CorrespondenceSource, FrameOutcome, FrameProcessor, OdometryConfig,
};

#[derive(FromArgs)]
/// Run monocular visual odometry over a synthetic scene with known ground truth
struct Args {
    /// number of frames to generate
    #[argh(option, default = "30")]
    frames: usize,

    /// number of landmarks in the scene
    #[argh(option, default = "2000")]
    landmarks: usize,

    /// pixel noise added to every observation
    #[argh(option, default = "0.5")]
    noise: f64,

    /// fraction of correspondences replaced by random mismatches
    #[argh(option, default = "0.1")]
    outlier_ratio: f64,

    /// path to a JSON file overriding the default odometry configuration
    #[argh(option)]
    config: Option<PathBuf>,

    /// path where the trajectory and map are saved as JSON
    #[argh(option)]
    output: Option<PathBuf>,

    /// seed of the scene generator
    #[argh(option, default = "42")]
    seed: u64,
}

const WIDTH: f64 = 640.0;
const HEIGHT: f64 = 480.0;

/// Features of one synthetic frame: landmark id and pixel position.
struct SyntheticFrame {
    observations: HashMap<usize, DVec2>,
}

/// Matches landmarks by id and corrupts a fraction of the matches.
struct NoisyMatcher {
    outlier_ratio: f64,
    rng: StdRng,
}

impl CorrespondenceSource<SyntheticFrame> for NoisyMatcher {
    fn correspondences(
        &mut self,
        baseline: &SyntheticFrame,
        current: &SyntheticFrame,
    ) -> Vec<Correspondence> {
        let mut ids = baseline
            .observations
            .keys()
            .filter(|id| current.observations.contains_key(id))
            .copied()
            .collect::<Vec<_>>();
        ids.sort_unstable();

        ids.iter()
            .map(|id| {
                let previous = baseline.observations[id];
                let mut observed = current.observations[id];
                if self.rng.random_bool(self.outlier_ratio) {
                    observed = DVec2::new(
                        self.rng.random_range(0.0..WIDTH),
                        self.rng.random_range(0.0..HEIGHT),
                    );
                }
                let distance = previous.distance(observed) as f32;
                Correspondence::new(previous, observed).with_distance(distance)
            })
            .collect()
    }
}

/// Camera-to-world poses of a camera driving forward while turning slowly.
fn ground_truth(frames: usize) -> Result<Vec<(DMat3, DVec3)>, &'static str> {
    (0..frames)
        .map(|k| {
            let yaw = (1.5 * k as f64).to_radians();
            let rotation = axis_angle_to_rotation_matrix(DVec3::Y, yaw)?;
            let translation = DVec3::new(0.6 * k as f64, 0.0, 0.8 * k as f64);
            Ok((rotation, translation))
        })
        .collect()
}

fn observe(
    calibration: &CalibrationMatrix,
    landmarks: &[DVec3],
    (rotation, translation): &(DMat3, DVec3),
    noise: f64,
    rng: &mut StdRng,
) -> SyntheticFrame {
    let mut observations = HashMap::new();
    for (id, p) in landmarks.iter().enumerate() {
        let pc = rotation.transpose() * (*p - *translation);
        let Some(uv) = calibration.project(pc) else {
            continue;
        };
        if uv.x < 0.0 || uv.x >= WIDTH || uv.y < 0.0 || uv.y >= HEIGHT {
            continue;
        }
        let jitter = if noise > 0.0 {
            DVec2::new(
                rng.random_range(-noise..noise),
                rng.random_range(-noise..noise),
            )
        } else {
            DVec2::ZERO
        };
        observations.insert(id, uv + jitter);
    }
    SyntheticFrame { observations }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let config: OdometryConfig = match &args.config {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => OdometryConfig::default(),
    };
    log::info!("Odometry config: {config:?}");

    let calibration = CalibrationMatrix::new(800.0, 800.0, 320.0, 240.0)?;
    let mut rng = StdRng::seed_from_u64(args.seed);

    let poses = ground_truth(args.frames)?;
    let depth_range = 8.0..(30.0 + 0.8 * args.frames as f64);
    let landmarks = (0..args.landmarks)
        .map(|_| {
            DVec3::new(
                rng.random_range(-15.0..(15.0 + 0.6 * args.frames as f64)),
                rng.random_range(-4.0..4.0),
                rng.random_range(depth_range.clone()),
            )
        })
        .collect::<Vec<_>>();
    println!(
        "Synthetic scene: #{} landmarks, #{} frames",
        landmarks.len(),
        poses.len()
    );

    let mut matcher = NoisyMatcher {
        outlier_ratio: args.outlier_ratio.clamp(0.0, 1.0),
        rng: StdRng::seed_from_u64(args.seed.wrapping_add(1)),
    };
    let mut vo = FrameProcessor::new(calibration, config);

    let mut skipped = 0;
    let mut rotation_errors = Vec::new();
    for (k, pose) in poses.iter().enumerate() {
        let frame = observe(&calibration, &landmarks, pose, args.noise, &mut rng);
        let outcome = vo.process(frame, &mut matcher);

        match outcome {
            FrameOutcome::Tracked { .. } => {
                // compare the frame-to-frame rotation with the ground truth
                let chain = vo.pose_chain().poses();
                let n = chain.len();
                let estimated = chain[n - 2].rotation.transpose() * chain[n - 1].rotation;
                let truth = poses[k - 1].0.transpose() * pose.0;
                rotation_errors.push(rotation_distance(&estimated, &truth).to_degrees());
            }
            FrameOutcome::Skipped(_) => skipped += 1,
            FrameOutcome::Bootstrapped => {}
        }

        if vo.trajectory().len() % 5 == 0 && outcome.is_tracked() {
            log::info!(
                "Frame {k}: #{} poses, #{} map points, position {:?}",
                vo.trajectory().len(),
                vo.map().len(),
                vo.current_pose().translation
            );
        }
    }

    let mean_error = if rotation_errors.is_empty() {
        0.0
    } else {
        rotation_errors.iter().sum::<f64>() / rotation_errors.len() as f64
    };
    println!(
        "Tracked #{} frames, skipped #{}, mean rotation error {:.3} deg, #{} map points",
        rotation_errors.len(),
        skipped,
        mean_error,
        vo.map().len()
    );

    let export = vo.export();
    match &args.output {
        Some(path) if !export.is_empty() => {
            std::fs::write(path, serde_json::to_string_pretty(&export)?)?;
            println!("Results saved to {}", path.display());
        }
        Some(_) => log::warn!("Nothing to save: no frame was tracked"),
        None => {}
    }

    Ok(())
}
