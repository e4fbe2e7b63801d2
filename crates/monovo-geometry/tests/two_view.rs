use glam::{DVec2, DVec3};
use monovo_geometry::{
    camera::CalibrationMatrix,
    correspondence::Correspondence,
    pose::{PoseEstimationError, PoseEstimator, PoseEstimatorConfig, RelativePose},
    transforms::{axis_angle_to_rotation_matrix, rotation_distance},
    triangulation::{TriangulationParams, Triangulator},
};
use rand::{rngs::StdRng, Rng, SeedableRng};

struct Scene {
    calibration: CalibrationMatrix,
    truth: RelativePose,
    points: Vec<DVec3>,
    correspondences: Vec<Correspondence>,
}

/// Two cameras related by a 5 degree rotation about y and a unit translation along x.
///
/// Points are expressed in the current camera frame.
fn make_scene(n: usize, noise_px: f64, seed: u64) -> Result<Scene, Box<dyn std::error::Error>> {
    let calibration = CalibrationMatrix::new(800.0, 800.0, 320.0, 240.0)?;
    let rotation = axis_angle_to_rotation_matrix(DVec3::Y, 5f64.to_radians())?;
    let truth = RelativePose::new(rotation, DVec3::X);

    let mut rng = StdRng::seed_from_u64(seed);
    let mut points = Vec::with_capacity(n);
    let mut correspondences = Vec::with_capacity(n);
    while points.len() < n {
        let p = DVec3::new(
            rng.random_range(-3.0..3.0),
            rng.random_range(-2.0..2.0),
            rng.random_range(4.0..12.0),
        );
        let q = truth.rotation * p + truth.translation;
        let (Some(current), Some(previous)) = (calibration.project(p), calibration.project(q))
        else {
            continue;
        };
        let jitter = |rng: &mut StdRng| {
            DVec2::new(
                rng.random_range(-noise_px..=noise_px),
                rng.random_range(-noise_px..=noise_px),
            )
        };
        let previous = previous + jitter(&mut rng);
        let current = current + jitter(&mut rng);
        points.push(p);
        correspondences.push(Correspondence::new(previous, current));
    }

    Ok(Scene {
        calibration,
        truth,
        points,
        correspondences,
    })
}

#[test]
fn test_synthetic_two_view_reconstruction() -> Result<(), Box<dyn std::error::Error>> {
    let scene = make_scene(150, 0.3, 42)?;

    let estimator = PoseEstimator::new(scene.calibration, PoseEstimatorConfig::default());
    let estimate = estimator.estimate(&scene.correspondences)?;

    assert!(estimate.pose.is_valid(1e-4));
    let rot_err = rotation_distance(&estimate.pose.rotation, &scene.truth.rotation);
    assert!(rot_err.to_degrees() < 2.0, "rotation error {rot_err}");
    assert!(estimate.pose.translation.dot(scene.truth.translation) > 0.99);

    // keep the inlier points only, in input order
    let (inlier_points, inlier_correspondences): (Vec<_>, Vec<_>) = scene
        .points
        .iter()
        .zip(scene.correspondences.iter())
        .zip(estimate.inliers.iter())
        .filter(|(_, inlier)| **inlier)
        .map(|((p, c), _)| (*p, *c))
        .unzip();
    assert!(inlier_points.len() > 120);

    let triangulator = Triangulator::new(scene.calibration, TriangulationParams::default());
    let estimated = triangulator.triangulate(&inlier_correspondences, &estimate.pose);
    assert_eq!(estimated.len(), inlier_points.len());

    // scale ambiguity: both translations have unit norm, so the scale is ~1
    let mut ratios = estimated
        .iter()
        .zip(inlier_points.iter())
        .map(|(e, p)| e.length() / p.length())
        .collect::<Vec<_>>();
    ratios.sort_by(|a, b| a.total_cmp(b));
    let scale = ratios[ratios.len() / 2];
    assert!((scale - 1.0).abs() < 0.05, "scale {scale}");

    let mut rel_errors = estimated
        .iter()
        .zip(inlier_points.iter())
        .map(|(e, p)| (*e / scale - *p).length() / p.length())
        .collect::<Vec<_>>();
    rel_errors.sort_by(|a, b| a.total_cmp(b));
    assert!(rel_errors[rel_errors.len() / 2] < 0.05);

    for e in estimated.iter() {
        assert!(e.z > 0.0 && e.z <= triangulator.params().max_depth);
    }
    Ok(())
}

#[test]
fn test_synthetic_two_view_with_outliers() -> Result<(), Box<dyn std::error::Error>> {
    let mut scene = make_scene(120, 0.2, 3)?;
    let mut rng = StdRng::seed_from_u64(11);
    for c in scene.correspondences.iter_mut().step_by(5) {
        c.previous = DVec2::new(rng.random_range(0.0..640.0), rng.random_range(0.0..480.0));
    }

    let estimator = PoseEstimator::new(scene.calibration, PoseEstimatorConfig::default());
    let estimate = estimator.estimate(&scene.correspondences)?;

    let rot_err = rotation_distance(&estimate.pose.rotation, &scene.truth.rotation);
    assert!(rot_err.to_degrees() < 2.0);
    assert!(estimate.inlier_count < scene.correspondences.len());
    assert!(estimate.inlier_count >= 90);
    Ok(())
}

#[test]
fn test_degenerate_identical_pixels() -> Result<(), Box<dyn std::error::Error>> {
    let calibration = CalibrationMatrix::new(800.0, 800.0, 320.0, 240.0)?;
    let estimator = PoseEstimator::new(calibration, PoseEstimatorConfig::default());

    let exact = vec![Correspondence::new(DVec2::new(320.0, 240.0), DVec2::new(330.0, 240.0)); 100];
    assert!(matches!(
        estimator.estimate(&exact),
        Err(PoseEstimationError::DegenerateConfiguration { .. })
    ));

    // near identical locations: sub-pixel jitter around a single point
    let mut rng = StdRng::seed_from_u64(5);
    let near = (0..100)
        .map(|_| {
            let d = DVec2::new(rng.random_range(-1e-3..1e-3), rng.random_range(-1e-3..1e-3));
            Correspondence::new(DVec2::new(320.0, 240.0) + d, DVec2::new(330.0, 240.0) - d)
        })
        .collect::<Vec<_>>();
    assert!(estimator.estimate(&near).is_err());
    Ok(())
}
