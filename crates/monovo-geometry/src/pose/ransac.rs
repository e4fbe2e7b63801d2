use glam::{DMat3, DVec2};
use rand::prelude::*;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::{essential_8point, sampson_distance, PoseEstimationError, ESSENTIAL_SAMPLE_SIZE};

/// Parameters for RANSAC model estimation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RansacParams {
    /// Upper bound on the number of RANSAC iterations.
    pub max_iterations: usize,
    /// Inlier threshold on the Sampson distance, in pixels.
    pub threshold: f64,
    /// Probability that at least one sample is outlier free, drives the adaptive iteration count.
    pub confidence: f64,
    /// Minimum number of inliers required for acceptance.
    pub min_inliers: usize,
    /// Optional RNG seed for deterministic runs.
    pub random_seed: Option<u64>,
}

impl Default for RansacParams {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            threshold: 1.0,
            confidence: 0.999,
            min_inliers: ESSENTIAL_SAMPLE_SIZE,
            random_seed: Some(0),
        }
    }
}

/// Result of a RANSAC model fit.
#[derive(Clone, Debug)]
pub struct RansacResult<M> {
    /// Estimated model.
    pub model: M,
    /// Per-point inlier mask.
    pub inliers: Vec<bool>,
    /// Total inlier count.
    pub inlier_count: usize,
    /// Sum of inlier errors (lower is better).
    pub score: f64,
    /// Number of hypotheses drawn.
    pub iterations: usize,
}

/// Number of iterations needed to draw one outlier-free sample with probability `confidence`.
///
/// `inlier_ratio` is the fraction of inliers of the best hypothesis so far and `sample_size`
/// the size of a minimal sample. The result never exceeds `max_iterations`.
pub fn adaptive_num_iterations(
    confidence: f64,
    inlier_ratio: f64,
    sample_size: usize,
    max_iterations: usize,
) -> usize {
    let confidence = confidence.clamp(0.0, 1.0);
    let inlier_ratio = inlier_ratio.clamp(0.0, 1.0);

    let num = (1.0 - confidence).max(f64::MIN_POSITIVE);
    let denom = 1.0 - inlier_ratio.powi(sample_size as i32);
    if denom < f64::MIN_POSITIVE {
        return 0;
    }

    let num = num.ln();
    let denom = denom.ln();
    if denom >= 0.0 || -num >= max_iterations as f64 * -denom {
        max_iterations
    } else {
        (num / denom).round() as usize
    }
}

/// Estimate an essential matrix with RANSAC using the 8-point solver.
///
/// - `x1`: normalized coordinates in the current view.
/// - `x2`: normalized coordinates in the previous view.
/// - `threshold`: Sampson inlier threshold in normalized units (not squared).
///
/// The number of iterations starts at `params.max_iterations` and shrinks each time a better
/// hypothesis raises the inlier ratio. The winning hypothesis is refit on all its inliers and the
/// refit is kept when it has at least as much support.
pub fn ransac_essential(
    x1: &[DVec2],
    x2: &[DVec2],
    threshold: f64,
    params: &RansacParams,
) -> Result<RansacResult<DMat3>, PoseEstimationError> {
    if x1.len() != x2.len() || x1.len() < ESSENTIAL_SAMPLE_SIZE {
        return Err(PoseEstimationError::TooFewCorrespondences {
            required: ESSENTIAL_SAMPLE_SIZE,
            actual: x1.len().min(x2.len()),
        });
    }

    let mut rng = match params.random_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => {
            let mut tr = rand::rng();
            StdRng::from_rng(&mut tr)
        }
    };

    let n = x1.len();
    let threshold_sq = threshold * threshold;
    let mut best: Option<RansacResult<DMat3>> = None;
    let mut num_iterations = params.max_iterations;
    let mut iterations = 0usize;
    let mut ill_conditioned = 0usize;

    let mut s1 = Vec::with_capacity(ESSENTIAL_SAMPLE_SIZE);
    let mut s2 = Vec::with_capacity(ESSENTIAL_SAMPLE_SIZE);

    while iterations < num_iterations {
        iterations += 1;

        s1.clear();
        s2.clear();
        for idx in rand::seq::index::sample(&mut rng, n, ESSENTIAL_SAMPLE_SIZE).iter() {
            s1.push(x1[idx]);
            s2.push(x2[idx]);
        }

        let e = match essential_8point(&s1, &s2) {
            Ok(e) => e,
            Err(_) => {
                ill_conditioned += 1;
                continue;
            }
        };

        let (inliers, count, score) = score_essential(&e, x1, x2, threshold_sq);
        if is_better(count, score, best.as_ref()) {
            let inlier_ratio = count as f64 / n as f64;
            num_iterations = num_iterations.min(adaptive_num_iterations(
                params.confidence,
                inlier_ratio,
                ESSENTIAL_SAMPLE_SIZE,
                params.max_iterations,
            ));
            log::trace!(
                "RANSAC iteration {}: {} inliers, budget now {} iterations",
                iterations,
                count,
                num_iterations
            );
            best = Some(RansacResult {
                model: e,
                inliers,
                inlier_count: count,
                score,
                iterations,
            });
        }
    }

    let mut best = match best {
        Some(best) => best,
        None if ill_conditioned == iterations => return Err(PoseEstimationError::IllConditioned),
        None => {
            return Err(PoseEstimationError::NoConsensus {
                inliers: 0,
                required: params.min_inliers,
            })
        }
    };
    best.iterations = iterations;

    if best.inlier_count < params.min_inliers.max(ESSENTIAL_SAMPLE_SIZE) {
        return Err(PoseEstimationError::NoConsensus {
            inliers: best.inlier_count,
            required: params.min_inliers.max(ESSENTIAL_SAMPLE_SIZE),
        });
    }

    // refit on the consensus set
    if best.inlier_count > ESSENTIAL_SAMPLE_SIZE {
        let (r1, r2): (Vec<DVec2>, Vec<DVec2>) = best
            .inliers
            .iter()
            .enumerate()
            .filter(|(_, inlier)| **inlier)
            .map(|(i, _)| (x1[i], x2[i]))
            .unzip();
        if let Ok(e) = essential_8point(&r1, &r2) {
            let (inliers, count, score) = score_essential(&e, x1, x2, threshold_sq);
            if count >= best.inlier_count {
                best.model = e;
                best.inliers = inliers;
                best.inlier_count = count;
                best.score = score;
            }
        }
    }

    log::debug!(
        "RANSAC essential: {}/{} inliers after {} iterations ({} ill-conditioned samples)",
        best.inlier_count,
        n,
        iterations,
        ill_conditioned
    );

    Ok(best)
}

fn is_better(count: usize, score: f64, best: Option<&RansacResult<DMat3>>) -> bool {
    match best {
        None => count > 0,
        Some(b) => count > b.inlier_count || (count == b.inlier_count && score < b.score),
    }
}

fn score_essential(
    e: &DMat3,
    x1: &[DVec2],
    x2: &[DVec2],
    threshold_sq: f64,
) -> (Vec<bool>, usize, f64) {
    let mut inliers = vec![false; x1.len()];
    let mut count = 0usize;
    let mut score = 0.0f64;
    for (i, (p1, p2)) in x1.iter().zip(x2.iter()).enumerate() {
        let d = sampson_distance(e, p1, p2);
        if d <= threshold_sq {
            inliers[i] = true;
            count += 1;
            score += d;
        }
    }
    (inliers, count, score)
}
