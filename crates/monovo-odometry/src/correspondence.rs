pub use monovo_geometry::correspondence::{rank_by_distance, Correspondence};

/// Produces pixel correspondences between a baseline frame and a new frame.
///
/// Implemented by the feature detection and matching layer. `F` is whatever that layer keeps
/// per frame (keypoints, descriptors, track ids, ...). Every correspondence is ordered as
/// `(previous, current)`: the baseline pixel first.
pub trait CorrespondenceSource<F> {
    /// Match `current` against `baseline`.
    fn correspondences(&mut self, baseline: &F, current: &F) -> Vec<Correspondence>;
}

impl<F, T> CorrespondenceSource<F> for T
where
    T: FnMut(&F, &F) -> Vec<Correspondence>,
{
    fn correspondences(&mut self, baseline: &F, current: &F) -> Vec<Correspondence> {
        self(baseline, current)
    }
}
