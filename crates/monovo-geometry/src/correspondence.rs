use glam::DVec2;

/// A pixel correspondence between the previous (baseline) frame and the current frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correspondence {
    /// Pixel location in the previous frame.
    pub previous: DVec2,
    /// Pixel location in the current frame.
    pub current: DVec2,
    /// Descriptor distance reported by the matcher, lower is better.
    ///
    /// Only used to rank correspondences for diagnostics.
    pub distance: Option<f32>,
}

impl Correspondence {
    /// Create a correspondence without a descriptor distance.
    pub fn new(previous: DVec2, current: DVec2) -> Self {
        Self {
            previous,
            current,
            distance: None,
        }
    }

    /// Attach a descriptor distance to the correspondence.
    pub fn with_distance(mut self, distance: f32) -> Self {
        self.distance = Some(distance);
        self
    }

    /// Whether both pixel locations are finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.previous.is_finite() && self.current.is_finite()
    }
}

/// Sort correspondences by ascending descriptor distance.
///
/// Correspondences without a distance keep their relative order and go last.
pub fn rank_by_distance(correspondences: &mut [Correspondence]) {
    correspondences.sort_by(|a, b| match (a.distance, b.distance) {
        (Some(da), Some(db)) => da.total_cmp(&db),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_by_distance() {
        let p = DVec2::ZERO;
        let mut c = vec![
            Correspondence::new(p, p),
            Correspondence::new(p, p).with_distance(30.0),
            Correspondence::new(p, p).with_distance(10.0),
        ];
        rank_by_distance(&mut c);
        assert_eq!(c[0].distance, Some(10.0));
        assert_eq!(c[1].distance, Some(30.0));
        assert_eq!(c[2].distance, None);
    }

    #[test]
    fn test_is_finite() {
        let c = Correspondence::new(DVec2::new(f64::NAN, 0.0), DVec2::ZERO);
        assert!(!c.is_finite());
    }
}
