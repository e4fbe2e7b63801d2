#![deny(missing_docs)]
//! Frame-to-frame monocular visual odometry.
//!
//! A [`FrameProcessor`] consumes one frame at a time, asks a [`CorrespondenceSource`] for pixel
//! matches against the previous frame, estimates the relative motion, chains it into an
//! absolute trajectory ([`PoseChain`]) and accumulates triangulated points into a world map
//! ([`MapStore`]).
//!
//! The result is pure incremental odometry: there is no bundle adjustment, no loop closure and
//! no scale recovery, so drift grows without bound and the map is not globally consistent.

/// Odometry configuration.
pub mod config;

/// Correspondence source boundary.
pub mod correspondence;

/// Error kinds of the odometry pipeline.
pub mod error;

/// Flat export of the trajectory and the map.
pub mod export;

/// Per-frame state machine.
pub mod frame_processor;

/// Append-only world map.
pub mod map_store;

/// Absolute pose composition.
pub mod pose_chain;

pub use config::OdometryConfig;
pub use correspondence::{Correspondence, CorrespondenceSource};
pub use error::OdometryError;
pub use export::OdometryExport;
pub use frame_processor::{Baseline, FrameOutcome, FrameProcessor, TrackingPhase};
pub use map_store::{MapPoint, MapStore};
pub use pose_chain::{AbsolutePose, PoseChain};
