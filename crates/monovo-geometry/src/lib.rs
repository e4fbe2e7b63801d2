#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Pinhole calibration matrix.
pub mod camera;

/// 2D-2D correspondences between two views.
pub mod correspondence;

/// Linear algebra utilities.
pub mod linalg;

/// Relative pose estimation from two views.
pub mod pose;

/// 3D transforms algorithms.
pub mod transforms;

/// Two-view DLT triangulation.
pub mod triangulation;
