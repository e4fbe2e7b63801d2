#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

#[doc(inline)]
pub use monovo_geometry as geometry;

#[doc(inline)]
pub use monovo_odometry as odometry;
