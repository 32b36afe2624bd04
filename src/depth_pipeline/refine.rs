//! Disparity refinement
//!
//! Erases disparity discontinuities that have no matching colour
//! discontinuity, then median-filters the result.

mod depth_refiner;
pub mod types;

pub use depth_refiner::DepthRefiner;
pub use types::RefinerConfig;
