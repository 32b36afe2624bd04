//! Disparity to metric depth
//!
//! The cameras are toed in, so zero disparity sits at the convergence
//! distance rather than at infinity.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::depth_pipeline::common::raster::Raster;
use crate::depth_pipeline::matcher::{DisparityRaster, DISPARITY_FRACTION_SCALE};

/// Depth in millimetres; 0 means unknown.
pub type DepthRaster = Raster<u16>;

/// Depths at or beyond this do not fit the output and become unknown.
pub const MAX_DEPTH_MM: f64 = 65535.0;

/// Fixed stereo rig parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraGeometry {
    /// Distance between the optical centres, in metres.
    pub baseline_m: f64,
    pub focal_length_px: f64,
    /// Distance at which the optical axes cross, in metres.
    pub convergence_m: f64,
}

impl Default for CameraGeometry {
    fn default() -> Self {
        Self {
            baseline_m: 0.035,
            focal_length_px: 565.0,
            convergence_m: 0.25,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DepthConverter {
    geometry: CameraGeometry,
}

impl DepthConverter {
    pub fn new(geometry: CameraGeometry) -> Self {
        Self { geometry }
    }

    pub fn geometry(&self) -> &CameraGeometry {
        &self.geometry
    }

    /// Depth of one fixed-point disparity sample. `sentinel` and depths that
    /// do not fit in 16 bits map to 0.
    pub fn depth_mm(&self, value: i16, sentinel: i16) -> u16 {
        if value == sentinel {
            return 0;
        }
        let g = &self.geometry;
        let disparity_px = value as f64 / DISPARITY_FRACTION_SCALE as f64;
        let depth = 1000.0 * (g.baseline_m / (g.baseline_m / g.convergence_m - disparity_px / g.focal_length_px)).abs();
        if !depth.is_finite() || depth >= MAX_DEPTH_MM {
            return 0;
        }
        depth.floor() as u16
    }

    #[instrument(skip_all, fields(width = disparity.width(), height = disparity.height()))]
    pub fn convert(&self, disparity: &DisparityRaster) -> DepthRaster {
        let sentinel = disparity.sentinel();
        let depth = disparity.raster().map(|v| self.depth_mm(v, sentinel));
        debug!(
            known = depth.data().iter().filter(|&&d| d != 0).count(),
            "Converted disparity to depth"
        );
        depth
    }
}
