//! Output record and encoding option types

use serde::Serialize;

use crate::depth_pipeline::common::raster::Raster;
use crate::depth_pipeline::convert::{CameraGeometry, DepthRaster};

/// TIFF compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TiffCompression {
    /// No compression (fastest, largest file)
    None,
    /// LZW compression (slow, good compression)
    Lzw,
    /// Deflate compression - fast level
    DeflateFast,
    /// Deflate compression - balanced
    DeflateBalanced,
    /// Deflate compression - best compression (slower)
    DeflateBest,
}

#[derive(Debug, Clone, Copy)]
pub struct SinkOptions {
    pub compression: TiffCompression,
    /// Predictor for compressed output, 2 for horizontal differencing.
    pub predictor: Option<u16>,
    /// Also persist the right camera's frame.
    pub write_right: bool,
}

impl Default for SinkOptions {
    fn default() -> Self {
        Self {
            compression: TiffCompression::DeflateFast,
            predictor: Some(2),
            write_right: false,
        }
    }
}

/// Everything persisted for one stereo pair.
#[derive(Debug, Clone, Copy)]
pub struct FrameRecord<'a> {
    pub index: u64,
    pub timestamp_ms: u64,
    /// The reference view the depth map is registered to.
    pub color: &'a Raster<u8>,
    pub right: Option<&'a Raster<u8>>,
    pub depth: &'a DepthRaster,
}

/// Pinhole intrinsics serialised the way common RGB-D reconstruction
/// tools read them: the 3x3 matrix flattened column by column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CameraIntrinsics {
    pub width: usize,
    pub height: usize,
    pub intrinsic_matrix: [f64; 9],
}

impl CameraIntrinsics {
    /// `[[f/s, 0, cx], [0, f/s, cy], [0, 0, 1]]` with the principal point at
    /// the image centre.
    pub fn from_geometry(geometry: &CameraGeometry, scale: f64, width: usize, height: usize) -> Self {
        let focal = geometry.focal_length_px / scale;
        let cx = width as f64 / 2.0;
        let cy = height as f64 / 2.0;
        Self {
            width,
            height,
            intrinsic_matrix: [focal, 0.0, 0.0, 0.0, focal, 0.0, cx, cy, 1.0],
        }
    }

    pub fn focal_length(&self) -> f64 {
        self.intrinsic_matrix[0]
    }

    pub fn principal_point(&self) -> (f64, f64) {
        (self.intrinsic_matrix[6], self.intrinsic_matrix[7])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intrinsics_are_column_major() {
        let k = CameraIntrinsics::from_geometry(&CameraGeometry::default(), 2.0, 640, 480);
        assert_eq!(k.focal_length(), 282.5);
        assert_eq!(k.principal_point(), (320.0, 240.0));
        assert_eq!(k.intrinsic_matrix[4], 282.5);
        assert_eq!(k.intrinsic_matrix[8], 1.0);
    }
}
