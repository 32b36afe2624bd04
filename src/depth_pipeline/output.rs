//! Persisting depth frames
//!
//! A sink receives one record per stereo pair plus, before the first one,
//! the camera intrinsics needed to back-project the depth maps.

mod sink;
mod tiff_directory_sink;
pub mod types;

pub use sink::FrameSink;
pub use tiff_directory_sink::TiffDirectorySink;
pub use types::{CameraIntrinsics, FrameRecord, SinkOptions, TiffCompression};
