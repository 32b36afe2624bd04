//! Stereo frame sources
//!
//! A source turns a multiplexed container into per-track raster frames, one
//! decodable unit at a time.

mod reader;
mod ffmpeg_reader;
pub mod types;

pub use reader::{DecodeStep, StereoSource};
pub use ffmpeg_reader::FfmpegStereoSource;
pub use types::{DecodeOptions, RasterFrame, TrackId};

#[cfg(test)]
pub(crate) use ffmpeg_reader::testing;
