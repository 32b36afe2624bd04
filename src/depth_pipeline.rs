//! Stereo video to depth map pipeline
//!
//! Decodes the two camera tracks of a stereo recording, pairs their frames,
//! computes disparity, removes unsupported disparity edges, converts to
//! millimetres and stores the result.

pub mod common;
pub mod source;
pub mod sync;
pub mod filters;
pub mod matcher;
pub mod refine;
pub mod convert;
pub mod output;
pub mod config;
pub mod pipeline;

#[cfg(test)]
mod tests;

pub use common::{
    ConversionError,
    Result,
    Raster,
    RasterView,
    PipelineTimings,
};

pub use source::{
    FfmpegStereoSource,
    DecodeOptions,
    DecodeStep,
    RasterFrame,
    StereoSource,
    TrackId,
};

pub use sync::{
    FramePairSynchronizer,
    StereoPair,
};

pub use matcher::{
    build_matcher,
    BlockMatcher,
    CorrespondenceMatcher,
    DisparityRaster,
    MatcherConfig,
    MatcherKind,
    MultiBlockMatcher,
    SemiGlobalMatcher,
};

pub use refine::{
    DepthRefiner,
    RefinerConfig,
};

pub use convert::{
    CameraGeometry,
    DepthConverter,
    DepthRaster,
};

pub use output::{
    CameraIntrinsics,
    FrameRecord,
    FrameSink,
    SinkOptions,
    TiffCompression,
    TiffDirectorySink,
};

pub use config::{
    PipelineConfig,
    PipelineConfigBuilder,
};

pub use pipeline::{
    RunSummary,
    StereoDepthPipeline,
};
