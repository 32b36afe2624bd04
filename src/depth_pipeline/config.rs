//! Pipeline configuration
//!
//! One value describes a whole run: which matcher to use, whether to refine,
//! how to decode and how to store. It is built once and handed to the
//! pipeline, which owns it for the rest of the run.

use crate::depth_pipeline::convert::CameraGeometry;
use crate::depth_pipeline::matcher::{MatcherConfig, MatcherKind};
use crate::depth_pipeline::output::{SinkOptions, TiffCompression};
use crate::depth_pipeline::refine::RefinerConfig;
use crate::depth_pipeline::source::DecodeOptions;

/// Frame spacing assumed when the container does not state one.
pub const DEFAULT_FRAME_INTERVAL_MS: f64 = 33.0;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub geometry: CameraGeometry,
    pub matcher: MatcherConfig,
    /// Run the edge-coincidence refiner between matching and conversion.
    pub refine: bool,
    pub refiner: RefinerConfig,
    /// Decode to single-channel luma.
    pub grayscale: bool,
    /// Treat the second video stream as the left camera.
    pub swap_tracks: bool,
    pub compression: TiffCompression,
    /// Predictor value for compression (2 for horizontal differencing)
    pub predictor: Option<u16>,
    /// Also persist the right camera's frames.
    pub write_right: bool,
    /// Divisor applied to the focal length in the intrinsics record.
    pub output_scale: f64,
    pub frame_interval_ms: f64,
    /// Reject zero-sized tracks before processing.
    pub validate_dimensions: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            geometry: CameraGeometry::default(),
            matcher: MatcherConfig::default(),
            refine: true,
            refiner: RefinerConfig::default(),
            grayscale: true,
            swap_tracks: false,
            compression: TiffCompression::None,
            predictor: None,
            write_right: false,
            output_scale: 1.0,
            frame_interval_ms: DEFAULT_FRAME_INTERVAL_MS,
            validate_dimensions: true,
        }
    }
}

impl PipelineConfig {
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    pub fn decode_options(&self) -> DecodeOptions {
        DecodeOptions {
            grayscale: self.grayscale,
            swap_tracks: self.swap_tracks,
        }
    }

    pub fn sink_options(&self) -> SinkOptions {
        SinkOptions {
            compression: self.compression,
            predictor: self.predictor,
            write_right: self.write_right,
        }
    }
}

/// Builder for PipelineConfig
#[derive(Default)]
pub struct PipelineConfigBuilder {
    geometry: Option<CameraGeometry>,
    matcher: Option<MatcherConfig>,
    matcher_kind: Option<MatcherKind>,
    block_sizes: Option<Vec<usize>>,
    refine: Option<bool>,
    refiner: Option<RefinerConfig>,
    grayscale: Option<bool>,
    swap_tracks: Option<bool>,
    compression: Option<TiffCompression>,
    predictor: Option<Option<u16>>,
    write_right: Option<bool>,
    output_scale: Option<f64>,
    frame_interval_ms: Option<f64>,
    validate_dimensions: Option<bool>,
}

impl PipelineConfigBuilder {
    pub fn geometry(mut self, geometry: CameraGeometry) -> Self {
        self.geometry = Some(geometry);
        self
    }

    pub fn matcher(mut self, matcher: MatcherConfig) -> Self {
        self.matcher = Some(matcher);
        self
    }

    /// Overrides the kind of whatever matcher config ends up in use.
    pub fn matcher_kind(mut self, kind: MatcherKind) -> Self {
        self.matcher_kind = Some(kind);
        self
    }

    /// Overrides the block sizes of whatever matcher config ends up in use.
    pub fn block_sizes(mut self, sizes: Vec<usize>) -> Self {
        self.block_sizes = Some(sizes);
        self
    }

    pub fn refine(mut self, enable: bool) -> Self {
        self.refine = Some(enable);
        self
    }

    pub fn refiner(mut self, refiner: RefinerConfig) -> Self {
        self.refiner = Some(refiner);
        self
    }

    pub fn grayscale(mut self, enable: bool) -> Self {
        self.grayscale = Some(enable);
        self
    }

    pub fn swap_tracks(mut self, swap: bool) -> Self {
        self.swap_tracks = Some(swap);
        self
    }

    pub fn compression(mut self, compression: TiffCompression) -> Self {
        self.compression = Some(compression);
        self
    }

    pub fn predictor(mut self, predictor: Option<u16>) -> Self {
        self.predictor = Some(predictor);
        self
    }

    pub fn write_right(mut self, enable: bool) -> Self {
        self.write_right = Some(enable);
        self
    }

    pub fn output_scale(mut self, scale: f64) -> Self {
        self.output_scale = Some(scale);
        self
    }

    pub fn frame_interval_ms(mut self, interval: f64) -> Self {
        self.frame_interval_ms = Some(interval);
        self
    }

    pub fn validate_dimensions(mut self, validate: bool) -> Self {
        self.validate_dimensions = Some(validate);
        self
    }

    pub fn build(self) -> PipelineConfig {
        let default = PipelineConfig::default();
        let mut matcher = self.matcher.unwrap_or(default.matcher);
        if let Some(kind) = self.matcher_kind {
            matcher.kind = kind;
        }
        if let Some(sizes) = self.block_sizes {
            matcher.block_sizes = sizes;
        }
        PipelineConfig {
            geometry: self.geometry.unwrap_or(default.geometry),
            matcher,
            refine: self.refine.unwrap_or(default.refine),
            refiner: self.refiner.unwrap_or(default.refiner),
            grayscale: self.grayscale.unwrap_or(default.grayscale),
            swap_tracks: self.swap_tracks.unwrap_or(default.swap_tracks),
            compression: self.compression.unwrap_or(default.compression),
            predictor: self.predictor.unwrap_or(default.predictor),
            write_right: self.write_right.unwrap_or(default.write_right),
            output_scale: self.output_scale.unwrap_or(default.output_scale),
            frame_interval_ms: self.frame_interval_ms.unwrap_or(default.frame_interval_ms),
            validate_dimensions: self.validate_dimensions.unwrap_or(default.validate_dimensions),
        }
    }
}
