use std::path::Path;

use tracing::{info, instrument};

use crate::depth_pipeline::common::error::{ConversionError, Result};
use crate::depth_pipeline::common::timing::PipelineTimings;
use crate::depth_pipeline::config::PipelineConfig;
use crate::depth_pipeline::convert::{DepthConverter, DepthRaster};
use crate::depth_pipeline::matcher::{build_matcher, CorrespondenceMatcher};
use crate::depth_pipeline::output::{CameraIntrinsics, FrameRecord, FrameSink, TiffDirectorySink};
use crate::depth_pipeline::refine::DepthRefiner;
use crate::depth_pipeline::source::{FfmpegStereoSource, DecodeStep, RasterFrame, StereoSource};
use crate::depth_pipeline::sync::{FramePairSynchronizer, StereoPair};

/// Outcome of one [`StereoDepthPipeline::run`].
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub pairs_written: u64,
    /// Frames left without a partner when the source ran out.
    pub dropped_left: usize,
    pub dropped_right: usize,
    /// Pairs whose container timestamps disagreed.
    pub suspect_pairs: u64,
    pub timings: PipelineTimings,
}

pub struct StereoDepthPipeline<M: CorrespondenceMatcher = Box<dyn CorrespondenceMatcher>> {
    matcher: M,
    refiner: DepthRefiner,
    converter: DepthConverter,
    config: PipelineConfig,
}

impl StereoDepthPipeline<Box<dyn CorrespondenceMatcher>> {
    pub fn new(config: PipelineConfig) -> Self {
        let matcher = build_matcher(&config.matcher);
        Self::with_custom(matcher, config)
    }
}

impl<M: CorrespondenceMatcher> StereoDepthPipeline<M> {
    pub fn with_custom(matcher: M, config: PipelineConfig) -> Self {
        Self {
            matcher,
            refiner: DepthRefiner::new(config.refiner.clone()),
            converter: DepthConverter::new(config.geometry),
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn validate_dimensions(&self, width: usize, height: usize) -> Result<()> {
        if !self.config.validate_dimensions {
            return Ok(());
        }

        if width == 0 || height == 0 {
            return Err(ConversionError::InvalidDimensions(width, height));
        }

        Ok(())
    }

    /// Matches, optionally refines, and converts one pair. Returns the depth
    /// map together with the frame it is registered to.
    pub fn refine_and_convert<'p>(&self, pair: &'p StereoPair) -> Result<(DepthRaster, &'p RasterFrame)> {
        self.process_pair(pair, &mut PipelineTimings::new())
    }

    fn process_pair<'p>(
        &self,
        pair: &'p StereoPair,
        timings: &mut PipelineTimings,
    ) -> Result<(DepthRaster, &'p RasterFrame)> {
        let left = pair.left.image();
        let right = pair.right.image();

        let disparity = {
            let _span = tracing::info_span!(
                "match_stereo",
                width = left.width(),
                height = left.height()
            )
            .entered();
            timings.measure("match_stereo", || self.matcher.compute(left, right))?
        };

        let disparity = if self.config.refine {
            let _span = tracing::info_span!("refine").entered();
            timings.measure("refine", || self.refiner.refine(&disparity, left))
        } else {
            disparity
        };

        let depth = {
            let _span = tracing::info_span!("convert_depth").entered();
            timings.measure("convert_depth", || self.converter.convert(&disparity))
        };

        Ok((depth, &pair.left))
    }

    /// Drives `source` to exhaustion, writing one depth frame per stereo pair.
    #[instrument(skip_all)]
    pub fn run<S, K>(&self, source: &mut S, sink: &mut K) -> Result<RunSummary>
    where
        S: StereoSource + ?Sized,
        K: FrameSink + ?Sized,
    {
        let (width, height) = source.dimensions();
        self.validate_dimensions(width, height)?;
        let interval_ms = source
            .frame_interval_ms()
            .filter(|i| i.is_finite() && *i > 0.0)
            .unwrap_or(self.config.frame_interval_ms);

        info!(width, height, interval_ms, refine = self.config.refine, "Starting stereo depth conversion");

        let mut sync = FramePairSynchronizer::new();
        let mut timings = PipelineTimings::new();
        let mut pairs_written = 0u64;

        loop {
            let step = {
                let _span = tracing::info_span!("decode").entered();
                timings.measure("decode", || source.decode_next())?
            };
            let frames = match step {
                DecodeStep::Frames(frames) => frames,
                DecodeStep::Exhausted => break,
            };

            for frame in frames {
                sync.submit(frame.track(), frame);
                if !sync.has_new_pair() {
                    continue;
                }
                let Some(pair) = sync.take_pair() else {
                    continue;
                };

                let (depth, color) = self.process_pair(&pair, &mut timings)?;

                if pairs_written == 0 {
                    let intrinsics = CameraIntrinsics::from_geometry(
                        &self.config.geometry,
                        self.config.output_scale,
                        color.width(),
                        color.height(),
                    );
                    sink.write_intrinsics(&intrinsics)?;
                }

                let record = FrameRecord {
                    index: pairs_written,
                    timestamp_ms: (pairs_written as f64 * interval_ms).round() as u64,
                    color: color.image(),
                    right: Some(pair.right.image()),
                    depth: &depth,
                };
                {
                    let _span = tracing::info_span!("write_frame", index = record.index).entered();
                    timings.measure("write_frame", || sink.write_frame(&record))?;
                }
                pairs_written += 1;
            }
        }

        let (dropped_left, dropped_right) = sync.discard_unmatched();
        timings.log_summary();
        info!(
            pairs = pairs_written,
            dropped_left,
            dropped_right,
            suspect_pairs = sync.suspect_pairs(),
            "Conversion complete"
        );

        Ok(RunSummary {
            pairs_written,
            dropped_left,
            dropped_right,
            suspect_pairs: sync.suspect_pairs(),
            timings,
        })
    }

    #[instrument(skip(self, input_path, output_dir))]
    pub fn convert_file<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input_path: P,
        output_dir: Q,
    ) -> Result<RunSummary> {
        let input_path = input_path.as_ref();
        let output_dir = output_dir.as_ref();

        info!(
            input = %input_path.display(),
            output = %output_dir.display(),
            "Converting file"
        );

        let mut source = FfmpegStereoSource::open(input_path, self.config.decode_options())?;
        let mut sink = TiffDirectorySink::create(output_dir, self.config.sink_options())?;
        self.run(&mut source, &mut sink)
    }
}
