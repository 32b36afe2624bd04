use std::collections::VecDeque;

use crate::depth_pipeline::common::error::{ConversionError, Result};
use crate::depth_pipeline::common::raster::Raster;
use crate::depth_pipeline::config::PipelineConfig;
use crate::depth_pipeline::matcher::{CorrespondenceMatcher, DisparityRaster, MatcherConfig};
use crate::depth_pipeline::output::{CameraIntrinsics, FrameRecord, FrameSink};
use crate::depth_pipeline::pipeline::StereoDepthPipeline;
use crate::depth_pipeline::source::{DecodeStep, RasterFrame, StereoSource, TrackId};
use crate::depth_pipeline::sync::StereoPair;

use TrackId::{Left as L, Right as R};

const W: usize = 6;
const H: usize = 4;

/// Replays scripted decode steps. An `Err` entry fails that call.
struct ScriptedSource {
    steps: VecDeque<std::result::Result<Vec<RasterFrame>, ConversionError>>,
    dimensions: (usize, usize),
    interval_ms: Option<f64>,
    counters: [u64; 2],
}

impl ScriptedSource {
    fn new(dimensions: (usize, usize), interval_ms: Option<f64>) -> Self {
        Self {
            steps: VecDeque::new(),
            dimensions,
            interval_ms,
            counters: [0; 2],
        }
    }

    /// Adds one decode step producing frames for `tracks`, in order. Each
    /// frame is filled with its per-track index so tests can identify it.
    fn step(mut self, tracks: &[TrackId]) -> Self {
        let frames = tracks
            .iter()
            .map(|&track| {
                let seq = self.counters[track as usize];
                self.counters[track as usize] += 1;
                let fill = if track == TrackId::Left { seq as u8 } else { 100 + seq as u8 };
                RasterFrame::new(track, seq, Raster::filled(self.dimensions.0, self.dimensions.1, 1, fill))
            })
            .collect();
        self.steps.push_back(Ok(frames));
        self
    }

    fn failing_step(mut self, error: ConversionError) -> Self {
        self.steps.push_back(Err(error));
        self
    }
}

impl StereoSource for ScriptedSource {
    fn dimensions(&self) -> (usize, usize) {
        self.dimensions
    }

    fn frame_interval_ms(&self) -> Option<f64> {
        self.interval_ms
    }

    fn decode_next(&mut self) -> Result<DecodeStep> {
        match self.steps.pop_front() {
            Some(Ok(frames)) => Ok(DecodeStep::Frames(frames)),
            Some(Err(e)) => Err(e),
            None => Ok(DecodeStep::Exhausted),
        }
    }
}

/// Column 0 unmatched, everything else two pixels of disparity.
struct FixedMatcher;

impl CorrespondenceMatcher for FixedMatcher {
    fn compute(&self, left: &Raster<u8>, _right: &Raster<u8>) -> Result<DisparityRaster> {
        let (w, h) = left.dimensions();
        let mut raster = Raster::filled(w, h, 1, 32i16);
        for y in 0..h {
            raster.set(0, y, -16);
        }
        Ok(DisparityRaster::new(raster))
    }
}

#[derive(Default)]
struct RecordingSink {
    should_fail: bool,
    intrinsics: Vec<CameraIntrinsics>,
    /// (index, timestamp, first colour sample, first right sample, depth samples)
    frames: Vec<(u64, u64, u8, Option<u8>, Vec<u16>)>,
}

impl FrameSink for RecordingSink {
    fn write_intrinsics(&mut self, intrinsics: &CameraIntrinsics) -> Result<()> {
        self.intrinsics.push(intrinsics.clone());
        Ok(())
    }

    fn write_frame(&mut self, record: &FrameRecord<'_>) -> Result<()> {
        if self.should_fail {
            return Err(ConversionError::OutputWriteError("Mock write error".to_string()));
        }
        self.frames.push((
            record.index,
            record.timestamp_ms,
            record.color.get(0, 0),
            record.right.map(|r| r.get(0, 0)),
            record.depth.data().to_vec(),
        ));
        Ok(())
    }
}

fn pipeline() -> StereoDepthPipeline<FixedMatcher> {
    StereoDepthPipeline::with_custom(FixedMatcher, PipelineConfig::builder().refine(false).build())
}


#[test]
fn pairs_follow_completion_order_per_track() {
    // The empty step stands for a packet that produced no frame yet; the
    // last steps are the decoder draining what it held back.
    let mut source = ScriptedSource::new((W, H), Some(40.0))
        .step(&[L, L])
        .step(&[])
        .step(&[R])
        .step(&[R, L])
        .step(&[L]);
    let mut sink = RecordingSink::default();

    let summary = pipeline().run(&mut source, &mut sink).unwrap();

    assert_eq!(summary.pairs_written, 2);
    assert_eq!((summary.dropped_left, summary.dropped_right), (2, 0));
    let written: Vec<(u64, u64, u8, Option<u8>)> =
        sink.frames.iter().map(|f| (f.0, f.1, f.2, f.3)).collect();
    assert_eq!(written, vec![(0, 0, 0, Some(100)), (1, 40, 1, Some(101))]);
}

#[test]
fn intrinsics_are_written_once_before_the_first_frame() {
    let mut source = ScriptedSource::new((W, H), None)
        .step(&[L, R])
        .step(&[L, R]);
    let mut sink = RecordingSink::default();
    pipeline().run(&mut source, &mut sink).unwrap();

    assert_eq!(sink.intrinsics.len(), 1);
    assert_eq!(sink.intrinsics[0].width, W);
    assert_eq!(sink.intrinsics[0].principal_point(), (3.0, 2.0));
    // No container interval, so the configured fallback applies.
    assert_eq!(sink.frames[1].1, 33);
}

#[test]
fn no_pairs_means_no_output() {
    let mut source = ScriptedSource::new((W, H), None).step(&[L, L]);
    let mut sink = RecordingSink::default();
    let summary = pipeline().run(&mut source, &mut sink).unwrap();
    assert_eq!(summary.pairs_written, 0);
    assert!(sink.intrinsics.is_empty());
    assert!(sink.frames.is_empty());
}

#[test]
fn depth_has_zero_at_unmatched_pixels() {
    let mut source = ScriptedSource::new((W, H), None).step(&[L, R]);
    let mut sink = RecordingSink::default();
    pipeline().run(&mut source, &mut sink).unwrap();

    let depth = &sink.frames[0].4;
    for y in 0..H {
        assert_eq!(depth[y * W], 0);
        assert!(depth[y * W + 1..(y + 1) * W].iter().all(|&d| d == 256));
    }
}

#[test]
fn refine_and_convert_returns_the_left_frame() {
    let pair = StereoPair {
        left: RasterFrame::new(L, 0, Raster::filled(W, H, 1, 7)),
        right: RasterFrame::new(R, 0, Raster::filled(W, H, 1, 9)),
    };
    let (depth, color) = pipeline().refine_and_convert(&pair).unwrap();
    assert_eq!(color.track(), L);
    assert_eq!(depth.dimensions(), (W, H));
}

#[test]
fn source_errors_abort_the_run() {
    let mut source = ScriptedSource::new((W, H), None)
        .step(&[L, R])
        .failing_step(ConversionError::DecodeError("Mock decode error".to_string()))
        .step(&[L, R]);
    let mut sink = RecordingSink::default();

    let err = pipeline().run(&mut source, &mut sink).unwrap_err();
    assert!(matches!(err, ConversionError::DecodeError(_)));
    assert_eq!(sink.frames.len(), 1);
}

#[test]
fn sink_errors_abort_the_run() {
    let mut source = ScriptedSource::new((W, H), None).step(&[L, R]);
    let mut sink = RecordingSink {
        should_fail: true,
        ..RecordingSink::default()
    };
    let err = pipeline().run(&mut source, &mut sink).unwrap_err();
    assert!(matches!(err, ConversionError::OutputWriteError(_)));
}

#[test]
fn zero_sized_sources_are_rejected() {
    let mut source = ScriptedSource::new((0, H), None);
    let mut sink = RecordingSink::default();
    let err = pipeline().run(&mut source, &mut sink).unwrap_err();
    assert!(matches!(err, ConversionError::InvalidDimensions(0, H)));
}

#[test]
fn converts_an_avi_file_end_to_end() {
    use crate::depth_pipeline::source::testing::write_avi;

    let (width, height) = (64, 32);
    let mut state = 0x1234_5678_u32;
    let noise: Vec<u8> = (0..(width + 8) * height)
        .map(|_| {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            (state >> 16) as u8
        })
        .collect();
    let view = |offset: usize| {
        let data = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| noise[y * (width + 8) + x + offset])
            .collect();
        Raster::from_vec(width, height, 1, data).unwrap()
    };
    let (left, right) = (view(0), view(4));

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("clip.avi");
    write_avi(
        &input,
        &[&[left.clone(), left.clone(), left], &[right.clone(), right]],
    )
    .unwrap();
    let output = dir.path().join("clip");

    let config = PipelineConfig::builder()
        .matcher(MatcherConfig {
            block_sizes: vec![7, 11],
            min_disparity: 0,
            num_disparities: 16,
            texture_threshold: 10,
            ..MatcherConfig::default()
        })
        .write_right(true)
        .build();
    let summary = StereoDepthPipeline::new(config).convert_file(&input, &output).unwrap();

    assert_eq!(summary.pairs_written, 2);
    assert_eq!(summary.dropped_left, 1);
    assert_eq!(summary.suspect_pairs, 0);
    for name in ["000000-000000.tiff", "000001-000050.tiff"] {
        assert!(output.join("image").join(name).is_file());
        assert!(output.join("depth").join(name).is_file());
        assert!(output.join("right").join(name).is_file());
    }
    assert!(output.join("camera_intrinsic.json").is_file());
    assert!(summary.timings.get_step("match_stereo").is_some());
}
