//! Stereo source backed by FFmpeg.
//!
//! The container carries one video stream per camera. Packets are pulled in
//! container order and handed to the decoder of the stream they belong to.
//! When the demuxer runs dry both decoders are flushed with `send_eof` and
//! whatever they still hold is delivered before the source reports
//! `Exhausted`.

use std::path::Path;

use ffmpeg_next::format::Pixel;
use ffmpeg_next::software::scaling;
use ffmpeg_next::{Rational, codec, decoder, format, frame, media};
use tracing::{debug, info};

use crate::depth_pipeline::common::error::{ConversionError, Result};
use crate::depth_pipeline::common::raster::{Raster, RasterView};
use crate::depth_pipeline::source::reader::{DecodeStep, StereoSource};
use crate::depth_pipeline::source::types::{DecodeOptions, RasterFrame, TrackId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Reading,
    Drained,
}

/// Decoder state for one camera.
struct TrackDecoder {
    track: TrackId,
    stream: usize,
    decoder: decoder::Video,
    scaler: Option<scaling::Context>,
    time_base: Rational,
    /// Frames delivered so far.
    decoded: u64,
}

impl TrackDecoder {
    fn open(input: &format::context::Input, stream: usize, track: TrackId) -> Result<Self> {
        let handle = input.stream(stream).ok_or_else(|| {
            ConversionError::ContainerError(format!("stream {} vanished from the container", stream))
        })?;
        let time_base = handle.time_base();
        let context = codec::context::Context::from_parameters(handle.parameters())
            .map_err(|e| ConversionError::UnsupportedFormatError(format!("stream {}: {}", stream, e)))?;
        let decoder = context
            .decoder()
            .video()
            .map_err(|e| ConversionError::UnsupportedFormatError(format!("stream {}: {}", stream, e)))?;

        Ok(Self {
            track,
            stream,
            decoder,
            scaler: None,
            time_base,
            decoded: 0,
        })
    }

    fn size(&self) -> (usize, usize) {
        (self.decoder.width() as usize, self.decoder.height() as usize)
    }

    fn decode_error(&self, e: ffmpeg_next::Error) -> ConversionError {
        ConversionError::DecodeError(format!("{:?} track (stream {}): {}", self.track, self.stream, e))
    }

    /// Collects every frame the decoder can hand out without more input.
    fn receive_frames(&mut self, size: (usize, usize), grayscale: bool) -> Result<Vec<RasterFrame>> {
        let mut frames = Vec::new();
        let mut decoded = frame::Video::empty();
        loop {
            match self.decoder.receive_frame(&mut decoded) {
                Ok(()) => {
                    let image = self.convert(&decoded, size, grayscale)?;
                    let mut frame = RasterFrame::new(self.track, self.decoded, image);
                    if let Some(ms) = pts_to_ms(decoded.timestamp(), self.time_base) {
                        frame = frame.with_timestamp(ms);
                    }
                    self.decoded += 1;
                    frames.push(frame);
                }
                Err(ffmpeg_next::Error::Other {
                    errno: ffmpeg_next::error::EAGAIN,
                })
                | Err(ffmpeg_next::Error::Eof) => return Ok(frames),
                Err(e) => return Err(self.decode_error(e)),
            }
        }
    }

    /// Converts a decoded picture to packed luma or RGB.
    fn convert(&mut self, decoded: &frame::Video, size: (usize, usize), grayscale: bool) -> Result<Raster<u8>> {
        let (width, height) = size;
        let actual = (decoded.width() as usize, decoded.height() as usize);
        if actual != size {
            return Err(ConversionError::StreamMismatchError(format!(
                "{:?} frame size changed: got {}x{}, expected {}x{}",
                self.track, actual.0, actual.1, width, height
            )));
        }

        let (target, channels) = if grayscale {
            (Pixel::GRAY8, 1)
        } else {
            (Pixel::RGB24, 3)
        };

        // Decoders may switch pixel format between frames.
        let mut scaler = match self.scaler.take() {
            Some(scaler) if scaler.input().format == decoded.format() => scaler,
            _ => scaling::Context::get(
                decoded.format(),
                width as u32,
                height as u32,
                target,
                width as u32,
                height as u32,
                scaling::Flags::BILINEAR,
            )
            .map_err(|e| {
                ConversionError::UnsupportedFormatError(format!(
                    "cannot convert {:?} pictures: {}",
                    decoded.format(),
                    e
                ))
            })?,
        };

        let mut converted = frame::Video::empty();
        scaler.run(decoded, &mut converted).map_err(|e| self.decode_error(e))?;
        self.scaler = Some(scaler);

        let view = RasterView::new(converted.data(0), width, height, converted.stride(0), channels)?;
        Ok(Raster::from_view(&view))
    }
}

pub struct FfmpegStereoSource {
    input: format::context::Input,
    /// Left decoder first.
    tracks: [TrackDecoder; 2],
    width: usize,
    height: usize,
    options: DecodeOptions,
    interval_ms: Option<f64>,
    phase: Phase,
}

impl FfmpegStereoSource {
    /// Opens a container and picks its first two video streams, which must
    /// agree on size.
    pub fn open<P: AsRef<Path>>(path: P, options: DecodeOptions) -> Result<Self> {
        let path = path.as_ref();
        info!(input = %path.display(), "Opening stereo container");

        ffmpeg_next::init()
            .map_err(|e| ConversionError::ContainerError(format!("cannot initialise FFmpeg: {}", e)))?;
        let input = format::input(path)
            .map_err(|e| ConversionError::ContainerError(format!("{}: {}", path.display(), e)))?;

        let video: Vec<usize> = input
            .streams()
            .filter(|s| s.parameters().medium() == media::Type::Video)
            .map(|s| s.index())
            .collect();
        let (first, second) = first_two_video_streams(&video)?;
        let (left_stream, right_stream) = if options.swap_tracks {
            (second, first)
        } else {
            (first, second)
        };

        let left = TrackDecoder::open(&input, left_stream, TrackId::Left)?;
        let right = TrackDecoder::open(&input, right_stream, TrackId::Right)?;
        let (width, height) = agreed_size((left_stream, left.size()), (right_stream, right.size()))?;

        let interval_ms = input.stream(first).and_then(|s| {
            rate_interval_ms(s.avg_frame_rate()).or_else(|| rate_interval_ms(s.rate()))
        });

        info!(
            left_stream,
            right_stream,
            width,
            height,
            interval_ms = interval_ms.unwrap_or(0.0),
            "Selected stereo tracks"
        );

        Ok(Self {
            input,
            tracks: [left, right],
            width,
            height,
            options,
            interval_ms,
            phase: Phase::Reading,
        })
    }

    fn drain(&mut self) -> Result<Vec<RasterFrame>> {
        self.phase = Phase::Drained;
        let size = (self.width, self.height);
        let mut frames = Vec::new();
        for track in &mut self.tracks {
            track.decoder.send_eof().map_err(|e| track.decode_error(e))?;
            frames.extend(track.receive_frames(size, self.options.grayscale)?);
        }
        debug!(frames = frames.len(), "Decoders drained");
        Ok(frames)
    }
}

impl StereoSource for FfmpegStereoSource {
    fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn frame_interval_ms(&self) -> Option<f64> {
        self.interval_ms
    }

    fn decode_next(&mut self) -> Result<DecodeStep> {
        if self.phase == Phase::Drained {
            return Ok(DecodeStep::Exhausted);
        }

        let next = self
            .input
            .packets()
            .next()
            .map(|(stream, packet)| (stream.index(), packet));
        let Some((stream, packet)) = next else {
            return self.drain().map(DecodeStep::Frames);
        };

        let size = (self.width, self.height);
        let grayscale = self.options.grayscale;
        let Some(track) = self.tracks.iter_mut().find(|t| t.stream == stream) else {
            return Ok(DecodeStep::Frames(Vec::new()));
        };

        // An empty packet would read as a flush request.
        if packet.size() == 0 {
            debug!(track = ?track.track, "Empty packet, no frame");
            return Ok(DecodeStep::Frames(Vec::new()));
        }

        let _span = tracing::debug_span!("decode", track = ?track.track, bytes = packet.size()).entered();
        track.decoder.send_packet(&packet).map_err(|e| track.decode_error(e))?;
        track.receive_frames(size, grayscale).map(DecodeStep::Frames)
    }
}

/// The first two video streams in container order.
fn first_two_video_streams(video: &[usize]) -> Result<(usize, usize)> {
    match video {
        [first, second, ..] => Ok((*first, *second)),
        _ => Err(ConversionError::StreamMismatchError(format!(
            "cannot find matching left/right video streams ({} video streams)",
            video.len()
        ))),
    }
}

/// Both tracks must share one non-empty size.
fn agreed_size(
    (left_stream, left): (usize, (usize, usize)),
    (right_stream, right): (usize, (usize, usize)),
) -> Result<(usize, usize)> {
    if left != right {
        return Err(ConversionError::StreamMismatchError(format!(
            "stream {} is {}x{} but stream {} is {}x{}",
            left_stream, left.0, left.1, right_stream, right.0, right.1
        )));
    }
    if left.0 == 0 || left.1 == 0 {
        return Err(ConversionError::InvalidDimensions(left.0, left.1));
    }
    Ok(left)
}

fn pts_to_ms(pts: Option<i64>, time_base: Rational) -> Option<f64> {
    let pts = pts?;
    (time_base.denominator() != 0)
        .then(|| pts as f64 * time_base.numerator() as f64 * 1000.0 / time_base.denominator() as f64)
}

fn rate_interval_ms(rate: Rational) -> Option<f64> {
    (rate.numerator() > 0 && rate.denominator() > 0)
        .then(|| rate.denominator() as f64 * 1000.0 / rate.numerator() as f64)
}
