//! Frame and track types

use crate::depth_pipeline::common::raster::Raster;

/// Logical camera a frame belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackId {
    Left,
    Right,
}

/// One decoded picture. Immutable once produced.
#[derive(Debug, Clone)]
pub struct RasterFrame {
    track: TrackId,
    /// Decode-completion index within the track, starting at 0.
    sequence: u64,
    /// Presentation time claimed by the container, if it states one.
    timestamp_ms: Option<f64>,
    image: Raster<u8>,
}

impl RasterFrame {
    pub fn new(track: TrackId, sequence: u64, image: Raster<u8>) -> Self {
        Self {
            track,
            sequence,
            timestamp_ms: None,
            image,
        }
    }

    pub fn with_timestamp(mut self, timestamp_ms: f64) -> Self {
        self.timestamp_ms = Some(timestamp_ms);
        self
    }

    pub fn track(&self) -> TrackId {
        self.track
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn timestamp_ms(&self) -> Option<f64> {
        self.timestamp_ms
    }

    pub fn image(&self) -> &Raster<u8> {
        &self.image
    }

    pub fn width(&self) -> usize {
        self.image.width()
    }

    pub fn height(&self) -> usize {
        self.image.height()
    }
}

/// How decoded pictures are delivered.
#[derive(Debug, Clone, Copy)]
pub struct DecodeOptions {
    /// Deliver single-channel luma instead of RGB.
    pub grayscale: bool,
    /// Treat the second video stream as the left camera.
    pub swap_tracks: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            grayscale: true,
            swap_tracks: false,
        }
    }
}
