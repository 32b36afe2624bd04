use crate::depth_pipeline::common::error::Result;
use crate::depth_pipeline::source::types::RasterFrame;

/// Outcome of pulling one decodable unit from a source.
#[derive(Debug)]
pub enum DecodeStep {
    /// Zero or more frames completed by this unit, each tagged with its track.
    Frames(Vec<RasterFrame>),
    /// Input and decoder drain are both finished.
    Exhausted,
}

pub trait StereoSource {
    /// Width and height shared by every frame of both tracks.
    fn dimensions(&self) -> (usize, usize);

    /// Nominal spacing between frames, when the container states one.
    fn frame_interval_ms(&self) -> Option<f64>;

    /// Pulls the next unit. Once the byte source runs dry an implementation
    /// keeps returning buffered frames until nothing is left, and only then
    /// reports `Exhausted`.
    fn decode_next(&mut self) -> Result<DecodeStep>;
}
